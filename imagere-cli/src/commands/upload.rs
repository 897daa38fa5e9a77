use anyhow::{Context, Result};
use imagere_core::{CompressionLadder, FitOutcome, OutputFormat, TransformParams, UPLOAD_SOFT_LIMIT};
use reqwest::{header, multipart, StatusCode};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

pub async fn execute(
    file: PathBuf,
    params: TransformParams,
    server: String,
    output: Option<PathBuf>,
) -> Result<()> {
    upload(&file, &params, &server, output, Path::new("")).await?;
    Ok(())
}

/// Send `file` to the server and save the result. Without an explicit
/// `output` the file is named after the response type inside `default_dir`.
async fn upload(
    file: &Path,
    params: &TransformParams,
    server: &str,
    output: Option<PathBuf>,
    default_dir: &Path,
) -> Result<PathBuf> {
    let original =
        fs::read(file).with_context(|| format!("Failed to read image: {}", file.display()))?;
    let file_name = file
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "image".to_string());

    tracing::info!("Original file: {} ({} bytes)", file.display(), original.len());

    // Shrink oversized uploads before they hit the server's limit
    let outcome = CompressionLadder::default()
        .fit_under(&original, UPLOAD_SOFT_LIMIT)
        .context("Failed to compress image. Please try a smaller file")?;

    if let Some(summary) = outcome.summary() {
        println!("{summary}");
    }

    let (data, file_name) = match outcome {
        FitOutcome::Unchanged => (original, file_name),
        FitOutcome::Compressed { data, .. } => (data, compressed_file_name(file)),
    };

    let url = format!("{}/api/imagere", server.trim_end_matches('/'));
    let query = params.query_pairs();

    tracing::info!("Uploading {} ({} bytes) to {} {:?}", file_name, data.len(), url, query);

    let form = multipart::Form::new().part("image", multipart::Part::bytes(data).file_name(file_name));

    let response = reqwest::Client::new()
        .post(&url)
        .query(&query)
        .multipart(form)
        .send()
        .await
        .with_context(|| format!("Failed to reach {url}"))?;

    let status = response.status();
    tracing::debug!("Response status: {}", status);

    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        anyhow::bail!(error_message(status, &text));
    }

    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    if !content_type.starts_with("image/") {
        anyhow::bail!("Server returned invalid response format: {content_type:?}");
    }

    let bytes = response.bytes().await.context("Failed to read response body")?;

    if bytes.is_empty() {
        anyhow::bail!("Received empty image response");
    }

    let output = output.unwrap_or_else(|| default_dir.join(default_output_path(&content_type)));
    fs::write(&output, &bytes).with_context(|| format!("Failed to write {}", output.display()))?;

    println!("✓ Saved {} ({} bytes, {})", output.display(), bytes.len(), content_type);

    Ok(output)
}

/// Message for a failed response: the server's JSON `error` when present.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Some(message) = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
    {
        return message;
    }

    match status {
        StatusCode::PAYLOAD_TOO_LARGE => {
            "Image file is too large. Please try a smaller image.".to_string()
        }
        StatusCode::GATEWAY_TIMEOUT => {
            "Processing timeout. Please try a smaller image or reduce quality.".to_string()
        }
        _ => format!("Server error ({status})"),
    }
}

fn default_output_path(content_type: &str) -> PathBuf {
    let ext = OutputFormat::from_mime_type(content_type)
        .unwrap_or(OutputFormat::Jpeg)
        .extension();
    PathBuf::from(format!("processed-image.{ext}"))
}

/// Pre-compressed uploads are always JPEG.
fn compressed_file_name(original: &Path) -> String {
    let stem = original
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "image".to_string());
    format!("{stem}.jpg")
}

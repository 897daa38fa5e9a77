use axum::{
    body::Bytes,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::QueryRejection,
        Multipart, Query, State,
    },
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
};
use imagere_core::{CompressionLadder, TransformParams, UPLOAD_SOFT_LIMIT};
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;

const IMAGE_FIELD: &str = "image";
const CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

#[derive(Debug, Deserialize)]
pub struct TransformQuery {
    pub width: Option<String>,
    pub height: Option<String>,
    pub quality: Option<String>,
    pub format: Option<String>,
}

/// Upload page
pub async fn index() -> Html<String> {
    Html(generate_index_html())
}

/// Transform an uploaded image
pub async fn transform_image(
    State(state): State<AppState>,
    query: Result<Query<TransformQuery>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    tracing::info!(
        "Transform request: width={:?}, height={:?}, quality={:?}, format={:?}",
        query.width,
        query.height,
        query.quality,
        query.format
    );

    let params = TransformParams::parse(
        query.width.as_deref(),
        query.height.as_deref(),
        query.quality.as_deref(),
        query.format.as_deref(),
    )?;

    let mut multipart = multipart.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let data = read_image_field(
        &mut multipart,
        state.config.max_upload_bytes,
        state.config.body_limit(),
    )
    .await?;

    tracing::debug!("Received image: {} bytes", data.len());

    // Decoding and encoding are CPU-bound
    let transformed = tokio::task::spawn_blocking(move || imagere_core::transform(&data, &params))
        .await
        .map_err(|e| ApiError::Internal(format!("transform task failed: {e}")))??;

    tracing::info!(
        "Transformed image: format={}, {}x{}, {} bytes",
        transformed.format,
        transformed.width,
        transformed.height,
        transformed.data.len()
    );

    Ok((
        [
            (header::CONTENT_TYPE, transformed.format.mime_type()),
            (header::CACHE_CONTROL, CACHE_CONTROL),
        ],
        transformed.data,
    )
        .into_response())
}

/// Every method other than POST on the transform endpoint
pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

async fn read_image_field(
    multipart: &mut Multipart,
    max_upload_bytes: usize,
    body_limit: usize,
) -> Result<Bytes, ApiError> {
    let to_api_error = |e: MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::BodyTooLarge { max: body_limit }
        } else {
            ApiError::BadRequest(e.body_text())
        }
    };

    while let Some(field) = multipart.next_field().await.map_err(to_api_error)? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        // A plain text field, not a file upload
        if field.file_name().is_none() {
            return Err(ApiError::InvalidImage);
        }

        let data = field.bytes().await.map_err(to_api_error)?;

        if data.is_empty() {
            return Err(ApiError::InvalidImage);
        }

        if data.len() > max_upload_bytes {
            return Err(ApiError::FileTooLarge {
                size: data.len(),
                max: max_upload_bytes,
            });
        }

        return Ok(data);
    }

    Err(ApiError::MissingImage)
}

fn generate_index_html() -> String {
    let ladder = CompressionLadder::default();
    let qualities = ladder
        .qualities
        .iter()
        .map(|q| format!("{:.2}", f32::from(*q) / 100.0))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Imagere - Image Processing Tool</title>
    <meta name="description" content="Resize and optimize your images without losing quality">
    <style>
        :root {{
            --bg: #ffffff;
            --fg: #222222;
            --muted: #666666;
            --card: #f5f5f5;
            --border: #dddddd;
            --accent: #3b5bdb;
            --error: #c92a2a;
        }}

        [data-theme="dark"] {{
            --bg: #111214;
            --fg: #e9ecef;
            --muted: #9aa0a6;
            --card: #1c1d21;
            --border: #2f3136;
            --accent: #748ffc;
            --error: #ff8787;
        }}

        @media (prefers-color-scheme: dark) {{
            :root:not([data-theme="light"]) {{
                --bg: #111214;
                --fg: #e9ecef;
                --muted: #9aa0a6;
                --card: #1c1d21;
                --border: #2f3136;
                --accent: #748ffc;
                --error: #ff8787;
            }}
        }}

        * {{
            margin: 0;
            padding: 0;
            box-sizing: border-box;
        }}

        body {{
            font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif;
            background: var(--bg);
            color: var(--fg);
            line-height: 1.6;
        }}

        .container {{
            max-width: 640px;
            margin: 60px auto;
            padding: 20px;
        }}

        h1 {{
            font-size: 2.5rem;
            font-weight: 300;
            text-align: center;
        }}

        .description {{
            text-align: center;
            color: var(--muted);
            margin-bottom: 30px;
        }}

        form, .result {{
            background: var(--card);
            border: 1px solid var(--border);
            border-radius: 6px;
            padding: 24px;
        }}

        .row {{
            display: flex;
            gap: 16px;
        }}

        .group {{
            flex: 1;
            margin-bottom: 16px;
        }}

        label {{
            display: block;
            font-size: 0.9rem;
            margin-bottom: 4px;
        }}

        input, select {{
            width: 100%;
            padding: 8px;
            border: 1px solid var(--border);
            border-radius: 4px;
            background: var(--bg);
            color: var(--fg);
        }}

        .button, .button-outline {{
            display: inline-block;
            padding: 10px 18px;
            border-radius: 4px;
            border: 1px solid var(--accent);
            font-size: 1rem;
            cursor: pointer;
            text-decoration: none;
        }}

        .button {{
            background: var(--accent);
            color: #ffffff;
        }}

        .button:disabled {{
            opacity: 0.6;
            cursor: wait;
        }}

        .button-outline {{
            background: transparent;
            color: var(--accent);
        }}

        .error {{
            color: var(--error);
            margin-bottom: 16px;
        }}

        .result img {{
            display: block;
            width: 100%;
            height: auto;
            object-fit: contain;
            margin-bottom: 16px;
        }}

        .theme-toggle {{
            position: fixed;
            top: 16px;
            right: 16px;
            background: none;
            border: 1px solid var(--border);
            border-radius: 50%;
            width: 40px;
            height: 40px;
            cursor: pointer;
            font-size: 1.2rem;
        }}

        [hidden] {{
            display: none !important;
        }}
    </style>
</head>
<body>
    <button class="theme-toggle" id="theme-toggle" aria-label="Toggle theme"></button>

    <div class="container">
        <h1>Imagere</h1>
        <p class="description">Upload and process your images without losing quality</p>

        <form id="upload-form">
            <div class="group">
                <label for="image">Select Image</label>
                <input type="file" id="image" name="image" accept="image/*" required>
            </div>

            <div class="row">
                <div class="group">
                    <label for="width">Width (px)</label>
                    <input type="number" id="width" name="width" min="1" placeholder="Original width">
                </div>
                <div class="group">
                    <label for="height">Height (px)</label>
                    <input type="number" id="height" name="height" min="1" placeholder="Original height">
                </div>
            </div>

            <div class="row">
                <div class="group">
                    <label for="quality">Quality (1-100)</label>
                    <input type="number" id="quality" name="quality" min="1" max="100" value="80">
                </div>
                <div class="group">
                    <label for="format">Format</label>
                    <select id="format" name="format">
                        <option value="">Original format</option>
                        <option value="jpeg">JPEG</option>
                        <option value="png">PNG</option>
                        <option value="webp">WebP</option>
                    </select>
                </div>
            </div>

            <div class="error" id="error" hidden></div>

            <button type="submit" class="button" id="submit">Process Image</button>
        </form>

        <div class="result" id="result" hidden>
            <img id="processed" alt="Processed">
            <a class="button" id="download" download="processed-image.jpg">Download</a>
            <button class="button-outline" id="reset">Process Another Image</button>
        </div>
    </div>

    <script>
        const MAX_FILE_SIZE = {max_file_size};
        const MAX_DIMENSION = {max_dimension};
        const QUALITIES = [{qualities}];
        const EXTENSIONS = {{ "image/jpeg": "jpg", "image/png": "png", "image/webp": "webp" }};

        const form = document.getElementById('upload-form');
        const fileInput = document.getElementById('image');
        const errorBox = document.getElementById('error');
        const submit = document.getElementById('submit');
        const result = document.getElementById('result');
        const processed = document.getElementById('processed');
        const download = document.getElementById('download');

        let uploadBlob = null;
        let resultUrl = null;

        // Theme: light -> dark -> system
        const THEME_ICONS = {{ light: '☀️', dark: '🌙', system: '🌓' }};
        const themeToggle = document.getElementById('theme-toggle');

        function applyTheme(theme) {{
            if (theme === 'system') {{
                document.documentElement.removeAttribute('data-theme');
            }} else {{
                document.documentElement.setAttribute('data-theme', theme);
            }}
            themeToggle.textContent = THEME_ICONS[theme];
            themeToggle.title = `Current theme: ${{theme}}. Click to cycle through themes.`;
        }}

        let theme = localStorage.getItem('theme') || 'system';
        applyTheme(theme);
        themeToggle.addEventListener('click', () => {{
            theme = theme === 'light' ? 'dark' : theme === 'dark' ? 'system' : 'light';
            localStorage.setItem('theme', theme);
            applyTheme(theme);
        }});

        function showError(message) {{
            errorBox.textContent = message || '';
            errorBox.hidden = !message;
        }}

        function megabytes(bytes) {{
            return (bytes / (1024 * 1024)).toFixed(2) + 'MB';
        }}

        function compressImage(file, quality) {{
            return new Promise((resolve, reject) => {{
                const img = new Image();
                img.onload = () => {{
                    let {{ width, height }} = img;
                    if (width > MAX_DIMENSION || height > MAX_DIMENSION) {{
                        if (width > height) {{
                            height = Math.round((height * MAX_DIMENSION) / width);
                            width = MAX_DIMENSION;
                        }} else {{
                            width = Math.round((width * MAX_DIMENSION) / height);
                            height = MAX_DIMENSION;
                        }}
                    }}
                    const canvas = document.createElement('canvas');
                    canvas.width = width;
                    canvas.height = height;
                    canvas.getContext('2d').drawImage(img, 0, 0, width, height);
                    canvas.toBlob((blob) => blob ? resolve(blob) : reject(new Error('encode failed')), 'image/jpeg', quality);
                }};
                img.onerror = () => reject(new Error('decode failed'));
                img.src = URL.createObjectURL(file);
            }});
        }}

        fileInput.addEventListener('change', async () => {{
            const file = fileInput.files[0];
            uploadBlob = file || null;
            showError(null);
            if (!file || file.size <= MAX_FILE_SIZE) return;

            try {{
                for (const quality of QUALITIES) {{
                    const compressed = await compressImage(file, quality);
                    if (compressed.size <= MAX_FILE_SIZE) {{
                        uploadBlob = compressed;
                        showError(`Image compressed from ${{megabytes(file.size)}} to ${{megabytes(compressed.size)}}`);
                        return;
                    }}
                }}
                showError(`Image is too large even after compression. Please use an image smaller than ${{megabytes(MAX_FILE_SIZE)}} or with lower resolution.`);
            }} catch (err) {{
                showError('Failed to compress image. Please try a smaller file.');
            }}
            uploadBlob = null;
            fileInput.value = '';
        }});

        form.addEventListener('submit', async (event) => {{
            event.preventDefault();
            showError(null);

            if (!uploadBlob) {{
                showError('Please select an image to process');
                return;
            }}

            const params = new URLSearchParams();
            for (const name of ['width', 'height', 'quality', 'format']) {{
                const value = document.getElementById(name).value;
                if (value) params.append(name, value);
            }}
            const query = params.toString();
            const url = '/api/imagere' + (query ? `?${{query}}` : '');

            const body = new FormData();
            body.append('image', uploadBlob, fileInput.files[0] ? fileInput.files[0].name : 'image');

            submit.disabled = true;
            submit.textContent = 'Processing...';

            try {{
                const response = await fetch(url, {{ method: 'POST', body }});

                if (!response.ok) {{
                    const text = await response.text();
                    let message = `Server error (${{response.status}}): ${{response.statusText}}`;
                    try {{
                        message = JSON.parse(text).error || message;
                    }} catch (_) {{
                        if (response.status === 413) message = 'Image file is too large. Please try a smaller image.';
                    }}
                    throw new Error(message);
                }}

                const contentType = response.headers.get('content-type') || '';
                if (!contentType.startsWith('image/')) {{
                    throw new Error('Server returned invalid response format');
                }}

                const blob = await response.blob();
                if (blob.size === 0) {{
                    throw new Error('Received empty image response');
                }}

                resultUrl = URL.createObjectURL(blob);
                processed.src = resultUrl;
                download.href = resultUrl;
                download.download = `processed-image.${{EXTENSIONS[contentType.split(';')[0]] || 'jpg'}}`;
                form.hidden = true;
                result.hidden = false;
            }} catch (err) {{
                showError(err.message || 'Failed to process image');
            }} finally {{
                submit.disabled = false;
                submit.textContent = 'Process Image';
            }}
        }});

        document.getElementById('reset').addEventListener('click', () => {{
            if (resultUrl) URL.revokeObjectURL(resultUrl);
            resultUrl = null;
            uploadBlob = null;
            form.reset();
            showError(null);
            result.hidden = true;
            form.hidden = false;
        }});
    </script>
</body>
</html>"#,
        max_file_size = UPLOAD_SOFT_LIMIT,
        max_dimension = ladder.max_dimension,
        qualities = qualities,
    )
}

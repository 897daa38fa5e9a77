use anyhow::{Context, Result};
use imagere_core::{transform, OutputFormat, TransformParams};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "bmp", "tif", "tiff"];

struct ProcessedFile {
    input_bytes: usize,
    output_bytes: usize,
}

pub fn execute(paths: Vec<String>, params: TransformParams, out_dir: PathBuf) -> Result<()> {
    let image_paths = collect_image_paths(paths)?;

    if image_paths.is_empty() {
        anyhow::bail!("No images found in the provided paths");
    }

    check_output_collisions(&image_paths, &params, &out_dir)?;

    fs::create_dir_all(&out_dir)
        .with_context(|| format!("Failed to create output directory: {}", out_dir.display()))?;

    println!("Images: {}", image_paths.len());
    println!("Output: {}\n", out_dir.display());

    let pb = ProgressBar::new(image_paths.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .expect("Invalid progress bar template")
            .progress_chars("█▓▒░ "),
    );
    pb.set_message("Processing images...");

    // CPU-bound: decode/resize/encode in parallel
    let results = image_paths
        .par_iter()
        .map(|path| {
            let processed = process_file(path, &params, &out_dir)?;
            pb.inc(1);
            pb.set_message(format!("Processed: {}", path.display()));
            Ok::<_, anyhow::Error>(processed)
        })
        .collect::<Result<Vec<_>>>()?;

    pb.finish_with_message("Processing complete");

    let input_bytes: usize = results.iter().map(|r| r.input_bytes).sum();
    let output_bytes: usize = results.iter().map(|r| r.output_bytes).sum();

    println!();
    println!("✓ Processed {} images", results.len());
    println!("  {} bytes -> {} bytes", input_bytes, output_bytes);

    Ok(())
}

fn process_file(path: &Path, params: &TransformParams, out_dir: &Path) -> Result<ProcessedFile> {
    let data = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;

    let transformed = transform(&data, params)
        .with_context(|| format!("Failed to process {}", path.display()))?;

    let output = output_path(out_dir, path, transformed.format);
    fs::write(&output, &transformed.data)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    tracing::debug!(
        "{} -> {} ({}x{}, {} bytes)",
        path.display(),
        output.display(),
        transformed.width,
        transformed.height,
        transformed.data.len()
    );

    Ok(ProcessedFile {
        input_bytes: data.len(),
        output_bytes: transformed.data.len(),
    })
}

fn output_path(out_dir: &Path, input: &Path, format: OutputFormat) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "image".to_string());

    out_dir.join(format!("{stem}.{}", format.extension()))
}

/// Where `input` will be written, assuming its extension matches its content.
fn planned_output(out_dir: &Path, input: &Path, params: &TransformParams) -> PathBuf {
    let format = params
        .format
        .or_else(|| {
            input
                .extension()
                .and_then(|ext| ext.to_str())
                .and_then(|ext| ext.parse().ok())
        })
        .unwrap_or(OutputFormat::Png);

    output_path(out_dir, input, format)
}

/// Outputs are flattened to `<stem>.<ext>`, so inputs from different
/// directories can land on the same file.
fn check_output_collisions(paths: &[PathBuf], params: &TransformParams, out_dir: &Path) -> Result<()> {
    let mut planned: HashMap<PathBuf, &Path> = HashMap::new();

    for path in paths {
        let output = planned_output(out_dir, path, params);
        if let Some(previous) = planned.insert(output.clone(), path) {
            anyhow::bail!(
                "{} and {} would both be written to {}",
                previous.display(),
                path.display(),
                output.display()
            );
        }
    }

    Ok(())
}

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn collect_image_paths(paths: Vec<String>) -> Result<Vec<PathBuf>> {
    let mut image_paths = Vec::new();

    for path_str in paths {
        let path = Path::new(&path_str);

        if !path.exists() {
            anyhow::bail!("Path does not exist: {}", path.display());
        }

        if path.is_file() {
            if is_image_file(path) {
                image_paths.push(path.to_path_buf());
            }
        } else if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let entry_path = entry.path();
                if entry_path.is_file() && is_image_file(entry_path) {
                    image_paths.push(entry_path.to_path_buf());
                }
            }
        }
    }

    image_paths.sort();

    Ok(image_paths)
}

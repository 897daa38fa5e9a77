use image::GenericImageView;

use crate::error::TransformError;
use crate::transform::{decode, encode_jpeg, fit_inside};

/// Uploads larger than this are shrunk client-side before being sent.
pub const UPLOAD_SOFT_LIMIT: usize = 4 * 1024 * 1024;

const DEFAULT_MAX_DIMENSION: u32 = 2048;
const DEFAULT_QUALITIES: [u8; 2] = [70, 50];

/// Fixed list of JPEG presets tried in order until the result fits.
#[derive(Debug, Clone)]
pub struct CompressionLadder {
    pub max_dimension: u32,
    pub qualities: Vec<u8>,
}

#[derive(Debug)]
pub enum FitOutcome {
    /// Already under the limit; send the original bytes.
    Unchanged,
    Compressed {
        data: Vec<u8>,
        original_bytes: usize,
        quality: u8,
    },
}

impl Default for CompressionLadder {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
            qualities: DEFAULT_QUALITIES.to_vec(),
        }
    }
}

impl CompressionLadder {
    pub fn fit_under(&self, data: &[u8], max_bytes: usize) -> Result<FitOutcome, TransformError> {
        if data.len() <= max_bytes {
            return Ok(FitOutcome::Unchanged);
        }

        tracing::info!(
            "Image of {} exceeds the {} limit, compressing",
            megabytes(data.len()),
            megabytes(max_bytes)
        );

        let (img, _) = decode(data)?;
        let (width, height) = img.dimensions();
        let img = fit_inside(img, Some(self.max_dimension), Some(self.max_dimension));
        let (scaled_width, scaled_height) = img.dimensions();

        tracing::debug!(
            "Scaled {}x{} -> {}x{} for compression",
            width,
            height,
            scaled_width,
            scaled_height
        );

        let mut smallest: Option<usize> = None;

        for &quality in &self.qualities {
            let candidate = encode_jpeg(&img, quality)?;
            tracing::debug!("Quality {}: {}", quality, megabytes(candidate.len()));

            if candidate.len() <= max_bytes {
                return Ok(FitOutcome::Compressed {
                    data: candidate,
                    original_bytes: data.len(),
                    quality,
                });
            }

            smallest = Some(smallest.map_or(candidate.len(), |s| s.min(candidate.len())));
        }

        Err(TransformError::TooLargeAfterCompression {
            smallest: smallest.unwrap_or(data.len()),
            limit: max_bytes,
        })
    }
}

impl FitOutcome {
    /// Message shown to the user after a successful compression.
    pub fn summary(&self) -> Option<String> {
        match self {
            FitOutcome::Unchanged => None,
            FitOutcome::Compressed {
                data,
                original_bytes,
                ..
            } => Some(format!(
                "Image compressed from {} to {}",
                megabytes(*original_bytes),
                megabytes(data.len())
            )),
        }
    }
}

fn megabytes(bytes: usize) -> String {
    format!("{:.2}MB", bytes as f64 / (1024.0 * 1024.0))
}

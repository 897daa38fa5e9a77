use image::ImageFormat;
use std::fmt;
use std::str::FromStr;

use crate::error::TransformError;

/// Quality used for lossy encoders when the request doesn't specify one.
pub const DEFAULT_QUALITY: u8 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
    Webp,
}

impl OutputFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::Webp => "image/webp",
        }
    }

    /// Lowercase name accepted by the `format` parameter.
    pub fn name(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
            OutputFormat::Webp => "webp",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::Webp => "webp",
        }
    }

    /// Maps a sniffed source format onto one we can emit, if any.
    pub fn from_image_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(OutputFormat::Jpeg),
            ImageFormat::Png => Some(OutputFormat::Png),
            ImageFormat::WebP => Some(OutputFormat::Webp),
            _ => None,
        }
    }

    pub fn from_mime_type(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim();
        match essence.to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(OutputFormat::Jpeg),
            "image/png" => Some(OutputFormat::Png),
            "image/webp" => Some(OutputFormat::Webp),
            _ => None,
        }
    }
}

impl FromStr for OutputFormat {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::Webp),
            _ => Err(TransformError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Jpeg => "JPEG",
            OutputFormat::Png => "PNG",
            OutputFormat::Webp => "WebP",
        };
        f.write_str(name)
    }
}

/// The four optional knobs of a transform request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformParams {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub quality: Option<u8>,
    pub format: Option<OutputFormat>,
}

impl TransformParams {
    /// Parse raw query values. Blank values count as absent.
    pub fn parse(
        width: Option<&str>,
        height: Option<&str>,
        quality: Option<&str>,
        format: Option<&str>,
    ) -> Result<Self, TransformError> {
        Ok(Self {
            width: parse_dimension("width", width)?,
            height: parse_dimension("height", height)?,
            quality: parse_quality(quality)?,
            format: present(format).map(OutputFormat::from_str).transpose()?,
        })
    }

    pub fn wants_resize(&self) -> bool {
        self.width.is_some() || self.height.is_some()
    }

    pub fn effective_quality(&self) -> u8 {
        self.quality.unwrap_or(DEFAULT_QUALITY)
    }

    /// Non-empty parameters as query pairs, in a stable order.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(width) = self.width {
            pairs.push(("width", width.to_string()));
        }
        if let Some(height) = self.height {
            pairs.push(("height", height.to_string()));
        }
        if let Some(quality) = self.quality {
            pairs.push(("quality", quality.to_string()));
        }
        if let Some(format) = self.format {
            pairs.push(("format", format.name().to_string()));
        }
        pairs
    }
}

fn present(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|value| !value.is_empty())
}

fn parse_dimension(name: &'static str, raw: Option<&str>) -> Result<Option<u32>, TransformError> {
    let Some(value) = present(raw) else {
        return Ok(None);
    };

    match value.parse::<u32>() {
        Ok(n) if n > 0 => Ok(Some(n)),
        _ => Err(TransformError::InvalidParameter {
            name,
            value: value.to_string(),
        }),
    }
}

fn parse_quality(raw: Option<&str>) -> Result<Option<u8>, TransformError> {
    let Some(value) = present(raw) else {
        return Ok(None);
    };

    match value.parse::<u8>() {
        Ok(q) if (1..=100).contains(&q) => Ok(Some(q)),
        _ => Err(TransformError::InvalidParameter {
            name: "quality",
            value: value.to_string(),
        }),
    }
}

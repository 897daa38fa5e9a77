pub mod error;
pub mod params;
pub mod precompress;
pub mod transform;

pub use error::TransformError;
pub use params::{OutputFormat, TransformParams, DEFAULT_QUALITY};
pub use precompress::{CompressionLadder, FitOutcome, UPLOAD_SOFT_LIMIT};
pub use transform::{transform, TransformedImage};

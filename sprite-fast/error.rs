use sprite_core::ConfigIssue;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum FastError {
    #[error("Invalid image dimensions: {width}x{height} (must be > 0)")]
    InvalidImageSize { width: usize, height: usize },

    #[error("Image data length mismatch: expected {expected_len}, got {actual_len}")]
    InvalidImageData { expected_len: usize, actual_len: usize },

    #[error("Invalid detector configuration: {0}")]
    InvalidConfig(#[from] ConfigIssue),
}

pub type FastResult<T> = Result<T, FastError>;

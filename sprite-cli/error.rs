use sprite_fast::FastError;
use sprite_match::MatchError;
use thiserror::Error;

use crate::compare::CompareError;
use crate::config::ConfigError;
use crate::locate::LocateError;

/// Any failure surfaced by the sprite tooling
#[derive(Debug, Error)]
pub enum SpriteError {
    #[error("Feature detection failed: {0}")]
    Fast(#[from] FastError),

    #[error(transparent)]
    Match(#[from] MatchError),

    #[error("Comparison failed: {0}")]
    Compare(#[from] CompareError),

    #[error("Sprite extraction failed: {0}")]
    Locate(#[from] LocateError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type SpriteResult<T> = Result<T, SpriteError>;

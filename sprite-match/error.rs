use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatchError {
    #[error("Homography could not be resolved: {reason}")]
    HomographyUnresolved { reason: String },

    #[error("Point sets differ in length: {src} source vs {dst} destination")]
    PointCountMismatch { src: usize, dst: usize },
}

impl MatchError {
    pub(crate) fn unresolved(reason: impl Into<String>) -> Self {
        MatchError::HomographyUnresolved { reason: reason.into() }
    }
}

pub type MatchResult<T> = Result<T, MatchError>;

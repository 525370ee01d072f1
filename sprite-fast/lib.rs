//! FAST-9 keypoint detection over an image pyramid.
//!
//! Corners are scored with the Harris response, thinned with non-maximum
//! suppression, capped to a per-level budget and oriented with the
//! intensity centroid of their patch.

mod corner_detection;
mod detector;
mod error;
mod refinement;
mod types;
pub mod utils;

pub use corner_detection::CornerDetector;
pub use detector::FastDetector;
pub use error::{FastError, FastResult};
pub use refinement::KeypointRefinement;
pub use types::ScoredKeypoint;

//! Descriptor matching and geometric verification.
//!
//! [`BruteForceMatcher`] pairs binary descriptors by Hamming distance,
//! [`good_matches`] keeps the closest pairs, [`find_homography_ransac`] fits a
//! projective model to them and [`BoundingBox`] turns projected template
//! corners into a crop rectangle.

mod error;
mod homography;
mod matcher;
mod region;

pub use error::{MatchError, MatchResult};
pub use homography::{find_homography_ransac, Homography, RansacParams, RansacReport};
pub use matcher::{good_matches, hamming_distance, to_float_descriptors, BruteForceMatcher, HammingCode, Norm};
pub use region::{template_corners, BoundingBox};

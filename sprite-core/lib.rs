mod pyramid;

pub use pyramid::{ImagePyramid, ScaleLevel};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Row-major 8-bit grayscale image
pub type Image = Vec<u8>;

/// Maximum number of lowest-distance matches fed to homography estimation
pub const GOOD_MATCH_LIMIT: usize = 10;

/// RANSAC inlier threshold, in pixels of reprojection error
pub const RANSAC_REPROJ_THRESHOLD: f64 = 5.0;

/// Key-point ≙ FAST corner + orientation (radians), expressed in level-0 coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    /// Harris corner response used for ranking
    pub response: f32,
    /// Pyramid level the keypoint was detected on
    pub octave: usize,
    /// Patch diameter scaled back to level 0
    pub size: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            angle: 0.0,
            response: 0.0,
            octave: 0,
            size: 0.0,
        }
    }

    pub fn pt(&self) -> (f32, f32) {
        (self.x, self.y)
    }
}

/// 256-bit binary descriptor = 32 bytes
pub type Descriptor = [u8; 32];

/// Descriptor bytes re-encoded as floats, one value per byte
pub type FloatDescriptor = [f32; 32];

/// Descriptor correspondence. `query_idx` indexes the screenshot set,
/// `train_idx` the template set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    pub query_idx: usize,
    pub train_idx: usize,
    pub distance: f32,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct OrbConfig {
    /// FAST intensity threshold
    pub threshold: u8,
    /// Orientation / descriptor patch diameter (odd)
    pub patch_size: usize,
    pub n_threads: usize,
    /// Total keypoint budget across all pyramid levels
    pub n_features: usize,
    pub scale_factor: f32,
    pub n_levels: usize,
    /// Border in which no keypoints are detected
    pub edge_threshold: usize,
}

impl Default for OrbConfig {
    fn default() -> Self {
        Self {
            threshold: 20,
            patch_size: 31,
            n_threads: num_cpus::get().max(1),
            n_features: 500,
            scale_factor: 1.2,
            n_levels: 8,
            edge_threshold: 31,
        }
    }
}

/// Reasons an [`OrbConfig`] is rejected
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigIssue {
    Threshold(u8),
    PatchSize(usize),
    ScaleFactor(f32),
    Levels(usize),
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigIssue::Threshold(t) => write!(f, "invalid threshold {} (must be 1-127)", t),
            ConfigIssue::PatchSize(p) => write!(f, "invalid patch size {} (must be odd and >= 3)", p),
            ConfigIssue::ScaleFactor(s) => write!(f, "invalid scale factor {} (must be > 1.0)", s),
            ConfigIssue::Levels(n) => write!(f, "invalid pyramid level count {}", n),
        }
    }
}

impl std::error::Error for ConfigIssue {}

impl OrbConfig {
    pub fn validate(&self) -> Result<(), ConfigIssue> {
        if self.threshold == 0 || self.threshold > 127 {
            return Err(ConfigIssue::Threshold(self.threshold));
        }
        if self.patch_size % 2 == 0 || self.patch_size < 3 {
            return Err(ConfigIssue::PatchSize(self.patch_size));
        }
        if !(self.scale_factor > 1.0) {
            return Err(ConfigIssue::ScaleFactor(self.scale_factor));
        }
        if self.n_levels == 0 {
            return Err(ConfigIssue::Levels(self.n_levels));
        }
        Ok(())
    }

    /// Keypoint budget per pyramid level, shrinking geometrically with scale
    pub fn features_per_level(&self, levels: usize) -> Vec<usize> {
        if levels == 0 {
            return Vec::new();
        }
        let factor = 1.0 / self.scale_factor as f64;
        let denom = 1.0 - factor.powi(levels as i32);
        let mut per_level = self.n_features as f64 * (1.0 - factor) / denom;

        let mut budget = Vec::with_capacity(levels);
        let mut assigned = 0usize;
        for _ in 0..levels - 1 {
            let n = per_level.round() as usize;
            budget.push(n);
            assigned += n;
            per_level *= factor;
        }
        budget.push(self.n_features.saturating_sub(assigned));
        budget
    }
}

/// Initialize Rayon thread pool with the specified number of threads
pub fn init_thread_pool(n_threads: usize) -> Result<(), rayon::ThreadPoolBuildError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .build_global()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(OrbConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_configs() {
        let mut cfg = OrbConfig::default();
        cfg.threshold = 0;
        assert_eq!(cfg.validate(), Err(ConfigIssue::Threshold(0)));

        let mut cfg = OrbConfig::default();
        cfg.patch_size = 30;
        assert_eq!(cfg.validate(), Err(ConfigIssue::PatchSize(30)));

        let mut cfg = OrbConfig::default();
        cfg.scale_factor = 1.0;
        assert!(matches!(cfg.validate(), Err(ConfigIssue::ScaleFactor(_))));

        let mut cfg = OrbConfig::default();
        cfg.n_levels = 0;
        assert_eq!(cfg.validate(), Err(ConfigIssue::Levels(0)));
    }

    #[test]
    fn test_features_per_level_sums_to_budget() {
        let cfg = OrbConfig::default();
        for levels in 1..=8 {
            let budget = cfg.features_per_level(levels);
            assert_eq!(budget.len(), levels);
            assert_eq!(budget.iter().sum::<usize>(), cfg.n_features);
        }
        // Coarser levels get fewer features
        let budget = cfg.features_per_level(8);
        assert!(budget[0] > budget[1]);
    }

    #[test]
    fn test_tuning_constants() {
        assert_eq!(GOOD_MATCH_LIMIT, 10);
        assert_eq!(RANSAC_REPROJ_THRESHOLD, 5.0);
    }
}

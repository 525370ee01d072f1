use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sprite_core::{ConfigIssue, OrbConfig, GOOD_MATCH_LIMIT, RANSAC_REPROJ_THRESHOLD};
use sprite_match::RansacParams;
use thiserror::Error;

/// Smallest match count a homography can be fitted from
const MIN_GOOD_MATCHES: usize = 4;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid ORB settings: {0}")]
    Orb(#[from] ConfigIssue),

    #[error("good_match_limit must be at least 4, got {0}")]
    GoodMatchLimit(usize),

    #[error("Invalid RANSAC settings: {0}")]
    Ransac(String),
}

/// Tuning for the template locator. Missing keys fall back to defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Number of lowest-distance matches passed to homography estimation
    pub good_match_limit: usize,
    /// Reprojection error, in pixels, below which a match is an inlier
    pub ransac_threshold: f64,
    pub ransac_max_iters: usize,
    pub ransac_confidence: f64,
    pub ransac_seed: u64,
    // Tables serialize after plain values in TOML
    pub orb: OrbConfig,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        let ransac = RansacParams::default();
        Self {
            good_match_limit: GOOD_MATCH_LIMIT,
            ransac_threshold: RANSAC_REPROJ_THRESHOLD,
            ransac_max_iters: ransac.max_iters,
            ransac_confidence: ransac.confidence,
            ransac_seed: ransac.seed,
            orb: OrbConfig::default(),
        }
    }
}

impl LocatorConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load_toml(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.orb.validate()?;
        if self.good_match_limit < MIN_GOOD_MATCHES {
            return Err(ConfigError::GoodMatchLimit(self.good_match_limit));
        }
        if !(self.ransac_threshold > 0.0) {
            return Err(ConfigError::Ransac(format!(
                "threshold must be positive, got {}",
                self.ransac_threshold
            )));
        }
        if !(self.ransac_confidence > 0.0 && self.ransac_confidence < 1.0) {
            return Err(ConfigError::Ransac(format!(
                "confidence must lie in (0, 1), got {}",
                self.ransac_confidence
            )));
        }
        if self.ransac_max_iters == 0 {
            return Err(ConfigError::Ransac("max_iters must be non-zero".to_string()));
        }
        Ok(())
    }

    pub fn ransac_params(&self) -> RansacParams {
        RansacParams {
            threshold: self.ransac_threshold,
            max_iters: self.ransac_max_iters,
            confidence: self.ransac_confidence,
            seed: self.ransac_seed,
        }
    }
}

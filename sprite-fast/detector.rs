use log::debug;
use rayon::prelude::*;
use sprite_core::{Image, ImagePyramid, Keypoint, OrbConfig, ScaleLevel};

use crate::corner_detection::CornerDetector;
use crate::error::{FastError, FastResult};
use crate::refinement::KeypointRefinement;

/// Minimum spacing between keypoints kept on one level
const NMS_RADIUS: f32 = 3.0;

/// Multi-scale FAST corner detector
pub struct FastDetector {
    cfg: OrbConfig,
    w: usize,
    h: usize,
}

impl FastDetector {
    /// Creates a new FAST detector with validation
    pub fn new(cfg: OrbConfig, width: usize, height: usize) -> FastResult<Self> {
        if width == 0 || height == 0 {
            return Err(FastError::InvalidImageSize { width, height });
        }
        cfg.validate()?;

        Ok(Self { cfg, w: width, h: height })
    }

    /// Validates image data before processing
    fn validate_image(&self, img: &Image) -> FastResult<()> {
        let expected_len = self.w * self.h;
        if img.len() != expected_len {
            return Err(FastError::InvalidImageData {
                expected_len,
                actual_len: img.len(),
            });
        }
        Ok(())
    }

    /// Build the pyramid this detector works on
    pub fn build_pyramid(&self, img: &Image) -> FastResult<ImagePyramid> {
        self.validate_image(img)?;
        Ok(ImagePyramid::build(img, self.w, self.h, &self.cfg))
    }

    /// Detect keypoints on a freshly built pyramid
    pub fn detect_keypoints(&self, img: &Image) -> FastResult<Vec<Keypoint>> {
        let pyramid = self.build_pyramid(img)?;
        Ok(self.detect_in_pyramid(&pyramid))
    }

    /// Detect oriented keypoints on every pyramid level. Coordinates are
    /// returned in level-0 pixels.
    pub fn detect_in_pyramid(&self, pyramid: &ImagePyramid) -> Vec<Keypoint> {
        let budget = self.cfg.features_per_level(pyramid.len());

        let per_level: Vec<Vec<Keypoint>> = pyramid
            .iter()
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|(scale_level, level_img)| {
                self.detect_at_level(level_img, scale_level, budget[scale_level.level])
            })
            .collect();

        for (level, kps) in per_level.iter().enumerate() {
            debug!("pyramid level {}: {} keypoints", level, kps.len());
        }

        per_level.into_iter().flatten().collect()
    }

    fn detect_at_level(&self, img: &Image, scale_level: &ScaleLevel, budget: usize) -> Vec<Keypoint> {
        let corners = CornerDetector::detect_at_level(img, scale_level, self.cfg.threshold, self.cfg.edge_threshold);
        let suppressed = KeypointRefinement::non_maximum_suppression(&corners, NMS_RADIUS);
        let best = KeypointRefinement::retain_best(suppressed, budget);

        best.into_iter()
            .map(|sk| {
                let mut kp = sk.keypoint;
                kp.angle = KeypointRefinement::compute_orientation(
                    img,
                    scale_level.width,
                    scale_level.height,
                    kp.x,
                    kp.y,
                    self.cfg.patch_size,
                );
                kp.x *= scale_level.scale;
                kp.y *= scale_level.scale;
                kp.size = self.cfg.patch_size as f32 * scale_level.scale;
                kp
            })
            .collect()
    }

    /// Get detector configuration
    pub fn config(&self) -> &OrbConfig {
        &self.cfg
    }

    /// Get image dimensions
    pub fn dimensions(&self) -> (usize, usize) {
        (self.w, self.h)
    }
}

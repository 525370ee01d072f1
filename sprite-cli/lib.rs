//! High-level sprite tooling: ORB extraction, template location and strict
//! image equality.

pub mod args;
mod compare;
mod config;
mod error;
mod locate;

use std::path::Path;

use image::{DynamicImage, ImageReader, ImageResult};
use sprite_brief::BriefGenerator;
use sprite_core::{Descriptor, Image, Keypoint, OrbConfig};
use sprite_fast::{FastDetector, FastResult};

pub use compare::{compare_images, diff_images, resize_to_match, ChannelDiff, CompareError, CompareResult};
pub use config::{ConfigError, LocatorConfig};
pub use error::{SpriteError, SpriteResult};
pub use locate::{
    LocateError, LocateOutcome, LocateResult, Location, SpriteLocator, DEFAULT_OUTPUT_PATH, DEFAULT_SCREENSHOT_PATH,
    DEFAULT_TEMPLATE_PATH,
};
pub use sprite_core::{self, init_thread_pool, OrbConfig as Config};

/// ORB feature extractor: multi-scale FAST keypoints with rotated BRIEF descriptors
pub struct OrbExtractor {
    fast_detector: FastDetector,
    brief_generator: BriefGenerator,
}

impl OrbExtractor {
    /// Create an extractor for images of the given dimensions
    pub fn new(cfg: OrbConfig, width: usize, height: usize) -> FastResult<Self> {
        let brief_generator = BriefGenerator::new(cfg.patch_size);
        let fast_detector = FastDetector::new(cfg, width, height)?;

        Ok(Self {
            fast_detector,
            brief_generator,
        })
    }

    /// Detect keypoints only
    pub fn detect_keypoints(&self, img: &Image) -> FastResult<Vec<Keypoint>> {
        self.fast_detector.detect_keypoints(img)
    }

    /// Detect keypoints and describe them on a single shared pyramid.
    /// Descriptors are returned in keypoint order.
    pub fn detect_and_describe(&self, img: &Image) -> FastResult<(Vec<Keypoint>, Vec<Descriptor>)> {
        let pyramid = self.fast_detector.build_pyramid(img)?;
        let kps = self.fast_detector.detect_in_pyramid(&pyramid);
        let desc = self.brief_generator.generate_descriptors(&pyramid, &kps);
        Ok((kps, desc))
    }

    pub fn config(&self) -> &OrbConfig {
        self.fast_detector.config()
    }

    pub fn dimensions(&self) -> (usize, usize) {
        self.fast_detector.dimensions()
    }
}

/// Open and decode an image, guessing the format from its contents
pub(crate) fn open_image(path: &Path) -> ImageResult<DynamicImage> {
    ImageReader::open(path)?.with_guessed_format()?.decode()
}

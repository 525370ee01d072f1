use std::path::{Path, PathBuf};

use image::{imageops, GrayImage};
use log::{debug, info, warn};
use sprite_core::{Descriptor, Keypoint, Match};
use sprite_fast::FastError;
use sprite_match::{
    find_homography_ransac, good_matches, template_corners, to_float_descriptors, BoundingBox,
    BruteForceMatcher, Homography, MatchError, Norm,
};
use thiserror::Error;

use crate::config::{ConfigError, LocatorConfig};
use crate::{open_image, OrbExtractor};

pub const DEFAULT_SCREENSHOT_PATH: &str = "hq720.jpg";
pub const DEFAULT_TEMPLATE_PATH: &str = "charizard.png";
pub const DEFAULT_OUTPUT_PATH: &str = "pokemon_sprite.png";

#[derive(Debug, Error)]
pub enum LocateError {
    #[error("Failed to load image {path:?}: {source}")]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to save sprite to {path:?}: {source}")]
    ImageSave {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Feature detection failed: {0}")]
    Detection(#[from] FastError),

    #[error(transparent)]
    Homography(#[from] MatchError),

    #[error("Projected region {region} does not overlap the {width}x{height} screenshot")]
    EmptyRegion { region: BoundingBox, width: u32, height: u32 },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type LocateResult<T> = Result<T, LocateError>;

/// Where a template was found inside a screenshot
#[derive(Debug, Clone)]
pub struct Location {
    /// Template-to-screenshot transform
    pub homography: Homography,
    /// Template corners projected into the screenshot
    pub corners: Vec<(f64, f64)>,
    /// Box around the projected corners, possibly outside the screenshot
    pub projected: BoundingBox,
    /// `projected` clamped to the screenshot
    pub region: BoundingBox,
    pub good_matches: Vec<Match>,
    pub inliers: usize,
}

#[derive(Debug, Clone)]
pub enum LocateOutcome {
    /// The template has no usable features; nothing was written
    NoTemplateDescriptors,
    Extracted {
        region: BoundingBox,
        output: PathBuf,
        good_matches: Vec<Match>,
        inliers: usize,
    },
}

/// Finds a template image inside a screenshot by ORB matching and a RANSAC
/// homography, and crops the matching region.
pub struct SpriteLocator {
    config: LocatorConfig,
    matcher: BruteForceMatcher,
}

impl SpriteLocator {
    pub fn new(config: LocatorConfig) -> LocateResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            matcher: BruteForceMatcher::new(Norm::Hamming).cross_check(true),
        })
    }

    pub fn config(&self) -> &LocatorConfig {
        &self.config
    }

    fn describe(&self, img: &GrayImage) -> LocateResult<(Vec<Keypoint>, Vec<Descriptor>)> {
        let (w, h) = img.dimensions();
        let orb = OrbExtractor::new(self.config.orb.clone(), w as usize, h as usize)?;
        Ok(orb.detect_and_describe(img.as_raw())?)
    }

    /// Locate `template` inside `screenshot`. `Ok(None)` when the template
    /// yields no descriptors.
    pub fn locate(&self, screenshot: &GrayImage, template: &GrayImage) -> LocateResult<Option<Location>> {
        let (tmpl_kps, tmpl_desc) = self.describe(template)?;
        if tmpl_desc.is_empty() {
            warn!("template produced no descriptors");
            return Ok(None);
        }
        let (shot_kps, shot_desc) = self.describe(screenshot)?;
        debug!(
            "{} template keypoints, {} screenshot keypoints",
            tmpl_kps.len(),
            shot_kps.len()
        );

        let query = to_float_descriptors(&shot_desc);
        let train = to_float_descriptors(&tmpl_desc);
        let matches = self.matcher.match_descriptors(&query, &train);
        let good = good_matches(matches, self.config.good_match_limit);
        if good.len() < self.config.good_match_limit {
            warn!(
                "only {} good matches (limit {})",
                good.len(),
                self.config.good_match_limit
            );
        }

        let src: Vec<(f64, f64)> = good.iter().map(|m| point(&tmpl_kps[m.train_idx])).collect();
        let dst: Vec<(f64, f64)> = good.iter().map(|m| point(&shot_kps[m.query_idx])).collect();
        let (homography, report) = find_homography_ransac(&src, &dst, &self.config.ransac_params())?;
        debug!(
            "homography from {} inliers of {} after {} iterations",
            report.inlier_count,
            good.len(),
            report.iterations
        );

        let (tw, th) = template.dimensions();
        let corners = homography.perspective_transform(&template_corners(tw, th))?;
        let projected = BoundingBox::from_corners(&corners).ok_or_else(|| MatchError::HomographyUnresolved {
            reason: "projected corners are not finite".to_string(),
        })?;

        let (sw, sh) = screenshot.dimensions();
        if !projected.fits_within(sw, sh) {
            warn!("projected region {} exceeds the {}x{} screenshot, clamping", projected, sw, sh);
        }
        let region = projected.clamp_to(sw, sh).ok_or(LocateError::EmptyRegion {
            region: projected,
            width: sw,
            height: sh,
        })?;

        Ok(Some(Location {
            homography,
            corners,
            projected,
            region,
            good_matches: good,
            inliers: report.inlier_count,
        }))
    }

    /// Cut the located region out of the screenshot
    pub fn crop(screenshot: &GrayImage, region: &BoundingBox) -> GrayImage {
        imageops::crop_imm(
            screenshot,
            region.x_min as u32,
            region.y_min as u32,
            region.width() as u32,
            region.height() as u32,
        )
        .to_image()
    }

    /// Locate the template in the screenshot and write the grayscale crop to
    /// `output`, overwriting any existing file.
    pub fn extract_sprite(
        &self,
        screenshot_path: impl AsRef<Path>,
        template_path: impl AsRef<Path>,
        output: impl AsRef<Path>,
    ) -> LocateResult<LocateOutcome> {
        let screenshot = load_gray(screenshot_path.as_ref())?;
        let template = load_gray(template_path.as_ref())?;

        let Some(location) = self.locate(&screenshot, &template)? else {
            return Ok(LocateOutcome::NoTemplateDescriptors);
        };

        let output = output.as_ref();
        Self::crop(&screenshot, &location.region)
            .save(output)
            .map_err(|source| LocateError::ImageSave {
                path: output.to_path_buf(),
                source,
            })?;
        info!("saved {} region to {:?}", location.region, output);

        Ok(LocateOutcome::Extracted {
            region: location.region,
            output: output.to_path_buf(),
            good_matches: location.good_matches,
            inliers: location.inliers,
        })
    }
}

fn point(kp: &Keypoint) -> (f64, f64) {
    (kp.x as f64, kp.y as f64)
}

fn load_gray(path: &Path) -> LocateResult<GrayImage> {
    open_image(path)
        .map(|img| img.to_luma8())
        .map_err(|source| LocateError::ImageLoad {
            path: path.to_path_buf(),
            source,
        })
}

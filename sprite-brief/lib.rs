use image::GrayImage;
use imageproc::filter::gaussian_blur_f32;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use sprite_core::{Descriptor, Image, ImagePyramid, Keypoint, ScaleLevel};

const DESCRIPTOR_BITS: usize = 256;

/// Fixed seed so every run samples the same test pattern
const PATTERN_SEED: u64 = 0x0b5e_55ed;

/// Smoothing applied to each level before binary tests
const SMOOTHING_SIGMA: f32 = 2.0;

/// One intensity comparison: `(x1, y1, x2, y2)` relative to the keypoint
type TestPair = (f32, f32, f32, f32);

pub struct BriefGenerator {
    pattern: Vec<TestPair>,
}

impl BriefGenerator {
    /// Build the sampling pattern for a patch of `patch_size` pixels
    pub fn new(patch_size: usize) -> Self {
        // Keep a 2 pixel margin inside the patch for rotation and interpolation
        let reach = ((patch_size / 2) as i32 - 2).max(1);
        let mut rng = StdRng::seed_from_u64(PATTERN_SEED);

        let pattern = (0..DESCRIPTOR_BITS)
            .map(|_| {
                let mut coord = || rng.gen_range(-reach..=reach) as f32;
                (coord(), coord(), coord(), coord())
            })
            .collect();

        Self { pattern }
    }

    pub fn pattern_len(&self) -> usize {
        self.pattern.len()
    }

    /// One descriptor per keypoint, in keypoint order. Each keypoint is
    /// sampled on its own pyramid level.
    pub fn generate_descriptors(&self, pyramid: &ImagePyramid, kps: &[Keypoint]) -> Vec<Descriptor> {
        if pyramid.is_empty() || kps.is_empty() {
            return Vec::new();
        }

        let smoothed: Vec<Image> = pyramid
            .iter()
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|(level, img)| Self::smooth(img, level))
            .collect();

        let last = pyramid.len() - 1;
        kps.par_iter()
            .map(|kp| {
                let octave = kp.octave.min(last);
                let level = &pyramid.levels()[octave];
                self.describe(&smoothed[octave], level, kp)
            })
            .collect()
    }

    fn smooth(img: &Image, level: &ScaleLevel) -> Image {
        match GrayImage::from_raw(level.width as u32, level.height as u32, img.clone()) {
            Some(gray) => gaussian_blur_f32(&gray, SMOOTHING_SIGMA).into_raw(),
            None => img.clone(),
        }
    }

    fn describe(&self, img: &Image, level: &ScaleLevel, kp: &Keypoint) -> Descriptor {
        let (s, c) = kp.angle.sin_cos();
        let (cx, cy) = (kp.x / level.scale, kp.y / level.scale);
        let mut d = [0u8; 32];

        for (i, &(dx1, dy1, dx2, dy2)) in self.pattern.iter().enumerate() {
            // Rotate the test pair into the keypoint frame
            let (rx1, ry1) = (cx + c * dx1 - s * dy1, cy + s * dx1 + c * dy1);
            let (rx2, ry2) = (cx + c * dx2 - s * dy2, cy + s * dx2 + c * dy2);

            let val1 = Self::bilinear_sample(img, level.width, level.height, rx1, ry1);
            let val2 = Self::bilinear_sample(img, level.width, level.height, rx2, ry2);

            let bit = (val1 < val2) as u8;
            d[i / 8] |= bit << (i % 8);
        }
        d
    }

    /// Bilinear interpolation for subpixel sampling
    fn bilinear_sample(img: &Image, w: usize, h: usize, x: f32, y: f32) -> f32 {
        let x0 = x.floor();
        let y0 = y.floor();
        let x1 = x0 + 1.0;
        let y1 = y0 + 1.0;

        if x0 < 0.0 || y0 < 0.0 || x1 >= w as f32 || y1 >= h as f32 {
            // Clamp to image bounds for boundary samples
            let cx = x.round().clamp(0.0, (w - 1) as f32) as usize;
            let cy = y.round().clamp(0.0, (h - 1) as f32) as usize;
            return img[cy * w + cx] as f32;
        }

        let dx = x - x0;
        let dy = y - y0;
        let (x0, y0, x1, y1) = (x0 as usize, y0 as usize, x1 as usize, y1 as usize);

        let p00 = img[y0 * w + x0] as f32;
        let p10 = img[y0 * w + x1] as f32;
        let p01 = img[y1 * w + x0] as f32;
        let p11 = img[y1 * w + x1] as f32;

        let top = p00 * (1.0 - dx) + p10 * dx;
        let bottom = p01 * (1.0 - dx) + p11 * dx;

        top * (1.0 - dy) + bottom * dy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprite_core::OrbConfig;

    fn config() -> OrbConfig {
        OrbConfig {
            edge_threshold: 10,
            n_levels: 3,
            n_threads: 1,
            ..OrbConfig::default()
        }
    }

    /// Deterministic texture with plenty of local structure
    fn textured_image(w: usize, h: usize) -> Image {
        (0..w * h)
            .map(|i| {
                let (x, y) = (i % w, i / w);
                (((x * 37) ^ (y * 91)) % 251) as u8
            })
            .collect()
    }

    fn keypoint(x: f32, y: f32, angle: f32) -> Keypoint {
        let mut kp = Keypoint::new(x, y);
        kp.angle = angle;
        kp
    }

    #[test]
    fn test_pattern_is_deterministic_and_inside_patch() {
        let a = BriefGenerator::new(31);
        let b = BriefGenerator::new(31);
        assert_eq!(a.pattern_len(), 256);
        assert_eq!(a.pattern, b.pattern);
        for &(x1, y1, x2, y2) in &a.pattern {
            for v in [x1, y1, x2, y2] {
                assert!(v.abs() <= 13.0);
            }
        }
    }

    #[test]
    fn test_one_descriptor_per_keypoint() {
        let (w, h) = (80, 80);
        let img = textured_image(w, h);
        let pyramid = ImagePyramid::build(&img, w, h, &config());
        let kps = vec![keypoint(40.0, 40.0, 0.0), keypoint(30.0, 50.0, 1.0), keypoint(2.0, 2.0, 0.3)];

        let descs = BriefGenerator::new(31).generate_descriptors(&pyramid, &kps);
        assert_eq!(descs.len(), kps.len());
    }

    #[test]
    fn test_uniform_image_gives_zero_descriptor() {
        let (w, h) = (64, 64);
        let pyramid = ImagePyramid::build(&vec![100; w * h], w, h, &config());
        let descs = BriefGenerator::new(31).generate_descriptors(&pyramid, &[keypoint(32.0, 32.0, 0.7)]);
        assert_eq!(descs[0], [0u8; 32]);
    }

    #[test]
    fn test_empty_pyramid() {
        let pyramid = ImagePyramid::build(&vec![0; 100], 10, 10, &config());
        let descs = BriefGenerator::new(31).generate_descriptors(&pyramid, &[keypoint(5.0, 5.0, 0.0)]);
        assert!(descs.is_empty());
    }

    #[test]
    fn test_rotation_changes_descriptor() {
        let (w, h) = (80, 80);
        let img = textured_image(w, h);
        let pyramid = ImagePyramid::build(&img, w, h, &config());
        let brief = BriefGenerator::new(31);
        let descs = brief.generate_descriptors(
            &pyramid,
            &[keypoint(40.0, 40.0, 0.0), keypoint(40.0, 40.0, std::f32::consts::FRAC_PI_2)],
        );
        assert_ne!(descs[0], descs[1]);
    }
}

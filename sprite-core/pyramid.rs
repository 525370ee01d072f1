use crate::{Image, OrbConfig};

/// Scale information for pyramid levels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleLevel {
    pub level: usize,
    pub scale: f32,
    pub width: usize,
    pub height: usize,
}

/// Image pyramid for multi-scale feature detection
#[derive(Debug, Clone)]
pub struct ImagePyramid {
    levels: Vec<ScaleLevel>,
    images: Vec<Image>,
}

impl ImagePyramid {
    /// Generate scale levels for a base image. Levels that cannot host a
    /// single pixel outside the detection border are dropped.
    pub fn generate_scale_levels(width: usize, height: usize, cfg: &OrbConfig) -> Vec<ScaleLevel> {
        let min_size = 2 * cfg.edge_threshold + 1;
        let mut levels = Vec::new();
        let mut current_scale = 1.0f32;

        for level in 0..cfg.n_levels {
            let scaled_width = ((width as f32) / current_scale).round() as usize;
            let scaled_height = ((height as f32) / current_scale).round() as usize;

            if scaled_width < min_size || scaled_height < min_size {
                break;
            }

            levels.push(ScaleLevel {
                level,
                scale: current_scale,
                width: scaled_width,
                height: scaled_height,
            });

            current_scale *= cfg.scale_factor;
        }

        levels
    }

    /// Build image pyramid from base image
    pub fn build(img: &Image, width: usize, height: usize, cfg: &OrbConfig) -> Self {
        let levels = Self::generate_scale_levels(width, height, cfg);
        let images = levels
            .iter()
            .map(|scale_level| {
                if scale_level.level == 0 {
                    img.clone()
                } else {
                    Self::downsample_image(img, width, height, scale_level.width, scale_level.height)
                }
            })
            .collect();

        Self { levels, images }
    }

    pub fn levels(&self) -> &[ScaleLevel] {
        &self.levels
    }

    pub fn image(&self, level: usize) -> Option<&Image> {
        self.images.get(level)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ScaleLevel, &Image)> {
        self.levels.iter().zip(self.images.iter())
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Downsample image using bilinear interpolation
    fn downsample_image(img: &Image, src_width: usize, src_height: usize, target_width: usize, target_height: usize) -> Image {
        let mut downsampled = vec![0u8; target_width * target_height];

        let x_ratio = src_width as f32 / target_width as f32;
        let y_ratio = src_height as f32 / target_height as f32;

        for y in 0..target_height {
            for x in 0..target_width {
                // Sample at pixel centres so the mapping stays unbiased
                let src_x = ((x as f32 + 0.5) * x_ratio - 0.5).max(0.0);
                let src_y = ((y as f32 + 0.5) * y_ratio - 0.5).max(0.0);

                let value = Self::bilinear_sample(img, src_width, src_height, src_x, src_y);
                downsampled[y * target_width + x] = value.round().clamp(0.0, 255.0) as u8;
            }
        }

        downsampled
    }

    /// Sample image at fractional coordinates using bilinear interpolation
    fn bilinear_sample(img: &Image, width: usize, height: usize, x: f32, y: f32) -> f32 {
        let x1 = (x.floor() as usize).min(width - 1);
        let y1 = (y.floor() as usize).min(height - 1);
        let x2 = (x1 + 1).min(width - 1);
        let y2 = (y1 + 1).min(height - 1);

        let fx = x - x1 as f32;
        let fy = y - y1 as f32;

        let p11 = img[y1 * width + x1] as f32;
        let p12 = img[y1 * width + x2] as f32;
        let p21 = img[y2 * width + x1] as f32;
        let p22 = img[y2 * width + x2] as f32;

        let interpolated_top = p11 * (1.0 - fx) + p12 * fx;
        let interpolated_bottom = p21 * (1.0 - fx) + p22 * fx;

        interpolated_top * (1.0 - fy) + interpolated_bottom * fy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> OrbConfig {
        OrbConfig {
            edge_threshold: 8,
            n_threads: 1,
            ..OrbConfig::default()
        }
    }

    #[test]
    fn test_scale_levels_shrink() {
        let levels = ImagePyramid::generate_scale_levels(200, 100, &small_config());
        assert_eq!(levels[0].width, 200);
        assert_eq!(levels[0].height, 100);
        for pair in levels.windows(2) {
            assert!(pair[1].width < pair[0].width);
            assert!(pair[1].scale > pair[0].scale);
        }
        assert!(levels.len() <= 8);
    }

    #[test]
    fn test_too_small_image_has_no_levels() {
        let cfg = OrbConfig::default();
        let levels = ImagePyramid::generate_scale_levels(40, 40, &cfg);
        assert!(levels.is_empty());
    }

    #[test]
    fn test_uniform_image_stays_uniform() {
        let img = vec![77u8; 120 * 90];
        let pyramid = ImagePyramid::build(&img, 120, 90, &small_config());
        assert!(!pyramid.is_empty());
        for (level, data) in pyramid.iter() {
            assert_eq!(data.len(), level.width * level.height);
            assert!(data.iter().all(|&v| v == 77));
        }
    }
}

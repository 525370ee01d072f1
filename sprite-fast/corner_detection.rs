use rayon::prelude::*;
use sprite_core::{Image, Keypoint, ScaleLevel};

use crate::types::ScoredKeypoint;
use crate::utils::has_contiguous_arc;

/// Contiguous circle pixels required by the segment test
const FAST_ARC: u32 = 9;

/// Harris detector free parameter
const HARRIS_K: f32 = 0.04;

/// Corner detection algorithms (FAST and Harris)
pub struct CornerDetector;

impl CornerDetector {
    /// FAST circle offsets, in circle order
    pub const FAST_OFFSETS: [(i32, i32); 16] = [
        (0, -3), (1, -3), (2, -2), (3, -1),
        (3, 0), (3, 1), (2, 2), (1, 3),
        (0, 3), (-1, 3), (-2, 2), (-3, 1),
        (-3, 0), (-3, -1), (-2, -2), (-1, -3),
    ];

    /// Detect FAST-9 corners on one pyramid level, skipping `border` pixels on
    /// every side. Returned coordinates are level coordinates.
    pub fn detect_at_level(
        img: &Image,
        scale_level: &ScaleLevel,
        threshold: u8,
        border: usize,
    ) -> Vec<ScoredKeypoint> {
        let width = scale_level.width;
        let height = scale_level.height;
        // The circle and the Harris window both need 3 pixels of margin
        let border = border.max(3);
        if width <= 2 * border || height <= 2 * border {
            return Vec::new();
        }

        (border..height - border)
            .into_par_iter()
            .flat_map_iter(|y| {
                let mut row_keypoints = Vec::new();
                for x in border..width - border {
                    if Self::is_fast_corner(img, width, x, y, threshold) {
                        let response = Self::compute_harris_response(img, width, height, x, y);
                        let mut keypoint = Keypoint::new(x as f32, y as f32);
                        keypoint.octave = scale_level.level;
                        keypoint.response = response;
                        row_keypoints.push(ScoredKeypoint { keypoint, response });
                    }
                }
                row_keypoints
            })
            .collect()
    }

    /// Segment test: 9 contiguous circle pixels all brighter than `p + t`
    /// or all darker than `p - t`
    pub fn is_fast_corner(img: &Image, width: usize, x: usize, y: usize, threshold: u8) -> bool {
        let center = img[y * width + x] as i32;
        let t = threshold as i32;

        // High-speed rejection on the four compass pixels: a 9-arc always
        // covers at least two of them.
        let compass = [0usize, 4, 8, 12];
        let mut bright_hits = 0;
        let mut dark_hits = 0;
        for &i in &compass {
            let (dx, dy) = Self::FAST_OFFSETS[i];
            let v = Self::pixel_at(img, width, x, y, dx, dy);
            if v > center + t {
                bright_hits += 1;
            } else if v < center - t {
                dark_hits += 1;
            }
        }
        if bright_hits < 2 && dark_hits < 2 {
            return false;
        }

        let mut bright = 0u16;
        let mut dark = 0u16;
        for (i, &(dx, dy)) in Self::FAST_OFFSETS.iter().enumerate() {
            let v = Self::pixel_at(img, width, x, y, dx, dy);
            if v > center + t {
                bright |= 1 << i;
            } else if v < center - t {
                dark |= 1 << i;
            }
        }

        has_contiguous_arc(bright, FAST_ARC) || has_contiguous_arc(dark, FAST_ARC)
    }

    #[inline]
    fn pixel_at(img: &Image, width: usize, x: usize, y: usize, dx: i32, dy: i32) -> i32 {
        let px = (x as i32 + dx) as usize;
        let py = (y as i32 + dy) as usize;
        img[py * width + px] as i32
    }

    /// Harris corner response over a 5x5 window of Sobel gradients
    pub fn compute_harris_response(img: &Image, width: usize, height: usize, x: usize, y: usize) -> f32 {
        if x < 3 || y < 3 || x + 3 >= width || y + 3 >= height {
            return 0.0;
        }

        let mut ixx = 0.0f64;
        let mut ixy = 0.0f64;
        let mut iyy = 0.0f64;

        for dy in -2i32..=2 {
            for dx in -2i32..=2 {
                let nx = (x as i32 + dx) as usize;
                let ny = (y as i32 + dy) as usize;
                let (gx, gy) = Self::compute_gradients(img, width, nx, ny);

                ixx += (gx * gx) as f64;
                ixy += (gx * gy) as f64;
                iyy += (gy * gy) as f64;
            }
        }

        // det(M) - k * trace(M)^2
        let det = ixx * iyy - ixy * ixy;
        let trace = ixx + iyy;
        (det - HARRIS_K as f64 * trace * trace) as f32
    }

    /// Sobel gradients at an interior pixel
    fn compute_gradients(img: &Image, width: usize, x: usize, y: usize) -> (f32, f32) {
        let at = |xx: usize, yy: usize| img[yy * width + xx] as f32;

        let gx = at(x + 1, y - 1) + 2.0 * at(x + 1, y) + at(x + 1, y + 1)
            - at(x - 1, y - 1) - 2.0 * at(x - 1, y) - at(x - 1, y + 1);

        let gy = at(x - 1, y + 1) + 2.0 * at(x, y + 1) + at(x + 1, y + 1)
            - at(x - 1, y - 1) - 2.0 * at(x, y - 1) - at(x + 1, y - 1);

        (gx / 8.0, gy / 8.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(width: usize, height: usize) -> ScaleLevel {
        ScaleLevel { level: 0, scale: 1.0, width, height }
    }

    /// Dark background with a bright square whose corners are FAST corners
    fn square_image(width: usize, height: usize, x0: usize, y0: usize, side: usize) -> Image {
        let mut img = vec![40u8; width * height];
        for y in y0..y0 + side {
            for x in x0..x0 + side {
                img[y * width + x] = 220;
            }
        }
        img
    }

    #[test]
    fn test_uniform_image_has_no_corners() {
        let img = vec![128u8; 40 * 40];
        let kps = CornerDetector::detect_at_level(&img, &level(40, 40), 20, 3);
        assert!(kps.is_empty());
    }

    #[test]
    fn test_square_corner_detected() {
        let img = square_image(40, 40, 15, 15, 10);
        assert!(CornerDetector::is_fast_corner(&img, 40, 15, 15, 20));
        // Interior of the square is flat
        assert!(!CornerDetector::is_fast_corner(&img, 40, 20, 20, 20));
    }

    #[test]
    fn test_straight_edge_is_not_a_corner() {
        // Vertical step edge: at most 7 contiguous circle pixels differ
        let mut img = vec![40u8; 40 * 40];
        for y in 0..40 {
            for x in 20..40 {
                img[y * 40 + x] = 220;
            }
        }
        assert!(!CornerDetector::is_fast_corner(&img, 40, 20, 20, 20));
        assert!(!CornerDetector::is_fast_corner(&img, 40, 19, 20, 20));
    }

    #[test]
    fn test_border_respected() {
        let img = square_image(40, 40, 5, 5, 30);
        let kps = CornerDetector::detect_at_level(&img, &level(40, 40), 20, 8);
        for sk in &kps {
            assert!(sk.keypoint.x >= 8.0 && sk.keypoint.x < 32.0);
            assert!(sk.keypoint.y >= 8.0 && sk.keypoint.y < 32.0);
        }
    }

    #[test]
    fn test_harris_prefers_corners_over_edges() {
        let img = square_image(40, 40, 15, 15, 10);
        let corner = CornerDetector::compute_harris_response(&img, 40, 40, 15, 15);
        let edge = CornerDetector::compute_harris_response(&img, 40, 40, 20, 15);
        let flat = CornerDetector::compute_harris_response(&img, 40, 40, 30, 30);
        assert!(corner > edge);
        assert!(corner > 0.0);
        assert_eq!(flat, 0.0);
    }
}

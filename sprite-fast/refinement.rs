use sprite_core::Image;

use crate::types::ScoredKeypoint;

/// Post-detection steps: suppression, budget capping and orientation
pub struct KeypointRefinement;

impl KeypointRefinement {
    /// Greedy non-maximum suppression, strongest response first
    pub fn non_maximum_suppression(keypoints: &[ScoredKeypoint], min_distance: f32) -> Vec<ScoredKeypoint> {
        if keypoints.is_empty() {
            return Vec::new();
        }

        let mut sorted_keypoints = keypoints.to_vec();
        Self::sort_by_response(&mut sorted_keypoints);

        let mut suppressed: Vec<ScoredKeypoint> = Vec::new();
        let min_distance_sq = min_distance * min_distance;

        for candidate in sorted_keypoints {
            let is_local_max = suppressed.iter().all(|existing| {
                let dx = candidate.keypoint.x - existing.keypoint.x;
                let dy = candidate.keypoint.y - existing.keypoint.y;
                dx * dx + dy * dy >= min_distance_sq
            });

            if is_local_max {
                suppressed.push(candidate);
            }
        }

        suppressed
    }

    /// Keep the `n` strongest keypoints
    pub fn retain_best(mut keypoints: Vec<ScoredKeypoint>, n: usize) -> Vec<ScoredKeypoint> {
        if keypoints.len() > n {
            Self::sort_by_response(&mut keypoints);
            keypoints.truncate(n);
        }
        keypoints
    }

    /// Descending by response; ties keep raster order
    fn sort_by_response(keypoints: &mut [ScoredKeypoint]) {
        keypoints.sort_by(|a, b| b.response.total_cmp(&a.response));
    }

    /// Orientation from the intensity centroid of a circular patch
    pub fn compute_orientation(img: &Image, width: usize, height: usize, x: f32, y: f32, patch_size: usize) -> f32 {
        let half = (patch_size / 2) as i32;
        let (cx, cy) = (x.round() as i32, y.round() as i32);
        let radius_sq = half * half;

        let mut m10 = 0i64;
        let mut m01 = 0i64;

        for dy in -half..=half {
            let yy = cy + dy;
            if yy < 0 || yy >= height as i32 {
                continue;
            }
            let row = yy as usize * width;
            for dx in -half..=half {
                let xx = cx + dx;
                if dx * dx + dy * dy > radius_sq || xx < 0 || xx >= width as i32 {
                    continue;
                }
                let val = img[row + xx as usize] as i64;
                m10 += dx as i64 * val;
                m01 += dy as i64 * val;
            }
        }

        if m10 == 0 && m01 == 0 {
            0.0
        } else {
            (m01 as f32).atan2(m10 as f32)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprite_core::Keypoint;

    fn scored(x: f32, y: f32, response: f32) -> ScoredKeypoint {
        let mut keypoint = Keypoint::new(x, y);
        keypoint.response = response;
        ScoredKeypoint { keypoint, response }
    }

    #[test]
    fn test_nms_keeps_strongest_and_spacing() {
        let kps = vec![
            scored(10.0, 10.0, 1.0),
            scored(11.0, 10.0, 5.0),
            scored(30.0, 30.0, 2.0),
        ];
        let kept = KeypointRefinement::non_maximum_suppression(&kps, 3.0);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].response, 5.0);
        for i in 0..kept.len() {
            for j in (i + 1)..kept.len() {
                let dx = kept[i].keypoint.x - kept[j].keypoint.x;
                let dy = kept[i].keypoint.y - kept[j].keypoint.y;
                assert!((dx * dx + dy * dy).sqrt() >= 3.0);
            }
        }
    }

    #[test]
    fn test_nms_empty() {
        assert!(KeypointRefinement::non_maximum_suppression(&[], 3.0).is_empty());
    }

    #[test]
    fn test_retain_best() {
        let kps = (0..10).map(|i| scored(i as f32 * 10.0, 0.0, i as f32)).collect();
        let best = KeypointRefinement::retain_best(kps, 3);
        let responses: Vec<f32> = best.iter().map(|k| k.response).collect();
        assert_eq!(responses, vec![9.0, 8.0, 7.0]);
    }

    #[test]
    fn test_orientation_points_to_bright_side() {
        // Bright right half: centroid lies on +x, angle ~ 0
        let (w, h) = (41, 41);
        let mut img = vec![0u8; w * h];
        for y in 0..h {
            for x in 21..w {
                img[y * w + x] = 200;
            }
        }
        let angle = KeypointRefinement::compute_orientation(&img, w, h, 20.0, 20.0, 31);
        assert!(angle.abs() < 1e-3, "angle = {}", angle);

        // Bright bottom half: angle ~ +pi/2 (image y grows downwards)
        let mut img = vec![0u8; w * h];
        for y in 21..h {
            for x in 0..w {
                img[y * w + x] = 200;
            }
        }
        let angle = KeypointRefinement::compute_orientation(&img, w, h, 20.0, 20.0, 31);
        assert!((angle - std::f32::consts::FRAC_PI_2).abs() < 1e-3, "angle = {}", angle);
    }

    #[test]
    fn test_orientation_flat_patch() {
        let img = vec![90u8; 31 * 31];
        let angle = KeypointRefinement::compute_orientation(&img, 31, 31, 15.0, 15.0, 31);
        assert_eq!(angle, 0.0);
    }
}

use log::{debug, warn};
use nalgebra::{Matrix3, SMatrix, Vector3};
use rand::rngs::StdRng;
use rand::SeedableRng;
use sprite_core::RANSAC_REPROJ_THRESHOLD;

use crate::error::{MatchError, MatchResult};

/// Points needed for a minimal homography hypothesis
const MIN_SAMPLE: usize = 4;

/// Below this, a projective divisor is treated as zero
const EPS: f64 = 1e-10;

/// 3x3 projective transform, normalized so that `h[2][2] == 1`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography {
    m: Matrix3<f64>,
}

impl Homography {
    pub fn from_matrix(m: Matrix3<f64>) -> MatchResult<Self> {
        let scale = m[(2, 2)];
        if scale.abs() < EPS || m.iter().any(|v| !v.is_finite()) {
            return Err(MatchError::unresolved("matrix cannot be normalized"));
        }
        Ok(Self { m: m / scale })
    }

    pub fn identity() -> Self {
        Self { m: Matrix3::identity() }
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.m
    }

    pub fn inverse(&self) -> MatchResult<Self> {
        let inv = self
            .m
            .try_inverse()
            .ok_or_else(|| MatchError::unresolved("matrix is singular"))?;
        Self::from_matrix(inv)
    }

    /// Map one point; `None` when it lands on the line at infinity
    pub fn project(&self, (x, y): (f64, f64)) -> Option<(f64, f64)> {
        let p = self.m * Vector3::new(x, y, 1.0);
        if p.z.abs() < EPS {
            return None;
        }
        Some((p.x / p.z, p.y / p.z))
    }

    /// Map every point through the homography
    pub fn perspective_transform(&self, pts: &[(f64, f64)]) -> MatchResult<Vec<(f64, f64)>> {
        pts.iter()
            .map(|&p| {
                self.project(p)
                    .ok_or_else(|| MatchError::unresolved(format!("point ({}, {}) maps to infinity", p.0, p.1)))
            })
            .collect()
    }

    fn reprojection_error_sq(&self, src: (f64, f64), dst: (f64, f64)) -> f64 {
        match self.project(src) {
            Some((x, y)) => {
                let (dx, dy) = (x - dst.0, y - dst.1);
                dx * dx + dy * dy
            }
            None => f64::INFINITY,
        }
    }
}

/// RANSAC tuning
#[derive(Debug, Clone, PartialEq)]
pub struct RansacParams {
    /// Maximum reprojection error, in pixels, for a correspondence to count as inlier
    pub threshold: f64,
    pub max_iters: usize,
    pub confidence: f64,
    pub seed: u64,
}

impl Default for RansacParams {
    fn default() -> Self {
        Self {
            threshold: RANSAC_REPROJ_THRESHOLD,
            max_iters: 2000,
            confidence: 0.995,
            seed: 0,
        }
    }
}

/// Outcome details of a RANSAC run
#[derive(Debug, Clone, PartialEq)]
pub struct RansacReport {
    pub inlier_mask: Vec<bool>,
    pub inlier_count: usize,
    pub iterations: usize,
}

/// Estimate the homography taking `src` points onto `dst` points, robust to
/// outlier correspondences.
pub fn find_homography_ransac(
    src: &[(f64, f64)],
    dst: &[(f64, f64)],
    params: &RansacParams,
) -> MatchResult<(Homography, RansacReport)> {
    if src.len() != dst.len() {
        return Err(MatchError::PointCountMismatch { src: src.len(), dst: dst.len() });
    }
    let n = src.len();
    if n < MIN_SAMPLE {
        return Err(MatchError::unresolved(format!(
            "{} correspondences, at least {} required",
            n, MIN_SAMPLE
        )));
    }

    let threshold_sq = params.threshold * params.threshold;
    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut best: Option<(Homography, Vec<bool>, usize)> = None;
    let mut max_iters = params.max_iters;
    let mut iterations = 0;

    while iterations < max_iters {
        iterations += 1;

        let sample = rand::seq::index::sample(&mut rng, n, MIN_SAMPLE).into_vec();
        let s_src: Vec<(f64, f64)> = sample.iter().map(|&i| src[i]).collect();
        let s_dst: Vec<(f64, f64)> = sample.iter().map(|&i| dst[i]).collect();
        if has_collinear_triple(&s_src) || has_collinear_triple(&s_dst) {
            continue;
        }

        let Some(model) = solve_dlt(&s_src, &s_dst).and_then(|m| Homography::from_matrix(m).ok()) else {
            continue;
        };

        let (mask, count) = inliers(&model, src, dst, threshold_sq);
        if best.as_ref().map_or(true, |(_, _, best_count)| count > *best_count) {
            max_iters = max_iters.min(update_iterations(params.confidence, count, n, params.max_iters));
            best = Some((model, mask, count));
        }
    }

    let (model, mask, count) =
        best.ok_or_else(|| MatchError::unresolved("no non-degenerate minimal sample"))?;

    // Refit on the full consensus set; keep it only if it does not lose support
    let (in_src, in_dst): (Vec<_>, Vec<_>) = src
        .iter()
        .zip(dst.iter())
        .zip(mask.iter())
        .filter(|&(_, &keep)| keep)
        .map(|((&s, &d), _)| (s, d))
        .unzip();

    let refined = solve_dlt(&in_src, &in_dst).and_then(|m| Homography::from_matrix(m).ok());
    let (model, mask, count) = match refined {
        Some(refit) => {
            let (refit_mask, refit_count) = inliers(&refit, src, dst, threshold_sq);
            if refit_count >= count {
                (refit, refit_mask, refit_count)
            } else {
                (model, mask, count)
            }
        }
        None => {
            warn!("homography refit on {} inliers failed, keeping minimal model", count);
            (model, mask, count)
        }
    };

    debug!("RANSAC: {}/{} inliers after {} iterations", count, n, iterations);

    Ok((
        model,
        RansacReport {
            inlier_mask: mask,
            inlier_count: count,
            iterations,
        },
    ))
}

fn inliers(model: &Homography, src: &[(f64, f64)], dst: &[(f64, f64)], threshold_sq: f64) -> (Vec<bool>, usize) {
    let mask: Vec<bool> = src
        .iter()
        .zip(dst.iter())
        .map(|(&s, &d)| model.reprojection_error_sq(s, d) <= threshold_sq)
        .collect();
    let count = mask.iter().filter(|&&m| m).count();
    (mask, count)
}

/// Iterations needed to draw an all-inlier sample with the given confidence
fn update_iterations(confidence: f64, inliers: usize, total: usize, max_iters: usize) -> usize {
    let inlier_ratio = inliers as f64 / total as f64;
    let p_good = inlier_ratio.powi(MIN_SAMPLE as i32);
    if p_good >= 1.0 - EPS {
        return 1;
    }
    if p_good <= EPS {
        return max_iters;
    }
    let needed = (1.0 - confidence).ln() / (1.0 - p_good).ln();
    if needed.is_finite() && needed >= 0.0 {
        (needed.ceil() as usize).min(max_iters)
    } else {
        max_iters
    }
}

fn has_collinear_triple(pts: &[(f64, f64)]) -> bool {
    for i in 0..pts.len() {
        for j in (i + 1)..pts.len() {
            for k in (j + 1)..pts.len() {
                let (ax, ay) = (pts[j].0 - pts[i].0, pts[j].1 - pts[i].1);
                let (bx, by) = (pts[k].0 - pts[i].0, pts[k].1 - pts[i].1);
                let cross = ax * by - ay * bx;
                let scale = (ax * ax + ay * ay).sqrt() * (bx * bx + by * by).sqrt();
                if cross.abs() <= 1e-6 * scale.max(1.0) {
                    return true;
                }
            }
        }
    }
    false
}

/// Similarity transform moving the centroid to the origin with mean distance sqrt(2)
fn normalizing_transform(pts: &[(f64, f64)]) -> Option<Matrix3<f64>> {
    let n = pts.len() as f64;
    let cx = pts.iter().map(|p| p.0).sum::<f64>() / n;
    let cy = pts.iter().map(|p| p.1).sum::<f64>() / n;
    let mean_dist = pts
        .iter()
        .map(|p| ((p.0 - cx).powi(2) + (p.1 - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    if mean_dist < EPS {
        return None;
    }
    let s = std::f64::consts::SQRT_2 / mean_dist;
    Some(Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0))
}

/// Normalized direct linear transform over all given correspondences
fn solve_dlt(src: &[(f64, f64)], dst: &[(f64, f64)]) -> Option<Matrix3<f64>> {
    if src.len() < MIN_SAMPLE || src.len() != dst.len() {
        return None;
    }
    let t_src = normalizing_transform(src)?;
    let t_dst = normalizing_transform(dst)?;

    let mut ata = SMatrix::<f64, 9, 9>::zeros();
    for (&s, &d) in src.iter().zip(dst.iter()) {
        let ps = t_src * Vector3::new(s.0, s.1, 1.0);
        let pd = t_dst * Vector3::new(d.0, d.1, 1.0);
        let (x, y) = (ps.x, ps.y);
        let (u, v) = (pd.x, pd.y);

        let r1 = SMatrix::<f64, 1, 9>::from_row_slice(&[-x, -y, -1.0, 0.0, 0.0, 0.0, u * x, u * y, u]);
        let r2 = SMatrix::<f64, 1, 9>::from_row_slice(&[0.0, 0.0, 0.0, -x, -y, -1.0, v * x, v * y, v]);
        ata += r1.transpose() * r1 + r2.transpose() * r2;
    }

    // Null vector of A is the eigenvector of AᵀA with the smallest eigenvalue
    let eig = ata.symmetric_eigen();
    let min_idx = eig.eigenvalues.imin();
    let h = eig.eigenvectors.column(min_idx);
    let hn = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]);

    let t_dst_inv = t_dst.try_inverse()?;
    let m = t_dst_inv * hn * t_src;
    m.iter().all(|v| v.is_finite()).then_some(m)
}

use log::debug;
use rayon::prelude::*;
use sprite_core::{Descriptor, FloatDescriptor, Match};

/// Distance used to compare descriptors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Norm {
    /// Number of differing bits
    Hamming,
    /// Euclidean distance over descriptor bytes
    L2,
}

/// A descriptor that can be read back as its 32 code bytes.
///
/// Float descriptors hold one byte value per element, so both encodings
/// produce the same code and therefore the same distances.
pub trait HammingCode {
    fn code(&self) -> Descriptor;
}

impl HammingCode for Descriptor {
    fn code(&self) -> Descriptor {
        *self
    }
}

impl HammingCode for FloatDescriptor {
    fn code(&self) -> Descriptor {
        let mut out = [0u8; 32];
        for (byte, &v) in out.iter_mut().zip(self.iter()) {
            *byte = v.round().clamp(0.0, 255.0) as u8;
        }
        out
    }
}

/// Re-encode binary descriptors as floats, one value per byte
pub fn to_float_descriptors(descs: &[Descriptor]) -> Vec<FloatDescriptor> {
    descs
        .iter()
        .map(|d| {
            let mut out = [0f32; 32];
            for (f, &b) in out.iter_mut().zip(d.iter()) {
                *f = b as f32;
            }
            out
        })
        .collect()
}

pub fn hamming_distance(a: &Descriptor, b: &Descriptor) -> u32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x ^ y).count_ones()).sum()
}

fn l2_distance(a: &Descriptor, b: &Descriptor) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let d = x as f32 - y as f32;
            d * d
        })
        .sum::<f32>()
        .sqrt()
}

/// Exhaustive nearest-neighbour matcher
#[derive(Debug, Clone)]
pub struct BruteForceMatcher {
    norm: Norm,
    cross_check: bool,
}

impl BruteForceMatcher {
    pub fn new(norm: Norm) -> Self {
        Self { norm, cross_check: false }
    }

    /// Keep a pair only when each side is the other's nearest neighbour
    pub fn cross_check(mut self, enable: bool) -> Self {
        self.cross_check = enable;
        self
    }

    pub fn norm(&self) -> Norm {
        self.norm
    }

    fn distance(&self, a: &Descriptor, b: &Descriptor) -> f32 {
        match self.norm {
            Norm::Hamming => hamming_distance(a, b) as f32,
            Norm::L2 => l2_distance(a, b),
        }
    }

    /// Index and distance of the closest candidate; ties go to the lowest index
    fn nearest(&self, probe: &Descriptor, candidates: &[Descriptor]) -> Option<(usize, f32)> {
        candidates
            .iter()
            .enumerate()
            .map(|(idx, c)| (idx, self.distance(probe, c)))
            .fold(None, |best, (idx, dist)| match best {
                Some((_, best_dist)) if best_dist <= dist => best,
                _ => Some((idx, dist)),
            })
    }

    /// Best train match for every query descriptor, in query order. With
    /// cross-check enabled, queries whose partner prefers another query are
    /// dropped.
    pub fn match_descriptors<Q, T>(&self, query: &[Q], train: &[T]) -> Vec<Match>
    where
        Q: HammingCode + Sync,
        T: HammingCode + Sync,
    {
        if query.is_empty() || train.is_empty() {
            return Vec::new();
        }

        let query_codes: Vec<Descriptor> = query.iter().map(HammingCode::code).collect();
        let train_codes: Vec<Descriptor> = train.iter().map(HammingCode::code).collect();

        let forward: Vec<Option<(usize, f32)>> = query_codes
            .par_iter()
            .map(|q| self.nearest(q, &train_codes))
            .collect();

        let backward: Option<Vec<Option<(usize, f32)>>> = self.cross_check.then(|| {
            train_codes
                .par_iter()
                .map(|t| self.nearest(t, &query_codes))
                .collect()
        });

        let matches: Vec<Match> = forward
            .into_iter()
            .enumerate()
            .filter_map(|(query_idx, best)| {
                let (train_idx, distance) = best?;
                if let Some(backward) = &backward {
                    match backward[train_idx] {
                        Some((back_idx, _)) if back_idx == query_idx => {}
                        _ => return None,
                    }
                }
                Some(Match { query_idx, train_idx, distance })
            })
            .collect();

        debug!(
            "matched {} of {} query descriptors against {} (cross_check={})",
            matches.len(),
            query.len(),
            train.len(),
            self.cross_check
        );
        matches
    }
}

/// Sort ascending by distance (stable) and keep at most `limit` matches
pub fn good_matches(mut matches: Vec<Match>, limit: usize) -> Vec<Match> {
    matches.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    matches.truncate(limit);
    matches
}

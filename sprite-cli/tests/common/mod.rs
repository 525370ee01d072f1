#![allow(dead_code)]

use image::{GrayImage, Luma, Rgb, RgbImage};

/// Deterministic scene: overlapping rectangles of varied intensity on a
/// lightly noisy background. The noise stays below the FAST threshold but
/// makes every local neighbourhood distinct.
pub fn scene(width: u32, height: u32, rects: usize, seed: u64) -> GrayImage {
    let mut img = GrayImage::from_fn(width, height, |x, y| Luma([60 + noise(x, y)]));

    let mut state = seed;
    let mut next = |bound: u32| {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((state >> 33) % bound as u64) as u32
    };

    for _ in 0..rects {
        let (x0, y0) = (next(width), next(height));
        let (bw, bh) = (8 + next(32), 8 + next(32));
        let value = 30 + next(200) as u8;
        for y in y0..(y0 + bh).min(height) {
            for x in x0..(x0 + bw).min(width) {
                img.put_pixel(x, y, Luma([value + noise(x, y)]));
            }
        }
    }
    img
}

fn noise(x: u32, y: u32) -> u8 {
    ((x.wrapping_mul(73_856_093) ^ y.wrapping_mul(19_349_663)) % 13) as u8
}

pub fn gradient_rgb(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 255 / width) as u8, (y * 255 / height) as u8, ((x + y) % 256) as u8])
    })
}

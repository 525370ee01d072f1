use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::RgbImage;
use log::{debug, info};
use rayon::prelude::*;
use thiserror::Error;

use crate::open_image;

#[derive(Debug, Error)]
pub enum CompareError {
    #[error("Failed to load image {path:?}: {source}")]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Images differ in shape: {first:?} vs {second:?}")]
    ShapeMismatch { first: (u32, u32), second: (u32, u32) },
}

pub type CompareResult<T> = Result<T, CompareError>;

/// Count of differing samples per colour channel (R, G, B)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelDiff {
    pub nonzero: [usize; 3],
}

impl ChannelDiff {
    pub fn is_identical(&self) -> bool {
        self.nonzero.iter().all(|&n| n == 0)
    }

    pub fn total(&self) -> usize {
        self.nonzero.iter().sum()
    }
}

/// Resample `second` to the dimensions of `first` with bilinear filtering.
/// Returned unchanged when the sizes already agree.
pub fn resize_to_match(first: &RgbImage, second: RgbImage) -> RgbImage {
    let (w, h) = first.dimensions();
    if second.dimensions() == (w, h) {
        return second;
    }
    debug!("resizing {:?} to {}x{}", second.dimensions(), w, h);
    imageops::resize(&second, w, h, FilterType::Triangle)
}

/// Per-channel absolute difference, reduced to non-zero counts
pub fn diff_images(first: &RgbImage, second: &RgbImage) -> CompareResult<ChannelDiff> {
    if first.dimensions() != second.dimensions() {
        return Err(CompareError::ShapeMismatch {
            first: first.dimensions(),
            second: second.dimensions(),
        });
    }

    let nonzero = first
        .as_raw()
        .par_chunks_exact(3)
        .zip(second.as_raw().par_chunks_exact(3))
        .fold(
            || [0usize; 3],
            |mut acc, (a, b)| {
                for c in 0..3 {
                    acc[c] += (a[c].abs_diff(b[c]) != 0) as usize;
                }
                acc
            },
        )
        .reduce(|| [0usize; 3], |x, y| [x[0] + y[0], x[1] + y[1], x[2] + y[2]]);

    Ok(ChannelDiff { nonzero })
}

fn load_rgb(path: &Path) -> CompareResult<RgbImage> {
    open_image(path)
        .map(|img| img.to_rgb8())
        .map_err(|source| CompareError::ImageLoad {
            path: path.to_path_buf(),
            source,
        })
}

/// Strict pixel equality of two image files. The second image is first
/// resized to the first one's dimensions.
pub fn compare_images(path1: impl AsRef<Path>, path2: impl AsRef<Path>) -> CompareResult<bool> {
    let (path1, path2) = (path1.as_ref(), path2.as_ref());
    let first = load_rgb(path1)?;
    let second = resize_to_match(&first, load_rgb(path2)?);

    let diff = diff_images(&first, &second)?;
    info!(
        "compared {:?} with {:?}: {} differing samples {:?}",
        path1,
        path2,
        diff.total(),
        diff.nonzero
    );
    Ok(diff.is_identical())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn gradient(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| Rgb([(x * 7) as u8, (y * 5) as u8, ((x + y) * 3) as u8]))
    }

    #[test]
    fn test_identical_images() {
        let img = gradient(20, 10);
        let diff = diff_images(&img, &img.clone()).unwrap();
        assert!(diff.is_identical());
        assert_eq!(diff.total(), 0);
    }

    #[test]
    fn test_counts_per_channel() {
        let a = gradient(20, 10);
        let mut b = a.clone();
        b.put_pixel(3, 4, Rgb([a.get_pixel(3, 4)[0], 255, 0]));
        b.get_pixel_mut(9, 9)[1] ^= 1;

        let diff = diff_images(&a, &b).unwrap();
        assert_eq!(diff.nonzero[0], 0);
        assert_eq!(diff.nonzero[1], 2);
        // (3, 4) blue is already 21, so setting it to zero is a change
        assert_eq!(diff.nonzero[2], 1);
    }

    #[test]
    fn test_difference_is_symmetric() {
        let dark = RgbImage::from_pixel(4, 4, Rgb([10, 10, 10]));
        let bright = RgbImage::from_pixel(4, 4, Rgb([200, 10, 10]));
        assert_eq!(diff_images(&dark, &bright).unwrap(), diff_images(&bright, &dark).unwrap());
        assert_eq!(diff_images(&dark, &bright).unwrap().nonzero, [16, 0, 0]);
    }

    #[test]
    fn test_shape_mismatch() {
        let result = diff_images(&gradient(10, 10), &gradient(10, 11));
        assert!(matches!(
            result,
            Err(CompareError::ShapeMismatch { first: (10, 10), second: (10, 11) })
        ));
    }

    #[test]
    fn test_resize_to_match() {
        let first = gradient(30, 20);
        let same = resize_to_match(&first, gradient(30, 20));
        assert_eq!(same, gradient(30, 20));

        let resized = resize_to_match(&first, gradient(15, 40));
        assert_eq!(resized.dimensions(), (30, 20));
    }
}

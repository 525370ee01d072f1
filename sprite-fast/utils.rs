//! Circular-arc helpers for the FAST segment test

/// Number of pixels on the Bresenham circle of radius 3
pub const CIRCLE_LEN: u32 = 16;

/// Pack a 16-pixel circle test into a bitmask, bit `i` for pixel `i`
pub fn circle_mask(pixels: &[bool; 16]) -> u16 {
    pixels
        .iter()
        .enumerate()
        .fold(0u16, |mask, (i, &set)| mask | ((set as u16) << i))
}

/// True if `mask` holds a run of at least `arc_len` set bits, wrapping around
/// the circle.
pub fn has_contiguous_arc(mask: u16, arc_len: u32) -> bool {
    if arc_len == 0 || arc_len > CIRCLE_LEN {
        return false;
    }
    if mask == u16::MAX {
        return true;
    }

    // AND-ing rotated copies leaves a bit set only where a full run starts
    let mut run = mask;
    for i in 1..arc_len {
        run &= mask.rotate_right(i);
        if run == 0 {
            return false;
        }
    }
    run != 0
}

/// Reference implementation scanning the circle twice
pub fn has_contiguous_arc_scan(pixels: &[bool; 16], arc_len: usize) -> bool {
    if arc_len == 0 || arc_len > 16 {
        return false;
    }

    let mut current = 0;
    for i in 0..32 {
        if pixels[i % 16] {
            current += 1;
            if current >= arc_len {
                return true;
            }
        } else {
            current = 0;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_nine_contiguous() {
        let mut pixels = [false; 16];
        for p in pixels.iter_mut().take(9) {
            *p = true;
        }
        let mask = circle_mask(&pixels);
        assert!(has_contiguous_arc(mask, 9));
        assert!(!has_contiguous_arc(mask, 10));
    }

    #[test]
    fn test_wrap_around() {
        let mut pixels = [false; 16];
        for i in (12..16).chain(0..5) {
            pixels[i] = true;
        }
        assert!(has_contiguous_arc(circle_mask(&pixels), 9));
    }

    #[test]
    fn test_alternating_never_forms_arc() {
        let mut pixels = [false; 16];
        for i in (0..16).step_by(2) {
            pixels[i] = true;
        }
        assert!(!has_contiguous_arc(circle_mask(&pixels), 2));
    }

    #[test]
    fn test_degenerate_lengths() {
        assert!(!has_contiguous_arc(u16::MAX, 0));
        assert!(!has_contiguous_arc(u16::MAX, 17));
        assert!(has_contiguous_arc(u16::MAX, 16));
    }

    proptest! {
        #[test]
        fn bitmask_matches_scan(mask in any::<u16>(), arc_len in 1usize..=16) {
            let mut pixels = [false; 16];
            for (i, p) in pixels.iter_mut().enumerate() {
                *p = mask & (1 << i) != 0;
            }
            prop_assert_eq!(
                has_contiguous_arc(mask, arc_len as u32),
                has_contiguous_arc_scan(&pixels, arc_len)
            );
        }
    }
}

/// Template corners in the order top-left, bottom-left, bottom-right, top-right
pub fn template_corners(width: u32, height: u32) -> [(f64, f64); 4] {
    let (w, h) = (width.saturating_sub(1) as f64, height.saturating_sub(1) as f64);
    [(0.0, 0.0), (0.0, h), (w, h), (w, 0.0)]
}

/// Axis-aligned integer box, `max` bounds exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x_min: i64,
    pub y_min: i64,
    pub x_max: i64,
    pub y_max: i64,
}

impl BoundingBox {
    /// Enclose projected corners with a half-pixel margin, truncating each
    /// bound toward zero. `None` for an empty or non-finite point set.
    pub fn from_corners(pts: &[(f64, f64)]) -> Option<Self> {
        if pts.is_empty() || pts.iter().any(|p| !p.0.is_finite() || !p.1.is_finite()) {
            return None;
        }

        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for &(x, y) in pts {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }

        Some(Self {
            x_min: (min_x - 0.5).trunc() as i64,
            y_min: (min_y - 0.5).trunc() as i64,
            x_max: (max_x + 0.5).trunc() as i64,
            y_max: (max_y + 0.5).trunc() as i64,
        })
    }

    pub fn width(&self) -> i64 {
        (self.x_max - self.x_min).max(0)
    }

    pub fn height(&self) -> i64 {
        (self.y_max - self.y_min).max(0)
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Intersect with a `width` x `height` image; `None` if nothing remains
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<Self> {
        let clamped = Self {
            x_min: self.x_min.clamp(0, width as i64),
            y_min: self.y_min.clamp(0, height as i64),
            x_max: self.x_max.clamp(0, width as i64),
            y_max: self.y_max.clamp(0, height as i64),
        };
        (!clamped.is_empty()).then_some(clamped)
    }

    /// Whether the box already lies inside a `width` x `height` image
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x_min >= 0 && self.y_min >= 0 && self.x_max <= width as i64 && self.y_max <= height as i64
    }
}

impl std::fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}) x [{}, {})", self.x_min, self.x_max, self.y_min, self.y_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_template_corners() {
        assert_eq!(
            template_corners(40, 30),
            [(0.0, 0.0), (0.0, 29.0), (39.0, 29.0), (39.0, 0.0)]
        );
    }

    #[test]
    fn test_axis_aligned_square() {
        let corners = [(10.0, 20.0), (10.0, 49.0), (39.0, 49.0), (39.0, 20.0)];
        let bbox = BoundingBox::from_corners(&corners).unwrap();
        assert_eq!(bbox, BoundingBox { x_min: 9, y_min: 19, x_max: 39, y_max: 49 });
        assert_eq!(bbox.width(), 30);
        assert_eq!(bbox.height(), 30);
    }

    #[test]
    fn test_fractional_rounding_margin() {
        let corners = [(10.7, 5.2), (20.6, 15.4)];
        let bbox = BoundingBox::from_corners(&corners).unwrap();
        assert_eq!(bbox, BoundingBox { x_min: 10, y_min: 4, x_max: 21, y_max: 15 });
    }

    #[test]
    fn test_truncates_toward_zero() {
        let corners = [(-3.2, -0.3), (5.0, 5.0)];
        let bbox = BoundingBox::from_corners(&corners).unwrap();
        assert_eq!(bbox.x_min, -3);
        assert_eq!(bbox.y_min, 0);
    }

    #[test]
    fn test_invalid_points() {
        assert!(BoundingBox::from_corners(&[]).is_none());
        assert!(BoundingBox::from_corners(&[(f64::NAN, 1.0)]).is_none());
    }

    #[test]
    fn test_clamp() {
        let bbox = BoundingBox { x_min: -5, y_min: 10, x_max: 50, y_max: 200 };
        assert!(!bbox.fits_within(100, 100));
        let clamped = bbox.clamp_to(100, 100).unwrap();
        assert_eq!(clamped, BoundingBox { x_min: 0, y_min: 10, x_max: 50, y_max: 100 });
        assert!(clamped.fits_within(100, 100));

        let outside = BoundingBox { x_min: 120, y_min: 0, x_max: 150, y_max: 10 };
        assert!(outside.clamp_to(100, 100).is_none());
    }

    proptest! {
        #[test]
        fn box_encloses_positive_corners(pts in prop::collection::vec((0.0f64..1000.0, 0.0f64..1000.0), 1..8)) {
            let bbox = BoundingBox::from_corners(&pts).unwrap();
            for &(x, y) in &pts {
                prop_assert!(bbox.x_min as f64 <= x);
                prop_assert!(bbox.y_min as f64 <= y);
                prop_assert!(bbox.x_max as f64 >= x - 0.5);
                prop_assert!(bbox.y_max as f64 >= y - 0.5);
            }
        }
    }
}

/// A closed range of ray parameters `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub min: f32,
    pub max: f32,
}

impl Interval {
    /// Create a new interval given min and max values.
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Returns true once `max < min`. A single point is not empty.
    pub fn is_empty(&self) -> bool {
        self.max < self.min
    }

    /// Narrow this interval to its overlap with `[min, max]`.
    ///
    /// Uses `f32::max`/`f32::min`, so a NaN bound leaves the current one untouched.
    pub fn clip(&self, min: f32, max: f32) -> Interval {
        Interval::new(self.min.max(min), self.max.min(max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_clip() {
        let clipped = Interval::new(0.0, 10.0).clip(2.0, 12.0);
        assert_eq!(clipped, Interval::new(2.0, 10.0));
        assert!(!clipped.is_empty());

        let disjoint = Interval::new(0.0, 1.0).clip(2.0, 3.0);
        assert!(disjoint.is_empty());
    }

    #[test]
    fn test_interval_point_is_not_empty() {
        assert!(!Interval::new(3.0, 3.0).is_empty());
    }

    #[test]
    fn test_interval_clip_ignores_nan() {
        let clipped = Interval::new(0.0, 10.0).clip(f32::NAN, f32::NAN);
        assert_eq!(clipped, Interval::new(0.0, 10.0));
    }
}

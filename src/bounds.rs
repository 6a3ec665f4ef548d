// Running data bounds for one render pass

use crate::scalar::Scalar;
use std::ops::Range;

/// Minimum and maximum seen over every series drawn in a render pass.
///
/// Owned by the caller that drives the pass; call [`Bounds::reset`] (or make
/// a new one) before starting an unrelated pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    lower: [f64; 2],
    upper: [f64; 2],
}

impl Default for Bounds {
    fn default() -> Self {
        Self::new()
    }
}

impl Bounds {
    pub fn new() -> Self {
        Self {
            lower: [f64::INFINITY, f64::INFINITY],
            upper: [f64::NEG_INFINITY, f64::NEG_INFINITY],
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn is_empty(&self) -> bool {
        self.lower[0] > self.upper[0] || self.lower[1] > self.upper[1]
    }

    pub fn lower(&self) -> [f64; 2] {
        self.lower
    }

    pub fn upper(&self) -> [f64; 2] {
        self.upper
    }

    /// Widen the bounds to cover the given points.
    pub fn update(&mut self, x: &[f64], y: &[f64]) {
        for &v in x.iter().filter(|v| v.is_finite()) {
            self.lower[0] = self.lower[0].min(v);
            self.upper[0] = self.upper[0].max(v);
        }
        for &v in y.iter().filter(|v| v.is_finite()) {
            self.lower[1] = self.lower[1].min(v);
            self.upper[1] = self.upper[1].max(v);
        }
    }

    /// Apply `xlim`/`ylim` pairs; a `'#'` entry keeps the data bound.
    pub fn apply_limits(&mut self, xlim: Option<&Scalar>, ylim: Option<&Scalar>) {
        for (axis, lim) in [(0, xlim), (1, ylim)] {
            let Some(items) = lim.and_then(Scalar::as_list) else {
                continue;
            };
            if let Some(lo) = items.first().and_then(Scalar::as_f64) {
                self.lower[axis] = lo;
            }
            if let Some(hi) = items.get(1).and_then(Scalar::as_f64) {
                self.upper[axis] = hi;
            }
        }
    }

    /// Axis ranges widened by `border` (a fraction of each range, either one
    /// number for both axes or an `[x, y]` pair).
    pub fn ranges(&self, border: Option<&Scalar>) -> (Range<f64>, Range<f64>) {
        let pad = match border {
            Some(Scalar::List(items)) => [
                items.first().and_then(Scalar::as_f64).unwrap_or(0.0),
                items.get(1).and_then(Scalar::as_f64).unwrap_or(0.0),
            ],
            Some(other) => {
                let b = other.as_f64().unwrap_or(0.0);
                [b, b]
            }
            None => [0.0, 0.0],
        };

        let axis = |i: usize| -> Range<f64> {
            let (lo, hi) = (self.lower[i], self.upper[i]);
            if !(lo.is_finite() && hi.is_finite()) || lo > hi {
                return 0.0..1.0;
            }
            if lo == hi {
                return (lo - 1.0)..(hi + 1.0);
            }
            let span = hi - lo;
            (lo - span * pad[i])..(hi + span * pad[i])
        };

        (axis(0), axis(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::coerce;

    #[test]
    fn test_accumulates_across_series() {
        let mut b = Bounds::new();
        assert!(b.is_empty());
        b.update(&[0.0, 1.0], &[5.0, 6.0]);
        b.update(&[-2.0], &[10.0]);
        assert_eq!(b.lower(), [-2.0, 5.0]);
        assert_eq!(b.upper(), [1.0, 10.0]);
    }

    #[test]
    fn test_reset() {
        let mut b = Bounds::new();
        b.update(&[1.0], &[1.0]);
        b.reset();
        assert_eq!(b, Bounds::new());
    }

    #[test]
    fn test_limits_with_placeholder() {
        let mut b = Bounds::new();
        b.update(&[0.0, 10.0], &[0.0, 4.0]);
        b.apply_limits(Some(&coerce("['#', 5]")), Some(&coerce("[-1, '#']")));
        assert_eq!(b.lower(), [0.0, -1.0]);
        assert_eq!(b.upper(), [5.0, 4.0]);
    }

    #[test]
    fn test_ranges_with_border() {
        let mut b = Bounds::new();
        b.update(&[0.0, 10.0], &[0.0, 100.0]);
        let (x, y) = b.ranges(Some(&Scalar::Float(0.1)));
        assert_eq!(x, -1.0..11.0);
        assert_eq!(y, -10.0..110.0);
        let (x, _) = b.ranges(Some(&coerce("[0, 0.5]")));
        assert_eq!(x, 0.0..10.0);
    }

    #[test]
    fn test_degenerate_ranges() {
        let mut b = Bounds::new();
        assert_eq!(b.ranges(None), (0.0..1.0, 0.0..1.0));
        b.update(&[3.0], &[3.0]);
        assert_eq!(b.ranges(None).0, 2.0..4.0);
    }
}

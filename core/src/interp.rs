//! One-dimensional linear interpolation with an explicit boundary policy.
//!
//! Both the harmonic-count step function and the sensitivity curve are
//! tabulated on a grid and queried anywhere on the real line.  Queries inside
//! the grid are linearly interpolated; queries outside it return a fixed
//! fill value for the low and the high side rather than extrapolating.

use ndarray::Array1;

/// Errors raised while building an interpolator.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InterpError {
    #[error("interpolation needs at least 2 points, got {0}")]
    TooFewPoints(usize),

    #[error("x and y lengths differ ({x} vs {y})")]
    LengthMismatch { x: usize, y: usize },

    #[error("x grid must be strictly increasing (violated at index {0})")]
    NotIncreasing(usize),
}

/// Values returned for queries below / above the tabulated range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FillValue {
    pub below: f64,
    pub above: f64,
}

impl FillValue {
    pub fn constant(value: f64) -> Self {
        Self {
            below: value,
            above: value,
        }
    }
}

/// Piecewise-linear interpolant over a strictly increasing grid.
#[derive(Clone, Debug)]
pub struct Interp1d {
    x: Vec<f64>,
    y: Vec<f64>,
    fill: FillValue,
}

impl Interp1d {
    pub fn new(x: Vec<f64>, y: Vec<f64>, fill: FillValue) -> Result<Self, InterpError> {
        if x.len() != y.len() {
            return Err(InterpError::LengthMismatch {
                x: x.len(),
                y: y.len(),
            });
        }
        if x.len() < 2 {
            return Err(InterpError::TooFewPoints(x.len()));
        }
        if let Some(i) = x.windows(2).position(|w| !(w[1] > w[0])) {
            return Err(InterpError::NotIncreasing(i + 1));
        }
        Ok(Self { x, y, fill })
    }

    /// Evaluate at a single point.  NaN propagates.
    pub fn eval(&self, xq: f64) -> f64 {
        if xq.is_nan() {
            return f64::NAN;
        }
        let last = self.x.len() - 1;
        if xq < self.x[0] {
            return self.fill.below;
        }
        if xq > self.x[last] {
            return self.fill.above;
        }
        // First index with x[i] > xq, so the bracketing interval is [i-1, i].
        let i = self.x.partition_point(|&v| v <= xq);
        if i > last {
            return self.y[last];
        }
        let (x0, x1) = (self.x[i - 1], self.x[i]);
        let (y0, y1) = (self.y[i - 1], self.y[i]);
        let t = (xq - x0) / (x1 - x0);
        y0 + t * (y1 - y0)
    }

    pub fn eval_array(&self, xq: &Array1<f64>) -> Array1<f64> {
        xq.mapv(|v| self.eval(v))
    }

    pub fn x_min(&self) -> f64 {
        self.x[0]
    }

    pub fn x_max(&self) -> f64 {
        self.x[self.x.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> Interp1d {
        Interp1d::new(
            vec![0.0, 1.0, 3.0],
            vec![2.0, 4.0, 8.0],
            FillValue {
                below: -1.0,
                above: 99.0,
            },
        )
        .unwrap()
    }

    #[test]
    fn interpolates_inside_and_hits_nodes() {
        let f = ramp();
        assert_eq!(f.eval(0.0), 2.0);
        assert_eq!(f.eval(1.0), 4.0);
        assert_eq!(f.eval(3.0), 8.0);
        assert!((f.eval(0.5) - 3.0).abs() < 1e-12);
        assert!((f.eval(2.0) - 6.0).abs() < 1e-12);
    }

    #[test]
    fn boundary_policy_uses_fill_values() {
        let f = ramp();
        assert_eq!(f.eval(-0.1), -1.0);
        assert_eq!(f.eval(3.1), 99.0);
        assert!(f.eval(f64::NAN).is_nan());
    }

    #[test]
    fn rejects_malformed_grids() {
        let fill = FillValue::constant(0.0);
        assert_eq!(
            Interp1d::new(vec![0.0], vec![1.0], fill).unwrap_err(),
            InterpError::TooFewPoints(1)
        );
        assert_eq!(
            Interp1d::new(vec![0.0, 1.0], vec![1.0], fill).unwrap_err(),
            InterpError::LengthMismatch { x: 2, y: 1 }
        );
        assert_eq!(
            Interp1d::new(vec![0.0, 1.0, 1.0], vec![1.0, 2.0, 3.0], fill).unwrap_err(),
            InterpError::NotIncreasing(2)
        );
    }
}

use super::constants::WINDOW_TOLERANCE;
use super::error::TraceError;

/// A detector signal sampled against retention time.
///
/// x values are strictly increasing. Samples are expected to be evenly spaced; each sample is
/// taken to cover one step of time, so a trace of samples at 0.0, 0.2, ..., 39.8 covers the
/// range [0, 40).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Trace {
    x: Vec<f64>,
    y: Vec<f64>,
}

impl Trace {
    /// Create a trace from matching x and y vectors
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Self, TraceError> {
        if x.len() != y.len() {
            return Err(TraceError::LengthMismatch(x.len(), y.len()));
        }
        for (idx, (xv, yv)) in x.iter().zip(y.iter()).enumerate() {
            if !xv.is_finite() || !yv.is_finite() {
                return Err(TraceError::NonFinite(idx));
            }
        }
        for idx in 1..x.len() {
            if x[idx] <= x[idx - 1] {
                return Err(TraceError::NotIncreasing(idx));
            }
        }
        Ok(Self { x, y })
    }

    /// Create a trace of evenly spaced samples starting at `start`
    pub fn from_uniform(start: f64, step: f64, y: Vec<f64>) -> Result<Self, TraceError> {
        let x = (0..y.len()).map(|idx| start + step * idx as f64).collect();
        Self::new(x, y)
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    /// Sample spacing, taken from the last pair of samples. None for traces shorter than two.
    pub fn step(&self) -> Option<f64> {
        let n = self.x.len();
        if n < 2 {
            None
        } else {
            Some(self.x[n - 1] - self.x[n - 2])
        }
    }

    /// The time range covered by the trace, [first sample, last sample + step)
    pub fn coverage(&self) -> Option<(f64, f64)> {
        let first = *self.x.first()?;
        let last = *self.x.last()?;
        Some((first, last + self.step().unwrap_or(0.0)))
    }

    /// Does the trace cover the window [left, right]?
    pub fn covers(&self, left: f64, right: f64) -> bool {
        match self.coverage() {
            Some((first, end)) => {
                left >= first - WINDOW_TOLERANCE && right <= end + WINDOW_TOLERANCE
            }
            None => false,
        }
    }

    /// Copy out the samples with left <= x <= right, with y scaled by `sign`
    pub fn window(&self, left: f64, right: f64, sign: f64) -> (Vec<f64>, Vec<f64>) {
        self.x
            .iter()
            .zip(self.y.iter())
            .filter(|(x, _)| **x >= left - WINDOW_TOLERANCE && **x <= right + WINDOW_TOLERANCE)
            .map(|(x, y)| (*x, sign * *y))
            .unzip()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_samples() {
        assert_eq!(
            Trace::new(vec![0.0, 1.0], vec![0.0]),
            Err(TraceError::LengthMismatch(2, 1))
        );
        assert_eq!(
            Trace::new(vec![0.0, 1.0, 1.0], vec![0.0, 0.0, 0.0]),
            Err(TraceError::NotIncreasing(2))
        );
        assert_eq!(
            Trace::new(vec![0.0, 1.0], vec![0.0, f64::NAN]),
            Err(TraceError::NonFinite(1))
        );
    }

    #[test]
    fn test_coverage_includes_last_step() {
        let trace = Trace::from_uniform(0.0, 0.2, vec![0.0; 200]).unwrap();
        let (first, end) = trace.coverage().unwrap();
        assert_eq!(first, 0.0);
        assert!((end - 40.0).abs() < 1e-9);
        assert!(trace.covers(0.0, 40.0));
        assert!(trace.covers(10.0, 20.0));
        assert!(!trace.covers(-1.0, 20.0));
        assert!(!trace.covers(10.0, 41.0));
    }

    #[test]
    fn test_window_applies_sign() {
        let trace = Trace::from_uniform(0.0, 1.0, vec![1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        let (x, y) = trace.window(1.0, 3.0, -1.0);
        assert_eq!(x, vec![1.0, 2.0, 3.0]);
        assert_eq!(y, vec![-2.0, -3.0, -4.0]);
    }
}

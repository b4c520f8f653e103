use ndarray::{s, Array1, ArrayView1};

use super::constants::{GRID_STEP, MIN_SPLINE_POINTS};
use super::detector::DetectorSign;
use super::error::IntegrationError;
use super::spline::SmoothingSpline;
use super::trace::Trace;

/// Half-open index range `[left_edge_idx, right_edge_idx)` into the resampled grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeakRegion {
    pub left_edge_idx: usize,
    pub right_edge_idx: usize,
}

impl PeakRegion {
    pub fn width(&self) -> usize {
        self.right_edge_idx - self.left_edge_idx
    }

    /// Index, relative to the start of the region, of the last point inside it
    pub fn last_offset(&self) -> usize {
        self.right_edge_idx - self.left_edge_idx - 1
    }
}

/// Straight line approximating the signal under the peak
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Baseline {
    pub slope: f64,
    pub intercept: f64,
}

impl Baseline {
    pub fn through(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        let slope = (y1 - y0) / (x1 - x0);
        Self {
            slope,
            intercept: y0 - slope * x0,
        }
    }

    pub fn flat(y: f64) -> Self {
        Self {
            slope: 0.0,
            intercept: y,
        }
    }

    pub fn at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Everything produced while integrating a detected peak. The arrays cover the peak region only.
#[derive(Debug, Clone)]
pub struct PeakIntegration {
    pub region: PeakRegion,
    pub baseline: Baseline,
    pub x: Array1<f64>,
    pub smoothed: Array1<f64>,
    pub baseline_values: Array1<f64>,
    pub corrected: Array1<f64>,
    pub integral: f64,
}

/// The result of integrating one window of a trace
#[derive(Debug, Clone)]
pub enum PeakOutcome {
    Integral(PeakIntegration),
    /// The second derivative never reached the threshold
    NoPeak,
    /// The peak region has no width, so no baseline can be drawn
    Degenerate(PeakRegion),
}

impl PeakOutcome {
    /// The numeric value reported for this outcome: the integral, 0 for no peak, NaN for a
    /// degenerate peak
    pub fn value(&self) -> f64 {
        match self {
            Self::Integral(peak) => peak.integral,
            Self::NoPeak => 0.0,
            Self::Degenerate(_) => f64::NAN,
        }
    }
}

/// PeakIntegrator finds and integrates a single peak inside a window of a trace.
///
/// The trace is fit with a smoothing cubic spline. The second derivative of the spline is
/// scanned on a 0.2 s grid; the peak spans the first to the last grid point where the second
/// derivative is at least `threshold`. A straight baseline through the ends of that span is
/// subtracted and the remainder integrated with the trapezoidal rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakIntegrator {
    pub left: f64,
    pub right: f64,
    pub sign: DetectorSign,
    pub threshold: f64,
    pub smoothing: f64,
}

impl PeakIntegrator {
    /// Create a new PeakIntegrator.
    pub fn new(left: f64, right: f64, sign: DetectorSign, threshold: f64, smoothing: f64) -> Self {
        Self {
            left,
            right,
            sign,
            threshold,
            smoothing,
        }
    }

    /// Integrate the peak within the window of the trace.
    ///
    /// A malformed window or parameters are an error. Not finding a peak, or finding a peak of
    /// zero width, are regular outcomes.
    pub fn integrate(&self, trace: &Trace) -> Result<PeakOutcome, IntegrationError> {
        self.validate(trace)?;

        let (x, y) = trace.window(self.left, self.right, self.sign.factor());
        if x.len() < MIN_SPLINE_POINTS {
            return Err(IntegrationError::TooFewSamples(x.len()));
        }
        let spline = SmoothingSpline::fit(&x, &y, self.smoothing)?;

        let grid = Array1::range(self.left, self.right, GRID_STEP);
        let smoothed = spline.evaluate_grid(&grid, 0);
        let second_der = spline.evaluate_grid(&grid, 2);

        let max_second_der = second_der.fold(f64::NEG_INFINITY, |acc, v| acc.max(*v));
        if max_second_der < self.threshold {
            spdlog::debug!(
                "No peak in [{}, {}]: max second derivative {max_second_der:.3} below threshold {}",
                self.left,
                self.right,
                self.threshold
            );
            return Ok(PeakOutcome::NoPeak);
        }

        let region = match find_edges(&second_der, self.threshold) {
            Some(region) => region,
            None => return Ok(PeakOutcome::NoPeak),
        };
        if region.width() == 0 {
            spdlog::warn!(
                "Peak edges in [{}, {}] meet at index {}; the peak has no width",
                self.left,
                self.right,
                region.left_edge_idx
            );
            return Ok(PeakOutcome::Degenerate(region));
        }

        let xpeak = grid
            .slice(s![region.left_edge_idx..region.right_edge_idx])
            .to_owned();
        let ypeak = smoothed
            .slice(s![region.left_edge_idx..region.right_edge_idx])
            .to_owned();
        let last = region.last_offset();
        // A one point region anchors both ends on the same sample
        let baseline = if last == 0 {
            Baseline::flat(ypeak[0])
        } else {
            Baseline::through(xpeak[0], ypeak[0], xpeak[last], ypeak[last])
        };
        let baseline_values = xpeak.mapv(|x| baseline.at(x));
        let corrected = &ypeak - &baseline_values;
        let integral = trapezoid(corrected.view(), GRID_STEP);

        spdlog::debug!(
            "Peak edges at {:.1} s and {:.1} s; baseline slope {:.4}, intercept {:.4}; integral {integral:.4}",
            xpeak[0],
            xpeak[last],
            baseline.slope,
            baseline.intercept
        );

        Ok(PeakOutcome::Integral(PeakIntegration {
            region,
            baseline,
            x: xpeak,
            smoothed: ypeak,
            baseline_values,
            corrected,
            integral,
        }))
    }

    fn validate(&self, trace: &Trace) -> Result<(), IntegrationError> {
        if !self.left.is_finite() || !self.right.is_finite() || self.left >= self.right {
            return Err(IntegrationError::BadWindow(self.left, self.right));
        }
        if !self.threshold.is_finite() || self.threshold <= 0.0 {
            return Err(IntegrationError::BadThreshold(self.threshold));
        }
        if !trace.covers(self.left, self.right) {
            let (first, last) = trace.coverage().unwrap_or((f64::NAN, f64::NAN));
            return Err(IntegrationError::WindowNotCovered {
                left: self.left,
                right: self.right,
                first,
                last,
            });
        }
        Ok(())
    }
}

/// Integrate a single peak. See [`PeakIntegrator`].
pub fn integrate(
    trace: &Trace,
    left: f64,
    right: f64,
    sign: DetectorSign,
    threshold: f64,
    smoothing: f64,
) -> Result<PeakOutcome, IntegrationError> {
    PeakIntegrator::new(left, right, sign, threshold, smoothing).integrate(trace)
}

/// First index scanning forwards and last index scanning backwards where the second derivative
/// reaches the threshold
fn find_edges(second_der: &Array1<f64>, threshold: f64) -> Option<PeakRegion> {
    let left_edge_idx = second_der.iter().position(|v| *v >= threshold)?;
    let right_edge_idx = second_der.iter().rposition(|v| *v >= threshold)?;
    Some(PeakRegion {
        left_edge_idx,
        right_edge_idx,
    })
}

/// Trapezoidal rule over evenly spaced values
pub fn trapezoid(values: ArrayView1<f64>, dx: f64) -> f64 {
    values
        .windows(2)
        .into_iter()
        .map(|w| 0.5 * (w[0] + w[1]) * dx)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    /// 200 samples at 0.2 s covering [0, 40) with a triangle of height 1000 on [15, 25]
    fn triangle_trace(offset: f64, sign: f64) -> Trace {
        let y = (0..200)
            .map(|i| {
                let t = i as f64 * GRID_STEP;
                let bump = if (15.0..=20.0).contains(&t) {
                    200.0 * (t - 15.0)
                } else if t > 20.0 && t <= 25.0 {
                    200.0 * (25.0 - t)
                } else {
                    0.0
                };
                sign * (bump + offset)
            })
            .collect();
        Trace::from_uniform(0.0, GRID_STEP, y).unwrap()
    }

    fn expect_integral(outcome: PeakOutcome) -> PeakIntegration {
        match outcome {
            PeakOutcome::Integral(peak) => peak,
            other => panic!("Expected an integral, found {other:?}"),
        }
    }

    #[test]
    fn test_triangle_area() {
        let trace = triangle_trace(0.0, 1.0);
        let peak = expect_integral(
            integrate(&trace, 0.0, 40.0, DetectorSign::Positive, 100.0, 10.0).unwrap(),
        );
        // The triangle holds 5000; the right corner sits on the exclusive edge, so the baseline
        // is pulled up a little
        assert!(
            peak.integral > 4700.0 && peak.integral < 5050.0,
            "integral {} should be near 5000",
            peak.integral
        );
        let left_time = peak.x[0];
        let right_time = peak.x[peak.region.last_offset()];
        assert!(left_time > 14.0 && left_time < 15.1);
        assert!(right_time > 24.5 && right_time < 26.0);
    }

    #[test]
    fn test_inverted_detector_matches_positive() {
        let upright = triangle_trace(0.0, 1.0);
        let inverted = triangle_trace(0.0, -1.0);
        let a = integrate(&upright, 0.0, 40.0, DetectorSign::Positive, 100.0, 10.0)
            .unwrap()
            .value();
        let b = integrate(&inverted, 0.0, 40.0, DetectorSign::Inverted, 100.0, 10.0)
            .unwrap()
            .value();
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn test_baseline_anchors_are_exact() {
        let trace = triangle_trace(35.0, 1.0);
        let peak = expect_integral(
            integrate(&trace, 0.0, 40.0, DetectorSign::Positive, 100.0, 10.0).unwrap(),
        );
        let last = peak.region.last_offset();
        assert_eq!(peak.corrected.len(), peak.region.width());
        assert!(peak.corrected[0].abs() < 1e-9);
        assert!(peak.corrected[last].abs() < 1e-9);
    }

    #[test]
    fn test_offset_before_fit_cancels() {
        let plain = integrate(
            &triangle_trace(0.0, 1.0),
            0.0,
            40.0,
            DetectorSign::Positive,
            100.0,
            10.0,
        )
        .unwrap()
        .value();
        let shifted = integrate(
            &triangle_trace(500.0, 1.0),
            0.0,
            40.0,
            DetectorSign::Positive,
            100.0,
            10.0,
        )
        .unwrap()
        .value();
        assert!((plain - shifted).abs() < 1e-6, "{plain} != {shifted}");
    }

    #[test]
    fn test_offset_after_baseline_does_not_cancel() {
        let peak = expect_integral(
            integrate(
                &triangle_trace(0.0, 1.0),
                0.0,
                40.0,
                DetectorSign::Positive,
                100.0,
                10.0,
            )
            .unwrap(),
        );
        let raised = peak.corrected.mapv(|v| v + 500.0);
        let raised_integral = trapezoid(raised.view(), GRID_STEP);
        let expected_shift = 500.0 * (peak.region.width() - 1) as f64 * GRID_STEP;
        assert!((raised_integral - peak.integral - expected_shift).abs() < 1e-6);
    }

    #[test]
    fn test_flat_trace_has_no_peak() {
        let flat = Trace::from_uniform(0.0, GRID_STEP, vec![250.0; 200]).unwrap();
        let outcome = integrate(&flat, 0.0, 40.0, DetectorSign::Positive, 1.0, 10.0).unwrap();
        assert!(matches!(outcome, PeakOutcome::NoPeak));
        assert_eq!(outcome.value(), 0.0);

        let zeros = Trace::from_uniform(0.0, GRID_STEP, vec![0.0; 200]).unwrap();
        let outcome = integrate(&zeros, 5.0, 30.0, DetectorSign::Inverted, 100.0, 0.0).unwrap();
        assert!(matches!(outcome, PeakOutcome::NoPeak));
    }

    #[test]
    fn test_single_point_crossing_is_degenerate() {
        // A V with its kink at 20 s: only the kink sample clears the threshold
        let y = (0..200)
            .map(|i| 50.0 * (i as f64 * GRID_STEP - 20.0).abs())
            .collect();
        let trace = Trace::from_uniform(0.0, GRID_STEP, y).unwrap();
        let outcome = integrate(&trace, 0.0, 40.0, DetectorSign::Positive, 500.0, 0.0).unwrap();
        match outcome {
            PeakOutcome::Degenerate(region) => {
                assert_eq!(region.left_edge_idx, region.right_edge_idx);
                assert_eq!(region.left_edge_idx, 100);
            }
            other => panic!("Expected a degenerate peak, found {other:?}"),
        }
        assert!(outcome.value().is_nan());
    }

    #[test]
    fn test_adjacent_crossings_integrate_to_zero() {
        // Kinks at 20.0 s and 20.2 s: exactly two neighbouring grid points clear the threshold
        let y = (0..200)
            .map(|i| {
                let t = i as f64 * GRID_STEP;
                50.0 * (t - 20.0).abs() + 50.0 * (t - 20.2).abs()
            })
            .collect();
        let trace = Trace::from_uniform(0.0, GRID_STEP, y).unwrap();
        let peak = expect_integral(
            integrate(&trace, 0.0, 40.0, DetectorSign::Positive, 500.0, 0.0).unwrap(),
        );
        assert_eq!(peak.region.left_edge_idx, 100);
        assert_eq!(peak.region.right_edge_idx, 101);
        assert_eq!(peak.region.width(), 1);
        assert_eq!(peak.baseline.slope, 0.0);
        assert_eq!(peak.corrected.len(), 1);
        assert_eq!(peak.corrected[0], 0.0);
        assert_eq!(peak.integral, 0.0);
    }

    #[test]
    fn test_inverted_gaussian() {
        // TCD style negative gaussian, sigma 1 s, height 1000
        let y = (0..200)
            .map(|i| {
                let t = i as f64 * GRID_STEP - 20.0;
                -1000.0 * (-0.5 * t * t).exp()
            })
            .collect();
        let trace = Trace::from_uniform(0.0, GRID_STEP, y).unwrap();
        let value = integrate(&trace, 10.0, 30.0, DetectorSign::Inverted, 100.0, 1.0)
            .unwrap()
            .value();
        // Full area is 1000 * sqrt(2 pi); the edges and baseline trim a few percent
        assert!(value > 2200.0 && value < 2506.7, "integral {value}");
    }

    #[test]
    fn test_malformed_windows() {
        let trace = Trace::from_uniform(0.0, GRID_STEP, vec![0.0; 10]).unwrap();
        assert_eq!(
            integrate(&trace, 1.0, 1.0, DetectorSign::Positive, 1.0, 0.0).unwrap_err(),
            IntegrationError::BadWindow(1.0, 1.0)
        );
        assert!(matches!(
            integrate(&trace, 0.0, 5.0, DetectorSign::Positive, 1.0, 0.0).unwrap_err(),
            IntegrationError::WindowNotCovered { .. }
        ));
        assert_eq!(
            integrate(&trace, 0.0, 0.4, DetectorSign::Positive, 1.0, 0.0).unwrap_err(),
            IntegrationError::TooFewSamples(3)
        );
        assert_eq!(
            integrate(&trace, 0.0, 1.0, DetectorSign::Positive, 0.0, 0.0).unwrap_err(),
            IntegrationError::BadThreshold(0.0)
        );
        assert!(matches!(
            integrate(&trace, 0.0, 1.0, DetectorSign::Positive, 1.0, -2.0).unwrap_err(),
            IntegrationError::SplineError(_)
        ));
    }

    #[test]
    fn test_trapezoid() {
        assert_eq!(trapezoid(Array1::<f64>::zeros(0).view(), 0.2), 0.0);
        assert_eq!(trapezoid(array![3.0].view(), 0.2), 0.0);
        assert!((trapezoid(array![0.0, 1.0, 2.0, 1.0, 0.0].view(), 0.5) - 2.0).abs() < 1e-12);
    }
}

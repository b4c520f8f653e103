/// Spacing of the resampled grid used for edge finding and integration (seconds)
pub const GRID_STEP: f64 = 0.2;
/// The GC samples at 5 Hz, so each line of an ASC file is one GRID_STEP
pub const SAMPLES_PER_SECOND: f64 = 5.0;
/// Number of header lines in an ASC export before the first intensity line
pub const DEFAULT_DATA_START_LINE: usize = 25;
/// A cubic needs at least this many samples
pub const MIN_SPLINE_POINTS: usize = 4;
/// Upper bound on Newton steps when solving for the smoothing multiplier
pub const MAX_SMOOTHING_ITERATIONS: usize = 100;
/// Tolerance used when comparing sample positions against window bounds
pub const WINDOW_TOLERANCE: f64 = 1.0e-9;
/// Name of the log file written by the applications
pub const LOG_FILE_NAME: &str = "gc_integrator.log";

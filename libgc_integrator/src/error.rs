use std::path::PathBuf;
use thiserror::Error;

use super::constants::MIN_SPLINE_POINTS;
use super::worker_status::WorkerStatus;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TraceError {
    #[error("Trace was given {0} x values and {1} y values")]
    LengthMismatch(usize, usize),
    #[error("Trace contains a non-finite sample at index {0}")]
    NonFinite(usize),
    #[error("Trace x values are not strictly increasing at index {0}")]
    NotIncreasing(usize),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SplineError {
    #[error("SmoothingSpline requires at least {min} points, found {0}", min=MIN_SPLINE_POINTS)]
    TooFewPoints(usize),
    #[error("SmoothingSpline was given {0} x values and {1} y values")]
    LengthMismatch(usize, usize),
    #[error("SmoothingSpline was given non-finite data")]
    NonFiniteData,
    #[error("SmoothingSpline x values are not strictly increasing at index {0}")]
    NotIncreasing(usize),
    #[error("Invalid smoothing factor {0}; must be finite and non-negative")]
    BadSmoothing(f64),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntegrationError {
    #[error("Invalid integration window [{0}, {1}]; the left bound must be below the right bound")]
    BadWindow(f64, f64),
    #[error("Integration window [{left}, {right}] is not covered by the trace spanning [{first}, {last}]")]
    WindowNotCovered {
        left: f64,
        right: f64,
        first: f64,
        last: f64,
    },
    #[error("Integration window contains {0} samples; at least {min} are required", min=MIN_SPLINE_POINTS)]
    TooFewSamples(usize),
    #[error("Invalid second derivative threshold {0}; must be finite and positive")]
    BadThreshold(f64),
    #[error("Integration failed due to spline error: {0}")]
    SplineError(#[from] SplineError),
}

#[derive(Debug, Error)]
pub enum AscFileError {
    #[error("Could not open AscFile because file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("AscFile failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("AscFile could not parse intensity on line {0}: {1:?}")]
    ParsingError(usize, String),
    #[error("AscFile {0:?} did not contain any samples after the header")]
    NoSamples(PathBuf),
    #[error("AscFile produced an invalid trace: {0}")]
    TraceError(#[from] TraceError),
}

#[derive(Debug, Error)]
pub enum RunGroupError {
    #[error("RunGroup failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Could not group runs because directory {0:?} does not exist")]
    BadDirectory(PathBuf),
    #[error("RunGroup did not find any ASC files in directory {0:?}")]
    NoMatchingFiles(PathBuf),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Config failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Config failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
    #[error("Config requires at least one worker thread, found {0}")]
    BadThreadCount(i32),
    #[error("Config does not define any species to integrate")]
    NoSpecies,
    #[error("Config defines species {0} more than once")]
    DuplicateSpecies(String),
    #[error("Config species {0} has an invalid window [{1}, {2}]")]
    BadSpeciesWindow(String, f64, f64),
    #[error("Config species {0} has an invalid threshold or smoothing factor")]
    BadSpeciesParameter(String),
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Report failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Report failed to write CSV: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Report could not find a column for species {0}")]
    MissingSpecies(String),
}

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Processor failed due to RunGroup error: {0}")]
    RunGroupError(#[from] RunGroupError),
    #[error("Processor failed due to Config error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Processor failed due to Report error: {0}")]
    ReportError(#[from] ReportError),
    #[error("Processor failed due to Send error: {0}")]
    SendError(#[from] std::sync::mpsc::SendError<WorkerStatus>),
    #[error("Processor failed because a worker thread panicked")]
    WorkerPanic,
}

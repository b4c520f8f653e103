use serde::Serialize;
use std::path::Path;

use super::error::ReportError;
use super::peak::PeakIntegration;

#[derive(Debug, Serialize)]
struct DiagnosticRow {
    x: f64,
    smoothed: f64,
    baseline: f64,
    corrected: f64,
}

/// Write the smoothed signal, baseline and corrected signal of an integrated peak region to a
/// CSV file, so the integration can be inspected after the fact.
pub fn write_peak_diagnostics(path: &Path, peak: &PeakIntegration) -> Result<(), ReportError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut wtr = csv::Writer::from_path(path)?;
    for idx in 0..peak.x.len() {
        wtr.serialize(DiagnosticRow {
            x: peak.x[idx],
            smoothed: peak.smoothed[idx],
            baseline: peak.baseline_values[idx],
            corrected: peak.corrected[idx],
        })?;
    }
    wtr.flush()?;
    Ok(())
}

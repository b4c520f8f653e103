use std::fmt::Display;
use std::io::Write;
use std::path::Path;

use super::config::{ConversionConfig, EfficiencyConfig};
use super::error::ReportError;
use super::peak::PeakOutcome;

const RUN_COLUMN: &str = "run";
const EFFICIENCY_SUFFIX: &str = " FE/%";
const CONVERSION_SUFFIX: &str = " SPC";
/// Molar volume of an ideal gas at STP (L/mol)
const MOLAR_VOLUME: f64 = 22.4;

/// What happened when integrating one species of one run
#[derive(Debug, Clone, PartialEq)]
pub enum SpeciesOutcome {
    Integral(f64),
    NoPeak,
    Degenerate,
    /// The run has no file from the species' detector
    Missing,
    Failed(String),
}

impl SpeciesOutcome {
    /// The number reported for this outcome. None when there is nothing to report.
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Integral(v) => Some(*v),
            Self::NoPeak => Some(0.0),
            Self::Degenerate => Some(f64::NAN),
            Self::Missing | Self::Failed(_) => None,
        }
    }
}

impl From<&PeakOutcome> for SpeciesOutcome {
    fn from(outcome: &PeakOutcome) -> Self {
        match outcome {
            PeakOutcome::Integral(peak) => Self::Integral(peak.integral),
            PeakOutcome::NoPeak => Self::NoPeak,
            PeakOutcome::Degenerate(_) => Self::Degenerate,
        }
    }
}

impl Display for SpeciesOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integral(v) => write!(f, "{v:.4}"),
            Self::NoPeak => write!(f, "no peak"),
            Self::Degenerate => write!(f, "degenerate peak - skipped"),
            Self::Missing => write!(f, "no detector file"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Outcomes for every configured species of one run, in configuration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunResult {
    pub run_number: u32,
    pub outcomes: Vec<(String, SpeciesOutcome)>,
}

impl RunResult {
    pub fn new(run_number: u32) -> Self {
        Self {
            run_number,
            outcomes: Vec::new(),
        }
    }

    pub fn insert(&mut self, species: &str, outcome: SpeciesOutcome) {
        match self.outcomes.iter_mut().find(|(name, _)| name == species) {
            Some(entry) => entry.1 = outcome,
            None => self.outcomes.push((species.to_string(), outcome)),
        }
    }

    pub fn get(&self, species: &str) -> Option<&SpeciesOutcome> {
        self.outcomes
            .iter()
            .find(|(name, _)| name == species)
            .map(|(_, outcome)| outcome)
    }
}

/// Tally of outcomes across a table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeCounts {
    pub integrals: usize,
    pub no_peak: usize,
    pub degenerate: usize,
    pub missing: usize,
    pub failed: usize,
}

/// Peak integrals by run (rows) and species (columns)
#[derive(Debug, Clone, Default)]
pub struct ResultsTable {
    species: Vec<String>,
    rows: Vec<RunResult>,
}

impl ResultsTable {
    pub fn new(species: Vec<String>) -> Self {
        Self {
            species,
            rows: Vec::new(),
        }
    }

    /// Add many rows, keeping the table ordered by run number
    pub fn extend(&mut self, results: impl IntoIterator<Item = RunResult>) {
        self.rows.extend(results);
        self.rows.sort_by_key(|r| r.run_number);
    }

    pub fn rows(&self) -> &[RunResult] {
        &self.rows
    }

    pub fn counts(&self) -> OutcomeCounts {
        let mut counts = OutcomeCounts::default();
        for (_, outcome) in self.rows.iter().flat_map(|r| r.outcomes.iter()) {
            match outcome {
                SpeciesOutcome::Integral(_) => counts.integrals += 1,
                SpeciesOutcome::NoPeak => counts.no_peak += 1,
                SpeciesOutcome::Degenerate => counts.degenerate += 1,
                SpeciesOutcome::Missing => counts.missing += 1,
                SpeciesOutcome::Failed(_) => counts.failed += 1,
            }
        }
        counts
    }

    /// Write the table to a CSV file
    pub fn write_csv(
        &self,
        path: &Path,
        efficiency: Option<&EfficiencyConfig>,
        conversion: Option<&ConversionConfig>,
    ) -> Result<(), ReportError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = std::fs::File::create(path)?;
        self.write_csv_to(file, efficiency, conversion)
    }

    /// Write the table as CSV. Optional Faradaic efficiency and single pass conversion columns
    /// follow the integrals.
    pub fn write_csv_to<W: Write>(
        &self,
        writer: W,
        efficiency: Option<&EfficiencyConfig>,
        conversion: Option<&ConversionConfig>,
    ) -> Result<(), ReportError> {
        let efficiency_species: Vec<(&String, f64)> = match efficiency {
            Some(eff) => self
                .species
                .iter()
                .filter_map(|s| eff.calibrations.get(s).map(|cal| (s, *cal)))
                .collect(),
            None => Vec::new(),
        };
        if let Some(conv) = conversion {
            if !self.species.contains(&conv.species) {
                return Err(ReportError::MissingSpecies(conv.species.clone()));
            }
        }

        let mut wtr = csv::Writer::from_writer(writer);
        let mut header: Vec<String> = vec![RUN_COLUMN.to_string()];
        header.extend(self.species.iter().cloned());
        header.extend(
            efficiency_species
                .iter()
                .map(|(s, _)| format!("{s}{EFFICIENCY_SUFFIX}")),
        );
        if let Some(conv) = conversion {
            header.push(format!("{}{CONVERSION_SUFFIX}", conv.species));
        }
        wtr.write_record(&header)?;

        for row in self.rows.iter() {
            let mut record: Vec<String> = vec![row.run_number.to_string()];
            for species in self.species.iter() {
                record.push(format_cell(row.get(species).and_then(|o| o.value())));
            }
            if let Some(eff) = efficiency {
                for (species, calibration) in efficiency_species.iter() {
                    let value = row
                        .get(species)
                        .and_then(|o| o.value())
                        .map(|v| faradaic_efficiency(v, *calibration, eff.current_ma));
                    record.push(format_cell(value));
                }
            }
            if let Some(conv) = conversion {
                let value = row
                    .get(&conv.species)
                    .and_then(|o| o.value())
                    .map(|v| single_pass_conversion(v, conv));
                record.push(format_cell(value));
            }
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

fn format_cell(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v}"),
        None => String::new(),
    }
}

/// Percentage of the cell current that went into a product
pub fn faradaic_efficiency(integral: f64, calibration: f64, current_ma: f64) -> f64 {
    integral * calibration / current_ma * 100.0
}

/// Fraction of the CO fed to the cell that was consumed in one pass
pub fn single_pass_conversion(integral: f64, conversion: &ConversionConfig) -> f64 {
    let co_measured = integral * conversion.calibration; // mol CO / min
    let co_fed = conversion.total_flow_rate / (1000.0 * MOLAR_VOLUME)
        * (conversion.co_flow_rate / conversion.total_flow_rate); // mol CO / min at 0% conversion
    1.0 - co_measured / co_fed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn sample_table() -> ResultsTable {
        let mut table = ResultsTable::new(vec!["CO".to_string(), "H2".to_string()]);
        let mut two = RunResult::new(2);
        two.insert("CO", SpeciesOutcome::Degenerate);
        two.insert("H2", SpeciesOutcome::Failed("bad window".to_string()));
        let mut one = RunResult::new(1);
        one.insert("CO", SpeciesOutcome::Integral(1000.0));
        one.insert("H2", SpeciesOutcome::NoPeak);
        table.extend(vec![two, one]);
        table
    }

    #[test]
    fn test_rows_sorted_and_counted() {
        let table = sample_table();
        let numbers: Vec<u32> = table.rows().iter().map(|r| r.run_number).collect();
        assert_eq!(numbers, vec![1, 2]);
        let counts = table.counts();
        assert_eq!(counts.integrals, 1);
        assert_eq!(counts.no_peak, 1);
        assert_eq!(counts.degenerate, 1);
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.missing, 0);

        let co: Vec<Option<f64>> = table
            .rows()
            .iter()
            .map(|r| r.get("CO").and_then(|o| o.value()))
            .collect();
        assert_eq!(co[0], Some(1000.0));
        assert!(co[1].unwrap().is_nan());
        assert_eq!(table.rows()[1].get("H2").and_then(|o| o.value()), None);
        assert_eq!(
            table.rows()[1].get("CO").unwrap().to_string(),
            "degenerate peak - skipped"
        );
    }

    #[test]
    fn test_csv_cells() {
        let table = sample_table();
        let mut buffer: Vec<u8> = Vec::new();
        table.write_csv_to(&mut buffer, None, None).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["run,CO,H2", "1,1000,0", "2,NaN,"]);
    }

    #[test]
    fn test_csv_with_conversions() {
        let table = sample_table();
        let efficiency = EfficiencyConfig {
            current_ma: 100.0,
            calibrations: BTreeMap::from([("CO".to_string(), 0.01)]),
        };
        let conversion = ConversionConfig::default();
        let mut buffer: Vec<u8> = Vec::new();
        table
            .write_csv_to(&mut buffer, Some(&efficiency), Some(&conversion))
            .unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "run,CO,H2,CO FE/%,CO SPC");
        let first: Vec<&str> = lines[1].split(',').collect();
        assert_eq!(first[3], "10");
        let spc: f64 = first[4].parse().unwrap();
        assert!((spc - single_pass_conversion(1000.0, &conversion)).abs() < 1e-12);
    }

    #[test]
    fn test_single_pass_conversion() {
        let conversion = ConversionConfig::default();
        assert_eq!(single_pass_conversion(0.0, &conversion), 1.0);
        // The area measured with no conversion at all
        let co_fed = 1.0 / (1000.0 * MOLAR_VOLUME);
        let full_area = co_fed / conversion.calibration;
        assert!(single_pass_conversion(full_area, &conversion).abs() < 1e-9);
    }

    #[test]
    fn test_missing_conversion_species() {
        let table = sample_table();
        let conversion = ConversionConfig {
            species: "C2H4".to_string(),
            ..Default::default()
        };
        let mut buffer: Vec<u8> = Vec::new();
        assert!(matches!(
            table.write_csv_to(&mut buffer, None, Some(&conversion)),
            Err(ReportError::MissingSpecies(_))
        ));
    }
}

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::constants::DEFAULT_DATA_START_LINE;
use super::detector::Detector;
use super::error::ConfigError;
use super::peak::PeakIntegrator;

/// Window, threshold and smoothing used to integrate one gas species
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesConfig {
    pub name: String,
    pub detector: Detector,
    pub left: f64,
    pub right: f64,
    pub threshold: f64,
    pub smoothing: f64,
}

impl SpeciesConfig {
    pub fn new(
        name: &str,
        detector: Detector,
        left: f64,
        right: f64,
        threshold: f64,
        smoothing: f64,
    ) -> Self {
        Self {
            name: name.to_string(),
            detector,
            left,
            right,
            threshold,
            smoothing,
        }
    }

    /// The PeakIntegrator for this species
    pub fn integrator(&self) -> PeakIntegrator {
        PeakIntegrator::new(
            self.left,
            self.right,
            self.detector.sign(),
            self.threshold,
            self.smoothing,
        )
    }
}

/// Faradaic efficiency conversion.
///
/// `calibrations` maps a species to the charge equivalent (mA) per unit of peak area, so that
/// FE% = integral * calibration / current_ma * 100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyConfig {
    pub current_ma: f64,
    pub calibrations: BTreeMap<String, f64>,
}

impl Default for EfficiencyConfig {
    fn default() -> Self {
        let calibrations = BTreeMap::from([
            (String::from("C2H4"), 57.7531642857143 / 2019566.04657302),
            (String::from("CH4"), 4.16953035714286 / 141990.386115765),
            (String::from("H2"), 14.1597480654762 / 34959.0238571043),
            (String::from("CO"), 0.0 / 715060.1018),
        ]);
        Self {
            current_ma: 200.0,
            calibrations,
        }
    }
}

/// CO single pass conversion. `calibration` converts a CO peak area to mol/min.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionConfig {
    pub species: String,
    pub calibration: f64,
    pub co_flow_rate: f64,
    pub total_flow_rate: f64,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            species: String::from("CO"),
            calibration: (5000.0 / 10e9 / 22.4) / 715060.1018,
            co_flow_rate: 1.0,
            total_flow_rate: 20.0,
        }
    }
}

/// Structure representing the application configuration. Contains pathing and species information
/// Configs are seralizable and deserializable to YAML using serde and serde_yaml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub asc_path: PathBuf,
    pub output_path: PathBuf,
    pub diagnostics_path: Option<PathBuf>,
    pub data_start_line: usize,
    pub n_threads: i32,
    pub species: Vec<SpeciesConfig>,
    pub efficiency: Option<EfficiencyConfig>,
    pub co_conversion: Option<ConversionConfig>,
}

impl Default for Config {
    /// Generate a new Config with the 9 minute CO program windows. Paths are empty/invalid
    fn default() -> Self {
        Self {
            asc_path: PathBuf::from("None"),
            output_path: PathBuf::from("None"),
            diagnostics_path: None,
            data_start_line: DEFAULT_DATA_START_LINE,
            n_threads: 1,
            species: vec![
                SpeciesConfig::new("CO", Detector::Fid, 180.0, 220.0, 280.0, 10.0),
                SpeciesConfig::new("CH4", Detector::Fid, 200.0, 250.0, 1000.0, 10.0),
                SpeciesConfig::new("C2H4", Detector::Fid, 460.0, 520.0, 1000.0, 10.0),
                SpeciesConfig::new("H2", Detector::Tcd, 90.0, 105.0, 2500.0, 10.0),
            ],
            efficiency: None,
            co_conversion: None,
        }
    }
}

impl Config {
    /// Read the configuration in a YAML file
    /// Returns a Config if successful
    pub fn read_config_file(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::BadFilePath(config_path.to_path_buf()));
        }

        let yaml_str = std::fs::read_to_string(config_path)?;

        Ok(serde_yaml::from_str::<Self>(&yaml_str)?)
    }

    /// Write the configuration to a YAML file
    pub fn write_config_file(&self, config_path: &Path) -> Result<(), ConfigError> {
        let yaml_str = serde_yaml::to_string(self)?;
        std::fs::write(config_path, yaml_str)?;
        Ok(())
    }

    /// Check the configuration for values that would fail every run
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.is_n_threads_valid() {
            return Err(ConfigError::BadThreadCount(self.n_threads));
        }
        if self.species.is_empty() {
            return Err(ConfigError::NoSpecies);
        }
        for (idx, species) in self.species.iter().enumerate() {
            if self.species[..idx].iter().any(|s| s.name == species.name) {
                return Err(ConfigError::DuplicateSpecies(species.name.clone()));
            }
            if !species.left.is_finite()
                || !species.right.is_finite()
                || species.left < 0.0
                || species.left >= species.right
            {
                return Err(ConfigError::BadSpeciesWindow(
                    species.name.clone(),
                    species.left,
                    species.right,
                ));
            }
            if !species.threshold.is_finite()
                || species.threshold <= 0.0
                || !species.smoothing.is_finite()
                || species.smoothing < 0.0
            {
                return Err(ConfigError::BadSpeciesParameter(species.name.clone()));
            }
        }
        Ok(())
    }

    /// Species integrated from files of the given detector
    pub fn species_for(&self, detector: &Detector) -> impl Iterator<Item = &SpeciesConfig> {
        let detector = *detector;
        self.species.iter().filter(move |s| s.detector == detector)
    }

    pub fn species_names(&self) -> Vec<String> {
        self.species.iter().map(|s| s.name.clone()).collect()
    }

    /// Get the path to the diagnostic file for a run and species, if diagnostics are enabled
    pub fn get_diagnostics_file_name(&self, run_number: u32, species: &str) -> Option<PathBuf> {
        self.diagnostics_path
            .as_ref()
            .map(|dir| dir.join(format!("{}_{species}.csv", self.get_run_str(run_number))))
    }

    /// Construct the run string
    pub fn get_run_str(&self, run_number: u32) -> String {
        format!("run_{run_number:0>4}")
    }

    pub fn is_n_threads_valid(&self) -> bool {
        self.n_threads >= 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.species_for(&Detector::Fid).count(), 3);
        assert_eq!(config.species_for(&Detector::Tcd).count(), 1);
        assert_eq!(config.species_names(), vec!["CO", "CH4", "C2H4", "H2"]);
    }

    #[test]
    fn test_yaml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        let mut config = Config::default();
        config.efficiency = Some(EfficiencyConfig::default());
        config.diagnostics_path = Some(dir.path().join("diag"));
        config.write_config_file(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("detector: tcd"));

        let loaded = Config::read_config_file(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(
            loaded.get_diagnostics_file_name(7, "CO").unwrap(),
            dir.path().join("diag").join("run_0007_CO.csv")
        );
    }

    #[test]
    fn test_validation_failures() {
        let mut config = Config::default();
        config.n_threads = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BadThreadCount(0))
        ));

        let mut config = Config::default();
        config.species.push(config.species[0].clone());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateSpecies(_))
        ));

        let mut config = Config::default();
        config.species[1].right = config.species[1].left;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BadSpeciesWindow(..))
        ));

        let mut config = Config::default();
        config.species[3].threshold = -2500.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BadSpeciesParameter(_))
        ));

        let mut config = Config::default();
        config.species.clear();
        assert!(matches!(config.validate(), Err(ConfigError::NoSpecies)));

        assert!(matches!(
            Config::read_config_file(Path::new("/definitely/not/here.yml")),
            Err(ConfigError::BadFilePath(_))
        ));
    }
}

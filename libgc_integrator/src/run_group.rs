use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::detector::Detector;
use super::error::RunGroupError;

const ASC_EXTENSION: &str = "asc";
const RUN_MARKER: char = 'D';

/// The ASC exports belonging to one GC injection (a "run"), at most one per detector
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunFiles {
    pub run_number: u32,
    pub files: BTreeMap<Detector, PathBuf>,
}

impl RunFiles {
    pub fn new(run_number: u32) -> Self {
        Self {
            run_number,
            files: BTreeMap::new(),
        }
    }

    pub fn get_file(&self, detector: &Detector) -> Option<&Path> {
        self.files.get(detector).map(|p| p.as_path())
    }

    /// Total size of the run's files on disk
    pub fn get_total_size_bytes(&self) -> u64 {
        self.files
            .values()
            .filter_map(|p| p.metadata().ok())
            .fold(0, |sum, meta| sum + meta.len())
    }
}

/// RunGroup collects the ASC files in a directory and sorts them into runs.
///
/// The instrument names exports like `FID1A_D07.ASC`: the detector tag appears in the name and
/// the digits after the final `D` are the run number. Runs are ordered numerically.
#[derive(Debug, Clone, Default)]
pub struct RunGroup {
    runs: Vec<RunFiles>,
}

impl RunGroup {
    /// Scan a directory for ASC files and group them by run
    pub fn new(asc_path: &Path) -> Result<Self, RunGroupError> {
        if !asc_path.is_dir() {
            return Err(RunGroupError::BadDirectory(asc_path.to_path_buf()));
        }

        let mut file_list: Vec<PathBuf> = Vec::new();
        for item in asc_path.read_dir()? {
            let item_path = item?.path();
            let is_asc = item_path
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case(ASC_EXTENSION))
                .unwrap_or(false);
            if is_asc && item_path.is_file() {
                file_list.push(item_path);
            }
        }
        if file_list.is_empty() {
            return Err(RunGroupError::NoMatchingFiles(asc_path.to_path_buf()));
        }
        file_list.sort();

        let mut runs: BTreeMap<u32, RunFiles> = BTreeMap::new();
        for path in file_list {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            let run_number = match parse_run_number(&stem) {
                Some(n) => n,
                None => {
                    spdlog::warn!("Could not find a run number in {name}, skipping...");
                    continue;
                }
            };
            let detector = match Detector::from_file_name(&name) {
                Some(d) => d,
                None => {
                    spdlog::warn!("Could not identify the detector of {name}, skipping...");
                    continue;
                }
            };
            let run = runs
                .entry(run_number)
                .or_insert_with(|| RunFiles::new(run_number));
            if let Some(existing) = run.files.get(&detector) {
                spdlog::warn!(
                    "Run {run_number} already has a {detector} file {}; ignoring {name}",
                    existing.display()
                );
                continue;
            }
            run.files.insert(detector, path);
        }

        Ok(Self {
            runs: runs.into_values().collect(),
        })
    }

    pub fn runs(&self) -> &[RunFiles] {
        &self.runs
    }

    pub fn into_runs(self) -> Vec<RunFiles> {
        self.runs
    }
}

/// The digits following the last `D` of a file stem, e.g. `FID1A_D07` -> 7
pub fn parse_run_number(stem: &str) -> Option<u32> {
    let marker = stem.rfind(RUN_MARKER)?;
    let digits = &stem[marker + RUN_MARKER.len_utf8()..];
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

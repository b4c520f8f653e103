use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Polarity of a detector's signal.
///
/// Raw samples are multiplied by the sign before any fitting, so that a genuine peak always
/// shows up as a positive bump in the second derivative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorSign {
    Positive,
    Inverted,
}

impl DetectorSign {
    pub fn factor(&self) -> f64 {
        match self {
            Self::Positive => 1.0,
            Self::Inverted => -1.0,
        }
    }
}

/// The GC detectors. FID traces are recorded with peaks pointing up, TCD traces with peaks
/// pointing down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Detector {
    Fid,
    Tcd,
}

impl Detector {
    pub fn sign(&self) -> DetectorSign {
        match self {
            Self::Fid => DetectorSign::Positive,
            Self::Tcd => DetectorSign::Inverted,
        }
    }

    /// The tag the instrument software writes into the exported file name
    pub fn file_tag(&self) -> &'static str {
        match self {
            Self::Fid => "FID",
            Self::Tcd => "TCD",
        }
    }

    /// Identify the detector from an exported file name
    pub fn from_file_name(name: &str) -> Option<Self> {
        if name.contains(Self::Fid.file_tag()) {
            Some(Self::Fid)
        } else if name.contains(Self::Tcd.file_tag()) {
            Some(Self::Tcd)
        } else {
            None
        }
    }
}

impl Display for Detector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.file_tag())
    }
}

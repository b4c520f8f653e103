use std::path::{Path, PathBuf};

use super::constants::SAMPLES_PER_SECOND;
use super::error::AscFileError;
use super::trace::Trace;

/// A GC detector export in the ASC format.
///
/// The instrument software writes a block of header lines followed by one line per sample. Each
/// sample line holds comma separated intensities; every column carries the same signal, so
/// only the first is read. Samples are taken at 5 Hz starting from injection, so sample `i` has
/// a retention time of `i / 5` seconds.
#[derive(Debug, Clone)]
pub struct AscFile {
    path: PathBuf,
    size_bytes: u64,
    trace: Trace,
}

impl AscFile {
    /// Read an ASC file, skipping `data_start_line` header lines
    pub fn new(path: &Path, data_start_line: usize) -> Result<Self, AscFileError> {
        if !path.exists() {
            return Err(AscFileError::BadFilePath(path.to_path_buf()));
        }
        let size_bytes = path.metadata()?.len();
        let contents = std::fs::read_to_string(path)?;
        let trace = Self::parse(&contents, data_start_line)?;
        if trace.is_empty() {
            return Err(AscFileError::NoSamples(path.to_path_buf()));
        }
        Ok(Self {
            path: path.to_path_buf(),
            size_bytes,
            trace,
        })
    }

    /// Parse the contents of an ASC file into a trace. Blank lines are ignored.
    pub fn parse(contents: &str, data_start_line: usize) -> Result<Trace, AscFileError> {
        let mut intensities: Vec<f64> = Vec::new();
        for (line_idx, line) in contents.lines().enumerate().skip(data_start_line) {
            if line.trim().is_empty() {
                continue;
            }
            let first_column = line.split(',').next().unwrap_or("").trim();
            match first_column.parse::<f64>() {
                Ok(value) => intensities.push(value),
                Err(_) => {
                    return Err(AscFileError::ParsingError(
                        line_idx + 1,
                        first_column.to_string(),
                    ))
                }
            }
        }
        Ok(Trace::from_uniform(
            0.0,
            1.0 / SAMPLES_PER_SECOND,
            intensities,
        )?)
    }

    pub fn get_trace(&self) -> &Trace {
        &self.trace
    }

    pub fn get_size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn get_path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str = "Sample ID\nMethod: CO 9 min\nRate: 5 Hz\n";

    #[test]
    fn test_parse_skips_header_and_blanks() {
        let contents = format!("{HEADER}10,10\n\n12,12\n 15 , 15\n\n");
        let trace = AscFile::parse(&contents, 3).unwrap();
        assert_eq!(trace.y(), &[10.0, 12.0, 15.0]);
        assert_eq!(trace.x()[0], 0.0);
        assert!((trace.x()[2] - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_parse_reports_bad_line() {
        let contents = format!("{HEADER}10,10\nabc,abc\n");
        match AscFile::parse(&contents, 3) {
            Err(AscFileError::ParsingError(line, value)) => {
                assert_eq!(line, 5);
                assert_eq!(value, "abc");
            }
            other => panic!("Expected a parsing error, found {other:?}"),
        }
    }

    #[test]
    fn test_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("FID1A_D01.ASC");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "{HEADER}").unwrap();
        for i in 0..50 {
            writeln!(file, "{i},{i}").unwrap();
        }
        drop(file);

        let asc = AscFile::new(&path, 3).unwrap();
        assert_eq!(asc.get_trace().len(), 50);
        assert!(asc.get_size_bytes() > 0);
        assert_eq!(asc.get_path(), path.as_path());

        let empty = dir.path().join("TCD2B_D01.ASC");
        std::fs::write(&empty, HEADER).unwrap();
        assert!(matches!(
            AscFile::new(&empty, 3),
            Err(AscFileError::NoSamples(_))
        ));
        assert!(matches!(
            AscFile::new(&dir.path().join("missing.ASC"), 3),
            Err(AscFileError::BadFilePath(_))
        ));
    }
}

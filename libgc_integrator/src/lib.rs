//! # gc_integrator
//!
//! gc_integrator integrates gas chromatography peaks, written in Rust. It takes the ASC
//! exports of a GC's flame ionization (FID) and thermal conductivity (TCD) detectors, finds
//! the peak of each configured gas species within its retention time window, and writes a
//! table of peak areas per run as CSV. Optionally the areas are converted to Faradaic
//! efficiencies and a CO single pass conversion.
//!
//! ## Installation
//!
//! The only method of install is from source.
//!
//! ### Rust
//!
//! If you have not used Rust before, you will most likely need to install the Rust tool
//! chain. See the [Rust docs](https://www.rust-lang.org/tools/install) for installation
//! instructions.
//!
//! ### Building & Install
//!
//! To build and install the CLI use `cargo install --path ./gc_integrator_cli` from the top
//! level gc_integrator repository. The binary is installed to your cargo install location
//! (typically something like `~/.cargo/bin/`).
//!
//! ## Method
//!
//! For each species the samples inside the window `[left, right]` are multiplied by the
//! detector sign (+1 for FID, -1 for TCD, whose peaks point down) and fit with a natural
//! cubic smoothing spline. The spline and its second derivative are evaluated on a 0.2 s
//! grid. The peak spans from the first to the last grid point whose second derivative
//! reaches the species threshold. A straight baseline is drawn through the smoothed signal
//! at both ends of that span and subtracted, and the remainder is integrated with the
//! trapezoidal rule.
//!
//! Each (run, species) entry is one of
//!
//! - an integral
//! - no peak: the second derivative never reached the threshold, reported as `0`
//! - a degenerate peak: the threshold is reached at a single grid point, reported as `NaN`
//! - missing or failed: no file for the detector or a bad file/window, reported as an empty
//! cell
//!
//! ## Configuration
//!
//! The CLI is driven by a YAML configuration file. A template can be generated with
//! `gc_integrator_cli --path config.yml new`. The format is as follows:
//!
//! ```yml
//! asc_path: /path/to/asc/exports
//! output_path: /path/to/results.csv
//! diagnostics_path: null
//! data_start_line: 25
//! n_threads: 1
//! species:
//! - name: CO
//!   detector: fid
//!   left: 180.0
//!   right: 220.0
//!   threshold: 280.0
//!   smoothing: 10.0
//! - name: H2
//!   detector: tcd
//!   left: 90.0
//!   right: 105.0
//!   threshold: 2500.0
//!   smoothing: 10.0
//! efficiency: null
//! co_conversion: null
//! ```
//!
//! - `asc_path`: directory containing the ASC exports. Files are grouped into runs by the
//! digits following the final `D` of their name (e.g. `FID1A_D07.ASC` is run 7), and
//! assigned to a detector by the `FID` or `TCD` tag in their name.
//! - `output_path`: the CSV file results are written to.
//! - `diagnostics_path`: if set, a CSV of the smoothed signal, baseline and corrected signal
//! of every integrated peak is written to this directory as `run_<NNNN>_<species>.csv`.
//! - `data_start_line`: number of header lines at the top of each ASC file.
//! - `n_threads`: number of worker threads the runs are divided amongst. Must be at least 1.
//! - `species`: the peaks to integrate. Thresholds are always positive; the detector sign
//! takes care of inverted signals.
//! - `efficiency`: optional `current_ma` and per species `calibrations` used to add
//! `<species> FE/%` columns.
//! - `co_conversion`: optional constants used to add a `CO SPC` column.
//!
//! ## Output
//!
//! gc_integrator outputs the results CSV and a log file (`gc_integrator.log`). The log file
//! contains the outcome of every integration; if an entry is missing from the table the log
//! will say why.
pub mod asc_file;
pub mod config;
pub mod constants;
pub mod detector;
pub mod diagnostics;
pub mod error;
pub mod peak;
pub mod process;
pub mod report;
pub mod run_group;
pub mod spline;
pub mod trace;
pub mod worker_status;

//! # gc_integrator_cli
//!
//! Part of the gc_integrator crate family.
//!
//! This is the command line application to integrate GC peaks.
//!
//! ## Install
//!
//! Use `cargo install --path ./gc_integrator_cli`
//!
//! ## Use
//!
//! Make a template configuration file
//!
//! ```bash
//! gc_integrator_cli --path config.yml new
//! ```
//!
//! Edit the paths and species, then run the integration with
//!
//! ```bash
//! gc_integrator_cli --path config.yml
//! ```
//!
//! One progress bar is shown per worker. Details of every integration are written to
//! `gc_integrator.log` in the working directory.
use clap::{Arg, Command};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use indicatif_log_bridge::LogWrapper;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};

use libgc_integrator::config::Config;
use libgc_integrator::constants::LOG_FILE_NAME;
use libgc_integrator::process::{build_table, create_subsets, process_subset, write_table};
use libgc_integrator::report::RunResult;
use libgc_integrator::run_group::RunGroup;
use libgc_integrator::worker_status::WorkerStatus;

fn make_template_config(path: &Path) {
    let config = Config::default();
    if let Err(e) = config.write_config_file(path) {
        log::error!("Could not write template config: {e}");
    }
}

/// Send the library's spdlog output to the log file
fn init_file_logger() -> Result<(), spdlog::Error> {
    let file_sink = Arc::new(
        spdlog::sink::FileSink::builder()
            .path(PathBuf::from(LOG_FILE_NAME))
            .truncate(true)
            .build()?,
    );
    let logger = Arc::new(
        spdlog::Logger::builder()
            .level_filter(spdlog::LevelFilter::All)
            .flush_level_filter(spdlog::LevelFilter::All)
            .sink(file_sink)
            .build()?,
    );
    spdlog::set_default_logger(logger);
    Ok(())
}

fn main() {
    // Create a cli
    let matches = Command::new("gc_integrator_cli")
        .arg_required_else_help(true)
        .subcommand(Command::new("new").about("Make a template configuration yaml file"))
        .arg(
            Arg::new("path")
                .short('p')
                .long("path")
                .required(true)
                .help("Path to the configuration file"),
        )
        .get_matches();

    // Initialize feedback
    let logger = simplelog::TermLogger::new(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );

    let pb_manager = MultiProgress::new();

    if LogWrapper::new(pb_manager.clone(), logger)
        .try_init()
        .is_err()
    {
        eprintln!("Could not create logging/progress!");
        return;
    }
    if let Err(e) = init_file_logger() {
        log::warn!("Could not create log file {LOG_FILE_NAME}: {e}");
    }

    // Parse the cli
    let config_path = match matches.get_one::<String>("path") {
        Some(p) => PathBuf::from(p),
        None => {
            log::error!("A configuration path is required");
            return;
        }
    };

    if let Some(("new", _)) = matches.subcommand() {
        log::info!(
            "Making a template config at {}...",
            config_path.to_string_lossy()
        );
        make_template_config(&config_path);
        log::info!("Done.");
        return;
    }

    // Load our config
    log::info!("Loading config from {}...", config_path.to_string_lossy());
    let config = match Config::read_config_file(&config_path).and_then(|c| {
        c.validate()?;
        Ok(c)
    }) {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e}");
            return;
        }
    };
    log::info!("Config successfully loaded.");
    log::info!("ASC Path: {}", config.asc_path.to_string_lossy());
    log::info!("Output Path: {}", config.output_path.to_string_lossy());
    if let Some(diag) = &config.diagnostics_path {
        log::info!("Diagnostics Path: {}", diag.to_string_lossy());
    }
    log::info!("Species: {}", config.species_names().join(", "));
    log::info!("Number of Workers: {}", config.n_threads);
    spdlog::info!("Loaded config from {}", config_path.display());

    let group = match RunGroup::new(&config.asc_path) {
        Ok(g) => g,
        Err(e) => {
            log::error!("{e}");
            return;
        }
    };
    log::info!("Found {} runs.", group.runs().len());

    // Spawn the workers, each with its own progress bar
    let (tx, rx) = mpsc::channel::<WorkerStatus>();
    let style = ProgressStyle::with_template("{prefix} [{bar:40}] {pos}% {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    let mut workers = Vec::new();
    let mut bars: Vec<Option<ProgressBar>> = Vec::new();
    for (idx, subset) in create_subsets(&config, group.into_runs())
        .into_iter()
        .enumerate()
    {
        // Dont make empty workers
        if subset.is_empty() {
            bars.push(None);
            continue;
        }
        let pb = pb_manager.add(ProgressBar::new(100));
        pb.set_style(style.clone());
        pb.set_prefix(format!("Worker {idx}"));
        bars.push(Some(pb));
        let conf = config.clone();
        let worker_tx = tx.clone();
        workers.push(std::thread::spawn(move || {
            process_subset(conf, worker_tx, idx, subset)
        }));
    }
    // Only the workers hold senders now, so the channel closes when they are all done
    drop(tx);

    for status in rx.iter() {
        if let Some(Some(pb)) = bars.get(status.worker_id) {
            pb.set_position((status.progress * 100.0) as u64);
            pb.set_message(format!("{} run {}", status.stage.label(), status.run_number));
        }
    }
    for pb in bars.iter().flatten() {
        pb.finish();
    }

    let mut results: Vec<RunResult> = Vec::new();
    let mut worker_failed = false;
    for worker in workers {
        match worker.join() {
            Ok(Ok(res)) => results.extend(res),
            Ok(Err(e)) => {
                worker_failed = true;
                log::error!("Processor error: {e}");
            }
            Err(_) => {
                worker_failed = true;
                log::error!("An error occurred joining one of the workers!");
            }
        }
    }
    if worker_failed {
        log::warn!("Some runs were not processed, check {LOG_FILE_NAME} for details.");
    }

    let table = build_table(&config, results);
    if let Err(e) = write_table(&config, &table) {
        log::error!("Could not write results: {e}");
        return;
    }

    let counts = table.counts();
    log::info!(
        "Integrated {} peaks over {} runs. No peak: {} Degenerate: {} Missing: {} Failed: {}",
        counts.integrals,
        table.rows().len(),
        counts.no_peak,
        counts.degenerate,
        counts.missing,
        counts.failed
    );
    if counts.degenerate + counts.failed > 0 {
        log::warn!("Some entries could not be integrated, check {LOG_FILE_NAME} for details.");
    }
    log::info!("Results written to {}", config.output_path.to_string_lossy());
    log::info!("Done.");
}

use std::collections::BTreeMap;
use std::sync::mpsc::Sender;

use super::asc_file::AscFile;
use super::config::{Config, SpeciesConfig};
use super::detector::Detector;
use super::diagnostics::write_peak_diagnostics;
use super::error::{AscFileError, ProcessorError};
use super::peak::PeakOutcome;
use super::report::{ResultsTable, RunResult, SpeciesOutcome};
use super::run_group::{RunFiles, RunGroup};
use super::worker_status::{WorkerStage, WorkerStatus};

/// Integrate a single species from an already loaded detector file
fn integrate_species(
    config: &Config,
    run_number: u32,
    species: &SpeciesConfig,
    asc: &AscFile,
) -> SpeciesOutcome {
    let outcome = match species.integrator().integrate(asc.get_trace()) {
        Ok(o) => o,
        Err(e) => {
            spdlog::error!("Run {run_number} {}: integration failed: {e}", species.name);
            return SpeciesOutcome::Failed(e.to_string());
        }
    };

    match &outcome {
        PeakOutcome::Integral(peak) => {
            spdlog::debug!(
                "Run {run_number} {}: peak spans [{:.1}, {:.1}]",
                species.name,
                peak.x[0],
                peak.x[peak.region.last_offset()]
            );
            if let Some(diag_path) = config.get_diagnostics_file_name(run_number, &species.name) {
                if let Err(e) = write_peak_diagnostics(&diag_path, peak) {
                    spdlog::warn!(
                        "Could not write diagnostics to {}: {e}",
                        diag_path.display()
                    );
                }
            }
        }
        PeakOutcome::NoPeak => (),
        PeakOutcome::Degenerate(region) => spdlog::warn!(
            "Run {run_number} {}: degenerate peak at grid index {} - skipped",
            species.name,
            region.left_edge_idx
        ),
    }
    SpeciesOutcome::from(&outcome)
}

/// Integrate every configured species for one run.
///
/// Problems with a single file or species are recorded in the RunResult and never stop the
/// run. Only a broken status channel is an error.
pub fn process_run(
    config: &Config,
    run: &RunFiles,
    tx: &Sender<WorkerStatus>,
    worker_id: &usize,
    progress: f32,
) -> Result<RunResult, ProcessorError> {
    let run_number = run.run_number;
    spdlog::info!(
        "Total run size: {}",
        human_bytes::human_bytes(run.get_total_size_bytes() as f64)
    );
    tx.send(WorkerStatus::new(
        progress,
        run_number,
        *worker_id,
        WorkerStage::Loading,
    ))?;

    // Each detector file is read once, no matter how many species it holds
    let mut loaded: BTreeMap<Detector, Result<AscFile, AscFileError>> = BTreeMap::new();
    for (detector, path) in run.files.iter() {
        if config.species_for(detector).next().is_none() {
            continue;
        }
        let asc = AscFile::new(path, config.data_start_line);
        if let Err(e) = &asc {
            spdlog::error!("Run {run_number}: could not load {}: {e}", path.display());
        }
        loaded.insert(*detector, asc);
    }

    tx.send(WorkerStatus::new(
        progress,
        run_number,
        *worker_id,
        WorkerStage::Integrating,
    ))?;
    let mut result = RunResult::new(run_number);
    for species in config.species.iter() {
        let outcome = match loaded.get(&species.detector) {
            None => {
                spdlog::warn!(
                    "Run {run_number} has no {} file; {} is missing",
                    species.detector,
                    species.name
                );
                SpeciesOutcome::Missing
            }
            Some(Err(e)) => SpeciesOutcome::Failed(e.to_string()),
            Some(Ok(asc)) => integrate_species(config, run_number, species, asc),
        };
        spdlog::info!("Run {run_number} {}: {outcome}", species.name);
        result.insert(&species.name, outcome);
    }

    Ok(result)
}

/// Process a subset of runs
pub fn process_subset(
    config: Config,
    tx: Sender<WorkerStatus>,
    worker_id: usize,
    subset: Vec<RunFiles>,
) -> Result<Vec<RunResult>, ProcessorError> {
    let n_runs = subset.len();
    let mut results = Vec::with_capacity(n_runs);
    for (idx, run) in subset.iter().enumerate() {
        spdlog::info!("Processing run {}...", run.run_number);
        let progress = idx as f32 / n_runs as f32;
        results.push(process_run(&config, run, &tx, &worker_id, progress)?);
        spdlog::info!("Finished processing run {}.", run.run_number);
    }
    let last_run = subset.last().map(|r| r.run_number).unwrap_or(0);
    tx.send(WorkerStatus::new(
        1.0,
        last_run,
        worker_id,
        WorkerStage::Finished,
    ))?;
    Ok(results)
}

/// Deal the runs out to the workers round-robin
pub fn create_subsets(config: &Config, runs: Vec<RunFiles>) -> Vec<Vec<RunFiles>> {
    let n_subsets = config.n_threads.max(1) as usize;
    let mut subsets: Vec<Vec<RunFiles>> = vec![Vec::new(); n_subsets];

    for (idx, run) in runs.into_iter().enumerate() {
        subsets[idx % n_subsets].push(run)
    }

    subsets
}

/// Gather the run results of all workers into a single table
pub fn build_table(config: &Config, results: Vec<RunResult>) -> ResultsTable {
    let mut table = ResultsTable::new(config.species_names());
    table.extend(results);
    table
}

/// Write the results table to the configured output path
pub fn write_table(config: &Config, table: &ResultsTable) -> Result<(), ProcessorError> {
    table.write_csv(
        &config.output_path,
        config.efficiency.as_ref(),
        config.co_conversion.as_ref(),
    )?;
    spdlog::info!("Wrote results to {}", config.output_path.display());
    Ok(())
}

/// Run the whole batch: group the ASC files, integrate every run across `n_threads` workers and
/// write the results table.
///
/// The applications spawn and monitor their own workers using process_subset; this flavor is
/// for callers that only want the final table.
pub fn process(config: Config, tx: Sender<WorkerStatus>) -> Result<ResultsTable, ProcessorError> {
    config.validate()?;
    let group = RunGroup::new(&config.asc_path)?;
    spdlog::info!(
        "Found {} runs in {}",
        group.runs().len(),
        config.asc_path.display()
    );

    let mut workers = Vec::new();
    for (idx, subset) in create_subsets(&config, group.into_runs())
        .into_iter()
        .enumerate()
    {
        // Dont make empty workers
        if subset.is_empty() {
            continue;
        }
        let conf = config.clone();
        let worker_tx = tx.clone();
        workers.push(std::thread::spawn(move || {
            process_subset(conf, worker_tx, idx, subset)
        }));
    }

    let mut results = Vec::new();
    for worker in workers {
        match worker.join() {
            Ok(res) => results.extend(res?),
            Err(_) => return Err(ProcessorError::WorkerPanic),
        }
    }

    let table = build_table(&config, results);
    write_table(&config, &table)?;
    Ok(table)
}

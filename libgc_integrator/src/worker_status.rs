/// What a worker is currently doing with its run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WorkerStage {
    #[default]
    Loading,
    Integrating,
    Finished,
}

impl WorkerStage {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Loading => "Loading",
            Self::Integrating => "Integrating",
            Self::Finished => "Finished",
        }
    }
}

/// Progress message sent from a worker to whoever is watching
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkerStatus {
    /// Fraction of the worker's subset completed, between 0 and 1
    pub progress: f32,
    pub run_number: u32,
    pub worker_id: usize,
    pub stage: WorkerStage,
}

impl WorkerStatus {
    pub fn new(progress: f32, run_number: u32, worker_id: usize, stage: WorkerStage) -> Self {
        Self {
            progress,
            run_number,
            worker_id,
            stage,
        }
    }
}

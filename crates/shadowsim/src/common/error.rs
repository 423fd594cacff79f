use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SimError {
    #[error("Unknown job `{0}`")]
    UnknownJob(String),
    #[error("Job `{0}` is defined more than once")]
    DuplicateJob(String),
    #[error("Dependency cycle detected, it involves job `{0}`")]
    CyclicDependency(String),
    #[error("Invalid slot count {0}, at least one slot is required")]
    InvalidSlotCount(u32),
    #[error("Simulation stalled with {0} unfinished job(s)")]
    Stalled(usize),
    #[error("Runtime estimate of job `{0}` does not fit into the simulated timeline")]
    EstimateOverflow(String),
}

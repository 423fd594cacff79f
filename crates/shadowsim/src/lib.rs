pub mod common;
pub mod dag;
pub mod events;
pub mod simulation;

#[cfg(test)]
pub(crate) mod tests;

pub use crate::common::{Map, Set, WrappedRcRefCell};
pub use crate::dag::{
    ApplyOutcome, Dag, Job, JobName, JobState, JobStateCounts, JobType, RuntimeEstimates,
    Workflow,
};
pub use crate::events::{EventKind, LogEvent, UnknownEventKind};
pub use crate::simulation::{Schedule, SimulationResult, simulate, simulate_schedule};

pub type Error = crate::common::error::SimError;
pub type Result<T> = std::result::Result<T, Error>;

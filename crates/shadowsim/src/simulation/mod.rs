//! Projection of the workflow completion time under a hypothetical number of execution slots.
//!
//! The projection is a discrete-event list scheduling simulation. Simulated time jumps from one
//! job completion to the next; whenever a slot is free, the ready job with the smallest name is
//! dispatched to it. Jobs that do not consume a slot finish at the moment they become ready.
mod schedule;

pub use schedule::{Schedule, simulate_schedule};

use std::time::{Duration, SystemTime};

/// Outcome of a single simulation run.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SimulationResult {
    pub slots: u32,
    pub projected_finish: SystemTime,
    /// Time at which the simulation started ("now").
    pub started_at: SystemTime,
    /// Total slot time occupied by jobs in the projected schedule.
    pub busy_time: Duration,
}

impl SimulationResult {
    /// Remaining time until the projected finish.
    pub fn remaining(&self) -> Duration {
        self.projected_finish
            .duration_since(self.started_at)
            .unwrap_or(Duration::ZERO)
    }

    /// Fraction of the available slot time that is actually used by jobs.
    pub fn utilization(&self) -> f64 {
        let available = self.remaining().as_secs_f64() * self.slots as f64;
        if available <= 0.0 {
            return 0.0;
        }
        (self.busy_time.as_secs_f64() / available).min(1.0)
    }
}

/// Projects the finish time of the workflow described by `dag` when `slots` execution slots are
/// available from `now` on.
pub fn simulate(dag: &crate::Dag, slots: u32, now: SystemTime) -> crate::Result<SimulationResult> {
    simulate_schedule(dag, slots, now).map(|schedule| schedule.result)
}

use std::time::{Duration, SystemTime};

use shadowsim::{Dag, SimulationResult, simulate};

use crate::common::config::ControllerConfig;

#[derive(Debug, Copy, Clone)]
pub struct SearchParams {
    /// An additional slot that shortens the projection by less than this does not pay off.
    pub improvement_threshold: Duration,
    /// Number of consecutive non-paying slots after which the deadline is deemed unreachable.
    pub max_stalled_steps: u32,
    pub max_slots: Option<u32>,
}

impl From<&ControllerConfig> for SearchParams {
    fn from(config: &ControllerConfig) -> Self {
        Self {
            improvement_threshold: config.improvement_threshold,
            max_stalled_steps: config.max_stalled_steps,
            max_slots: config.max_slots,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SlotDecision {
    pub slots: u32,
    /// Projection with the chosen number of slots.
    pub result: SimulationResult,
    pub deadline_met: bool,
}

/// Finds the number of slots to request so that the workflow in `dag` finishes by `deadline`.
///
/// When the deadline is met with `current_slots`, the smallest count that still meets it is
/// returned. Otherwise slots are added one by one until the deadline is met or additional slots
/// stop paying off.
pub fn choose_slots(
    dag: &Dag,
    current_slots: u32,
    deadline: SystemTime,
    now: SystemTime,
    params: &SearchParams,
) -> shadowsim::Result<SlotDecision> {
    let baseline = simulate(dag, current_slots.max(1), now)?;
    if baseline.projected_finish <= deadline {
        search_down(dag, baseline, deadline, now)
    } else {
        search_up(dag, baseline, deadline, now, params)
    }
}

fn search_down(
    dag: &Dag,
    baseline: SimulationResult,
    deadline: SystemTime,
    now: SystemTime,
) -> shadowsim::Result<SlotDecision> {
    let mut best = baseline;
    while best.slots > 1 {
        let candidate = simulate(dag, best.slots - 1, now)?;
        if candidate.projected_finish > deadline {
            break;
        }
        best = candidate;
    }
    Ok(SlotDecision {
        slots: best.slots,
        result: best,
        deadline_met: true,
    })
}

fn search_up(
    dag: &Dag,
    baseline: SimulationResult,
    deadline: SystemTime,
    now: SystemTime,
    params: &SearchParams,
) -> shadowsim::Result<SlotDecision> {
    // Slots beyond the number of unfinished jobs cannot shorten the projection
    let useful_slots = dag
        .jobs()
        .filter(|job| !job.state().is_terminal() && job.job_type().consumes_slot())
        .count()
        .max(1) as u32;

    let give_up = |result: SimulationResult, reason: &str| {
        log::warn!(
            "Deadline is unreachable ({reason}), keeping {} slot(s) with projected overshoot of {}",
            result.slots,
            humantime::format_duration(
                result
                    .projected_finish
                    .duration_since(deadline)
                    .unwrap_or_default()
            )
        );
        SlotDecision {
            slots: result.slots,
            result,
            deadline_met: false,
        }
    };

    let mut last = baseline;
    let mut stalled = 0;
    loop {
        if params.max_slots.is_some_and(|max| last.slots >= max) {
            return Ok(give_up(last, "slot limit reached"));
        }
        if last.slots >= useful_slots {
            return Ok(give_up(last, "every job already has a slot"));
        }
        let candidate = simulate(dag, last.slots + 1, now)?;
        let improvement = last
            .projected_finish
            .duration_since(candidate.projected_finish)
            .unwrap_or_default();
        last = candidate;
        if candidate.projected_finish <= deadline {
            return Ok(SlotDecision {
                slots: candidate.slots,
                result: candidate,
                deadline_met: true,
            });
        }
        if improvement < params.improvement_threshold {
            stalled += 1;
            if stalled >= params.max_stalled_steps {
                return Ok(give_up(last, "diminishing returns"));
            }
        } else {
            stalled = 0;
        }
    }
}

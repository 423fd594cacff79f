use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap};
use std::time::{Duration, SystemTime};

use crate::common::error::SimError;
use crate::dag::{Dag, Job, JobState};
use crate::simulation::SimulationResult;
use crate::{Map, Set};

/// Simulated finish time of every job that takes part in the projection.
#[derive(Debug)]
pub struct Schedule {
    pub result: SimulationResult,
    pub finish_times: Map<String, SystemTime>,
}

pub fn simulate_schedule(dag: &Dag, slots: u32, now: SystemTime) -> crate::Result<Schedule> {
    if slots == 0 {
        return Err(SimError::InvalidSlotCount(slots));
    }
    let mut simulation = Simulation::new(dag, slots, now)?;
    simulation.run()?;
    Ok(simulation.into_schedule())
}

struct Simulation<'a> {
    dag: &'a Dag,
    slots: u32,
    now: SystemTime,
    clock: SystemTime,
    /// Number of occupied slots. It may exceed `slots` when more jobs are already running than the
    /// simulated capacity allows; no new job is dispatched until it drops below `slots`.
    occupied: u32,
    busy_time: Duration,
    /// Number of unfinished parents of jobs that are not ready yet.
    waiting: Map<&'a str, u32>,
    ready: BTreeSet<&'a str>,
    ready_instant: BTreeSet<&'a str>,
    completions: BinaryHeap<Reverse<(SystemTime, &'a str)>>,
    unfinished: usize,
    finish_times: Map<String, SystemTime>,
    latest_finish: Option<SystemTime>,
}

impl<'a> Simulation<'a> {
    fn new(dag: &'a Dag, slots: u32, now: SystemTime) -> crate::Result<Self> {
        let mut simulation = Simulation {
            dag,
            slots,
            now,
            clock: now,
            occupied: 0,
            busy_time: Duration::ZERO,
            waiting: Default::default(),
            ready: Default::default(),
            ready_instant: Default::default(),
            completions: Default::default(),
            unfinished: 0,
            finish_times: Map::with_capacity_and_hasher(dag.job_count(), Default::default()),
            latest_finish: None,
        };

        let excluded = failed_subgraph(dag);
        for job in dag.jobs() {
            match job.state() {
                JobState::Succeeded | JobState::Failed => {
                    if let Some(finish) = job.actual_finish() {
                        simulation.record_finish(job.name(), finish);
                    }
                }
                _ if excluded.contains(job.name()) => {}
                JobState::Running => {
                    let start = job.actual_start().unwrap_or(now);
                    let finish = start
                        .checked_add(job.runtime_estimate())
                        .ok_or_else(|| SimError::EstimateOverflow(job.name().to_string()))?
                        .max(now);
                    if job.job_type().consumes_slot() {
                        simulation.occupied += 1;
                        simulation.add_busy_time(
                            job.name(),
                            finish.duration_since(now).unwrap_or_default(),
                        )?;
                    }
                    simulation.unfinished += 1;
                    simulation.completions.push(Reverse((finish, job.name())));
                }
                JobState::Pending | JobState::Ready => {
                    simulation.unfinished += 1;
                    let unfinished_parents = job
                        .parents()
                        .filter(|parent| {
                            dag.get_job(parent)
                                .is_some_and(|parent| parent.state() != JobState::Succeeded)
                        })
                        .count() as u32;
                    if unfinished_parents == 0 {
                        simulation.push_ready(job);
                    } else {
                        simulation.waiting.insert(job.name(), unfinished_parents);
                    }
                }
            }
        }
        Ok(simulation)
    }

    fn run(&mut self) -> crate::Result<()> {
        loop {
            self.dispatch()?;
            let Some(Reverse((time, _))) = self.completions.peek().copied() else {
                break;
            };
            self.clock = time;
            while let Some(Reverse((finish, name))) = self.completions.peek().copied() {
                if finish != time {
                    break;
                }
                self.completions.pop();
                self.complete(name);
            }
        }
        if self.unfinished > 0 {
            return Err(SimError::Stalled(self.unfinished));
        }
        Ok(())
    }

    /// Starts as many ready jobs as possible at the current simulated time.
    fn dispatch(&mut self) -> crate::Result<()> {
        let dag = self.dag;
        loop {
            if let Some(name) = self.ready_instant.pop_first() {
                self.complete(name);
                continue;
            }
            if self.occupied < self.slots {
                if let Some(name) = self.ready.pop_first() {
                    let estimate = dag
                        .get_job(name)
                        .map_or(Duration::ZERO, |job| job.runtime_estimate());
                    let finish = self
                        .clock
                        .checked_add(estimate)
                        .ok_or_else(|| SimError::EstimateOverflow(name.to_string()))?;
                    self.occupied += 1;
                    self.add_busy_time(name, estimate)?;
                    self.completions.push(Reverse((finish, name)));
                    continue;
                }
            }
            return Ok(());
        }
    }

    fn add_busy_time(&mut self, name: &str, time: Duration) -> crate::Result<()> {
        self.busy_time = self
            .busy_time
            .checked_add(time)
            .ok_or_else(|| SimError::EstimateOverflow(name.to_string()))?;
        Ok(())
    }

    fn complete(&mut self, name: &'a str) {
        let dag = self.dag;
        let Some(job) = dag.get_job(name) else {
            return;
        };
        if job.job_type().consumes_slot() {
            self.occupied = self.occupied.saturating_sub(1);
        }
        self.unfinished -= 1;
        self.record_finish(name, self.clock);

        for child in job.children() {
            let Some(count) = self.waiting.get_mut(child) else {
                continue;
            };
            *count -= 1;
            if *count == 0 {
                self.waiting.remove(child);
                if let Some(child) = dag.get_job(child) {
                    self.push_ready(child);
                }
            }
        }
    }

    fn push_ready(&mut self, job: &'a Job) {
        if job.job_type().consumes_slot() {
            self.ready.insert(job.name());
        } else {
            self.ready_instant.insert(job.name());
        }
    }

    fn record_finish(&mut self, name: &str, finish: SystemTime) {
        self.finish_times.insert(name.to_string(), finish);
        self.latest_finish = Some(self.latest_finish.map_or(finish, |latest| latest.max(finish)));
    }

    fn into_schedule(self) -> Schedule {
        Schedule {
            result: SimulationResult {
                slots: self.slots,
                projected_finish: self.latest_finish.unwrap_or(self.now),
                started_at: self.now,
                busy_time: self.busy_time,
            },
            finish_times: self.finish_times,
        }
    }
}

/// Failed jobs together with everything that depends on them. Such jobs cannot run without a
/// workflow restart, so they are left out of the projection.
fn failed_subgraph(dag: &Dag) -> Set<&str> {
    let mut excluded = Set::default();
    for job in dag.jobs().filter(|job| job.state() == JobState::Failed) {
        excluded.insert(job.name());
        excluded.extend(dag.descendants(job.name()));
    }
    excluded
}

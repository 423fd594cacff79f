mod estimates;
mod job;
mod workflow;

pub use estimates::RuntimeEstimates;
pub use job::{Job, JobName, JobState, JobType};
pub use workflow::{ApplyOutcome, JobStateCounts, Workflow};

use std::time::{Duration, SystemTime};

use crate::common::error::SimError;
use crate::{Map, Set};

/// Jobs of a workflow together with their dependency edges.
///
/// Cloning a `Dag` produces a fully independent copy, which is what the simulation engine works
/// with while the live copy keeps being updated.
#[derive(Debug, Clone, Default)]
pub struct Dag {
    jobs: Map<JobName, Job>,
}

impl Dag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_job<N: Into<JobName>>(
        &mut self,
        name: N,
        job_type: JobType,
        runtime_estimate: Duration,
    ) -> crate::Result<()> {
        let name = name.into();
        if self.jobs.contains_key(&name) {
            return Err(SimError::DuplicateJob(name));
        }
        self.jobs
            .insert(name.clone(), Job::new(name, job_type, runtime_estimate));
        Ok(())
    }

    pub fn add_dependency(&mut self, parent: &str, child: &str) -> crate::Result<()> {
        if parent == child {
            return Err(SimError::CyclicDependency(parent.to_string()));
        }
        if !self.jobs.contains_key(parent) {
            return Err(SimError::UnknownJob(parent.to_string()));
        }
        let child_job = self
            .jobs
            .get_mut(child)
            .ok_or_else(|| SimError::UnknownJob(child.to_string()))?;
        child_job.parents.insert(parent.to_string());
        if let Some(parent_job) = self.jobs.get_mut(parent) {
            parent_job.children.insert(child.to_string());
        }
        Ok(())
    }

    /// Marks a job as already completed before monitoring started (e.g. `DONE` in a rescue DAG).
    pub fn mark_done(&mut self, name: &str, finished_at: Option<SystemTime>) -> crate::Result<()> {
        let job = self
            .jobs
            .get_mut(name)
            .ok_or_else(|| SimError::UnknownJob(name.to_string()))?;
        job.state = JobState::Succeeded;
        job.actual_finish = finished_at;
        Ok(())
    }

    /// Verifies that the dependency relation is acyclic (Kahn's algorithm).
    pub fn check_acyclic(&self) -> crate::Result<()> {
        let mut in_degree: Map<&str, usize> = self
            .jobs
            .values()
            .map(|job| (job.name(), job.parents.len()))
            .collect();
        let mut queue: Vec<&str> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(name, _)| *name)
            .collect();
        let mut visited = 0;
        while let Some(name) = queue.pop() {
            visited += 1;
            for child in self.jobs[name].children() {
                if let Some(degree) = in_degree.get_mut(child) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push(child);
                    }
                }
            }
        }
        if visited == self.jobs.len() {
            return Ok(());
        }
        let name = in_degree
            .into_iter()
            .filter(|(_, degree)| *degree > 0)
            .map(|(name, _)| name)
            .min()
            .unwrap_or_default();
        Err(SimError::CyclicDependency(name.to_string()))
    }

    #[inline]
    pub fn get_job(&self, name: &str) -> Option<&Job> {
        self.jobs.get(name)
    }

    #[inline]
    pub(crate) fn get_job_mut(&mut self, name: &str) -> Option<&mut Job> {
        self.jobs.get_mut(name)
    }

    pub fn jobs(&self) -> impl Iterator<Item = &Job> {
        self.jobs.values()
    }

    #[inline]
    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Jobs reachable from `name` through child edges, `name` itself excluded.
    pub fn descendants(&self, name: &str) -> Set<&str> {
        let mut result = Set::default();
        let mut stack: Vec<&str> = match self.jobs.get(name) {
            Some(job) => job.children().collect(),
            None => return result,
        };
        while let Some(current) = stack.pop() {
            if result.insert(current) {
                stack.extend(self.jobs[current].children());
            }
        }
        result
    }

    /// Replaces runtime estimates of all jobs by the values from `estimates`.
    pub fn apply_estimates(&mut self, estimates: &RuntimeEstimates) {
        for job in self.jobs.values_mut() {
            job.set_runtime_estimate(estimates.get(job.name()));
        }
    }

    pub fn set_runtime_estimate(&mut self, name: &str, estimate: Duration) -> crate::Result<()> {
        self.jobs
            .get_mut(name)
            .map(|job| job.set_runtime_estimate(estimate))
            .ok_or_else(|| SimError::UnknownJob(name.to_string()))
    }
}

use std::time::SystemTime;

use crate::common::error::SimError;
use crate::dag::{Dag, JobState};
use crate::events::{EventKind, LogEvent};

/// What `Workflow::apply` did with an event.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The event does not change any job (internal event, informational kind or a job that has
    /// already terminated).
    Ignored,
    Transition { from: JobState, to: JobState },
    /// The job stayed in its state, but its recorded timestamps were refined.
    Refined,
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct JobStateCounts {
    pub pending: usize,
    pub ready: usize,
    pub running: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Live state of a monitored workflow run.
pub struct Workflow {
    dag: Dag,
    deadline: SystemTime,
    created_at: SystemTime,
}

impl Workflow {
    pub fn new(dag: Dag, deadline: SystemTime, created_at: SystemTime) -> crate::Result<Self> {
        dag.check_acyclic()?;
        let mut workflow = Self {
            dag,
            deadline,
            created_at,
        };
        let pending: Vec<String> = workflow
            .dag
            .jobs()
            .filter(|job| job.state() == JobState::Pending)
            .map(|job| job.name().to_string())
            .collect();
        for name in pending {
            workflow.promote_if_ready(&name);
        }
        Ok(workflow)
    }

    #[inline]
    pub fn dag(&self) -> &Dag {
        &self.dag
    }

    #[inline]
    pub fn deadline(&self) -> SystemTime {
        self.deadline
    }

    #[inline]
    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Returns an independent copy of the DAG for simulation.
    pub fn snapshot(&self) -> Dag {
        self.dag.clone()
    }

    pub fn counts(&self) -> JobStateCounts {
        let mut counts = JobStateCounts::default();
        for job in self.dag.jobs() {
            match job.state() {
                JobState::Pending => counts.pending += 1,
                JobState::Ready => counts.ready += 1,
                JobState::Running => counts.running += 1,
                JobState::Succeeded => counts.succeeded += 1,
                JobState::Failed => counts.failed += 1,
            }
        }
        counts
    }

    pub fn is_complete(&self) -> bool {
        self.dag.jobs().all(|job| job.state().is_terminal())
    }

    /// Applies a single log event to the job it references.
    pub fn apply(&mut self, event: &LogEvent) -> crate::Result<ApplyOutcome> {
        let Some(name) = event.job_name.as_deref() else {
            return Ok(ApplyOutcome::Ignored);
        };
        let job = self
            .dag
            .get_job_mut(name)
            .ok_or_else(|| SimError::UnknownJob(name.to_string()))?;
        let from = job.state;
        if from.is_terminal() {
            log::debug!(
                "Ignoring {} for job {name}, it has already finished as {from}",
                event.kind
            );
            return Ok(ApplyOutcome::Ignored);
        }

        let target = match event.kind {
            EventKind::MonitordStarted
            | EventKind::MonitordFinished
            | EventKind::DagmanStarted
            | EventKind::DagmanFinished => None,
            EventKind::Submit => Some(JobState::Running),
            EventKind::Execute => {
                if from == JobState::Running {
                    job.actual_start = Some(event.timestamp);
                    return Ok(ApplyOutcome::Refined);
                }
                Some(JobState::Running)
            }
            EventKind::JobSuccess | EventKind::PostScriptSuccess => Some(JobState::Succeeded),
            EventKind::JobFailure
            | EventKind::PostScriptFailure
            | EventKind::PreScriptFailure
            | EventKind::JobAborted
            | EventKind::SubmitFailed => Some(JobState::Failed),
            // The outcome follows as a success or failure event
            EventKind::JobTerminated
            | EventKind::PostScriptTerminated
            | EventKind::PostScriptStarted
            | EventKind::PreScriptStarted
            | EventKind::PreScriptTerminated
            | EventKind::PreScriptSuccess
            | EventKind::JobHeld
            | EventKind::JobReleased
            | EventKind::JobEvicted => None,
        };

        let to = match target {
            Some(to) if to != from => to,
            _ => return Ok(ApplyOutcome::Ignored),
        };
        match to {
            JobState::Running => {
                if from == JobState::Pending {
                    log::warn!(
                        "Job {name} was submitted before all of its parents were observed to succeed"
                    );
                }
                job.actual_start = Some(event.timestamp);
            }
            JobState::Succeeded | JobState::Failed => {
                if from != JobState::Running {
                    log::debug!("Job {name} finished as {to} without being observed running");
                }
                job.actual_finish = Some(event.timestamp);
            }
            JobState::Pending | JobState::Ready => unreachable!(),
        }
        job.state = to;
        log::debug!("Job {name}: {from} -> {to}");

        if to == JobState::Succeeded {
            let children: Vec<String> = job.children.iter().cloned().collect();
            for child in children {
                self.promote_if_ready(&child);
            }
        }
        Ok(ApplyOutcome::Transition { from, to })
    }

    fn promote_if_ready(&mut self, name: &str) {
        let Some(job) = self.dag.get_job(name) else {
            return;
        };
        if job.state() != JobState::Pending {
            return;
        }
        let ready = job.parents().all(|parent| {
            self.dag
                .get_job(parent)
                .is_some_and(|parent| parent.state() == JobState::Succeeded)
        });
        if ready {
            if let Some(job) = self.dag.get_job_mut(name) {
                job.state = JobState::Ready;
            }
        }
    }
}

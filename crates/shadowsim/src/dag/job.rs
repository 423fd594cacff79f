use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

pub type JobName = String;

/// Kind of work performed by a job, as assigned by the workflow planner.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobType {
    Compute,
    StageIn,
    StageOut,
    InterPool,
    CreateDir,
    Cleanup,
    Chmod,
    StageInWorkerPackage,
    Auxiliary,
}

/// Job name prefixes used by the planner for the jobs it adds to a workflow.
const NAME_PREFIXES: [(&str, JobType); 8] = [
    ("stage_in_", JobType::StageIn),
    ("stage_out_", JobType::StageOut),
    ("stage_inter_", JobType::InterPool),
    ("create_dir_", JobType::CreateDir),
    ("cleanup_", JobType::Cleanup),
    ("chmod_", JobType::Chmod),
    ("stage_worker_", JobType::StageInWorkerPackage),
    ("register_", JobType::Auxiliary),
];

impl JobType {
    /// Does a job of this type occupy an execution slot while it runs?
    pub fn consumes_slot(&self) -> bool {
        match self {
            JobType::Compute
            | JobType::StageIn
            | JobType::StageOut
            | JobType::InterPool
            | JobType::CreateDir
            | JobType::Cleanup
            | JobType::Chmod
            | JobType::StageInWorkerPackage => true,
            JobType::Auxiliary => false,
        }
    }

    pub fn from_job_name(name: &str) -> JobType {
        NAME_PREFIXES
            .iter()
            .find(|(prefix, _)| name.starts_with(prefix))
            .map(|(_, job_type)| *job_type)
            .unwrap_or(JobType::Compute)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Pending,
    Ready,
    Running,
    Succeeded,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }
}

impl Display for JobState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JobState::Pending => "PENDING",
            JobState::Ready => "READY",
            JobState::Running => "RUNNING",
            JobState::Succeeded => "SUCCEEDED",
            JobState::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct Job {
    name: JobName,
    job_type: JobType,
    pub(crate) parents: BTreeSet<JobName>,
    pub(crate) children: BTreeSet<JobName>,
    pub(crate) state: JobState,
    runtime_estimate: Duration,
    pub(crate) actual_start: Option<SystemTime>,
    pub(crate) actual_finish: Option<SystemTime>,
}

impl Job {
    pub(crate) fn new(name: JobName, job_type: JobType, runtime_estimate: Duration) -> Self {
        Self {
            name,
            job_type,
            parents: Default::default(),
            children: Default::default(),
            state: JobState::Pending,
            runtime_estimate,
            actual_start: None,
            actual_finish: None,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn job_type(&self) -> JobType {
        self.job_type
    }

    #[inline]
    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn parents(&self) -> impl Iterator<Item = &str> {
        self.parents.iter().map(|name| name.as_str())
    }

    pub fn children(&self) -> impl Iterator<Item = &str> {
        self.children.iter().map(|name| name.as_str())
    }

    #[inline]
    pub fn runtime_estimate(&self) -> Duration {
        self.runtime_estimate
    }

    pub fn set_runtime_estimate(&mut self, estimate: Duration) {
        self.runtime_estimate = estimate;
    }

    #[inline]
    pub fn actual_start(&self) -> Option<SystemTime> {
        self.actual_start
    }

    #[inline]
    pub fn actual_finish(&self) -> Option<SystemTime> {
        self.actual_finish
    }
}

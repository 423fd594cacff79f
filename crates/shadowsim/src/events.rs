use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::dag::JobName;

/// Closed set of event kinds that can appear in a job-state log.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    MonitordStarted,
    MonitordFinished,
    DagmanStarted,
    DagmanFinished,
    Submit,
    Execute,
    JobTerminated,
    JobSuccess,
    JobFailure,
    PostScriptStarted,
    PostScriptTerminated,
    PostScriptSuccess,
    PostScriptFailure,
    PreScriptStarted,
    PreScriptTerminated,
    PreScriptSuccess,
    PreScriptFailure,
    JobHeld,
    JobReleased,
    JobEvicted,
    JobAborted,
    SubmitFailed,
}

impl EventKind {
    pub const ALL: [EventKind; 22] = [
        EventKind::MonitordStarted,
        EventKind::MonitordFinished,
        EventKind::DagmanStarted,
        EventKind::DagmanFinished,
        EventKind::Submit,
        EventKind::Execute,
        EventKind::JobTerminated,
        EventKind::JobSuccess,
        EventKind::JobFailure,
        EventKind::PostScriptStarted,
        EventKind::PostScriptTerminated,
        EventKind::PostScriptSuccess,
        EventKind::PostScriptFailure,
        EventKind::PreScriptStarted,
        EventKind::PreScriptTerminated,
        EventKind::PreScriptSuccess,
        EventKind::PreScriptFailure,
        EventKind::JobHeld,
        EventKind::JobReleased,
        EventKind::JobEvicted,
        EventKind::JobAborted,
        EventKind::SubmitFailed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::MonitordStarted => "MONITORD_STARTED",
            EventKind::MonitordFinished => "MONITORD_FINISHED",
            EventKind::DagmanStarted => "DAGMAN_STARTED",
            EventKind::DagmanFinished => "DAGMAN_FINISHED",
            EventKind::Submit => "SUBMIT",
            EventKind::Execute => "EXECUTE",
            EventKind::JobTerminated => "JOB_TERMINATED",
            EventKind::JobSuccess => "JOB_SUCCESS",
            EventKind::JobFailure => "JOB_FAILURE",
            EventKind::PostScriptStarted => "POST_SCRIPT_STARTED",
            EventKind::PostScriptTerminated => "POST_SCRIPT_TERMINATED",
            EventKind::PostScriptSuccess => "POST_SCRIPT_SUCCESS",
            EventKind::PostScriptFailure => "POST_SCRIPT_FAILURE",
            EventKind::PreScriptStarted => "PRE_SCRIPT_STARTED",
            EventKind::PreScriptTerminated => "PRE_SCRIPT_TERMINATED",
            EventKind::PreScriptSuccess => "PRE_SCRIPT_SUCCESS",
            EventKind::PreScriptFailure => "PRE_SCRIPT_FAILURE",
            EventKind::JobHeld => "JOB_HELD",
            EventKind::JobReleased => "JOB_RELEASED",
            EventKind::JobEvicted => "JOB_EVICTED",
            EventKind::JobAborted => "JOB_ABORTED",
            EventKind::SubmitFailed => "SUBMIT_FAILED",
        }
    }

    /// Workflow-level events that do not target a single job.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            EventKind::MonitordStarted
                | EventKind::MonitordFinished
                | EventKind::DagmanStarted
                | EventKind::DagmanFinished
        )
    }
}

impl Display for EventKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unrecognized event kind `{0}`")]
pub struct UnknownEventKind(pub String);

impl FromStr for EventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .iter()
            .find(|kind| kind.as_str() == s)
            .copied()
            .ok_or_else(|| UnknownEventKind(s.to_string()))
    }
}

/// A single parsed line of the job-state log.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    pub timestamp: SystemTime,
    pub kind: EventKind,
    pub job_name: Option<JobName>,
    pub scheduler_job_id: Option<String>,
    pub site: Option<String>,
}

impl LogEvent {
    pub fn internal(timestamp: SystemTime, kind: EventKind) -> Self {
        Self {
            timestamp,
            kind,
            job_name: None,
            scheduler_job_id: None,
            site: None,
        }
    }

    pub fn for_job<N: Into<JobName>>(timestamp: SystemTime, kind: EventKind, job_name: N) -> Self {
        Self {
            timestamp,
            kind,
            job_name: Some(job_name.into()),
            scheduler_job_id: None,
            site: None,
        }
    }

    /// The monitor writes this event as the very last line of the log.
    pub fn is_completion_sentinel(&self) -> bool {
        self.kind == EventKind::MonitordFinished
    }
}

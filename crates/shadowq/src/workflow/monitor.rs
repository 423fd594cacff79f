use shadowsim::{ApplyOutcome, JobStateCounts};

use crate::event::EventLogReader;
use crate::workflow::WorkflowRef;

#[derive(Debug)]
pub struct MonitorSummary {
    pub events: u64,
    pub transitions: u64,
    pub counts: JobStateCounts,
}

/// Applies events from `reader` to the workflow, in log order, until the completion sentinel.
///
/// Parse errors and events referring to jobs missing from the DAG are fatal.
pub async fn monitor_workflow(
    mut reader: EventLogReader,
    workflow: WorkflowRef,
) -> crate::Result<MonitorSummary> {
    log::info!("Monitoring event log {}", reader.path().display());
    let mut events = 0;
    let mut transitions = 0;
    while let Some(event) = reader.next().await? {
        let outcome = workflow.get_mut().apply(&event).inspect_err(|error| {
            log::error!(
                "Cannot apply event from line {} of {}: {error}",
                reader.line_number(),
                reader.path().display()
            )
        })?;
        events += 1;
        if matches!(outcome, ApplyOutcome::Transition { .. }) {
            transitions += 1;
        }
    }

    let counts = workflow.get().counts();
    log::info!(
        "Event log finished after {events} event(s): {} succeeded, {} failed, {} unfinished job(s)",
        counts.succeeded,
        counts.failed,
        counts.pending + counts.ready + counts.running
    );
    Ok(MonitorSummary {
        events,
        transitions,
        counts,
    })
}

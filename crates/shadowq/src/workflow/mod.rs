pub mod dagfile;
pub mod estimates;
pub mod monitor;

use std::path::Path;
use std::time::Duration;

use shadowsim::{Dag, RuntimeEstimates, Workflow, WrappedRcRefCell};

use crate::workflow::dagfile::load_dag_file;
use crate::workflow::estimates::load_estimates;

shadowsim::define_wrapped_type!(WorkflowRef, Workflow, pub);

impl WorkflowRef {
    pub fn new(workflow: Workflow) -> Self {
        Self(WrappedRcRefCell::wrap(workflow))
    }
}

/// Loads the DAG definition and the runtime estimates of its jobs.
pub fn load_workflow_dag(
    dag_path: &Path,
    estimates_path: Option<&Path>,
    default_estimate: Duration,
) -> crate::Result<(Dag, RuntimeEstimates)> {
    let estimates = match estimates_path {
        Some(path) => load_estimates(path, default_estimate)?,
        None => RuntimeEstimates::new(default_estimate),
    };
    let dag = load_dag_file(dag_path, &estimates)?;
    log::info!(
        "Loaded {} job(s) from {}, {} runtime estimate(s)",
        dag.job_count(),
        dag_path.display(),
        estimates.len()
    );
    Ok((dag, estimates))
}

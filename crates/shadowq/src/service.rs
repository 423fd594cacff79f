use std::path::Path;
use std::rc::Rc;

use shadowsim::{RuntimeEstimates, Workflow};
use tokio::sync::Notify;

use crate::common::config::ProvisionerConfig;
use crate::event::EventLogReader;
use crate::gateway::Gateway;
use crate::gateway::broker::Broker;
use crate::provision::Controller;
use crate::workflow::WorkflowRef;
use crate::workflow::monitor::{MonitorSummary, monitor_workflow};

/// Runs the provisioner for a single workflow until its event log reports completion.
///
/// The manifest listener is spawned onto the current `LocalSet`. Monitor and controller run
/// side by side; once the monitor drains the log, the controller is stopped and the workflow
/// finished notice is published.
pub async fn run_provisioner(
    config: ProvisionerConfig,
    workflow: Workflow,
    estimates: RuntimeEstimates,
    log_path: &Path,
    broker: Rc<dyn Broker>,
) -> crate::Result<MonitorSummary> {
    let workflow = WorkflowRef::new(workflow);
    let gateway = Gateway::new(config.gateway.clone(), broker);
    let listener = {
        let gateway = gateway.clone();
        tokio::task::spawn_local(async move { gateway.listen().await })
    };

    let end_flag = Rc::new(Notify::new());
    let reader = EventLogReader::new(log_path, &config.reader);
    let mut controller = Controller::new(
        workflow.clone(),
        gateway.clone(),
        estimates,
        config.controller.clone(),
    );

    let monitor_process = async {
        let result = monitor_workflow(reader, workflow.clone()).await;
        end_flag.notify_one();
        result
    };
    let (summary, ()) = futures::join!(monitor_process, controller.run(end_flag.clone()));
    listener.abort();

    let summary = summary?;
    gateway.publish_finished().await;
    Ok(summary)
}

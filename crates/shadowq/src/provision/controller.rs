use std::fmt::{Display, Formatter};
use std::rc::Rc;
use std::time::SystemTime;

use shadowsim::RuntimeEstimates;
use tokio::sync::Notify;

use crate::common::config::ControllerConfig;
use crate::common::utils::time::format_time;
use crate::gateway::GatewayRef;
use crate::provision::request::ProvisionRequest;
use crate::provision::search::{SearchParams, choose_slots};
use crate::workflow::WorkflowRef;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ControllerPhase {
    Idle,
    Simulating,
    Deciding,
    Publishing,
}

impl Display for ControllerPhase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ControllerPhase::Idle => "idle",
            ControllerPhase::Simulating => "simulating",
            ControllerPhase::Deciding => "deciding",
            ControllerPhase::Publishing => "publishing",
        })
    }
}

/// Periodically projects the workflow finish and asks the resource manager for enough slots to
/// meet the deadline.
pub struct Controller {
    workflow: WorkflowRef,
    gateway: GatewayRef,
    estimates: RuntimeEstimates,
    config: ControllerConfig,
    phase: ControllerPhase,
}

impl Controller {
    pub fn new(
        workflow: WorkflowRef,
        gateway: GatewayRef,
        estimates: RuntimeEstimates,
        config: ControllerConfig,
    ) -> Self {
        Self {
            workflow,
            gateway,
            estimates,
            config,
            phase: ControllerPhase::Idle,
        }
    }

    #[inline]
    pub fn phase(&self) -> ControllerPhase {
        self.phase
    }

    fn set_phase(&mut self, phase: ControllerPhase) {
        if self.phase != phase {
            log::debug!("Controller: {} -> {phase}", self.phase);
            self.phase = phase;
        }
    }

    /// Runs provisioning cycles every `interval` until `end_flag` is notified.
    ///
    /// A failed cycle is logged and skipped, it never stops the loop.
    pub async fn run(&mut self, end_flag: Rc<Notify>) {
        log::info!(
            "Provisioning controller started, cycle interval {}",
            humantime::format_duration(self.config.interval)
        );
        loop {
            if let Err(error) = self.run_cycle(SystemTime::now()).await {
                log::error!("Provisioning cycle abandoned: {error}");
            }
            self.set_phase(ControllerPhase::Idle);

            tokio::select! {
                biased;
                _ = end_flag.notified() => break,
                _ = tokio::time::sleep(self.config.interval) => {}
            }
        }
        log::info!("Provisioning controller stopped");
    }

    pub async fn run_cycle(&mut self, now: SystemTime) -> crate::Result<ProvisionRequest> {
        self.set_phase(ControllerPhase::Simulating);
        let (mut snapshot, deadline) = {
            let workflow = self.workflow.get();
            (workflow.snapshot(), workflow.deadline())
        };
        snapshot.apply_estimates(&self.estimates);
        let current_slots = self.gateway.current_slots();

        self.set_phase(ControllerPhase::Deciding);
        let decision = choose_slots(
            &snapshot,
            current_slots,
            deadline,
            now,
            &SearchParams::from(&self.config),
        )?;
        let request = ProvisionRequest::new(
            deadline,
            decision.result.projected_finish,
            current_slots,
            decision.slots,
            decision.result.utilization(),
        );
        log::info!(
            "Projected finish {} with {} slot(s) (deadline {}, slack {}s), requesting {} slot(s), currently {}",
            format_time(decision.result.projected_finish),
            decision.slots,
            format_time(deadline),
            request.deadline_slack,
            request.requested_slots,
            current_slots
        );

        self.set_phase(ControllerPhase::Publishing);
        self.gateway.publish_request(&request).await;
        Ok(request)
    }
}

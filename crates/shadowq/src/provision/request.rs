use std::time::SystemTime;

use crate::common::config::GatewayConfig;
use crate::common::utils::time::{signed_secs_between, unix_secs};
use crate::gateway::messages::ModifyComputeMessage;

/// Slot count requested from the resource manager in one controller cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionRequest {
    pub deadline: SystemTime,
    /// Seconds by which the projected finish overshoots the deadline (negative when it is met).
    pub deadline_slack: i64,
    pub current_slots: u32,
    pub requested_slots: u32,
    pub max_utilization_hint: f64,
}

impl ProvisionRequest {
    pub fn new(
        deadline: SystemTime,
        projected_finish: SystemTime,
        current_slots: u32,
        requested_slots: u32,
        max_utilization_hint: f64,
    ) -> Self {
        Self {
            deadline,
            deadline_slack: signed_secs_between(projected_finish, deadline),
            current_slots,
            requested_slots,
            max_utilization_hint,
        }
    }

    pub fn to_message(&self, config: &GatewayConfig) -> ModifyComputeMessage {
        ModifyComputeMessage {
            slice_id: config.slice_id.clone(),
            workflow_id: config.workflow_id.clone(),
            current_slots: self.current_slots,
            deadline: unix_secs(self.deadline),
            deadline_slack: self.deadline_slack,
            requested_slots: self.requested_slots,
            max_utilization: self.max_utilization_hint,
        }
    }
}

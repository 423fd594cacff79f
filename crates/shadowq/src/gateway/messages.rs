use serde::{Deserialize, Serialize};

/// Capacity manifest published by the resource manager for a resource slice.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ManifestMessage {
    pub status: String,
    pub ready_count: u32,
    pub provisioning_count: u32,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ModifyComputeMessage {
    pub slice_id: String,
    pub workflow_id: String,
    pub current_slots: u32,
    /// Unix timestamp (seconds).
    pub deadline: i64,
    /// Projected finish minus deadline in seconds, negative when the deadline is met.
    pub deadline_slack: i64,
    pub requested_slots: u32,
    pub max_utilization: f64,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct WorkflowFinishedMessage {
    pub slice_id: String,
    pub workflow_id: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum ToResourceManagerMessage {
    #[serde(rename = "modifyCompute")]
    ModifyCompute(ModifyComputeMessage),
    #[serde(rename = "workflowFinished")]
    WorkflowFinished(WorkflowFinishedMessage),
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::gateway::messages::{
        ManifestMessage, ModifyComputeMessage, ToResourceManagerMessage, WorkflowFinishedMessage,
    };

    #[test]
    fn test_modify_compute_shape() {
        let message = ToResourceManagerMessage::ModifyCompute(ModifyComputeMessage {
            slice_id: "slice".to_string(),
            workflow_id: "wf".to_string(),
            current_slots: 4,
            deadline: 1_700_003_600,
            deadline_slack: -120,
            requested_slots: 2,
            max_utilization: 0.5,
        });
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({
                "type": "modifyCompute",
                "slice_id": "slice",
                "workflow_id": "wf",
                "current_slots": 4,
                "deadline": 1_700_003_600,
                "deadline_slack": -120,
                "requested_slots": 2,
                "max_utilization": 0.5,
            })
        );
    }

    #[test]
    fn test_workflow_finished_shape() {
        let message = ToResourceManagerMessage::WorkflowFinished(WorkflowFinishedMessage {
            slice_id: "slice".to_string(),
            workflow_id: "wf".to_string(),
        });
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({"type": "workflowFinished", "slice_id": "slice", "workflow_id": "wf"})
        );
    }

    #[test]
    fn test_manifest() {
        let manifest: ManifestMessage = serde_json::from_str(
            r#"{"status": "ok", "ready_count": 3, "provisioning_count": 2, "extra": true}"#,
        )
        .unwrap();
        assert_eq!(manifest.ready_count, 3);
        assert_eq!(manifest.provisioning_count, 2);
        assert!(serde_json::from_str::<ManifestMessage>(r#"{"status": "ok"}"#).is_err());
        assert!(
            serde_json::from_str::<ManifestMessage>(
                r#"{"status": "ok", "ready_count": -1, "provisioning_count": 0}"#
            )
            .is_err()
        );
    }
}

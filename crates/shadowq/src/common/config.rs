use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::common::utils::time::deserialize_duration;

/// Complete configuration of the provisioner.
///
/// Built from defaults, optionally overridden by a TOML file and then by command line flags.
/// Every component receives its own section at construction.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProvisionerConfig {
    pub reader: ReaderConfig,
    pub controller: ControllerConfig,
    pub gateway: GatewayConfig,
}

impl ProvisionerConfig {
    pub fn parse(text: &str) -> crate::Result<Self> {
        let config: ProvisionerConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> crate::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.controller.max_stalled_steps == 0 {
            return crate::common::error::error(
                "`controller.max_stalled_steps` has to be at least 1".to_string(),
            );
        }
        if self.controller.max_slots == Some(0) {
            return crate::common::error::error(
                "`controller.max_slots` has to be at least 1".to_string(),
            );
        }
        if self.reader.poll_interval.is_zero() || self.controller.interval.is_zero() {
            return crate::common::error::error(
                "Poll and provisioning intervals must be non-zero".to_string(),
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReaderConfig {
    /// How long to wait before checking the log for new data.
    #[serde(deserialize_with = "deserialize_duration")]
    pub poll_interval: Duration,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControllerConfig {
    /// Delay between two provisioning cycles.
    #[serde(deserialize_with = "deserialize_duration")]
    pub interval: Duration,
    /// An extra slot has to move the projected finish by at least this much to count as progress.
    #[serde(deserialize_with = "deserialize_duration")]
    pub improvement_threshold: Duration,
    /// Consecutive insufficient improvements after which the deadline is deemed unreachable.
    pub max_stalled_steps: u32,
    /// Upper bound for the number of requested slots.
    pub max_slots: Option<u32>,
    /// Runtime estimate of jobs missing from the estimate table.
    #[serde(deserialize_with = "deserialize_duration")]
    pub default_estimate: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(90),
            improvement_threshold: Duration::from_secs(60),
            max_stalled_steps: 2,
            max_slots: None,
            default_estimate: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GatewayConfig {
    /// Resource slice of this workflow, also the topic of capacity manifests.
    pub slice_id: String,
    pub workflow_id: String,
    /// Address (`host:port`) of the message broker.
    pub broker: String,
    /// Topic that receives provisioning requests and the final notice.
    pub request_topic: String,
    /// Bound on a single publish and on opening a subscription.
    #[serde(deserialize_with = "deserialize_duration")]
    pub publish_timeout: Duration,
    #[serde(deserialize_with = "deserialize_duration")]
    pub reconnect_delay: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            slice_id: "default".to_string(),
            workflow_id: "workflow".to_string(),
            broker: "127.0.0.1:5672".to_string(),
            request_topic: "provisioner.requests".to_string(),
            publish_timeout: Duration::from_secs(10),
            reconnect_delay: Duration::from_secs(5),
        }
    }
}

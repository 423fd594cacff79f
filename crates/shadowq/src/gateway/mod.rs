pub mod broker;
pub mod messages;

use std::cell::Cell;
use std::rc::Rc;

use anyhow::anyhow;
use bytes::Bytes;
use futures::StreamExt;

use crate::common::config::GatewayConfig;
use crate::gateway::broker::Broker;
use crate::gateway::messages::{
    ManifestMessage, ToResourceManagerMessage, WorkflowFinishedMessage,
};
use crate::provision::ProvisionRequest;

/// Capacity of the resource slice as last reported by the resource manager.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Capacity {
    pub ready: u32,
    pub provisioning: u32,
}

impl Capacity {
    /// Slots that are either running or already on their way, never less than one.
    pub fn slots(&self) -> u32 {
        self.ready.saturating_add(self.provisioning).max(1)
    }
}

/// Client side of the resource manager protocol.
///
/// Manifests received by [`Gateway::listen`] update a cached capacity that the controller reads
/// synchronously. Publishing never blocks longer than the configured timeout and gives up after
/// a single retry.
pub struct Gateway {
    config: GatewayConfig,
    broker: Rc<dyn Broker>,
    capacity: Cell<Option<Capacity>>,
    finished_published: Cell<bool>,
}

pub type GatewayRef = Rc<Gateway>;

impl Gateway {
    pub fn new(config: GatewayConfig, broker: Rc<dyn Broker>) -> GatewayRef {
        Rc::new(Self {
            config,
            broker,
            capacity: Cell::new(None),
            finished_published: Cell::new(false),
        })
    }

    #[inline]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn capacity(&self) -> Option<Capacity> {
        self.capacity.get()
    }

    pub fn current_slots(&self) -> u32 {
        self.capacity.get().map(|capacity| capacity.slots()).unwrap_or(1)
    }

    /// Keeps a manifest subscription open for the lifetime of the process.
    pub async fn listen(&self) {
        loop {
            match self.listen_once().await {
                Ok(()) => log::warn!("Manifest subscription of slice {} closed", self.config.slice_id),
                Err(error) => log::warn!(
                    "Cannot subscribe to manifests of slice {}: {error:?}",
                    self.config.slice_id
                ),
            }
            tokio::time::sleep(self.config.reconnect_delay).await;
        }
    }

    async fn listen_once(&self) -> anyhow::Result<()> {
        let mut subscription = tokio::time::timeout(
            self.config.publish_timeout,
            self.broker.subscribe(&self.config.slice_id),
        )
        .await
        .map_err(|_| self.timed_out())??;
        log::debug!("Listening for manifests of slice {}", self.config.slice_id);
        while let Some(body) = subscription.next().await {
            match body {
                Ok(body) => self.handle_manifest(&body),
                Err(error) => log::warn!("Invalid delivery on the manifest topic: {error:?}"),
            }
        }
        Ok(())
    }

    pub fn handle_manifest(&self, body: &[u8]) {
        let manifest: ManifestMessage = match serde_json::from_slice(body) {
            Ok(manifest) => manifest,
            Err(error) => {
                log::warn!(
                    "Ignoring malformed manifest ({error}): {}",
                    String::from_utf8_lossy(body)
                );
                return;
            }
        };
        let capacity = Capacity {
            ready: manifest.ready_count,
            provisioning: manifest.provisioning_count,
        };
        if self.capacity.replace(Some(capacity)) != Some(capacity) {
            log::info!(
                "Slice {} capacity: {} ready, {} provisioning (status {})",
                self.config.slice_id,
                capacity.ready,
                capacity.provisioning,
                manifest.status
            );
        }
    }

    pub async fn publish_request(&self, request: &ProvisionRequest) -> bool {
        let message = ToResourceManagerMessage::ModifyCompute(request.to_message(&self.config));
        self.publish(&message).await
    }

    /// Publishes the workflow finished notice. Only the first call sends anything.
    pub async fn publish_finished(&self) -> bool {
        if self.finished_published.replace(true) {
            log::debug!("Workflow finished notice was already published");
            return false;
        }
        let message = ToResourceManagerMessage::WorkflowFinished(WorkflowFinishedMessage {
            slice_id: self.config.slice_id.clone(),
            workflow_id: self.config.workflow_id.clone(),
        });
        let published = self.publish(&message).await;
        if published {
            log::info!("Workflow {} finished, notice published", self.config.workflow_id);
        }
        published
    }

    async fn publish(&self, message: &ToResourceManagerMessage) -> bool {
        let body = match serde_json::to_vec(message) {
            Ok(body) => Bytes::from(body),
            Err(error) => {
                log::error!("Cannot serialize message {message:?}: {error}");
                return false;
            }
        };
        for attempt in 1..=2 {
            match self.try_publish(body.clone()).await {
                Ok(()) => return true,
                Err(error) if attempt == 1 => {
                    log::warn!(
                        "Publishing to {} failed, retrying: {error:?}",
                        self.config.request_topic
                    )
                }
                Err(error) => log::error!(
                    "Publishing to {} failed, dropping the message: {error:?}",
                    self.config.request_topic
                ),
            }
        }
        false
    }

    async fn try_publish(&self, body: Bytes) -> anyhow::Result<()> {
        tokio::time::timeout(
            self.config.publish_timeout,
            self.broker.publish(&self.config.request_topic, body),
        )
        .await
        .map_err(|_| self.timed_out())?
    }

    fn timed_out(&self) -> anyhow::Error {
        anyhow!(
            "no response within {}",
            humantime::format_duration(self.config.publish_timeout)
        )
    }
}

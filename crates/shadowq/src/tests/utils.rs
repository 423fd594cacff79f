use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use derive_builder::Builder;
use futures::StreamExt;
use futures::channel::mpsc::{UnboundedSender, unbounded};
use futures::future::LocalBoxFuture;
use shadowsim::{Dag, JobType, Workflow};

use crate::common::config::{ControllerConfig, GatewayConfig, ProvisionerConfig, ReaderConfig};
use crate::gateway::broker::{Broker, Subscription};
use crate::workflow::WorkflowRef;

/// Creation time of workflows built by the helpers below.
pub const START: u64 = 1_700_000_000;

pub fn unix(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
}

/// Chain of jobs `names[0] -> names[1] -> ...`, created at [`START`] with a one hour deadline.
pub fn chain(names: &[&str], runtime: u64) -> Workflow {
    let mut dag = Dag::new();
    for name in names {
        dag.add_job(
            *name,
            JobType::from_job_name(name),
            Duration::from_secs(runtime),
        )
        .unwrap();
    }
    for pair in names.windows(2) {
        dag.add_dependency(pair[0], pair[1]).unwrap();
    }
    Workflow::new(dag, unix(START + 3600), unix(START)).unwrap()
}

pub fn chain_workflow(names: &[&str], runtime: u64) -> WorkflowRef {
    WorkflowRef::new(chain(names, runtime))
}

pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub async fn wait_for<F: Fn() -> bool>(condition: F) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("Condition was not fulfilled in time");
}

#[derive(Builder)]
#[builder(pattern = "owned", build_fn(name = "finish"))]
pub struct TestConfig {
    #[builder(default = "Duration::from_millis(5)")]
    poll_interval: Duration,
    #[builder(default = "Duration::from_millis(10)")]
    interval: Duration,
    #[builder(default = "Duration::from_secs(60)")]
    improvement_threshold: Duration,
    #[builder(default)]
    max_slots: Option<u32>,
    #[builder(default = "\"slice-1\".to_string()", setter(into))]
    slice_id: String,
    #[builder(default = "\"wf-1\".to_string()", setter(into))]
    workflow_id: String,
    #[builder(default = "Duration::from_secs(1)")]
    publish_timeout: Duration,
    #[builder(default = "Duration::from_millis(10)")]
    reconnect_delay: Duration,
}

impl TestConfigBuilder {
    pub fn build(self) -> ProvisionerConfig {
        let TestConfig {
            poll_interval,
            interval,
            improvement_threshold,
            max_slots,
            slice_id,
            workflow_id,
            publish_timeout,
            reconnect_delay,
        } = self.finish().unwrap();

        ProvisionerConfig {
            reader: ReaderConfig { poll_interval },
            controller: ControllerConfig {
                interval,
                improvement_threshold,
                max_stalled_steps: 2,
                max_slots,
                default_estimate: Duration::from_secs(10),
            },
            gateway: GatewayConfig {
                slice_id,
                workflow_id,
                broker: "127.0.0.1:0".to_string(),
                request_topic: "requests".to_string(),
                publish_timeout,
                reconnect_delay,
            },
        }
    }
}

pub fn test_config() -> TestConfigBuilder {
    TestConfigBuilder::default()
}

/// In-process broker that records published messages and feeds subscriptions on demand.
#[derive(Default)]
pub struct MemoryBroker {
    published: RefCell<Vec<(String, Bytes)>>,
    subscribers: RefCell<Vec<(String, UnboundedSender<anyhow::Result<Bytes>>)>>,
    subscriptions: Cell<u32>,
    publish_attempts: Cell<u32>,
    failing_publishes: Cell<u32>,
    stalled_subscriptions: Cell<u32>,
}

impl MemoryBroker {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Successfully published messages as `(topic, JSON body)` pairs.
    pub fn published(&self) -> Vec<(String, serde_json::Value)> {
        self.published
            .borrow()
            .iter()
            .map(|(topic, body)| (topic.clone(), serde_json::from_slice(body).unwrap()))
            .collect()
    }

    pub fn publish_attempts(&self) -> u32 {
        self.publish_attempts.get()
    }

    /// Number of subscriptions opened so far.
    pub fn subscriptions(&self) -> u32 {
        self.subscriptions.get()
    }

    pub fn fail_next_publishes(&self, count: u32) {
        self.failing_publishes.set(count);
    }

    /// The next `count` subscribe calls never complete.
    pub fn stall_next_subscriptions(&self, count: u32) {
        self.stalled_subscriptions.set(count);
    }

    pub fn deliver(&self, topic: &str, body: &[u8]) {
        for (subscribed, sender) in self.subscribers.borrow().iter() {
            if subscribed == topic {
                let _ = sender.unbounded_send(Ok(Bytes::copy_from_slice(body)));
            }
        }
    }

    /// Ends all open subscriptions.
    pub fn disconnect(&self) {
        self.subscribers.borrow_mut().clear();
    }
}

impl Broker for MemoryBroker {
    fn publish<'a>(
        &'a self,
        topic: &'a str,
        body: Bytes,
    ) -> LocalBoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            self.publish_attempts.set(self.publish_attempts.get() + 1);
            let failing = self.failing_publishes.get();
            if failing > 0 {
                self.failing_publishes.set(failing - 1);
                anyhow::bail!("Injected publish failure");
            }
            self.published.borrow_mut().push((topic.to_string(), body));
            Ok(())
        })
    }

    fn subscribe<'a>(&'a self, topic: &'a str) -> LocalBoxFuture<'a, anyhow::Result<Subscription>> {
        Box::pin(async move {
            let stalled = self.stalled_subscriptions.get();
            if stalled > 0 {
                self.stalled_subscriptions.set(stalled - 1);
                futures::future::pending::<()>().await;
            }
            let (sender, receiver) = unbounded();
            self.subscribers.borrow_mut().push((topic.to_string(), sender));
            self.subscriptions.set(self.subscriptions.get() + 1);
            Ok(receiver.boxed_local())
        })
    }
}

use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, SystemTime};

use clap::Parser;
use shadowsim::Workflow;
use tokio::task::LocalSet;

use crate::common::config::ProvisionerConfig;
use crate::common::utils::time::{ArgDeadline, ArgDuration, format_time};
use crate::gateway::broker::{Broker, TcpBroker};
use crate::service::run_provisioner;
use crate::workflow::load_workflow_dag;

#[derive(Parser)]
pub struct RunOpts {
    /// Provisioner configuration file (TOML)
    #[arg(long, env = "SHADOWQ_CONFIG", value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// DAG file of the monitored workflow
    #[arg(long, env = "SHADOWQ_DAG", value_hint = clap::ValueHint::FilePath)]
    pub dag: PathBuf,

    /// Event log written by the workflow engine
    #[arg(long, env = "SHADOWQ_LOG", value_hint = clap::ValueHint::FilePath)]
    pub log: PathBuf,

    /// Runtime estimates of jobs (`<job-name> <seconds>` per line)
    #[arg(long, env = "SHADOWQ_ESTIMATES", value_hint = clap::ValueHint::FilePath)]
    pub estimates: Option<PathBuf>,

    #[clap(flatten)]
    pub deadline: DeadlineOpts,

    /// Resource slice whose capacity is managed
    #[arg(long, env = "SHADOWQ_SLICE_ID")]
    pub slice_id: Option<String>,

    /// Workflow identifier sent to the resource manager
    #[arg(long, env = "SHADOWQ_WORKFLOW_ID")]
    pub workflow_id: Option<String>,

    /// Address of the message broker (`host:port`)
    #[arg(long, env = "SHADOWQ_BROKER")]
    pub broker: Option<String>,

    /// How often the event log is polled for new lines
    #[arg(long, env = "SHADOWQ_POLL_INTERVAL")]
    pub poll_interval: Option<ArgDuration>,

    /// Time between two provisioning cycles
    #[arg(long, env = "SHADOWQ_INTERVAL")]
    pub interval: Option<ArgDuration>,

    /// Upper bound of requested slots
    #[arg(long, env = "SHADOWQ_MAX_SLOTS")]
    pub max_slots: Option<u32>,
}

#[derive(clap::Args)]
#[group(required = true, multiple = false)]
pub struct DeadlineOpts {
    /// Absolute deadline of the workflow (RFC 3339)
    #[arg(long, env = "SHADOWQ_DEADLINE")]
    pub deadline: Option<ArgDeadline>,

    /// Makespan budget measured from the start of the provisioner (e.g. `2h`, `01:30:00`)
    #[arg(long, env = "SHADOWQ_MAKESPAN")]
    pub makespan: Option<ArgDuration>,
}

impl DeadlineOpts {
    pub fn resolve(&self, start: SystemTime) -> SystemTime {
        match (&self.deadline, &self.makespan) {
            (Some(deadline), _) => *deadline.get(),
            (None, Some(makespan)) => start + *makespan.get(),
            (None, None) => start,
        }
    }
}

impl RunOpts {
    /// Configuration file (or defaults) with command line overrides applied.
    pub fn load_config(&self) -> crate::Result<ProvisionerConfig> {
        let mut config = match &self.config {
            Some(path) => ProvisionerConfig::load(path)?,
            None => ProvisionerConfig::default(),
        };
        if let Some(slice_id) = &self.slice_id {
            config.gateway.slice_id = slice_id.clone();
        }
        if let Some(workflow_id) = &self.workflow_id {
            config.gateway.workflow_id = workflow_id.clone();
        }
        if let Some(broker) = &self.broker {
            config.gateway.broker = broker.clone();
        }
        if let Some(poll_interval) = &self.poll_interval {
            config.reader.poll_interval = *poll_interval.get();
        }
        if let Some(interval) = &self.interval {
            config.controller.interval = *interval.get();
        }
        if let Some(max_slots) = self.max_slots {
            config.controller.max_slots = Some(max_slots);
        }
        config.validate()?;
        Ok(config)
    }
}

pub async fn command_run(opts: RunOpts) -> anyhow::Result<()> {
    let config = opts.load_config()?;
    let start = SystemTime::now();
    let deadline = opts.deadline.resolve(start);

    let (dag, estimates) = load_workflow_dag(
        &opts.dag,
        opts.estimates.as_deref(),
        config.controller.default_estimate,
    )?;
    let workflow = Workflow::new(dag, deadline, start)?;
    log::info!(
        "Provisioning workflow {} on slice {} with deadline {} ({} from now)",
        config.gateway.workflow_id,
        config.gateway.slice_id,
        format_time(deadline),
        humantime::format_duration(Duration::from_secs(
            deadline.duration_since(start).unwrap_or_default().as_secs()
        ))
    );

    let broker: Rc<dyn Broker> = Rc::new(TcpBroker::new(config.gateway.broker.clone()));
    let local_set = LocalSet::new();
    local_set
        .run_until(async {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    log::info!("Received SIGINT, stopping");
                    Ok(())
                }
                result = run_provisioner(config, workflow, estimates, &opts.log, broker) => {
                    result.map(|summary| {
                        log::info!(
                            "Workflow finished: {} job(s) succeeded, {} failed",
                            summary.counts.succeeded,
                            summary.counts.failed
                        );
                    })
                }
            }
        })
        .await?;
    Ok(())
}

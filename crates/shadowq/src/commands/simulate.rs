use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use clap::Parser;
use shadowsim::{Workflow, simulate};

use crate::common::config::ReaderConfig;
use crate::common::utils::time::{ArgDeadline, ArgDuration, format_time};
use crate::event::{EventLogReader, ReadOutcome};
use crate::workflow::load_workflow_dag;

#[derive(Parser)]
pub struct SimulateOpts {
    /// DAG file of the workflow
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub dag: PathBuf,

    /// Runtime estimates of jobs (`<job-name> <seconds>` per line)
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub estimates: Option<PathBuf>,

    /// Event log replayed before the projection is made
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub log: Option<PathBuf>,

    /// Slot counts to simulate, separated by commas
    #[arg(long, value_delimiter(','), required = true)]
    pub slots: Vec<u32>,

    /// Runtime of jobs without an estimate
    #[arg(long, default_value = "60s")]
    pub default_estimate: ArgDuration,

    /// Start of the projection (RFC 3339). Defaults to the last replayed event, or the current
    /// time when no log is replayed
    #[arg(long)]
    pub now: Option<ArgDeadline>,
}

/// Applies everything that is currently in the log, without waiting for more lines.
///
/// Returns the timestamp of the last applied event.
pub async fn replay_log(
    mut reader: EventLogReader,
    workflow: &mut Workflow,
) -> crate::Result<Option<SystemTime>> {
    let mut last = None;
    while let ReadOutcome::Event(event) = reader.try_next().await? {
        workflow.apply(&event)?;
        last = Some(event.timestamp);
    }
    Ok(last)
}

pub async fn command_simulate(opts: SimulateOpts) -> anyhow::Result<()> {
    let (dag, _) = load_workflow_dag(
        &opts.dag,
        opts.estimates.as_deref(),
        *opts.default_estimate.get(),
    )?;
    let start = SystemTime::now();
    let mut workflow = Workflow::new(dag, start, start)?;

    let mut now = opts.now.map(|now| now.unpack());
    if let Some(log) = &opts.log {
        let reader = EventLogReader::new(log, &ReaderConfig::default());
        let last_event = replay_log(reader, &mut workflow).await?;
        now = now.or(last_event);
        let counts = workflow.counts();
        log::info!(
            "Replayed {}: {} succeeded, {} failed, {} running, {} waiting",
            log.display(),
            counts.succeeded,
            counts.failed,
            counts.running,
            counts.pending + counts.ready
        );
    }
    let now = now.unwrap_or(start);
    let snapshot = workflow.snapshot();

    println!(
        "{:>6}  {:<22}  {:>14}  {:>11}",
        "SLOTS", "PROJECTED FINISH", "REMAINING", "UTILIZATION"
    );
    for slots in opts.slots {
        let result = simulate(&snapshot, slots, now)?;
        println!(
            "{:>6}  {:<22}  {:>14}  {:>10.1}%",
            slots,
            format_time(result.projected_finish),
            humantime::format_duration(Duration::from_secs(result.remaining().as_secs()))
                .to_string(),
            result.utilization() * 100.0
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use shadowsim::JobState;
    use tempfile::NamedTempFile;

    use crate::commands::simulate::replay_log;
    use crate::event::EventLogReader;
    use crate::tests::utils::{chain, test_config, unix};

    #[tokio::test]
    async fn test_replay_unfinished_log() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "1700000000 a SUBMIT 1.0 local").unwrap();
        writeln!(file, "1700000010 a JOB_SUCCESS 1.0 local").unwrap();
        writeln!(file, "1700000011 b SUBMIT 2.0 local").unwrap();
        // Partial line without a terminator
        write!(file, "1700000015 b JOB_SU").unwrap();
        file.flush().unwrap();

        let mut workflow = chain(&["a", "b", "c"], 10);
        let reader = EventLogReader::new(file.path(), &test_config().build().reader);
        let last = replay_log(reader, &mut workflow).await.unwrap();
        assert_eq!(last, Some(unix(1_700_000_011)));
        assert_eq!(
            workflow.dag().get_job("b").unwrap().state(),
            JobState::Running
        );
        assert_eq!(
            workflow.dag().get_job("c").unwrap().state(),
            JobState::Pending
        );
    }

    #[tokio::test]
    async fn test_replay_missing_log() {
        let mut workflow = chain(&["a"], 10);
        let reader = EventLogReader::new(
            std::path::Path::new("/nonexistent/shadowq.log"),
            &test_config().build().reader,
        );
        assert_eq!(replay_log(reader, &mut workflow).await.unwrap(), None);
    }
}

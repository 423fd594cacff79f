use std::io::Write;
use std::time::{Duration, SystemTime};

use shadowsim::{Dag, JobType, Workflow};
use tempfile::NamedTempFile;
use tokio::task::LocalSet;

use crate::common::error::SqError;
use crate::service::run_provisioner;
use crate::tests::utils::{MemoryBroker, init_test_logging, test_config, wait_for};

fn fork_join_workflow() -> Workflow {
    let mut dag = Dag::new();
    for name in ["A", "B1", "B2", "C"] {
        dag.add_job(name, JobType::Compute, Duration::from_secs(10))
            .unwrap();
    }
    for (parent, child) in [("A", "B1"), ("A", "B2"), ("B1", "C"), ("B2", "C")] {
        dag.add_dependency(parent, child).unwrap();
    }
    let now = SystemTime::now();
    Workflow::new(dag, now + Duration::from_secs(3600), now).unwrap()
}

fn write_lines(file: &mut NamedTempFile, lines: &[&str]) {
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
    file.flush().unwrap();
}

const FULL_RUN: [&str; 11] = [
    "1700000000 INTERNAL *** MONITORD_STARTED ***",
    "1700000001 A SUBMIT 1.0 local",
    "1700000011 A JOB_SUCCESS 1.0 local",
    "1700000012 B1 SUBMIT 2.0 local",
    "1700000012 B2 SUBMIT 3.0 local",
    "1700000020 B1 JOB_SUCCESS 2.0 local",
    "1700000021 B2 JOB_TERMINATED 0 local",
    "1700000022 C SUBMIT 4.0 local",
    "1700000030 C POST_SCRIPT_SUCCESS 4.0 local",
    "1700000031 INTERNAL *** DAGMAN_FINISHED ***",
    "1700000032 INTERNAL *** MONITORD_FINISHED ***",
];

#[tokio::test]
async fn test_run_finished_log() {
    init_test_logging();
    let mut file = NamedTempFile::new().unwrap();
    write_lines(&mut file, &FULL_RUN);

    let broker = MemoryBroker::new();
    let summary = LocalSet::new()
        .run_until(run_provisioner(
            test_config().build(),
            fork_join_workflow(),
            shadowsim::RuntimeEstimates::new(Duration::from_secs(10)),
            file.path(),
            broker.clone(),
        ))
        .await
        .unwrap();
    assert_eq!(summary.counts.succeeded, 4);
    assert_eq!(summary.events, 11);

    let published = broker.published();
    assert!(published.len() >= 2);
    assert!(
        published[..published.len() - 1]
            .iter()
            .all(|(_, body)| body["type"] == "modifyCompute")
    );
    let (topic, finished) = published.last().unwrap();
    assert_eq!(topic, "requests");
    assert_eq!(finished["type"], "workflowFinished");
    assert_eq!(finished["workflow_id"], "wf-1");
}

#[tokio::test]
async fn test_run_follows_growing_log() {
    init_test_logging();
    let mut file = NamedTempFile::new().unwrap();
    write_lines(&mut file, &FULL_RUN[..3]);
    let path = file.path().to_path_buf();

    let broker = MemoryBroker::new();
    let provisioner = run_provisioner(
        test_config().build(),
        fork_join_workflow(),
        shadowsim::RuntimeEstimates::new(Duration::from_secs(10)),
        &path,
        broker.clone(),
    );
    let writer = async {
        // Several cycles pass while the workflow is still running
        wait_for(|| broker.published().len() >= 3).await;
        write_lines(&mut file, &FULL_RUN[3..]);
    };

    let (summary, ()) = LocalSet::new()
        .run_until(async { tokio::join!(provisioner, writer) })
        .await;
    assert_eq!(summary.unwrap().counts.succeeded, 4);

    let published = broker.published();
    let finished: Vec<_> = published
        .iter()
        .filter(|(_, body)| body["type"] == "workflowFinished")
        .collect();
    assert_eq!(finished.len(), 1);
    assert_eq!(published.last().unwrap().1["type"], "workflowFinished");
}

#[tokio::test]
async fn test_run_uses_manifest_capacity() {
    init_test_logging();
    let mut file = NamedTempFile::new().unwrap();
    write_lines(&mut file, &FULL_RUN[..1]);
    let path = file.path().to_path_buf();

    let broker = MemoryBroker::new();
    let provisioner = run_provisioner(
        test_config().build(),
        fork_join_workflow(),
        shadowsim::RuntimeEstimates::new(Duration::from_secs(10)),
        &path,
        broker.clone(),
    );
    let driver = async {
        wait_for(|| broker.subscriptions() == 1).await;
        broker.deliver(
            "slice-1",
            br#"{"status":"ok","ready_count":3,"provisioning_count":2}"#,
        );
        wait_for(|| {
            broker
                .published()
                .iter()
                .any(|(_, body)| body["current_slots"] == 5)
        })
        .await;
        write_lines(&mut file, &FULL_RUN[1..]);
    };

    let (summary, ()) = LocalSet::new()
        .run_until(async { tokio::join!(provisioner, driver) })
        .await;
    summary.unwrap();

    // A fork-join workflow never needs more than two slots
    let scaled = broker
        .published()
        .into_iter()
        .find(|(_, body)| body["current_slots"] == 5)
        .unwrap();
    assert_eq!(scaled.1["requested_slots"], 1);
}

#[tokio::test]
async fn test_run_invalid_log_is_fatal() {
    init_test_logging();
    let mut file = NamedTempFile::new().unwrap();
    write_lines(
        &mut file,
        &["1700000001 A SUBMIT 1.0 local", "1700000002 Z SUBMIT 2.0 local"],
    );

    let broker = MemoryBroker::new();
    let result = LocalSet::new()
        .run_until(run_provisioner(
            test_config().build(),
            fork_join_workflow(),
            shadowsim::RuntimeEstimates::new(Duration::from_secs(10)),
            file.path(),
            broker.clone(),
        ))
        .await;
    assert!(matches!(result, Err(SqError::WorkflowError(_))));
    assert!(
        broker
            .published()
            .iter()
            .all(|(_, body)| body["type"] != "workflowFinished")
    );
}

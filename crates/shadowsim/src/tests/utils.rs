use std::time::{Duration, SystemTime};

use crate::dag::{Dag, JobType, Workflow};
use crate::events::{EventKind, LogEvent};

/// Fixed reference time used as "now" in tests.
pub fn t0() -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000)
}

pub fn at(secs: u64) -> SystemTime {
    t0() + Duration::from_secs(secs)
}

pub fn secs(secs: u64) -> Duration {
    Duration::from_secs(secs)
}

/// Linear chain `names[0] -> names[1] -> ...`, every job takes `estimate` seconds.
pub fn chain_dag(names: &[&str], estimate: u64) -> Dag {
    let mut dag = Dag::new();
    for name in names {
        dag.add_job(*name, JobType::Compute, secs(estimate)).unwrap();
    }
    for pair in names.windows(2) {
        dag.add_dependency(pair[0], pair[1]).unwrap();
    }
    dag
}

/// `A` forking into `B1`, `B2`, joining at `C`.
pub fn fork_join_dag(estimate: u64) -> Dag {
    let mut dag = Dag::new();
    for name in ["A", "B1", "B2", "C"] {
        dag.add_job(name, JobType::Compute, secs(estimate)).unwrap();
    }
    dag.add_dependency("A", "B1").unwrap();
    dag.add_dependency("A", "B2").unwrap();
    dag.add_dependency("B1", "C").unwrap();
    dag.add_dependency("B2", "C").unwrap();
    dag
}

/// One independent job named `job-<index>` per estimate.
pub fn independent_dag(estimates: &[u64]) -> Dag {
    let mut dag = Dag::new();
    for (index, estimate) in estimates.iter().enumerate() {
        dag.add_job(format!("job-{index}"), JobType::Compute, secs(*estimate))
            .unwrap();
    }
    dag
}

pub fn workflow(dag: Dag) -> Workflow {
    Workflow::new(dag, at(3600), t0()).unwrap()
}

pub fn job_event(secs: u64, kind: EventKind, name: &str) -> LogEvent {
    LogEvent::for_job(at(secs), kind, name)
}

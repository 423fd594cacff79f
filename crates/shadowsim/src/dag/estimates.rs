use std::time::Duration;

use crate::Map;
use crate::dag::JobName;

/// Static table of expected job runtimes.
/// Jobs missing from the table fall back to the default estimate.
#[derive(Debug, Clone)]
pub struct RuntimeEstimates {
    table: Map<JobName, Duration>,
    default: Duration,
}

impl RuntimeEstimates {
    pub fn new(default: Duration) -> Self {
        Self {
            table: Default::default(),
            default,
        }
    }

    pub fn insert<N: Into<JobName>>(&mut self, name: N, estimate: Duration) {
        self.table.insert(name.into(), estimate);
    }

    pub fn get(&self, name: &str) -> Duration {
        self.table.get(name).copied().unwrap_or(self.default)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

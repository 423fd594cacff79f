use std::str::FromStr;

use anyhow::{anyhow, bail};
use shadowsim::{EventKind, LogEvent};
use thiserror::Error;

use crate::common::parser::{consume_all, p_decimal};
use crate::common::utils::time::system_time_from_unix_secs;

/// Literal in the second field of workflow-level log lines.
pub const INTERNAL_MARKER: &str = "INTERNAL";
/// Monitors wrap internal event kinds in `*** KIND ***`.
const KIND_WRAPPER: &str = "***";
/// Placeholder written for an unknown scheduler id or site.
const EMPTY_FIELD: &str = "-";

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Malformed event log line {line}: {reason} (`{content}`)")]
pub struct LogParseError {
    pub line: u64,
    pub content: String,
    pub reason: String,
}

impl LogParseError {
    pub fn new(line: u64, content: &str, reason: String) -> Self {
        Self {
            line,
            content: content.to_string(),
            reason,
        }
    }
}

/// Parses a single line of the job-state log.
///
/// Accepted shapes (whitespace separated, trailing fields are ignored):
/// - `<timestamp> INTERNAL <kind>`, the kind may be wrapped in `***`
/// - `<timestamp> <job> <kind> [<scheduler-id> [<site>]]`
/// - `<timestamp> <kind> <job> [<scheduler-id> [<site>]]`
///
/// Returns `None` for blank lines.
pub fn parse_log_line(line: &str) -> anyhow::Result<Option<LogEvent>> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let Some(timestamp) = fields.first() else {
        return Ok(None);
    };
    let timestamp = consume_all(p_decimal, timestamp)
        .and_then(system_time_from_unix_secs)
        .map_err(|e| anyhow!("invalid timestamp: {e}"))?;
    if fields.len() < 3 {
        bail!("expected at least 3 fields, found {}", fields.len());
    }

    if fields[1] == INTERNAL_MARKER {
        let kind = fields[2..]
            .iter()
            .find(|field| **field != KIND_WRAPPER)
            .ok_or_else(|| anyhow!("missing event kind"))?;
        let kind = EventKind::from_str(kind)?;
        if !kind.is_internal() {
            bail!("{kind} is not a workflow-level event");
        }
        return Ok(Some(LogEvent::internal(timestamp, kind)));
    }

    let (job_name, kind) = match (
        EventKind::from_str(fields[1]),
        EventKind::from_str(fields[2]),
    ) {
        (_, Ok(kind)) => (fields[1], kind),
        (Ok(kind), Err(_)) => (fields[2], kind),
        (Err(_), Err(_)) => bail!(
            "neither `{}` nor `{}` is a recognized event kind",
            fields[1],
            fields[2]
        ),
    };
    if kind.is_internal() {
        return Ok(Some(LogEvent::internal(timestamp, kind)));
    }

    let mut event = LogEvent::for_job(timestamp, kind, job_name);
    let optional = |index: usize| {
        fields
            .get(index)
            .filter(|field| **field != EMPTY_FIELD)
            .map(|field| field.to_string())
    };
    event.scheduler_job_id = optional(3);
    event.site = optional(4);
    Ok(Some(event))
}

use std::time::{Duration, SystemTime};

use anyhow::anyhow;
use chrono::{DateTime, SecondsFormat, Utc};
use nom::character::complete::char;
use nom::combinator::{map_res, opt};
use nom::sequence::{preceded, tuple};
use serde::{Deserialize, Deserializer};

use crate::common::parser::{NomResult, consume_all, p_u32};

// Allows specifying humantime format (2h, 3m, etc.) or HH:MM:SS
crate::arg_wrapper!(ArgDuration, Duration, parse_hms_or_human_time);

// RFC 3339 timestamp (2024-05-01T12:00:00Z)
crate::arg_wrapper!(ArgDeadline, SystemTime, parse_deadline);

pub fn parse_hms_or_human_time(text: &str) -> anyhow::Result<Duration> {
    parse_hms_time(text)
        .or_else(|_| humantime::parse_duration(text))
        .map_err(|e| {
            anyhow!(
                "Could not parse duration `{text}`. Use either `HH:MM:SS` or humantime format (90s, 2m): {e:?}"
            )
        })
}

fn p_hms_time(input: &str) -> NomResult<Duration> {
    map_res(
        tuple((
            p_u32,
            opt(preceded(char(':'), p_u32)),
            opt(preceded(char(':'), p_u32)),
        )),
        |parsed| match parsed {
            (seconds, None, None) => Ok(Duration::from_secs(seconds as u64)),
            (minutes, Some(seconds), None) => {
                Ok(Duration::from_secs(minutes as u64 * 60 + seconds as u64))
            }
            (hours, Some(minutes), Some(seconds)) => Ok(Duration::from_secs(
                hours as u64 * 3600 + minutes as u64 * 60 + seconds as u64,
            )),
            _ => Err(anyhow!("Invalid time specification")),
        },
    )(input)
}

/// Parses time strings in the format [[hh:]mm:]ss.
pub fn parse_hms_time(input: &str) -> anyhow::Result<Duration> {
    consume_all(p_hms_time, input)
}

pub fn parse_deadline(text: &str) -> anyhow::Result<SystemTime> {
    DateTime::parse_from_rfc3339(text)
        .map(SystemTime::from)
        .map_err(|e| anyhow!("Invalid deadline `{text}`, expected an RFC 3339 timestamp: {e}"))
}

pub fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let buf = String::deserialize(deserializer)?;
    parse_hms_or_human_time(&buf).map_err(serde::de::Error::custom)
}

/// Converts fractional Unix seconds (as written into job-state logs) to a timestamp.
pub fn system_time_from_unix_secs(secs: f64) -> anyhow::Result<SystemTime> {
    let offset = Duration::try_from_secs_f64(secs)
        .map_err(|e| anyhow!("Invalid Unix timestamp {secs}: {e}"))?;
    SystemTime::UNIX_EPOCH
        .checked_add(offset)
        .ok_or_else(|| anyhow!("Unix timestamp {secs} is out of range"))
}

pub fn unix_secs(time: SystemTime) -> i64 {
    signed_secs_between(time, SystemTime::UNIX_EPOCH)
}

/// `later - earlier` in whole seconds, negative when `later` precedes `earlier`.
pub fn signed_secs_between(later: SystemTime, earlier: SystemTime) -> i64 {
    match later.duration_since(earlier) {
        Ok(duration) => duration.as_secs() as i64,
        Err(error) => -(error.duration().as_secs() as i64),
    }
}

pub fn format_time(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339_opts(SecondsFormat::Secs, true)
}

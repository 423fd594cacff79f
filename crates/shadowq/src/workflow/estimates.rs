use std::path::Path;
use std::time::Duration;

use shadowsim::RuntimeEstimates;

use crate::common::error::SqError;

/// Longest runtime estimate accepted from a table (one year).
const MAX_RUNTIME_ESTIMATE: Duration = Duration::from_secs(365 * 24 * 3600);

/// Parses a runtime estimate table: one `<job-name> <seconds>` pair per line.
/// Blank lines and lines starting with `#` are skipped.
pub fn parse_estimates(
    text: &str,
    path: &Path,
    default_estimate: Duration,
) -> crate::Result<RuntimeEstimates> {
    let mut estimates = RuntimeEstimates::new(default_estimate);
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let input_error = |reason: String| SqError::InputError {
            path: path.to_path_buf(),
            line: index + 1,
            reason,
        };
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [name, seconds] = fields.as_slice() else {
            return Err(input_error(format!(
                "expected `<job-name> <seconds>`, found {} field(s)",
                fields.len()
            )));
        };
        let estimate = seconds
            .parse::<f64>()
            .ok()
            .and_then(|seconds| Duration::try_from_secs_f64(seconds).ok())
            .ok_or_else(|| input_error(format!("invalid runtime estimate `{seconds}`")))?;
        if estimate > MAX_RUNTIME_ESTIMATE {
            return Err(input_error(format!(
                "runtime estimate `{seconds}` exceeds the maximum of {}",
                humantime::format_duration(MAX_RUNTIME_ESTIMATE)
            )));
        }
        estimates.insert(*name, estimate);
    }
    Ok(estimates)
}

pub fn load_estimates(path: &Path, default_estimate: Duration) -> crate::Result<RuntimeEstimates> {
    let text = std::fs::read_to_string(path)?;
    parse_estimates(&text, path, default_estimate)
}

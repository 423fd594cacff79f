pub mod parse;
pub mod reader;

pub use parse::{LogParseError, parse_log_line};
pub use reader::{EventLogReader, ReadOutcome};

use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::BytesMut;
use shadowsim::LogEvent;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::common::config::ReaderConfig;
use crate::event::parse::{LogParseError, parse_log_line};

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Result of a single non-blocking read attempt.
#[derive(Debug)]
pub enum ReadOutcome {
    Event(LogEvent),
    /// No complete line is available yet.
    WouldBlock,
    /// The completion sentinel was delivered before, the source is closed.
    Finished,
}

/// Tails an append-only job-state log and turns its lines into [`LogEvent`]s.
///
/// Only complete lines are parsed; a trailing partial line stays buffered until its terminator
/// is appended. Once the completion sentinel was returned, the file is closed and the reader
/// keeps reporting [`ReadOutcome::Finished`].
pub struct EventLogReader {
    path: PathBuf,
    file: Option<File>,
    buffer: BytesMut,
    line_number: u64,
    poll_interval: Duration,
    finished: bool,
}

impl EventLogReader {
    pub fn new(path: &Path, config: &ReaderConfig) -> Self {
        Self {
            path: path.to_path_buf(),
            file: None,
            buffer: BytesMut::with_capacity(READ_CHUNK_SIZE),
            line_number: 0,
            poll_interval: config.poll_interval,
            finished: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of lines consumed so far.
    pub fn line_number(&self) -> u64 {
        self.line_number
    }

    /// Returns the next event, waiting for new data if necessary.
    /// `None` is returned on the call after the completion sentinel was delivered.
    pub async fn next(&mut self) -> crate::Result<Option<LogEvent>> {
        loop {
            match self.try_next().await? {
                ReadOutcome::Event(event) => return Ok(Some(event)),
                ReadOutcome::Finished => return Ok(None),
                ReadOutcome::WouldBlock => tokio::time::sleep(self.poll_interval).await,
            }
        }
    }

    pub async fn try_next(&mut self) -> crate::Result<ReadOutcome> {
        if self.finished {
            return Ok(ReadOutcome::Finished);
        }
        loop {
            if let Some(event) = self.parse_buffered_line()? {
                if event.is_completion_sentinel() {
                    log::debug!(
                        "Completion sentinel found at line {}, closing {}",
                        self.line_number,
                        self.path.display()
                    );
                    self.finished = true;
                    self.file = None;
                    self.buffer.clear();
                }
                return Ok(ReadOutcome::Event(event));
            }
            if self.buffer.contains(&b'\n') {
                // Blank line
                continue;
            }
            if !self.fill_buffer().await? {
                return Ok(ReadOutcome::WouldBlock);
            }
        }
    }

    /// Parses the first complete buffered line, if there is one and it is not blank.
    fn parse_buffered_line(&mut self) -> crate::Result<Option<LogEvent>> {
        let Some(position) = self.buffer.iter().position(|b| *b == b'\n') else {
            return Ok(None);
        };
        let line = self.buffer.split_to(position + 1);
        self.line_number += 1;
        let content = std::str::from_utf8(&line).map_err(|e| {
            LogParseError::new(
                self.line_number,
                &String::from_utf8_lossy(&line),
                e.to_string(),
            )
        })?;
        let content = content.trim_end_matches(['\n', '\r']);
        parse_log_line(content)
            .map_err(|e| LogParseError::new(self.line_number, content, e.to_string()).into())
    }

    /// Appends newly written data to the buffer, returns `false` if there was none.
    async fn fill_buffer(&mut self) -> crate::Result<bool> {
        if self.file.is_none() {
            match File::open(&self.path).await {
                Ok(file) => {
                    log::debug!("Opened event log {}", self.path.display());
                    self.file = Some(file);
                }
                Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                    log::debug!("Event log {} does not exist yet", self.path.display());
                    return Ok(false);
                }
                Err(error) => return Err(error.into()),
            }
        }
        let Some(file) = self.file.as_mut() else {
            return Ok(false);
        };
        self.buffer.reserve(READ_CHUNK_SIZE);
        let read = file.read_buf(&mut self.buffer).await?;
        Ok(read > 0)
    }
}

//! Durable event log and console echo.
//!
//! Every line the scheduler emits goes through a [`Journal`], which appends a
//! category-tagged line to the log sink and, for operator-visible events,
//! prints a matching message on the console sink. The two wordings may
//! differ; both channels see every run-state change and every job
//! completion or requeue.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Local;

use crate::error::{Result, SchedError};

/// Tag prefixed to every log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    System,
    Scheduler,
    Receiver,
    Shell,
    Error,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::System => write!(f, "[SYSTEM]"),
            Category::Scheduler => write!(f, "[SCHEDULER]"),
            Category::Receiver => write!(f, "[RECEIVER]"),
            Category::Shell => write!(f, "[SHELL]"),
            Category::Error => write!(f, "[ERROR]"),
        }
    }
}

/// Destination for whole lines of text.
pub trait LineSink: Send + Sync {
    fn write_line(&self, line: &str) -> std::io::Result<()>;
}

/// Append-only log file, flushed after every line.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl FileSink {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| SchedError::resource_init(format!("log file {}", path.display()), e))?;
        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    /// Create `scheduler_log_<timestamp>.txt` inside `dir`.
    pub fn create_timestamped(dir: impl AsRef<Path>) -> Result<Self> {
        let name = format!("scheduler_log_{}.txt", Local::now().format("%Y%m%d_%H%M%S"));
        Self::create(dir.as_ref().join(name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LineSink for FileSink {
    fn write_line(&self, line: &str) -> std::io::Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| std::io::Error::other("log writer poisoned"))?;
        writeln!(writer, "{line}")?;
        writer.flush()
    }
}

/// Collects lines in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|line| line.contains(needle))
    }
}

impl LineSink for MemorySink {
    fn write_line(&self, line: &str) -> std::io::Result<()> {
        self.lines
            .lock()
            .map_err(|_| std::io::Error::other("memory sink poisoned"))?
            .push(line.to_string());
        Ok(())
    }
}

/// Interactive output on stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl LineSink for StdoutSink {
    fn write_line(&self, line: &str) -> std::io::Result<()> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "{line}")?;
        out.flush()
    }
}

/// Event log plus console echo, shared by all actors.
#[derive(Clone)]
pub struct Journal {
    log: Arc<dyn LineSink>,
    console: Arc<dyn LineSink>,
}

impl fmt::Debug for Journal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Journal").finish_non_exhaustive()
    }
}

impl Journal {
    pub fn new(log: Arc<dyn LineSink>, console: Arc<dyn LineSink>) -> Self {
        Self { log, console }
    }

    /// Append a line to the event log only.
    pub fn log(&self, category: Category, message: impl fmt::Display) {
        let line = format!("{category} {message}");
        if let Err(e) = self.log.write_line(&line) {
            tracing::warn!(error = %e, line = %line, "Failed to append to event log");
        }
    }

    /// Print a line on the console only.
    pub fn print(&self, message: impl fmt::Display) {
        let line = message.to_string();
        if let Err(e) = self.console.write_line(&line) {
            tracing::warn!(error = %e, "Failed to write console output");
        }
    }

    /// Record an event in both channels.
    pub fn announce(
        &self,
        category: Category,
        log_message: impl fmt::Display,
        console_message: impl fmt::Display,
    ) {
        self.log(category, log_message);
        self.print(console_message);
    }

    /// Report a recovered error in both channels.
    pub fn error(&self, category: Category, error: &SchedError) {
        tracing::warn!(category = %category, error = %error, "Recovered error");
        self.log(Category::Error, format_args!("{category} {error}"));
        self.print(format_args!("{category} {error}"));
    }
}

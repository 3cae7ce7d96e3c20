use std::fmt;

use crate::error::{Result, SchedError};

/// Record that marks the end of the arrival stream.
pub const SENTINEL_TOKEN: &str = "END";

/// A simulated process waiting for CPU time.
///
/// Jobs are values: a Round-Robin requeue pushes a fresh `Job` carrying the
/// reduced remaining time rather than mutating the one that was dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub process_id: String,
    /// Time units this job still needs.
    pub remaining_time: u64,
    /// Burst time the job arrived with.
    pub burst_time: u64,
}

impl Job {
    pub fn new(process_id: impl Into<String>, burst_time: u64) -> Self {
        Self {
            process_id: process_id.into(),
            remaining_time: burst_time,
            burst_time,
        }
    }

    /// The same job with `remaining_time` reduced by a completed slice.
    pub fn after_slice(&self, slice: u64) -> Self {
        Self {
            process_id: self.process_id.clone(),
            remaining_time: self.remaining_time.saturating_sub(slice),
            burst_time: self.burst_time,
        }
    }

    /// Re-check the invariants the parser establishes.
    pub fn validate(&self) -> Result<()> {
        if self.process_id.is_empty() {
            return Err(SchedError::malformed(self.to_string(), "empty process id"));
        }
        if self.process_id.chars().any(char::is_whitespace) {
            return Err(SchedError::malformed(
                self.to_string(),
                "process id contains whitespace",
            ));
        }
        if self.remaining_time > self.burst_time {
            return Err(SchedError::malformed(
                self.to_string(),
                "remaining time exceeds burst time",
            ));
        }
        Ok(())
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.process_id, self.remaining_time)
    }
}

/// An entry of the shared queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueItem {
    Job(Job),
    Sentinel,
}

impl QueueItem {
    pub fn is_sentinel(&self) -> bool {
        matches!(self, QueueItem::Sentinel)
    }
}

impl fmt::Display for QueueItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueItem::Job(job) => job.fmt(f),
            QueueItem::Sentinel => f.write_str(SENTINEL_TOKEN),
        }
    }
}

impl From<Job> for QueueItem {
    fn from(job: Job) -> Self {
        QueueItem::Job(job)
    }
}

/// Parse one arrival record: `"<process_id> <remaining_time>"` or `END`.
pub fn parse_record(record: &str) -> Result<QueueItem> {
    let trimmed = record.trim();
    if trimmed == SENTINEL_TOKEN {
        return Ok(QueueItem::Sentinel);
    }

    let fields: Vec<&str> = trimmed.split_whitespace().collect();
    let [process_id, burst] = fields.as_slice() else {
        return Err(SchedError::malformed(
            record,
            format!("expected 'pid burst', got {} fields", fields.len()),
        ));
    };

    if burst.starts_with('-') {
        return Err(SchedError::malformed(record, "negative burst time"));
    }
    let burst_time: u64 = burst
        .parse()
        .map_err(|e| SchedError::malformed(record, format!("burst time {burst:?}: {e}")))?;

    Ok(QueueItem::Job(Job::new(*process_id, burst_time)))
}

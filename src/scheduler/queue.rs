use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};

use crate::scheduler::job::{Job, QueueItem};

/// Point-in-time copy of the queue and the running slot, for display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueSnapshot {
    pub items: Vec<QueueItem>,
    pub running: Option<Job>,
}

impl QueueSnapshot {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl fmt::Display for QueueSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items: Vec<String> = self.items.iter().map(ToString::to_string).collect();
        writeln!(f, "Queue ({} tasks): [{}]", self.items.len(), items.join(", "))?;
        match &self.running {
            Some(job) => write!(
                f,
                "Currently running: {} : with burst time {}",
                job.process_id, job.remaining_time
            ),
            None => write!(f, "Currently running: None"),
        }
    }
}

#[derive(Debug, Default)]
struct QueueState {
    items: VecDeque<QueueItem>,
    running: Option<Job>,
}

impl QueueState {
    fn has_sentinel(&self) -> bool {
        self.items.iter().any(QueueItem::is_sentinel)
    }

    fn has_jobs(&self) -> bool {
        self.items.iter().any(|item| !item.is_sentinel())
    }
}

/// FIFO of pending jobs plus the running slot, shared by the receiver,
/// the scheduler loop and the console.
///
/// Every operation holds the lock only for the structural change; callers
/// never sleep while holding it.
#[derive(Debug, Default)]
pub struct SharedQueue {
    state: Mutex<QueueState>,
    pushed: Notify,
}

impl SharedQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item at the tail.
    ///
    /// Returns false when a sentinel is pushed while another one is
    /// already queued; the duplicate is dropped.
    pub async fn push_tail(&self, item: impl Into<QueueItem>) -> bool {
        let item = item.into();
        {
            let mut state = self.state.lock().await;
            if item.is_sentinel() && state.has_sentinel() {
                return false;
            }
            state.items.push_back(item);
        }
        self.pushed.notify_one();
        true
    }

    pub async fn pop_head(&self) -> Option<QueueItem> {
        self.state.lock().await.items.pop_front()
    }

    /// Put the sentinel back at the tail if any job is still waiting.
    ///
    /// Returns false when no job is queued, meaning the sentinel should be
    /// honored now. Check and push happen under one lock acquisition.
    pub async fn requeue_sentinel_if_jobs_pending(&self) -> bool {
        let mut state = self.state.lock().await;
        if !state.has_jobs() {
            return false;
        }
        if !state.has_sentinel() {
            state.items.push_back(QueueItem::Sentinel);
        }
        true
    }

    pub async fn set_running(&self, job: Option<Job>) {
        self.state.lock().await.running = job;
    }

    pub async fn running(&self) -> Option<Job> {
        self.state.lock().await.running.clone()
    }

    pub async fn snapshot(&self) -> QueueSnapshot {
        let state = self.state.lock().await;
        QueueSnapshot {
            items: state.items.iter().cloned().collect(),
            running: state.running.clone(),
        }
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.items.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.items.is_empty()
    }

    /// Wait until something is pushed or `timeout` elapses.
    pub async fn wait_for_push(&self, timeout: Duration) {
        let _ = tokio::time::timeout(timeout, self.pushed.notified()).await;
    }
}

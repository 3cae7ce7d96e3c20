//! Shared helpers for scheduler integration tests.
//!
//! Tests run with a short time unit so a burst of N units takes N * `UNIT`
//! of wall-clock time.

#![allow(dead_code)]

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use procsched::config::{Policy, SchedulerConfig};
use procsched::eventlog::{Journal, MemorySink};
use procsched::scheduler::{
    parse_record, RunControl, SchedulerLoop, SchedulerReport, SharedQueue,
};

/// Wall-clock length of one burst unit in tests.
pub const UNIT: Duration = Duration::from_millis(10);

pub fn test_config(policy: Policy) -> SchedulerConfig {
    SchedulerConfig::new(policy)
        .with_time_unit(UNIT)
        .with_idle_interval(Duration::from_millis(2))
}

/// Shared queue, run state and in-memory journal wired together.
pub struct Harness {
    pub queue: Arc<SharedQueue>,
    pub run: RunControl,
    pub journal: Journal,
    pub log: Arc<MemorySink>,
    pub console: Arc<MemorySink>,
}

impl Harness {
    pub fn new() -> Self {
        let log = Arc::new(MemorySink::new());
        let console = Arc::new(MemorySink::new());
        Self {
            queue: Arc::new(SharedQueue::new()),
            run: RunControl::new(),
            journal: Journal::new(log.clone(), console.clone()),
            log,
            console,
        }
    }

    /// Parse and enqueue arrival records, as the receiver would.
    pub async fn arrive(&self, records: &[&str]) {
        for record in records {
            let item = parse_record(record).expect("test record must be valid");
            self.queue.push_tail(item).await;
        }
    }

    pub fn scheduler(&self, config: SchedulerConfig) -> SchedulerLoop {
        SchedulerLoop::new(
            config,
            self.queue.clone(),
            self.run.clone(),
            self.journal.clone(),
        )
    }

    pub fn spawn_scheduler(&self, config: SchedulerConfig) -> JoinHandle<SchedulerReport> {
        tokio::spawn(self.scheduler(config).run())
    }

    pub fn log_lines(&self) -> Vec<String> {
        self.log.lines()
    }
}

/// Await a task that should finish within `limit`.
pub async fn finish_within<T>(limit: Duration, handle: JoinHandle<T>) -> T {
    tokio::time::timeout(limit, handle)
        .await
        .expect("task did not finish in time")
        .expect("task panicked")
}

/// Poll `condition` every millisecond until it holds or `limit` elapses.
pub async fn wait_until<F, Fut>(limit: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    condition().await
}

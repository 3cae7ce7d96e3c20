use std::sync::Arc;

use crate::config::{Policy, SchedulerConfig};
use crate::eventlog::{Category, Journal};
use crate::scheduler::job::{Job, QueueItem};
use crate::scheduler::queue::SharedQueue;
use crate::scheduler::state::{RunControl, RunState};

/// Something the scheduler loop did, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerEvent {
    Dispatched {
        process_id: String,
        remaining: u64,
        slice: u64,
    },
    Requeued {
        process_id: String,
        remaining: u64,
    },
    Completed {
        process_id: String,
        burst: u64,
    },
    /// END popped while jobs were still waiting; pushed back to the tail.
    SentinelDeferred,
    Discarded {
        reason: String,
    },
    Finished,
}

/// Trail of events produced by one run of the scheduler loop.
#[derive(Debug, Clone, Default)]
pub struct SchedulerReport {
    pub events: Vec<SchedulerEvent>,
}

impl SchedulerReport {
    /// Process ids in the order they completed.
    pub fn completion_order(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                SchedulerEvent::Completed { process_id, .. } => Some(process_id.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Slices granted to `process_id`, in dispatch order.
    pub fn slices_for(&self, process_id: &str) -> Vec<u64> {
        self.events
            .iter()
            .filter_map(|event| match event {
                SchedulerEvent::Dispatched {
                    process_id: id,
                    slice,
                    ..
                } if id == process_id => Some(*slice),
                _ => None,
            })
            .collect()
    }

    pub fn requeue_count(&self) -> usize {
        self.count(|e| matches!(e, SchedulerEvent::Requeued { .. }))
    }

    pub fn deferral_count(&self) -> usize {
        self.count(|e| matches!(e, SchedulerEvent::SentinelDeferred))
    }

    pub fn discard_count(&self) -> usize {
        self.count(|e| matches!(e, SchedulerEvent::Discarded { .. }))
    }

    fn count(&self, pred: impl Fn(&SchedulerEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

/// The single consumer of the shared queue.
///
/// Each iteration checks the run state, pops the head of the queue and
/// either handles END under the configured policy or dispatches a job.
/// Dispatch sleeps outside the queue lock, and a dispatch that has started
/// always runs to the end of its slice: pause and shutdown only take effect
/// before the next pick.
pub struct SchedulerLoop {
    config: SchedulerConfig,
    queue: Arc<SharedQueue>,
    run: RunControl,
    journal: Journal,
    report: SchedulerReport,
}

impl SchedulerLoop {
    pub fn new(
        config: SchedulerConfig,
        queue: Arc<SharedQueue>,
        run: RunControl,
        journal: Journal,
    ) -> Self {
        Self {
            config,
            queue,
            run,
            journal,
            report: SchedulerReport::default(),
        }
    }

    pub async fn run(mut self) -> SchedulerReport {
        tracing::info!(
            policy = %self.config.policy,
            quantum = self.config.quantum,
            "Scheduler loop started"
        );

        loop {
            match self.run.state() {
                RunState::ShuttingDown => break,
                RunState::Paused => {
                    tracing::debug!("Scheduler paused, waiting for resume");
                    self.run.wait_while_paused().await;
                    continue;
                }
                RunState::Running => {}
            }

            let Some(item) = self.queue.pop_head().await else {
                tokio::select! {
                    _ = self.queue.wait_for_push(self.config.idle_interval) => {}
                    _ = self.run.cancelled() => {}
                }
                continue;
            };

            match item {
                QueueItem::Sentinel => {
                    if self.handle_sentinel().await {
                        break;
                    }
                }
                QueueItem::Job(job) => self.dispatch(job).await,
            }
        }

        tracing::info!(
            completed = self.report.completion_order().len(),
            requeued = self.report.requeue_count(),
            "Scheduler loop stopped"
        );
        self.report.events.push(SchedulerEvent::Finished);
        self.report
    }

    /// Returns true when END should stop the loop.
    async fn handle_sentinel(&mut self) -> bool {
        if self.config.policy == Policy::RoundRobin
            && self.queue.requeue_sentinel_if_jobs_pending().await
        {
            tracing::debug!("END deferred behind queued jobs");
            self.report.events.push(SchedulerEvent::SentinelDeferred);
            return false;
        }

        self.journal.announce(
            Category::Scheduler,
            "Received END signal, shutting down...",
            "\n[SCHEDULER] Received END signal, shutting down...",
        );
        self.run.shutdown();
        true
    }

    fn slice_for(&self, job: &Job) -> u64 {
        match self.config.policy {
            Policy::Fcfs => job.remaining_time,
            // A zero quantum would requeue forever without progress.
            Policy::RoundRobin => self.config.quantum.max(1).min(job.remaining_time),
        }
    }

    async fn dispatch(&mut self, job: Job) {
        if let Err(e) = job.validate() {
            self.journal.error(Category::Scheduler, &e);
            self.report.events.push(SchedulerEvent::Discarded {
                reason: e.to_string(),
            });
            return;
        }

        let slice = self.slice_for(&job);
        self.queue.set_running(Some(job.clone())).await;
        self.journal.log(
            Category::Scheduler,
            format_args!(
                "Process {} started with remaining time: {}s",
                job.process_id, job.remaining_time
            ),
        );
        tracing::info!(
            process_id = %job.process_id,
            remaining = job.remaining_time,
            slice,
            "Dispatching job"
        );
        self.report.events.push(SchedulerEvent::Dispatched {
            process_id: job.process_id.clone(),
            remaining: job.remaining_time,
            slice,
        });

        tokio::time::sleep(self.config.units(slice)).await;

        let next = job.after_slice(slice);
        if next.remaining_time > 0 {
            self.journal.announce(
                Category::Scheduler,
                format_args!(
                    "Process {} exceeded time quantum ({}s) and will be requeued with remaining time: {}s",
                    next.process_id, slice, next.remaining_time
                ),
                format_args!(
                    "[SCHEDULER] Process {} requeued with {}s remaining",
                    next.process_id, next.remaining_time
                ),
            );
            self.report.events.push(SchedulerEvent::Requeued {
                process_id: next.process_id.clone(),
                remaining: next.remaining_time,
            });
            self.queue.push_tail(next).await;
        } else {
            self.journal.announce(
                Category::Scheduler,
                format_args!(
                    "Process {} completed in burst time: {}s",
                    job.process_id, job.burst_time
                ),
                format_args!(
                    "[SCHEDULER] Process {} completed ({}s)",
                    job.process_id, job.burst_time
                ),
            );
            tracing::info!(process_id = %job.process_id, burst = job.burst_time, "Job completed");
            self.report.events.push(SchedulerEvent::Completed {
                process_id: job.process_id,
                burst: job.burst_time,
            });
        }

        self.queue.set_running(None).await;
    }
}

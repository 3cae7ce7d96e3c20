use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

use crate::config::SchedulerConfig;
use crate::console::Console;
use crate::error::{Result, SchedError};
use crate::eventlog::{Category, Journal};
use crate::receiver::Receiver;
use crate::scheduler::{RunControl, SchedulerLoop, SchedulerReport, SharedQueue};

/// Open the arrival feed connection.
///
/// # Errors
///
/// Returns `ResourceInit` if the connection cannot be established.
pub async fn connect(addr: &str) -> Result<TcpStream> {
    TcpStream::connect(addr)
        .await
        .map_err(|e| SchedError::resource_init(format!("connection to {addr}"), e))
}

/// Join an actor task. A panic requests shutdown so the remaining actors
/// stop instead of running on without an owner.
async fn join_or_shutdown<T>(handle: JoinHandle<T>, run: &RunControl) -> Result<T> {
    handle.await.map_err(|e| {
        tracing::error!(error = %e, "Actor task failed");
        run.shutdown();
        SchedError::from(e)
    })
}

/// Shared scheduler context plus the three actors that run against it.
pub struct Session {
    config: SchedulerConfig,
    queue: Arc<SharedQueue>,
    run: RunControl,
    journal: Journal,
}

impl Session {
    pub fn new(config: SchedulerConfig, journal: Journal) -> Self {
        Self {
            config,
            queue: Arc::new(SharedQueue::new()),
            run: RunControl::new(),
            journal,
        }
    }

    pub fn queue(&self) -> Arc<SharedQueue> {
        self.queue.clone()
    }

    pub fn run_control(&self) -> RunControl {
        self.run.clone()
    }

    /// Run receiver, scheduler loop and console until shutdown.
    ///
    /// 1. Spawns the receiver on the read half of `connection`
    /// 2. Spawns the scheduler loop
    /// 3. Spawns the console on `console_input`
    /// 4. Waits for the scheduler loop and the console, then the receiver
    /// 5. Closes the connection
    ///
    /// Connection loss, END and `exit` are all normal endings.
    ///
    /// # Errors
    ///
    /// Returns an error only if one of the tasks panicked.
    pub async fn run<S, C>(self, connection: S, console_input: C) -> Result<SchedulerReport>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
        C: AsyncBufRead + Unpin + Send + 'static,
    {
        let (read_half, mut write_half) = tokio::io::split(connection);

        let receiver = Receiver::new(self.queue.clone(), self.run.clone(), self.journal.clone());
        let receiver_handle = tokio::spawn(async move { receiver.run(read_half).await });

        let scheduler = SchedulerLoop::new(
            self.config.clone(),
            self.queue.clone(),
            self.run.clone(),
            self.journal.clone(),
        );
        let scheduler_handle = tokio::spawn(scheduler.run());

        let console = Console::new(self.queue.clone(), self.run.clone(), self.journal.clone());
        let console_handle = tokio::spawn(async move { console.run(console_input).await });

        let report = join_or_shutdown(scheduler_handle, &self.run).await?;

        if let Err(e) = join_or_shutdown(console_handle, &self.run).await? {
            tracing::warn!(error = %e, "Console stopped with error");
        }
        match join_or_shutdown(receiver_handle, &self.run).await? {
            Ok(()) => {}
            Err(SchedError::ConnectionLost(reason)) => {
                tracing::info!(reason = %reason, "Receiver stopped on connection loss");
            }
            Err(e) => tracing::warn!(error = %e, "Receiver stopped with error"),
        }

        if let Err(e) = write_half.shutdown().await {
            tracing::debug!(error = %e, "Connection already closed");
        }

        self.journal.log(
            Category::System,
            format_args!(
                "Summary: {} completed, {} requeued, {} discarded",
                report.completion_order().len(),
                report.requeue_count(),
                report.discard_count()
            ),
        );
        self.journal
            .log(Category::System, "Scheduler shutdown complete");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::RunState;

    #[tokio::test]
    async fn panicked_actor_requests_shutdown() {
        let run = RunControl::new();
        let handle: JoinHandle<()> = tokio::spawn(async { panic!("actor crashed") });

        let result = join_or_shutdown(handle, &run).await;

        assert!(matches!(result, Err(SchedError::TaskFailed(_))));
        assert_eq!(run.state(), RunState::ShuttingDown);
    }

    #[tokio::test]
    async fn finished_actor_leaves_state_alone() {
        let run = RunControl::new();
        let handle = tokio::spawn(async { 7 });

        assert_eq!(join_or_shutdown(handle, &run).await.unwrap(), 7);
        assert_eq!(run.state(), RunState::Running);
    }
}

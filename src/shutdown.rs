use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinHandle;

use crate::eventlog::{Category, Journal};
use crate::scheduler::RunControl;

/// Install a handler that moves the run state to shutting down on SIGTERM or SIGINT.
///
/// The handler task ends on its own once shutdown is reached by any other path.
pub fn install_shutdown_handler(
    run: RunControl,
    journal: Journal,
) -> std::io::Result<JoinHandle<()>> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    Ok(tokio::spawn(async move {
        let name = tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
            _ = run.cancelled() => return,
        };

        tracing::info!(signal = name, "Received signal, initiating shutdown");
        journal.announce(
            Category::System,
            format_args!("Received {name}, shutting down"),
            format_args!("\nReceived {name}, shutting down..."),
        );
        run.shutdown();
    }))
}

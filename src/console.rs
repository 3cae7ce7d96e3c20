use std::ops::ControlFlow;
use std::str::FromStr;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::error::{Result, SchedError};
use crate::eventlog::{Category, Journal};
use crate::scheduler::{RunControl, SharedQueue, Transition};

pub const BANNER: &str = "Commands: 'list' (show queue), 'pause', 'continue', 'exit' (quit)";

/// Operator command, one per input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    List,
    Pause,
    Continue,
    Exit,
    /// Blank line.
    Empty,
}

impl FromStr for Command {
    type Err = SchedError;

    fn from_str(line: &str) -> Result<Self> {
        match line.trim() {
            "" => Ok(Command::Empty),
            "list" => Ok(Command::List),
            "pause" => Ok(Command::Pause),
            "continue" => Ok(Command::Continue),
            "exit" => Ok(Command::Exit),
            other => Err(SchedError::UnknownCommand(other.to_string())),
        }
    }
}

/// Line-oriented operator console.
pub struct Console {
    queue: Arc<SharedQueue>,
    run: RunControl,
    journal: Journal,
}

impl Console {
    pub fn new(queue: Arc<SharedQueue>, run: RunControl, journal: Journal) -> Self {
        Self {
            queue,
            run,
            journal,
        }
    }

    /// Read commands until `exit`, end of input, or shutdown from elsewhere.
    pub async fn run<R>(self, input: R) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        self.journal.print(format_args!("\n{BANNER}"));
        let mut lines = input.lines();

        loop {
            let line = tokio::select! {
                biased;

                _ = self.run.cancelled() => return Ok(()),
                line = lines.next_line() => match line {
                    Ok(line) => line,
                    Err(e) => {
                        self.exit();
                        return Err(e.into());
                    }
                },
            };

            let Some(line) = line else {
                tracing::debug!("Console input closed");
                self.exit();
                return Ok(());
            };

            if self.execute(&line).await.is_break() {
                return Ok(());
            }
        }
    }

    /// Apply one command line. Breaks after `exit`.
    pub async fn execute(&self, line: &str) -> ControlFlow<()> {
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                self.journal.error(Category::Shell, &e);
                return ControlFlow::Continue(());
            }
        };

        match command {
            Command::Empty => {}
            Command::List => {
                let snapshot = self.queue.snapshot().await;
                self.journal.print(format_args!("\n{snapshot}"));
            }
            Command::Pause => match self.run.pause() {
                Transition::Changed => self.journal.announce(
                    Category::Shell,
                    "Scheduler paused by user.",
                    "Scheduler PAUSED",
                ),
                Transition::Unchanged => self.journal.print("Scheduler is already paused"),
                Transition::Rejected => self.journal.print("Scheduler is shutting down"),
            },
            Command::Continue => match self.run.resume() {
                Transition::Changed => self.journal.announce(
                    Category::Shell,
                    "Scheduler resumed by user.",
                    "Scheduler RESUMED",
                ),
                Transition::Unchanged => self.journal.print("Scheduler is already running"),
                Transition::Rejected => self.journal.print("Scheduler is shutting down"),
            },
            Command::Exit => {
                self.exit();
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn exit(&self) {
        if self.run.shutdown() == Transition::Changed {
            self.journal.announce(
                Category::Shell,
                "Shutdown initiated by user.",
                "Shutting down...",
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!("list".parse::<Command>().unwrap(), Command::List);
        assert_eq!("pause".parse::<Command>().unwrap(), Command::Pause);
        assert_eq!("continue".parse::<Command>().unwrap(), Command::Continue);
        assert_eq!("exit".parse::<Command>().unwrap(), Command::Exit);
        assert_eq!(" exit \r".parse::<Command>().unwrap(), Command::Exit);
        assert_eq!("".parse::<Command>().unwrap(), Command::Empty);
        assert_eq!("   ".parse::<Command>().unwrap(), Command::Empty);
    }

    #[test]
    fn unknown_command() {
        match "top".parse::<Command>() {
            Err(SchedError::UnknownCommand(cmd)) => assert_eq!(cmd, "top"),
            other => panic!("expected UnknownCommand, got {other:?}"),
        }
        assert!("LIST".parse::<Command>().is_err());
    }
}

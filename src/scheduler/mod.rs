pub mod job;
pub mod queue;
pub mod runner;
pub mod state;

pub use job::{parse_record, Job, QueueItem, SENTINEL_TOKEN};
pub use queue::{QueueSnapshot, SharedQueue};
pub use runner::{SchedulerEvent, SchedulerLoop, SchedulerReport};
pub use state::{RunControl, RunState, Transition};

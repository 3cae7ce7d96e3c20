use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Default Round-Robin time slice, in time units.
pub const DEFAULT_QUANTUM: u64 = 2;

/// Scheduling policy applied by the dispatch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Policy {
    /// First-Come-First-Served: every job runs its full burst, END stops immediately.
    #[default]
    Fcfs,
    /// Round-Robin: jobs run at most one quantum per dispatch, END is deferred
    /// until no jobs remain queued.
    RoundRobin,
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Policy::Fcfs => write!(f, "fcfs"),
            Policy::RoundRobin => write!(f, "rr"),
        }
    }
}

/// Timing and policy settings for the scheduler loop.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub policy: Policy,
    /// Round-Robin quantum in time units. Ignored under FCFS.
    pub quantum: u64,
    /// Wall-clock length of one unit of burst time (one second in production).
    pub time_unit: Duration,
    /// How long the loop waits before re-checking an empty queue.
    pub idle_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            policy: Policy::Fcfs,
            quantum: DEFAULT_QUANTUM,
            time_unit: Duration::from_secs(1),
            idle_interval: Duration::from_millis(100),
        }
    }
}

impl SchedulerConfig {
    pub fn new(policy: Policy) -> Self {
        Self {
            policy,
            ..Default::default()
        }
    }

    pub fn with_quantum(mut self, quantum: u64) -> Self {
        self.quantum = quantum;
        self
    }

    pub fn with_time_unit(mut self, time_unit: Duration) -> Self {
        self.time_unit = time_unit;
        self
    }

    pub fn with_idle_interval(mut self, idle_interval: Duration) -> Self {
        self.idle_interval = idle_interval;
        self
    }

    /// Wall-clock duration of `units` of burst time.
    pub fn units(&self, units: u64) -> Duration {
        self.time_unit
            .checked_mul(u32::try_from(units).unwrap_or(u32::MAX))
            .unwrap_or(Duration::MAX)
    }
}

/// Settings for the scheduler client process.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Arrival feed address, host:port format.
    pub server_addr: String,
    /// Directory the event log file is created in.
    pub log_dir: PathBuf,
    pub scheduler: SchedulerConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:12345".to_string(),
            log_dir: PathBuf::from("."),
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn new(server_addr: impl Into<String>, scheduler: SchedulerConfig) -> Self {
        Self {
            server_addr: server_addr.into(),
            scheduler,
            ..Default::default()
        }
    }

    pub fn with_log_dir(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.log_dir = log_dir.into();
        self
    }
}

/// Settings for the stub arrival feeder.
#[derive(Debug, Clone)]
pub struct FeederConfig {
    pub listen_addr: SocketAddr,
    /// Records sent to every client, in order, before END.
    pub arrivals: Vec<String>,
    pub arrival_interval: Duration,
    /// Extra delay between the last arrival and END.
    pub end_delay: Duration,
}

impl Default for FeederConfig {
    fn default() -> Self {
        Self {
            // SAFETY: This is a hardcoded valid address that will always parse
            listen_addr: "127.0.0.1:12345"
                .parse()
                .expect("default listen address is valid"),
            arrivals: ["P1 3", "P2 5", "P3 2", "P4 4", "P5 1"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            arrival_interval: Duration::from_secs(1),
            end_delay: Duration::from_secs(1),
        }
    }
}

impl FeederConfig {
    pub fn new(listen_addr: SocketAddr) -> Self {
        Self {
            listen_addr,
            ..Default::default()
        }
    }

    pub fn with_arrivals<I, S>(mut self, arrivals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arrivals = arrivals.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timing(mut self, arrival_interval: Duration, end_delay: Duration) -> Self {
        self.arrival_interval = arrival_interval;
        self.end_delay = end_delay;
        self
    }
}

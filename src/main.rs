use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use procsched::config::{ClientConfig, FeederConfig, Policy, SchedulerConfig, DEFAULT_QUANTUM};
use procsched::error::Result;
use procsched::eventlog::{Category, FileSink, Journal, StdoutSink};
use procsched::feeder::Feeder;
use procsched::session::{self, Session};
use procsched::shutdown::install_shutdown_handler;

#[derive(Parser, Debug)]
#[command(name = "procsched")]
#[command(version)]
#[command(about = "FCFS / Round-Robin process scheduling simulator fed over TCP")]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Connect to an arrival feed and run the scheduler with an operator console
    Run(RunArgs),

    /// Serve a fixed list of arrivals to every client that connects
    Serve(ServeArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyArg {
    /// First-Come-First-Served
    Fcfs,
    /// Round-Robin with a fixed quantum
    Rr,
}

impl From<PolicyArg> for Policy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Fcfs => Policy::Fcfs,
            PolicyArg::Rr => Policy::RoundRobin,
        }
    }
}

// =============================================================================
// Run Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct RunArgs {
    /// Scheduling policy
    #[arg(long, value_enum, default_value = "fcfs")]
    policy: PolicyArg,

    /// Arrival feed address (host:port)
    #[arg(long, short = 'a', default_value = "127.0.0.1:12345")]
    addr: String,

    /// Round-Robin quantum in time units
    #[arg(long, default_value_t = DEFAULT_QUANTUM)]
    quantum: u64,

    /// Length of one time unit in milliseconds
    #[arg(long, default_value = "1000")]
    time_unit_ms: u64,

    /// Idle wait on an empty queue in milliseconds
    #[arg(long, default_value = "100")]
    idle_ms: u64,

    /// Directory for the event log file
    #[arg(long, default_value = ".")]
    log_dir: PathBuf,
}

// =============================================================================
// Serve Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct ServeArgs {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:12345")]
    listen: SocketAddr,

    /// Arrival records sent before END (comma-separated, format: "pid burst")
    #[arg(long, value_delimiter = ',', default_value = "P1 3,P2 5,P3 2,P4 4,P5 1")]
    arrivals: Vec<String>,

    /// Pause between arrivals in milliseconds
    #[arg(long, default_value = "1000")]
    interval_ms: u64,

    /// Extra pause before END in milliseconds
    #[arg(long, default_value = "1000")]
    end_delay_ms: u64,
}

async fn run_client(args: RunArgs) -> Result<()> {
    let scheduler = SchedulerConfig::new(args.policy.into())
        .with_quantum(args.quantum)
        .with_time_unit(Duration::from_millis(args.time_unit_ms))
        .with_idle_interval(Duration::from_millis(args.idle_ms));
    let config = ClientConfig::new(args.addr, scheduler).with_log_dir(args.log_dir);

    let log = FileSink::create_timestamped(&config.log_dir)?;
    let log_path = log.path().display().to_string();
    let journal = Journal::new(Arc::new(log), Arc::new(StdoutSink));
    journal.announce(
        Category::System,
        format_args!("Scheduler started - Log file: {log_path}"),
        format_args!("Logging to: {log_path}"),
    );

    let stream = match session::connect(&config.server_addr).await {
        Ok(stream) => stream,
        Err(e) => {
            journal.announce(Category::System, &e, &e);
            return Err(e);
        }
    };
    journal.announce(
        Category::System,
        format_args!("Connected to server at {}", config.server_addr),
        "Connected to the server",
    );
    tracing::info!(
        addr = %config.server_addr,
        policy = %config.scheduler.policy,
        "Scheduler session starting"
    );

    let session = Session::new(config.scheduler, journal.clone());
    let signals = install_shutdown_handler(session.run_control(), journal.clone())?;

    let console_input = BufReader::new(tokio::io::stdin());
    session.run(stream, console_input).await?;
    signals.abort();

    journal.print(format_args!("\nLog saved to: {log_path}"));
    Ok(())
}

async fn run_feeder(args: ServeArgs) -> Result<()> {
    let config = FeederConfig::new(args.listen)
        .with_arrivals(args.arrivals.iter().map(|a| a.trim().to_string()))
        .with_timing(
            Duration::from_millis(args.interval_ms),
            Duration::from_millis(args.end_delay_ms),
        );
    let feeder = Feeder::bind(config).await?;

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received SIGINT, stopping feeder");
        }
        signal_token.cancel();
    });

    feeder.run(shutdown).await
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(async {
        match args.command {
            Commands::Run(run_args) => run_client(run_args).await,
            Commands::Serve(serve_args) => run_feeder(serve_args).await,
        }
    });

    // A stdin read may still be parked on a blocking thread.
    runtime.shutdown_background();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

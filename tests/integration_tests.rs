//! End-to-end runs of a full session: receiver, scheduler loop and console
//! against one shared context, fed over an in-memory pipe or a real TCP
//! connection to the stub feeder.

mod test_harness;

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;

use procsched::config::{FeederConfig, Policy};
use procsched::error::SchedError;
use procsched::eventlog::{FileSink, Journal, MemorySink};
use procsched::feeder::Feeder;
use procsched::scheduler::RunState;
use procsched::session::{self, Session};
use test_harness::{test_config, UNIT};

const LIMIT: Duration = Duration::from_secs(10);

fn memory_journal() -> (Journal, Arc<MemorySink>, Arc<MemorySink>) {
    let log = Arc::new(MemorySink::new());
    let console = Arc::new(MemorySink::new());
    (Journal::new(log.clone(), console.clone()), log, console)
}

#[tokio::test]
async fn test_fcfs_session_over_pipe() {
    let (journal, log, _console) = memory_journal();
    let session = Session::new(test_config(Policy::Fcfs), journal);
    let run = session.run_control();

    let (mut feed, conn) = tokio::io::duplex(1024);
    let (_operator, console_input) = tokio::io::duplex(64);

    feed.write_all(b"P1 2\nP2 1\nbad record here\nEND\n").await.unwrap();

    let report = tokio::time::timeout(
        LIMIT,
        session.run(conn, BufReader::new(console_input)),
    )
    .await
    .expect("session did not finish")
    .unwrap();

    assert_eq!(report.completion_order(), vec!["P1", "P2"]);
    assert_eq!(run.state(), RunState::ShuttingDown);

    let lines = log.lines();
    assert!(lines.iter().any(|l| l.starts_with("[ERROR] [RECEIVER]")));
    assert_eq!(lines.last().map(String::as_str), Some("[SYSTEM] Scheduler shutdown complete"));
    assert!(lines.contains(&"[SYSTEM] Summary: 2 completed, 0 requeued, 0 discarded".to_string()));
}

#[tokio::test]
async fn test_round_robin_session_drains_before_end() {
    let (journal, log, _console) = memory_journal();
    let session = Session::new(test_config(Policy::RoundRobin), journal);

    let (mut feed, conn) = tokio::io::duplex(1024);
    let (_operator, console_input) = tokio::io::duplex(64);

    feed.write_all(b"P1 5\nP2 3\nEND\n").await.unwrap();

    let report = tokio::time::timeout(
        LIMIT,
        session.run(conn, BufReader::new(console_input)),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(report.completion_order(), vec!["P2", "P1"]);
    assert!(log
        .lines()
        .contains(&"[SYSTEM] Summary: 2 completed, 3 requeued, 0 discarded".to_string()));
}

#[tokio::test]
async fn test_console_exit_ends_session() {
    let (journal, log, _console) = memory_journal();
    let session = Session::new(test_config(Policy::Fcfs), journal);

    let (_feed, conn) = tokio::io::duplex(1024);
    let (mut operator, console_input) = tokio::io::duplex(64);

    let handle = tokio::spawn(session.run(conn, BufReader::new(console_input)));
    tokio::time::sleep(UNIT).await;
    operator.write_all(b"list\nexit\n").await.unwrap();

    let report = tokio::time::timeout(LIMIT, handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(report.completion_order().is_empty());
    assert!(log
        .lines()
        .contains(&"[SHELL] Shutdown initiated by user.".to_string()));
}

#[tokio::test]
async fn test_connection_loss_ends_session() {
    let (journal, log, _console) = memory_journal();
    let session = Session::new(test_config(Policy::RoundRobin), journal);

    let (feed, conn) = tokio::io::duplex(1024);
    let (_operator, console_input) = tokio::io::duplex(64);
    drop(feed);

    let report = tokio::time::timeout(
        LIMIT,
        session.run(conn, BufReader::new(console_input)),
    )
    .await
    .unwrap()
    .unwrap();

    assert!(report.completion_order().is_empty());
    assert!(log
        .lines()
        .contains(&"[RECEIVER] Server closed the connection".to_string()));
}

#[tokio::test]
async fn test_session_against_feeder_over_tcp() {
    let config = FeederConfig::new("127.0.0.1:0".parse().unwrap())
        .with_arrivals(["P1 1", "P2 3", "P3 1"])
        .with_timing(Duration::from_millis(2), Duration::from_millis(2));
    let feeder = Feeder::bind(config).await.unwrap();
    let addr = feeder.local_addr().unwrap();

    let stop = CancellationToken::new();
    let feeder_handle = tokio::spawn(feeder.run(stop.clone()));

    let dir = tempfile::tempdir().unwrap();
    let file = FileSink::create_timestamped(dir.path()).unwrap();
    let path = file.path().to_path_buf();
    let journal = Journal::new(Arc::new(file), Arc::new(MemorySink::new()));

    let stream = session::connect(&addr.to_string()).await.unwrap();
    let session = Session::new(test_config(Policy::RoundRobin), journal);
    let (_operator, console_input) = tokio::io::duplex(64);

    let report = tokio::time::timeout(
        LIMIT,
        session.run(stream, BufReader::new(console_input)),
    )
    .await
    .unwrap()
    .unwrap();

    let mut completed = report.completion_order();
    completed.sort_unstable();
    assert_eq!(completed, vec!["P1", "P2", "P3"]);
    assert_eq!(report.slices_for("P2").iter().sum::<u64>(), 3);

    let contents = std::fs::read_to_string(path).unwrap();
    assert!(contents.contains("[RECEIVER] Received process info: PID=P2, Burst Time=3s"));
    assert!(contents.contains("[RECEIVER] Received END message"));
    assert!(contents.contains("[SCHEDULER] Received END signal, shutting down..."));
    assert!(contents.ends_with("[SYSTEM] Scheduler shutdown complete\n"));

    stop.cancel();
    tokio::time::timeout(LIMIT, feeder_handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_connect_failure_is_resource_init() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = session::connect(&addr.to_string()).await.unwrap_err();
    assert!(matches!(err, SchedError::ResourceInit { .. }));
}

//! Stub arrival feed for local runs.
//!
//! Every client that connects receives the configured arrival records, one
//! per line with a pause between them, then `END`. The connection is held
//! open until the client disconnects.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use crate::config::FeederConfig;
use crate::error::{Result, SchedError};
use crate::scheduler::SENTINEL_TOKEN;

pub struct Feeder {
    listener: TcpListener,
    arrivals: Arc<Vec<String>>,
    arrival_interval: Duration,
    end_delay: Duration,
}

impl Feeder {
    /// # Errors
    ///
    /// Returns `ResourceInit` if the listen address cannot be bound.
    pub async fn bind(config: FeederConfig) -> Result<Self> {
        let listener = TcpListener::bind(config.listen_addr).await.map_err(|e| {
            SchedError::resource_init(format!("listener on {}", config.listen_addr), e)
        })?;
        Ok(Self {
            listener,
            arrivals: Arc::new(config.arrivals),
            arrival_interval: config.arrival_interval,
            end_delay: config.end_delay,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept clients until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        tracing::info!(addr = %self.local_addr()?, "Feeder listening");

        loop {
            let (stream, peer) = tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = self.listener.accept() => accepted?,
            };

            tracing::info!(peer = %peer, "Client connected");
            let arrivals = self.arrivals.clone();
            let interval = self.arrival_interval;
            let end_delay = self.end_delay;
            let client_shutdown = shutdown.clone();
            tokio::spawn(async move {
                let result = tokio::select! {
                    r = serve_client(stream, &arrivals, interval, end_delay) => r,
                    _ = client_shutdown.cancelled() => Ok(()),
                };
                match result {
                    Ok(()) => tracing::info!(peer = %peer, "Client disconnected"),
                    Err(e) => tracing::warn!(peer = %peer, error = %e, "Client error"),
                }
            });
        }

        tracing::info!("Feeder stopped");
        Ok(())
    }
}

async fn serve_client(
    mut stream: TcpStream,
    arrivals: &[String],
    interval: Duration,
    end_delay: Duration,
) -> std::io::Result<()> {
    for record in arrivals {
        tracing::info!(record = %record, "Sending arrival");
        stream.write_all(format!("{record}\n").as_bytes()).await?;
        tokio::time::sleep(interval).await;
    }

    tokio::time::sleep(end_delay).await;
    tracing::info!("Sending END");
    stream
        .write_all(format!("{SENTINEL_TOKEN}\n").as_bytes())
        .await?;

    // Hold the connection until the client goes away.
    let mut buf = [0u8; 1024];
    while stream.read(&mut buf).await? > 0 {}
    Ok(())
}

use std::io::ErrorKind;
use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::AsyncRead;
use tokio_stream::StreamExt;
use tokio_util::codec::{Decoder, FramedRead, LinesCodec, LinesCodecError};

use crate::error::{Result, SchedError};
use crate::eventlog::{Category, Journal};
use crate::scheduler::{parse_record, QueueItem, RunControl, SharedQueue};

/// Longest arrival record accepted on the wire, in bytes.
pub const MAX_RECORD_LEN: usize = 1024;

/// Newline framing for arrival records.
///
/// Wraps [`LinesCodec`] so that a line which is too long or not UTF-8 comes
/// out as a rejected item instead of a stream error. The stream itself only
/// fails on a read error.
#[derive(Debug)]
pub struct RecordCodec {
    lines: LinesCodec,
}

impl Default for RecordCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordCodec {
    pub fn new() -> Self {
        Self {
            lines: LinesCodec::new_with_max_length(MAX_RECORD_LEN),
        }
    }

    fn screen(
        decoded: std::result::Result<Option<String>, LinesCodecError>,
    ) -> Result<Option<Result<String>>> {
        match decoded {
            Ok(line) => Ok(line.map(Ok)),
            // The codec drops the rest of the line up to the next newline.
            Err(LinesCodecError::MaxLineLengthExceeded) => Ok(Some(Err(SchedError::malformed(
                "<oversized record>",
                format!("record exceeds {MAX_RECORD_LEN} bytes"),
            )))),
            Err(LinesCodecError::Io(e)) if e.kind() == ErrorKind::InvalidData => Ok(Some(Err(
                SchedError::malformed("<undecodable record>", "record is not valid UTF-8"),
            ))),
            Err(LinesCodecError::Io(e)) => Err(e.into()),
        }
    }
}

impl Decoder for RecordCodec {
    type Item = Result<String>;
    type Error = SchedError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        Self::screen(self.lines.decode(src))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        Self::screen(self.lines.decode_eof(src))
    }
}

/// Ingests newline-delimited arrival records from the feed connection.
///
/// Records are framed with a line codec, so several records arriving in one
/// read are pushed one by one in order, and a record split across reads is
/// reassembled first. Malformed records, including oversized or non-UTF-8
/// lines, are reported and dropped. Forwarding
/// END does not stop the receiver; it keeps reading until shutdown is
/// requested or the connection goes away.
pub struct Receiver {
    queue: Arc<SharedQueue>,
    run: RunControl,
    journal: Journal,
}

impl Receiver {
    pub fn new(queue: Arc<SharedQueue>, run: RunControl, journal: Journal) -> Self {
        Self {
            queue,
            run,
            journal,
        }
    }

    /// Read until shutdown or connection loss.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionLost` when the peer closes the stream or the read
    /// fails. Shutdown has already been requested by then.
    pub async fn run<R>(self, reader: R) -> Result<()>
    where
        R: AsyncRead + Unpin,
    {
        let mut records = FramedRead::new(reader, RecordCodec::new());

        loop {
            tokio::select! {
                biased;

                _ = self.run.cancelled() => {
                    tracing::debug!("Receiver stopping on shutdown");
                    return Ok(());
                }
                next = records.next() => match next {
                    Some(Ok(Ok(record))) => self.ingest(&record).await,
                    Some(Ok(Err(rejected))) => self.journal.error(Category::Receiver, &rejected),
                    Some(Err(e)) => {
                        return Err(self.connection_lost(format!("Connection error: {e}")));
                    }
                    None => {
                        return Err(self.connection_lost("Server closed the connection".to_string()));
                    }
                },
            }
        }
    }

    async fn ingest(&self, record: &str) {
        if record.trim().is_empty() {
            return;
        }

        match parse_record(record) {
            Ok(QueueItem::Sentinel) => {
                if self.queue.push_tail(QueueItem::Sentinel).await {
                    self.journal.announce(
                        Category::Receiver,
                        "Received END message",
                        "\n[RECEIVER] Received END message",
                    );
                } else {
                    tracing::debug!("Duplicate END ignored");
                    self.journal
                        .log(Category::Receiver, "Ignored duplicate END message");
                }
            }
            Ok(QueueItem::Job(job)) => {
                self.journal.log(
                    Category::Receiver,
                    format_args!(
                        "Received process info: PID={}, Burst Time={}s",
                        job.process_id, job.burst_time
                    ),
                );
                tracing::debug!(process_id = %job.process_id, burst = job.burst_time, "Job queued");
                self.queue.push_tail(job).await;
            }
            Err(e) => self.journal.error(Category::Receiver, &e),
        }
    }

    fn connection_lost(&self, reason: String) -> SchedError {
        self.journal.announce(
            Category::Receiver,
            &reason,
            format_args!("\n[RECEIVER] {reason}."),
        );
        self.run.shutdown();
        SchedError::ConnectionLost(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(input: &[u8]) -> Vec<Result<String>> {
        let mut codec = RecordCodec::new();
        let mut buf = BytesMut::from(input);
        let mut out = Vec::new();
        while let Some(item) = codec.decode_eof(&mut buf).unwrap() {
            out.push(item);
        }
        out
    }

    #[test]
    fn oversized_line_is_rejected_and_skipped() {
        let mut input = b"P1 1\n".to_vec();
        input.extend(std::iter::repeat(b'x').take(MAX_RECORD_LEN + 10));
        input.extend_from_slice(b"\nP2 1\n");

        let items = decode_all(&input);
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].as_deref().unwrap(), "P1 1");
        assert!(matches!(items[1], Err(SchedError::MalformedRecord { .. })));
        assert_eq!(items[2].as_deref().unwrap(), "P2 1");
    }

    #[test]
    fn non_utf8_line_is_rejected_and_skipped() {
        let items = decode_all(b"P1 1\n\xff\xfe 1\nP2 1\n");
        assert_eq!(items.len(), 3);
        assert!(matches!(items[1], Err(SchedError::MalformedRecord { .. })));
        assert_eq!(items[2].as_deref().unwrap(), "P2 1");
    }

    #[test]
    fn unterminated_tail_is_returned_at_eof() {
        let items = decode_all(b"P1 1\nP2 4");
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].as_deref().unwrap(), "P2 4");
    }
}

//! The collection connection manager: a reconnecting, batching delivery
//! client for collection packets.
//!
//! A [`RemoteCollector`] handle feeds packets over an unbounded channel to
//! a background task that owns the TCP connection, the pending FIFO queue,
//! the flush-debounce timer, and the reconnect-backoff timer. Because the
//! task is the only mutator of the queue and the socket, `collect` stays
//! lock-free, non-blocking, and infallible from the caller's side.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use spanwire_protocol::{encode_frame, Annotation, CollectionPacket, SpanId};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Sink for span annotations: the sole ingestion entry point for
/// instrumentation code.
///
/// `collect` never blocks and never fails; delivery is asynchronous,
/// at-most-once, and best-effort.
pub trait Collector: Send + Sync {
    fn collect(&self, span_id: SpanId, annotations: Vec<Annotation>);
}

impl<C: Collector + ?Sized> Collector for Arc<C> {
    fn collect(&self, span_id: SpanId, annotations: Vec<Annotation>) {
        (**self).collect(span_id, annotations)
    }
}

/// Tuning knobs for the delivery client.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// How long a newly queued packet may wait for siblings before the
    /// pending batch is flushed. Coalesces bursts into one write.
    ///
    /// Default: 500ms
    pub flush_delay: Duration,
    /// Delay before the first reconnect attempt after a failure.
    ///
    /// Default: 100ms
    pub min_backoff: Duration,
    /// Cap on the reconnect delay.
    ///
    /// Default: 10s
    pub max_backoff: Duration,
    /// Growth factor between consecutive failed connection attempts.
    ///
    /// Default: 2.0
    pub backoff_multiplier: f64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            flush_delay: Duration::from_millis(500),
            min_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
            backoff_multiplier: 2.0,
        }
    }
}

impl CollectorConfig {
    /// Sets the flush debounce delay.
    pub fn with_flush_delay(mut self, delay: Duration) -> Self {
        self.flush_delay = delay;
        self
    }

    /// Sets the reconnect backoff schedule.
    pub fn with_backoff(mut self, min: Duration, max: Duration, multiplier: f64) -> Self {
        self.min_backoff = min;
        self.max_backoff = max;
        self.backoff_multiplier = multiplier;
        self
    }
}

/// Reconnect delay policy: grows geometrically between consecutive
/// failures, capped, and reset to the minimum on success.
#[derive(Debug)]
struct Backoff {
    next: Duration,
    min: Duration,
    max: Duration,
    multiplier: f64,
}

impl Backoff {
    fn new(config: &CollectorConfig) -> Self {
        Self {
            next: config.min_backoff,
            min: config.min_backoff,
            max: config.max_backoff,
            multiplier: config.backoff_multiplier,
        }
    }

    /// Delay to wait before the next attempt; advances the schedule.
    fn advance(&mut self) -> Duration {
        let delay = self.next;
        self.next = self.next.mul_f64(self.multiplier).min(self.max);
        delay
    }

    fn reset(&mut self) {
        self.next = self.min;
    }
}

/// Handle to a background delivery task that owns the connection to the
/// remote collector and the pending packet queue.
///
/// Clones share the same task and queue. When the last clone is dropped
/// the task makes one final flush attempt and exits.
#[derive(Clone)]
pub struct RemoteCollector {
    inner: Arc<CollectorInner>,
}

struct CollectorInner {
    packet_tx: mpsc::UnboundedSender<CollectionPacket>,
    pending: Arc<AtomicUsize>,
}

impl RemoteCollector {
    /// Start a delivery client for the collector at `addr` (`host:port`).
    ///
    /// Returns immediately; the connection is established, and
    /// re-established after failures, by the background task. Must be
    /// called from within a tokio runtime.
    pub fn connect(addr: impl Into<String>) -> Self {
        Self::connect_with(addr, CollectorConfig::default())
    }

    /// Like [`connect`](Self::connect), with explicit tuning.
    pub fn connect_with(addr: impl Into<String>, config: CollectorConfig) -> Self {
        let (packet_tx, packet_rx) = mpsc::unbounded_channel();
        let pending = Arc::new(AtomicUsize::new(0));

        tokio::spawn(run_connection(
            addr.into(),
            config,
            packet_rx,
            Arc::clone(&pending),
        ));

        Self {
            inner: Arc::new(CollectorInner { packet_tx, pending }),
        }
    }

    /// Number of packets queued but not yet written out. Advisory.
    pub fn pending(&self) -> usize {
        self.inner.pending.load(Ordering::Relaxed)
    }
}

impl Collector for RemoteCollector {
    fn collect(&self, span_id: SpanId, annotations: Vec<Annotation>) {
        let packet = CollectionPacket {
            span_id,
            annotations,
        };
        // A dead delivery task means the packet is silently lost;
        // telemetry must never perturb the caller.
        if self.inner.packet_tx.send(packet).is_ok() {
            self.inner.pending.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// The connection task: single owner of the socket, the queue, and both
/// liveness timers.
async fn run_connection(
    addr: String,
    config: CollectorConfig,
    mut packet_rx: mpsc::UnboundedReceiver<CollectionPacket>,
    pending: Arc<AtomicUsize>,
) {
    let mut queue: VecDeque<CollectionPacket> = VecDeque::new();
    let mut backoff = Backoff::new(&config);

    'reconnect: loop {
        // Disconnected: dial with backoff, queueing whatever arrives.
        let mut conn = loop {
            tracing::debug!(addr = %addr, "connecting");
            match TcpStream::connect(&addr).await {
                Ok(conn) => break conn,
                Err(error) => {
                    let delay = backoff.advance();
                    tracing::debug!(%error, ?delay, "connect failed, backing off");
                    let retry_at = Instant::now() + delay;
                    loop {
                        tokio::select! {
                            _ = tokio::time::sleep_until(retry_at) => break,
                            packet = packet_rx.recv() => match packet {
                                Some(packet) => queue.push_back(packet),
                                // Every handle dropped while down: what's
                                // queued has nowhere to go.
                                None => return,
                            },
                        }
                    }
                }
            }
        };

        backoff.reset();
        tracing::debug!(addr = %addr, "connected");

        // Connected. Anything queued while disconnected gets a flush
        // scheduled as if it had just been collected.
        let mut flush_at = if queue.is_empty() {
            None
        } else {
            Some(Instant::now() + config.flush_delay)
        };
        let mut inbound = [0u8; 512];

        loop {
            tokio::select! {
                packet = packet_rx.recv() => match packet {
                    Some(packet) => {
                        queue.push_back(packet);
                        if flush_at.is_none() {
                            flush_at = Some(Instant::now() + config.flush_delay);
                        }
                    }
                    None => {
                        // Last handle dropped: one final flush attempt.
                        let _ = flush(&mut queue, &pending, &mut conn).await;
                        return;
                    }
                },
                _ = tokio::time::sleep_until(flush_at.unwrap_or_else(Instant::now)), if flush_at.is_some() => {
                    flush_at = None;
                    match flush(&mut queue, &pending, &mut conn).await {
                        Ok(count) => tracing::debug!(count, "flushed"),
                        Err(error) => {
                            tracing::debug!(%error, "write failed, disconnecting");
                            continue 'reconnect;
                        }
                    }
                },
                read = conn.read(&mut inbound) => match read {
                    Ok(0) => {
                        tracing::debug!("collector closed the connection");
                        continue 'reconnect;
                    }
                    Ok(n) => {
                        // The protocol is write-only from this side.
                        tracing::debug!(bytes = n, "discarding unexpected data from collector");
                    }
                    Err(error) => {
                        tracing::debug!(%error, "read failed, disconnecting");
                        continue 'reconnect;
                    }
                },
            }
        }
    }
}

/// Write out every queued packet in FIFO order, framed.
///
/// A packet leaves the queue only once its frame is fully written, so a
/// mid-flush failure keeps the failed packet and everything behind it
/// queued for the next connection.
async fn flush(
    queue: &mut VecDeque<CollectionPacket>,
    pending: &AtomicUsize,
    conn: &mut TcpStream,
) -> io::Result<usize> {
    let mut written = 0;
    while let Some(packet) = queue.front() {
        match serde_json::to_vec(packet) {
            Ok(payload) => conn.write_all(&encode_frame(&payload)).await?,
            Err(error) => {
                // Unencodable packets can never be delivered; drop rather
                // than wedge the queue.
                tracing::warn!(%error, "dropping unencodable packet");
            }
        }
        queue.pop_front();
        pending.fetch_sub(1, Ordering::Relaxed);
        written += 1;
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_geometrically_and_caps() {
        let config = CollectorConfig::default().with_backoff(
            Duration::from_millis(100),
            Duration::from_secs(1),
            2.0,
        );
        let mut backoff = Backoff::new(&config);

        assert_eq!(backoff.advance(), Duration::from_millis(100));
        assert_eq!(backoff.advance(), Duration::from_millis(200));
        assert_eq!(backoff.advance(), Duration::from_millis(400));
        assert_eq!(backoff.advance(), Duration::from_millis(800));
        assert_eq!(backoff.advance(), Duration::from_secs(1));
        assert_eq!(backoff.advance(), Duration::from_secs(1));
    }

    #[test]
    fn backoff_resets_to_minimum_after_success() {
        let config = CollectorConfig::default().with_backoff(
            Duration::from_millis(100),
            Duration::from_secs(10),
            2.0,
        );
        let mut backoff = Backoff::new(&config);

        for _ in 0..5 {
            backoff.advance();
        }
        backoff.reset();
        assert_eq!(backoff.advance(), Duration::from_millis(100));
    }
}

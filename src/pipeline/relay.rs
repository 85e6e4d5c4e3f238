//! Stream relay: upstream completion fragments → framed client events.
//!
//! A spawned producer task consumes the upstream fragment stream and feeds an
//! `mpsc` channel; the returned [`EventStream`] is the consumer side. The
//! relay re-chunks each fragment per the configured granularity, forwards
//! events in arrival order, and terminates in exactly one of three ways:
//!
//! * upstream finished → one final [`StreamEvent::done`] is emitted;
//! * upstream errored  → the error is emitted, no `done`;
//! * the wall-clock deadline passed → [`GapScanError::StreamTimeout`] is
//!   emitted, no `done`.
//!
//! The deadline is a hard ceiling measured from relay start, not an idle
//! timeout — steady token traffic does not extend it. Dropping the
//! [`EventStream`] (client disconnect) closes the channel and the producer
//! task stops consuming upstream on its next send.

use crate::config::ChunkGranularity;
use crate::error::GapScanError;
use crate::pipeline::llm::FragmentStream;
use futures::StreamExt;
use serde::Serialize;
use std::pin::Pin;
use tokio::sync::mpsc;
use tokio::time::{timeout_at, Duration, Instant};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;
use tracing::{debug, warn};

/// One frame on the wire.
///
/// Serialised untagged, so the client sees `{"content": "…"}` for text and
/// `{"done": true}` as the end-of-stream marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StreamEvent {
    Content { content: String },
    Done { done: bool },
}

impl StreamEvent {
    pub fn content(text: impl Into<String>) -> Self {
        StreamEvent::Content {
            content: text.into(),
        }
    }

    pub fn done() -> Self {
        StreamEvent::Done { done: true }
    }
}

/// A boxed stream of relay events.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, GapScanError>> + Send>>;

/// Bounded so a stalled client applies backpressure to the upstream read
/// instead of buffering the whole completion in memory.
const CHANNEL_CAPACITY: usize = 256;

/// Start relaying `upstream` and return the client-facing event stream.
pub fn relay(
    upstream: FragmentStream,
    granularity: ChunkGranularity,
    deadline_secs: u64,
) -> EventStream {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    tokio::spawn(run(upstream, granularity, deadline_secs, tx));
    Box::pin(ReceiverStream::new(rx))
}

async fn run(
    mut upstream: FragmentStream,
    granularity: ChunkGranularity,
    deadline_secs: u64,
    tx: mpsc::Sender<Result<StreamEvent, GapScanError>>,
) {
    let deadline = Instant::now() + Duration::from_secs(deadline_secs);
    let mut forwarded = 0usize;

    loop {
        let next = match timeout_at(deadline, upstream.next()).await {
            Ok(item) => item,
            Err(_) => {
                warn!(deadline_secs, forwarded, "relay deadline expired");
                let _ = tx
                    .send(Err(GapScanError::StreamTimeout {
                        secs: deadline_secs,
                    }))
                    .await;
                return;
            }
        };

        match next {
            None => {
                debug!(forwarded, "upstream finished, closing stream");
                let _ = tx.send(Ok(StreamEvent::done())).await;
                return;
            }
            Some(Err(e)) => {
                warn!(error = %e, forwarded, "upstream errored, closing stream");
                let _ = tx.send(Err(e)).await;
                return;
            }
            Some(Ok(fragment)) => {
                for piece in granularity.split(&fragment) {
                    match timeout_at(deadline, tx.send(Ok(StreamEvent::content(piece)))).await {
                        // Deadline passed while blocked on a full channel.
                        // Best effort: the timeout error only fits if the
                        // client drained in the meantime.
                        Err(_) => {
                            warn!(deadline_secs, forwarded, "relay deadline expired mid-send");
                            let _ = tx.try_send(Err(GapScanError::StreamTimeout {
                                secs: deadline_secs,
                            }));
                            return;
                        }
                        // Receiver dropped: the client went away.
                        Ok(Err(_)) => {
                            debug!(forwarded, "client disconnected, stopping relay");
                            return;
                        }
                        Ok(Ok(())) => forwarded += 1,
                    }
                }
            }
        }
    }
}

//! Demand-driven bridge between handler event streams and transport frames.
//!
//! A streaming operation yields a pull-based [`EventStream`]; the transport
//! consumes serialized frames at whatever pace the client accepts. The
//! bridge couples the two through a capacity-1 channel: the next event is
//! pulled from the source only after the previous frame has been handed to
//! the transport, so at most one item is in flight and a slow client
//! stalls the producer instead of buffering.
//!
//! Error handling is in-band: a failed event (or a failed conversion) is
//! serialized as one final frame and the stream completes. The transport
//! never sees a mid-stream transport-level error, and end-of-stream is the
//! only completion signal.

use std::sync::Arc;

use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, warn};

use crate::error::{A2AError, A2AResult};

/// Bounded pool of concurrently running stream workers.
///
/// Each active bridge holds one permit for its whole lifetime; when the
/// pool is exhausted, new bridges wait their turn before pulling the
/// first event.
#[derive(Clone)]
pub struct StreamWorkerPool {
    semaphore: Arc<Semaphore>,
}

impl StreamWorkerPool {
    /// Create a pool allowing up to `max_streams` concurrent bridges.
    pub fn new(max_streams: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_streams)),
        }
    }

    /// Number of workers that could start right now.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Bridge a source stream into serialized frames.
    ///
    /// `serialize_item` turns each event into a frame; `serialize_error`
    /// renders the terminal error frame. The returned receiver yields one
    /// `String` per frame and closes when the source completes, errors,
    /// or the receiver is dropped (which cancels the worker).
    pub fn bridge<T, FOk, FErr>(
        &self,
        mut source: BoxStream<'static, A2AResult<T>>,
        serialize_item: FOk,
        serialize_error: FErr,
    ) -> mpsc::Receiver<String>
    where
        T: Send + 'static,
        FOk: Fn(T) -> Result<String, serde_json::Error> + Send + 'static,
        FErr: Fn(A2AError) -> String + Send + 'static,
    {
        // Capacity 1 is the demand coupling: a completed send is the
        // signal to pull the next event.
        let (tx, rx) = mpsc::channel::<String>(1);
        let semaphore = Arc::clone(&self.semaphore);

        tokio::spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                // The semaphore is never closed while the pool is alive.
                Err(_) => return,
            };

            loop {
                // A consumer that disconnects while the source is idle
                // must not keep the worker (and its pool permit) parked
                // on the pull.
                let next = tokio::select! {
                    item = source.next() => item,
                    _ = tx.closed() => {
                        debug!("stream consumer went away, canceling");
                        break;
                    }
                };
                match next {
                    Some(Ok(item)) => {
                        let frame = match serialize_item(item) {
                            Ok(frame) => frame,
                            Err(err) => {
                                warn!("failed to serialize stream event: {}", err);
                                let error = A2AError::internal_error(err.to_string());
                                let _ = tx.send(serialize_error(error)).await;
                                break;
                            }
                        };
                        if tx.send(frame).await.is_err() {
                            debug!("stream consumer went away, canceling");
                            break;
                        }
                    }
                    Some(Err(error)) => {
                        warn!("stream failed, emitting terminal error frame: {}", error);
                        let _ = tx.send(serialize_error(error)).await;
                        break;
                    }
                    None => {
                        debug!("stream completed");
                        break;
                    }
                }
            }
        });

        rx
    }
}

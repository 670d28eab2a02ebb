//! Delivers decoded stream records from a background worker to the caller.
//!
//! Each streaming call spawns one worker task owning the response body and a
//! [`StreamDecoder`]. Records travel to the caller's [`ResponseStream`] over a
//! channel with room for a single unit, so the worker never runs more than one
//! record ahead of the consumer.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};

#[cfg(feature = "metrics")]
use metrics::counter;
#[cfg(feature = "tracing")]
use tracing::{debug, warn};

use crate::parser::{IncompleteStreamPolicy, StreamDecoder, StreamRecord};
use crate::types::BodyStream;
use crate::{Error, Result};

/// An ordered sequence of stream units: `Ok(record)` or a terminal `Err(fault)`.
///
/// The sequence ends after a record with `done == true`, after a fault, or
/// when the call's cancellation scope is cancelled. Dropping the stream early
/// stops the worker and releases the response body.
pub struct ResponseStream<T> {
    rx: mpsc::Receiver<Result<T>>,
    _scope: DropGuard,
}

impl<T> ResponseStream<T> {
    /// Drains the stream, stopping at the first fault.
    pub async fn collect_all(mut self) -> Result<Vec<T>> {
        let mut records = Vec::new();
        while let Some(unit) = self.rx.recv().await {
            records.push(unit?);
        }
        Ok(records)
    }
}

impl<T> Stream for ResponseStream<T> {
    type Item = Result<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Starts the decode worker for `body` and returns the consumer side.
///
/// The worker runs under a child of `cancel`: cancelling the caller's scope,
/// or dropping the returned stream, stops it promptly even while it waits for
/// bytes or for the consumer.
pub(crate) fn spawn_decoder<M>(
    body: BodyStream,
    policy: IncompleteStreamPolicy,
    cancel: &CancellationToken,
) -> ResponseStream<M>
where
    M: DeserializeOwned + StreamRecord + Send + 'static,
{
    let (tx, rx) = mpsc::channel(1);
    let scope = cancel.child_token();
    let decoder = StreamDecoder::<BodyStream, M>::new(body, policy);

    tokio::spawn(run_worker(decoder, tx, scope.clone()));

    ResponseStream {
        rx,
        _scope: scope.drop_guard(),
    }
}

async fn run_worker<M>(
    mut decoder: StreamDecoder<BodyStream, M>,
    tx: mpsc::Sender<Result<M>>,
    scope: CancellationToken,
) where
    M: DeserializeOwned + StreamRecord + Send + 'static,
{
    #[cfg(feature = "tracing")]
    debug!("stream worker started");

    loop {
        let unit = tokio::select! {
            biased;
            _ = scope.cancelled() => {
                #[cfg(feature = "tracing")]
                debug!("stream cancelled while waiting for the body");
                // Best effort: the consumer may be gone or may not have taken the previous unit.
                let _ = tx.try_send(Err(Error::Cancelled));
                break;
            }
            unit = decoder.next() => unit,
        };

        let Some(unit) = unit else {
            break;
        };

        #[cfg(feature = "metrics")]
        counter!("ollama_client.stream_units_total").increment(1);

        let is_fault = unit.is_err();
        if let Err(_err) = &unit {
            #[cfg(feature = "metrics")]
            counter!("ollama_client.stream_faults_total").increment(1);
            #[cfg(feature = "tracing")]
            warn!(error = %_err, "stream ended with a fault");
        }

        tokio::select! {
            biased;
            _ = scope.cancelled() => {
                #[cfg(feature = "tracing")]
                debug!("stream cancelled while waiting for the consumer");
                break;
            }
            sent = tx.send(unit) => {
                if sent.is_err() {
                    // consumer dropped the stream
                    break;
                }
            }
        }

        if is_fault {
            break;
        }
    }

    drop(decoder);

    #[cfg(feature = "tracing")]
    debug!("stream worker finished");
}

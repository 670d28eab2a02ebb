//! Decodes streaming responses from the Ollama API.
//!
//! Streaming endpoints answer with a sequence of JSON objects, usually one per
//! line. [`StreamDecoder`] turns the raw body into typed records one value at a
//! time, without waiting for the whole body.

use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Buf, Bytes, BytesMut};
use futures::Stream;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{DecodeError, Error, Result};

/// A record type delivered by a streaming endpoint.
pub trait StreamRecord {
    /// `true` on the record that completes the stream. Nothing is read after it.
    fn is_done(&self) -> bool;
}

/// What to do when the body ends before any record reported completion.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncompleteStreamPolicy {
    /// Deliver a final [`DecodeError::Incomplete`] fault.
    #[default]
    Error,
    /// End the sequence quietly, as if the last record had been the final one.
    Ignore,
}

/// Streaming JSON decoder.
///
/// - `S` is the response body, yielding `Result<Bytes>` chunks
/// - `M` is the record each JSON value is decoded into
///
/// Values may be newline separated or directly concatenated, and may be split
/// across chunks arbitrarily. Records come out in the order they were read.
/// The sequence ends after the first record whose [`StreamRecord::is_done`] is
/// true, or after a single fault; the body is released at that point.
pub struct StreamDecoder<S, M>
where
    S: Stream<Item = Result<Bytes>> + Send + Unpin,
    M: DeserializeOwned + StreamRecord,
{
    inner: Option<S>,
    buffer: BytesMut,
    /// The buffer ends inside a value and no byte that could close it has
    /// arrived since the last attempt.
    awaiting_close: bool,
    eof: bool,
    policy: IncompleteStreamPolicy,
    _marker: PhantomData<fn() -> M>,
}

impl<S, M> StreamDecoder<S, M>
where
    S: Stream<Item = Result<Bytes>> + Send + Unpin,
    M: DeserializeOwned + StreamRecord,
{
    pub fn new(stream: S, policy: IncompleteStreamPolicy) -> Self {
        Self {
            inner: Some(stream),
            buffer: BytesMut::new(),
            awaiting_close: false,
            eof: false,
            policy,
            _marker: PhantomData,
        }
    }

    /// `true` once the decoder has delivered its last item.
    pub fn is_finished(&self) -> bool {
        self.inner.is_none()
    }

    /// Drops the body. Called exactly once, on whichever path ends the stream.
    fn finish(&mut self) {
        self.inner = None;
        self.buffer.clear();
    }

    /// Pulls one complete value off the front of the buffer.
    /// `Ok(None)` means more bytes are needed.
    fn next_value(&mut self) -> Result<Option<M>> {
        if self.awaiting_close && !self.eof {
            return Ok(None);
        }

        let (next, consumed) = {
            let mut values = serde_json::Deserializer::from_slice(&self.buffer).into_iter::<Value>();
            let next = values.next();
            (next, values.byte_offset())
        };

        match next {
            None => {
                // only whitespace left
                self.buffer.clear();
                Ok(None)
            }
            Some(Ok(value)) => {
                self.buffer.advance(consumed);
                decode_value(value).map(Some)
            }
            Some(Err(e)) if e.is_eof() => {
                self.awaiting_close = true;
                Ok(None)
            }
            Some(Err(e)) => Err(DecodeError::Json(e).into()),
        }
    }

    fn end_of_stream(&self) -> Option<Error> {
        let pending = self
            .buffer
            .iter()
            .filter(|b| !b.is_ascii_whitespace())
            .count();
        if pending > 0 {
            return Some(DecodeError::Truncated(pending).into());
        }
        match self.policy {
            IncompleteStreamPolicy::Error => Some(DecodeError::Incomplete.into()),
            IncompleteStreamPolicy::Ignore => None,
        }
    }
}

/// In-band `{"error": "..."}` frames take precedence over the record type,
/// since most records accept any object thanks to their field defaults.
fn decode_value<M: DeserializeOwned>(value: Value) -> Result<M> {
    if let Some(message) = value.get("error").and_then(Value::as_str) {
        return Err(DecodeError::Server(message.to_string()).into());
    }
    serde_json::from_value(value).map_err(|e| DecodeError::Json(e).into())
}

/// Only these bytes can complete a pending JSON value; anything else arriving
/// leaves a partial value partial, so the buffer is not re-parsed for it.
fn may_close_value(byte: u8) -> bool {
    matches!(byte, b'}' | b']' | b'"') || byte.is_ascii_whitespace()
}

impl<S, M> Stream for StreamDecoder<S, M>
where
    S: Stream<Item = Result<Bytes>> + Send + Unpin,
    M: DeserializeOwned + StreamRecord,
{
    type Item = Result<M>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        // Every field is Unpin, so the decoder itself is.
        let this = self.get_mut();

        loop {
            if this.is_finished() {
                return Poll::Ready(None);
            }

            // 1. Hand out any complete value already buffered
            match this.next_value() {
                Ok(Some(record)) => {
                    if record.is_done() {
                        this.finish();
                    }
                    return Poll::Ready(Some(Ok(record)));
                }
                Ok(None) => {}
                Err(e) => {
                    this.finish();
                    return Poll::Ready(Some(Err(e)));
                }
            }

            // 2. Body exhausted without a completion record
            if this.eof {
                let fault = this.end_of_stream();
                this.finish();
                return Poll::Ready(fault.map(Err));
            }

            // 3. Need more bytes
            let Some(inner) = this.inner.as_mut() else {
                return Poll::Ready(None);
            };
            match Pin::new(inner).poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    if bytes.iter().any(|&b| may_close_value(b)) {
                        this.awaiting_close = false;
                    }
                    this.buffer.extend_from_slice(&bytes);
                }
                Poll::Ready(Some(Err(e))) => {
                    this.finish();
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(None) => this.eof = true,
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

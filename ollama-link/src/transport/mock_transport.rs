use std::collections::{HashMap, VecDeque};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

#[cfg(feature = "tracing")]
use tracing::instrument;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;

use crate::transport::Transport;
use crate::types::{HttpRequest, HttpResponse};
use crate::{DecodeError, Error, Result};

/// A mock implementation of the [`Transport`] trait for testing purposes.
///
/// Responses are scripted per URL path and handed out in order. Every request
/// the transport receives is recorded, so tests can assert on verbs, paths,
/// headers and encoded bodies. Paths without a scripted response get a
/// `404 Not Found`.
#[derive(Clone, Default)]
pub struct MockTransport {
    responses: Arc<Mutex<HashMap<String, VecDeque<MockResponse>>>>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl MockTransport {
    /// Creates a new, empty [`MockTransport`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `response` for the next request to `path` (e.g. `/api/chat`).
    pub fn with_response(self, path: impl Into<String>, response: MockResponse) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry(path.into())
            .or_default()
            .push_back(response);
        self
    }

    /// All requests received so far, oldest first.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[derive(Debug, Clone)]
enum MockChunk {
    Data(Bytes),
    Fail(String),
}

/// A scripted answer for [`MockTransport`].
#[derive(Debug, Clone)]
pub struct MockResponse {
    status: StatusCode,
    chunks: Vec<MockChunk>,
    hang: bool,
    transport_error: Option<String>,
    release_counter: Option<Arc<AtomicUsize>>,
}

impl MockResponse {
    /// `200 OK` with `body` delivered as a single chunk.
    pub fn json(body: impl Into<String>) -> Self {
        Self::chunks(vec![Bytes::from(body.into())])
    }

    /// `200 OK` with each line delivered as its own newline-terminated chunk.
    pub fn lines<I, L>(lines: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<String>,
    {
        Self::chunks(
            lines
                .into_iter()
                .map(|line| Bytes::from(format!("{}\n", line.into())))
                .collect(),
        )
    }

    /// `200 OK` with the body split into exactly these chunks.
    pub fn chunks(chunks: Vec<Bytes>) -> Self {
        Self {
            status: StatusCode::OK,
            chunks: chunks.into_iter().map(MockChunk::Data).collect(),
            hang: false,
            transport_error: None,
            release_counter: None,
        }
    }

    /// An empty-bodied response with the given status.
    pub fn status(status: StatusCode) -> Self {
        Self::chunks(Vec::new()).with_status(status)
    }

    /// The exchange itself fails; no response is produced.
    pub fn transport_error(message: impl Into<String>) -> Self {
        Self {
            transport_error: Some(message.into()),
            ..Self::chunks(Vec::new())
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// After the scripted chunks, the body read fails with `message`.
    pub fn then_fail(mut self, message: impl Into<String>) -> Self {
        self.chunks.push(MockChunk::Fail(message.into()));
        self
    }

    /// After the scripted chunks, the body never yields again.
    pub fn then_hang(mut self) -> Self {
        self.hang = true;
        self
    }

    /// Increments `counter` when the body is released.
    pub fn on_release(mut self, counter: Arc<AtomicUsize>) -> Self {
        self.release_counter = Some(counter);
        self
    }
}

/// Body stream produced by [`MockTransport`].
struct MockBody {
    chunks: VecDeque<MockChunk>,
    hang: bool,
    release_counter: Option<Arc<AtomicUsize>>,
}

impl Stream for MockBody {
    type Item = Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.chunks.pop_front() {
            Some(MockChunk::Data(bytes)) => Poll::Ready(Some(Ok(bytes))),
            Some(MockChunk::Fail(message)) => Poll::Ready(Some(Err(Error::Decode(
                DecodeError::Body(message.into()),
            )))),
            None if self.hang => Poll::Pending,
            None => Poll::Ready(None),
        }
    }
}

impl Drop for MockBody {
    fn drop(&mut self) {
        if let Some(counter) = &self.release_counter {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    /// Records `request` and answers with the next scripted response for its path.
    #[cfg_attr(feature = "tracing", instrument(skip(self, request), fields(path = %request.url.path())))]
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let path = request.url.path().to_string();
        self.requests.lock().unwrap().push(request);

        let scripted = self
            .responses
            .lock()
            .unwrap()
            .get_mut(&path)
            .and_then(VecDeque::pop_front);
        let response = scripted.unwrap_or_else(|| {
            MockResponse::json(format!(r#"{{"error":"no mock response for {}"}}"#, path))
                .with_status(StatusCode::NOT_FOUND)
        });

        if let Some(message) = response.transport_error {
            return Err(Error::Transport(message.into()));
        }

        Ok(HttpResponse {
            status: response.status,
            headers: HeaderMap::new(),
            body: Box::pin(MockBody {
                chunks: response.chunks.into(),
                hang: response.hang,
                release_counter: response.release_counter,
            }),
        })
    }
}

use std::fmt;
use std::pin::Pin;

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{StatusCode, Url};
use serde::Serialize;

use super::OllamaError;
use crate::encode::encode;
use crate::{Error, Result};

/// Response body as handed over by a [`Transport`](crate::transport::Transport).
///
/// Dropping the stream releases the underlying connection.
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Upper bound on how much of an error body is read to extract a message.
const MAX_ERROR_BODY: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub verb: HttpVerb,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpVerb {
    #[default]
    GET,
    POST,
    DELETE,
}

impl HttpVerb {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVerb::GET => "GET",
            HttpVerb::POST => "POST",
            HttpVerb::DELETE => "DELETE",
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl HttpRequest {
    pub fn new(url: Url) -> Self {
        Self {
            verb: HttpVerb::GET,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(mut self) -> Self {
        self.verb = HttpVerb::GET;
        self
    }

    pub fn post(mut self) -> Self {
        self.verb = HttpVerb::POST;
        self
    }

    pub fn delete(mut self) -> Self {
        self.verb = HttpVerb::DELETE;
        self
    }

    /// Encodes `body` as the JSON payload and sets `Content-Type: application/json`.
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.body = Some(encode(body)?);
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(self)
    }
}

pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: BodyStream,
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

impl HttpResponse {
    /// Passes 2xx responses through untouched. Any other status becomes
    /// [`Error::Status`], carrying the server's `{"error": ...}` message when
    /// the body has one. The body is released either way before returning.
    pub async fn error_for_status(self) -> Result<Self> {
        if self.status.is_success() {
            return Ok(self);
        }
        let status = self.status;
        let message = read_error_message(self.body).await;
        Err(Error::Status { status, message })
    }

    /// Reads the whole body into memory, releasing it afterwards.
    pub async fn bytes(self) -> Result<Bytes> {
        let mut body = self.body;
        let mut buffer = BytesMut::new();
        while let Some(chunk) = body.next().await {
            buffer.extend_from_slice(&chunk?);
        }
        Ok(buffer.freeze())
    }
}

async fn read_error_message(mut body: BodyStream) -> Option<String> {
    let mut buffer = BytesMut::new();
    while buffer.len() < MAX_ERROR_BODY {
        match body.next().await {
            Some(Ok(chunk)) => buffer.extend_from_slice(&chunk),
            Some(Err(_)) | None => break,
        }
    }
    drop(body);

    if let Ok(err) = serde_json::from_slice::<OllamaError>(&buffer) {
        return Some(err.error);
    }
    let text = String::from_utf8_lossy(&buffer);
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

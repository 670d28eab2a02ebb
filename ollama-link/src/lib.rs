use std::sync::Arc;

use reqwest::{StatusCode, Url};
use thiserror::Error;

use self::parser::IncompleteStreamPolicy;
use self::transport::Transport;

pub mod builder;
pub mod client;
pub mod encode;
pub mod parser;
pub mod scope;
pub mod stream;
pub mod transport;
pub mod types;

pub use tokio_util::sync::CancellationToken;

/// Client for a local Ollama server.
///
/// The client holds no per-call state: it is immutable after
/// [`build`](builder::OllamaClientBuilder::build) and can be cloned and shared
/// between tasks freely.
#[derive(Clone)]
pub struct OllamaClient {
    base_url: Url,
    transport: Arc<dyn Transport + Send + Sync>,
    incomplete_stream: IncompleteStreamPolicy,
}

pub type Result<T> = std::result::Result<T, Error>;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Client error: {0}")]
    Client(String),

    #[error("Cannot encode request: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Cannot prepare HTTP request: {0}")]
    Request(String),

    #[error("Transport error: {0}")]
    Transport(#[source] BoxError),

    #[error("Server returned {}{}", status_line(.status), message_suffix(.message))]
    Status {
        status: StatusCode,
        message: Option<String>,
    },

    #[error("Cannot decode response: {0}")]
    Decode(#[from] DecodeError),

    #[error("Stream cancelled")]
    Cancelled,
}

/// Faults raised while reading or parsing a response body.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("malformed JSON: {0}")]
    Json(#[source] serde_json::Error),

    #[error("body read failed: {0}")]
    Body(#[source] BoxError),

    #[error("server reported an error: {0}")]
    Server(String),

    #[error("stream ended in the middle of a value ({0} bytes pending)")]
    Truncated(usize),

    #[error("stream ended without a completion marker")]
    Incomplete,
}

impl Error {
    /// Returns the HTTP status for [`Error::Status`].
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn status_line(status: &StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {}", status.as_u16(), reason),
        None => status.as_u16().to_string(),
    }
}

fn message_suffix(message: &Option<String>) -> String {
    match message {
        Some(message) => format!(": {}", message),
        None => String::new(),
    }
}

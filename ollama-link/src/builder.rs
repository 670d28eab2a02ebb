use std::sync::Arc;

#[cfg(feature = "tracing")]
use tracing::instrument;

use reqwest::Url;

use crate::parser::IncompleteStreamPolicy;
use crate::transport::{ReqwestTransport, Transport};
use crate::{Error, OllamaClient, Result};

/// Default address of a local Ollama server.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// A builder for constructing an [`OllamaClient`].
///
/// - Uses either `OLLAMA_HOST` environment variable or `http://localhost:11434`.
/// - Uses `reqwest`-based transport by default - [`ReqwestTransport`].
/// - Reports streams that end without a completion record as a fault
///   ([`IncompleteStreamPolicy::Error`]).
///
/// The resulting client is immutable; build a new one to change any of these.
pub struct OllamaClientBuilder {
    base_url: Option<String>,
    transport: Option<Arc<dyn Transport + Send + Sync>>,
    incomplete_stream: IncompleteStreamPolicy,
}

impl OllamaClientBuilder {
    /// Creates a new [`OllamaClientBuilder`]. This method is called by [`OllamaClient::builder`]
    pub(crate) fn new() -> Self {
        OllamaClientBuilder {
            base_url: None,
            transport: None,
            incomplete_stream: IncompleteStreamPolicy::default(),
        }
    }

    /// Sets the base URL for the Ollama API.
    ///
    /// If not set, the builder will try to read from the `OLLAMA_HOST` environment variable,
    /// defaulting to `http://localhost:11434` if the environment variable is not found.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets a custom transport implementation for the client.
    ///
    /// This allows for using different HTTP clients or mock implementations for testing.
    /// If not set, a `reqwest`-based transport \([`ReqwestTransport`]\) will be used.
    ///
    /// For testing, you can use [`MockTransport`](crate::transport::MockTransport)
    /// or your own mock [`Transport`] implementations.
    pub fn transport(mut self, transport: Arc<dyn Transport + Send + Sync>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Chooses how streams that end before a `done` record are reported.
    pub fn incomplete_stream_policy(mut self, policy: IncompleteStreamPolicy) -> Self {
        self.incomplete_stream = policy;
        self
    }

    /// Builds the [`OllamaClient`] with the configured options.
    ///
    /// # Errors
    ///
    /// Returns an [`Error::Client`](variant@Error::Client) if the base URL is invalid or if there's an issue
    /// initializing [`ReqwestTransport`].
    #[cfg_attr(feature = "tracing", instrument(skip(self)))]
    pub fn build(self) -> Result<OllamaClient> {
        let base_url_str = self.base_url.unwrap_or_else(|| {
            std::env::var("OLLAMA_HOST").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
        });
        let base_url = Url::parse(&base_url_str)
            .map_err(|e| Error::Client(format!("Invalid base URL: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Client(format!(
                "Invalid base URL: {} cannot be a base",
                base_url_str
            )));
        }

        let transport = match self.transport {
            Some(t) => t,
            None => Arc::new(ReqwestTransport::new()?),
        };

        Ok(OllamaClient {
            base_url,
            transport,
            incomplete_stream: self.incomplete_stream,
        })
    }
}

#[cfg(feature = "tracing")]
use tracing::instrument;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Method};

use crate::transport::Transport;
use crate::types::{HttpRequest, HttpResponse, HttpVerb};
use crate::{DecodeError, Error, Result};

/// A [`Transport`] implementation that uses the `reqwest` crate for making HTTP requests.
///
/// This is the default transport used by [`OllamaClient`](crate::OllamaClient) if no custom transport
/// is provided. Response bodies are exposed as a byte stream, so streaming
/// endpoints are decoded while the server is still producing output.
#[derive(Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Creates a new `ReqwestTransport`.
    ///
    /// # Errors
    ///
    /// Returns an [`Error::Client`] if the `reqwest` client cannot be built.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| Error::Client(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wraps an already configured `reqwest` client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

fn method(verb: HttpVerb) -> Method {
    match verb {
        HttpVerb::GET => Method::GET,
        HttpVerb::POST => Method::POST,
        HttpVerb::DELETE => Method::DELETE,
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    /// Sends the request using `reqwest`.
    ///
    /// # Errors
    ///
    /// Returns an [`Error::Request`] if the request cannot be built and an
    /// [`Error::Transport`] if it cannot be executed.
    #[cfg_attr(feature = "tracing", instrument(skip(self, request), fields(verb = %request.verb, url = %request.url)))]
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = self
            .client
            .request(method(request.verb), request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        let request = builder
            .build()
            .map_err(|e| Error::Request(e.to_string()))?;

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| Error::Transport(Box::new(e)))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| Error::Decode(DecodeError::Body(Box::new(e)))))
            .boxed();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

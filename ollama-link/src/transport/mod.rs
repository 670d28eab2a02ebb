use async_trait::async_trait;

use crate::types::{HttpRequest, HttpResponse};
use crate::Result;

mod mock_transport;
mod reqwest_transport;

pub use mock_transport::{MockResponse, MockTransport};
pub use reqwest_transport::ReqwestTransport;

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Performs one HTTP exchange and returns the status, headers and body.
    ///
    /// Implementations must not turn non-2xx statuses into errors; the client
    /// normalizes them. Failing to build the exchange should be reported as
    /// [`Error::Request`](crate::Error::Request), failing to execute it as
    /// [`Error::Transport`](crate::Error::Transport), and body read failures as
    /// [`DecodeError::Body`](crate::DecodeError::Body) items of the body stream.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

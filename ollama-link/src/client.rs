use std::future::Future;

#[cfg(feature = "metrics")]
use metrics::counter;
#[cfg(feature = "tracing")]
use tracing::instrument;

use reqwest::Url;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::builder::OllamaClientBuilder;
use crate::parser::StreamRecord;
use crate::stream::{spawn_decoder, ResponseStream};
use crate::types::chat::{ChatRequest, ChatResponse, ChatStream};
use crate::types::embed::{EmbedRequest, EmbedResponse};
use crate::types::generate::{GenerateRequest, GenerateResponse, GenerateStream};
use crate::types::{
    CopyModelRequest, CreateModelRequest, DeleteModelRequest, FromBytes, HttpRequest,
    HttpResponse, ListModelsResponse, ListRunningModelsResponse, ProgressStream,
    PullModelRequest, PushModelRequest, ShowModelRequest, ShowModelResponse, VersionResponse,
};
use crate::OllamaClient;
use crate::{Error, Result};

/// Every call takes a [`CancellationToken`] scope.
///
/// One-shot calls run on the caller's task and return [`Error::Cancelled`] if
/// the scope is cancelled first. Streaming calls return once the server has
/// answered with a success status; decoding then continues on a worker task
/// bound to the same scope.
impl OllamaClient {
    pub fn builder() -> OllamaClientBuilder {
        OllamaClientBuilder::new()
    }

    /// The server address every endpoint is resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Generates a completion and waits for the whole response.
    #[cfg_attr(feature = "tracing", instrument(skip(self, request, cancel), fields(model = %request.model)))]
    pub async fn generate(
        &self,
        request: GenerateRequest,
        cancel: &CancellationToken,
    ) -> Result<GenerateResponse> {
        record_request("generate", "non_streaming");

        let request = GenerateRequest {
            stream: Some(false),
            ..request
        };
        let request = HttpRequest::new(self.endpoint("api/generate")?)
            .post()
            .json(&request)?;

        self.call(request, cancel).await
    }

    /// Generates a completion, delivering fragments as the model produces them.
    #[cfg_attr(feature = "tracing", instrument(skip(self, request, cancel), fields(model = %request.model)))]
    pub async fn generate_stream(
        &self,
        request: GenerateRequest,
        cancel: &CancellationToken,
    ) -> Result<GenerateStream> {
        record_request("generate", "streaming");

        let request = GenerateRequest {
            stream: Some(true),
            ..request
        };
        let request = HttpRequest::new(self.endpoint("api/generate")?)
            .post()
            .json(&request)?;

        self.open_stream(request, cancel).await
    }

    /// Generates the next chat message and waits for the whole response.
    #[cfg_attr(feature = "tracing", instrument(skip(self, request, cancel), fields(model = %request.model)))]
    pub async fn chat(
        &self,
        request: ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<ChatResponse> {
        record_request("chat", "non_streaming");

        let request = ChatRequest {
            stream: Some(false),
            ..request
        };
        let request = HttpRequest::new(self.endpoint("api/chat")?)
            .post()
            .json(&request)?;

        self.call(request, cancel).await
    }

    /// Generates the next chat message, delivering deltas as they arrive.
    #[cfg_attr(feature = "tracing", instrument(skip(self, request, cancel), fields(model = %request.model)))]
    pub async fn chat_stream(
        &self,
        request: ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<ChatStream> {
        record_request("chat", "streaming");

        let request = ChatRequest {
            stream: Some(true),
            ..request
        };
        let request = HttpRequest::new(self.endpoint("api/chat")?)
            .post()
            .json(&request)?;

        self.open_stream(request, cancel).await
    }

    #[cfg_attr(feature = "tracing", instrument(skip(self, request, cancel), fields(model = %request.model)))]
    pub async fn embed(
        &self,
        request: EmbedRequest,
        cancel: &CancellationToken,
    ) -> Result<EmbedResponse> {
        record_request("embed", "non_streaming");

        let request = HttpRequest::new(self.endpoint("api/embed")?)
            .post()
            .json(&request)?;

        self.call(request, cancel).await
    }

    /// Lists the models available locally.
    #[cfg_attr(feature = "tracing", instrument(skip(self, cancel)))]
    pub async fn list_models(&self, cancel: &CancellationToken) -> Result<ListModelsResponse> {
        record_request("tags", "non_streaming");

        let request = HttpRequest::new(self.endpoint("api/tags")?).get();

        self.call(request, cancel).await
    }

    /// Lists the models currently loaded into memory.
    #[cfg_attr(feature = "tracing", instrument(skip(self, cancel)))]
    pub async fn list_running_models(
        &self,
        cancel: &CancellationToken,
    ) -> Result<ListRunningModelsResponse> {
        record_request("ps", "non_streaming");

        let request = HttpRequest::new(self.endpoint("api/ps")?).get();

        self.call(request, cancel).await
    }

    #[cfg_attr(feature = "tracing", instrument(skip(self, request, cancel), fields(model = %request.model)))]
    pub async fn show_model(
        &self,
        request: ShowModelRequest,
        cancel: &CancellationToken,
    ) -> Result<ShowModelResponse> {
        record_request("show", "non_streaming");

        let request = HttpRequest::new(self.endpoint("api/show")?)
            .post()
            .json(&request)?;

        self.call(request, cancel).await
    }

    #[cfg_attr(feature = "tracing", instrument(skip(self, request, cancel), fields(model = %request.model)))]
    pub async fn delete_model(
        &self,
        request: DeleteModelRequest,
        cancel: &CancellationToken,
    ) -> Result<()> {
        record_request("delete", "non_streaming");

        let request = HttpRequest::new(self.endpoint("api/delete")?)
            .delete()
            .json(&request)?;

        self.call(request, cancel).await
    }

    #[cfg_attr(feature = "tracing", instrument(skip(self, request, cancel), fields(source = %request.source)))]
    pub async fn copy_model(
        &self,
        request: CopyModelRequest,
        cancel: &CancellationToken,
    ) -> Result<()> {
        record_request("copy", "non_streaming");

        let request = HttpRequest::new(self.endpoint("api/copy")?)
            .post()
            .json(&request)?;

        self.call(request, cancel).await
    }

    /// Downloads a model, reporting progress until the server answers `success`.
    #[cfg_attr(feature = "tracing", instrument(skip(self, request, cancel), fields(model = %request.model)))]
    pub async fn pull_model(
        &self,
        request: PullModelRequest,
        cancel: &CancellationToken,
    ) -> Result<ProgressStream> {
        record_request("pull", "streaming");

        let request = PullModelRequest {
            stream: Some(true),
            ..request
        };
        let request = HttpRequest::new(self.endpoint("api/pull")?)
            .post()
            .json(&request)?;

        self.open_stream(request, cancel).await
    }

    /// Uploads a model, reporting progress until the server answers `success`.
    #[cfg_attr(feature = "tracing", instrument(skip(self, request, cancel), fields(model = %request.model)))]
    pub async fn push_model(
        &self,
        request: PushModelRequest,
        cancel: &CancellationToken,
    ) -> Result<ProgressStream> {
        record_request("push", "streaming");

        let request = PushModelRequest {
            stream: Some(true),
            ..request
        };
        let request = HttpRequest::new(self.endpoint("api/push")?)
            .post()
            .json(&request)?;

        self.open_stream(request, cancel).await
    }

    /// Creates a model, reporting progress until the server answers `success`.
    #[cfg_attr(feature = "tracing", instrument(skip(self, request, cancel), fields(model = %request.model)))]
    pub async fn create_model(
        &self,
        request: CreateModelRequest,
        cancel: &CancellationToken,
    ) -> Result<ProgressStream> {
        record_request("create", "streaming");

        let request = CreateModelRequest {
            stream: Some(true),
            ..request
        };
        let request = HttpRequest::new(self.endpoint("api/create")?)
            .post()
            .json(&request)?;

        self.open_stream(request, cancel).await
    }

    /// Returns the server's version string.
    #[cfg_attr(feature = "tracing", instrument(skip(self, cancel)))]
    pub async fn version(&self, cancel: &CancellationToken) -> Result<String> {
        record_request("version", "non_streaming");

        let request = HttpRequest::new(self.endpoint("api/version")?).get();

        let response: VersionResponse = self.call(request, cancel).await?;
        Ok(response.version)
    }

    /// Resolves `path` below the base URL, keeping any prefix the base URL has.
    fn endpoint(&self, path: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Request(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(path.split('/'));
        Ok(url)
    }

    /// Dispatches `request` and checks the status. Nothing is decoded here.
    async fn dispatch(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.transport.send(request).await?.error_for_status().await
    }

    /// One-shot call: the body is read and decoded on the caller's task.
    async fn call<T: FromBytes>(&self, request: HttpRequest, cancel: &CancellationToken) -> Result<T> {
        scoped(cancel, async {
            let response = self.dispatch(request).await?;
            T::from_bytes(response.bytes().await?)
        })
        .await
    }

    /// Streaming call: once the status is known to be a success, the body is
    /// handed to a decode worker.
    async fn open_stream<M>(
        &self,
        request: HttpRequest,
        cancel: &CancellationToken,
    ) -> Result<ResponseStream<M>>
    where
        M: DeserializeOwned + StreamRecord + Send + 'static,
    {
        let response = scoped(cancel, self.dispatch(request)).await?;
        Ok(spawn_decoder(response.body, self.incomplete_stream, cancel))
    }
}

/// Races `fut` against the cancellation scope; a scope that is already
/// cancelled wins without polling `fut`.
async fn scoped<T>(cancel: &CancellationToken, fut: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        result = fut => result,
    }
}

fn record_request(_endpoint: &'static str, _kind: &'static str) {
    #[cfg(feature = "metrics")]
    counter!("ollama_client.requests_total", "endpoint" => _endpoint, "type" => _kind)
        .increment(1);
}

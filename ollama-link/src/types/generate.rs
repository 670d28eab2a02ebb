//! Contains all data structures that are particularly used for Ollama Generate API

use std::time::Duration;

use ollama_link_macros::{FromBytes, StreamRecord};
use serde::{Deserialize, Serialize};

use super::shared::{duration_nanos, is_zero};
use super::ModelOptions;
use crate::stream::ResponseStream;

/// Represents a request to the Ollama API for text generation.
///
/// The `stream` flag is owned by the client: [`generate`](crate::OllamaClient::generate)
/// sends `false`, [`generate_stream`](crate::OllamaClient::generate_stream) sends `true`.
#[derive(Serialize, Default, Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    /// The name of the model to use for generation (e.g., "llama3").
    pub model: String,
    /// The primary prompt for the model.
    #[serde(skip_serializing_if = "is_zero")]
    pub prompt: String,
    /// A suffix to be appended after the model response.
    #[serde(skip_serializing_if = "is_zero")]
    pub suffix: String,
    /// Base64-encoded images for multimodal models.
    #[serde(skip_serializing_if = "is_zero")]
    pub images: Vec<String>,
    /// A system message overriding the one in the Modelfile.
    #[serde(skip_serializing_if = "is_zero")]
    pub system: String,
    /// A prompt template overriding the one in the Modelfile.
    #[serde(skip_serializing_if = "is_zero")]
    pub template: String,
    /// Response format, e.g. `"json"`.
    #[serde(skip_serializing_if = "is_zero")]
    pub format: String,
    /// If `true`, the prompt is used verbatim without templating.
    #[serde(skip_serializing_if = "is_zero")]
    pub raw: bool,
    /// How long the model stays loaded after the request (e.g. `"5m"`).
    #[serde(skip_serializing_if = "is_zero")]
    pub keep_alive: String,
    /// Sampling parameters.
    #[serde(skip_serializing_if = "ModelOptions::is_empty")]
    pub options: ModelOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

impl GenerateRequest {
    /// Creates a new [`GenerateRequest`].
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Sets the images for the request. An image should be a Base64-encoded string
    pub fn images(mut self, images: Vec<String>) -> Self {
        self.images = images;
        self
    }

    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = system.into();
        self
    }

    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn raw(mut self, raw: bool) -> Self {
        self.raw = raw;
        self
    }

    pub fn keep_alive(mut self, keep_alive: impl Into<String>) -> Self {
        self.keep_alive = keep_alive.into();
        self
    }

    pub fn options(mut self, options: ModelOptions) -> Self {
        self.options = options;
        self
    }
}

/// A generation response.
///
/// For streaming calls each value carries one fragment in `response`; the last
/// one has `done == true` and the cumulative timings.
#[derive(Deserialize, Serialize, Default, FromBytes, StreamRecord, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GenerateResponse {
    /// The name of the model that generated the response.
    pub model: String,
    /// The timestamp when the response was created.
    pub created_at: String,
    /// The generated text, or a fragment of it when streaming.
    pub response: String,
    /// Indicates if the generation is complete.
    pub done: bool,
    /// The reason why the generation finished (e.g., "stop", "length").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub done_reason: Option<String>,
    /// Encoded conversation state, usable as context in a follow-up request.
    #[serde(skip_serializing_if = "is_zero")]
    pub context: Vec<i64>,
    #[serde(with = "duration_nanos")]
    pub total_duration: Duration,
    #[serde(with = "duration_nanos")]
    pub load_duration: Duration,
    /// The number of tokens in the prompt that were evaluated.
    pub prompt_eval_count: u64,
    #[serde(with = "duration_nanos")]
    pub prompt_eval_duration: Duration,
    /// The number of tokens generated.
    pub eval_count: u64,
    #[serde(with = "duration_nanos")]
    pub eval_duration: Duration,
}

/// A stream of [`GenerateResponse`] fragments.
pub type GenerateStream = ResponseStream<GenerateResponse>;

//! Contains all data structures that are particularly used for Ollama Chat API

use std::time::Duration;

use ollama_link_macros::{FromBytes, StreamRecord};
use serde::{Deserialize, Serialize};

use super::shared::{duration_nanos, is_zero};
use super::{ModelOptions, Role};
use crate::stream::ResponseStream;

/// Represents a chat request to the Ollama API.
///
/// The `stream` flag is owned by the client: [`chat`](crate::OllamaClient::chat)
/// sends `false`, [`chat_stream`](crate::OllamaClient::chat_stream) sends `true`.
#[derive(Serialize, Default, Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// The name of the model to use for the chat completion (e.g., "llama3").
    pub model: String,
    /// The conversation so far.
    pub messages: Vec<ChatMessage>,
    /// Response format, e.g. `"json"`.
    #[serde(skip_serializing_if = "is_zero")]
    pub format: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub keep_alive: String,
    /// Sampling parameters.
    #[serde(skip_serializing_if = "ModelOptions::is_empty")]
    pub options: ModelOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

impl ChatRequest {
    /// Creates a new [`ChatRequest`] with an empty history.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Appends a message to the chat history.
    pub fn add_message(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
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

/// A single message of a conversation, sent in requests and returned in responses.
#[derive(Deserialize, Serialize, Default, Debug, Clone, PartialEq)]
pub struct ChatMessage {
    /// The role of the sender (e.g., `User`, `Assistant`, `System`).
    pub role: Role,
    /// The content of the message, or a fragment of it when streaming.
    #[serde(default)]
    pub content: String,
    /// Base64-encoded images attached to the message.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub images: Vec<String>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            images: Vec::new(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn images(mut self, images: Vec<String>) -> Self {
        self.images = images;
        self
    }
}

/// Represents a chat response from the Ollama API.
///
/// For streaming calls each value carries a message delta; the last one has
/// `done == true` and the cumulative timings.
#[derive(Deserialize, Serialize, Default, FromBytes, StreamRecord, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ChatResponse {
    /// The name of the model that generated the response.
    pub model: String,
    /// The timestamp when the response was created.
    pub created_at: String,
    /// The message content from the model.
    pub message: ChatMessage,
    /// Indicates if the chat completion is complete.
    pub done: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub done_reason: Option<String>,
    #[serde(with = "duration_nanos")]
    pub total_duration: Duration,
    #[serde(with = "duration_nanos")]
    pub load_duration: Duration,
    pub prompt_eval_count: u64,
    #[serde(with = "duration_nanos")]
    pub prompt_eval_duration: Duration,
    pub eval_count: u64,
    #[serde(with = "duration_nanos")]
    pub eval_duration: Duration,
}

/// A stream of [`ChatResponse`] deltas.
pub type ChatStream = ResponseStream<ChatResponse>;

//! Data structures for the Ollama Embed API

use std::time::Duration;

use ollama_link_macros::FromBytes;
use serde::{Deserialize, Serialize};

use super::shared::{duration_nanos, is_zero};
use super::ModelOptions;

/// Requests embeddings for one or more inputs.
#[derive(Serialize, Default, Debug, Clone, PartialEq)]
pub struct EmbedRequest {
    pub model: String,
    /// One embedding is produced per input, in the same order.
    pub input: Vec<String>,
    /// When `false` the server rejects inputs longer than the context window
    /// instead of truncating them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncate: Option<bool>,
    #[serde(skip_serializing_if = "is_zero")]
    pub keep_alive: String,
    #[serde(skip_serializing_if = "ModelOptions::is_empty")]
    pub options: ModelOptions,
}

impl EmbedRequest {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn add_input(mut self, input: impl Into<String>) -> Self {
        self.input.push(input.into());
        self
    }

    pub fn truncate(mut self, truncate: bool) -> Self {
        self.truncate = Some(truncate);
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

#[derive(Deserialize, Serialize, Default, FromBytes, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EmbedResponse {
    pub model: String,
    pub embeddings: Vec<Vec<f64>>,
    #[serde(with = "duration_nanos")]
    pub total_duration: Duration,
    #[serde(with = "duration_nanos")]
    pub load_duration: Duration,
    pub prompt_eval_count: u64,
}

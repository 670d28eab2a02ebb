use ollama_link_macros::FromBytes;
use serde::{Deserialize, Serialize};

use super::shared::is_zero;
use crate::parser::StreamRecord;
use crate::stream::ResponseStream;

/// Represents the response from listing all available models on the Ollama server.
#[derive(Deserialize, Serialize, Default, FromBytes, Debug, Clone, PartialEq)]
pub struct ListModelsResponse {
    /// A list of available Ollama models.
    #[serde(default)]
    pub models: Vec<OllamaModel>,
}

/// Represents a single Ollama model available on the server.
#[derive(Deserialize, Default, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct OllamaModel {
    /// The name of the model (e.g., "llama2").
    pub name: String,
    /// The timestamp when the model was last modified (ISO 8601 format).
    pub modified_at: String,
    /// The size of the model in bytes.
    pub size: u64,
    /// The digest of the model.
    pub digest: String,
    /// Detailed information about the model.
    pub details: ModelDetails,
}

/// Provides detailed information about an Ollama model.
#[derive(Deserialize, Default, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ModelDetails {
    /// The parent model, for derived models.
    pub parent_model: String,
    /// The format of the model.
    pub format: String,
    /// The family of the model (e.g., "llama").
    pub family: String,
    /// A list of families the model belongs to.
    pub families: Vec<String>,
    /// The parameter size of the model (e.g., "7B").
    pub parameter_size: String,
    /// The quantization level of the model (e.g., "Q4_0").
    pub quantization_level: String,
}

/// Represents the response from listing models currently running on the Ollama server.
#[derive(Deserialize, Serialize, Default, FromBytes, Debug, Clone, PartialEq)]
pub struct ListRunningModelsResponse {
    /// A list of currently running Ollama models.
    #[serde(default)]
    pub models: Vec<OllamaRunningModel>,
}

/// Represents a single Ollama model that is currently running.
#[derive(Deserialize, Serialize, Default, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct OllamaRunningModel {
    /// The name of the running model.
    pub name: String,
    pub model: String,
    /// The size of the model in bytes.
    pub size: u64,
    pub digest: String,
    pub details: ModelDetails,
    /// The timestamp when the model is expected to expire (ISO 8601 format).
    pub expires_at: String,
    /// The VRAM usage of the model in bytes.
    pub size_vram: u64,
}

#[derive(Serialize, Default, Debug, Clone, PartialEq)]
pub struct ShowModelRequest {
    pub model: String,
    /// Include large verbose fields such as tokenizer data.
    #[serde(skip_serializing_if = "is_zero")]
    pub verbose: bool,
}

impl ShowModelRequest {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            verbose: false,
        }
    }

    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }
}

#[derive(Deserialize, Serialize, Default, FromBytes, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ShowModelResponse {
    pub modelfile: String,
    pub parameters: String,
    pub template: String,
    pub license: String,
    pub details: ModelDetails,
    pub modified_at: String,
}

#[derive(Serialize, Default, Debug, Clone, PartialEq)]
pub struct DeleteModelRequest {
    pub model: String,
}

impl DeleteModelRequest {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }
}

#[derive(Serialize, Default, Debug, Clone, PartialEq)]
pub struct CopyModelRequest {
    pub source: String,
    pub destination: String,
}

impl CopyModelRequest {
    pub fn new(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }
}

/// Downloads a model from the registry. Shared by pull and push.
#[derive(Serialize, Default, Debug, Clone, PartialEq)]
pub struct PullModelRequest {
    pub model: String,
    /// Allow insecure connections to the registry.
    #[serde(skip_serializing_if = "is_zero")]
    pub insecure: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

impl PullModelRequest {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn insecure(mut self) -> Self {
        self.insecure = true;
        self
    }
}

/// Uploads a model to the registry.
pub type PushModelRequest = PullModelRequest;

#[derive(Serialize, Default, Debug, Clone, PartialEq)]
pub struct CreateModelRequest {
    /// Name of the model to create.
    pub model: String,
    /// Existing model to derive from.
    #[serde(skip_serializing_if = "is_zero")]
    pub from: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub system: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub template: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub license: String,
    /// Quantization type for a non-quantized source model (e.g. `"q4_K_M"`).
    #[serde(skip_serializing_if = "is_zero")]
    pub quantize: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

impl CreateModelRequest {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn from_model(mut self, from: impl Into<String>) -> Self {
        self.from = from.into();
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

    pub fn license(mut self, license: impl Into<String>) -> Self {
        self.license = license.into();
        self
    }

    pub fn quantize(mut self, quantize: impl Into<String>) -> Self {
        self.quantize = quantize.into();
        self
    }
}

/// Progress update streamed by pull, push and create.
///
/// The last update of a successful operation has `status == "success"`.
#[derive(Deserialize, Serialize, Default, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ProgressResponse {
    pub status: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub digest: String,
    /// Total bytes of the layer being transferred.
    #[serde(skip_serializing_if = "is_zero")]
    pub total: u64,
    /// Bytes transferred so far.
    #[serde(skip_serializing_if = "is_zero")]
    pub completed: u64,
}

impl StreamRecord for ProgressResponse {
    fn is_done(&self) -> bool {
        self.status == "success"
    }
}

/// A stream of [`ProgressResponse`] updates.
pub type ProgressStream = ResponseStream<ProgressResponse>;

#[derive(Deserialize, Serialize, Default, FromBytes, Debug, Clone, PartialEq)]
pub struct VersionResponse {
    pub version: String,
}

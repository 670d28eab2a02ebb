//! Contains data structures for requests and responses to the Ollama API.
//!
//! This module defines the various types used to interact with the Ollama server,
//! including chat messages, generation requests, model information, and the
//! HTTP exchange handed to a [`Transport`](crate::transport::Transport).

pub mod chat;
pub mod embed;
pub mod generate;
mod http;
mod models;
mod options;
mod shared;

pub use http::*;
pub use models::*;
pub use options::*;
pub use shared::{FromBytes, OllamaError, Role};

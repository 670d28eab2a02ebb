use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{DecodeError, Result};

#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    #[default]
    User,
    Assistant,
}

/// The `{"error": "..."}` body Ollama sends on failures, both as a whole
/// response and as a frame inside a stream.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct OllamaError {
    pub error: String,
}

/// Decodes a complete response body. Derived with `#[derive(FromBytes)]`.
pub trait FromBytes: Sized {
    fn from_bytes(bytes: Bytes) -> Result<Self>;
}

/// Operations without a response body only fail on an `{"error": ...}` body.
impl FromBytes for () {
    fn from_bytes(bytes: Bytes) -> Result<Self> {
        match serde_json::from_slice::<OllamaError>(&bytes) {
            Ok(err) => Err(DecodeError::Server(err.error).into()),
            Err(_) => Ok(()),
        }
    }
}

/// `skip_serializing_if` predicate: a field left at its default is never sent.
pub(crate) fn is_zero<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

/// Ollama reports durations as integer nanoseconds.
pub(crate) mod duration_nanos {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let nanos = u64::try_from(value.as_nanos()).unwrap_or(u64::MAX);
        serializer.serialize_u64(nanos)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let nanos = u64::deserialize(deserializer)?;
        Ok(Duration::from_nanos(nanos))
    }
}

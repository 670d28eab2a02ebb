//! Serializes typed requests into JSON request bodies.

use bytes::Bytes;
use serde::Serialize;

use crate::{Error, Result};

/// Encodes `request` as compact JSON.
///
/// Field order follows the struct definition, so equal requests always encode
/// to identical bytes. Optional fields left unset are skipped by the request
/// types themselves and never show up as `null` or `0`.
pub fn encode<T: Serialize + ?Sized>(request: &T) -> Result<Bytes> {
    serde_json::to_vec(request)
        .map(Bytes::from)
        .map_err(Error::Encode)
}

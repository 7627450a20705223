//! Codec trait and implementations for serializing wire frames.
//!
//! The relay and the combat clients don't care how frames become bytes;
//! they go through the [`Codec`] trait. [`JsonCodec`] is the default
//! (and what the browser clients speak); a binary codec could slot in
//! without touching the other crates.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// Converts values to and from bytes.
///
/// `Send + Sync + 'static` because codecs are stored in long-lived
/// server state shared across connection tasks.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if serialization fails.
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the bytes are malformed or
    /// don't match the expected type.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] using `serde_json`. Human-readable, which matters here:
/// table events are debugged in browser DevTools as often as in server
/// logs. Behind the `json` feature (enabled by default).
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding wire frames.
///
/// Note that a decode failure on the relay is not fatal to a connection:
/// the handler logs it and skips the frame, per the "malformed input
/// degrades to a no-op" rule.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, a missing field, or an
    /// event name outside the fixed taxonomy.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame parsed but violates a protocol rule.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
}

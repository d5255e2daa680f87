//! The codec seam between typed events and wire bytes

use crate::event::Event;
use thiserror::Error;

/// Codec error
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("encode failed: {0}")]
    Encode(String),

    #[error("decode failed: {0}")]
    Decode(String),
}

/// Encodes events to payload bytes and back.
///
/// A codec must round-trip every event type used by the system:
/// `decode(encode(v))` reproduces a value equal to `v`.
pub trait EventCodec: Clone + Send + Sync + 'static {
    /// Encode an event into its wire payload.
    fn encode<E: Event>(&self, event: &E) -> Result<Vec<u8>, CodecError>;

    /// Decode a wire payload into a concrete event.
    fn decode<E: Event>(&self, payload: &[u8]) -> Result<E, CodecError>;
}

/// JSON wire format; the default codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl EventCodec for JsonCodec {
    fn encode<E: Event>(&self, event: &E) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(event).map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode<E: Event>(&self, payload: &[u8]) -> Result<E, CodecError> {
        serde_json::from_slice(payload).map_err(|e| CodecError::Decode(e.to_string()))
    }
}

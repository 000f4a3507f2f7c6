//! Wire format of price update payloads: magic header + bincode body

use bincode::Options;

use super::PriceFeedMessage;
use crate::shared::errors::OracleError;

/// Leading bytes of every update payload
pub const PAYLOAD_MAGIC: [u8; 4] = *b"OSPU";

/// Fixed-width little-endian body; nothing may follow it
fn body_codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .reject_trailing_bytes()
}

pub fn encode_payload(message: &PriceFeedMessage) -> Vec<u8> {
    let mut bytes = PAYLOAD_MAGIC.to_vec();
    // Serializing a fixed-shape struct into a Vec can't fail
    bytes.extend(body_codec().serialize(message).unwrap_or_default());
    bytes
}

pub fn decode_payload(bytes: &[u8]) -> Result<PriceFeedMessage, OracleError> {
    let body = bytes
        .strip_prefix(&PAYLOAD_MAGIC[..])
        .ok_or_else(|| OracleError::MalformedPayload("missing magic header".to_string()))?;
    body_codec()
        .deserialize(body)
        .map_err(|e| OracleError::MalformedPayload(e.to_string()))
}

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::Codec;
use crate::error::{Error, Result};
use crate::transport::Frame;

/// JSON codec for textual messages
///
/// Encodes into text frames; decodes from either frame type as long as the
/// payload is UTF-8 JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Frame> {
        serde_json::to_string(value)
            .map(Frame::Text)
            .map_err(|e| Error::Encode(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(&self, frame: &Frame) -> Result<T> {
        serde_json::from_slice(frame.as_bytes()).map_err(|e| Error::Decode(e.to_string()))
    }
}

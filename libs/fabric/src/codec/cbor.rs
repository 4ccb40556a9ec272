use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::Codec;
use crate::error::{Error, Result};
use crate::transport::Frame;

/// CBOR codec for compact binary messages
#[derive(Debug, Clone, Copy, Default)]
pub struct CborCodec;

impl Codec for CborCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Frame> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf).map_err(|e| Error::Encode(e.to_string()))?;
        Ok(Frame::Binary(buf))
    }

    fn decode<T: DeserializeOwned>(&self, frame: &Frame) -> Result<T> {
        ciborium::from_reader(frame.as_bytes()).map_err(|e| Error::Decode(e.to_string()))
    }
}

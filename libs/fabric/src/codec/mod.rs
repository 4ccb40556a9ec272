use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::transport::Frame;

pub mod cbor;
pub mod json;

pub use self::cbor::CborCodec;
pub use self::json::JsonCodec;

/// Codec trait for serializing and deserializing messages
pub trait Codec: Send + Sync {
    /// Encode a value into a transport frame
    fn encode<T: Serialize>(&self, value: &T) -> Result<Frame>;

    /// Decode a transport frame into a value
    fn decode<T: DeserializeOwned>(&self, frame: &Frame) -> Result<T>;
}

/// Codec chosen at runtime by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CodecKind {
    #[default]
    Cbor,
    Json,
}

impl CodecKind {
    pub fn name(&self) -> &'static str {
        match self {
            CodecKind::Cbor => "cbor",
            CodecKind::Json => "json",
        }
    }
}

impl fmt::Display for CodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CodecKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim();
        if name.eq_ignore_ascii_case("cbor") {
            Ok(CodecKind::Cbor)
        } else if name.eq_ignore_ascii_case("json") {
            Ok(CodecKind::Json)
        } else {
            Err(Error::Configuration(format!(
                "unknown codec {:?}, expected \"cbor\" or \"json\"",
                s
            )))
        }
    }
}

impl TryFrom<String> for CodecKind {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<CodecKind> for String {
    fn from(kind: CodecKind) -> Self {
        kind.name().to_string()
    }
}

impl Codec for CodecKind {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Frame> {
        match self {
            CodecKind::Cbor => CborCodec.encode(value),
            CodecKind::Json => JsonCodec.encode(value),
        }
    }

    fn decode<T: DeserializeOwned>(&self, frame: &Frame) -> Result<T> {
        match self {
            CodecKind::Cbor => CborCodec.decode(frame),
            CodecKind::Json => JsonCodec.decode(frame),
        }
    }
}

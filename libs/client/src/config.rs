use std::time::Duration;

use remote_api_fabric::{CodecKind, CorrelatorOptions, OverlapPolicy};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::proxy::DEFAULT_INTROSPECTION_FUNCTION;

/// Client settings
///
/// Every field has a default, so partial documents deserialize:
///
/// ```
/// use remote_api_client::ClientConfig;
///
/// let config = ClientConfig::from_json(r#"{"port": 23051, "codec": "json"}"#).unwrap();
/// assert_eq!(config.host, "localhost");
/// assert_eq!(config.url(), "ws://localhost:23051");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    /// `"cbor"` or `"json"`; checked by [`ClientConfig::validate`]
    pub codec: String,
    /// Reserved function answering with the manifest of an object
    pub introspection_function: String,
    pub request_timeout_ms: Option<u64>,
    pub overlap: OverlapPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 23050,
            codec: CodecKind::Cbor.name().to_string(),
            introspection_function: DEFAULT_INTROSPECTION_FUNCTION.to_string(),
            request_timeout_ms: None,
            overlap: OverlapPolicy::Queue,
        }
    }
}

impl ClientConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Configuration(e.to_string()))
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_codec(mut self, codec: impl Into<String>) -> Self {
        self.codec = codec.into();
        self
    }

    pub fn with_introspection_function(mut self, name: impl Into<String>) -> Self {
        self.introspection_function = name.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn with_overlap(mut self, overlap: OverlapPolicy) -> Self {
        self.overlap = overlap;
        self
    }

    /// Check the settings and resolve the codec
    pub fn validate(&self) -> Result<CodecKind> {
        if self.host.trim().is_empty() {
            return Err(Error::Configuration("host must not be empty".to_string()));
        }
        if self.introspection_function.trim().is_empty() {
            return Err(Error::Configuration(
                "introspection function must not be empty".to_string(),
            ));
        }
        Ok(self.codec.parse::<CodecKind>()?)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    pub fn correlator_options(&self) -> CorrelatorOptions {
        CorrelatorOptions {
            overlap: self.overlap,
            request_timeout: self.request_timeout(),
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}:{}", self.host, self.port)
    }
}

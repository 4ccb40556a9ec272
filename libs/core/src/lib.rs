//! Remote API Core - Protocol data model
//!
//! Dynamic [`Value`]s, the call and reply envelopes exchanged with the server,
//! and the introspection manifest [`Descriptor`] with its validation rules.
//!
//! # Example
//!
//! ```
//! use remote_api_core::{Descriptor, ReplyEnvelope, Value};
//!
//! let reply: ReplyEnvelope = serde_json::from_str(r#"{"success":true,"ret":["pong"]}"#).unwrap();
//! assert_eq!(reply.into_result("root.ping").unwrap(), vec![Value::from("pong")]);
//!
//! let manifest: Value = serde_json::from_str(r#"{"ping":{"func":null}}"#).unwrap();
//! let members = Descriptor::parse_manifest("root", &manifest).unwrap();
//! assert!(members["ping"].is_function());
//! ```

pub mod descriptor;
pub mod envelope;
pub mod error;
pub mod value;

// Re-exports for convenience
pub use descriptor::Descriptor;
pub use envelope::{CallEnvelope, ReplyEnvelope};
pub use error::{ApplicationError, Error, ManifestError, Result};
pub use value::Value;

//! Remote API Fabric - Transport, codec and request correlation layer
//!
//! Provides transport abstractions (WebSocket, TCP, in-memory), the `cbor`
//! and `json` codecs, and a [`Correlator`] pairing each request with the
//! reply that follows it on a connection that carries no request ids.
//!
//! # Example
//!
//! ```no_run
//! use remote_api_fabric::{Channel, CodecKind, CorrelatorOptions};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Serialize)]
//! struct Ping { func: String, args: Vec<u32> }
//!
//! #[derive(Deserialize)]
//! struct Pong { success: bool }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let codec: CodecKind = "json".parse()?;
//! let channel = Channel::websocket("localhost", 23050, codec, CorrelatorOptions::default()).await?;
//!
//! let req = Ping { func: "sim.ping".to_string(), args: vec![] };
//! let resp: Pong = channel.request(&req).await?;
//! assert!(resp.success);
//! channel.close().await;
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod codec;
pub mod correlator;
pub mod error;
pub mod transport;

// Re-exports for convenience
pub use channel::Channel;
pub use codec::{Codec, CodecKind};
pub use correlator::{Correlator, CorrelatorOptions, OverlapPolicy};
pub use error::{Error, Result};
pub use transport::{Frame, Transport};
pub use tokio_util::sync::CancellationToken;

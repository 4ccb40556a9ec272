//! Remote API Client - Call functions on a remote API server
//!
//! Connects over WebSocket, sends `{"func", "args"}` calls in the configured
//! codec and builds local proxy objects from the server's manifests.
//!
//! # Example
//!
//! ```no_run
//! use remote_api_client::{ClientConfig, RemoteApiClient, Value};
//!
//! # async fn example() -> remote_api_client::Result<()> {
//! let client = RemoteApiClient::connect(ClientConfig::default()).await?;
//!
//! let sim = client.get_object("sim").await?;
//! println!("server version {:?}", sim.constant("version"));
//!
//! let ret = sim.call("ping", vec![]).await?;
//! assert_eq!(ret, vec![Value::from("pong")]);
//!
//! client.close().await;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod invoker;
pub mod proxy;

pub use client::RemoteApiClient;
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use invoker::Invoker;
pub use proxy::{ProxyBuilder, ProxyNode, ProxyObject, RemoteFunction};

pub use remote_api_core::{Descriptor, ReplyEnvelope, Value};
pub use remote_api_fabric::{CancellationToken, CodecKind, OverlapPolicy};

use std::net::SocketAddr;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::codec::Codec;
use crate::correlator::{Correlator, CorrelatorOptions};
use crate::error::Result;
use crate::transport::{TcpTransport, Transport, WebSocketTransport};

/// High-level request channel
///
/// Combines a correlator and a codec: each request is encoded, paired with
/// exactly one reply frame, and the reply decoded. Clones share the
/// underlying connection.
#[derive(Clone)]
pub struct Channel<C> {
    correlator: Correlator,
    codec: C,
}

impl<C: Codec> Channel<C> {
    /// Create a channel from an existing transport
    pub fn from_transport(
        transport: impl Transport + 'static,
        codec: C,
        options: CorrelatorOptions,
    ) -> Self {
        Self {
            correlator: Correlator::spawn(transport, options),
            codec,
        }
    }

    /// Open a TCP channel
    pub async fn tcp(addr: SocketAddr, codec: C, options: CorrelatorOptions) -> Result<Self> {
        let transport = TcpTransport::connect(addr).await?;
        Ok(Self::from_transport(transport, codec, options))
    }

    /// Open a WebSocket channel to `ws://{host}:{port}`
    pub async fn websocket(
        host: &str,
        port: u16,
        codec: C,
        options: CorrelatorOptions,
    ) -> Result<Self> {
        let transport = WebSocketTransport::connect(host, port).await?;
        Ok(Self::from_transport(transport, codec, options))
    }

    /// Send a request and decode the reply paired with it
    pub async fn request<Req, Res>(&self, request: &Req) -> Result<Res>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        let frame = self.codec.encode(request)?;
        let reply = self.correlator.request(frame).await?;
        self.codec.decode(&reply)
    }

    /// Like [`request`](Self::request), abandoned once `cancel` fires
    pub async fn request_with_cancel<Req, Res>(
        &self,
        request: &Req,
        cancel: &CancellationToken,
    ) -> Result<Res>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        let frame = self.codec.encode(request)?;
        let reply = self.correlator.request_with_cancel(frame, cancel).await?;
        self.codec.decode(&reply)
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    pub fn correlator(&self) -> &Correlator {
        &self.correlator
    }

    pub fn is_closed(&self) -> bool {
        self.correlator.is_closed()
    }

    /// Close the channel
    pub async fn close(&self) {
        self.correlator.close().await
    }
}

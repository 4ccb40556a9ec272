use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};

use crate::error::{Error, Result};
use crate::transport::framed::{FramedReader, FramedWriter};
use crate::transport::{Frame, FrameSink, FrameSource, Transport, TransportListener};

/// TCP transport with length-prefix framing
///
/// Messages are sent with a 4-byte big-endian length prefix. Frames read
/// back are always [`Frame::Binary`].
pub struct TcpTransport {
    reader: FramedReader<OwnedReadHalf>,
    writer: FramedWriter<OwnedWriteHalf>,
    peer_addr: SocketAddr,
}

impl TcpTransport {
    /// Connect to a remote TCP address with no timeouts
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        Self::builder().address(addr).connect().await
    }

    /// Create a builder for configuring the transport
    pub fn builder() -> TcpTransportBuilder {
        TcpTransportBuilder::new()
    }

    /// Create from an existing TcpStream
    pub fn from_stream(stream: TcpStream) -> Result<Self> {
        Self::with_send_timeout(stream, None)
    }

    fn with_send_timeout(stream: TcpStream, send_timeout: Option<Duration>) -> Result<Self> {
        let peer_addr = stream.peer_addr()?;
        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: FramedReader::new(read_half),
            writer: FramedWriter::new(write_half).with_send_timeout(send_timeout),
            peer_addr,
        })
    }

    /// Get the remote address of this connection
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }
}

#[async_trait::async_trait]
impl Transport for TcpTransport {
    async fn send(&mut self, frame: Frame) -> Result<()> {
        self.writer.write_frame(frame.as_bytes()).await
    }

    async fn receive(&mut self) -> Result<Frame> {
        self.reader.read_frame().await.map(Frame::Binary)
    }

    async fn close(&mut self) -> Result<()> {
        self.writer.shutdown().await
    }

    fn split(self: Box<Self>) -> (Box<dyn FrameSink>, Box<dyn FrameSource>) {
        (Box::new(self.writer), Box::new(self.reader))
    }
}

/// TCP listener for accepting incoming connections
pub struct TcpTransportListener {
    listener: TcpListener,
}

impl TcpTransportListener {
    /// Bind to a local address
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener })
    }

    /// Get the local address this listener is bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr().map_err(Into::into)
    }
}

#[async_trait::async_trait]
impl TransportListener for TcpTransportListener {
    type Transport = TcpTransport;

    async fn accept(&self) -> Result<Self::Transport> {
        let (stream, addr) = self.listener.accept().await?;
        tracing::debug!(%addr, "accepted tcp connection");
        TcpTransport::from_stream(stream)
    }

    // Tokio's TcpListener has no explicit close; it is released on drop
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Builder for configuring TCP transport
#[derive(Default)]
pub struct TcpTransportBuilder {
    address: Option<SocketAddr>,
    connect_timeout: Option<Duration>,
    send_timeout: Option<Duration>,
}

impl TcpTransportBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the address to connect to
    pub fn address(mut self, addr: SocketAddr) -> Self {
        self.address = Some(addr);
        self
    }

    /// Set the connection timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the send timeout
    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = Some(timeout);
        self
    }

    /// Connect with the configured settings
    pub async fn connect(self) -> Result<TcpTransport> {
        let addr = self
            .address
            .ok_or_else(|| Error::Configuration("Address not set".to_string()))?;

        let connect_op = TcpStream::connect(addr);

        let stream = if let Some(timeout) = self.connect_timeout {
            tokio::time::timeout(timeout, connect_op)
                .await
                .map_err(|_| Error::Custom("Connect timeout exceeded".to_string()))??
        } else {
            connect_op.await?
        };

        tracing::debug!(%addr, "tcp transport connected");
        TcpTransport::with_send_timeout(stream, self.send_timeout)
    }
}

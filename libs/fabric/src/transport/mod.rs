use crate::error::Result;

pub mod framed;
pub mod memory;
pub mod tcp;
pub mod websocket;

pub use self::framed::{FramedReader, FramedWriter, MAX_FRAME_LEN};
pub use self::memory::MemoryTransport;
pub use self::tcp::{TcpTransport, TcpTransportBuilder, TcpTransportListener};
pub use self::websocket::{WebSocketListener, WebSocketTransport};

/// One transport-level message
///
/// Text frames carry textual codecs (JSON), binary frames everything else.
/// Stream transports that cannot tell the two apart deliver `Binary`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

impl Frame {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Frame::Text(text) => text.as_bytes(),
            Frame::Binary(bytes) => bytes,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Frame::Text(text) => text.into_bytes(),
            Frame::Binary(bytes) => bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Transport trait for sending and receiving frames
///
/// Each transport instance represents a single connection.
#[async_trait::async_trait]
pub trait Transport: Send {
    /// Send a frame over the transport
    async fn send(&mut self, frame: Frame) -> Result<()>;

    /// Receive the next frame from the transport
    async fn receive(&mut self) -> Result<Frame>;

    /// Close the transport connection
    async fn close(&mut self) -> Result<()>;

    /// Separate the write and read directions so they can be driven independently
    fn split(self: Box<Self>) -> (Box<dyn FrameSink>, Box<dyn FrameSource>);
}

/// Write half of a split transport
#[async_trait::async_trait]
pub trait FrameSink: Send {
    async fn send(&mut self, frame: Frame) -> Result<()>;

    async fn close(&mut self) -> Result<()>;
}

/// Read half of a split transport
#[async_trait::async_trait]
pub trait FrameSource: Send {
    async fn receive(&mut self) -> Result<Frame>;
}

/// Listener accepting incoming transport connections
#[async_trait::async_trait]
pub trait TransportListener: Send + Sync {
    type Transport: Transport;

    async fn accept(&self) -> Result<Self::Transport>;

    async fn close(&mut self) -> Result<()>;
}

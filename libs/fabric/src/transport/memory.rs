use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::transport::{Frame, FrameSink, FrameSource, Transport};

/// In-process transport over a pair of unbounded channels
///
/// Closing or dropping one end makes the other end's `receive` fail with
/// [`Error::ConnectionClosed`] once buffered frames are drained.
pub struct MemoryTransport {
    sink: MemorySink,
    source: MemorySource,
}

impl MemoryTransport {
    /// Create two connected ends
    pub fn pair() -> (MemoryTransport, MemoryTransport) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();

        let a = MemoryTransport {
            sink: MemorySink { tx: Some(a_tx) },
            source: MemorySource { rx: b_rx },
        };
        let b = MemoryTransport {
            sink: MemorySink { tx: Some(b_tx) },
            source: MemorySource { rx: a_rx },
        };
        (a, b)
    }
}

#[async_trait::async_trait]
impl Transport for MemoryTransport {
    async fn send(&mut self, frame: Frame) -> Result<()> {
        self.sink.send(frame).await
    }

    async fn receive(&mut self) -> Result<Frame> {
        self.source.receive().await
    }

    async fn close(&mut self) -> Result<()> {
        self.sink.close().await
    }

    fn split(self: Box<Self>) -> (Box<dyn FrameSink>, Box<dyn FrameSource>) {
        (Box::new(self.sink), Box::new(self.source))
    }
}

struct MemorySink {
    tx: Option<mpsc::UnboundedSender<Frame>>,
}

#[async_trait::async_trait]
impl FrameSink for MemorySink {
    async fn send(&mut self, frame: Frame) -> Result<()> {
        let tx = self.tx.as_ref().ok_or(Error::ConnectionClosed)?;
        tx.send(frame).map_err(|_| Error::ConnectionClosed)
    }

    async fn close(&mut self) -> Result<()> {
        self.tx = None;
        Ok(())
    }
}

struct MemorySource {
    rx: mpsc::UnboundedReceiver<Frame>,
}

#[async_trait::async_trait]
impl FrameSource for MemorySource {
    async fn receive(&mut self) -> Result<Frame> {
        self.rx.recv().await.ok_or(Error::ConnectionClosed)
    }
}

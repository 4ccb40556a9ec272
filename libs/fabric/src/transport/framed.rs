use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};
use crate::transport::{Frame, FrameSink, FrameSource};

/// Largest frame accepted in either direction (100 MiB)
pub const MAX_FRAME_LEN: usize = 100 * 1024 * 1024;

/// Writes frames as a 4-byte big-endian length prefix followed by the payload
pub struct FramedWriter<W> {
    inner: W,
    send_timeout: Option<Duration>,
}

impl<W: AsyncWrite + Unpin + Send> FramedWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            send_timeout: None,
        }
    }

    pub fn with_send_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.send_timeout = timeout;
        self
    }

    pub async fn write_frame(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > MAX_FRAME_LEN {
            return Err(Error::InvalidFrame(format!(
                "Message too large: {} bytes",
                bytes.len()
            )));
        }

        let timeout = self.send_timeout;
        let inner = &mut self.inner;
        let send_op = async move {
            inner
                .write_u32(bytes.len() as u32)
                .await
                .map_err(closed_on_eof)?;
            inner.write_all(bytes).await.map_err(closed_on_eof)?;
            inner.flush().await.map_err(closed_on_eof)?;
            Ok::<(), Error>(())
        };

        match timeout {
            Some(timeout) => tokio::time::timeout(timeout, send_op)
                .await
                .map_err(|_| Error::Custom("Send timeout exceeded".to_string()))?,
            None => send_op.await,
        }
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        self.inner.shutdown().await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl<W: AsyncWrite + Unpin + Send> FrameSink for FramedWriter<W> {
    async fn send(&mut self, frame: Frame) -> Result<()> {
        self.write_frame(frame.as_bytes()).await
    }

    async fn close(&mut self) -> Result<()> {
        self.shutdown().await
    }
}

/// Reads length-prefixed frames written by [`FramedWriter`]
pub struct FramedReader<R> {
    inner: R,
}

impl<R: AsyncRead + Unpin + Send> FramedReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub async fn read_frame(&mut self) -> Result<Vec<u8>> {
        let len = self.inner.read_u32().await.map_err(closed_on_eof)? as usize;

        if len > MAX_FRAME_LEN {
            return Err(Error::InvalidFrame(format!(
                "Message too large: {} bytes",
                len
            )));
        }

        let mut buf = vec![0u8; len];
        self.inner.read_exact(&mut buf).await.map_err(closed_on_eof)?;
        Ok(buf)
    }
}

#[async_trait::async_trait]
impl<R: AsyncRead + Unpin + Send> FrameSource for FramedReader<R> {
    async fn receive(&mut self) -> Result<Frame> {
        self.read_frame().await.map(Frame::Binary)
    }
}

fn closed_on_eof(e: std::io::Error) -> Error {
    use std::io::ErrorKind;

    match e.kind() {
        ErrorKind::UnexpectedEof | ErrorKind::ConnectionReset | ErrorKind::BrokenPipe => {
            Error::ConnectionClosed
        }
        _ => e.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frames_keep_their_boundaries() {
        let (client, server) = tokio::io::duplex(64);
        let mut writer = FramedWriter::new(client);
        let mut reader = FramedReader::new(server);

        writer.write_frame(b"first").await.unwrap();
        writer.write_frame(b"").await.unwrap();
        writer.write_frame(b"third").await.unwrap();

        assert_eq!(reader.read_frame().await.unwrap(), b"first");
        assert_eq!(reader.read_frame().await.unwrap(), b"");
        assert_eq!(reader.read_frame().await.unwrap(), b"third");
    }

    #[tokio::test]
    async fn eof_mid_header_is_connection_closed() {
        let (mut client, server) = tokio::io::duplex(64);
        let mut reader = FramedReader::new(server);

        client.write_all(&[0, 0]).await.unwrap();
        drop(client);

        assert!(matches!(reader.read_frame().await, Err(Error::ConnectionClosed)));
    }
}

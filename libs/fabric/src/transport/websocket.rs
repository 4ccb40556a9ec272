use std::net::SocketAddr;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, Stream, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::error::{Error, Result};
use crate::transport::{Frame, FrameSink, FrameSource, Transport, TransportListener};

/// WebSocket transport
///
/// Text and binary messages map one-to-one onto [`Frame`]s. Control
/// messages are handled by tungstenite and never surface; a close message
/// is reported as [`Error::ConnectionClosed`].
pub struct WebSocketTransport<S> {
    stream: WebSocketStream<S>,
}

impl WebSocketTransport<MaybeTlsStream<TcpStream>> {
    /// Connect to `ws://{host}:{port}`
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        Self::connect_url(&format!("ws://{}:{}", host, port)).await
    }

    pub async fn connect_url(url: &str) -> Result<Self> {
        let (stream, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(ws_error)?;
        tracing::debug!(url, "websocket transport connected");
        Ok(Self::from_stream(stream))
    }
}

impl<S> WebSocketTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Wrap an already negotiated websocket stream
    pub fn from_stream(stream: WebSocketStream<S>) -> Self {
        Self { stream }
    }
}

#[async_trait::async_trait]
impl<S> Transport for WebSocketTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn send(&mut self, frame: Frame) -> Result<()> {
        self.stream.send(to_message(frame)).await.map_err(ws_error)
    }

    async fn receive(&mut self) -> Result<Frame> {
        next_frame(&mut self.stream).await
    }

    async fn close(&mut self) -> Result<()> {
        self.stream.close(None).await.map_err(ws_error)
    }

    fn split(self: Box<Self>) -> (Box<dyn FrameSink>, Box<dyn FrameSource>) {
        let (sink, stream) = self.stream.split();
        (
            Box::new(WebSocketSink { sink }),
            Box::new(WebSocketSource { stream }),
        )
    }
}

struct WebSocketSink<S> {
    sink: SplitSink<WebSocketStream<S>, Message>,
}

#[async_trait::async_trait]
impl<S> FrameSink for WebSocketSink<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn send(&mut self, frame: Frame) -> Result<()> {
        self.sink.send(to_message(frame)).await.map_err(ws_error)
    }

    async fn close(&mut self) -> Result<()> {
        self.sink.close().await.map_err(ws_error)
    }
}

struct WebSocketSource<S> {
    stream: SplitStream<WebSocketStream<S>>,
}

#[async_trait::async_trait]
impl<S> FrameSource for WebSocketSource<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn receive(&mut self) -> Result<Frame> {
        next_frame(&mut self.stream).await
    }
}

/// Listener performing the websocket handshake on accepted TCP connections
pub struct WebSocketListener {
    listener: TcpListener,
}

impl WebSocketListener {
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr().map_err(Into::into)
    }
}

#[async_trait::async_trait]
impl TransportListener for WebSocketListener {
    type Transport = WebSocketTransport<TcpStream>;

    async fn accept(&self) -> Result<Self::Transport> {
        let (stream, addr) = self.listener.accept().await?;
        let ws = tokio_tungstenite::accept_async(stream)
            .await
            .map_err(ws_error)?;
        tracing::debug!(%addr, "accepted websocket connection");
        Ok(WebSocketTransport::from_stream(ws))
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

fn to_message(frame: Frame) -> Message {
    match frame {
        Frame::Text(text) => Message::Text(text.into()),
        Frame::Binary(bytes) => Message::Binary(bytes.into()),
    }
}

async fn next_frame<St>(stream: &mut St) -> Result<Frame>
where
    St: Stream<Item = std::result::Result<Message, tungstenite::Error>> + Unpin,
{
    loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => return Ok(Frame::Text(text.as_str().to_owned())),
            Some(Ok(Message::Binary(bytes))) => return Ok(Frame::Binary(bytes.to_vec())),
            Some(Ok(Message::Close(_))) | None => return Err(Error::ConnectionClosed),
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(ws_error(e)),
        }
    }
}

fn ws_error(e: tungstenite::Error) -> Error {
    match e {
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
            Error::ConnectionClosed
        }
        tungstenite::Error::Io(e) => e.into(),
        other => Error::Protocol(other.to_string()),
    }
}

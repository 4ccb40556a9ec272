//! Request/reply pairing over a message transport
//!
//! The protocol carries no request identifiers: the next inbound frame is the
//! reply to the oldest unanswered request. The correlator makes that safe by
//! owning the transport in a single driver task and keeping at most one
//! request on the wire at a time. Everything else queues (or is rejected,
//! see [`OverlapPolicy`]) until the reply for the outstanding request has
//! been read.
//!
//! A caller that gives up early (cancellation, timeout, dropped future)
//! releases its slot lazily: a request that never reached the wire is
//! skipped, and a reply to one that did is read and discarded so the next
//! exchange still lines up.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::transport::{Frame, FrameSink, FrameSource, Transport};

/// Buffered inbound frames between the reader task and the driver
const INBOUND_BUFFER: usize = 64;

/// What to do with a request issued while another one is outstanding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlapPolicy {
    /// Wait for the outstanding exchange, then send
    #[default]
    Queue,
    /// Fail immediately with [`Error::Busy`]
    Reject,
}

#[derive(Debug, Clone, Default)]
pub struct CorrelatorOptions {
    pub overlap: OverlapPolicy,
    /// Upper bound on the wait for a reply, queueing time included
    pub request_timeout: Option<Duration>,
}

impl CorrelatorOptions {
    pub fn overlap(mut self, overlap: OverlapPolicy) -> Self {
        self.overlap = overlap;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }
}

struct PendingRequest {
    frame: Frame,
    reply: oneshot::Sender<Result<Frame>>,
}

/// Handle to a transport driven by a correlator task
///
/// Cheap to clone; all clones share the same connection. The connection is
/// closed by [`Correlator::close`], when the peer goes away, or once every
/// handle has been dropped.
#[derive(Clone)]
pub struct Correlator {
    requests: mpsc::UnboundedSender<PendingRequest>,
    outstanding: Arc<AtomicUsize>,
    shutdown: CancellationToken,
    closed: CancellationToken,
    options: CorrelatorOptions,
}

impl Correlator {
    /// Take ownership of `transport` and start driving it
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(transport: impl Transport + 'static, options: CorrelatorOptions) -> Self {
        let (sink, source) = Box::new(transport).split();
        let (requests_tx, requests_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_BUFFER);

        let outstanding = Arc::new(AtomicUsize::new(0));
        let shutdown = CancellationToken::new();
        let closed = CancellationToken::new();

        let reader = tokio::spawn(read_frames(source, inbound_tx));
        let driver = Driver {
            sink,
            inbound: inbound_rx,
            requests: requests_rx,
            outstanding: outstanding.clone(),
            shutdown: shutdown.clone(),
            closed: closed.clone(),
            reader,
        };
        tokio::spawn(driver.run());

        Self {
            requests: requests_tx,
            outstanding,
            shutdown,
            closed,
            options,
        }
    }

    /// Send `frame` and wait for the frame that answers it
    pub async fn request(&self, frame: Frame) -> Result<Frame> {
        self.exchange(frame, None).await
    }

    /// Like [`request`](Self::request), failing with [`Error::Cancelled`] once `cancel` fires
    pub async fn request_with_cancel(
        &self,
        frame: Frame,
        cancel: &CancellationToken,
    ) -> Result<Frame> {
        self.exchange(frame, Some(cancel)).await
    }

    /// Number of requests queued or awaiting a reply, abandoned ones included
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Close the transport and fail everything still outstanding
    pub async fn close(&self) {
        self.shutdown.cancel();
        self.closed.cancelled().await;
    }

    async fn exchange(&self, frame: Frame, cancel: Option<&CancellationToken>) -> Result<Frame> {
        if cancel.is_some_and(|token| token.is_cancelled()) {
            return Err(Error::Cancelled);
        }
        if self.is_closed() {
            return Err(Error::ConnectionClosed);
        }
        self.reserve_slot()?;

        let (reply_tx, reply_rx) = oneshot::channel();
        let request = PendingRequest {
            frame,
            reply: reply_tx,
        };
        if self.requests.send(request).is_err() {
            release(&self.outstanding);
            return Err(Error::ConnectionClosed);
        }

        // The driver drops the sender only when it shuts down
        let reply = async { reply_rx.await.unwrap_or(Err(Error::ConnectionClosed)) };
        let bounded = async {
            match self.options.request_timeout {
                Some(timeout) => tokio::time::timeout(timeout, reply)
                    .await
                    .unwrap_or(Err(Error::Timeout)),
                None => reply.await,
            }
        };

        match cancel {
            Some(token) => tokio::select! {
                biased;
                result = bounded => result,
                _ = token.cancelled() => Err(Error::Cancelled),
            },
            None => bounded.await,
        }
    }

    fn reserve_slot(&self) -> Result<()> {
        match self.options.overlap {
            OverlapPolicy::Queue => {
                self.outstanding.fetch_add(1, Ordering::AcqRel);
                Ok(())
            }
            OverlapPolicy::Reject => self
                .outstanding
                .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
                .map(|_| ())
                .map_err(|_| Error::Busy),
        }
    }
}

// Saturating: the driver resets the count to zero when it shuts down
fn release(outstanding: &AtomicUsize) {
    let _ = outstanding.fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
}

/// Forward inbound frames to the driver until the transport fails
async fn read_frames(mut source: Box<dyn FrameSource>, inbound: mpsc::Sender<Result<Frame>>) {
    loop {
        let next = source.receive().await;
        let failed = next.is_err();
        if inbound.send(next).await.is_err() || failed {
            return;
        }
    }
}

struct Driver {
    sink: Box<dyn FrameSink>,
    inbound: mpsc::Receiver<Result<Frame>>,
    requests: mpsc::UnboundedReceiver<PendingRequest>,
    outstanding: Arc<AtomicUsize>,
    shutdown: CancellationToken,
    closed: CancellationToken,
    reader: JoinHandle<()>,
}

impl Driver {
    async fn run(mut self) {
        let mut awaiting: Option<oneshot::Sender<Result<Frame>>> = None;

        let failure = loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    if let Err(e) = self.sink.close().await {
                        tracing::debug!("error while closing transport: {}", e);
                    }
                    tracing::debug!("correlator closed");
                    break Error::ConnectionClosed;
                }

                inbound = self.inbound.recv() => match inbound {
                    Some(Ok(frame)) => match awaiting.take() {
                        Some(reply) => {
                            tracing::debug!(bytes = frame.len(), "reply received");
                            self.release();
                            if reply.send(Ok(frame)).is_err() {
                                tracing::warn!("discarding reply to abandoned request");
                            }
                        }
                        None => {
                            tracing::warn!(bytes = frame.len(), "dropping unsolicited frame");
                        }
                    },
                    Some(Err(e)) => break e,
                    None => break Error::ConnectionClosed,
                },

                request = self.requests.recv(), if awaiting.is_none() => match request {
                    Some(request) => {
                        if request.reply.is_closed() {
                            tracing::debug!("skipping request abandoned before sending");
                            self.release();
                            continue;
                        }
                        tracing::debug!(bytes = request.frame.len(), "sending request");
                        match self.sink.send(request.frame).await {
                            Ok(()) => awaiting = Some(request.reply),
                            Err(e) => {
                                // A partial write leaves the stream unusable
                                let _ = request.reply.send(Err(e));
                                self.release();
                                break Error::ConnectionClosed;
                            }
                        }
                    }
                    None => {
                        let _ = self.sink.close().await;
                        tracing::debug!("all correlator handles dropped");
                        break Error::ConnectionClosed;
                    }
                },
            }
        };

        self.fail_all(awaiting, failure);
    }

    fn release(&self) {
        release(&self.outstanding);
    }

    fn fail_all(mut self, awaiting: Option<oneshot::Sender<Result<Frame>>>, failure: Error) {
        self.reader.abort();
        self.closed.cancel();

        match &failure {
            Error::ConnectionClosed => tracing::debug!("transport closed"),
            e => tracing::warn!("transport failed: {}", e),
        }

        if let Some(reply) = awaiting {
            let _ = reply.send(Err(failure));
        }

        self.requests.close();
        while let Ok(request) = self.requests.try_recv() {
            let _ = request.reply.send(Err(Error::ConnectionClosed));
        }
        self.outstanding.store(0, Ordering::Release);
    }
}

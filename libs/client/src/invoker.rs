use remote_api_core::{CallEnvelope, ReplyEnvelope, Value};
use remote_api_fabric::{CancellationToken, Channel, CodecKind};

use crate::error::Result;

/// Issues function calls over a channel
///
/// Cheap to clone; clones share the connection and its request queue.
#[derive(Clone)]
pub struct Invoker {
    channel: Channel<CodecKind>,
}

impl Invoker {
    pub fn new(channel: Channel<CodecKind>) -> Self {
        Self { channel }
    }

    /// Call `function` and return the raw reply envelope
    ///
    /// Application failures are logged and returned as
    /// [`ReplyEnvelope::Failure`], not as an error.
    pub async fn call_reply(&self, function: &str, args: Vec<Value>) -> Result<ReplyEnvelope> {
        self.exchange(function, args, None).await
    }

    /// Call `function` and return its ordered return values
    pub async fn call(&self, function: &str, args: Vec<Value>) -> Result<Vec<Value>> {
        let reply = self.exchange(function, args, None).await?;
        Ok(reply.into_result(function)?)
    }

    /// Like [`call`](Self::call), abandoned once `cancel` fires
    pub async fn call_with_cancel(
        &self,
        function: &str,
        args: Vec<Value>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Value>> {
        let reply = self.exchange(function, args, Some(cancel)).await?;
        Ok(reply.into_result(function)?)
    }

    /// Call `function` and hand the outcome to exactly one handler
    ///
    /// `on_result` receives the return values on success, `on_error` the
    /// server's message on failure. Transport errors are returned instead.
    pub async fn call_with<R, E>(
        &self,
        function: &str,
        args: Vec<Value>,
        on_result: R,
        on_error: E,
    ) -> Result<()>
    where
        R: FnOnce(Vec<Value>),
        E: FnOnce(String),
    {
        match self.exchange(function, args, None).await? {
            ReplyEnvelope::Success { ret } => on_result(ret),
            ReplyEnvelope::Failure { message } => on_error(message),
        }
        Ok(())
    }

    /// [`call_with`](Self::call_with) without an error handler
    ///
    /// A failure reply is only logged.
    pub async fn call_then<R>(&self, function: &str, args: Vec<Value>, on_result: R) -> Result<()>
    where
        R: FnOnce(Vec<Value>),
    {
        if let ReplyEnvelope::Success { ret } = self.exchange(function, args, None).await? {
            on_result(ret);
        }
        Ok(())
    }

    pub fn codec(&self) -> CodecKind {
        *self.channel.codec()
    }

    pub fn channel(&self) -> &Channel<CodecKind> {
        &self.channel
    }

    async fn exchange(
        &self,
        function: &str,
        args: Vec<Value>,
        cancel: Option<&CancellationToken>,
    ) -> Result<ReplyEnvelope> {
        tracing::debug!(function, args = args.len(), "calling remote function");

        let call = CallEnvelope::new(function, args);
        let reply: ReplyEnvelope = match cancel {
            Some(token) => self.channel.request_with_cancel(&call, token).await?,
            None => self.channel.request(&call).await?,
        };

        if let ReplyEnvelope::Failure { message } = &reply {
            tracing::warn!(function, "remote call failed: {}", message);
        }
        Ok(reply)
    }
}

use remote_api_core::Value;
use remote_api_fabric::transport::WebSocketTransport;
use remote_api_fabric::{Channel, CodecKind, Transport};

use crate::config::ClientConfig;
use crate::error::Result;
use crate::invoker::Invoker;
use crate::proxy::{ProxyBuilder, ProxyObject};

/// Connection to a remote API server
pub struct RemoteApiClient {
    invoker: Invoker,
    config: ClientConfig,
}

impl RemoteApiClient {
    /// Validate `config` and open a WebSocket connection to it
    ///
    /// An unknown codec fails before any connection attempt.
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let codec = config.validate()?;
        tracing::info!(url = %config.url(), %codec, "connecting to remote API");

        let transport = WebSocketTransport::connect(&config.host, config.port).await?;
        Ok(Self::assemble(transport, codec, config))
    }

    /// Use an already open transport
    ///
    /// `host` and `port` of `config` are ignored. Must be called from within
    /// a tokio runtime.
    pub fn with_transport(transport: impl Transport + 'static, config: ClientConfig) -> Result<Self> {
        let codec = config.validate()?;
        Ok(Self::assemble(transport, codec, config))
    }

    fn assemble(transport: impl Transport + 'static, codec: CodecKind, config: ClientConfig) -> Self {
        let channel = Channel::from_transport(transport, codec, config.correlator_options());
        Self {
            invoker: Invoker::new(channel),
            config,
        }
    }

    /// Call a function by its full dotted name
    pub async fn call(&self, function: &str, args: Vec<Value>) -> Result<Vec<Value>> {
        self.invoker.call(function, args).await
    }

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
        self.invoker.call_with(function, args, on_result, on_error).await
    }

    pub async fn call_then<R>(&self, function: &str, args: Vec<Value>, on_result: R) -> Result<()>
    where
        R: FnOnce(Vec<Value>),
    {
        self.invoker.call_then(function, args, on_result).await
    }

    pub fn proxy_builder(&self) -> ProxyBuilder {
        ProxyBuilder::new(self.invoker.clone())
            .introspection_function(self.config.introspection_function.clone())
    }

    /// Build a proxy for the remote object named `root`
    pub async fn get_object(&self, root: &str) -> Result<ProxyObject> {
        self.proxy_builder().build(root).await
    }

    pub fn invoker(&self) -> &Invoker {
        &self.invoker
    }

    pub fn codec(&self) -> CodecKind {
        self.invoker.codec()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn is_closed(&self) -> bool {
        self.invoker.channel().is_closed()
    }

    /// Close the connection; outstanding calls fail with a closed-connection error
    pub async fn close(&self) {
        self.invoker.channel().close().await;
        tracing::info!("remote API connection closed");
    }
}

//! Local proxies for remote objects
//!
//! A [`ProxyBuilder`] asks the server to describe an object, validates the
//! manifest and turns it into a [`ProxyObject`]: a tree mirroring the manifest
//! where functions become [`RemoteFunction`] handles, constants keep their
//! value and nested maps become nested proxy objects.

use std::collections::BTreeMap;
use std::fmt;

use remote_api_core::{Descriptor, ReplyEnvelope, Value};
use remote_api_fabric::CancellationToken;

use crate::error::{Error, Result};
use crate::invoker::Invoker;

/// Function the stock server answers manifest requests on
pub const DEFAULT_INTROSPECTION_FUNCTION: &str = "wsRemoteApi.info";

/// Handle to one remote function, called by its full dotted name
#[derive(Clone)]
pub struct RemoteFunction {
    path: String,
    invoker: Invoker,
}

impl RemoteFunction {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub async fn call(&self, args: Vec<Value>) -> Result<Vec<Value>> {
        self.invoker.call(&self.path, args).await
    }

    pub async fn call_reply(&self, args: Vec<Value>) -> Result<ReplyEnvelope> {
        self.invoker.call_reply(&self.path, args).await
    }

    pub async fn call_with_cancel(
        &self,
        args: Vec<Value>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Value>> {
        self.invoker.call_with_cancel(&self.path, args, cancel).await
    }

    pub async fn call_with<R, E>(&self, args: Vec<Value>, on_result: R, on_error: E) -> Result<()>
    where
        R: FnOnce(Vec<Value>),
        E: FnOnce(String),
    {
        self.invoker
            .call_with(&self.path, args, on_result, on_error)
            .await
    }

    pub async fn call_then<R>(&self, args: Vec<Value>, on_result: R) -> Result<()>
    where
        R: FnOnce(Vec<Value>),
    {
        self.invoker.call_then(&self.path, args, on_result).await
    }
}

impl fmt::Debug for RemoteFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteFunction")
            .field("path", &self.path)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub enum ProxyNode {
    Function(RemoteFunction),
    Constant(Value),
    Namespace(ProxyObject),
}

impl ProxyNode {
    pub fn as_function(&self) -> Option<&RemoteFunction> {
        match self {
            ProxyNode::Function(function) => Some(function),
            _ => None,
        }
    }

    pub fn as_constant(&self) -> Option<&Value> {
        match self {
            ProxyNode::Constant(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_namespace(&self) -> Option<&ProxyObject> {
        match self {
            ProxyNode::Namespace(object) => Some(object),
            _ => None,
        }
    }

    fn to_descriptor(&self) -> Descriptor {
        match self {
            ProxyNode::Function(_) => Descriptor::Function,
            ProxyNode::Constant(value) => Descriptor::Constant(value.clone()),
            ProxyNode::Namespace(object) => Descriptor::Namespace(object.to_descriptors()),
        }
    }
}

/// Local stand-in for a remote object
#[derive(Debug, Clone)]
pub struct ProxyObject {
    path: String,
    members: BTreeMap<String, ProxyNode>,
}

impl ProxyObject {
    /// Dotted name of the object on the server
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&ProxyNode> {
        self.members.get(key)
    }

    pub fn function(&self, key: &str) -> Option<&RemoteFunction> {
        self.get(key).and_then(ProxyNode::as_function)
    }

    pub fn constant(&self, key: &str) -> Option<&Value> {
        self.get(key).and_then(ProxyNode::as_constant)
    }

    pub fn namespace(&self, key: &str) -> Option<&ProxyObject> {
        self.get(key).and_then(ProxyNode::as_namespace)
    }

    /// Walk a relative dotted path, e.g. `"scene.objects.count"`
    pub fn lookup(&self, dotted: &str) -> Option<&ProxyNode> {
        let mut segments = dotted.split('.');
        let mut node = self.get(segments.next()?)?;
        for segment in segments {
            node = node.as_namespace()?.get(segment)?;
        }
        Some(node)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ProxyNode)> {
        self.members.iter().map(|(key, node)| (key.as_str(), node))
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Call the function member `key`
    pub async fn call(&self, key: &str, args: Vec<Value>) -> Result<Vec<Value>> {
        match self.get(key) {
            Some(ProxyNode::Function(function)) => function.call(args).await,
            Some(_) => Err(Error::NotCallable(self.child_path(key))),
            None => Err(Error::UnknownMember(self.child_path(key))),
        }
    }

    /// The manifest this object was built from
    pub fn to_descriptors(&self) -> BTreeMap<String, Descriptor> {
        self.members
            .iter()
            .map(|(key, node)| (key.clone(), node.to_descriptor()))
            .collect()
    }

    fn child_path(&self, key: &str) -> String {
        format!("{}.{}", self.path, key)
    }
}

/// Builds proxy objects from server manifests
#[derive(Clone)]
pub struct ProxyBuilder {
    invoker: Invoker,
    introspection_function: String,
}

impl ProxyBuilder {
    pub fn new(invoker: Invoker) -> Self {
        Self {
            invoker,
            introspection_function: DEFAULT_INTROSPECTION_FUNCTION.to_string(),
        }
    }

    pub fn introspection_function(mut self, name: impl Into<String>) -> Self {
        self.introspection_function = name.into();
        self
    }

    /// Fetch and validate the manifest of `root`
    pub async fn resolve(&self, root: &str) -> Result<BTreeMap<String, Descriptor>> {
        let ret = self
            .invoker
            .call(&self.introspection_function, vec![Value::from(root)])
            .await?;

        let manifest = ret.into_iter().next().ok_or_else(|| Error::InvalidManifest {
            root: root.to_string(),
            reason: "introspection returned no value".to_string(),
        })?;

        let members =
            Descriptor::parse_manifest(root, &manifest).map_err(|e| Error::InvalidManifest {
                root: root.to_string(),
                reason: e.to_string(),
            })?;
        tracing::debug!(root, members = members.len(), "manifest resolved");
        Ok(members)
    }

    /// Turn validated descriptors into a proxy object named `path`
    ///
    /// No network traffic: constants are copied, functions only remember
    /// their dotted name.
    pub fn materialize(&self, path: &str, members: &BTreeMap<String, Descriptor>) -> ProxyObject {
        let members = members
            .iter()
            .map(|(name, descriptor)| {
                let child = format!("{}.{}", path, name);
                let node = match descriptor {
                    Descriptor::Function => ProxyNode::Function(RemoteFunction {
                        path: child,
                        invoker: self.invoker.clone(),
                    }),
                    Descriptor::Constant(value) => ProxyNode::Constant(value.clone()),
                    Descriptor::Namespace(nested) => {
                        ProxyNode::Namespace(self.materialize(&child, nested))
                    }
                };
                (name.clone(), node)
            })
            .collect();

        ProxyObject {
            path: path.to_string(),
            members,
        }
    }

    /// [`resolve`](Self::resolve) then [`materialize`](Self::materialize)
    pub async fn build(&self, root: &str) -> Result<ProxyObject> {
        let members = self.resolve(root).await?;
        Ok(self.materialize(root, &members))
    }
}

//! Host interface consumed by the proxy core.
//!
//! The host owns the graph, the deferred-call queue, the diagnostic console and
//! the views. The core only ever talks to it through these traits.

use crate::error::HostError;
use crate::staleness::mtime_of;
use crate::types::*;
use std::fmt;
use std::path::PathBuf;
use std::time::SystemTime;

/// Backing content of a resolved template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateInfo {
    pub path: PathBuf,
    pub modified: Option<SystemTime>,
}

impl TemplateInfo {
    /// Resolve a file-backed template, reading its modification time from disk.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let modified = mtime_of(&path);
        Self { path, modified }
    }
}

/// Work the core asks the host to run on a later tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeferredTask {
    /// Coalesced view repaint (and pending generation bump).
    Repaint,
    /// Re-examine a parentless proxy one tick after it was seen at the top level.
    RecheckParent(ProxyId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    ForeignCapabilityRemoved,
    ChildRemoved,
    NestedProxy,
    ContainmentCycle,
    RootPlacement,
}

/// Author-visible message about a proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub proxy: ProxyId,
    pub node: NodeId,
    pub message: String,
}

impl Diagnostic {
    pub fn error(
        kind: DiagnosticKind,
        proxy: ProxyId,
        node: NodeId,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Error,
            kind,
            proxy,
            node,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {} ({}): {}", self.severity, self.proxy, self.node, self.message)
    }
}

/// Graph queries and mutation primitives.
pub trait SceneGraph {
    fn exists(&self, node: NodeId) -> bool;
    fn parent(&self, node: NodeId) -> Result<Option<NodeId>, HostError>;
    fn children(&self, node: NodeId) -> Result<Vec<NodeId>, HostError>;
    fn name(&self, node: NodeId) -> Result<String, HostError>;
    fn transform(&self, node: NodeId) -> Result<Transform, HostError>;
    fn capabilities(&self, node: NodeId) -> Result<Vec<Capability>, HostError>;
    fn remove_capability(&mut self, node: NodeId, capability: &Capability) -> Result<(), HostError>;

    /// Clone the template's root (and subtree) into the graph as a new top-level node.
    fn instantiate(&mut self, template: TemplateId) -> Result<NodeId, HostError>;
    /// Move `node` under `parent`, or to the top level when `parent` is `None`.
    fn reparent(&mut self, node: NodeId, parent: Option<NodeId>) -> Result<(), HostError>;
    fn set_transform(&mut self, node: NodeId, transform: Transform) -> Result<(), HostError>;
    fn set_name(&mut self, node: NodeId, name: &str) -> Result<(), HostError>;
    fn set_preview_tag(&mut self, node: NodeId, tag: PreviewTag) -> Result<(), HostError>;
    /// Destroy `node` and its whole subtree.
    fn destroy(&mut self, node: NodeId) -> Result<(), HostError>;

    /// Template references of every proxy in the template's subgraph,
    /// inactive nodes included. `None` entries are proxies without a template.
    fn nested_proxies(&self, template: TemplateId) -> Result<Vec<Option<TemplateId>>, HostError>;
    /// Every node currently tagged as a preview owned by `owner`.
    fn find_previews(&self, owner: ProxyId) -> Vec<NodeId>;
}

pub trait TemplateResolver {
    /// `None` when the reference does not resolve.
    fn resolve(&self, template: TemplateId) -> Option<TemplateInfo>;
}

pub trait DeferredQueue {
    /// Schedule `task` for a later tick. Never runs synchronously.
    fn defer(&mut self, task: DeferredTask);
}

pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

pub trait ViewRepainter {
    fn repaint_all_views(&mut self);
}

/// Everything the core needs from its host.
pub trait SceneHost:
    SceneGraph + TemplateResolver + DeferredQueue + DiagnosticSink + ViewRepainter
{
}

impl<T> SceneHost for T where
    T: SceneGraph + TemplateResolver + DeferredQueue + DiagnosticSink + ViewRepainter + ?Sized
{
}

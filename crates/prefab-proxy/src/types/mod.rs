use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;
use uuid::Uuid;

/// Identity of a node in the host graph (authored, preview, or template asset).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node:{}", self.0.simple())
    }
}

/// Identity of a proxy component, independent of the node carrying it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProxyId(pub Uuid);

impl ProxyId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ProxyId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProxyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "proxy:{}", self.0.simple())
    }
}

/// Reference to an externally owned template asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TemplateId(pub Uuid);

impl TemplateId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TemplateId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "template:{}", self.0.simple())
    }
}

/// Position, rotation (quaternion, `xyzw`) and scale of a node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: [f32; 3],
    pub rotation: [f32; 4],
    pub scale: [f32; 3],
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: [0.0; 3],
        rotation: [0.0, 0.0, 0.0, 1.0],
        scale: [1.0; 3],
    };

    pub fn at(position: [f32; 3]) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Value of the process-wide redraw generation counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Generation(pub u64);

impl Generation {
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// Observed content version of a template: its last-modification time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TemplateVersion(pub SystemTime);

/// A capability (component) attached to a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    /// Positional/transform capability every node carries.
    Transform,
    /// The template proxy itself.
    Proxy,
    /// Anything else the host lets authors attach.
    Named(String),
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Transform => f.write_str("Transform"),
            Capability::Proxy => f.write_str("Proxy"),
            Capability::Named(name) => f.write_str(name),
        }
    }
}

/// Visibility/editability tags applied to preview instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewFlags {
    pub hide_in_hierarchy: bool,
    pub not_editable: bool,
    /// Stripped from execution builds by the host.
    pub editor_only: bool,
}

impl Default for PreviewFlags {
    fn default() -> Self {
        Self {
            hide_in_hierarchy: true,
            not_editable: true,
            editor_only: true,
        }
    }
}

/// Structured tag marking a node as the preview owned by `owner`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewTag {
    pub owner: ProxyId,
    pub flags: PreviewFlags,
}

/// Whether the host is authoring (editing) or executing the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Authoring,
    Execution,
}

/// Authoring-mode lifecycle state of a proxy component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProxyState {
    /// No template assigned (or the last one was rejected).
    Empty,
    /// Structural validation in progress.
    Checking,
    /// Preview present and current.
    Valid,
    /// Template changed or generation advanced since the last check.
    Invalidated,
    /// Parentless; a one-tick recheck is pending.
    AwaitingParent,
    /// Validation failed; template and preview are being cleared.
    Rejected,
}

//! Error types for the proxy core
//!
//! Rejections are not errors: they are terminal validation outcomes carried by
//! [`Rejection`] and reported to the author. `Err` values are reserved for
//! host failures, unknown proxies and illegal state transitions.

use crate::types::{NodeId, ProxyId, ProxyState, TemplateId};

/// Failure reported by a host graph primitive.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    /// Node does not exist (destroyed or never created)
    #[error("{0} not found")]
    NodeNotFound(NodeId),

    /// Template reference does not resolve to an asset
    #[error("{0} not found")]
    TemplateNotFound(TemplateId),

    /// Capability is not attached to the node
    #[error("capability {capability} is not attached to {node}")]
    CapabilityNotFound {
        /// Node that was inspected
        node: NodeId,
        /// Capability that was requested
        capability: String,
    },

    /// Reparenting would make a node its own ancestor
    #[error("reparenting {node} under {parent} would create a hierarchy cycle")]
    HierarchyCycle {
        /// Node being moved
        node: NodeId,
        /// Requested parent
        parent: NodeId,
    },
}

/// Illegal proxy state transition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateMachineError {
    /// Transition is not in the transition table
    #[error("illegal transition {from:?} -> {to:?}")]
    IllegalTransition {
        /// Current state
        from: ProxyState,
        /// Requested state
        to: ProxyState,
    },
}

/// Main error type of the proxy core.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// Host graph primitive failed
    #[error("host error: {0}")]
    Host(#[from] HostError),

    /// Proxy state machine violation
    #[error("state machine error: {0}")]
    StateMachine(#[from] StateMachineError),

    /// No proxy is registered under this id
    #[error("unknown {0}")]
    UnknownProxy(ProxyId),

    /// Configuration could not be parsed
    #[error("configuration error: {0}")]
    Config(#[from] toml::de::Error),
}

impl ProxyError {
    /// Whether the next redraw opportunity may succeed without intervention.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Host(HostError::NodeNotFound(_) | HostError::CapabilityNotFound { .. }) => true,
            Self::Host(_) => false,
            Self::StateMachine(_) | Self::Config(_) => false,
            Self::UnknownProxy(_) => true,
        }
    }
}

/// Reason a proxy's template reference was cleared.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    /// Template embeds other proxies deeper than the nesting policy allows
    #[error("template {template} contains nested proxies ({chain})")]
    NestedProxy {
        /// Template the proxy pointed at
        template: TemplateId,
        /// Human-readable containment chain
        chain: String,
    },

    /// Template containment forms a cycle
    #[error("template {template} is part of a containment cycle ({cycle})")]
    ContainmentCycle {
        /// Template the proxy pointed at
        template: TemplateId,
        /// Human-readable cycle
        cycle: String,
    },

    /// Proxy node is still at the top level after the one-tick grace period
    #[error("a template proxy cannot be attached to a root node")]
    RootPlacement,
}

//! Execution-mode replacement.
//!
//! One-shot and never retried: the proxy node is swapped for a live clone of
//! its template, or stripped of the proxy capability when there is nothing to
//! clone.

use crate::api::{SceneGraph, TemplateResolver};
use crate::error::HostError;
use crate::types::{Capability, NodeId, TemplateId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Replacement {
    /// Template instantiated as `root`; the proxy node is gone.
    Replaced { root: NodeId },
    /// No usable template; the empty placeholder node stays.
    Degraded { node: NodeId },
}

/// Replace `node` by an instance of `template`.
///
/// An unset or unresolvable template degrades silently: only the proxy
/// capability is removed.
pub fn replace<H>(
    host: &mut H,
    node: NodeId,
    template: Option<TemplateId>,
) -> Result<Replacement, HostError>
where
    H: SceneGraph + TemplateResolver + ?Sized,
{
    let Some(template) = template.filter(|t| host.resolve(*t).is_some()) else {
        if host.capabilities(node)?.contains(&Capability::Proxy) {
            host.remove_capability(node, &Capability::Proxy)?;
        }
        tracing::debug!(%node, "proxy has no usable template, degraded to plain node");
        return Ok(Replacement::Degraded { node });
    };

    let parent = host.parent(node)?;
    let transform = host.transform(node)?;
    let name = host.name(node)?;

    let root = host.instantiate(template)?;
    host.reparent(root, parent)?;
    host.set_transform(root, transform)?;
    host.set_name(root, &name)?;
    host.destroy(node)?;

    tracing::debug!(%node, %template, %root, "proxy replaced by template instance");
    Ok(Replacement::Replaced { root })
}

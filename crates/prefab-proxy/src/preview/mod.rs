//! Preview instances: hidden, non-editable clones of a proxy's template.
//!
//! Ownership is explicit: the owning proxy keeps the preview's node id. Every
//! preview is also tagged with its owner so that strays left behind by
//! external interference (duplicated scenes, partial undo) can be swept up.

use crate::api::SceneGraph;
use crate::error::HostError;
use crate::types::{NodeId, PreviewFlags, PreviewTag, ProxyId, TemplateId, TemplateVersion};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewInstance {
    pub node: NodeId,
    pub owner: ProxyId,
    pub template: TemplateId,
    pub version: Option<TemplateVersion>,
}

/// Nodes destroyed by [`purge`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub destroyed: usize,
    /// Tagged previews the owner did not know about.
    pub strays: usize,
}

/// Instantiate `template` as a top-level preview matching `owner_node`'s transform.
pub fn spawn<G: SceneGraph + ?Sized>(
    host: &mut G,
    owner: ProxyId,
    owner_node: NodeId,
    template: TemplateId,
    version: Option<TemplateVersion>,
    flags: PreviewFlags,
) -> Result<PreviewInstance, HostError> {
    let transform = host.transform(owner_node)?;
    let name = host.name(owner_node)?;

    let root = host.instantiate(template)?;
    let dressed = (|| {
        host.reparent(root, None)?;
        host.set_transform(root, transform)?;
        host.set_name(root, &format!("{name} (preview)"))?;
        host.set_preview_tag(root, PreviewTag { owner, flags })
    })();

    if let Err(e) = dressed {
        // Never leave a half-dressed, untagged clone in the graph.
        let _ = host.destroy(root);
        return Err(e);
    }

    Ok(PreviewInstance {
        node: root,
        owner,
        template,
        version,
    })
}

/// Destroy the owned preview and every other node tagged with `owner`.
pub fn purge<G: SceneGraph + ?Sized>(
    host: &mut G,
    owner: ProxyId,
    owned: Option<NodeId>,
) -> Result<PurgeReport, HostError> {
    let mut targets = host.find_previews(owner);
    if let Some(node) = owned {
        if host.exists(node) && !targets.contains(&node) {
            targets.push(node);
        }
    }

    let mut report = PurgeReport::default();
    for node in targets {
        // Already gone with an earlier target's subtree.
        if !host.exists(node) {
            continue;
        }
        if Some(node) != owned {
            report.strays += 1;
        }
        host.destroy(node)?;
        report.destroyed += 1;
    }

    if report.strays > 0 {
        tracing::warn!(proxy = %owner, strays = report.strays, "purged stray preview instances");
    }
    Ok(report)
}

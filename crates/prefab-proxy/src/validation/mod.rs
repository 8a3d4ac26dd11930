//! Structural validation of proxy nodes.
//!
//! Runs four rules in order, each with its own corrective action:
//! 1. Foreign capabilities are removed (non-fatal)
//! 2. Children are destroyed (non-fatal)
//! 3. Templates containing proxies are rejected per [`NestingPolicy`]
//! 4. Parentless proxies defer to a one-tick recheck
//!
//! The proxy node is destroyed outright at execution time, so anything else
//! attached to it would be silently lost. Rules 1 and 2 surface that mistake
//! while the author is still looking at it.

use crate::api::{Diagnostic, DiagnosticKind, SceneHost, TemplateResolver};
use crate::config::NestingPolicy;
use crate::error::{HostError, Rejection};
use crate::nesting::ContainmentGraph;
use crate::types::{Capability, NodeId, ProxyId, TemplateId};

/// Capabilities a proxy node may carry.
pub static PROXY_ALLOW_LIST: [Capability; 2] = [Capability::Transform, Capability::Proxy];

/// Corrective deletions performed during one validation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub removed_capabilities: Vec<Capability>,
    pub removed_children: Vec<NodeId>,
}

impl ValidationReport {
    pub fn corrected(&self) -> bool {
        !self.removed_capabilities.is_empty() || !self.removed_children.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Passed,
    /// Proxy is at the top level; recheck on the next tick.
    AwaitParent,
    Rejected(Rejection),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub verdict: Verdict,
    pub report: ValidationReport,
}

impl ValidationOutcome {
    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Passed
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralValidator {
    policy: NestingPolicy,
}

impl StructuralValidator {
    pub fn new(policy: NestingPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> NestingPolicy {
        self.policy
    }

    /// Validate `node` (carrying `proxy`) against `template`.
    ///
    /// Corrective deletions are reported to the host immediately. A rejection
    /// is returned, not reported: the caller clears the template and owns the
    /// diagnostic for it.
    pub fn validate<H: SceneHost + ?Sized>(
        &self,
        host: &mut H,
        proxy: ProxyId,
        node: NodeId,
        template: TemplateId,
    ) -> Result<ValidationOutcome, HostError> {
        let mut report = ValidationReport::default();

        // 1. Foreign capabilities
        self.strip_foreign_capabilities(host, proxy, node, &mut report)?;

        // 2. Children
        self.strip_children(host, proxy, node, &mut report)?;

        // 3. Deep self-containment
        let containment = ContainmentGraph::explore(&*host, template)?;
        let resolver: &H = host;
        if let Some(rejection) = self.check_nesting(&containment, |t| template_label(resolver, t)) {
            return Ok(ValidationOutcome {
                verdict: Verdict::Rejected(rejection),
                report,
            });
        }

        // 4. Non-root placement
        if host.parent(node)?.is_none() {
            tracing::debug!(%proxy, %node, "proxy has no parent, deferring");
            return Ok(ValidationOutcome {
                verdict: Verdict::AwaitParent,
                report,
            });
        }

        Ok(ValidationOutcome {
            verdict: Verdict::Passed,
            report,
        })
    }

    /// Apply the nesting policy to an explored containment graph.
    pub fn check_nesting(
        &self,
        containment: &ContainmentGraph,
        label: impl Fn(TemplateId) -> String,
    ) -> Option<Rejection> {
        if !containment.contains_nested_proxies() {
            return None;
        }
        let template = containment.root();

        if let Some(cycle) = containment.cycles().first() {
            let cycle = cycle.iter().map(|t| label(*t)).collect::<Vec<_>>().join(" -> ");
            return Some(Rejection::ContainmentCycle { template, cycle });
        }

        let too_deep = match self.policy {
            NestingPolicy::Strict => true,
            NestingPolicy::SingleLevel => containment.exceeds_single_level(),
        };
        too_deep.then(|| Rejection::NestedProxy {
            template,
            chain: containment.describe(&label),
        })
    }

    fn strip_foreign_capabilities<H: SceneHost + ?Sized>(
        &self,
        host: &mut H,
        proxy: ProxyId,
        node: NodeId,
        report: &mut ValidationReport,
    ) -> Result<(), HostError> {
        for capability in host.capabilities(node)? {
            if PROXY_ALLOW_LIST.contains(&capability) {
                continue;
            }
            tracing::error!(
                %proxy,
                %node,
                %capability,
                "removing foreign capability from proxy node"
            );
            host.remove_capability(node, &capability)?;
            host.report(Diagnostic::error(
                DiagnosticKind::ForeignCapabilityRemoved,
                proxy,
                node,
                format!(
                    "a template proxy node cannot carry other capabilities; removed {capability}"
                ),
            ));
            report.removed_capabilities.push(capability);
        }
        Ok(())
    }

    fn strip_children<H: SceneHost + ?Sized>(
        &self,
        host: &mut H,
        proxy: ProxyId,
        node: NodeId,
        report: &mut ValidationReport,
    ) -> Result<(), HostError> {
        let children = host.children(node)?;
        if children.is_empty() {
            return Ok(());
        }

        tracing::error!(%proxy, %node, count = children.len(), "removing children from proxy node");
        host.report(Diagnostic::error(
            DiagnosticKind::ChildRemoved,
            proxy,
            node,
            format!("a template proxy node cannot have children; removed {}", children.len()),
        ));
        for child in children.into_iter().rev() {
            host.destroy(child)?;
            report.removed_children.push(child);
        }
        Ok(())
    }
}

/// Short name for a template in diagnostics: its file stem, or its id.
pub fn template_label<R: TemplateResolver + ?Sized>(resolver: &R, template: TemplateId) -> String {
    resolver
        .resolve(template)
        .and_then(|info| info.path.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_else(|| template.to_string())
}

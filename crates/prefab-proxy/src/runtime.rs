use crate::api::{DeferredTask, SceneHost};
use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::execution::{self, Replacement};
use crate::preview::PurgeReport;
use crate::proxy::{ProxyComponent, RefreshOutcome};
use crate::scheduler::RedrawScheduler;
use crate::validation::ValidationReport;
use crate::types::*;
use serde::Serialize;
use std::collections::HashMap;

/// Result of activating a proxy node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// Authoring: a component now tracks the node.
    Attached(ProxyId),
    /// Execution: the node was swapped for a template instance rooted at `root`.
    Replaced { root: NodeId },
    /// Execution: no usable template, proxy capability removed.
    Degraded { node: NodeId },
}

/// Tally of one [`ProxyRuntime::redraw_all`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RedrawSummary {
    pub visited: usize,
    pub current: usize,
    pub revalidated: usize,
    pub regenerated: usize,
    pub awaiting_parent: usize,
    pub rejected: usize,
    pub cleared: usize,
    /// Proxies whose node had foreign capabilities or children removed.
    pub corrected: usize,
    pub failed: usize,
}

impl RedrawSummary {
    fn record(&mut self, outcome: &RefreshOutcome) {
        match outcome {
            RefreshOutcome::Idle => {}
            RefreshOutcome::Current => self.current += 1,
            RefreshOutcome::Revalidated => self.revalidated += 1,
            RefreshOutcome::Regenerated(_) => self.regenerated += 1,
            RefreshOutcome::AwaitingParent => self.awaiting_parent += 1,
            RefreshOutcome::Rejected(_) => self.rejected += 1,
            RefreshOutcome::Cleared => self.cleared += 1,
        }
    }
}

/// Owns the redraw scheduler, configuration and every proxy of one host.
///
/// All entry points take `&mut self`; the host calls them serially from its
/// tick, which rules out reentrancy from deferred tasks.
#[derive(Debug, Default)]
pub struct ProxyRuntime {
    config: ProxyConfig,
    scheduler: RedrawScheduler,
    proxies: HashMap<ProxyId, ProxyComponent>,
    by_node: HashMap<NodeId, ProxyId>,
    /// Registration order; redraw passes follow it.
    order: Vec<ProxyId>,
}

impl ProxyRuntime {
    /// Create a runtime with default configuration
    pub fn new() -> Self {
        Self::with_config(ProxyConfig::default())
    }

    /// Create a runtime with custom configuration
    pub fn with_config(config: ProxyConfig) -> Self {
        Self {
            config,
            scheduler: RedrawScheduler::new(),
            proxies: HashMap::new(),
            by_node: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &RedrawScheduler {
        &self.scheduler
    }

    pub fn current_generation(&self) -> Generation {
        self.scheduler.current_generation()
    }

    pub fn proxy(&self, id: ProxyId) -> Option<&ProxyComponent> {
        self.proxies.get(&id)
    }

    pub fn proxy_for_node(&self, node: NodeId) -> Option<&ProxyComponent> {
        self.by_node.get(&node).and_then(|id| self.proxies.get(id))
    }

    /// Registered proxy ids, oldest first.
    pub fn proxy_ids(&self) -> Vec<ProxyId> {
        self.order.clone()
    }

    pub fn proxies(&self) -> impl Iterator<Item = &ProxyComponent> {
        self.order.iter().filter_map(|id| self.proxies.get(id))
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    /// Proxy node came into existence (load, paste, undo, scene start).
    pub fn activate<H: SceneHost + ?Sized>(
        &mut self,
        host: &mut H,
        node: NodeId,
        template: Option<TemplateId>,
        mode: Mode,
    ) -> Result<Activation, ProxyError> {
        match mode {
            Mode::Authoring => {
                let (id, _) = self.attach(host, node, template)?;
                Ok(Activation::Attached(id))
            }
            Mode::Execution => Ok(match execution::replace(host, node, template)? {
                Replacement::Replaced { root } => Activation::Replaced { root },
                Replacement::Degraded { node } => Activation::Degraded { node },
            }),
        }
    }

    /// Track `node` in authoring mode and give it its first redraw opportunity.
    ///
    /// Attaching a node that is already tracked reassigns its template instead.
    pub fn attach<H: SceneHost + ?Sized>(
        &mut self,
        host: &mut H,
        node: NodeId,
        template: Option<TemplateId>,
    ) -> Result<(ProxyId, RefreshOutcome), ProxyError> {
        let id = match self.by_node.get(&node) {
            Some(&id) => {
                self.set_template(id, template)?;
                id
            }
            None => {
                let proxy = ProxyComponent::new(node, template);
                let id = proxy.id();
                self.proxies.insert(id, proxy);
                self.by_node.insert(node, id);
                self.order.push(id);
                tracing::debug!(proxy = %id, %node, "proxy attached");
                id
            }
        };
        let outcome = self.on_redraw(host, id)?;
        Ok((id, outcome))
    }

    /// Proxy is going away with its node; its preview goes with it.
    pub fn detach<H: SceneHost + ?Sized>(
        &mut self,
        host: &mut H,
        id: ProxyId,
    ) -> Result<PurgeReport, ProxyError> {
        let mut proxy = self.proxies.remove(&id).ok_or(ProxyError::UnknownProxy(id))?;
        self.by_node.remove(&proxy.node());
        self.order.retain(|other| *other != id);
        let report = proxy.detach(host, &mut self.scheduler)?;
        tracing::debug!(proxy = %id, destroyed = report.destroyed, "proxy detached");
        Ok(report)
    }

    pub fn detach_node<H: SceneHost + ?Sized>(
        &mut self,
        host: &mut H,
        node: NodeId,
    ) -> Result<Option<PurgeReport>, ProxyError> {
        match self.by_node.get(&node).copied() {
            Some(id) => self.detach(host, id).map(Some),
            None => Ok(None),
        }
    }

    /// Detach every proxy whose node no longer exists. Returns how many went.
    pub fn prune<H: SceneHost + ?Sized>(&mut self, host: &mut H) -> Result<usize, ProxyError> {
        let orphans: Vec<ProxyId> = self
            .proxy_ids()
            .into_iter()
            .filter(|id| self.proxies.get(id).is_some_and(|p| !host.exists(p.node())))
            .collect();
        for id in &orphans {
            self.detach(host, *id)?;
        }
        Ok(orphans.len())
    }

    pub fn set_template(
        &mut self,
        id: ProxyId,
        template: Option<TemplateId>,
    ) -> Result<(), ProxyError> {
        let proxy = self.proxies.get_mut(&id).ok_or(ProxyError::UnknownProxy(id))?;
        proxy.set_template(template)?;
        Ok(())
    }

    /// Redraw opportunity for a single proxy.
    pub fn on_redraw<H: SceneHost + ?Sized>(
        &mut self,
        host: &mut H,
        id: ProxyId,
    ) -> Result<RefreshOutcome, ProxyError> {
        let proxy = self.proxies.get_mut(&id).ok_or(ProxyError::UnknownProxy(id))?;
        proxy.refresh(host, &mut self.scheduler, &self.config)
    }

    /// Redraw opportunity for every proxy. Per-proxy failures are logged and
    /// counted; the pass carries on.
    pub fn redraw_all<H: SceneHost + ?Sized>(&mut self, host: &mut H) -> RedrawSummary {
        let mut summary = RedrawSummary::default();
        for id in self.proxy_ids() {
            summary.visited += 1;
            match self.on_redraw(host, id) {
                Ok(outcome) => {
                    summary.record(&outcome);
                    let corrected = self
                        .proxies
                        .get(&id)
                        .and_then(ProxyComponent::last_validation)
                        .is_some_and(ValidationReport::corrected);
                    if corrected {
                        summary.corrected += 1;
                    }
                }
                Err(e) => {
                    summary.failed += 1;
                    tracing::warn!(
                        proxy = %id,
                        error = %e,
                        recoverable = e.is_recoverable(),
                        "redraw failed"
                    );
                }
            }
        }
        summary
    }

    /// Run a task the host deferred on an earlier tick.
    ///
    /// Tasks for proxies that were detached meanwhile are ignored.
    pub fn run_deferred<H: SceneHost + ?Sized>(
        &mut self,
        host: &mut H,
        task: DeferredTask,
    ) -> Result<Option<RefreshOutcome>, ProxyError> {
        match task {
            DeferredTask::Repaint => {
                self.scheduler.run_repaint(host);
                Ok(None)
            }
            DeferredTask::RecheckParent(id) => match self.proxies.get_mut(&id) {
                Some(proxy) => proxy
                    .recheck_parent(host, &mut self.scheduler, &self.config)
                    .map(Some),
                None => {
                    tracing::trace!(proxy = %id, "recheck for detached proxy ignored");
                    Ok(None)
                }
            },
        }
    }
}

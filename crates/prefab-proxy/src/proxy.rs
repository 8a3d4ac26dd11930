//! Authoring-mode proxy component.
//!
//! One [`ProxyComponent`] per placeholder node. It owns the template reference,
//! at most one [`PreviewInstance`], and the generation/version it last saw.
//! Every redraw opportunity runs [`ProxyComponent::refresh`], which either
//! takes the fast path or re-validates and (if needed) rebuilds the preview.

use crate::api::{DeferredTask, Diagnostic, DiagnosticKind, SceneHost};
use crate::config::ProxyConfig;
use crate::error::{HostError, ProxyError, Rejection, StateMachineError};
use crate::preview::{self, PreviewInstance, PurgeReport};
use crate::scheduler::RedrawScheduler;
use crate::staleness::{Staleness, TemplateStaleness};
use crate::state_machine;
use crate::types::*;
use crate::validation::{StructuralValidator, ValidationReport, Verdict};

/// What a redraw opportunity (or deferred recheck) did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Nothing to do: no template, unresolvable template, or node already gone.
    Idle,
    /// Fast path: generation and template version unchanged.
    Current,
    /// Re-validated after a generation advance; existing preview kept.
    Revalidated,
    /// New preview instantiated.
    Regenerated(NodeId),
    /// Proxy is parentless; a recheck is pending.
    AwaitingParent,
    /// Template reference cleared.
    Rejected(Rejection),
    /// Template was unset; stale preview removed.
    Cleared,
}

#[derive(Debug, Clone)]
pub struct ProxyComponent {
    id: ProxyId,
    node: NodeId,
    template: Option<TemplateId>,
    last_observed_version: Option<TemplateVersion>,
    last_seen_generation: Option<Generation>,
    preview: Option<PreviewInstance>,
    state: ProxyState,
    recheck_pending: bool,
    /// Corrections made by the validation run of the latest refresh or recheck.
    last_validation: Option<ValidationReport>,
}

impl ProxyComponent {
    pub fn new(node: NodeId, template: Option<TemplateId>) -> Self {
        Self::with_id(ProxyId::new(), node, template)
    }

    pub fn with_id(id: ProxyId, node: NodeId, template: Option<TemplateId>) -> Self {
        Self {
            id,
            node,
            template,
            last_observed_version: None,
            last_seen_generation: None,
            preview: None,
            state: ProxyState::Empty,
            recheck_pending: false,
            last_validation: None,
        }
    }

    pub fn id(&self) -> ProxyId {
        self.id
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn template(&self) -> Option<TemplateId> {
        self.template
    }

    pub fn state(&self) -> ProxyState {
        self.state
    }

    pub fn preview(&self) -> Option<&PreviewInstance> {
        self.preview.as_ref()
    }

    pub fn last_observed_version(&self) -> Option<TemplateVersion> {
        self.last_observed_version
    }

    pub fn last_seen_generation(&self) -> Option<Generation> {
        self.last_seen_generation
    }

    pub fn is_recheck_pending(&self) -> bool {
        self.recheck_pending
    }

    /// Corrective deletions from the most recent refresh or recheck, if that
    /// call got as far as running the validator.
    pub fn last_validation(&self) -> Option<&ValidationReport> {
        self.last_validation.as_ref()
    }

    /// Reassign the template. Takes effect on the next redraw opportunity
    /// (or the pending parent recheck, whichever comes first).
    pub fn set_template(&mut self, template: Option<TemplateId>) -> Result<(), StateMachineError> {
        if self.template == template {
            return Ok(());
        }
        self.template = template;
        self.last_observed_version = None;
        if self.state == ProxyState::Valid {
            self.transition(ProxyState::Invalidated)?;
        }
        Ok(())
    }

    /// Redraw opportunity: node creation, per-frame hook, or external invalidation.
    pub fn refresh<H: SceneHost + ?Sized>(
        &mut self,
        host: &mut H,
        scheduler: &mut RedrawScheduler,
        config: &ProxyConfig,
    ) -> Result<RefreshOutcome, ProxyError> {
        self.last_validation = None;
        if !host.exists(self.node) {
            return Ok(RefreshOutcome::Idle);
        }
        if self.state == ProxyState::AwaitingParent {
            return Ok(RefreshOutcome::AwaitingParent);
        }

        let Some(template) = self.template else {
            return self.clear(host, scheduler);
        };
        let staleness =
            TemplateStaleness::has_changed(&*host, Some(template), self.last_observed_version);
        if staleness.version.is_none() {
            tracing::trace!(proxy = %self.id, %template, "template does not resolve");
            return Ok(RefreshOutcome::Idle);
        }

        let generation = scheduler.current_generation();
        if self.last_seen_generation == Some(generation)
            && !staleness.changed
            && self.preview_current(&*host, template)
            && host.parent(self.node)?.is_some()
        {
            tracing::trace!(proxy = %self.id, "preview current");
            return Ok(RefreshOutcome::Current);
        }

        if self.state == ProxyState::Valid {
            self.transition(ProxyState::Invalidated)?;
        }
        self.transition(ProxyState::Checking)?;
        self.check(host, scheduler, config, template, staleness)
    }

    /// Body of the deferred [`DeferredTask::RecheckParent`] task.
    ///
    /// Still parentless: reject. Parent appeared: forced re-validation against
    /// whatever template is assigned *now*.
    pub fn recheck_parent<H: SceneHost + ?Sized>(
        &mut self,
        host: &mut H,
        scheduler: &mut RedrawScheduler,
        config: &ProxyConfig,
    ) -> Result<RefreshOutcome, ProxyError> {
        self.last_validation = None;
        if !std::mem::take(&mut self.recheck_pending) || self.state != ProxyState::AwaitingParent {
            return Ok(RefreshOutcome::Idle);
        }
        if !host.exists(self.node) {
            return Ok(RefreshOutcome::Idle);
        }

        let staleness =
            TemplateStaleness::has_changed(&*host, self.template, self.last_observed_version);
        let (Some(template), Some(_)) = (self.template, staleness.version) else {
            // Cleared (or no longer resolvable) while the recheck was pending.
            let purged = self.drop_preview(host, scheduler);
            self.transition(ProxyState::Empty)?;
            purged?;
            return Ok(RefreshOutcome::Cleared);
        };

        if host.parent(self.node)?.is_none() {
            self.reject(host, scheduler, Rejection::RootPlacement)?;
            return Ok(RefreshOutcome::Rejected(Rejection::RootPlacement));
        }

        tracing::debug!(proxy = %self.id, "parent appeared, forcing revalidation");
        self.last_seen_generation = None;
        self.transition(ProxyState::Checking)?;
        self.check(host, scheduler, config, template, staleness)
    }

    /// Owner is being destroyed: take the preview with it.
    pub fn detach<H: SceneHost + ?Sized>(
        &mut self,
        host: &mut H,
        scheduler: &mut RedrawScheduler,
    ) -> Result<PurgeReport, ProxyError> {
        self.recheck_pending = false;
        Ok(self.drop_preview(host, scheduler)?)
    }

    fn check<H: SceneHost + ?Sized>(
        &mut self,
        host: &mut H,
        scheduler: &mut RedrawScheduler,
        config: &ProxyConfig,
        template: TemplateId,
        staleness: Staleness,
    ) -> Result<RefreshOutcome, ProxyError> {
        let result = self.check_inner(host, scheduler, config, template, staleness);
        if result.is_err() && self.state == ProxyState::Checking {
            // Host failed mid-check; retry on the next opportunity.
            self.last_seen_generation = None;
            self.transition(ProxyState::Invalidated)?;
        }
        result
    }

    fn check_inner<H: SceneHost + ?Sized>(
        &mut self,
        host: &mut H,
        scheduler: &mut RedrawScheduler,
        config: &ProxyConfig,
        template: TemplateId,
        staleness: Staleness,
    ) -> Result<RefreshOutcome, ProxyError> {
        let validator = StructuralValidator::new(config.nesting);
        let outcome = validator.validate(host, self.id, self.node, template)?;
        if outcome.report.corrected() {
            tracing::debug!(
                proxy = %self.id,
                capabilities = outcome.report.removed_capabilities.len(),
                children = outcome.report.removed_children.len(),
                "proxy node corrected"
            );
        }
        self.last_validation = Some(outcome.report);

        match outcome.verdict {
            Verdict::Rejected(rejection) => {
                self.reject(host, scheduler, rejection.clone())?;
                return Ok(RefreshOutcome::Rejected(rejection));
            }
            Verdict::AwaitParent => {
                self.transition(ProxyState::AwaitingParent)?;
                if !self.recheck_pending {
                    self.recheck_pending = true;
                    host.defer(DeferredTask::RecheckParent(self.id));
                }
                return Ok(RefreshOutcome::AwaitingParent);
            }
            Verdict::Passed => {}
        }

        let preview_current = self.preview_current(&*host, template);
        self.last_seen_generation = Some(scheduler.current_generation());
        self.last_observed_version = staleness.version;

        if !staleness.changed && preview_current {
            self.transition(ProxyState::Valid)?;
            return Ok(RefreshOutcome::Revalidated);
        }

        let node = self.regenerate(host, scheduler, config, template, staleness.version)?;
        self.transition(ProxyState::Valid)?;
        Ok(RefreshOutcome::Regenerated(node))
    }

    fn regenerate<H: SceneHost + ?Sized>(
        &mut self,
        host: &mut H,
        scheduler: &mut RedrawScheduler,
        config: &ProxyConfig,
        template: TemplateId,
        version: Option<TemplateVersion>,
    ) -> Result<NodeId, ProxyError> {
        let purged = preview::purge(&mut *host, self.id, self.preview.take().map(|p| p.node))?;
        let instance = preview::spawn(
            &mut *host,
            self.id,
            self.node,
            template,
            version,
            config.preview_flags(),
        )?;
        tracing::debug!(
            proxy = %self.id,
            %template,
            preview = %instance.node,
            replaced = purged.destroyed,
            "preview regenerated"
        );
        self.preview = Some(instance);

        scheduler.request_repaint(&mut *host);
        if config.bump_generation_on_regenerate {
            scheduler.request_generation_bump(&mut *host);
        }
        Ok(instance.node)
    }

    fn reject<H: SceneHost + ?Sized>(
        &mut self,
        host: &mut H,
        scheduler: &mut RedrawScheduler,
        rejection: Rejection,
    ) -> Result<(), ProxyError> {
        self.transition(ProxyState::Rejected)?;
        tracing::error!(
            proxy = %self.id,
            node = %self.node,
            %rejection,
            "template reference rejected"
        );

        let kind = match rejection {
            Rejection::NestedProxy { .. } => DiagnosticKind::NestedProxy,
            Rejection::ContainmentCycle { .. } => DiagnosticKind::ContainmentCycle,
            Rejection::RootPlacement => DiagnosticKind::RootPlacement,
        };
        host.report(Diagnostic::error(kind, self.id, self.node, rejection.to_string()));

        self.template = None;
        self.last_observed_version = None;
        self.last_seen_generation = None;
        self.recheck_pending = false;

        let purged = self.drop_preview(host, scheduler);
        self.transition(ProxyState::Empty)?;
        purged?;
        Ok(())
    }

    fn clear<H: SceneHost + ?Sized>(
        &mut self,
        host: &mut H,
        scheduler: &mut RedrawScheduler,
    ) -> Result<RefreshOutcome, ProxyError> {
        if self.state == ProxyState::Empty && self.preview.is_none() {
            return Ok(RefreshOutcome::Idle);
        }
        self.last_observed_version = None;
        self.last_seen_generation = None;

        let purged = self.drop_preview(host, scheduler);
        if self.state != ProxyState::Empty {
            self.transition(ProxyState::Empty)?;
        }
        purged?;
        Ok(RefreshOutcome::Cleared)
    }

    fn drop_preview<H: SceneHost + ?Sized>(
        &mut self,
        host: &mut H,
        scheduler: &mut RedrawScheduler,
    ) -> Result<PurgeReport, HostError> {
        let report = preview::purge(&mut *host, self.id, self.preview.take().map(|p| p.node))?;
        if report.destroyed > 0 {
            scheduler.request_repaint(&mut *host);
        }
        Ok(report)
    }

    fn preview_current<H: SceneHost + ?Sized>(&self, host: &H, template: TemplateId) -> bool {
        self.preview
            .is_some_and(|p| p.template == template && host.exists(p.node))
    }

    fn transition(&mut self, to: ProxyState) -> Result<(), StateMachineError> {
        state_machine::validate_transition(self.state, to)?;
        tracing::trace!(proxy = %self.id, from = ?self.state, ?to, "proxy transition");
        self.state = to;
        Ok(())
    }
}

//! Authoring-session simulator
//!
//! Generates random authoring operations (template edits, reparenting,
//! reassignment, stray children, foreign capabilities, deletions) against a
//! [`MemoryScene`], ticks the [`EditorLoop`] and checks the proxy invariants
//! after every tick.

use prefab_proxy::{
    Capability, EditorLoop, Generation, MemoryScene, NestingPolicy, NodeBlueprint, NodeId,
    ProxyConfig, ProxyId, ProxyState, SceneGraph, TemplateId, TickReport,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Simulator configuration
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Host ticks to run
    pub ticks: u64,
    /// Authoring operations applied before each tick
    pub ops_per_tick: usize,
    pub proxy: ProxyConfig,
    pub stop_on_first_violation: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            ticks: 500,
            ops_per_tick: 3,
            proxy: ProxyConfig::default(),
            stop_on_first_violation: true,
        }
    }
}

/// All authoring operations the simulator can generate
#[derive(Debug, Clone, Serialize)]
pub enum SimulatedOperation {
    CreateTemplate,
    DeleteTemplate(TemplateId),
    EditTemplate { template: TemplateId, grow: bool },
    TouchTemplate(TemplateId),
    NestTemplate { outer: TemplateId, inner: TemplateId },
    UnnestTemplate(TemplateId),
    AddAnchor { parent: Option<NodeId> },
    AddProxy { parent: Option<NodeId>, template: Option<TemplateId> },
    Reassign { node: NodeId, template: Option<TemplateId> },
    Reparent { node: NodeId, parent: Option<NodeId> },
    DestroyNode(NodeId),
    AddForeignCapability(NodeId),
    AddStrayChild(NodeId),
}

impl SimulatedOperation {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateTemplate => "CreateTemplate",
            Self::DeleteTemplate(_) => "DeleteTemplate",
            Self::EditTemplate { .. } => "EditTemplate",
            Self::TouchTemplate(_) => "TouchTemplate",
            Self::NestTemplate { .. } => "NestTemplate",
            Self::UnnestTemplate(_) => "UnnestTemplate",
            Self::AddAnchor { .. } => "AddAnchor",
            Self::AddProxy { .. } => "AddProxy",
            Self::Reassign { .. } => "Reassign",
            Self::Reparent { .. } => "Reparent",
            Self::DestroyNode(_) => "DestroyNode",
            Self::AddForeignCapability(_) => "AddForeignCapability",
            Self::AddStrayChild(_) => "AddStrayChild",
        }
    }
}

/// Types of invariant checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InvariantCheck {
    AtMostOnePreviewPerProxy,
    NoOrphanPreviews,
    PreviewsAreTopLevel,
    ValidProxyHasLivePreview,
    NoTransientStates,
    StrictPreviewsHoldNoProxies,
    GenerationIsMonotonic,
}

/// An invariant violation detected after a tick
#[derive(Debug, Clone, Serialize)]
pub struct Violation {
    pub tick: u64,
    pub check: InvariantCheck,
    pub details: String,
}

/// Statistics collected during simulation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OperationStats {
    pub total_operations: u64,
    pub successful_operations: u64,
    pub failed_operations: u64,
    pub operations_by_type: BTreeMap<String, u64>,
    pub attached: u64,
    pub regenerated: u64,
    pub rejected: u64,
    pub corrected: u64,
    pub pruned: u64,
    pub deferred_run: u64,
    pub tick_errors: u64,
}

impl OperationStats {
    pub fn record(&mut self, operation: &SimulatedOperation, result: &Result<(), String>) {
        self.total_operations += 1;
        *self.operations_by_type.entry(operation.kind().to_string()).or_insert(0) += 1;

        match result {
            Ok(()) => self.successful_operations += 1,
            Err(_) => self.failed_operations += 1,
        }
    }

    pub fn absorb(&mut self, tick: &TickReport) {
        self.attached += tick.attached as u64;
        self.regenerated += tick.redraw.regenerated as u64;
        self.rejected += tick.redraw.rejected as u64;
        self.corrected += tick.redraw.corrected as u64;
        self.pruned += tick.pruned as u64;
        self.deferred_run += tick.deferred_run as u64;
        self.tick_errors += (tick.errors + tick.redraw.failed) as u64;
    }
}

/// Final report from the simulator
#[derive(Debug, Clone, Serialize)]
pub struct SimulatorReport {
    pub seed: u64,
    pub policy: NestingPolicy,
    pub ticks_run: u64,
    pub stats: OperationStats,
    pub violations: Vec<Violation>,
    pub final_proxy_count: usize,
    pub final_preview_count: usize,
    pub final_generation: u64,
    pub diagnostics_reported: usize,
}

impl SimulatorReport {
    /// Check if simulation passed all criteria
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// Generate a text report
    pub fn generate_text(&self) -> String {
        let mut report = String::new();

        report.push_str("=== Prefab Proxy Simulator Report ===\n\n");
        report.push_str(&format!("Seed: {}\n", self.seed));
        report.push_str(&format!("Policy: {:?}\n", self.policy));
        report.push_str(&format!("Ticks: {}\n", self.ticks_run));
        report.push_str(&format!("Total Operations: {}\n", self.stats.total_operations));
        report.push_str(&format!("Successful: {}\n", self.stats.successful_operations));
        report.push_str(&format!("Failed: {}\n", self.stats.failed_operations));
        report.push_str("\nOperations by type:\n");
        for (kind, count) in &self.stats.operations_by_type {
            report.push_str(&format!("  {kind}: {count}\n"));
        }

        report.push_str("\nProxy activity:\n");
        report.push_str(&format!("  Attached: {}\n", self.stats.attached));
        report.push_str(&format!("  Regenerated: {}\n", self.stats.regenerated));
        report.push_str(&format!("  Rejected: {}\n", self.stats.rejected));
        report.push_str(&format!("  Corrected: {}\n", self.stats.corrected));
        report.push_str(&format!("  Pruned: {}\n", self.stats.pruned));
        report.push_str(&format!("  Deferred tasks run: {}\n", self.stats.deferred_run));
        report.push_str(&format!("  Tick errors: {}\n", self.stats.tick_errors));
        report.push_str(&format!("  Diagnostics: {}\n", self.diagnostics_reported));

        report.push_str("\nFinal state:\n");
        report.push_str(&format!("  Proxies: {}\n", self.final_proxy_count));
        report.push_str(&format!("  Previews: {}\n", self.final_preview_count));
        report.push_str(&format!("  Generation: {}\n", self.final_generation));

        report.push_str(&format!("\nViolations: {}\n", self.violations.len()));
        for violation in &self.violations {
            report.push_str(&format!(
                "  [tick {}] {:?}: {}\n",
                violation.tick, violation.check, violation.details
            ));
        }

        report.push_str(&format!(
            "\nResult: {}\n",
            if self.passed() { "PASSED" } else { "FAILED" }
        ));
        report
    }
}

/// One simulated authoring session.
pub struct Simulator {
    rng: StdRng,
    policy: NestingPolicy,
    scene: MemoryScene,
    editor: EditorLoop,
    /// Live templates, creation order.
    templates: Vec<TemplateId>,
    /// Authored anchors, proxies and stray children, creation order.
    authored: Vec<NodeId>,
    last_generation: Generation,
    names: u64,
}

impl Simulator {
    pub fn new(config: &SimulatorConfig) -> Self {
        let mut sim = Self {
            rng: StdRng::seed_from_u64(config.seed),
            policy: config.proxy.nesting,
            scene: MemoryScene::new(),
            editor: EditorLoop::with_config(config.proxy.clone()),
            templates: Vec::new(),
            authored: Vec::new(),
            last_generation: Generation::default(),
            names: 0,
        };

        for _ in 0..4 {
            sim.create_template();
        }
        for _ in 0..3 {
            if let Ok(anchor) = sim.scene.add_node("anchor", None) {
                sim.authored.push(anchor);
            }
        }
        sim
    }

    pub fn scene(&self) -> &MemoryScene {
        &self.scene
    }

    pub fn editor(&self) -> &EditorLoop {
        &self.editor
    }

    pub fn next_operation(&mut self) -> SimulatedOperation {
        let roll = self.rng.gen_range(0..100u32);
        let operation = match roll {
            0..=11 => Some(SimulatedOperation::AddProxy {
                parent: self.pick_parent(),
                template: self.pick_template_or_none(),
            }),
            12..=19 => Some(SimulatedOperation::AddAnchor {
                parent: self.pick_parent(),
            }),
            20..=34 => self.pick_template().map(|template| SimulatedOperation::EditTemplate {
                template,
                grow: self.rng.gen_bool(0.7),
            }),
            35..=42 => self.pick_template().map(SimulatedOperation::TouchTemplate),
            43..=48 => match (self.pick_template(), self.pick_template()) {
                (Some(outer), Some(inner)) => {
                    Some(SimulatedOperation::NestTemplate { outer, inner })
                }
                _ => None,
            },
            49..=54 => self.pick_template().map(SimulatedOperation::UnnestTemplate),
            55..=64 => self.pick_proxy().map(|node| SimulatedOperation::Reassign {
                node,
                template: self.pick_template_or_none(),
            }),
            65..=72 => self.pick_authored().map(|node| SimulatedOperation::Reparent {
                node,
                parent: self.pick_parent(),
            }),
            73..=78 => self.pick_authored().map(SimulatedOperation::DestroyNode),
            79..=83 => self.pick_proxy().map(SimulatedOperation::AddForeignCapability),
            84..=88 => self.pick_proxy().map(SimulatedOperation::AddStrayChild),
            89..=94 => Some(SimulatedOperation::CreateTemplate),
            _ if self.templates.len() > 2 => {
                self.pick_template().map(SimulatedOperation::DeleteTemplate)
            }
            _ => None,
        };
        operation.unwrap_or(SimulatedOperation::CreateTemplate)
    }

    pub fn apply(&mut self, operation: &SimulatedOperation) -> Result<(), String> {
        let result = match *operation {
            SimulatedOperation::CreateTemplate => {
                self.create_template();
                Ok(())
            }
            SimulatedOperation::DeleteTemplate(template) => {
                self.scene.remove_template(template);
                self.templates.retain(|t| *t != template);
                Ok(())
            }
            SimulatedOperation::EditTemplate { template, grow } => {
                let part = self.next_name("part");
                self.scene.edit_template(template, |root| {
                    if grow || root.children.is_empty() {
                        root.children.push(NodeBlueprint::new(part));
                    } else {
                        root.children.pop();
                    }
                })
            }
            SimulatedOperation::TouchTemplate(template) => self.scene.touch_template(template),
            SimulatedOperation::NestTemplate { outer, inner } => {
                self.scene.edit_template(outer, |root| {
                    root.children.push(NodeBlueprint::proxy("nested", Some(inner)));
                })
            }
            SimulatedOperation::UnnestTemplate(template) => {
                self.scene.edit_template(template, |root| {
                    root.children.retain(|child| !child.is_proxy());
                })
            }
            SimulatedOperation::AddAnchor { parent } => {
                self.scene.add_node("anchor", parent).map(|node| {
                    self.authored.push(node);
                })
            }
            SimulatedOperation::AddProxy { parent, template } => {
                self.scene.add_proxy_node("proxy", parent, template).map(|node| {
                    self.authored.push(node);
                })
            }
            SimulatedOperation::Reassign { node, template } => {
                let id = self
                    .editor
                    .runtime()
                    .proxy_for_node(node)
                    .map(|proxy| proxy.id())
                    .ok_or_else(|| format!("{node} has no attached proxy yet"))?;
                return self
                    .editor
                    .runtime_mut()
                    .set_template(id, template)
                    .map_err(|e| e.to_string());
            }
            SimulatedOperation::Reparent { node, parent } => self.scene.reparent(node, parent),
            SimulatedOperation::DestroyNode(node) => self.scene.destroy(node),
            SimulatedOperation::AddForeignCapability(node) => {
                self.scene.add_capability(node, Capability::Named("Collider".into()))
            }
            SimulatedOperation::AddStrayChild(node) => {
                self.scene.add_node("stray", Some(node)).map(|child| {
                    self.authored.push(child);
                })
            }
        };
        result.map_err(|e| e.to_string())
    }

    pub fn tick(&mut self) -> TickReport {
        self.editor.tick(&mut self.scene)
    }

    /// Tick until nothing is left to do, at most `limit` times.
    pub fn settle(&mut self, limit: u64, stats: &mut OperationStats) -> u64 {
        let mut ran = 0;
        while ran < limit {
            let report = self.tick();
            stats.absorb(&report);
            ran += 1;
            if report.is_quiet() && self.scene.deferred().next().is_none() {
                break;
            }
        }
        ran
    }

    pub fn check_invariants(&mut self, tick: u64) -> Vec<Violation> {
        let mut violations = Vec::new();
        let mut violate = |check, details: String| {
            violations.push(Violation {
                tick,
                check,
                details,
            });
        };

        let runtime = self.editor.runtime();
        let top_level: HashSet<NodeId> = self.scene.top_level().into_iter().collect();
        let mut per_owner: HashMap<ProxyId, usize> = HashMap::new();
        for (node, tag) in self.scene.previews() {
            *per_owner.entry(tag.owner).or_insert(0) += 1;
            if runtime.proxy(tag.owner).is_none() {
                violate(
                    InvariantCheck::NoOrphanPreviews,
                    format!("{node} is owned by departed {}", tag.owner),
                );
            }
            if !top_level.contains(&node) {
                violate(InvariantCheck::PreviewsAreTopLevel, format!("{node} has a parent"));
            }
        }
        for (owner, count) in per_owner {
            if count > 1 {
                violate(
                    InvariantCheck::AtMostOnePreviewPerProxy,
                    format!("{owner} owns {count} previews"),
                );
            }
        }

        for proxy in runtime.proxies() {
            let live_preview = proxy.preview().is_some_and(|p| self.scene.exists(p.node));
            match proxy.state() {
                ProxyState::Checking | ProxyState::Rejected => violate(
                    InvariantCheck::NoTransientStates,
                    format!("{} left in {:?}", proxy.id(), proxy.state()),
                ),
                ProxyState::Valid if !live_preview => violate(
                    InvariantCheck::ValidProxyHasLivePreview,
                    format!("{} is valid without a preview", proxy.id()),
                ),
                _ => {}
            }
        }

        if self.policy == NestingPolicy::Strict {
            for node in self.scene.proxy_nodes() {
                if self.scene.is_preview_content(node) {
                    violate(
                        InvariantCheck::StrictPreviewsHoldNoProxies,
                        format!("proxy {node} rendered inside a preview"),
                    );
                }
            }
        }

        let generation = runtime.current_generation();
        if generation < self.last_generation {
            violate(
                InvariantCheck::GenerationIsMonotonic,
                format!("generation went from {} to {}", self.last_generation.0, generation.0),
            );
        }
        self.last_generation = generation;

        violations
    }

    fn create_template(&mut self) {
        let name = self.next_name("template");
        let template = self.scene.add_template(
            &name,
            NodeBlueprint::new(name.clone()).with_child(NodeBlueprint::new("body")),
        );
        self.templates.push(template);
    }

    fn next_name(&mut self, prefix: &str) -> String {
        self.names += 1;
        format!("{prefix}{}", self.names)
    }

    fn pick_template(&mut self) -> Option<TemplateId> {
        pick(&mut self.rng, &self.templates)
    }

    fn pick_template_or_none(&mut self) -> Option<TemplateId> {
        if self.rng.gen_bool(0.1) {
            None
        } else {
            self.pick_template()
        }
    }

    fn pick_authored(&mut self) -> Option<NodeId> {
        let scene = &self.scene;
        self.authored.retain(|node| scene.exists(*node));
        pick(&mut self.rng, &self.authored)
    }

    /// `None` means top level; a tenth of placements land there.
    fn pick_parent(&mut self) -> Option<NodeId> {
        if self.rng.gen_bool(0.1) {
            None
        } else {
            self.pick_authored()
        }
    }

    fn pick_proxy(&mut self) -> Option<NodeId> {
        let scene = &self.scene;
        self.authored.retain(|node| scene.exists(*node));
        let proxies: Vec<NodeId> = self
            .authored
            .iter()
            .copied()
            .filter(|node| {
                scene
                    .capabilities(*node)
                    .is_ok_and(|caps| caps.contains(&Capability::Proxy))
            })
            .collect();
        pick(&mut self.rng, &proxies)
    }
}

fn pick<T: Copy>(rng: &mut StdRng, items: &[T]) -> Option<T> {
    if items.is_empty() {
        None
    } else {
        Some(items[rng.gen_range(0..items.len())])
    }
}

/// Run a full simulated session and report on it.
pub fn run_simulator(config: SimulatorConfig) -> SimulatorReport {
    tracing::info!(
        seed = config.seed,
        ticks = config.ticks,
        policy = ?config.proxy.nesting,
        "simulation started"
    );

    let mut sim = Simulator::new(&config);
    let mut stats = OperationStats::default();
    let mut violations = Vec::new();
    let mut ticks_run = 0;

    for tick in 1..=config.ticks {
        for _ in 0..config.ops_per_tick {
            let operation = sim.next_operation();
            let result = sim.apply(&operation);
            if let Err(e) = &result {
                tracing::debug!(operation = operation.kind(), error = %e, "operation failed");
            }
            stats.record(&operation, &result);
        }

        let report = sim.tick();
        stats.absorb(&report);
        ticks_run = tick;

        violations.extend(sim.check_invariants(tick));
        if config.stop_on_first_violation && !violations.is_empty() {
            break;
        }
    }

    if violations.is_empty() || !config.stop_on_first_violation {
        ticks_run += sim.settle(16, &mut stats);
        violations.extend(sim.check_invariants(ticks_run));
    }

    let report = SimulatorReport {
        seed: config.seed,
        policy: config.proxy.nesting,
        ticks_run,
        stats,
        violations,
        final_proxy_count: sim.editor().runtime().len(),
        final_preview_count: sim.scene().previews().len(),
        final_generation: sim.editor().runtime().current_generation().0,
        diagnostics_reported: sim.scene().diagnostics().len(),
    };
    tracing::info!(
        passed = report.passed(),
        violations = report.violations.len(),
        "simulation finished"
    );
    report
}

use super::MemoryScene;
use crate::api::SceneGraph;
use crate::config::ProxyConfig;
use crate::runtime::{ProxyRuntime, RedrawSummary};
use serde::Serialize;

/// What one host tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub tick: u64,
    pub attached: usize,
    pub deferred_run: usize,
    pub redraw: RedrawSummary,
    pub pruned: usize,
    pub errors: usize,
}

impl TickReport {
    /// Nothing was attached, run, rebuilt, rejected or pruned.
    pub fn is_quiet(&self) -> bool {
        self.attached == 0
            && self.deferred_run == 0
            && self.redraw.regenerated == 0
            && self.redraw.rejected == 0
            && self.redraw.cleared == 0
            && self.pruned == 0
            && self.errors == 0
    }
}

/// Drives a [`ProxyRuntime`] against a [`MemoryScene`] the way an editor's
/// idle loop would.
#[derive(Debug, Default)]
pub struct EditorLoop {
    runtime: ProxyRuntime,
    ticks: u64,
}

impl EditorLoop {
    pub fn new() -> Self {
        Self::with_config(ProxyConfig::default())
    }

    pub fn with_config(config: ProxyConfig) -> Self {
        Self {
            runtime: ProxyRuntime::with_config(config),
            ticks: 0,
        }
    }

    pub fn runtime(&self) -> &ProxyRuntime {
        &self.runtime
    }

    pub fn runtime_mut(&mut self) -> &mut ProxyRuntime {
        &mut self.runtime
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// One host tick:
    /// 1. attach proxies instantiated since the last tick
    /// 2. run the tasks deferred on earlier ticks
    /// 3. give every proxy a redraw opportunity
    /// 4. detach proxies whose nodes disappeared (until none are left)
    ///
    /// The deferred batch is taken before anything else runs, so a task
    /// queued during this tick waits for the next one.
    pub fn tick(&mut self, scene: &mut MemoryScene) -> TickReport {
        self.ticks += 1;
        let mut report = TickReport {
            tick: self.ticks,
            ..TickReport::default()
        };
        let due = scene.take_deferred();

        for (node, template) in scene.take_spawned_proxies() {
            if !scene.exists(node) || self.runtime.proxy_for_node(node).is_some() {
                continue;
            }
            match self.runtime.attach(scene, node, template) {
                Ok(_) => report.attached += 1,
                Err(e) => {
                    report.errors += 1;
                    tracing::warn!(%node, error = %e, "attach failed");
                }
            }
        }

        for task in due {
            report.deferred_run += 1;
            if let Err(e) = self.runtime.run_deferred(scene, task) {
                report.errors += 1;
                tracing::warn!(?task, error = %e, "deferred task failed");
            }
        }

        report.redraw = self.runtime.redraw_all(scene);

        loop {
            match self.runtime.prune(scene) {
                Ok(0) => break,
                Ok(pruned) => report.pruned += pruned,
                Err(e) => {
                    report.errors += 1;
                    tracing::warn!(error = %e, "prune failed");
                    break;
                }
            }
        }

        tracing::trace!(
            tick = self.ticks,
            attached = report.attached,
            pruned = report.pruned,
            "tick done"
        );
        report
    }

    /// Tick until a tick is quiet with nothing left deferred, at most `limit`
    /// times. Returns the number of ticks run.
    pub fn settle(&mut self, scene: &mut MemoryScene, limit: u64) -> u64 {
        let mut ran = 0;
        while ran < limit {
            let report = self.tick(scene);
            ran += 1;
            if report.is_quiet() && scene.deferred().next().is_none() {
                break;
            }
        }
        ran
    }
}

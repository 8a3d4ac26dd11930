//! Coalesced view repaints and the redraw generation counter.
//!
//! Access is serialized by the host's single-threaded tick model, so the
//! pending flags are plain fields. A multi-threaded host would swap them for an
//! atomic counter and a request queue drained by one consumer.

use crate::api::{DeferredQueue, DeferredTask, ViewRepainter};
use crate::types::Generation;

#[derive(Debug, Default)]
pub struct RedrawScheduler {
    generation: Generation,
    repaint_pending: bool,
    bump_pending: bool,
    repaints: u64,
}

impl RedrawScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_generation(&self) -> Generation {
        self.generation
    }

    /// Whether a deferred repaint is waiting to run.
    pub fn is_pending(&self) -> bool {
        self.repaint_pending
    }

    /// Number of repaints performed so far.
    pub fn repaint_count(&self) -> u64 {
        self.repaints
    }

    /// Request one repaint on a later tick.
    ///
    /// Returns `true` when this call scheduled the deferred task, `false` when
    /// one was already pending in this idle window.
    pub fn request_repaint<Q: DeferredQueue + ?Sized>(&mut self, queue: &mut Q) -> bool {
        if self.repaint_pending {
            return false;
        }
        self.repaint_pending = true;
        queue.defer(DeferredTask::Repaint);
        tracing::trace!("repaint scheduled");
        true
    }

    /// Request that the generation advance when the pending repaint runs.
    pub fn request_generation_bump<Q: DeferredQueue + ?Sized>(&mut self, queue: &mut Q) {
        self.bump_pending = true;
        self.request_repaint(queue);
    }

    /// Body of the deferred [`DeferredTask::Repaint`] task.
    ///
    /// Returns `false` for a superseded task (nothing pending).
    pub fn run_repaint<V: ViewRepainter + ?Sized>(&mut self, views: &mut V) -> bool {
        if !self.repaint_pending {
            return false;
        }
        if self.bump_pending {
            self.generation = self.generation.next();
            self.bump_pending = false;
        }
        views.repaint_all_views();
        self.repaints += 1;
        self.repaint_pending = false;
        tracing::debug!(generation = self.generation.0, "views repainted");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        deferred: Vec<DeferredTask>,
        repaints: usize,
    }

    impl DeferredQueue for Recorder {
        fn defer(&mut self, task: DeferredTask) {
            self.deferred.push(task);
        }
    }

    impl ViewRepainter for Recorder {
        fn repaint_all_views(&mut self) {
            self.repaints += 1;
        }
    }

    #[test]
    fn test_requests_coalesce_into_one_task() {
        let mut scheduler = RedrawScheduler::new();
        let mut host = Recorder::default();

        assert!(scheduler.request_repaint(&mut host));
        assert!(!scheduler.request_repaint(&mut host));
        scheduler.request_generation_bump(&mut host);

        assert_eq!(host.deferred, vec![DeferredTask::Repaint]);
        assert!(scheduler.is_pending());
    }

    #[test]
    fn test_bump_applies_only_when_task_runs() {
        let mut scheduler = RedrawScheduler::new();
        let mut host = Recorder::default();

        scheduler.request_generation_bump(&mut host);
        assert_eq!(scheduler.current_generation(), Generation(0));

        assert!(scheduler.run_repaint(&mut host));
        assert_eq!(scheduler.current_generation(), Generation(1));
        assert_eq!(host.repaints, 1);
        assert!(!scheduler.is_pending());
    }

    #[test]
    fn test_plain_repaint_keeps_generation() {
        let mut scheduler = RedrawScheduler::new();
        let mut host = Recorder::default();

        scheduler.request_repaint(&mut host);
        scheduler.run_repaint(&mut host);

        assert_eq!(scheduler.current_generation(), Generation(0));
    }

    #[test]
    fn test_superseded_task_is_ignored() {
        let mut scheduler = RedrawScheduler::new();
        let mut host = Recorder::default();

        assert!(!scheduler.run_repaint(&mut host));
        assert_eq!(host.repaints, 0);
    }
}

use prefab_proxy::scheduler::RedrawScheduler;
use prefab_proxy::{DeferredTask, Generation, MemoryScene};
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
enum Request {
    Repaint,
    Bump,
}

fn request() -> impl Strategy<Value = Request> {
    prop_oneof![Just(Request::Repaint), Just(Request::Bump)]
}

#[test]
fn test_generation_starts_at_zero() {
    assert_eq!(RedrawScheduler::new().current_generation(), Generation(0));
}

#[test]
fn test_task_after_run_is_superseded() {
    let mut scheduler = RedrawScheduler::new();
    let mut scene = MemoryScene::new();

    scheduler.request_generation_bump(&mut scene);
    assert!(scheduler.run_repaint(&mut scene));
    assert!(!scheduler.run_repaint(&mut scene));

    assert_eq!(scene.repaint_count(), 1);
    assert_eq!(scheduler.current_generation(), Generation(1));
}

proptest! {
    #[test]
    fn prop_requests_within_a_tick_coalesce(requests in prop::collection::vec(request(), 1..50)) {
        let mut scheduler = RedrawScheduler::new();
        let mut scene = MemoryScene::new();

        for request in &requests {
            match request {
                Request::Repaint => { scheduler.request_repaint(&mut scene); }
                Request::Bump => scheduler.request_generation_bump(&mut scene),
            }
        }
        prop_assert_eq!(scene.take_deferred(), vec![DeferredTask::Repaint]);

        prop_assert!(scheduler.run_repaint(&mut scene));
        let bumped = requests.iter().any(|r| matches!(r, Request::Bump));
        prop_assert_eq!(scheduler.current_generation(), Generation(u64::from(bumped)));
        prop_assert_eq!(scene.repaint_count(), 1);
        prop_assert_eq!(scheduler.repaint_count(), 1);
    }

    #[test]
    fn prop_generation_is_monotonic(ticks in prop::collection::vec(any::<bool>(), 1..30)) {
        let mut scheduler = RedrawScheduler::new();
        let mut scene = MemoryScene::new();
        let mut last = scheduler.current_generation();

        for bump in ticks {
            if bump {
                scheduler.request_generation_bump(&mut scene);
            } else {
                scheduler.request_repaint(&mut scene);
            }
            for task in scene.take_deferred() {
                prop_assert_eq!(task, DeferredTask::Repaint);
                scheduler.run_repaint(&mut scene);
            }

            let now = scheduler.current_generation();
            prop_assert!(now >= last);
            prop_assert_eq!(now.0 - last.0, u64::from(bump));
            last = now;
        }
    }
}

//! Template containment analysis and nesting policies, end to end.

use pretty_assertions::assert_eq;
use prefab_proxy::nesting::ContainmentGraph;
use prefab_proxy::validation::{template_label, StructuralValidator};
use prefab_proxy::*;
use prefab_proxy_test_utils::*;
use proptest::prelude::*;

fn authored_proxy(scene: &mut MemoryScene, template: TemplateId) -> NodeId {
    let level = scene.add_node("level", None).unwrap();
    scene.add_proxy_node("placeholder", Some(level), Some(template)).unwrap()
}

#[test]
fn test_explore_plain_template() {
    let mut scene = MemoryScene::new();
    let plain = plain_template(&mut scene, "plain");

    let graph = ContainmentGraph::explore(&scene, plain).unwrap();
    assert_eq!(graph.root(), plain);
    assert!(!graph.contains_nested_proxies());
    assert_eq!(graph.template_count(), 1);
    assert!(graph.edges().is_empty());
    assert!(!graph.is_cyclic());
}

#[test]
fn test_explore_chain() {
    let mut scene = MemoryScene::new();
    let leaf = plain_template(&mut scene, "leaf");
    let mid = template_with_proxy(&mut scene, "mid", Some(leaf));
    let top = template_with_proxy(&mut scene, "top", Some(mid));

    let graph = ContainmentGraph::explore(&scene, top).unwrap();
    assert_eq!(graph.nested_proxy_count(), 1);
    assert_eq!(graph.template_count(), 3);
    assert!(graph.exceeds_single_level());
    assert!(graph.cycles().is_empty());
    assert_eq!(
        graph.describe(|t| template_label(&scene, t)),
        "top -> mid, mid -> leaf"
    );
}

#[test]
fn test_explore_treats_missing_nested_template_as_leaf() {
    let mut scene = MemoryScene::new();
    let dangling = template_with_proxy(&mut scene, "dangling", Some(TemplateId::new()));

    let graph = ContainmentGraph::explore(&scene, dangling).unwrap();
    assert_eq!(graph.template_count(), 2);
    assert!(!graph.exceeds_single_level());
}

#[test]
fn test_explore_missing_root_fails() {
    let scene = MemoryScene::new();
    let missing = TemplateId::new();
    assert!(matches!(
        ContainmentGraph::explore(&scene, missing),
        Err(HostError::TemplateNotFound(t)) if t == missing
    ));
}

#[test]
fn test_diamond_is_not_a_cycle() {
    let mut scene = MemoryScene::new();
    let leaf = plain_template(&mut scene, "leaf");
    let left = template_with_proxy(&mut scene, "left", Some(leaf));
    let right = template_with_proxy(&mut scene, "right", Some(leaf));
    let top = scene.add_template(
        "top",
        NodeBlueprint::new("top")
            .with_child(NodeBlueprint::proxy("l", Some(left)))
            .with_child(NodeBlueprint::proxy("r", Some(right))),
    );

    let graph = ContainmentGraph::explore(&scene, top).unwrap();
    assert_eq!(graph.nested_proxy_count(), 2);
    assert_eq!(graph.template_count(), 4);
    assert!(!graph.is_cyclic());
}

#[test]
fn test_policies_disagree_on_single_level() {
    let mut scene = MemoryScene::new();
    let leaf = plain_template(&mut scene, "leaf");
    let holder = template_with_proxy(&mut scene, "holder", Some(leaf));
    let graph = ContainmentGraph::explore(&scene, holder).unwrap();
    let label = |t| template_label(&scene, t);

    let strict = StructuralValidator::new(NestingPolicy::Strict);
    let single = StructuralValidator::new(NestingPolicy::SingleLevel);
    assert_eq!(StructuralValidator::default().policy(), strict.policy());
    assert_eq!(single.policy(), NestingPolicy::SingleLevel);
    assert!(matches!(strict.check_nesting(&graph, label), Some(Rejection::NestedProxy { .. })));
    assert_eq!(single.check_nesting(&graph, label), None);
}

#[test]
fn test_single_level_nesting_renders_both_previews() {
    let mut scene = MemoryScene::new();
    let leaf = plain_template(&mut scene, "leaf");
    let holder = template_with_proxy(&mut scene, "holder", Some(leaf));
    authored_proxy(&mut scene, holder);

    let mut editor = EditorLoop::with_config(single_level_config());
    editor.settle(&mut scene, 10);

    let runtime = editor.runtime();
    assert_eq!(runtime.len(), 2);
    assert!(runtime.proxies().all(|p| p.state() == ProxyState::Valid));
    assert_eq!(scene.previews().len(), 2);
    assert!(scene.diagnostics().is_empty());

    // The nested proxy lives inside the outer preview.
    let nested = runtime
        .proxies()
        .find(|p| p.template() == Some(leaf))
        .map(ProxyComponent::node)
        .unwrap();
    assert!(scene.is_preview_content(nested));
}

#[test]
fn test_outer_regeneration_replaces_nested_proxy() {
    let mut scene = MemoryScene::new();
    let leaf = plain_template(&mut scene, "leaf");
    let holder = template_with_proxy(&mut scene, "holder", Some(leaf));
    authored_proxy(&mut scene, holder);

    let mut editor = EditorLoop::with_config(single_level_config());
    editor.settle(&mut scene, 10);
    scene.touch_template(holder).unwrap();
    editor.settle(&mut scene, 10);

    assert_eq!(editor.runtime().len(), 2);
    let previews = scene.previews();
    assert_eq!(previews.len(), 2);
    for (_, tag) in previews {
        assert!(editor.runtime().proxy(tag.owner).is_some());
    }
}

#[test]
fn test_two_levels_rejected_under_single_level() {
    let mut scene = MemoryScene::new();
    let leaf = plain_template(&mut scene, "leaf");
    let mid = template_with_proxy(&mut scene, "mid", Some(leaf));
    let top = template_with_proxy(&mut scene, "top", Some(mid));
    let node = authored_proxy(&mut scene, top);

    let mut editor = EditorLoop::with_config(single_level_config());
    editor.settle(&mut scene, 10);

    let proxy = editor.runtime().proxy_for_node(node).unwrap();
    assert_eq!(proxy.template(), None);
    assert!(scene.previews().is_empty());
    assert_eq!(scene.diagnostics().len(), 1);
    assert_eq!(scene.diagnostics()[0].kind, DiagnosticKind::NestedProxy);
    assert!(scene.diagnostics()[0].message.contains("mid -> leaf"));
}

#[test]
fn test_strict_rejects_single_level() {
    let mut scene = MemoryScene::new();
    let leaf = plain_template(&mut scene, "leaf");
    let holder = template_with_proxy(&mut scene, "holder", Some(leaf));
    let node = authored_proxy(&mut scene, holder);

    let mut editor = EditorLoop::new();
    editor.settle(&mut scene, 10);

    assert_eq!(editor.runtime().proxy_for_node(node).unwrap().template(), None);
    assert!(scene.previews().is_empty());
}

proptest! {
    #[test]
    fn prop_chain_depth_decides_single_level(depth in 0usize..5) {
        let mut scene = MemoryScene::new();
        let mut current = plain_template(&mut scene, "leaf");
        for level in 0..depth {
            current = template_with_proxy(&mut scene, &format!("t{level}"), Some(current));
        }

        let graph = ContainmentGraph::explore(&scene, current).unwrap();
        let verdict = StructuralValidator::new(NestingPolicy::SingleLevel)
            .check_nesting(&graph, |t| template_label(&scene, t));

        prop_assert_eq!(graph.template_count(), depth + 1);
        prop_assert_eq!(verdict.is_some(), depth >= 2);
    }

    #[test]
    fn prop_ring_is_always_a_cycle(size in 1usize..5) {
        let mut scene = MemoryScene::new();
        let ring: Vec<TemplateId> = (0..size)
            .map(|i| scene.add_template(&format!("r{i}"), NodeBlueprint::new("r")))
            .collect();
        for (i, template) in ring.iter().enumerate() {
            let next = ring[(i + 1) % size];
            scene
                .edit_template(*template, |root| {
                    root.children.push(NodeBlueprint::proxy("next", Some(next)));
                })
                .unwrap();
        }

        let graph = ContainmentGraph::explore(&scene, ring[0]).unwrap();
        prop_assert!(graph.is_cyclic());
        for policy in [NestingPolicy::Strict, NestingPolicy::SingleLevel] {
            let verdict = StructuralValidator::new(policy)
                .check_nesting(&graph, |t| template_label(&scene, t));
            prop_assert!(
                matches!(verdict, Some(Rejection::ContainmentCycle { .. })),
                "expected cycle rejection"
            );
        }
    }
}

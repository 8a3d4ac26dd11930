//! Execution-time replacement.

use pretty_assertions::assert_eq;
use prefab_proxy::*;
use prefab_proxy_test_utils::*;

#[test]
fn test_proxy_is_replaced_by_template_instance() {
    let mut scene = MemoryScene::new();
    let mut runtime = ProxyRuntime::new();
    let template = plain_template(&mut scene, "crate");
    let (parent, node) = parented_proxy_node(&mut scene, Some(template));

    let activation = runtime.activate(&mut scene, node, Some(template), Mode::Execution).unwrap();
    let Activation::Replaced { root } = activation else {
        panic!("expected replacement, got {activation:?}");
    };

    assert!(!scene.exists(node));
    assert_eq!(scene.parent(root).unwrap(), Some(parent));
    assert_eq!(scene.children(parent).unwrap(), vec![root]);
    assert_eq!(scene.transform(root).unwrap(), PROXY_TRANSFORM);
    assert_eq!(scene.name(root).unwrap(), "placeholder");
    assert_eq!(scene.children(root).unwrap().len(), 2);
    assert_eq!(scene.preview_tag(root), None);
    assert!(runtime.is_empty());
}

#[test]
fn test_top_level_proxy_is_replaced_at_top_level() {
    let mut scene = MemoryScene::new();
    let mut runtime = ProxyRuntime::new();
    let template = plain_template(&mut scene, "crate");
    let node = scene.add_proxy_node("loose", None, Some(template)).unwrap();

    let Activation::Replaced { root } = runtime
        .activate(&mut scene, node, Some(template), Mode::Execution)
        .unwrap()
    else {
        panic!("expected replacement");
    };
    assert_eq!(scene.parent(root).unwrap(), None);
    assert!(scene.diagnostics().is_empty());
}

#[test]
fn test_unset_template_degrades_silently() {
    let mut scene = MemoryScene::new();
    let mut runtime = ProxyRuntime::new();
    let (_, node) = parented_proxy_node(&mut scene, None);
    let nodes = scene.node_count();

    let activation = runtime.activate(&mut scene, node, None, Mode::Execution).unwrap();

    assert_eq!(activation, Activation::Degraded { node });
    assert!(scene.exists(node));
    assert_eq!(scene.capabilities(node).unwrap(), vec![Capability::Transform]);
    assert_eq!(scene.node_count(), nodes);
    assert!(scene.diagnostics().is_empty());
}

#[test]
fn test_unresolvable_template_degrades_silently() {
    let mut scene = MemoryScene::new();
    let mut runtime = ProxyRuntime::new();
    let template = plain_template(&mut scene, "crate");
    let (_, node) = parented_proxy_node(&mut scene, Some(template));
    scene.remove_template(template);

    let activation = runtime.activate(&mut scene, node, Some(template), Mode::Execution).unwrap();

    assert_eq!(activation, Activation::Degraded { node });
    assert_eq!(scene.capabilities(node).unwrap(), vec![Capability::Transform]);
    assert!(scene.diagnostics().is_empty());
}

#[test]
fn test_nested_proxies_replace_in_turn() {
    let mut scene = MemoryScene::new();
    let mut runtime = ProxyRuntime::new();
    let leaf = plain_template(&mut scene, "leaf");
    let holder = template_with_proxy(&mut scene, "holder", Some(leaf));
    let (_, node) = parented_proxy_node(&mut scene, Some(holder));
    scene.take_spawned_proxies();

    runtime.activate(&mut scene, node, Some(holder), Mode::Execution).unwrap();

    let spawned = scene.take_spawned_proxies();
    assert_eq!(spawned.len(), 1);
    let (nested, template) = spawned[0];
    assert_eq!(template, Some(leaf));

    let Activation::Replaced { root } = runtime
        .activate(&mut scene, nested, template, Mode::Execution)
        .unwrap()
    else {
        panic!("expected nested replacement");
    };
    assert_eq!(scene.name(root).unwrap(), "nested");
    assert!(scene.proxy_nodes().is_empty());
}

#[test]
fn test_authoring_activation_attaches() {
    let mut scene = MemoryScene::new();
    let mut runtime = ProxyRuntime::new();
    let template = plain_template(&mut scene, "crate");
    let (_, node) = parented_proxy_node(&mut scene, Some(template));

    let Activation::Attached(id) = runtime
        .activate(&mut scene, node, Some(template), Mode::Authoring)
        .unwrap()
    else {
        panic!("expected attachment");
    };
    assert!(scene.exists(node));
    assert_eq!(runtime.proxy(id).unwrap().state(), ProxyState::Valid);
    assert_single_preview(&scene, id);
}

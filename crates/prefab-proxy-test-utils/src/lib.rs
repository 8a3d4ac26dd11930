//! Testing utilities for the prefab-proxy workspace
//!
//! Shared scene fixtures and assertions.

#![allow(missing_docs)]

use prefab_proxy::{
    MemoryScene, NestingPolicy, NodeBlueprint, NodeId, ProxyConfig, ProxyId, ProxyRuntime,
    SceneGraph, TemplateId, Transform,
};

/// Transform given to authored proxy nodes, so copies are recognizable.
pub const PROXY_TRANSFORM: Transform = Transform {
    position: [1.0, 2.0, 3.0],
    rotation: [0.0, 0.0, 0.0, 1.0],
    scale: [2.0, 2.0, 2.0],
};

/// A proxy-free template: a root with two children.
pub fn plain_template(scene: &mut MemoryScene, name: &str) -> TemplateId {
    scene.add_template(
        name,
        NodeBlueprint::new(name)
            .with_child(NodeBlueprint::new("mesh"))
            .with_child(NodeBlueprint::new("collider")),
    )
}

/// A template whose root holds one proxy pointing at `inner`.
pub fn template_with_proxy(
    scene: &mut MemoryScene,
    name: &str,
    inner: Option<TemplateId>,
) -> TemplateId {
    scene.add_template(
        name,
        NodeBlueprint::new(name).with_child(NodeBlueprint::proxy("nested", inner)),
    )
}

/// Author a parent node with a proxy node under it.
/// Returns `(parent, proxy_node)`.
pub fn parented_proxy_node(
    scene: &mut MemoryScene,
    template: Option<TemplateId>,
) -> (NodeId, NodeId) {
    let parent = scene.add_node("level", None).unwrap();
    let node = scene.add_proxy_node("placeholder", Some(parent), template).unwrap();
    scene.set_transform(node, PROXY_TRANSFORM).unwrap();
    (parent, node)
}

/// Author a parented proxy and attach it to `runtime`.
pub fn attach_parented(
    runtime: &mut ProxyRuntime,
    scene: &mut MemoryScene,
    template: Option<TemplateId>,
) -> (ProxyId, NodeId) {
    let (_, node) = parented_proxy_node(scene, template);
    let (id, _) = runtime.attach(scene, node, template).unwrap();
    (id, node)
}

/// Run every deferred task queued right now. Returns how many ran.
pub fn drain_deferred(runtime: &mut ProxyRuntime, scene: &mut MemoryScene) -> usize {
    let tasks = scene.take_deferred();
    let count = tasks.len();
    for task in tasks {
        runtime.run_deferred(scene, task).unwrap();
    }
    count
}

pub fn single_level_config() -> ProxyConfig {
    ProxyConfig::default().with_nesting(NestingPolicy::SingleLevel)
}

/// Preview roots currently tagged with `owner`.
pub fn previews_of(scene: &MemoryScene, owner: ProxyId) -> Vec<NodeId> {
    scene.find_previews(owner)
}

/// Assert `owner` has exactly one preview and return it.
pub fn assert_single_preview(scene: &MemoryScene, owner: ProxyId) -> NodeId {
    let previews = previews_of(scene, owner);
    assert_eq!(previews.len(), 1, "expected exactly one preview for {owner}, found {previews:?}");
    previews[0]
}

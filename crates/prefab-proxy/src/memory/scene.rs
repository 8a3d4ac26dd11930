use crate::api::*;
use crate::error::HostError;
use crate::types::*;
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::Dfs;
use petgraph::Direction;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Node description inside a template asset.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeBlueprint {
    pub name: String,
    pub transform: Transform,
    pub capabilities: Vec<Capability>,
    /// Template reference, meaningful when `capabilities` holds [`Capability::Proxy`].
    pub proxy_template: Option<TemplateId>,
    pub active: bool,
    pub children: Vec<NodeBlueprint>,
}

impl NodeBlueprint {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Transform::IDENTITY,
            capabilities: vec![Capability::Transform],
            proxy_template: None,
            active: true,
            children: Vec::new(),
        }
    }

    /// A proxy node pointing at `template`.
    pub fn proxy(name: impl Into<String>, template: Option<TemplateId>) -> Self {
        let mut blueprint = Self::new(name);
        blueprint.capabilities.push(Capability::Proxy);
        blueprint.proxy_template = template;
        blueprint
    }

    #[must_use]
    pub fn with_child(mut self, child: NodeBlueprint) -> Self {
        self.children.push(child);
        self
    }

    #[must_use]
    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.push(capability);
        self
    }

    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    #[must_use]
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    pub fn is_proxy(&self) -> bool {
        self.capabilities.contains(&Capability::Proxy)
    }

    fn collect_proxies(&self, out: &mut Vec<Option<TemplateId>>) {
        if self.is_proxy() {
            out.push(self.proxy_template);
        }
        for child in &self.children {
            child.collect_proxies(out);
        }
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    name: String,
    transform: Transform,
    capabilities: Vec<Capability>,
    proxy_template: Option<TemplateId>,
    active: bool,
    preview_tag: Option<PreviewTag>,
}

impl From<&NodeBlueprint> for NodeData {
    fn from(blueprint: &NodeBlueprint) -> Self {
        Self {
            name: blueprint.name.clone(),
            transform: blueprint.transform,
            capabilities: blueprint.capabilities.clone(),
            proxy_template: blueprint.proxy_template,
            active: blueprint.active,
            preview_tag: None,
        }
    }
}

#[derive(Debug, Clone)]
struct TemplateAsset {
    path: PathBuf,
    modified: SystemTime,
    root: NodeBlueprint,
}

/// In-memory host: scene hierarchy, template assets, deferred-call queue,
/// diagnostic console and a repaint counter.
///
/// Template modification times come from a logical clock so that every edit
/// is observably newer than the last one.
#[derive(Debug, Default)]
pub struct MemoryScene {
    nodes: HashMap<NodeId, NodeData>,
    /// Parent -> child edges.
    hierarchy: DiGraphMap<NodeId, ()>,
    templates: HashMap<TemplateId, TemplateAsset>,
    clock: u64,
    deferred: VecDeque<DeferredTask>,
    diagnostics: Vec<Diagnostic>,
    spawned_proxies: Vec<(NodeId, Option<TemplateId>)>,
    repaints: u64,
}

impl MemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    // --- templates ---

    pub fn add_template(&mut self, name: &str, root: NodeBlueprint) -> TemplateId {
        let id = TemplateId::new();
        let modified = self.advance_clock();
        self.templates.insert(
            id,
            TemplateAsset {
                path: PathBuf::from(format!("templates/{name}.prefab")),
                modified,
                root,
            },
        );
        id
    }

    /// Mark the template as saved again without changing its content.
    pub fn touch_template(&mut self, template: TemplateId) -> Result<(), HostError> {
        self.edit_template(template, |_| {})
    }

    /// Change the template's content; its modification time advances.
    pub fn edit_template(
        &mut self,
        template: TemplateId,
        edit: impl FnOnce(&mut NodeBlueprint),
    ) -> Result<(), HostError> {
        let modified = self.advance_clock();
        let asset = self
            .templates
            .get_mut(&template)
            .ok_or(HostError::TemplateNotFound(template))?;
        edit(&mut asset.root);
        asset.modified = modified;
        Ok(())
    }

    /// Delete the asset; references to it stop resolving.
    pub fn remove_template(&mut self, template: TemplateId) -> bool {
        self.templates.remove(&template).is_some()
    }

    pub fn template_root(&self, template: TemplateId) -> Option<&NodeBlueprint> {
        self.templates.get(&template).map(|asset| &asset.root)
    }

    // --- authored graph ---

    pub fn add_node(&mut self, name: &str, parent: Option<NodeId>) -> Result<NodeId, HostError> {
        self.spawn_blueprint(&NodeBlueprint::new(name), parent, true)
    }

    /// Author a proxy node. It is queued for attachment like any other
    /// instantiated proxy.
    pub fn add_proxy_node(
        &mut self,
        name: &str,
        parent: Option<NodeId>,
        template: Option<TemplateId>,
    ) -> Result<NodeId, HostError> {
        self.spawn_blueprint(&NodeBlueprint::proxy(name, template), parent, true)
    }

    pub fn add_capability(
        &mut self,
        node: NodeId,
        capability: Capability,
    ) -> Result<(), HostError> {
        let data = self.data_mut(node)?;
        if !data.capabilities.contains(&capability) {
            data.capabilities.push(capability);
        }
        Ok(())
    }

    pub fn proxy_template(&self, node: NodeId) -> Option<TemplateId> {
        self.nodes.get(&node).and_then(|data| data.proxy_template)
    }

    pub fn preview_tag(&self, node: NodeId) -> Option<PreviewTag> {
        self.nodes.get(&node).and_then(|data| data.preview_tag)
    }

    pub fn is_active(&self, node: NodeId) -> bool {
        self.nodes.get(&node).is_some_and(|data| data.active)
    }

    /// Whether `node` is a preview root or lives inside one.
    pub fn is_preview_content(&self, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if self.preview_tag(current).is_some() {
                return true;
            }
            cursor = self.parent_of(current);
        }
        false
    }

    /// Every tagged preview root, in a stable order.
    pub fn previews(&self) -> Vec<(NodeId, PreviewTag)> {
        let mut previews: Vec<_> = self
            .nodes
            .iter()
            .filter_map(|(id, data)| data.preview_tag.map(|tag| (*id, tag)))
            .collect();
        previews.sort_by_key(|(id, _)| *id);
        previews
    }

    /// Nodes carrying the proxy capability, in a stable order.
    pub fn proxy_nodes(&self) -> Vec<NodeId> {
        let mut nodes: Vec<_> = self
            .nodes
            .iter()
            .filter(|(_, data)| data.capabilities.contains(&Capability::Proxy))
            .map(|(id, _)| *id)
            .collect();
        nodes.sort();
        nodes
    }

    pub fn top_level(&self) -> Vec<NodeId> {
        let mut roots: Vec<_> = self
            .hierarchy
            .nodes()
            .filter(|n| self.parent_of(*n).is_none())
            .collect();
        roots.sort();
        roots
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    // --- host bookkeeping ---

    /// Proxy nodes created since the last call (authoring or instantiation).
    pub fn take_spawned_proxies(&mut self) -> Vec<(NodeId, Option<TemplateId>)> {
        std::mem::take(&mut self.spawned_proxies)
    }

    /// Tasks due on this tick. Anything deferred while running them waits for
    /// the next one.
    pub fn take_deferred(&mut self) -> Vec<DeferredTask> {
        self.deferred.drain(..).collect()
    }

    pub fn deferred(&self) -> impl Iterator<Item = &DeferredTask> {
        self.deferred.iter()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    pub fn repaint_count(&self) -> u64 {
        self.repaints
    }

    fn advance_clock(&mut self) -> SystemTime {
        self.clock += 1;
        UNIX_EPOCH + Duration::from_secs(self.clock)
    }

    fn parent_of(&self, node: NodeId) -> Option<NodeId> {
        if !self.hierarchy.contains_node(node) {
            return None;
        }
        self.hierarchy.neighbors_directed(node, Direction::Incoming).next()
    }

    fn data(&self, node: NodeId) -> Result<&NodeData, HostError> {
        self.nodes.get(&node).ok_or(HostError::NodeNotFound(node))
    }

    fn data_mut(&mut self, node: NodeId) -> Result<&mut NodeData, HostError> {
        self.nodes.get_mut(&node).ok_or(HostError::NodeNotFound(node))
    }

    /// Materialize `blueprint` under `parent`. Active proxies are queued for
    /// attachment; inactive subtrees never run their proxies.
    fn spawn_blueprint(
        &mut self,
        blueprint: &NodeBlueprint,
        parent: Option<NodeId>,
        live: bool,
    ) -> Result<NodeId, HostError> {
        if let Some(parent) = parent {
            self.data(parent)?;
        }

        let id = NodeId::new();
        self.nodes.insert(id, NodeData::from(blueprint));
        self.hierarchy.add_node(id);
        if let Some(parent) = parent {
            self.hierarchy.add_edge(parent, id, ());
        }

        let live = live && blueprint.active;
        if live && blueprint.is_proxy() {
            self.spawned_proxies.push((id, blueprint.proxy_template));
        }
        for child in &blueprint.children {
            self.spawn_blueprint(child, Some(id), live)?;
        }
        Ok(id)
    }
}

impl SceneGraph for MemoryScene {
    fn exists(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    fn parent(&self, node: NodeId) -> Result<Option<NodeId>, HostError> {
        self.data(node)?;
        Ok(self.parent_of(node))
    }

    fn children(&self, node: NodeId) -> Result<Vec<NodeId>, HostError> {
        self.data(node)?;
        Ok(self.hierarchy.neighbors_directed(node, Direction::Outgoing).collect())
    }

    fn name(&self, node: NodeId) -> Result<String, HostError> {
        Ok(self.data(node)?.name.clone())
    }

    fn transform(&self, node: NodeId) -> Result<Transform, HostError> {
        Ok(self.data(node)?.transform)
    }

    fn capabilities(&self, node: NodeId) -> Result<Vec<Capability>, HostError> {
        Ok(self.data(node)?.capabilities.clone())
    }

    fn remove_capability(
        &mut self,
        node: NodeId,
        capability: &Capability,
    ) -> Result<(), HostError> {
        let data = self.data_mut(node)?;
        let Some(index) = data.capabilities.iter().position(|c| c == capability) else {
            return Err(HostError::CapabilityNotFound {
                node,
                capability: capability.to_string(),
            });
        };
        data.capabilities.remove(index);
        if *capability == Capability::Proxy {
            data.proxy_template = None;
        }
        Ok(())
    }

    fn instantiate(&mut self, template: TemplateId) -> Result<NodeId, HostError> {
        let root = self
            .templates
            .get(&template)
            .ok_or(HostError::TemplateNotFound(template))?
            .root
            .clone();
        self.spawn_blueprint(&root, None, true)
    }

    fn reparent(&mut self, node: NodeId, parent: Option<NodeId>) -> Result<(), HostError> {
        self.data(node)?;
        if let Some(parent) = parent {
            self.data(parent)?;
            let mut cursor = Some(parent);
            while let Some(current) = cursor {
                if current == node {
                    return Err(HostError::HierarchyCycle { node, parent });
                }
                cursor = self.parent_of(current);
            }
        }

        if let Some(old) = self.parent_of(node) {
            self.hierarchy.remove_edge(old, node);
        }
        if let Some(parent) = parent {
            self.hierarchy.add_edge(parent, node, ());
        }
        Ok(())
    }

    fn set_transform(&mut self, node: NodeId, transform: Transform) -> Result<(), HostError> {
        self.data_mut(node)?.transform = transform;
        Ok(())
    }

    fn set_name(&mut self, node: NodeId, name: &str) -> Result<(), HostError> {
        self.data_mut(node)?.name = name.to_string();
        Ok(())
    }

    fn set_preview_tag(&mut self, node: NodeId, tag: PreviewTag) -> Result<(), HostError> {
        self.data_mut(node)?.preview_tag = Some(tag);
        Ok(())
    }

    fn destroy(&mut self, node: NodeId) -> Result<(), HostError> {
        self.data(node)?;
        let mut subtree = Vec::new();
        let mut dfs = Dfs::new(&self.hierarchy, node);
        while let Some(n) = dfs.next(&self.hierarchy) {
            subtree.push(n);
        }
        for n in subtree {
            self.hierarchy.remove_node(n);
            self.nodes.remove(&n);
        }
        Ok(())
    }

    fn nested_proxies(&self, template: TemplateId) -> Result<Vec<Option<TemplateId>>, HostError> {
        let asset = self
            .templates
            .get(&template)
            .ok_or(HostError::TemplateNotFound(template))?;
        let mut nested = Vec::new();
        asset.root.collect_proxies(&mut nested);
        Ok(nested)
    }

    fn find_previews(&self, owner: ProxyId) -> Vec<NodeId> {
        self.previews()
            .into_iter()
            .filter(|(_, tag)| tag.owner == owner)
            .map(|(node, _)| node)
            .collect()
    }
}

impl TemplateResolver for MemoryScene {
    fn resolve(&self, template: TemplateId) -> Option<TemplateInfo> {
        self.templates.get(&template).map(|asset| TemplateInfo {
            path: asset.path.clone(),
            modified: Some(asset.modified),
        })
    }
}

impl DeferredQueue for MemoryScene {
    fn defer(&mut self, task: DeferredTask) {
        self.deferred.push_back(task);
    }
}

impl DiagnosticSink for MemoryScene {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}

impl ViewRepainter for MemoryScene {
    fn repaint_all_views(&mut self) {
        self.repaints += 1;
    }
}

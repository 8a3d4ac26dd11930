//! Template containment analysis.
//!
//! An edge `A -> B` means template A's subgraph holds a proxy pointing at B.
//! The validator uses this to decide nesting-policy violations and to name the
//! offending chain in the diagnostic.

use crate::api::SceneGraph;
use crate::error::HostError;
use crate::types::TemplateId;
use petgraph::algo::{is_cyclic_directed, tarjan_scc};
use petgraph::graphmap::DiGraphMap;
use std::collections::{HashSet, VecDeque};

#[derive(Debug)]
pub struct ContainmentGraph {
    root: TemplateId,
    graph: DiGraphMap<TemplateId, ()>,
    root_proxies: usize,
    /// Templates below the root that themselves contain proxies.
    deep: Vec<TemplateId>,
}

impl ContainmentGraph {
    /// Walk every template reachable from `root` through nested proxies.
    ///
    /// Nested references that no longer resolve are treated as leaves.
    pub fn explore<G: SceneGraph + ?Sized>(host: &G, root: TemplateId) -> Result<Self, HostError> {
        let mut graph = DiGraphMap::new();
        graph.add_node(root);

        let mut root_proxies = 0;
        let mut deep = Vec::new();
        let mut visited = HashSet::from([root]);
        let mut queue = VecDeque::from([root]);

        while let Some(template) = queue.pop_front() {
            let nested = match host.nested_proxies(template) {
                Ok(nested) => nested,
                Err(HostError::TemplateNotFound(_)) if template != root => Vec::new(),
                Err(e) => return Err(e),
            };

            if template == root {
                root_proxies = nested.len();
            } else if !nested.is_empty() {
                deep.push(template);
            }

            for child in nested.into_iter().flatten() {
                graph.add_edge(template, child, ());
                if visited.insert(child) {
                    queue.push_back(child);
                }
            }
        }

        Ok(Self {
            root,
            graph,
            root_proxies,
            deep,
        })
    }

    pub fn root(&self) -> TemplateId {
        self.root
    }

    /// Proxies found directly in the root template's subgraph.
    pub fn nested_proxy_count(&self) -> usize {
        self.root_proxies
    }

    pub fn contains_nested_proxies(&self) -> bool {
        self.root_proxies > 0
    }

    /// Whether some nested template itself contains proxies.
    pub fn exceeds_single_level(&self) -> bool {
        !self.deep.is_empty()
    }

    pub fn is_cyclic(&self) -> bool {
        is_cyclic_directed(&self.graph)
    }

    /// Strongly connected template sets that form containment cycles.
    pub fn cycles(&self) -> Vec<Vec<TemplateId>> {
        tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || self.graph.contains_edge(scc[0], scc[0]))
            .collect()
    }

    pub fn edges(&self) -> Vec<(TemplateId, TemplateId)> {
        self.graph.all_edges().map(|(from, to, _)| (from, to)).collect()
    }

    pub fn template_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Render the containment edges as `a -> b, b -> c` using `label`.
    pub fn describe(&self, label: impl Fn(TemplateId) -> String) -> String {
        let edges = self.edges();
        if edges.is_empty() {
            return format!("{} -> (proxy without template)", label(self.root));
        }
        edges
            .into_iter()
            .map(|(from, to)| format!("{} -> {}", label(from), label(to)))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

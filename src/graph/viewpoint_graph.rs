//! Viewpoint graph: one node per committed entry, motion edges added by the
//! motion-linking collaborator, and a lazily computed connected-components
//! view.
//!
//! Every node insertion or edge insertion marks the cached components stale.
//! `connected_components` recomputes them only when stale, so a burst of
//! commits costs a single recomputation on the next query.

use parking_lot::Mutex;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::unionfind::UnionFind;

use super::types::ViewpointEntryIndex;

/// Component label per node (indexed by entry index) plus the component count.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConnectedComponents {
    pub labels: Vec<usize>,
    pub count: usize,
}

impl ConnectedComponents {
    /// Label of the component containing `index`.
    pub fn label(&self, index: ViewpointEntryIndex) -> Option<usize> {
        self.labels.get(index.0).copied()
    }
}

pub struct ViewpointGraph {
    graph: UnGraph<ViewpointEntryIndex, f64>,
    /// `None` while the cached components are stale.
    components: Mutex<Option<ConnectedComponents>>,
}

impl ViewpointGraph {
    pub fn new() -> Self {
        Self {
            graph: UnGraph::default(),
            components: Mutex::new(None),
        }
    }

    /// Add the node for a newly committed entry.
    ///
    /// Nodes must be added in index order so that node `i` is entry `i`.
    pub fn add_node(&mut self, index: ViewpointEntryIndex) {
        assert_eq!(
            self.graph.node_count(),
            index.0,
            "graph nodes must be added in entry index order"
        );
        self.graph.add_node(index);
        self.invalidate_components();
    }

    /// Add or update an undirected motion edge weighted by its length.
    ///
    /// Returns `false` if either endpoint has no node.
    pub fn add_edge(&mut self, a: ViewpointEntryIndex, b: ViewpointEntryIndex, distance: f64) -> bool {
        let n = self.graph.node_count();
        if a.0 >= n || b.0 >= n {
            return false;
        }
        self.graph
            .update_edge(NodeIndex::new(a.0), NodeIndex::new(b.0), distance);
        self.invalidate_components();
        true
    }

    pub fn has_edge(&self, a: ViewpointEntryIndex, b: ViewpointEntryIndex) -> bool {
        let n = self.graph.node_count();
        a.0 < n && b.0 < n && self.graph.contains_edge(NodeIndex::new(a.0), NodeIndex::new(b.0))
    }

    /// Entries directly linked to `index`.
    pub fn neighbors(&self, index: ViewpointEntryIndex) -> Vec<ViewpointEntryIndex> {
        if index.0 >= self.graph.node_count() {
            return Vec::new();
        }
        self.graph
            .neighbors(NodeIndex::new(index.0))
            .map(|n| ViewpointEntryIndex(n.index()))
            .collect()
    }

    pub fn num_nodes(&self) -> usize {
        self.graph.node_count()
    }

    pub fn num_edges(&self) -> usize {
        self.graph.edge_count()
    }

    /// Whether the cached components reflect the current graph.
    pub fn components_valid(&self) -> bool {
        self.components.lock().is_some()
    }

    /// Connected components, recomputed only if the cache is stale.
    ///
    /// Labels are numbered in order of each component's smallest entry index.
    pub fn connected_components(&self) -> ConnectedComponents {
        let mut cache = self.components.lock();
        if let Some(components) = cache.as_ref() {
            return components.clone();
        }
        let components = self.compute_components();
        *cache = Some(components.clone());
        components
    }

    /// Drop all nodes and edges.
    pub fn clear(&mut self) {
        self.graph.clear();
        self.invalidate_components();
    }

    fn invalidate_components(&mut self) {
        *self.components.get_mut() = None;
    }

    fn compute_components(&self) -> ConnectedComponents {
        let n = self.graph.node_count();
        let mut union_find = UnionFind::<usize>::new(n);
        for edge in self.graph.raw_edges() {
            union_find.union(edge.source().index(), edge.target().index());
        }

        let mut root_label: Vec<Option<usize>> = vec![None; n];
        let mut labels = Vec::with_capacity(n);
        let mut count = 0;
        for node in 0..n {
            let root = union_find.find(node);
            let label = *root_label[root].get_or_insert_with(|| {
                count += 1;
                count - 1
            });
            labels.push(label);
        }
        ConnectedComponents { labels, count }
    }
}

impl Default for ViewpointGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ViewpointGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewpointGraph")
            .field("num_nodes", &self.graph.node_count())
            .field("num_edges", &self.graph.edge_count())
            .field("components_valid", &self.components_valid())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_with_nodes(n: usize) -> ViewpointGraph {
        let mut graph = ViewpointGraph::new();
        for i in 0..n {
            graph.add_node(ViewpointEntryIndex(i));
        }
        graph
    }

    #[test]
    fn test_isolated_nodes_are_separate_components() {
        let graph = graph_with_nodes(4);
        let components = graph.connected_components();
        assert_eq!(components.count, 4);
        assert_eq!(components.labels, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_edges_merge_components() {
        let mut graph = graph_with_nodes(5);
        assert!(graph.add_edge(ViewpointEntryIndex(0), ViewpointEntryIndex(2), 1.0));
        assert!(graph.add_edge(ViewpointEntryIndex(3), ViewpointEntryIndex(4), 1.0));

        let components = graph.connected_components();
        assert_eq!(components.count, 3);
        assert_eq!(components.labels, vec![0, 1, 0, 2, 2]);
        assert_eq!(
            components.count,
            petgraph::algo::connected_components(&graph.graph)
        );
        assert!(graph.has_edge(ViewpointEntryIndex(2), ViewpointEntryIndex(0)));
        assert_eq!(graph.neighbors(ViewpointEntryIndex(3)), vec![ViewpointEntryIndex(4)]);
    }

    #[test]
    fn test_cache_invalidated_on_insert() {
        let mut graph = graph_with_nodes(2);
        assert!(!graph.components_valid());

        assert_eq!(graph.connected_components().count, 2);
        assert!(graph.components_valid());

        graph.add_node(ViewpointEntryIndex(2));
        assert!(!graph.components_valid());
        assert_eq!(graph.connected_components().count, 3);

        graph.add_edge(ViewpointEntryIndex(1), ViewpointEntryIndex(2), 0.5);
        assert!(!graph.components_valid());
        assert_eq!(graph.connected_components().count, 2);
    }

    #[test]
    fn test_edge_to_missing_node_rejected() {
        let mut graph = graph_with_nodes(1);
        assert!(!graph.add_edge(ViewpointEntryIndex(0), ViewpointEntryIndex(5), 1.0));
        assert_eq!(graph.num_edges(), 0);
    }

    #[test]
    #[should_panic(expected = "entry index order")]
    fn test_out_of_order_node_panics() {
        let mut graph = ViewpointGraph::new();
        graph.add_node(ViewpointEntryIndex(1));
    }
}

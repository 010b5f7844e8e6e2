//! Graph primitives (spec §2 component 7, §4.9): a directed multigraph over
//! caller-assigned `NodeId`s supporting add node/edge, edge iteration,
//! lookup by `(src, dst)`, removal, and weakly-connected-component-based
//! basic-block partitioning. Built on `petgraph`, the way the teacher's
//! `cfg.rs` builds `Cfg = Graph<NodeInfo, EdgeKind>` — generalized here to
//! index by the caller's `NodeId` rather than petgraph's own `NodeIndex`,
//! since ids are assigned externally (spec §1) and need not be contiguous.

use std::collections::{HashMap, HashSet};

use petgraph::graph::NodeIndex;
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;
use petgraph::Graph as PetGraph;
use petgraph::Undirected;

use crate::model::{CfgEdge, CfgEdgeKind, CfgNode, NodeId};

/// A directed multigraph keyed by `NodeId`. Every `CfgNode` is inserted at
/// most once; edges are deduplicated by exact `(src, dst, kind)` match
/// (spec I2) — `CfgEdgeKind`'s payload variants compare by their inner
/// value, so `function_call|3` and `function_call|4` are distinct.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    inner: PetGraph<NodeId, CfgEdgeKind>,
    index_of: HashMap<NodeId, NodeIndex>,
    nodes: HashMap<NodeId, CfgNode>,
    seen_edges: HashSet<(NodeId, NodeId, CfgEdgeKind)>,
    order: Vec<NodeId>,
}

impl Graph {
    pub fn new() -> Self {
        Graph::default()
    }

    fn ensure(&mut self, id: NodeId) -> NodeIndex {
        *self.index_of.entry(id).or_insert_with(|| self.inner.add_node(id))
    }

    /// Inserts `node`, or replaces the existing entry if `node.id` was
    /// already referenced by an edge before its `CfgNode` was known
    /// (sequential-edge passes sometimes reach a successor before the
    /// extractor's node list is fully consumed).
    pub fn insert_node(&mut self, node: CfgNode) {
        let id = node.id;
        self.ensure(id);
        if !self.nodes.contains_key(&id) {
            self.order.push(id);
        }
        self.nodes.insert(id, node);
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn node(&self, id: NodeId) -> Option<&CfgNode> {
        self.nodes.get(&id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut CfgNode> {
        self.nodes.get_mut(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &CfgNode> {
        self.order.iter().filter_map(move |id| self.nodes.get(id))
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.order.iter().copied()
    }

    /// Adds an edge, skipping it if an identical `(src, dst, kind)` triple
    /// was already added (spec I2). Returns whether it was newly inserted.
    pub fn add_edge(&mut self, src: NodeId, dst: NodeId, kind: CfgEdgeKind) -> bool {
        let key = (src, dst, kind.clone());
        if self.seen_edges.contains(&key) {
            return false;
        }
        let a = self.ensure(src);
        let b = self.ensure(dst);
        self.inner.add_edge(a, b, kind.clone());
        self.seen_edges.insert(key);
        true
    }

    pub fn remove_edges_between(&mut self, src: NodeId, dst: NodeId) {
        let (Some(&a), Some(&b)) = (self.index_of.get(&src), self.index_of.get(&dst)) else {
            return;
        };
        let to_remove: Vec<_> = self
            .inner
            .edges_connecting(a, b)
            .map(|e| e.id())
            .collect();
        for edge_id in to_remove {
            if let Some(w) = self.inner.edge_weight(edge_id).cloned() {
                self.seen_edges.remove(&(src, dst, w));
            }
            self.inner.remove_edge(edge_id);
        }
    }

    pub fn edges(&self) -> Vec<CfgEdge> {
        self.inner
            .edge_indices()
            .filter_map(|e| {
                let (a, b) = self.inner.edge_endpoints(e)?;
                let kind = self.inner.edge_weight(e)?.clone();
                Some(CfgEdge {
                    src: self.inner[a],
                    dst: self.inner[b],
                    kind,
                })
            })
            .collect()
    }

    pub fn edges_between(&self, src: NodeId, dst: NodeId) -> Vec<CfgEdgeKind> {
        let (Some(&a), Some(&b)) = (self.index_of.get(&src), self.index_of.get(&dst)) else {
            return Vec::new();
        };
        self.inner
            .edges_connecting(a, b)
            .map(|e| e.weight().clone())
            .collect()
    }

    pub fn out_edges(&self, src: NodeId) -> Vec<(NodeId, &CfgEdgeKind)> {
        let Some(&a) = self.index_of.get(&src) else {
            return Vec::new();
        };
        self.inner
            .edges(a)
            .map(|e| (self.inner[e.target()], e.weight()))
            .collect()
    }

    pub fn in_edges(&self, dst: NodeId) -> Vec<(NodeId, &CfgEdgeKind)> {
        let Some(&b) = self.index_of.get(&dst) else {
            return Vec::new();
        };
        self.inner
            .edges_directed(b, petgraph::Direction::Incoming)
            .map(|e| (self.inner[e.source()], e.weight()))
            .collect()
    }

    pub fn predecessors(&self, dst: NodeId) -> Vec<NodeId> {
        self.in_edges(dst).into_iter().map(|(id, _)| id).collect()
    }

    pub fn successors(&self, src: NodeId) -> Vec<NodeId> {
        self.out_edges(src).into_iter().map(|(id, _)| id).collect()
    }

    pub fn is_reachable_from(&self, start: NodeId, target: NodeId) -> bool {
        if start == target {
            return true;
        }
        let mut visited = HashSet::new();
        let mut stack = vec![start];
        while let Some(n) = stack.pop() {
            if !visited.insert(n) {
                continue;
            }
            if n == target {
                return true;
            }
            stack.extend(self.successors(n));
        }
        false
    }

    /// Weakly-connected components over the graph as it stands right now
    /// (spec §4.9: "basic-block partitioning treats the directed graph as
    /// undirected"). Returns each node's component index, stable by the
    /// smallest `NodeId` observed in that component so results are
    /// deterministic across runs (spec §5 "outputs are bit-stable").
    pub fn weakly_connected_components(&self) -> HashMap<NodeId, usize> {
        let mut uf = UnionFind::<usize>::new(self.inner.node_count().max(1));
        for edge in self.inner.edge_indices() {
            if let Some((a, b)) = self.inner.edge_endpoints(edge) {
                uf.union(a.index(), b.index());
            }
        }
        let mut root_to_min: HashMap<usize, NodeId> = HashMap::new();
        for id in &self.order {
            let Some(&idx) = self.index_of.get(id) else { continue };
            let root = uf.find(idx.index());
            root_to_min
                .entry(root)
                .and_modify(|m| *m = (*m).min(*id))
                .or_insert(*id);
        }
        let mut sorted_roots: Vec<NodeId> = root_to_min.values().copied().collect();
        sorted_roots.sort_unstable();
        let block_index_of: HashMap<NodeId, usize> = sorted_roots
            .into_iter()
            .enumerate()
            .map(|(i, min_id)| (min_id, i))
            .collect();

        let mut out = HashMap::new();
        for id in &self.order {
            let Some(&idx) = self.index_of.get(id) else { continue };
            let root = uf.find(idx.index());
            let min_id = root_to_min[&root];
            out.insert(*id, block_index_of[&min_id]);
        }
        out
    }

    /// Unused placeholder type, kept so callers can build an undirected
    /// view with petgraph's own algorithms if a future pass needs more than
    /// component ids (e.g. `petgraph::algo::condensation`).
    pub fn as_undirected(&self) -> PetGraph<NodeId, CfgEdgeKind, Undirected> {
        self.inner.clone().into_edge_type()
    }
}

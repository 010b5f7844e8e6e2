//! Reaching-definitions engine (spec §4.5): a generic forward, may-analysis,
//! distributive-over-union fixed point solved by Kildall-style round-robin
//! iteration. Grounded in `original_source/src/comex/codeviews/SDFG/SDFG_c.py`'s
//! reaching-definitions loop (the "RDA: Converged" fixed point around line
//! 1066), generalized to work over any `Graph` plus a caller-supplied
//! per-node DEF table — `dfg::facts` owns what counts as a DEF, this module
//! only owns the fixed point.

use std::collections::{HashMap, HashSet};

use crate::graph::Graph;
use crate::model::{Fact, NodeId};

/// IN/OUT fact sets for every CFG node, once the fixed point has converged.
#[derive(Debug, Clone, Default)]
pub struct RdaResult {
    pub in_sets: HashMap<NodeId, HashSet<Fact>>,
    pub out_sets: HashMap<NodeId, HashSet<Fact>>,
}

/// Solves `IN[n] = ⋃ OUT[p]`, `OUT[n] = (IN[n] \ KILL[n]) ∪ DEF[n]` to a
/// fixed point (spec §4.5). `def` holds each node's DEF set; predecessors are
/// read from `graph.predecessors`, pre-filtered by the caller when
/// `node_function` restricts the analysis to intraprocedural edges
/// (`EngineConfig::intraprocedural_rda`) — see [`predecessors_of`].
pub fn solve(
    graph: &Graph,
    def: &HashMap<NodeId, HashSet<Fact>>,
    node_function: Option<&HashMap<NodeId, NodeId>>,
) -> RdaResult {
    let nodes: Vec<NodeId> = graph.node_ids().collect();
    let mut in_sets: HashMap<NodeId, HashSet<Fact>> = HashMap::new();
    let mut out_sets: HashMap<NodeId, HashSet<Fact>> = HashMap::new();
    for &n in &nodes {
        in_sets.insert(n, HashSet::new());
        out_sets.insert(n, def.get(&n).cloned().unwrap_or_default());
    }

    loop {
        let mut changed = false;
        for &n in &nodes {
            let mut incoming = HashSet::new();
            for p in predecessors_of(graph, n, node_function) {
                if let Some(out_p) = out_sets.get(&p) {
                    incoming.extend(out_p.iter().cloned());
                }
            }

            let kill_names: HashSet<_> = def
                .get(&n)
                .map(|d| d.iter().map(|f| f.name.clone()).collect())
                .unwrap_or_default();

            let mut new_out: HashSet<Fact> = incoming
                .iter()
                .filter(|f| !kill_names.contains(&f.name))
                .cloned()
                .collect();
            if let Some(d) = def.get(&n) {
                new_out.extend(d.iter().cloned());
            }

            if in_sets.get(&n) != Some(&incoming) {
                in_sets.insert(n, incoming);
                changed = true;
            }
            if out_sets.get(&n) != Some(&new_out) {
                out_sets.insert(n, new_out);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    RdaResult { in_sets, out_sets }
}

/// Predecessors of `n`, optionally restricted to those belonging to the same
/// function (spec §4.5 "intraprocedural mode" — cross-function edges, i.e.
/// call/return wiring, are pruned before the fixed point runs).
fn predecessors_of(graph: &Graph, n: NodeId, node_function: Option<&HashMap<NodeId, NodeId>>) -> Vec<NodeId> {
    let preds = graph.predecessors(n);
    let Some(node_function) = node_function else {
        return preds;
    };
    let Some(&owner) = node_function.get(&n) else {
        return preds;
    };
    preds
        .into_iter()
        .filter(|p| node_function.get(p).is_none_or(|&f| f == owner))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CfgEdgeKind, CfgNode, FactName, Scope};

    fn node(id: NodeId) -> CfgNode {
        CfgNode {
            id,
            line: id as usize,
            label: format!("n{id}"),
            type_tag: "expression_statement".into(),
            block_index: 0,
        }
    }

    #[test]
    fn definition_reaches_a_straight_line_successor() {
        let mut graph = Graph::new();
        graph.insert_node(node(1));
        graph.insert_node(node(2));
        graph.add_edge(1, 2, CfgEdgeKind::NextLine);

        let fact = Fact::identifier(FactName::Var("x".into()), 1, Scope::global(), Scope::global());
        let mut def = HashMap::new();
        def.insert(1, HashSet::from([fact.clone()]));

        let result = solve(&graph, &def, None);
        assert!(result.out_sets[&2].contains(&fact));
    }

    #[test]
    fn redefinition_kills_the_prior_fact_by_name() {
        let mut graph = Graph::new();
        graph.insert_node(node(1));
        graph.insert_node(node(2));
        graph.insert_node(node(3));
        graph.add_edge(1, 2, CfgEdgeKind::NextLine);
        graph.add_edge(2, 3, CfgEdgeKind::NextLine);

        let first = Fact::identifier(FactName::Var("x".into()), 1, Scope::global(), Scope::global());
        let second = Fact::identifier(FactName::Var("x".into()), 2, Scope::global(), Scope::global());
        let mut def = HashMap::new();
        def.insert(1, HashSet::from([first.clone()]));
        def.insert(2, HashSet::from([second.clone()]));

        let result = solve(&graph, &def, None);
        assert!(result.out_sets[&3].contains(&second));
        assert!(!result.out_sets[&3].contains(&first));
    }

    #[test]
    fn intraprocedural_mode_prunes_cross_function_predecessors() {
        let mut graph = Graph::new();
        graph.insert_node(node(1));
        graph.insert_node(node(2));
        graph.add_edge(1, 2, CfgEdgeKind::FunctionCall(0));

        let mut node_function = HashMap::new();
        node_function.insert(1, 100);
        node_function.insert(2, 200);

        let fact = Fact::identifier(FactName::Var("x".into()), 1, Scope::global(), Scope::global());
        let mut def = HashMap::new();
        def.insert(1, HashSet::from([fact.clone()]));

        let result = solve(&graph, &def, Some(&node_function));
        assert!(!result.out_sets[&2].contains(&fact));
    }
}

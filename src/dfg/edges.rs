//! DFG edge builder (spec §4.7). Translates the RDA fixed point plus the
//! per-node USE facts into `comesFrom`/`lastDef`/`loop_carried` edges.
//! Grounded in `original_source/src/comex/codeviews/SDFG/SDFG_c.py`'s
//! `get_required_edges_from_def_to_use` (lines 1101-1174) and
//! `name_match_with_fields` (1088-1098); the debug RDA-projected CFG mirrors
//! `rda_cfg_map` (1177-1195).

use std::collections::HashSet;

use crate::config::EngineConfig;
use crate::graph::Graph;
use crate::model::{DfgEdge, DfgEdgeAttrs, Fact, FactName, NodeId, Records};
use crate::rda::RdaResult;

use super::facts::Facts;

const CONTROL_NODE_TAGS: &[&str] = &["for_statement", "while_statement", "if_statement", "switch_statement"];

fn is_control_node(id: NodeId, graph: &Graph) -> bool {
    graph
        .node(id)
        .is_some_and(|n| CONTROL_NODE_TAGS.contains(&n.type_tag.as_str()))
}

/// §4.7 step 2: field-partial match — either side has a `.`, and one name is
/// a dot-prefix of (or equal to) the other (`name_match_with_fields`).
fn field_partial_match(a: &FactName, b: &FactName) -> bool {
    let (sa, sb) = (a.to_string(), b.to_string());
    if !sa.contains('.') && !sb.contains('.') {
        return false;
    }
    sa == sb || sa.starts_with(&format!("{sb}.")) || sb.starts_with(&format!("{sa}."))
}

/// Builds the DFG edge set for one translation unit, not including the
/// interprocedural layer (`dfg::interprocedural` appends those separately —
/// they need CFG call-edge information this module does not take).
pub fn build(graph: &Graph, facts: &Facts, rda: &RdaResult, records: &Records, config: &EngineConfig, loop_nodes: &HashSet<NodeId>) -> Vec<DfgEdge> {
    let mut edges = Vec::new();

    for n in graph.node_ids() {
        let Some(uses) = facts.use_.get(&n) else {
            continue;
        };
        let empty = HashSet::new();
        let in_set = rda.in_sets.get(&n).unwrap_or(&empty);
        let defines_here = facts.def.get(&n);

        for u in uses {
            if u.name.is_literal() {
                continue; // self-satisfying, spec §4.7 step 1.
            }

            let mut satisfied = false;
            let mut self_redefinition = false;

            // Step 1: exact name + scope-prefix match.
            for d in in_set {
                if d.name != u.name || !d.scope.is_prefix_of(&u.variable_scope) {
                    continue;
                }
                if d.line == Some(n) {
                    self_redefinition = true;
                    continue; // step 3 — self-edges are handled below, not as comesFrom.
                }
                if d.is_pointer_modification_at_call_site {
                    continue; // deferred to the interprocedural layer.
                }
                if let Some(line) = d.line {
                    edges.push(DfgEdge {
                        src: line,
                        dst: n,
                        attrs: DfgEdgeAttrs::comes_from(u.name.to_string()),
                    });
                    satisfied = true;
                }
            }

            // Step 2: field-partial match, only for names step 1 missed entirely.
            if !satisfied {
                for d in in_set {
                    if d.name == u.name || !field_partial_match(&d.name, &u.name) {
                        continue;
                    }
                    if d.is_pointer_modification_at_call_site {
                        continue;
                    }
                    if let Some(line) = d.line {
                        edges.push(DfgEdge {
                            src: line,
                            dst: n,
                            attrs: DfgEdgeAttrs::comes_from(u.name.to_string()),
                        });
                        satisfied = true;
                    }
                }
            }

            // Step 3: self-redefinition inside a loop — `x = x + 1` with the
            // prior iteration's def reaching back through a loop edge.
            if self_redefinition
                && loop_nodes.contains(&n)
                && defines_here.is_some_and(|defs| defs.iter().any(|f| f.name == u.name))
            {
                edges.push(DfgEdge {
                    src: n,
                    dst: n,
                    attrs: DfgEdgeAttrs {
                        dataflow_type: crate::model::DfgDataflowType::LoopCarried,
                        used_def: u.name.to_string(),
                        color: "#00A3FF",
                        interprocedural: None,
                        argument_index: None,
                        object_name: None,
                    },
                });
            }

            // Step 5: fallback chain.
            if !satisfied {
                try_fallbacks(u, n, in_set, records, &mut edges);
            }
        }
    }

    if config.last_def {
        push_last_def_edges(graph, rda, &mut edges);
    }

    edges
}

fn push_last_def_edges(graph: &Graph, rda: &RdaResult, edges: &mut Vec<DfgEdge>) {
    for n in graph.node_ids() {
        let empty = HashSet::new();
        let in_set = rda.in_sets.get(&n).unwrap_or(&empty);
        let out_set = rda.out_sets.get(&n).unwrap_or(&empty);
        for d in in_set.difference(out_set) {
            let Some(line) = d.line else { continue };
            if is_control_node(n, graph) || is_control_node(line, graph) {
                continue;
            }
            edges.push(DfgEdge {
                src: line,
                dst: n,
                attrs: DfgEdgeAttrs::last_def(d.name.to_string()),
            });
        }
    }
}

/// §4.7 step 5(a-d), tried in order until `u` is satisfied. Each check runs
/// over every def in `in_set`; the first check with any match wins.
fn try_fallbacks(u: &Fact, n: NodeId, in_set: &HashSet<Fact>, records: &Records, edges: &mut Vec<DfgEdge>) -> bool {
    let checks: [fn(&Fact, &Fact, &Records) -> bool; 4] = [fallback_function_return, fallback_global_scope, fallback_qualified, fallback_two_level_prefix];
    for check in checks {
        let mut matched = false;
        for d in in_set {
            if !check(d, u, records) {
                continue;
            }
            if let Some(line) = d.line {
                edges.push(DfgEdge {
                    src: line,
                    dst: n,
                    attrs: DfgEdgeAttrs::comes_from(u.name.to_string()),
                });
                matched = true;
            }
        }
        if matched {
            return true;
        }
    }
    false
}

/// (a) any function return value reaching `n` when a function by that name
/// is defined.
fn fallback_function_return(d: &Fact, u: &Fact, records: &Records) -> bool {
    let name = u.name.base();
    d.name.base() == name && records.function_list.keys().any(|((_, fname), _)| fname == name)
}

/// (b) any global-scope def of the same name.
fn fallback_global_scope(d: &Fact, u: &Fact, _records: &Records) -> bool {
    d.name.base() == u.name.base() && d.scope == crate::model::Scope::global()
}

/// (c) for qualified uses `A::x`, any def of `x` at scope depth >= 2.
fn fallback_qualified(d: &Fact, u: &Fact, _records: &Records) -> bool {
    let FactName::Qualified(_, x) = &u.name else {
        return false;
    };
    d.name.base() == x && d.scope.0.len() >= 2
}

/// (d) same two-level scope prefix.
fn fallback_two_level_prefix(d: &Fact, u: &Fact, _records: &Records) -> bool {
    d.name.base() == u.name.base()
        && d.scope.0.len() >= 2
        && u.variable_scope.0.len() >= 2
        && d.scope.0[..2] == u.variable_scope.0[..2]
}

/// §6 "Debug mode" / §4.7 step 6: the RDA-projected CFG, pruned to edges
/// across which at least one fact actually flows (`rda_cfg_map`).
pub fn debug_projection(graph: &Graph, rda: &RdaResult) -> Graph {
    let mut out = Graph::new();
    for node in graph.nodes() {
        out.insert_node(node.clone());
    }
    for edge in graph.edges() {
        let out_src = rda.out_sets.get(&edge.src);
        let in_dst = rda.in_sets.get(&edge.dst);
        let flows = matches!((out_src, in_dst), (Some(a), Some(b)) if a.intersection(b).next().is_some());
        if flows {
            out.add_edge(edge.src, edge.dst, edge.kind);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CfgEdgeKind, CfgNode, Scope};
    use std::collections::HashMap;

    fn node(id: NodeId, type_tag: &str) -> CfgNode {
        CfgNode {
            id,
            line: id as usize,
            label: format!("n{id}"),
            type_tag: type_tag.to_owned(),
            block_index: 0,
        }
    }

    #[test]
    fn straight_line_def_reaches_use_as_comes_from() {
        let mut graph = Graph::new();
        graph.insert_node(node(1, "declaration"));
        graph.insert_node(node(2, "expression_statement"));
        graph.add_edge(1, 2, CfgEdgeKind::NextLine);

        let def_fact = Fact::identifier(FactName::Var("x".into()), 1, Scope::global(), Scope::global());
        let use_fact = Fact::identifier(FactName::Var("x".into()), 2, Scope::global(), Scope::global());

        let mut def = HashMap::new();
        def.insert(1, HashSet::from([def_fact.clone()]));
        let rda = crate::rda::solve(&graph, &def, None);

        let mut facts = Facts::default();
        facts.use_.insert(2, HashSet::from([use_fact]));

        let records = Records::default();
        let edges = build(&graph, &facts, &rda, &records, &EngineConfig::default(), &HashSet::new());
        assert!(edges.iter().any(|e| e.src == 1 && e.dst == 2));
    }

    #[test]
    fn literal_uses_never_produce_edges() {
        let mut graph = Graph::new();
        graph.insert_node(node(1, "expression_statement"));

        let use_fact = Fact::identifier(FactName::Literal("42".into()), 1, Scope::global(), Scope::global());
        let mut facts = Facts::default();
        facts.use_.insert(1, HashSet::from([use_fact]));

        let rda = crate::rda::solve(&graph, &HashMap::new(), None);
        let records = Records::default();
        let edges = build(&graph, &facts, &rda, &records, &EngineConfig::default(), &HashSet::new());
        assert!(edges.is_empty());
    }

    #[test]
    fn field_partial_match_links_struct_field_use() {
        let mut graph = Graph::new();
        graph.insert_node(node(1, "expression_statement"));
        graph.insert_node(node(2, "expression_statement"));
        graph.add_edge(1, 2, CfgEdgeKind::NextLine);

        let def_fact = Fact::identifier(FactName::Field("obj".into(), "x".into()), 1, Scope::global(), Scope::global());
        let use_fact = Fact::identifier(FactName::Var("obj".into()), 2, Scope::global(), Scope::global());

        let mut def = HashMap::new();
        def.insert(1, HashSet::from([def_fact]));
        let rda = crate::rda::solve(&graph, &def, None);

        let mut facts = Facts::default();
        facts.use_.insert(2, HashSet::from([use_fact]));

        let records = Records::default();
        let edges = build(&graph, &facts, &rda, &records, &EngineConfig::default(), &HashSet::new());
        assert!(edges.iter().any(|e| e.src == 1 && e.dst == 2));
    }
}

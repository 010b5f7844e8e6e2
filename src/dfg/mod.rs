//! SDFG construction orchestration (spec §4.6-§4.8, §6 debug mode). Ties the
//! RDA fact table, the generic fixed point, the intraprocedural edge
//! builder, and the interprocedural layer into one `DfgResult`. Mirrors
//! `cfg::build`'s role as the top-level driver, grounded in
//! `original_source/src/comex/codeviews/SDFG/SDFG_c.py`'s `get_dfg` /
//! `SDFG_cpp.py`'s `get_dfg` top-level functions.

pub mod edges;
pub mod facts;
pub mod interprocedural;

use std::collections::{HashMap, HashSet};

use tree_sitter::Node;

use crate::classify::Lang;
use crate::config::EngineConfig;
use crate::cst;
use crate::diagnostics::DiagnosticSink;
use crate::graph::Graph;
use crate::model::{AstKey, DfgEdge, NodeId, Records};
use crate::rda::{self, RdaResult};
use crate::symbols::{Index, SymbolTable};

pub use facts::Facts;

/// Everything `dfg::build` produces: the wired edge set, the RDA fixed point
/// it was derived from (exposed for callers that want their own projections),
/// and the pruned debug CFG when `EngineConfig::debug_rda_projection` asks
/// for it (spec §6).
pub struct DfgResult {
    pub edges: Vec<DfgEdge>,
    pub rda: RdaResult,
    pub debug_graph: Option<Graph>,
}

const LOOP_KINDS: &[&str] = &["for_statement", "while_statement", "do_statement", "for_range_loop"];

/// Every statement-level `NodeId` nested inside a loop construct (spec §4.7
/// step 3's `loop_nodes` precondition for self-redefinition edges).
fn collect_loop_nodes(lang: Lang, node_list: &HashMap<AstKey, Node>, index: &dyn Index) -> HashSet<NodeId> {
    let mut out = HashSet::new();
    for node in node_list.values() {
        let mut current = node.parent();
        while let Some(p) = current {
            if LOOP_KINDS.contains(&p.kind()) {
                if let Some(id) = index.get(&AstKey::of(*node)) {
                    out.insert(id);
                }
                break;
            }
            current = p.parent();
        }
    }
    out
}

/// Maps every statement's `NodeId` to the `NodeId` of its enclosing
/// function/constructor/destructor, consulted by `rda::solve` only when
/// `EngineConfig::intraprocedural_rda` is set (spec §4.5 "intraprocedural
/// mode").
fn collect_node_function(lang: Lang, node_list: &HashMap<AstKey, Node>, index: &dyn Index) -> HashMap<NodeId, NodeId> {
    let mut out = HashMap::new();
    for node in node_list.values() {
        if !crate::classify::is_statement(lang, node.kind()) {
            continue;
        }
        let (Some(id), Some(func)) = (index.get(&AstKey::of(*node)), cst::enclosing_function(*node)) else {
            continue;
        };
        if let Some(func_id) = index.get(&AstKey::of(func)) {
            out.insert(id, func_id);
        }
    }
    out
}

/// Builds the full SDFG for one translation unit: fact table, RDA fixed
/// point, intraprocedural edges, and the interprocedural layer (narrowed to
/// argument/return threading for C, full for C++ — spec §9 Open Question).
#[allow(clippy::too_many_arguments)]
pub fn build(
    lang: Lang,
    root: Node,
    code: &[u8],
    node_list: &HashMap<AstKey, Node>,
    graph: &Graph,
    records: &Records,
    index: &dyn Index,
    symbols: &dyn SymbolTable,
    config: &EngineConfig,
    sink: &mut dyn DiagnosticSink,
) -> DfgResult {
    let loop_nodes = collect_loop_nodes(lang, node_list, index);

    let facts = facts::collect(lang, root, code, index, symbols, sink);

    let node_function = config.intraprocedural_rda.then(|| collect_node_function(lang, node_list, index));
    let rda = rda::solve(graph, &facts.def, node_function.as_ref());

    let mut all_edges = edges::build(graph, &facts, &rda, records, config, &loop_nodes);

    let mut id_to_node: HashMap<NodeId, Node> = HashMap::new();
    for (key, node) in node_list {
        if let Some(id) = index.get(key) {
            id_to_node.insert(id, *node);
        }
    }
    let interprocedural_edges = interprocedural::build(lang, graph, &id_to_node, code, &facts, index, &records.lambda_map);
    all_edges.extend(interprocedural_edges);

    let debug_graph = config.debug_rda_projection.then(|| edges::debug_projection(graph, &rda));

    DfgResult {
        edges: all_edges,
        rda,
        debug_graph,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::NullSink;
    use crate::symbols::{MapIndex, MapSymbolTable};
    use std::collections::HashMap as Map;

    fn index_everything(root: Node) -> MapIndex {
        let mut map = Map::new();
        let mut next = 3i64;
        let mut stack = vec![root];
        while let Some(n) = stack.pop() {
            map.entry(AstKey::of(n)).or_insert_with(|| {
                let id = next;
                next += 1;
                id
            });
            let mut cursor = n.walk();
            for c in n.children(&mut cursor) {
                stack.push(c);
            }
        }
        MapIndex(map)
    }

    fn parse_c(src: &str) -> tree_sitter::Tree {
        let mut parser = tree_sitter::Parser::new();
        parser.set_language(&tree_sitter_c::LANGUAGE.into()).unwrap();
        parser.parse(src, None).unwrap()
    }

    #[test]
    fn straight_line_assignment_wires_a_comes_from_edge() {
        let src = "int main(){ int x=1; int y=x+1; return y; }";
        let tree = parse_c(src);
        let root = tree.root_node();
        let index = index_everything(root);
        let symbols = MapSymbolTable::default();
        let mut sink = NullSink;

        let extraction = crate::extract::extract(Lang::C, root, src.as_bytes(), &index, &mut sink);
        let node_list = extraction.node_list.clone();
        let decls = crate::symbols::MapDeclarationMap::default();
        let (graph, records) = crate::cfg::build(Lang::C, root, src.as_bytes(), extraction, &index, &symbols, &decls, &mut sink);

        let config = EngineConfig::default();
        let result = build(Lang::C, root, src.as_bytes(), &node_list, &graph, &records, &index, &symbols, &config, &mut sink);
        assert!(!result.edges.is_empty());
    }

    #[test]
    fn loop_nodes_are_detected_inside_a_for_statement() {
        let src = "int main(){ for(int i=0;i<10;i++) { x=x+1; } }";
        let tree = parse_c(src);
        let root = tree.root_node();
        let index = index_everything(root);
        let body_assignment = cst::bfs_find(root, |n| n.kind() == "assignment_expression", |_| true).unwrap();
        let stmt = cst::enclosing_statement(body_assignment, Lang::C).unwrap();
        let node_list: HashMap<AstKey, Node> = [(AstKey::of(stmt), stmt)].into_iter().collect();

        let loop_nodes = collect_loop_nodes(Lang::C, &node_list, &index);
        let stmt_id = index.get(&AstKey::of(stmt)).unwrap();
        assert!(loop_nodes.contains(&stmt_id));
    }
}

//! RAII destructor chains (spec §4.2 step 8, §4.3 "Destructor chain", I8).
//! Grounded in `original_source/src/comex/codeviews/CFG/CFG_cpp.py`'s
//! destructor-chain construction, generalized with `extends`-aware ordering
//! per the Open Question resolved in `SPEC_FULL.md` §9/`DESIGN.md`.

use std::collections::HashMap;

use tree_sitter::Node;

use crate::classify::Lang;
use crate::graph::Graph;
use crate::model::{AstKey, CfgEdgeKind, NodeId, Records};
use crate::symbols::Index;

/// Ordered destructor NodeIds for an object of static type `class_name`:
/// its own destructor first (if one exists), then each base class's chain in
/// `extends` discovery order. Classes without a registered destructor are
/// skipped (spec §4.3 "for every virtual destructor defined elsewhere").
pub fn destructor_chain_for(class_name: &str, records: &Records) -> Vec<NodeId> {
    let mut chain = Vec::new();
    let mut seen = std::collections::HashSet::new();
    collect_chain(class_name, records, &mut chain, &mut seen);
    chain
}

fn collect_chain(
    class_name: &str,
    records: &Records,
    chain: &mut Vec<NodeId>,
    seen: &mut std::collections::HashSet<String>,
) {
    if !seen.insert(class_name.to_owned()) {
        return;
    }
    let key = (Some(class_name.to_owned()), format!("~{class_name}"));
    if let Some(&id) = records.function_list.get(&(key, Vec::new())) {
        chain.push(id);
    }
    if let Some(bases) = records.extends.get(class_name) {
        for base in bases {
            collect_chain(base, records, chain, seen);
        }
    }
}

/// Last direct-child statement of a compound statement's body that has an
/// index entry — the scope's last executable statement (spec §4.2 step 8 /
/// §4.3's "destructor body's last statement").
pub fn last_statement_of<'tree>(
    body: Node<'tree>,
    lang: Lang,
    index: &dyn Index,
) -> Option<NodeId> {
    let mut cursor = body.walk();
    let last_child = body
        .named_children(&mut cursor)
        .filter(|c| crate::classify::is_statement(lang, c.kind()))
        .last()?;
    index.get(&AstKey::of(last_child))
}

/// Chains the destructor bodies in `chain` back to back with
/// `destructor_chain|var` edges, wiring the first entry from `from` and the
/// last exit to `to`. Used both for a single `delete` site (spec §4.3) and
/// for one RAII-scope variable (spec §4.2 step 8).
pub fn wire_chain(
    graph: &mut Graph,
    id_to_node: &HashMap<NodeId, Node>,
    lang: Lang,
    index: &dyn Index,
    chain: &[NodeId],
    from: NodeId,
    entry_kind: CfgEdgeKind,
    link_kind: impl Fn() -> CfgEdgeKind,
    to: NodeId,
    exit_kind: CfgEdgeKind,
) {
    if chain.is_empty() {
        return;
    }
    graph.add_edge(from, chain[0], entry_kind);
    for pair in chain.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if let Some(last) = dtor_last_statement(a, id_to_node, lang, index) {
            graph.add_edge(last, b, link_kind());
        }
    }
    if let Some(last) = dtor_last_statement(*chain.last().unwrap(), id_to_node, lang, index) {
        graph.add_edge(last, to, exit_kind);
    } else {
        graph.add_edge(*chain.last().unwrap(), to, exit_kind);
    }
}

pub(crate) fn dtor_last_statement(
    dtor_id: NodeId,
    id_to_node: &HashMap<NodeId, Node>,
    lang: Lang,
    index: &dyn Index,
) -> Option<NodeId> {
    let node = id_to_node.get(&dtor_id)?;
    let body = crate::cst::first_child_of_kind(*node, &["compound_statement", "field_declaration_list"])?;
    last_statement_of(body, lang, index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_follows_extends_depth_first() {
        let mut records = Records::default();
        records
            .function_list
            .insert(((Some("Base".into()), "~Base".into()), Vec::new()), 10);
        records
            .function_list
            .insert(((Some("Derived".into()), "~Derived".into()), Vec::new()), 20);
        records.extends.insert("Derived".into(), vec!["Base".into()]);

        let chain = destructor_chain_for("Derived", &records);
        assert_eq!(chain, vec![20, 10]);
    }

    #[test]
    fn chain_skips_classes_without_a_destructor() {
        let mut records = Records::default();
        records.extends.insert("Derived".into(), vec!["Base".into()]);
        let chain = destructor_chain_for("Derived", &records);
        assert!(chain.is_empty());
    }
}

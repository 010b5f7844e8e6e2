//! CFG construction orchestration (spec §4.2): ties the statement extractor,
//! call/return wiring, and RAII destructor chains into one `(Graph, Records)`
//! pair. Grounded in `original_source/src/comex/codeviews/CFG/CFG_c.py`'s
//! top-level `get_control_flow_graph` driver, generalized over C/C++ via
//! `classify`.

pub mod calls;
pub mod next_index;
pub mod raii;

use std::collections::{HashMap, HashSet};

use tree_sitter::Node;

use crate::classify::{self, Kind, Lang, StmtClass};
use crate::cst;
use crate::diagnostics::DiagnosticSink;
use crate::extract::Extraction;
use crate::graph::Graph;
use crate::model::{AstKey, CallId, CfgEdgeKind, CfgNode, NodeId, Records, EXIT_ID, START_ID};
use crate::symbols::{DeclarationMap, Index, SymbolTable};

pub use next_index::{is_jump_node, is_last_in_control_block, next_index};

/// Builds the full control-flow graph for one translation unit (spec §4.2
/// steps 1-9). Consumes the extractor's output, collects and wires call
/// edges (§4.3), and wires RAII destructor chains (§4.2 step 8).
#[allow(clippy::too_many_arguments)]
pub fn build<'tree>(
    lang: Lang,
    root: Node<'tree>,
    code: &'tree [u8],
    extraction: Extraction<'tree>,
    index: &dyn Index,
    symbols: &dyn SymbolTable,
    declarations: &dyn DeclarationMap,
    sink: &mut dyn DiagnosticSink,
) -> (Graph, Records) {
    let Extraction {
        node_list,
        graph_nodes,
        mut records,
    } = extraction;

    let mut id_to_node: HashMap<NodeId, Node<'tree>> = HashMap::new();
    for (key, node) in &node_list {
        if let Some(id) = index.get(key) {
            id_to_node.insert(id, *node);
        }
    }

    let mut graph = Graph::new();
    graph.insert_node(CfgNode {
        id: START_ID,
        line: 0,
        label: "start".to_owned(),
        type_tag: "start".to_owned(),
        block_index: 0,
    });
    for node in graph_nodes {
        graph.insert_node(node);
    }

    // step4 (computed early so every other pass can consult it): a synthetic
    // implicit-return id for every void-returning function/ctor/dtor.
    let synthetic_to_function = mint_implicit_returns(&mut records);

    // step1: sequential edges.
    for (key, node) in &node_list {
        let Some(id) = index.get(key) else { continue };
        if classify::classify(lang, node.kind()).contains(StmtClass::CONTROL) {
            continue;
        }
        if is_last_in_control_block(*node, lang) {
            continue;
        }
        if contains_nested_definition(*node) {
            continue;
        }
        let succ = next_index(*node, lang, &node_list, index, &records.implicit_return_map);
        emit_or_defer(&mut graph, &mut records, &synthetic_to_function, id, succ, CfgEdgeKind::NextLine);
    }

    // step2: basic blocks, over the sequential-only graph built so far.
    let components = graph.weakly_connected_components();
    for (id, block) in &components {
        if let Some(n) = graph.node_mut(*id) {
            n.block_index = *block;
        }
    }

    // step3: call map collection (records only; edges wait for step7).
    calls::collect(lang, root, code, index, symbols, declarations, &mut records, sink);

    // successor_of: next_index precomputed for every statement, shared by
    // call/return wiring (§4.3) and RAII scope-exit targets (§4.2 step 8).
    let mut successor_of: HashMap<NodeId, NodeId> = HashMap::new();
    for (key, node) in &node_list {
        if let Some(id) = index.get(key) {
            let succ = next_index(*node, lang, &node_list, index, &records.implicit_return_map);
            successor_of.insert(id, succ);
        }
    }

    // step6: per-statement control edges.
    for (key, node) in &node_list {
        let Some(id) = index.get(key) else { continue };
        build_control_edges(
            &mut graph,
            &mut records,
            &synthetic_to_function,
            &node_list,
            &successor_of,
            lang,
            code,
            index,
            *node,
            id,
        );
    }

    // step7: call edges.
    let mut next_call_id: CallId = 0;
    calls::wire(
        &mut graph,
        &mut records,
        &successor_of,
        &synthetic_to_function,
        &id_to_node,
        lang,
        index,
        &mut next_call_id,
    );

    // step8: RAII destructor chains.
    wire_raii(
        &mut graph,
        &mut records,
        &synthetic_to_function,
        &id_to_node,
        &node_list,
        lang,
        code,
        index,
        root,
    );

    // step9: global sequence.
    wire_global_sequence(&mut graph, &node_list, index, root);

    (graph, records)
}

/// spec §4.2 step 4: one synthetic id per void-returning function, allocated
/// via `Records::fresh_implicit_id`. Returns the reverse map consulted
/// everywhere a computed successor must be redirected into
/// `return_statement_map` instead of becoming a graph edge.
fn mint_implicit_returns(records: &mut Records) -> HashMap<NodeId, NodeId> {
    let mut synthetic_to_function = HashMap::new();
    let mut seen = HashSet::new();
    let entries: Vec<_> = records
        .function_list
        .iter()
        .map(|(k, &v)| (k.clone(), v))
        .collect();
    for (key, id) in entries {
        if !seen.insert(id) {
            continue;
        }
        let is_void = records.return_type.get(&key).is_none_or(|t| t == "void");
        if is_void {
            let synthetic = records.fresh_implicit_id();
            records.implicit_return_map.insert(id, synthetic);
            synthetic_to_function.insert(synthetic, id);
        }
    }
    synthetic_to_function
}

/// Redirects an edge whose computed target is a synthetic implicit-return id
/// into `return_statement_map` instead of drawing it (spec §4.2 step 4:
/// "these synthetics are not emitted as CfgNodes").
fn emit_or_defer(
    graph: &mut Graph,
    records: &mut Records,
    synthetic_to_function: &HashMap<NodeId, NodeId>,
    src: NodeId,
    dst: NodeId,
    kind: CfgEdgeKind,
) {
    if let Some(&owner) = synthetic_to_function.get(&dst) {
        let entry = records.return_statement_map.entry(owner).or_default();
        if !entry.contains(&src) {
            entry.push(src);
        }
    } else {
        graph.add_edge(src, dst, kind);
    }
}

/// Descendants-only scan for a nested definition (spec §4.2 step 1 "not
/// containing an inner definition"). Deliberately never inspects `node`
/// itself: C's `declaration` kind carries `StmtClass::DEFINITION`
/// unconditionally (any plain `int x;` classifies as a definition), so
/// reusing `cst::has_inner_definition` here would suppress every C
/// declaration's sequential edge.
fn contains_nested_definition(node: Node) -> bool {
    let mut cursor = node.walk();
    node.children(&mut cursor).any(|c| {
        matches!(
            c.kind(),
            "function_definition"
                | "class_specifier"
                | "struct_specifier"
                | "union_specifier"
                | "enum_specifier"
                | "constructor_or_destructor_definition"
        ) || contains_nested_definition(c)
    })
}

fn first_of_body<'tree>(
    branch: Node<'tree>,
    node_list: &HashMap<AstKey, Node<'tree>>,
    index: &dyn Index,
) -> Option<NodeId> {
    if branch.kind() == "compound_statement" {
        let mut cursor = branch.walk();
        for child in branch.named_children(&mut cursor) {
            if node_list.contains_key(&AstKey::of(child)) {
                if let Some(id) = index.get(&AstKey::of(child)) {
                    return Some(id);
                }
            }
        }
        return None;
    }
    if node_list.contains_key(&AstKey::of(branch)) {
        return index.get(&AstKey::of(branch));
    }
    None
}

fn last_of_body<'tree>(branch: Node<'tree>, lang: Lang) -> Option<Node<'tree>> {
    if branch.kind() == "compound_statement" {
        let mut cursor = branch.walk();
        return branch
            .named_children(&mut cursor)
            .filter(|c| classify::is_statement(lang, c.kind()))
            .last();
    }
    if classify::is_statement(lang, branch.kind()) {
        return Some(branch);
    }
    None
}

/// Wires a control body's fall-through tail (spec §4.2.2/step 6 "last of
/// then/else/body to next-after-construct unless last is a jump"). Shared by
/// if/else, try, and catch bodies; loops handle their own tail (`loop_control`
/// back-edge) separately since it targets the loop header, not `after`.
#[allow(clippy::too_many_arguments)]
fn wire_block_tail(
    graph: &mut Graph,
    records: &mut Records,
    synthetic_to_function: &HashMap<NodeId, NodeId>,
    index: &dyn Index,
    lang: Lang,
    branch: Node,
    after: NodeId,
    kind: CfgEdgeKind,
) {
    let Some(last) = last_of_body(branch, lang) else { return };
    if is_jump_node(lang, last) {
        return;
    }
    let Some(last_id) = index.get(&AstKey::of(last)) else { return };
    emit_or_defer(graph, records, synthetic_to_function, last_id, after, kind);
}

fn nearest_enclosing_loop(node: Node, lang: Lang) -> Option<Node> {
    let mut current = node.parent();
    while let Some(n) = current {
        if matches!(
            classify::lookup(lang, n.kind()),
            Kind::While | Kind::For | Kind::ForRange | Kind::Do
        ) {
            return Some(n);
        }
        current = n.parent();
    }
    None
}

fn nearest_enclosing_loop_or_switch(node: Node, lang: Lang) -> Option<Node> {
    let mut current = node.parent();
    while let Some(n) = current {
        if matches!(
            classify::lookup(lang, n.kind()),
            Kind::While | Kind::For | Kind::ForRange | Kind::Do | Kind::Switch
        ) {
            return Some(n);
        }
        current = n.parent();
    }
    None
}

fn nearest_enclosing_try(node: Node) -> Option<Node> {
    let mut current = node.parent();
    while let Some(n) = current {
        if n.kind() == "try_statement" {
            return Some(n);
        }
        current = n.parent();
    }
    None
}

fn is_class_member(records: &Records, id: NodeId) -> bool {
    records
        .function_list
        .iter()
        .any(|((class, _), &v)| v == id && class.is_some())
}

/// spec §4.2 step 6: the per-statement control-edge dispatch table.
#[allow(clippy::too_many_arguments)]
fn build_control_edges<'tree>(
    graph: &mut Graph,
    records: &mut Records,
    synthetic_to_function: &HashMap<NodeId, NodeId>,
    node_list: &HashMap<AstKey, Node<'tree>>,
    successor_of: &HashMap<NodeId, NodeId>,
    lang: Lang,
    code: &[u8],
    index: &dyn Index,
    node: Node<'tree>,
    id: NodeId,
) {
    let after = successor_of.get(&id).copied().unwrap_or(EXIT_ID);
    match classify::lookup(lang, node.kind()) {
        Kind::FunctionDefinition | Kind::ConstructorOrDestructorDefinition => {
            let is_main = records.main_function == Some(id);
            if is_main || !is_class_member(records, id) {
                graph.add_edge(START_ID, id, CfgEdgeKind::Next);
            }
            if let Some(body) = cst::first_child_of_kind(node, &["compound_statement", "field_declaration_list"]) {
                if let Some(first) = first_of_body(body, node_list, index) {
                    graph.add_edge(id, first, CfgEdgeKind::FirstNextLine);
                }
            }
        }
        Kind::If => {
            if let Some(then_b) = node.child_by_field_name("consequence") {
                if let Some(first) = first_of_body(then_b, node_list, index) {
                    graph.add_edge(id, first, CfgEdgeKind::PosNext);
                }
                wire_block_tail(graph, records, synthetic_to_function, index, lang, then_b, after, CfgEdgeKind::NextLine);
            }
            match node.child_by_field_name("alternative") {
                Some(else_b) if else_b.kind() == "if_statement" => {
                    if let Some(eid) = index.get(&AstKey::of(else_b)) {
                        graph.add_edge(id, eid, CfgEdgeKind::NegNext);
                    }
                }
                Some(else_b) => {
                    if let Some(first) = first_of_body(else_b, node_list, index) {
                        graph.add_edge(id, first, CfgEdgeKind::NegNext);
                    }
                    wire_block_tail(graph, records, synthetic_to_function, index, lang, else_b, after, CfgEdgeKind::NextLine);
                }
                None => {
                    emit_or_defer(graph, records, synthetic_to_function, id, after, CfgEdgeKind::NegNext);
                }
            }
        }
        Kind::While | Kind::For | Kind::ForRange => {
            if let Some(body) = node.child_by_field_name("body") {
                if let Some(first) = first_of_body(body, node_list, index) {
                    graph.add_edge(id, first, CfgEdgeKind::PosNext);
                }
                if let Some(last) = last_of_body(body, lang) {
                    if !is_jump_node(lang, last) {
                        if let Some(last_id) = index.get(&AstKey::of(last)) {
                            graph.add_edge(last_id, id, CfgEdgeKind::LoopControl);
                        }
                    }
                }
            }
            emit_or_defer(graph, records, synthetic_to_function, id, after, CfgEdgeKind::NegNext);
            graph.add_edge(id, id, CfgEdgeKind::LoopUpdate);
        }
        Kind::Do => {
            let condition = node.child_by_field_name("condition");
            if let Some(body) = node.child_by_field_name("body") {
                if let Some(first) = first_of_body(body, node_list, index) {
                    graph.add_edge(id, first, CfgEdgeKind::PosNext);
                }
                if let (Some(last), Some(cond)) = (last_of_body(body, lang), condition) {
                    if !is_jump_node(lang, last) {
                        if let (Some(last_id), Some(cond_id)) =
                            (index.get(&AstKey::of(last)), index.get(&AstKey::of(cond)))
                        {
                            graph.add_edge(last_id, cond_id, CfgEdgeKind::NextLine);
                        }
                    }
                }
            }
            if let Some(cond_id) = condition.and_then(|c| index.get(&AstKey::of(c))) {
                graph.add_edge(cond_id, id, CfgEdgeKind::LoopControl);
                emit_or_defer(graph, records, synthetic_to_function, cond_id, after, CfgEdgeKind::NegNext);
            }
        }
        Kind::Switch => {
            if let Some(body) = node.child_by_field_name("body") {
                let mut cursor = body.walk();
                let mut has_default = false;
                for child in body.named_children(&mut cursor) {
                    if child.kind() != "case_statement" {
                        continue;
                    }
                    if child.child_by_field_name("value").is_none() {
                        has_default = true;
                    }
                    if let Some(case_id) = index.get(&AstKey::of(child)) {
                        graph.add_edge(id, case_id, CfgEdgeKind::SwitchCase);
                    }
                }
                if !has_default {
                    emit_or_defer(graph, records, synthetic_to_function, id, after, CfgEdgeKind::SwitchExit);
                }
            }
        }
        Kind::Case => {
            let value = node.child_by_field_name("value");
            let mut cursor = node.walk();
            let first_stmt = node.named_children(&mut cursor).find(|c| {
                Some(*c) != value && classify::is_statement(lang, c.kind())
            });
            if let Some(stmt) = first_stmt {
                if let Some(stmt_id) = index.get(&AstKey::of(stmt)) {
                    graph.add_edge(id, stmt_id, CfgEdgeKind::CaseNext);
                }
            }
        }
        Kind::Break => {
            if let Some(enclosing) = nearest_enclosing_loop_or_switch(node, lang) {
                if let Some(eid) = index.get(&AstKey::of(enclosing)) {
                    let target = successor_of.get(&eid).copied().unwrap_or(EXIT_ID);
                    emit_or_defer(graph, records, synthetic_to_function, id, target, CfgEdgeKind::JumpNext);
                }
            }
        }
        Kind::Continue => {
            if let Some(enclosing) = nearest_enclosing_loop(node, lang) {
                if let Some(eid) = index.get(&AstKey::of(enclosing)) {
                    graph.add_edge(id, eid, CfgEdgeKind::JumpNext);
                }
            }
        }
        Kind::Return => {
            if let Some(f) = cst::enclosing_function(node) {
                if let Some(fid) = index.get(&AstKey::of(f)) {
                    let entry = records.return_statement_map.entry(fid).or_default();
                    if !entry.contains(&id) {
                        entry.push(id);
                    }
                }
            }
        }
        Kind::Goto => {
            if let Some(target) = node.child_by_field_name("label") {
                let label_name = cst::owned_text(target, code);
                if let Some(target_key) = records.label_statement_map.get(&label_name).cloned() {
                    if let Some(tid) = index.get(&target_key) {
                        graph.add_edge(id, tid, CfgEdgeKind::JumpNext);
                    }
                }
            }
        }
        Kind::LabeledStatement => {
            let mut cursor = node.walk();
            let inner = node
                .named_children(&mut cursor)
                .find(|c| classify::is_statement(lang, c.kind()) && c.kind() != "labeled_statement");
            match inner.and_then(|n| index.get(&AstKey::of(n))) {
                Some(inner_id) => {
                    graph.add_edge(id, inner_id, CfgEdgeKind::NextLine);
                }
                None => {
                    if let Some(&switch_id) = records.switch_child_map.get(&id) {
                        graph.add_edge(id, switch_id, CfgEdgeKind::NextLine);
                    }
                }
            }
        }
        Kind::TryStatement => {
            if let Some(body) = cst::first_child_of_kind(node, &["compound_statement"]) {
                if let Some(first) = first_of_body(body, node_list, index) {
                    graph.add_edge(id, first, CfgEdgeKind::TryNext);
                }
                wire_block_tail(graph, records, synthetic_to_function, index, lang, body, after, CfgEdgeKind::TryExit);
            }
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                if child.kind() == "catch_clause" {
                    if let Some(cid) = index.get(&AstKey::of(child)) {
                        graph.add_edge(id, cid, CfgEdgeKind::CatchException);
                    }
                }
            }
        }
        Kind::CatchClause => {
            if let Some(body) = cst::first_child_of_kind(node, &["compound_statement"]) {
                if let Some(first) = first_of_body(body, node_list, index) {
                    graph.add_edge(id, first, CfgEdgeKind::CatchNext);
                }
                let after_try = node
                    .parent()
                    .and_then(|t| index.get(&AstKey::of(t)))
                    .and_then(|tid| successor_of.get(&tid).copied())
                    .unwrap_or(EXIT_ID);
                wire_block_tail(graph, records, synthetic_to_function, index, lang, body, after_try, CfgEdgeKind::CatchExit);
            }
        }
        Kind::ThrowStatement => {
            if let Some(try_node) = nearest_enclosing_try(node) {
                let mut cursor = try_node.walk();
                for child in try_node.children(&mut cursor) {
                    if child.kind() == "catch_clause" {
                        if let Some(cid) = index.get(&AstKey::of(child)) {
                            graph.add_edge(id, cid, CfgEdgeKind::ThrowExit);
                        }
                    }
                }
            } else if let Some(f) = cst::enclosing_function(node) {
                if let Some(fid) = index.get(&AstKey::of(f)) {
                    let entry = records.return_statement_map.entry(fid).or_default();
                    if !entry.contains(&id) {
                        entry.push(id);
                    }
                }
            }
        }
        Kind::LambdaExpression => {
            if let Some(body) = cst::first_child_of_kind(node, &["compound_statement"]) {
                if let Some(first) = first_of_body(body, node_list, index) {
                    graph.add_edge(id, first, CfgEdgeKind::LambdaNext);
                }
            }
        }
        Kind::NamespaceDefinition => {
            if let Some(body) = cst::first_child_of_kind(node, &["declaration_list"]) {
                if let Some(first) = first_of_body(body, node_list, index) {
                    graph.add_edge(id, first, CfgEdgeKind::NamespaceEntry);
                }
            }
        }
        Kind::ClassSpecifier | Kind::StructSpecifier => {
            if let Some(body) = cst::first_child_of_kind(node, &["field_declaration_list"]) {
                if let Some(first) = first_of_body(body, node_list, index) {
                    graph.add_edge(id, first, CfgEdgeKind::ClassNext);
                }
            }
        }
        _ => {}
    }
}

fn wire_global_sequence<'tree>(
    graph: &mut Graph,
    node_list: &HashMap<AstKey, Node<'tree>>,
    index: &dyn Index,
    root: Node<'tree>,
) {
    let mut top_level: Vec<(usize, NodeId)> = Vec::new();
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        if node_list.contains_key(&AstKey::of(child)) {
            if let Some(id) = index.get(&AstKey::of(child)) {
                top_level.push((child.start_position().row, id));
            }
        }
    }
    top_level.sort_by_key(|(line, _)| *line);
    for pair in top_level.windows(2) {
        graph.add_edge(pair[0].1, pair[1].1, CfgEdgeKind::GlobalSequence);
    }
}

/// spec §4.2 step 8: RAII destructor chains for every scope that locally
/// declares an object of a destructor-bearing class. C has no destructors;
/// this pass is a no-op for `Lang::C`.
#[allow(clippy::too_many_arguments)]
fn wire_raii<'tree>(
    graph: &mut Graph,
    records: &mut Records,
    synthetic_to_function: &HashMap<NodeId, NodeId>,
    id_to_node: &HashMap<NodeId, Node<'tree>>,
    node_list: &HashMap<AstKey, Node<'tree>>,
    lang: Lang,
    code: &'tree [u8],
    index: &dyn Index,
    root: Node<'tree>,
) {
    if lang != Lang::Cpp {
        return;
    }
    let mut stack = vec![root];
    while let Some(n) = stack.pop() {
        if n.kind() == "compound_statement" {
            wire_scope(graph, records, synthetic_to_function, id_to_node, node_list, lang, code, index, n);
        }
        let mut cursor = n.walk();
        for c in n.children(&mut cursor) {
            stack.push(c);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn wire_scope<'tree>(
    graph: &mut Graph,
    records: &mut Records,
    synthetic_to_function: &HashMap<NodeId, NodeId>,
    id_to_node: &HashMap<NodeId, Node<'tree>>,
    node_list: &HashMap<AstKey, Node<'tree>>,
    lang: Lang,
    code: &'tree [u8],
    index: &dyn Index,
    scope: Node<'tree>,
) {
    let mut cursor = scope.walk();
    let mut locals: Vec<(String, String)> = Vec::new();
    for child in scope.named_children(&mut cursor) {
        if child.kind() != "declaration" {
            continue;
        }
        let Some(type_node) = child.child_by_field_name("type") else { continue };
        let class_name = cst::owned_text(type_node, code);
        if raii::destructor_chain_for(&class_name, records).is_empty() {
            continue;
        }
        let Some(declarator) = child.child_by_field_name("declarator") else { continue };
        let Some(name_node) = cst::declarator_name(declarator) else { continue };
        locals.push((cst::owned_text(name_node, code), class_name));
    }
    if locals.is_empty() {
        return;
    }

    let Some(last_node) = last_of_body(scope, lang) else { return };
    if is_jump_node(lang, last_node) {
        return;
    }
    let Some(mut from) = index.get(&AstKey::of(last_node)) else { return };
    let exit_target = next_index(last_node, lang, node_list, index, &records.implicit_return_map);

    let mut first = true;
    let mut last_var = String::new();
    for (var_name, class_name) in locals.iter().rev() {
        let chain = raii::destructor_chain_for(class_name, records);
        let Some(&head) = chain.first() else { continue };
        let entry_kind = if first {
            CfgEdgeKind::ScopeExitDestructor
        } else {
            CfgEdgeKind::DestructorChain(Some(last_var.clone()))
        };
        graph.add_edge(from, head, entry_kind);
        for pair in chain.windows(2) {
            if let Some(stmt) = raii::dtor_last_statement(pair[0], id_to_node, lang, index) {
                graph.add_edge(stmt, pair[1], CfgEdgeKind::DestructorChain(Some(var_name.clone())));
            }
        }
        let tail = *chain.last().unwrap();
        from = raii::dtor_last_statement(tail, id_to_node, lang, index).unwrap_or(tail);
        last_var = var_name.clone();
        first = false;
    }

    if let Some(&owner) = synthetic_to_function.get(&exit_target) {
        let entry = records.return_statement_map.entry(owner).or_default();
        if !entry.contains(&from) {
            entry.push(from);
        }
    } else {
        graph.add_edge(from, exit_target, CfgEdgeKind::ScopeDestructorReturn(last_var));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::NullSink;
    use crate::symbols::{MapDeclarationMap, MapIndex, MapSymbolTable};
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
    fn sequential_c_function_chains_statements_by_next_line() {
        let src = "int main(){ int x=1; int y=2; return y; }";
        let tree = parse_c(src);
        let root = tree.root_node();
        let index = index_everything(root);
        let symbols = MapSymbolTable::default();
        let decls = MapDeclarationMap::default();
        let mut sink = NullSink;

        let extraction = crate::extract::extract(Lang::C, root, src.as_bytes(), &index, &mut sink);
        let (graph, records) = build(Lang::C, root, src.as_bytes(), extraction, &index, &symbols, &decls, &mut sink);

        let main_id = records.main_function.unwrap();
        assert!(graph.out_edges(START_ID).iter().any(|(t, _)| *t == main_id));
        let body_edges = graph.out_edges(main_id);
        assert!(body_edges.iter().any(|(_, k)| matches!(k, CfgEdgeKind::FirstNextLine)));
        assert!(!records.return_statement_map.get(&main_id).unwrap().is_empty());
    }

    #[test]
    fn if_without_else_wires_neg_next_to_after_statement() {
        let src = "int main(){ if (1) { int x=1; } int z=2; }";
        let tree = parse_c(src);
        let root = tree.root_node();
        let index = index_everything(root);
        let symbols = MapSymbolTable::default();
        let decls = MapDeclarationMap::default();
        let mut sink = NullSink;

        let extraction = crate::extract::extract(Lang::C, root, src.as_bytes(), &index, &mut sink);
        let (graph, _records) = build(Lang::C, root, src.as_bytes(), extraction, &index, &symbols, &decls, &mut sink);

        let if_node = graph.nodes().find(|n| n.type_tag == "if").unwrap();
        let out = graph.out_edges(if_node.id);
        assert!(out.iter().any(|(_, k)| matches!(k, CfgEdgeKind::PosNext)));
        assert!(out.iter().any(|(_, k)| matches!(k, CfgEdgeKind::NegNext)));
    }

    #[test]
    fn do_while_condition_loops_back_and_exits() {
        let src = "int main(){ int i=0; do { i=i+1; } while(i<10); }";
        let tree = parse_c(src);
        let root = tree.root_node();
        let index = index_everything(root);
        let symbols = MapSymbolTable::default();
        let decls = MapDeclarationMap::default();
        let mut sink = NullSink;

        let extraction = crate::extract::extract(Lang::C, root, src.as_bytes(), &index, &mut sink);
        let (graph, _records) = build(Lang::C, root, src.as_bytes(), extraction, &index, &symbols, &decls, &mut sink);

        let cond = graph.nodes().find(|n| n.type_tag == "while").unwrap();
        let out = graph.out_edges(cond.id);
        assert!(out.iter().any(|(_, k)| matches!(k, CfgEdgeKind::LoopControl)));
        assert!(out.iter().any(|(_, k)| matches!(k, CfgEdgeKind::NegNext)));
    }
}

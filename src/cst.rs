//! Tree walker & node classifier (spec §2 component 1, §4.1). Thin,
//! allocation-light helpers over `tree_sitter::Node` that `extract`/`cfg`/
//! `dfg` share — breadth-first search, text extraction, and the small
//! structural predicates the reference's `c_nodes.py`/`cpp_nodes.py` define
//! as free functions (`get_child_of_type`, `return_switch_child`,
//! `has_inner_definition`, `get_signature`, lambda detection).

use std::collections::VecDeque;

use tree_sitter::Node;

use crate::classify::{self, Kind, Lang, StmtClass};

/// Decoded source text of `node`, or `None` if the slice is not valid UTF-8
/// (a malformed/partial parse — spec §7 "parser inconsistency").
#[inline]
pub fn text_of<'a>(node: Node<'_>, code: &'a [u8]) -> Option<&'a str> {
    std::str::from_utf8(&code[node.start_byte()..node.end_byte()]).ok()
}

pub fn owned_text(node: Node<'_>, code: &[u8]) -> String {
    text_of(node, code).unwrap_or_default().to_owned()
}

/// First direct child whose kind is in `kinds`, mirroring
/// `get_child_of_type`.
pub fn first_child_of_kind<'a>(node: Node<'a>, kinds: &[&str]) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .find(|c| kinds.contains(&c.kind()))
}

/// Breadth-first search rooted at `node` (inclusive), yielding the first
/// node for which `found` returns true. `descend` controls whether a node's
/// children are queued (mirrors the reference's early-stop BFS variants,
/// e.g. `return_switch_child` stops descending once it crosses into another
/// statement-set node).
pub fn bfs_find<'a>(
    node: Node<'a>,
    mut found: impl FnMut(Node<'a>) -> bool,
    mut descend: impl FnMut(Node<'a>) -> bool,
) -> Option<Node<'a>> {
    let mut queue: VecDeque<Node<'a>> = VecDeque::new();
    queue.push_back(node);
    while let Some(top) = queue.pop_front() {
        if found(top) {
            return Some(top);
        }
        if descend(top) {
            let mut cursor = top.walk();
            for child in top.children(&mut cursor) {
                queue.push_back(child);
            }
        }
    }
    None
}

/// If a `switch_statement` is nested somewhere inside `node` without another
/// statement-set node in between, return it (spec §4.1 "switch_child_map").
pub fn return_switch_child<'a>(node: Node<'a>, lang: Lang) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    let mut queue: VecDeque<Node<'a>> = node.children(&mut cursor).collect();
    while let Some(top) = queue.pop_front() {
        if top.kind() == "switch_statement" {
            return Some(top);
        }
        if classify::is_statement(lang, top.kind()) {
            continue;
        }
        let mut c = top.walk();
        for child in top.children(&mut c) {
            queue.push_back(child);
        }
    }
    None
}

/// True if `node` (or any descendant, stopping at nested statement-set
/// nodes for lambda detection, but unrestricted here) is/contains a
/// definition-class node (`c_nodes.py::has_inner_definition`).
pub fn has_inner_definition(node: Node, lang: Lang) -> bool {
    if classify::classify(lang, node.kind()).contains(StmtClass::DEFINITION) {
        return true;
    }
    let mut cursor = node.walk();
    node.children(&mut cursor).any(|c| has_inner_definition(c, lang))
}

/// Breadth-first search for the first `lambda_expression` inside `node`
/// (`cpp_nodes.py::get_lambda_body`). No-op for C (lambdas don't classify).
pub fn first_lambda<'a>(node: Node<'a>) -> Option<Node<'a>> {
    bfs_find(node, |n| n.kind() == "lambda_expression", |_| true)
}

/// All `lambda_expression` nodes inside `node`, breadth-first, not
/// descending past a nested lambda's own node-list boundary
/// (`cpp_nodes.py::get_all_lambda_body`).
pub fn all_lambdas<'a>(node: Node<'a>, lang: Lang) -> Vec<Node<'a>> {
    let mut out = Vec::new();
    let mut queue: VecDeque<Node<'a>> = VecDeque::new();
    queue.push_back(node);
    while let Some(top) = queue.pop_front() {
        if top.kind() == "lambda_expression" {
            out.push(top);
        }
        let mut cursor = top.walk();
        for child in top.children(&mut cursor) {
            if child.kind() == "lambda_expression" || !classify::is_statement(lang, child.kind()) {
                queue.push_back(child);
            }
        }
    }
    out
}

/// True iff `node` directly contains a lambda whose textual extent starts
/// inside `node` itself rather than a nested statement (`check_lambda`).
pub fn contains_own_lambda(node: Node, lang: Lang) -> bool {
    let Some(lambda) = first_lambda(node) else {
        return false;
    };
    let mut parent = lambda.parent();
    while let Some(p) = parent {
        if classify::is_statement(lang, p.kind()) {
            return p == node;
        }
        parent = p.parent();
    }
    false
}

/// Parameter type strings in declaration order, for overload-signature keys
/// (spec §4.1 "Function signatures", `get_signature`/`get_function_signature`).
pub fn parameter_signature(declarator: Node, lang: Lang) -> Vec<String> {
    const TYPE_KINDS: &[&str] = &[
        "primitive_type",
        "type_identifier",
        "template_type",
        "qualified_identifier",
        "sized_type_specifier",
    ];
    let Some(params) = declarator.child_by_field_name("parameters") else {
        return Vec::new();
    };
    let param_kinds: &[&str] = match lang {
        Lang::C => &["parameter_declaration"],
        Lang::Cpp => &["parameter_declaration", "optional_parameter_declaration"],
    };
    let mut cursor = params.walk();
    params
        .children(&mut cursor)
        .filter(|p| param_kinds.contains(&p.kind()))
        .filter_map(|p| first_child_of_kind(p, TYPE_KINDS))
        .map(|t| t.kind().to_owned())
        .collect()
}

/// Walks up through `pointer_declarator`/`reference_declarator` wrappers to
/// the underlying `function_declarator`, if any (return-type-as-pointer
/// case from `cpp_nodes.py::get_nodes`'s `function_definition` branch).
pub fn innermost_function_declarator(node: Node) -> Option<Node> {
    let mut current = node;
    loop {
        match current.kind() {
            "function_declarator" => return Some(current),
            "pointer_declarator" | "reference_declarator" => {
                current = current.named_child(0)?;
            }
            _ => return None,
        }
    }
}

/// The leaf identifier a function/method declarator names, descending
/// through pointer/reference/function_declarator wrappers.
pub fn declarator_name<'a>(declarator: Node<'a>) -> Option<Node<'a>> {
    match declarator.kind() {
        "function_declarator" => {
            let inner = declarator.child_by_field_name("declarator")?;
            declarator_name(inner)
        }
        "pointer_declarator" | "reference_declarator" => {
            declarator_name(declarator.child_by_field_name("declarator")?)
        }
        "identifier" | "field_identifier" | "qualified_identifier" | "destructor_name"
        | "operator_name" => Some(declarator),
        _ => None,
    }
}

/// Walks up to the nearest ancestor in the statement set, bypassing
/// expression wrappers (`parenthesized_expression`, `binary_expression`,
/// `unary_expression`, ...), per spec §4.6.
pub fn enclosing_statement<'a>(node: Node<'a>, lang: Lang) -> Option<Node<'a>> {
    let mut current = node.parent();
    while let Some(n) = current {
        if classify::is_statement(lang, n.kind()) {
            return Some(n);
        }
        current = n.parent();
    }
    None
}

/// The nearest `function_definition`/`constructor_or_destructor_definition`
/// ancestor, or `None` at file scope (`cpp_nodes.py::find_function_definition`).
pub fn enclosing_function<'a>(node: Node<'a>) -> Option<Node<'a>> {
    let mut current = node.parent();
    while let Some(n) = current {
        if matches!(
            n.kind(),
            "function_definition" | "constructor_or_destructor_definition"
        ) {
            return Some(n);
        }
        current = n.parent();
    }
    None
}

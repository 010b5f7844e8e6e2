//! `next_index` (spec §4.2.1) and the "last statement in control block"
//! predicate (spec §4.2.2), grounded in
//! `original_source/src/comex/codeviews/CFG/CFG_c.py::get_next_index` and
//! `get_block_last_line`, generalized over both languages via `classify`.

use std::collections::HashMap;

use tree_sitter::Node;

use crate::classify::{self, Kind, Lang, StmtClass};
use crate::model::{AstKey, EXIT_ID, NodeId};
use crate::symbols::Index;

/// Successor computation starting from `node` (spec §4.2.1). Returns the
/// NodeId of the next executable statement, or `EXIT_ID` if control falls
/// off the end of the enclosing function/class/translation unit. Callers
/// that need the *implicit return* substitution for void functions apply it
/// themselves (this function has no notion of `Records`).
pub fn next_index<'tree>(
    start: Node<'tree>,
    lang: Lang,
    node_list: &HashMap<AstKey, Node<'tree>>,
    index: &dyn Index,
    implicit_returns: &HashMap<NodeId, NodeId>,
) -> NodeId {
    let mut node = start;
    loop {
        if let Some(sibling) = node.next_named_sibling() {
            return descend_into(sibling, lang, node_list, index, implicit_returns);
        }
        let Some(parent) = node.parent() else {
            return EXIT_ID;
        };
        let class = classify::classify(lang, parent.kind());
        if class.contains(StmtClass::LOOP_CONTROL) {
            if let Some(id) = index.get(&AstKey::of(parent)) {
                return id;
            }
        }
        if class.contains(StmtClass::CONTROL) {
            node = parent;
            continue;
        }
        if matches!(
            parent.kind(),
            "function_definition" | "constructor_or_destructor_definition"
        ) {
            // spec §4.2.1: substitute the synthetic implicit-return id when
            // this function falls off without an explicit return (void
            // function, constructor, destructor).
            if let Some(fid) = index.get(&AstKey::of(parent)) {
                if let Some(&synthetic) = implicit_returns.get(&fid) {
                    return synthetic;
                }
            }
            return EXIT_ID;
        }
        if matches!(parent.kind(), "class_specifier" | "struct_specifier") {
            return EXIT_ID;
        }
        if parent.kind() == "namespace_definition" {
            node = parent;
            continue;
        }
        if classify::is_statement_holder(lang, parent.kind()) {
            node = parent;
            continue;
        }
        node = parent;
    }
}

/// Descends from a sibling found by `next_index` into the actual successor
/// statement: skip empty compound blocks, enter the first statement of a
/// non-empty one, descend through a C++ `field_declaration` to its first
/// statement-level descendant, otherwise take the node itself if it is in
/// `node_list`, else keep walking the successor chain from it.
fn descend_into<'tree>(
    node: Node<'tree>,
    lang: Lang,
    node_list: &HashMap<AstKey, Node<'tree>>,
    index: &dyn Index,
    implicit_returns: &HashMap<NodeId, NodeId>,
) -> NodeId {
    if node.kind() == "compound_statement" {
        if node.named_child_count() == 0 {
            return next_index(node, lang, node_list, index, implicit_returns);
        }
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if node_list.contains_key(&AstKey::of(child)) {
                if let Some(id) = index.get(&AstKey::of(child)) {
                    return id;
                }
            }
        }
        // No direct child registered (e.g. all children are inner-node
        // clauses); fall through the block's own successor chain.
        return next_index(node, lang, node_list, index, implicit_returns);
    }

    if node.kind() == "field_declaration" {
        if let Some(d) = first_statement_descendant(node, lang) {
            if let Some(id) = index.get(&AstKey::of(d)) {
                return id;
            }
        }
        return next_index(node, lang, node_list, index, implicit_returns);
    }

    if node_list.contains_key(&AstKey::of(node)) {
        if let Some(id) = index.get(&AstKey::of(node)) {
            return id;
        }
    }
    next_index(node, lang, node_list, index, implicit_returns)
}

fn first_statement_descendant<'tree>(node: Node<'tree>, lang: Lang) -> Option<Node<'tree>> {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if classify::is_statement(lang, child.kind()) {
            return Some(child);
        }
        if let Some(found) = first_statement_descendant(child, lang) {
            return Some(found);
        }
    }
    None
}

/// spec §4.2.2: a node is the last statement in a control block when its
/// parent is the body/consequence/alternative/else-clause of an
/// if/while/for/for_range/do, directly or via the final child of an
/// enclosing compound statement. Such nodes are excluded from sequential-edge
/// emission — §4.2 step 6 handles their outgoing edges instead.
pub fn is_last_in_control_block(node: Node, lang: Lang) -> bool {
    let Some(parent) = node.parent() else {
        return false;
    };
    if is_control_body_owner(parent, lang) {
        return true;
    }
    if parent.kind() == "compound_statement" {
        let mut cursor = parent.walk();
        let is_last_named_child = parent
            .named_children(&mut cursor)
            .last()
            .is_some_and(|last| last == node);
        if is_last_named_child {
            if let Some(grandparent) = parent.parent() {
                return is_control_body_owner(grandparent, lang);
            }
        }
    }
    false
}

fn is_control_body_owner(node: Node, lang: Lang) -> bool {
    matches!(
        classify::lookup(lang, node.kind()),
        Kind::If | Kind::While | Kind::For | Kind::ForRange | Kind::Do
    )
}

/// spec GLOSSARY "Jump statement": `break, continue, return, goto, throw`.
pub fn is_jump_node(lang: Lang, node: Node) -> bool {
    classify::is_jump(classify::lookup(lang, node.kind()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::MapIndex;
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

    fn node_list_of<'a>(root: Node<'a>, lang: Lang) -> HashMap<AstKey, Node<'a>> {
        let mut out = HashMap::new();
        let mut stack = vec![root];
        while let Some(n) = stack.pop() {
            if classify::is_statement(lang, n.kind()) {
                out.insert(AstKey::of(n), n);
            }
            let mut cursor = n.walk();
            for c in n.children(&mut cursor) {
                stack.push(c);
            }
        }
        out
    }

    fn parse_c(src: &str) -> tree_sitter::Tree {
        let mut parser = tree_sitter::Parser::new();
        parser.set_language(&tree_sitter_c::LANGUAGE.into()).unwrap();
        parser.parse(src, None).unwrap()
    }

    #[test]
    fn sequential_declarations_chain_by_next_sibling() {
        let src = "int main(){ int x=1; int y=2; return y; }";
        let tree = parse_c(src);
        let root = tree.root_node();
        let index = index_everything(root);
        let node_list = node_list_of(root, Lang::C);

        let decl_x = node_list
            .values()
            .find(|n| n.kind() == "declaration" && crate::cst::owned_text(**n, src.as_bytes()).contains('x'))
            .copied()
            .unwrap();
        let decl_y_id = index.get(&AstKey::of(
            *node_list
                .values()
                .find(|n| n.kind() == "declaration" && crate::cst::owned_text(**n, src.as_bytes()).contains('y'))
                .unwrap(),
        ));

        let next = next_index(decl_x, Lang::C, &node_list, &index, &Map::new());
        assert_eq!(Some(next), decl_y_id);
    }

    #[test]
    fn falling_off_function_body_returns_exit() {
        let src = "void f(){ int x=1; }";
        let tree = parse_c(src);
        let root = tree.root_node();
        let index = index_everything(root);
        let node_list = node_list_of(root, Lang::C);
        let decl = *node_list.values().find(|n| n.kind() == "declaration").unwrap();
        assert_eq!(next_index(decl, Lang::C, &node_list, &index, &Map::new()), EXIT_ID);
    }

    #[test]
    fn last_statement_in_if_then_is_detected() {
        let src = "int main(){ if (1) { int x=1; } }";
        let tree = parse_c(src);
        let root = tree.root_node();
        let node_list = node_list_of(root, Lang::C);
        let decl = *node_list.values().find(|n| n.kind() == "declaration").unwrap();
        assert!(is_last_in_control_block(decl, Lang::C));
    }
}

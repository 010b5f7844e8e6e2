//! Call-map collection and call/return edge wiring (spec §4.2 steps 3 & 7,
//! §4.3). Grounded in `original_source/src/comex/codeviews/CFG/CFG_c.py`'s
//! `get_function_calls`/`add_function_call_edges` and the C++ virtual-dispatch
//! and constructor/destructor matching rules `CFG_cpp.py` layers on top.

use std::collections::HashMap;

use tree_sitter::Node;

use crate::classify::{self, Lang};
use crate::cst;
use crate::diagnostics::{DiagnosticSink, SkipReason};
use crate::graph::Graph;
use crate::model::{CallId, CallSite, CfgEdgeKind, FunctionKey, NodeId, Records};
use crate::symbols::{DeclarationMap, Index, SymbolTable};
use crate::types;

use super::raii;

/// Strips `*`/`&`/`const`/whitespace down to a bare type name, used to turn a
/// pointer/reference static type into a class name candidate.
fn bare_type_name(t: &str) -> String {
    t.replace("const", "")
        .replace(['*', '&'], "")
        .split_whitespace()
        .last()
        .unwrap_or("")
        .to_owned()
}

struct CallCollector<'idx, 'sink, 'tree> {
    lang: Lang,
    code: &'tree [u8],
    index: &'idx dyn Index,
    symbols: &'idx dyn SymbolTable,
    declarations: &'idx dyn DeclarationMap,
    sink: &'sink mut dyn DiagnosticSink,
    records: &'idx mut Records,
    /// Variable name -> class name, populated from `new_expression`s seen so
    /// far in traversal order; consulted by `delete_expression` handling for
    /// the "runtime type from a prior new-expression" rule (spec §4.2 step 3).
    new_types: HashMap<String, String>,
}

pub fn collect<'tree>(
    lang: Lang,
    root: Node<'tree>,
    code: &'tree [u8],
    index: &dyn Index,
    symbols: &dyn SymbolTable,
    declarations: &dyn DeclarationMap,
    records: &mut Records,
    sink: &mut dyn DiagnosticSink,
) {
    let mut c = CallCollector {
        lang,
        code,
        index,
        symbols,
        declarations,
        sink,
        records,
        new_types: HashMap::new(),
    };
    c.walk(root);
}

impl<'idx, 'sink, 'tree> CallCollector<'idx, 'sink, 'tree> {
    fn text(&self, node: Node<'tree>) -> String {
        cst::owned_text(node, self.code)
    }

    fn infer(&self, node: Node<'tree>) -> String {
        types::infer(node, self.lang, self.code, self.index, self.declarations, self.symbols)
    }

    fn enclosing_id(&mut self, node: Node<'tree>) -> Option<NodeId> {
        let stmt = cst::enclosing_statement(node, self.lang)?;
        let id = self.index.get(&crate::model::AstKey::of(stmt));
        if id.is_none() {
            self.sink.skip(SkipReason::MissingIndex, stmt.kind(), None);
        }
        id
    }

    fn inner_id(&mut self, node: Node<'tree>) -> Option<NodeId> {
        self.index.get(&crate::model::AstKey::of(node))
    }

    fn walk(&mut self, node: Node<'tree>) {
        match node.kind() {
            "new_expression" => self.visit_new(node),
            "delete_expression" => self.visit_delete(node),
            "call_expression" => self.visit_call(node),
            "assignment_expression" => self.visit_assignment(node),
            "init_declarator" => self.visit_init_declarator(node),
            _ => {}
        }
        let mut cursor = node.walk();
        let children: Vec<Node<'tree>> = node.children(&mut cursor).collect();
        for c in children {
            self.walk(c);
        }
    }

    fn visit_new(&mut self, node: Node<'tree>) {
        let Some(type_node) = node.child_by_field_name("type") else {
            return;
        };
        let class_name = self.text(type_node);

        // Track `T* p = new T(...)` so a later `delete p` resolves the
        // runtime type without needing alias analysis.
        if let Some(parent) = node.parent() {
            if parent.kind() == "init_declarator" {
                if let Some(declarator) = parent.child_by_field_name("declarator") {
                    if let Some(name) = cst::declarator_name(declarator) {
                        self.new_types.insert(self.text(name), class_name.clone());
                    }
                }
            } else if parent.kind() == "assignment_expression" {
                if let Some(left) = parent.child_by_field_name("left") {
                    self.new_types.insert(self.text(left), class_name.clone());
                }
            }
        }

        let args = node.child_by_field_name("arguments");
        let sig = args
            .map(|a| {
                let mut cursor = a.walk();
                a.named_children(&mut cursor).map(|c| self.infer(c)).collect()
            })
            .unwrap_or_default();

        let Some(inner) = self.inner_id(node) else { return };
        let Some(enclosing) = self.enclosing_id(node) else { return };
        let key: FunctionKey = ((Some(class_name), "constructor".into()), sig);
        self.records
            .constructor_calls
            .entry(key)
            .or_default()
            .push((inner, enclosing));
    }

    fn visit_delete(&mut self, node: Node<'tree>) {
        let Some(operand) = node.named_child(0) else { return };
        let var_name = self.text(operand).trim_start_matches('*').to_owned();

        let runtime_type = self.new_types.get(&var_name).cloned().or_else(|| {
            let use_id = self.index.get(&crate::model::AstKey::of(operand))?;
            let decl_id = self.declarations.declaration_of(use_id)?;
            self.symbols.data_type_of(decl_id).map(bare_type_name)
        });

        let Some(class_name) = runtime_type else {
            self.sink
                .skip(SkipReason::UnresolvedIdentifier, "delete_expression", None);
            return;
        };

        let Some(inner) = self.inner_id(node) else { return };
        let Some(enclosing) = self.enclosing_id(node) else { return };
        let key: FunctionKey = ((Some(class_name.clone()), format!("~{class_name}")), Vec::new());
        self.records
            .destructor_calls
            .entry(key)
            .or_default()
            .push((inner, enclosing));
    }

    fn visit_call(&mut self, node: Node<'tree>) {
        let Some(function) = node.child_by_field_name("function") else {
            return;
        };
        let args = node.child_by_field_name("arguments");
        let sig: Vec<String> = args
            .map(|a| {
                let mut cursor = a.walk();
                a.named_children(&mut cursor).map(|c| self.infer(c)).collect()
            })
            .unwrap_or_default();

        let Some(inner) = self.inner_id(node) else { return };
        let Some(enclosing) = self.enclosing_id(node) else { return };
        let site: CallSite = (inner, enclosing);

        match function.kind() {
            "field_expression" => {
                let Some(field) = function.child_by_field_name("field") else { return };
                let name = self.text(field);
                let object = function.child_by_field_name("argument");
                let class_name = object.and_then(|o| self.static_class_of(o));
                let key: FunctionKey = ((class_name, name), sig);
                self.records.method_calls.entry(key).or_default().push(site);
            }
            "qualified_identifier" => {
                let scope = function.child_by_field_name("scope").map(|s| self.text(s));
                let name = function
                    .child_by_field_name("name")
                    .map(|n| self.text(n))
                    .unwrap_or_else(|| self.text(function));
                let key: FunctionKey = (
                    (scope.map(|s| s.trim_end_matches("::").to_owned()), name),
                    sig,
                );
                self.records.method_calls.entry(key).or_default().push(site);
            }
            "identifier" => {
                let name = self.text(function);
                let key: FunctionKey = ((None, name.clone()), sig.clone());
                if self.records.function_pointer_assignments.contains_key(&name) {
                    self.records.indirect_calls.entry(key).or_default().push(site);
                } else {
                    self.records.function_calls.entry(key).or_default().push(site);
                }
            }
            "subscript_expression" | "pointer_expression" | "parenthesized_expression" => {
                let name = self.text(function);
                let key: FunctionKey = ((None, name), sig);
                self.records.indirect_calls.entry(key).or_default().push(site);
            }
            _ => {}
        }
    }

    fn visit_assignment(&mut self, node: Node<'tree>) {
        let (Some(left), Some(right)) = (
            node.child_by_field_name("left"),
            node.child_by_field_name("right"),
        ) else {
            return;
        };
        if right.kind() == "identifier" {
            let fn_name = self.text(right);
            let key: FunctionKey = ((None, fn_name.clone()), Vec::new());
            if self.records.function_list.contains_key(&key) {
                self.records
                    .function_pointer_assignments
                    .entry(self.text(left))
                    .or_default()
                    .push(fn_name);
            }
        }
    }

    fn visit_init_declarator(&mut self, node: Node<'tree>) {
        let Some(value) = node.child_by_field_name("value") else { return };
        if value.kind() == "call_expression" || value.kind() == "new_expression" {
            return; // handled by visit_call / visit_new
        }
        let Some(declarator) = node.child_by_field_name("declarator") else { return };
        let Some(name_node) = cst::declarator_name(declarator) else { return };
        let Some(decl_id) = self.inner_id(node.parent().unwrap_or(node)) else { return };
        let var_type = self
            .index
            .get(&crate::model::AstKey::of(name_node))
            .and_then(|id| self.symbols.data_type_of(id).map(bare_type_name));
        let Some(class_name) = var_type.filter(|t| self.records.class_list.contains_key(t)) else {
            return;
        };

        let Some(enclosing) = self.enclosing_id(node) else { return };
        let is_move = value.kind() == "call_expression"
            && self.text(value).trim_start().starts_with("std::move");
        let sig = if is_move {
            vec![format!("{class_name}&&")]
        } else {
            vec![self.infer(value)]
        };
        let key: FunctionKey = ((Some(class_name), "constructor".into()), sig);
        self.records
            .constructor_calls
            .entry(key)
            .or_default()
            .push((decl_id, enclosing));
    }

    /// Best-effort static class of an object expression, for method-call
    /// keying: resolve through `declaration_map`/`symbol_table`, falling back
    /// to the bare identifier text when the expression is already a
    /// type-like qualifier (`this`, a class name in a qualified call).
    fn static_class_of(&mut self, object: Node<'tree>) -> Option<String> {
        let base = match object.kind() {
            "field_expression" => object.child_by_field_name("field")?,
            _ => object,
        };
        let use_id = self.index.get(&crate::model::AstKey::of(base))?;
        let decl_id = self.declarations.declaration_of(use_id)?;
        self.symbols.data_type_of(decl_id).map(bare_type_name)
    }
}

/// Function-NodeId -> declared return type, flattened from `function_list`/
/// `return_type` for O(1) lookup during return-edge wiring.
fn return_type_index(records: &Records) -> HashMap<NodeId, String> {
    records
        .function_list
        .iter()
        .filter_map(|(key, &id)| records.return_type.get(key).map(|t| (id, t.clone())))
        .collect()
}

/// Call/return wiring (spec §4.3): matches every collected call map against
/// `function_list`, emits call and return edges, resolves virtual dispatch,
/// constructor-overload matching, and indirect calls through
/// `function_pointer_assignments`. `successor_of` is `next_index` precomputed
/// for every statement in `node_list` (cfg::mod builds it once and shares it
/// here so void-returning calls can target "the statement after the call").
/// `synthetic_to_function` reverses `records.implicit_return_map`: when a
/// void callee's return target resolves to a synthetic implicit-return id
/// (the call site is itself the tail statement of another void function),
/// the return is folded into that outer function's `return_statement_map`
/// instead of becoming a graph edge into a synthetic node (spec I-style
/// invariant: synthetics never surface as edge endpoints).
#[allow(clippy::too_many_arguments)]
pub fn wire(
    graph: &mut Graph,
    records: &mut Records,
    successor_of: &HashMap<NodeId, NodeId>,
    synthetic_to_function: &HashMap<NodeId, NodeId>,
    id_to_node: &HashMap<NodeId, Node>,
    lang: Lang,
    index: &dyn Index,
    next_call_id: &mut CallId,
) {
    let return_types = return_type_index(records);
    let function_calls = records.function_calls.clone();
    wire_direct(
        graph,
        records,
        &return_types,
        successor_of,
        synthetic_to_function,
        &function_calls,
        next_call_id,
        CfgEdgeKind::FunctionCall,
        CfgEdgeKind::FunctionReturn,
    );
    wire_methods(graph, records, &return_types, successor_of, synthetic_to_function, next_call_id);
    wire_constructors(graph, records, &return_types, successor_of, synthetic_to_function, next_call_id);
    wire_destructors(
        graph,
        records,
        &return_types,
        successor_of,
        synthetic_to_function,
        id_to_node,
        lang,
        index,
        next_call_id,
    );
    wire_indirect(graph, records, &return_types, successor_of, synthetic_to_function, next_call_id);
}

fn is_virtual_method(records: &Records, name: &str, candidates: &[(FunctionKey, NodeId)]) -> bool {
    let same_name_definers = candidates
        .iter()
        .filter(|(k, _)| k.0.1 == name)
        .count();
    if same_name_definers > 1 {
        return true;
    }
    candidates
        .iter()
        .any(|(_, id)| records.virtual_functions.get(id).is_some_and(|v| v.is_virtual || v.is_pure_virtual))
}

/// spec §4.3 "Return target selection": a void-returning callee (including
/// every implicit-fall-off function/constructor/destructor) targets the
/// statement after the call site; a non-void explicit return targets the
/// call site itself so the value can be used in the enclosing expression.
fn return_edges_for(
    graph: &mut Graph,
    records: &mut Records,
    return_types: &HashMap<NodeId, String>,
    successor_of: &HashMap<NodeId, NodeId>,
    synthetic_to_function: &HashMap<NodeId, NodeId>,
    callee: NodeId,
    call_site_inner: NodeId,
    enclosing: NodeId,
    return_kind: CfgEdgeKind,
) {
    let Some(returns) = records.return_statement_map.get(&callee).cloned() else { return };
    let is_void = return_types.get(&callee).is_none_or(|t| t == "void");
    let target = if is_void {
        successor_of.get(&enclosing).copied().unwrap_or(crate::model::EXIT_ID)
    } else {
        call_site_inner
    };
    for ret in returns {
        if let Some(&owner) = synthetic_to_function.get(&target) {
            let entry = records.return_statement_map.entry(owner).or_default();
            if !entry.contains(&ret) {
                entry.push(ret);
            }
        } else {
            graph.add_edge(ret, target, return_kind.clone());
        }
    }
}

fn wire_direct(
    graph: &mut Graph,
    records: &mut Records,
    return_types: &HashMap<NodeId, String>,
    successor_of: &HashMap<NodeId, NodeId>,
    synthetic_to_function: &HashMap<NodeId, NodeId>,
    calls: &HashMap<FunctionKey, Vec<CallSite>>,
    next_call_id: &mut CallId,
    call_kind: fn(CallId) -> CfgEdgeKind,
    return_kind: CfgEdgeKind,
) {
    for (key, sites) in calls {
        let Some(&callee) = records.function_list.get(key) else { continue };
        for &(inner, enclosing) in sites {
            let cid = *next_call_id;
            *next_call_id += 1;
            graph.add_edge(enclosing, callee, call_kind(cid));
            return_edges_for(
                graph,
                records,
                return_types,
                successor_of,
                synthetic_to_function,
                callee,
                inner,
                enclosing,
                return_kind.clone(),
            );
        }
    }
}

fn wire_methods(
    graph: &mut Graph,
    records: &mut Records,
    return_types: &HashMap<NodeId, String>,
    successor_of: &HashMap<NodeId, NodeId>,
    synthetic_to_function: &HashMap<NodeId, NodeId>,
    next_call_id: &mut CallId,
) {
    let definers: Vec<(FunctionKey, NodeId)> = records
        .function_list
        .iter()
        .filter(|((class, _), _)| class.is_some())
        .map(|(k, v)| (k.clone(), *v))
        .collect();
    let method_calls = records.method_calls.clone();

    for (key, sites) in &method_calls {
        let (class, name) = &key.0;
        let candidates: Vec<(FunctionKey, NodeId)> = match class {
            Some(c) => definers
                .iter()
                .filter(|((k, n), _)| k.as_deref() == Some(c.as_str()) && n == name)
                .cloned()
                .collect(),
            None => definers.iter().filter(|((_, n), _)| n == name).cloned().collect(),
        };
        if candidates.is_empty() {
            continue;
        }
        let same_name_all: Vec<(FunctionKey, NodeId)> =
            definers.iter().filter(|((_, n), _)| n == name).cloned().collect();
        let virtual_dispatch = is_virtual_method(records, name, &same_name_all);

        for &(inner, enclosing) in sites {
            let cid = *next_call_id;
            *next_call_id += 1;
            let targets: Vec<NodeId> = if virtual_dispatch {
                same_name_all.iter().map(|(_, id)| *id).collect()
            } else {
                candidates.iter().map(|(_, id)| *id).collect()
            };
            for callee in targets {
                let kind = if virtual_dispatch {
                    CfgEdgeKind::VirtualCall(cid)
                } else {
                    CfgEdgeKind::MethodCall(cid)
                };
                graph.add_edge(enclosing, callee, kind);
                return_edges_for(
                    graph,
                    records,
                    return_types,
                    successor_of,
                    synthetic_to_function,
                    callee,
                    inner,
                    enclosing,
                    CfgEdgeKind::MethodReturn,
                );
            }
        }
    }
}

fn wire_constructors(
    graph: &mut Graph,
    records: &mut Records,
    return_types: &HashMap<NodeId, String>,
    successor_of: &HashMap<NodeId, NodeId>,
    synthetic_to_function: &HashMap<NodeId, NodeId>,
    next_call_id: &mut CallId,
) {
    let constructor_calls = records.constructor_calls.clone();
    for (key, sites) in &constructor_calls {
        let (class, _) = &key.0;
        let Some(class_name) = class else { continue };
        let overloads: Vec<(FunctionKey, NodeId)> = records
            .function_list
            .iter()
            .filter(|((c, n), _)| c.as_deref() == Some(class_name.as_str()) && n == class_name)
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        let supplied = &key.1;
        let target = overloads
            .iter()
            .find(|(k, _)| types::signatures_compatible(&k.1, supplied))
            .or_else(|| overloads.first())
            .map(|(_, id)| *id);
        let Some(callee) = target else { continue };
        for &(inner, enclosing) in sites {
            let cid = *next_call_id;
            *next_call_id += 1;
            graph.add_edge(enclosing, callee, CfgEdgeKind::ConstructorCall(cid));
            return_edges_for(
                graph,
                records,
                return_types,
                successor_of,
                synthetic_to_function,
                callee,
                inner,
                enclosing,
                CfgEdgeKind::ConstructorReturn,
            );
        }
    }
}

/// Wires each `delete` site's destructor call through the full base chain
/// (spec §4.3 "Destructor chain"): `~C` first, then every base with a
/// registered destructor in `extends` discovery order, linked body-to-body
/// by `destructor_chain` edges. Only the final link in the chain returns to
/// the caller; intermediate links hand off directly (no return wiring).
#[allow(clippy::too_many_arguments)]
fn wire_destructors(
    graph: &mut Graph,
    records: &mut Records,
    return_types: &HashMap<NodeId, String>,
    successor_of: &HashMap<NodeId, NodeId>,
    synthetic_to_function: &HashMap<NodeId, NodeId>,
    id_to_node: &HashMap<NodeId, Node>,
    lang: Lang,
    index: &dyn Index,
    next_call_id: &mut CallId,
) {
    let destructor_calls = records.destructor_calls.clone();
    for (key, sites) in &destructor_calls {
        let (class, _) = &key.0;
        let Some(class_name) = class else { continue };
        let chain = raii::destructor_chain_for(class_name, records);
        let Some(&callee) = chain.first() else { continue };
        for &(_inner, enclosing) in sites {
            let cid = *next_call_id;
            *next_call_id += 1;
            graph.add_edge(enclosing, callee, CfgEdgeKind::DestructorCall(cid));

            for pair in chain.windows(2) {
                if let Some(last_stmt) = raii::dtor_last_statement(pair[0], id_to_node, lang, index) {
                    graph.add_edge(last_stmt, pair[1], CfgEdgeKind::DestructorChain(None));
                }
            }

            let last = *chain.last().unwrap();
            let Some(last_stmt) = raii::dtor_last_statement(last, id_to_node, lang, index) else { continue };
            let is_void = return_types.get(&last).is_none_or(|t| t == "void");
            let target = if is_void {
                successor_of.get(&enclosing).copied().unwrap_or(crate::model::EXIT_ID)
            } else {
                enclosing
            };
            if let Some(&owner) = synthetic_to_function.get(&target) {
                let entry = records.return_statement_map.entry(owner).or_default();
                if !entry.contains(&last_stmt) {
                    entry.push(last_stmt);
                }
            } else {
                graph.add_edge(last_stmt, target, CfgEdgeKind::DestructorReturn);
            }
        }
    }
}

fn wire_indirect(
    graph: &mut Graph,
    records: &mut Records,
    return_types: &HashMap<NodeId, String>,
    successor_of: &HashMap<NodeId, NodeId>,
    synthetic_to_function: &HashMap<NodeId, NodeId>,
    next_call_id: &mut CallId,
) {
    let indirect_calls = records.indirect_calls.clone();
    for (key, sites) in &indirect_calls {
        let (_, pointer_var) = &key.0;
        let Some(candidates) = records.function_pointer_assignments.get(pointer_var).cloned() else { continue };
        for fn_name in candidates {
            let fn_key: FunctionKey = ((None, fn_name.clone()), key.1.clone());
            let Some(&callee) = records.function_list.get(&fn_key) else { continue };
            for &(inner, enclosing) in sites {
                let cid = *next_call_id;
                *next_call_id += 1;
                graph.add_edge(enclosing, callee, CfgEdgeKind::IndirectCall(cid));
                return_edges_for(
                    graph,
                    records,
                    return_types,
                    successor_of,
                    synthetic_to_function,
                    callee,
                    inner,
                    enclosing,
                    CfgEdgeKind::IndirectReturn,
                );
            }
        }
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
            map.entry(crate::model::AstKey::of(n)).or_insert_with(|| {
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
    fn regular_call_is_recorded_under_function_calls() {
        let src = "int add(int a,int b){return a+b;} int main(){ return add(1,2); }";
        let tree = parse_c(src);
        let root = tree.root_node();
        let index = index_everything(root);
        let decls = MapDeclarationMap::default();
        let symbols = MapSymbolTable::default();
        let mut records = Records::default();
        let mut sink = NullSink;
        collect(Lang::C, root, src.as_bytes(), &index, &symbols, &decls, &mut records, &mut sink);
        let key: FunctionKey = ((None, "add".into()), vec!["int".into(), "int".into()]);
        assert_eq!(records.function_calls.get(&key).map(|v| v.len()), Some(1));
    }
}

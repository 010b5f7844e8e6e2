//! Interprocedural DFG layer (spec §4.8). C++ gets the full layer; C gets
//! only argument/return threading, matching `original_source/CFG_c.py`'s
//! `dfg_c` driver, which never builds a modification-to-use edge for C
//! (`SPEC_FULL.md` §9 / `DESIGN.md`). Grounded in
//! `original_source/src/comex/codeviews/SDFG/SDFG_cpp.py`'s
//! `add_argument_parameter_edges`, `add_function_return_edges`,
//! `analyze_pointer_modifications`, `find_modification_sites`, and
//! `add_interprocedural_edges` (lines ~1022-2966).

use std::collections::{HashMap, HashSet, VecDeque};

use tree_sitter::Node;

use crate::classify::Lang;
use crate::cst;
use crate::graph::Graph;
use crate::model::{AstKey, CfgEdgeKind, DfgDataflowType, DfgEdge, DfgEdgeAttrs, Interprocedural, NodeId};

use super::facts::Facts;

fn is_call_edge(kind: &CfgEdgeKind) -> bool {
    matches!(
        kind,
        CfgEdgeKind::FunctionCall(_) | CfgEdgeKind::MethodCall(_) | CfgEdgeKind::VirtualCall(_) | CfgEdgeKind::IndirectCall(_)
    )
}

fn is_return_edge(kind: &CfgEdgeKind) -> bool {
    matches!(kind, CfgEdgeKind::FunctionReturn | CfgEdgeKind::MethodReturn)
}

struct ParamInfo {
    name: String,
    index: usize,
    is_ptr_or_ref: bool,
}

fn function_parameters(func_def: Node, code: &[u8]) -> Vec<ParamInfo> {
    let Some(declarator) = func_def.child_by_field_name("declarator") else {
        return Vec::new();
    };
    let func_declarator = cst::innermost_function_declarator(declarator).unwrap_or(declarator);
    let Some(params_node) = func_declarator.child_by_field_name("parameters") else {
        return Vec::new();
    };
    let mut cursor = params_node.walk();
    params_node
        .named_children(&mut cursor)
        .filter(|p| matches!(p.kind(), "parameter_declaration" | "optional_parameter_declaration"))
        .enumerate()
        .filter_map(|(index, p)| {
            let decl = p.child_by_field_name("declarator")?;
            let is_ptr_or_ref = matches!(decl.kind(), "pointer_declarator" | "reference_declarator" | "array_declarator");
            let name_node = cst::declarator_name(decl)?;
            Some(ParamInfo {
                name: cst::owned_text(name_node, code),
                index,
                is_ptr_or_ref,
            })
        })
        .collect()
}

/// §4.8 "Argument -> parameter": one edge per pointer/reference/array
/// parameter on every call edge, regardless of language.
fn argument_to_parameter_edges(graph: &Graph, id_to_node: &HashMap<NodeId, Node>, code: &[u8], edges: &mut Vec<DfgEdge>) {
    for edge in graph.edges() {
        if !is_call_edge(&edge.kind) {
            continue;
        }
        let Some(&callee) = id_to_node.get(&edge.dst) else { continue };
        if !matches!(callee.kind(), "function_definition" | "constructor_or_destructor_definition") {
            continue;
        }
        for param in function_parameters(callee, code) {
            if !param.is_ptr_or_ref {
                continue;
            }
            edges.push(DfgEdge {
                src: edge.src,
                dst: edge.dst,
                attrs: DfgEdgeAttrs {
                    dataflow_type: DfgDataflowType::ComesFrom,
                    used_def: param.name,
                    color: "#00A3FF",
                    interprocedural: Some(Interprocedural::ArgumentToParameter),
                    argument_index: Some(param.index),
                    object_name: None,
                },
            });
        }
    }
}

/// Heuristic for "the returned expression is used" (spec §4.8): the call
/// site sits inside an initializer, assignment RHS, argument list, a nested
/// return, or a branch condition, walking up to the first statement boundary
/// (`is_return_value_used`).
fn return_value_used(node: Node) -> bool {
    let mut current = node.parent();
    while let Some(p) = current {
        match p.kind() {
            "init_declarator" | "assignment_expression" | "argument_list" | "return_statement" | "if_statement" | "while_statement"
            | "for_statement" | "do_statement" | "switch_statement" => return true,
            "expression_statement" | "compound_statement" => return false,
            _ => {}
        }
        current = p.parent();
    }
    false
}

/// §4.8 "Return -> caller": one edge per `function_return`/`method_return`
/// CFG edge whose value is actually consumed.
fn return_to_caller_edges(graph: &Graph, id_to_node: &HashMap<NodeId, Node>, facts: &Facts, edges: &mut Vec<DfgEdge>) {
    for edge in graph.edges() {
        if !is_return_edge(&edge.kind) {
            continue;
        }
        let Some(&return_stmt) = id_to_node.get(&edge.src) else { continue };
        if return_stmt.kind() != "return_statement" || return_stmt.named_child(0).is_none() {
            continue;
        }
        let call_site_used = id_to_node
            .get(&edge.dst)
            .is_some_and(|&n| return_value_used(n));
        if !call_site_used {
            continue;
        }

        let returned_vars: Vec<String> = facts
            .use_
            .get(&edge.src)
            .into_iter()
            .flat_map(|set| set.iter())
            .map(|f| f.name.to_string())
            .collect();
        if returned_vars.is_empty() {
            continue;
        }
        let initialized_vars: Vec<String> = facts
            .def
            .get(&edge.dst)
            .into_iter()
            .flat_map(|set| set.iter())
            .map(|f| f.name.to_string())
            .collect();

        for init_var in &initialized_vars {
            edges.push(DfgEdge {
                src: edge.src,
                dst: edge.dst,
                attrs: DfgEdgeAttrs {
                    dataflow_type: DfgDataflowType::ComesFrom,
                    used_def: init_var.clone(),
                    color: "#00A3FF",
                    interprocedural: Some(Interprocedural::ReturnToCaller),
                    argument_index: None,
                    object_name: None,
                },
            });
        }
    }
}

struct ModificationSite {
    param_index: usize,
    stmt_id: NodeId,
}

fn assigned_param_name(lhs: Node, code: &[u8]) -> Option<String> {
    match lhs.kind() {
        "pointer_expression" | "subscript_expression" | "field_expression" => lhs
            .child_by_field_name("argument")
            .filter(|a| matches!(a.kind(), "identifier" | "this"))
            .map(|a| cst::owned_text(a, code)),
        "identifier" | "this" => Some(cst::owned_text(lhs, code)),
        _ => None,
    }
}

/// `analyze_pointer_modifications` + `find_modification_sites`: per
/// function, which statements modify a pointer/reference parameter.
fn modification_sites(func_def: Node, lang: Lang, code: &[u8], index: &dyn crate::symbols::Index) -> Vec<ModificationSite> {
    let params = function_parameters(func_def, code);
    let param_index_of: HashMap<&str, usize> = params
        .iter()
        .filter(|p| p.is_ptr_or_ref)
        .map(|p| (p.name.as_str(), p.index))
        .collect();
    if param_index_of.is_empty() {
        return Vec::new();
    }

    let mut out = Vec::new();
    let mut stack = vec![func_def];
    while let Some(n) = stack.pop() {
        let lhs = match n.kind() {
            "assignment_expression" => n.child_by_field_name("left"),
            "update_expression" => n.child_by_field_name("argument"),
            _ => None,
        };
        if let Some(lhs) = lhs {
            if let Some(name) = assigned_param_name(lhs, code) {
                if let Some(&param_index) = param_index_of.get(name.as_str()) {
                    if let Some(stmt) = cst::enclosing_statement(n, lang) {
                        if let Some(stmt_id) = index.get(&AstKey::of(stmt)) {
                            out.push(ModificationSite { param_index, stmt_id });
                        }
                    }
                }
            }
        }
        let mut cursor = n.walk();
        stack.extend(n.children(&mut cursor));
    }
    out
}

fn is_return_kind(kind: &CfgEdgeKind) -> bool {
    matches!(
        kind,
        CfgEdgeKind::FunctionReturn
            | CfgEdgeKind::MethodReturn
            | CfgEdgeKind::ConstructorReturn
            | CfgEdgeKind::BaseConstructorReturn
            | CfgEdgeKind::DestructorReturn
            | CfgEdgeKind::BaseDestructorReturn
            | CfgEdgeKind::IndirectReturn
    )
}

/// A modification site is "killed" if the intraprocedural forward CFG reach
/// from it hits another modification of the same parameter before an exit
/// edge (`add_interprocedural_edges`'s `is_killed` BFS).
fn modification_is_killed(graph: &Graph, same_param_sites: &[NodeId], mod_stmt: NodeId) -> bool {
    let mut visited = HashSet::new();
    let mut queue = VecDeque::from([mod_stmt]);
    while let Some(current) = queue.pop_front() {
        if !visited.insert(current) {
            continue;
        }
        for (succ, kind) in graph.out_edges(current) {
            if visited.contains(&succ) {
                continue;
            }
            if succ != mod_stmt && same_param_sites.contains(&succ) {
                return true;
            }
            if !is_return_kind(kind) {
                queue.push_back(succ);
            }
        }
    }
    false
}

/// Forward CFG search from the call site for uses of `var`, stopping at
/// each node that uses it without also redefining it (`reaching_mods`'s
/// final BFS in `add_interprocedural_edges`).
fn reaching_uses(graph: &Graph, facts: &Facts, call_site: NodeId, var: &str) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut visited = HashSet::new();
    let mut queue = VecDeque::from([call_site]);
    while let Some(current) = queue.pop_front() {
        if !visited.insert(current) {
            continue;
        }
        let mut uses_var = false;
        let mut defines_var = false;
        if current != call_site {
            if let Some(uses) = facts.use_.get(&current) {
                if uses.iter().any(|f| f.name.base() == var) {
                    uses_var = true;
                    out.push(current);
                }
            }
            if let Some(defs) = facts.def.get(&current) {
                defines_var = defs.iter().any(|f| f.name.base() == var);
            }
        }
        if current == call_site || !uses_var || defines_var {
            for succ in graph.successors(current) {
                if !visited.contains(&succ) {
                    queue.push_back(succ);
                }
            }
        }
    }
    out
}

/// Call-site argument info needed to connect modification sites back to the
/// caller: which parameter index receives `&var`/a reference/a plain pointer.
struct PassByRefArg {
    call_site: NodeId,
    arg_index: usize,
    var_name: String,
}

fn collect_pass_by_ref_args(
    graph: &Graph,
    id_to_node: &HashMap<NodeId, Node>,
    code: &[u8],
) -> Vec<PassByRefArg> {
    let mut out = Vec::new();
    for edge in graph.edges() {
        if !is_call_edge(&edge.kind) {
            continue;
        }
        let Some(&call_node) = id_to_node.get(&edge.src) else { continue };
        let Some(call_expr) = cst::bfs_find(call_node, |n| n.kind() == "call_expression", |_| true) else {
            continue;
        };
        let Some(args) = call_expr.child_by_field_name("arguments") else {
            continue;
        };
        let mut cursor = args.walk();
        for (idx, arg) in args.named_children(&mut cursor).enumerate() {
            let var_name = match arg.kind() {
                "pointer_expression" => arg
                    .child_by_field_name("argument")
                    .filter(|a| a.kind() == "identifier")
                    .map(|a| cst::owned_text(a, code)),
                "identifier" => Some(cst::owned_text(arg, code)),
                _ => None,
            };
            if let Some(var_name) = var_name {
                out.push(PassByRefArg {
                    call_site: edge.src,
                    arg_index: idx,
                    var_name,
                });
            }
        }
    }
    out
}

/// §4.8 "Pointer-modification -> later use" — C++ only. Uses CFG out-edges
/// (not name matching) to resolve the actually-dispatched callee(s), so
/// virtual dispatch is respected (spec "Virtual dispatch fidelity").
fn modification_to_use_edges(
    lang: Lang,
    graph: &Graph,
    id_to_node: &HashMap<NodeId, Node>,
    code: &[u8],
    facts: &Facts,
    index: &dyn crate::symbols::Index,
    edges: &mut Vec<DfgEdge>,
) {
    let mut sites_by_func: HashMap<NodeId, Vec<ModificationSite>> = HashMap::new();
    for (&id, &node) in id_to_node {
        if matches!(node.kind(), "function_definition" | "constructor_or_destructor_definition") {
            let sites = modification_sites(node, lang, code, index);
            if !sites.is_empty() {
                sites_by_func.insert(id, sites);
            }
        }
    }
    if sites_by_func.is_empty() {
        return;
    }

    let pass_by_ref_args = collect_pass_by_ref_args(graph, id_to_node, code);

    for arg in &pass_by_ref_args {
        let targets: Vec<NodeId> = graph
            .out_edges(arg.call_site)
            .into_iter()
            .filter(|(_, kind)| is_call_edge(kind))
            .map(|(dst, _)| dst)
            .collect();
        if targets.is_empty() {
            continue;
        }

        for &target in &targets {
            let Some(sites) = sites_by_func.get(&target) else { continue };
            let same_param: Vec<NodeId> = sites
                .iter()
                .filter(|s| s.param_index == arg.arg_index)
                .map(|s| s.stmt_id)
                .collect();
            for site in sites.iter().filter(|s| s.param_index == arg.arg_index) {
                if modification_is_killed(graph, &same_param, site.stmt_id) {
                    continue;
                }
                for use_site in reaching_uses(graph, facts, arg.call_site, &arg.var_name) {
                    edges.push(DfgEdge {
                        src: site.stmt_id,
                        dst: use_site,
                        attrs: DfgEdgeAttrs {
                            dataflow_type: DfgDataflowType::ComesFrom,
                            used_def: arg.var_name.clone(),
                            color: "#00A3FF",
                            interprocedural: Some(Interprocedural::ModificationToUse),
                            argument_index: None,
                            object_name: None,
                        },
                    });
                }
            }
        }
    }
}

/// §4.8 "Lambda invocation": a call argument that is itself a lambda
/// expression, invoked inside the callee through the corresponding
/// parameter name.
fn lambda_invocation_edges(graph: &Graph, id_to_node: &HashMap<NodeId, Node>, code: &[u8], lambda_map: &HashMap<AstKey, NodeId>, edges: &mut Vec<DfgEdge>) {
    for edge in graph.edges() {
        if !is_call_edge(&edge.kind) {
            continue;
        }
        let Some(&call_node) = id_to_node.get(&edge.src) else { continue };
        let Some(&callee) = id_to_node.get(&edge.dst) else { continue };
        if !matches!(callee.kind(), "function_definition" | "constructor_or_destructor_definition") {
            continue;
        }
        let Some(call_expr) = cst::bfs_find(call_node, |n| n.kind() == "call_expression", |_| true) else {
            continue;
        };
        let Some(args) = call_expr.child_by_field_name("arguments") else { continue };
        let params = function_parameters(callee, code);
        let Some(body) = callee.child_by_field_name("body") else { continue };

        let mut cursor = args.walk();
        for (idx, arg) in args.named_children(&mut cursor).enumerate() {
            if arg.kind() != "lambda_expression" {
                continue;
            }
            let Some(&lambda_body) = lambda_map.get(&AstKey::of(arg)) else { continue };
            let Some(param) = params.iter().find(|p| p.index == idx) else { continue };
            let invoked = cst::bfs_find(
                body,
                |n| {
                    n.kind() == "call_expression"
                        && n.child_by_field_name("function")
                            .is_some_and(|f| f.kind() == "identifier" && cst::text_of(f, code) == Some(param.name.as_str()))
                },
                |_| true,
            );
            if invoked.is_some() {
                edges.push(DfgEdge {
                    src: edge.src,
                    dst: lambda_body,
                    attrs: DfgEdgeAttrs {
                        dataflow_type: DfgDataflowType::LambdaCall,
                        used_def: param.name.clone(),
                        color: "#00A3FF",
                        interprocedural: None,
                        argument_index: Some(idx),
                        object_name: None,
                    },
                });
            }
        }
    }
}

/// Builds every interprocedural DFG edge for one translation unit. C gets
/// argument/return threading only; C++ additionally gets pointer-
/// modification-to-use and lambda-invocation edges (spec §9 Open Question,
/// `DESIGN.md`). "Method member access" (spec §4.8's fourth bullet) is not
/// implemented: the reference it is grounded on
/// (`add_method_member_access_edges`) collects candidate field accesses but
/// never calls `add_edge`, so there is no edge behavior to replicate.
#[allow(clippy::too_many_arguments)]
pub fn build(
    lang: Lang,
    graph: &Graph,
    id_to_node: &HashMap<NodeId, Node>,
    code: &[u8],
    facts: &Facts,
    index: &dyn crate::symbols::Index,
    lambda_map: &HashMap<AstKey, NodeId>,
) -> Vec<DfgEdge> {
    let mut edges = Vec::new();
    argument_to_parameter_edges(graph, id_to_node, code, &mut edges);
    return_to_caller_edges(graph, id_to_node, facts, &mut edges);
    if matches!(lang, Lang::Cpp) {
        modification_to_use_edges(lang, graph, id_to_node, code, facts, index, &mut edges);
        lambda_invocation_edges(graph, id_to_node, code, lambda_map, &mut edges);
    }
    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CfgNode;
    use crate::symbols::MapIndex;

    fn node(id: NodeId) -> CfgNode {
        CfgNode {
            id,
            line: id as usize,
            label: String::new(),
            type_tag: "x".into(),
            block_index: 0,
        }
    }

    fn parse_cpp(src: &str) -> tree_sitter::Tree {
        let mut parser = tree_sitter::Parser::new();
        parser.set_language(&tree_sitter_cpp::LANGUAGE.into()).unwrap();
        parser.parse(src, None).unwrap()
    }

    #[test]
    fn argument_to_parameter_targets_pointer_params_only() {
        let src = "void f(int *p, int x) { *p = x; }";
        let tree = parse_cpp(src);
        let root = tree.root_node();
        let func_def = cst::bfs_find(root, |n| n.kind() == "function_definition", |_| true).unwrap();

        let mut graph = Graph::new();
        graph.insert_node(node(1));
        graph.insert_node(node(2));
        graph.add_edge(1, 2, CfgEdgeKind::FunctionCall(0));

        let mut id_to_node = HashMap::new();
        id_to_node.insert(2, func_def);

        let mut edges = Vec::new();
        argument_to_parameter_edges(&graph, &id_to_node, src.as_bytes(), &mut edges);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].attrs.argument_index, Some(0));
    }

    #[test]
    fn return_value_used_detects_initializer_context() {
        let src = "int main(){ int x = f(); }";
        let tree = parse_cpp(src);
        let root = tree.root_node();
        let call = cst::bfs_find(root, |n| n.kind() == "call_expression", |_| true).unwrap();
        assert!(return_value_used(call));
    }

    #[test]
    fn return_value_used_is_false_for_bare_statement() {
        let src = "int main(){ f(); }";
        let tree = parse_cpp(src);
        let root = tree.root_node();
        let call = cst::bfs_find(root, |n| n.kind() == "call_expression", |_| true).unwrap();
        assert!(!return_value_used(call));
    }

    #[test]
    fn modification_sites_finds_pointer_param_assignment() {
        let src = "void f(int *p) { *p = 1; }";
        let tree = parse_cpp(src);
        let root = tree.root_node();
        let func_def = cst::bfs_find(root, |n| n.kind() == "function_definition", |_| true).unwrap();

        let index = MapIndex::default();
        let sites = modification_sites(func_def, Lang::Cpp, src.as_bytes(), &index);
        // No index entries registered, so no sites resolve to a NodeId — this
        // exercises the "no crash on unindexed statements" path.
        assert!(sites.is_empty());
    }
}

//! RDA fact table construction (spec §4.6): walks the whole CST (not just
//! statement-level nodes) looking for the constructs in the spec's DEF/USE
//! table, attributing each fact to the nearest enclosing statement via
//! `cst::enclosing_statement`. Grounded in
//! `original_source/src/comex/codeviews/SDFG/SDFG_c.py`'s `add_entry`/
//! `build_rda_table` (lines 308-727) — the recursive "collect all
//! identifiers/field_expressions/literals inside an expression" behavior is
//! `collect_leaves` below, `add_entry`'s per-construct dispatch is `visit`.

use std::collections::{HashMap, HashSet};

use tree_sitter::Node;

use crate::classify::{self, Lang};
use crate::cst;
use crate::diagnostics::{DiagnosticSink, SkipReason};
use crate::model::{Fact, FactName, NodeId, Scope};
use crate::symbols::{Index, SymbolTable};

/// Per-statement DEF and USE fact sets (spec §3, §4.6). Indexed by the
/// enclosing statement's `NodeId`, matching `rda::solve`'s `def` parameter
/// shape — `use_` is this module's own table, consulted by `dfg::edges`.
#[derive(Debug, Clone, Default)]
pub struct Facts {
    pub def: HashMap<NodeId, HashSet<Fact>>,
    pub use_: HashMap<NodeId, HashSet<Fact>>,
}

const LITERAL_KINDS: &[&str] = &[
    "number_literal",
    "string_literal",
    "char_literal",
    "true",
    "false",
    "null",
    "nullptr",
    "concatenated_string",
];

const INPUT_FUNCTIONS: &[&str] = &["scanf", "fscanf", "sscanf", "gets", "fgets", "getline", "cin", "std::cin"];

struct Ctx<'idx, 'sink, 'a> {
    lang: Lang,
    code: &'a [u8],
    index: &'idx dyn Index,
    symbols: &'idx dyn SymbolTable,
    sink: &'sink mut dyn DiagnosticSink,
    def: HashMap<NodeId, HashSet<Fact>>,
    use_: HashMap<NodeId, HashSet<Fact>>,
}

pub fn collect(
    lang: Lang,
    root: Node,
    code: &[u8],
    index: &dyn Index,
    symbols: &dyn SymbolTable,
    sink: &mut dyn DiagnosticSink,
) -> Facts {
    let mut ctx = Ctx {
        lang,
        code,
        index,
        symbols,
        sink,
        def: HashMap::new(),
        use_: HashMap::new(),
    };
    visit(root, &mut ctx);
    Facts {
        def: ctx.def,
        use_: ctx.use_,
    }
}

fn id_of(node: Node, index: &dyn Index) -> Option<NodeId> {
    index.get(&crate::model::AstKey::of(node))
}

fn stmt_id_for(node: Node, lang: Lang, index: &dyn Index) -> Option<NodeId> {
    if classify::is_statement(lang, node.kind()) {
        return id_of(node, index);
    }
    id_of(cst::enclosing_statement(node, lang)?, index)
}

/// Falls back to the enclosing statement's own scope when the occurrence
/// node itself was not separately indexed (a common caller shape: the index
/// covers statement-level nodes, identifiers inherit their statement's
/// scope).
fn occurrence_scope(node: Node, stmt_id: NodeId, index: &dyn Index, symbols: &dyn SymbolTable) -> Scope {
    id_of(node, index)
        .and_then(|id| symbols.scope_of(id))
        .or_else(|| symbols.scope_of(stmt_id))
        .unwrap_or_else(Scope::global)
}

fn literal_kind(kind: &str) -> bool {
    LITERAL_KINDS.contains(&kind)
}

fn base_text(node: Node, code: &[u8]) -> String {
    simple_name(node, code)
        .map(|n| n.base().to_owned())
        .unwrap_or_else(|| cst::owned_text(node, code))
}

/// Normalizes an expression node directly into a `FactName` when it is one
/// of the "simple" forms the spec's name-resolution rules cover (identifier,
/// `obj.field`/`obj->field`, `*p`, `arr[i]`, qualified name, literal). `None`
/// means the node is compound (a binary/call/cast expression, …) and must be
/// recursed into via `collect_leaves`.
fn simple_name(node: Node, code: &[u8]) -> Option<FactName> {
    match node.kind() {
        "identifier" | "field_identifier" | "this" | "type_identifier" | "destructor_name" => {
            Some(FactName::Var(cst::owned_text(node, code)))
        }
        "qualified_identifier" => {
            let name = node.child_by_field_name("name")?;
            let name_text = cst::owned_text(name, code);
            match node.child_by_field_name("scope") {
                Some(scope) => Some(FactName::Qualified(cst::owned_text(scope, code), name_text)),
                None => Some(FactName::Var(name_text)),
            }
        }
        "field_expression" => {
            let arg = node.child_by_field_name("argument")?;
            let field = node.child_by_field_name("field")?;
            Some(FactName::Field(base_text(arg, code), cst::owned_text(field, code)))
        }
        "pointer_expression" => {
            let arg = node.child_by_field_name("argument")?;
            let op = node
                .child_by_field_name("operator")
                .map(|o| cst::owned_text(o, code));
            match op.as_deref() {
                Some("*") => Some(FactName::Deref(base_text(arg, code))),
                // `&x` — address-of records a use of the operand itself.
                _ => simple_name(arg, code),
            }
        }
        "subscript_expression" => {
            let arg = node.child_by_field_name("argument")?;
            simple_name(arg, code)
        }
        "unary_expression" => {
            let arg = node.child_by_field_name("argument")?;
            simple_name(arg, code)
        }
        k if literal_kind(k) => Some(FactName::Literal(cst::owned_text(node, code))),
        _ => None,
    }
}

/// Recursively collects every simple-form leaf inside `node`, treating each
/// match as atomic (its own children are part of that form, not recursed
/// into separately) — mirrors the reference's "recursively finds all
/// identifiers/field_expressions/literals" helper used across `add_entry`'s
/// branches.
fn collect_leaves<'a>(node: Node<'a>, code: &[u8], out: &mut Vec<(Node<'a>, FactName)>) {
    if let Some(name) = simple_name(node, code) {
        out.push((node, name));
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_leaves(child, code, out);
    }
}

fn add_def(ctx: &mut Ctx, stmt_id: NodeId, name: FactName, scope: Scope, declaration: bool, has_initializer: bool) {
    let fact = Fact {
        declaration,
        has_initializer,
        ..Fact::identifier(name, stmt_id, scope.clone(), scope)
    };
    ctx.def.entry(stmt_id).or_default().insert(fact);
}

fn add_use(ctx: &mut Ctx, stmt_id: NodeId, name: FactName, scope: Scope) {
    let fact = Fact::identifier(name, stmt_id, scope.clone(), scope);
    ctx.use_.entry(stmt_id).or_default().insert(fact);
}

fn record_def_decl(name_node: Node, stmt_id: NodeId, ctx: &mut Ctx, has_initializer: bool) {
    let Some(name) = simple_name(name_node, ctx.code) else {
        return;
    };
    let scope = occurrence_scope(name_node, stmt_id, ctx.index, ctx.symbols);
    add_def(ctx, stmt_id, name, scope, true, has_initializer);
}

fn record_expr_uses(expr: Node, stmt_id: NodeId, ctx: &mut Ctx) {
    if let Some(name) = simple_name(expr, ctx.code) {
        let scope = occurrence_scope(expr, stmt_id, ctx.index, ctx.symbols);
        add_use(ctx, stmt_id, name, scope);
        return;
    }
    let mut leaves = Vec::new();
    collect_leaves(expr, ctx.code, &mut leaves);
    for (leaf, name) in leaves {
        let scope = occurrence_scope(leaf, stmt_id, ctx.index, ctx.symbols);
        add_use(ctx, stmt_id, name, scope);
    }
}

fn visit(node: Node, ctx: &mut Ctx) {
    match node.kind() {
        "init_declarator" => handle_init_declarator(node, ctx),
        "declaration" | "field_declaration" => handle_plain_declaration(node, ctx),
        "assignment_expression" => handle_assignment(node, ctx),
        "update_expression" => handle_update(node, ctx),
        "call_expression" => handle_call(node, ctx),
        "return_statement" => handle_return(node, ctx),
        "if_statement" | "while_statement" | "switch_statement" | "for_statement" | "do_statement" => {
            handle_condition(node, ctx)
        }
        "for_range_loop" => handle_for_range(node, ctx),
        "conditional_expression" => handle_conditional(node, ctx),
        "throw_statement" => handle_throw(node, ctx),
        "catch_clause" => handle_catch(node, ctx),
        "function_definition" | "constructor_or_destructor_definition" => handle_function_def(node, ctx),
        "lambda_expression" => handle_lambda(node, ctx),
        _ => {}
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        visit(child, ctx);
    }
}

fn handle_init_declarator(node: Node, ctx: &mut Ctx) {
    let Some(stmt_id) = stmt_id_for(node, ctx.lang, ctx.index) else {
        ctx.sink.skip(SkipReason::MissingIndex, node.kind(), None);
        return;
    };
    let Some(declarator) = node.child_by_field_name("declarator") else {
        return;
    };
    if let Some(name_node) = cst::declarator_name(declarator) {
        record_def_decl(name_node, stmt_id, ctx, true);
    }
    if let Some(value) = node.child_by_field_name("value") {
        record_expr_uses(value, stmt_id, ctx);
    }
}

fn handle_plain_declaration(node: Node, ctx: &mut Ctx) {
    let mut cursor = node.walk();
    if node.children(&mut cursor).any(|c| c.kind() == "init_declarator") {
        return; // handled by `init_declarator` itself.
    }
    let Some(stmt_id) = stmt_id_for(node, ctx.lang, ctx.index) else {
        return;
    };
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "identifier" | "field_identifier" => record_def_decl(child, stmt_id, ctx, false),
            "pointer_declarator" | "array_declarator" | "reference_declarator" => {
                if let Some(name_node) = cst::declarator_name(child) {
                    record_def_decl(name_node, stmt_id, ctx, false);
                }
            }
            _ => {}
        }
    }
}

fn handle_assignment(node: Node, ctx: &mut Ctx) {
    let Some(stmt_id) = stmt_id_for(node, ctx.lang, ctx.index) else {
        return;
    };
    let (Some(left), Some(right)) = (node.child_by_field_name("left"), node.child_by_field_name("right")) else {
        return;
    };
    let Some(left_name) = simple_name(left, ctx.code) else {
        return;
    };
    let op = node
        .child_by_field_name("operator")
        .map(|o| cst::owned_text(o, ctx.code))
        .unwrap_or_else(|| "=".to_owned());
    let scope = occurrence_scope(left, stmt_id, ctx.index, ctx.symbols);
    if op != "=" {
        add_use(ctx, stmt_id, left_name.clone(), scope.clone());
    }
    add_def(ctx, stmt_id, left_name, scope, false, false);
    record_expr_uses(right, stmt_id, ctx);
}

fn handle_update(node: Node, ctx: &mut Ctx) {
    let Some(stmt_id) = stmt_id_for(node, ctx.lang, ctx.index) else {
        return;
    };
    let Some(arg) = node.child_by_field_name("argument") else {
        return;
    };
    let Some(name) = simple_name(arg, ctx.code) else {
        return;
    };
    let scope = occurrence_scope(arg, stmt_id, ctx.index, ctx.symbols);
    add_use(ctx, stmt_id, name.clone(), scope.clone());
    add_def(ctx, stmt_id, name, scope, false, false);
}

fn callee_text(function: Node, code: &[u8]) -> String {
    match function.kind() {
        "field_expression" => function
            .child_by_field_name("field")
            .map(|f| cst::owned_text(f, code))
            .unwrap_or_default(),
        "qualified_identifier" => function
            .child_by_field_name("name")
            .map(|f| cst::owned_text(f, code))
            .unwrap_or_default(),
        _ => cst::owned_text(function, code),
    }
}

fn handle_call(node: Node, ctx: &mut Ctx) {
    let Some(stmt_id) = stmt_id_for(node, ctx.lang, ctx.index) else {
        return;
    };
    let Some(function) = node.child_by_field_name("function") else {
        return;
    };
    let callee = callee_text(function, ctx.code);
    let is_input = INPUT_FUNCTIONS.contains(&callee.as_str())
        || (ctx.lang == Lang::Cpp && (callee.contains("cin") || callee.contains("scanf")));
    let is_variadic = callee == "va_start" || callee == "va_arg";

    if function.kind() == "field_expression" {
        if let Some(obj) = function.child_by_field_name("argument") {
            record_expr_uses(obj, stmt_id, ctx);
        }
    }

    let Some(args) = node.child_by_field_name("arguments") else {
        return;
    };
    let mut cursor = args.walk();
    for (i, arg) in args.named_children(&mut cursor).enumerate() {
        if is_variadic && i == 0 {
            if let Some(name) = simple_name(arg, ctx.code) {
                let scope = occurrence_scope(arg, stmt_id, ctx.index, ctx.symbols);
                if callee == "va_start" {
                    add_def(ctx, stmt_id, name, scope, false, true);
                } else {
                    add_def(ctx, stmt_id, name.clone(), scope.clone(), false, false);
                    add_use(ctx, stmt_id, name, scope);
                }
                continue;
            }
        }
        if is_input {
            if let Some(inner) = address_of_operand(arg) {
                if let Some(name) = simple_name(inner, ctx.code) {
                    let scope = occurrence_scope(inner, stmt_id, ctx.index, ctx.symbols);
                    add_def(ctx, stmt_id, name, scope, false, false);
                    continue;
                }
            }
        }
        record_expr_uses(arg, stmt_id, ctx);
    }
}

/// `&var` — returns the operand of an address-of `pointer_expression`.
fn address_of_operand(node: Node) -> Option<Node> {
    if node.kind() != "pointer_expression" {
        return None;
    }
    let op = node.child_by_field_name("operator")?;
    if op.kind() != "&" {
        return None;
    }
    node.child_by_field_name("argument")
}

fn handle_return(node: Node, ctx: &mut Ctx) {
    let Some(stmt_id) = stmt_id_for(node, ctx.lang, ctx.index) else {
        return;
    };
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        record_expr_uses(child, stmt_id, ctx);
    }
}

fn handle_condition(node: Node, ctx: &mut Ctx) {
    let Some(stmt_id) = stmt_id_for(node, ctx.lang, ctx.index) else {
        return;
    };
    if let Some(cond) = node.child_by_field_name("condition") {
        record_expr_uses(cond, stmt_id, ctx);
    }
}

fn handle_for_range(node: Node, ctx: &mut Ctx) {
    let Some(stmt_id) = stmt_id_for(node, ctx.lang, ctx.index) else {
        return;
    };
    if let Some(declarator) = node.child_by_field_name("declarator") {
        let name_node = cst::declarator_name(declarator).unwrap_or(declarator);
        record_def_decl(name_node, stmt_id, ctx, true);
    }
    if let Some(right) = node.child_by_field_name("right") {
        record_expr_uses(right, stmt_id, ctx);
    }
}

fn handle_conditional(node: Node, ctx: &mut Ctx) {
    let Some(stmt_id) = stmt_id_for(node, ctx.lang, ctx.index) else {
        return;
    };
    for field in ["condition", "consequence", "alternative"] {
        if let Some(part) = node.child_by_field_name(field) {
            record_expr_uses(part, stmt_id, ctx);
        }
    }
}

fn handle_throw(node: Node, ctx: &mut Ctx) {
    let Some(stmt_id) = stmt_id_for(node, ctx.lang, ctx.index) else {
        return;
    };
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        record_expr_uses(child, stmt_id, ctx);
    }
}

fn handle_catch(node: Node, ctx: &mut Ctx) {
    let Some(stmt_id) = stmt_id_for(node, ctx.lang, ctx.index) else {
        return;
    };
    let Some(params) = node.child_by_field_name("parameters") else {
        return;
    };
    let mut cursor = params.walk();
    for p in params.named_children(&mut cursor) {
        if p.kind() == "parameter_declaration" {
            if let Some(decl) = p.child_by_field_name("declarator") {
                if let Some(name_node) = cst::declarator_name(decl) {
                    record_def_decl(name_node, stmt_id, ctx, true);
                }
            }
        }
    }
}

fn handle_function_def(node: Node, ctx: &mut Ctx) {
    let Some(stmt_id) = stmt_id_for(node, ctx.lang, ctx.index) else {
        return;
    };
    let Some(declarator) = node.child_by_field_name("declarator") else {
        return;
    };
    let func_declarator = cst::innermost_function_declarator(declarator).unwrap_or(declarator);
    if let Some(name_node) = cst::declarator_name(func_declarator) {
        record_def_decl(name_node, stmt_id, ctx, true);
    }
    let Some(params) = func_declarator.child_by_field_name("parameters") else {
        return;
    };
    let mut cursor = params.walk();
    for p in params.named_children(&mut cursor) {
        if matches!(p.kind(), "parameter_declaration" | "optional_parameter_declaration") {
            if let Some(decl) = p.child_by_field_name("declarator") {
                if let Some(name_node) = cst::declarator_name(decl) {
                    record_def_decl(name_node, stmt_id, ctx, true);
                }
            }
        }
    }
}

fn handle_lambda(node: Node, ctx: &mut Ctx) {
    let Some(stmt_id) = stmt_id_for(node, ctx.lang, ctx.index) else {
        return;
    };
    let Some(captures) = node.child_by_field_name("captures") else {
        return;
    };
    let mut cursor = captures.walk();
    for c in captures.named_children(&mut cursor) {
        record_expr_uses(c, stmt_id, ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::MapSymbolTable;

    fn parse_c(src: &str) -> tree_sitter::Tree {
        let mut parser = tree_sitter::Parser::new();
        parser.set_language(&tree_sitter_c::LANGUAGE.into()).unwrap();
        parser.parse(src, None).unwrap()
    }

    /// Assigns sequential ids to every node in source order, so tests don't
    /// need to hand-build an index for each fixture.
    fn index_everything(root: Node) -> crate::symbols::MapIndex {
        let mut map = std::collections::HashMap::new();
        let mut next = 1i64;
        let mut stack = vec![root];
        while let Some(n) = stack.pop() {
            map.insert(crate::model::AstKey::of(n), next);
            next += 1;
            let mut cursor = n.walk();
            stack.extend(n.children(&mut cursor));
        }
        crate::symbols::MapIndex(map)
    }

    #[test]
    fn assignment_records_def_and_rhs_uses() {
        let src = "int main(){ int x; int y; x = y + 1; }";
        let tree = parse_c(src);
        let root = tree.root_node();
        let index = index_everything(root);
        let symbols = MapSymbolTable::default();
        let mut sink = crate::diagnostics::NullSink;
        let facts = collect(Lang::C, root, src.as_bytes(), &index, &symbols, &mut sink);

        let has_def_x = facts
            .def
            .values()
            .any(|set| set.iter().any(|f| matches!(&f.name, FactName::Var(v) if v == "x")));
        let has_use_y = facts
            .use_
            .values()
            .any(|set| set.iter().any(|f| matches!(&f.name, FactName::Var(v) if v == "y")));
        assert!(has_def_x);
        assert!(has_use_y);
    }

    #[test]
    fn compound_assignment_is_also_a_use() {
        let src = "int main(){ int x; x += 1; }";
        let tree = parse_c(src);
        let root = tree.root_node();
        let index = index_everything(root);
        let symbols = MapSymbolTable::default();
        let mut sink = crate::diagnostics::NullSink;
        let facts = collect(Lang::C, root, src.as_bytes(), &index, &symbols, &mut sink);

        let stmt_with_use = facts
            .use_
            .values()
            .any(|set| set.iter().any(|f| matches!(&f.name, FactName::Var(v) if v == "x")));
        assert!(stmt_with_use);
    }

    #[test]
    fn field_expression_normalizes_to_object_and_field() {
        let src = "int main(){ obj.field = 1; }";
        let tree = parse_c(src);
        let root = tree.root_node();
        let index = index_everything(root);
        let symbols = MapSymbolTable::default();
        let mut sink = crate::diagnostics::NullSink;
        let facts = collect(Lang::C, root, src.as_bytes(), &index, &symbols, &mut sink);

        let has_field_def = facts.def.values().any(|set| {
            set.iter()
                .any(|f| matches!(&f.name, FactName::Field(o, fld) if o == "obj" && fld == "field"))
        });
        assert!(has_field_def);
    }

    #[test]
    fn literal_argument_is_a_use_not_a_def() {
        let src = "int main(){ foo(42); }";
        let tree = parse_c(src);
        let root = tree.root_node();
        let index = index_everything(root);
        let symbols = MapSymbolTable::default();
        let mut sink = crate::diagnostics::NullSink;
        let facts = collect(Lang::C, root, src.as_bytes(), &index, &symbols, &mut sink);

        let has_literal_use = facts
            .use_
            .values()
            .any(|set| set.iter().any(|f| f.name.is_literal()));
        assert!(has_literal_use);
        assert!(facts.def.values().all(|set| !set.iter().any(|f| f.name.is_literal())));
    }
}

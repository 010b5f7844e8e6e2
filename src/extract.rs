//! Statement extractor (spec §2 component 2, §4.1). Picks statement-level
//! nodes out of the CST, producing `CfgNode` tuples pre-block and the
//! `Records` sidecar (function/class lists, label/lambda/switch-child maps).
//! One pass, C and C++ share the walk; per-language label/record rules
//! follow `original_source/src/comex/utils/{c,cpp}_nodes.py::get_nodes`.

use std::collections::HashMap;

use tree_sitter::Node;

use crate::classify::{self, Kind, Lang, StmtClass};
use crate::cst;
use crate::diagnostics::{DiagnosticSink, SkipReason};
use crate::model::{AstKey, CfgNode, FunctionKey, NodeId, Records, VirtualInfo};
use crate::symbols::Index;

pub struct Extraction<'tree> {
    pub node_list: HashMap<AstKey, Node<'tree>>,
    pub graph_nodes: Vec<CfgNode>,
    pub records: Records,
}

struct Ctx<'idx, 'sink, 'tree> {
    lang: Lang,
    code: &'tree [u8],
    index: &'idx dyn Index,
    sink: &'sink mut dyn DiagnosticSink,
    node_list: HashMap<AstKey, Node<'tree>>,
    graph_nodes: Vec<CfgNode>,
    records: Records,
}

pub fn extract<'tree>(
    lang: Lang,
    root: Node<'tree>,
    code: &'tree [u8],
    index: &dyn Index,
    sink: &mut dyn DiagnosticSink,
) -> Extraction<'tree> {
    let mut ctx = Ctx {
        lang,
        code,
        index,
        sink,
        node_list: HashMap::new(),
        graph_nodes: Vec::new(),
        records: Records::default(),
    };
    ctx.walk(root);
    Extraction {
        node_list: ctx.node_list,
        graph_nodes: ctx.graph_nodes,
        records: ctx.records,
    }
}

impl<'idx, 'sink, 'tree> Ctx<'idx, 'sink, 'tree> {
    fn id_of(&mut self, node: Node<'tree>) -> Option<NodeId> {
        let id = self.index.get(&AstKey::of(node));
        if id.is_none() {
            self.sink
                .skip(SkipReason::MissingIndex, node.kind(), None);
        }
        id
    }

    fn text(&self, node: Node<'tree>) -> String {
        cst::owned_text(node, self.code)
    }

    fn push(&mut self, id: NodeId, node: Node<'tree>, label: String, type_tag: &str) {
        self.graph_nodes.push(CfgNode {
            id,
            line: node.start_position().row,
            label,
            type_tag: type_tag.to_owned(),
            block_index: 0,
        });
    }

    fn walk(&mut self, node: Node<'tree>) {
        self.visit(node);
        let mut cursor = node.walk();
        let children: Vec<Node<'tree>> = node.children(&mut cursor).collect();
        for child in children {
            self.walk(child);
        }
    }

    fn visit(&mut self, node: Node<'tree>) {
        // do-while condition: its own CfgNode labeled `while(...)` (spec §4.1).
        if node.kind() == "parenthesized_expression"
            && node.parent().is_some_and(|p| p.kind() == "do_statement")
        {
            let Some(id) = self.id_of(node) else { return };
            self.node_list.insert(AstKey::of(node), node);
            let label = format!("while{}", self.text(node));
            self.push(id, node, label, "while");
            return;
        }

        if self.lang == Lang::Cpp && node.kind() == "catch_clause" {
            let Some(id) = self.id_of(node) else { return };
            self.node_list.insert(AstKey::of(node), node);
            let param = cst::first_child_of_kind(node, &["parameter_declaration"]);
            let label = match param {
                Some(p) => format!("catch ({})", self.text(p)),
                None => "catch (...)".to_owned(),
            };
            self.push(id, node, label, "catch");
            return;
        }

        let class = classify::classify(self.lang, node.kind());
        if !class.contains(StmtClass::NODE_LIST) {
            return;
        }

        if class.contains(StmtClass::INNER_NODE) {
            if let Some(parent) = node.parent() {
                if classify::classify(self.lang, parent.kind()).contains(StmtClass::OUTER_NODE) {
                    let is_body = parent.child_by_field_name("body") == Some(node);
                    if !is_body {
                        return;
                    }
                    // fallthrough: body of a for-loop processes like any statement
                }
            }
            if let Some(switch_child) = cst::return_switch_child(node, self.lang) {
                if let (Some(cur), Some(child)) =
                    (self.id_of(node), self.id_of(switch_child))
                {
                    self.records.switch_child_map.insert(cur, child);
                }
                return;
            }
        }

        let Some(id) = self.id_of(node) else { return };
        self.node_list.insert(AstKey::of(node), node);

        let kind = classify::lookup(self.lang, node.kind());
        match kind {
            Kind::FunctionDefinition => self.visit_function(node, id),
            Kind::ConstructorOrDestructorDefinition => self.visit_ctor_dtor(node, id),
            Kind::If => {
                let label = match node.child_by_field_name("condition") {
                    Some(c) => format!("if({})", self.text(c)),
                    None => "if(...)".to_owned(),
                };
                self.push(id, node, label, "if");
            }
            Kind::While => {
                let label = match node.child_by_field_name("condition") {
                    Some(c) => format!("while({})", self.text(c)),
                    None => "while(...)".to_owned(),
                };
                self.push(id, node, label, "while");
            }
            Kind::For => {
                let init = node
                    .child_by_field_name("initializer")
                    .map(|n| self.text(n))
                    .unwrap_or_default();
                let cond = node
                    .child_by_field_name("condition")
                    .map(|n| self.text(n))
                    .unwrap_or_default();
                let update = node
                    .child_by_field_name("update")
                    .map(|n| self.text(n))
                    .unwrap_or_default();
                let label = format!("for({init} {cond}; {update})");
                self.push(id, node, label, "for");
            }
            Kind::ForRange => {
                let declarator = node
                    .child_by_field_name("declarator")
                    .map(|n| self.text(n))
                    .unwrap_or_default();
                let range = node
                    .child_by_field_name("right")
                    .map(|n| self.text(n))
                    .unwrap_or_default();
                let label = format!("for({declarator} : {range})");
                self.push(id, node, label, "for");
            }
            Kind::Do => self.push(id, node, "do".to_owned(), "do"),
            Kind::Switch => {
                let label = match node.child_by_field_name("condition") {
                    Some(c) => format!("switch({})", self.text(c)),
                    None => "switch(...)".to_owned(),
                };
                self.push(id, node, label, "switch");
            }
            Kind::Case => {
                let label = match node.child_by_field_name("value") {
                    Some(v) => format!("case {}:", self.text(v)),
                    None => "default:".to_owned(),
                };
                self.push(id, node, label, "case");
            }
            Kind::LabeledStatement => {
                let label_text = node
                    .child_by_field_name("label")
                    .map(|n| self.text(n));
                if let Some(name) = &label_text {
                    self.records
                        .label_statement_map
                        .insert(name.clone(), AstKey::of(node));
                }
                let label = match label_text {
                    Some(name) => format!("{name}:"),
                    None => "label:".to_owned(),
                };
                self.push(id, node, label, "label");
            }
            Kind::Return => {
                let label = if cst::has_inner_definition(node, self.lang) {
                    "return".to_owned()
                } else {
                    self.text(node)
                };
                self.push(id, node, label, "return");
            }
            Kind::Break => self.push(id, node, "break;".to_owned(), "break"),
            Kind::Continue => self.push(id, node, "continue;".to_owned(), "continue"),
            Kind::Goto => {
                let label = match node.child_by_field_name("label") {
                    Some(target) => format!("goto {};", self.text(target)),
                    None => "goto;".to_owned(),
                };
                self.push(id, node, label, "goto");
            }
            Kind::TryStatement => self.push(id, node, "try".to_owned(), "try"),
            Kind::ThrowStatement => {
                let label = self.text(node);
                self.push(id, node, label, "throw");
            }
            Kind::ClassSpecifier | Kind::StructSpecifier => self.visit_class(node, id, kind),
            Kind::NamespaceDefinition => {
                let name = cst::first_child_of_kind(node, &["identifier", "namespace_identifier"])
                    .map(|n| self.text(n));
                let label = match name {
                    Some(n) => format!("namespace {n}"),
                    None => "anonymous namespace".to_owned(),
                };
                self.push(id, node, label, "namespace_definition");
            }
            Kind::LambdaExpression => {
                let raw = self.text(node);
                let label = if let Some(open) = raw.find('{') {
                    let close = raw.rfind('}').unwrap_or(raw.len());
                    format!("{}{}", &raw[..open], &raw[close.min(raw.len())..])
                } else {
                    raw
                };
                self.push(id, node, label, "lambda_expression");
            }
            Kind::Declaration | Kind::ExpressionStatement => {
                let label = if self.lang == Lang::Cpp
                    && cst::contains_own_lambda(node, self.lang)
                    && !class.contains(StmtClass::DEFINITION)
                {
                    self.strip_lambda_bodies(node, id)
                } else {
                    self.text(node)
                };
                let type_tag = if kind == Kind::Declaration {
                    "declaration"
                } else {
                    "expression_statement"
                };
                self.push(id, node, label, type_tag);
            }
            _ => {
                // Every other statement-set kind (using/alias/template
                // declarations, field/access specifiers, delete/operator_cast
                // expressions, preprocessor directives) keeps the raw source
                // text as its label.
                let type_tag = node.kind().to_owned();
                let label = self.text(node);
                self.push(id, node, label, &type_tag);
            }
        }
    }

    fn strip_lambda_bodies(&mut self, node: Node<'tree>, enclosing_id: NodeId) -> String {
        let mut raw = self.text(node);
        let mut label = String::new();
        for lambda in cst::all_lambdas(node, self.lang) {
            let lambda_text = self.text(lambda);
            if let Some(idx) = raw.find(lambda_text.as_str()) {
                let after = raw[idx + lambda_text.len()..].to_owned();
                raw.truncate(idx);
                label = format!("{after}{label}");
            }
            self.records
                .lambda_map
                .insert(AstKey::of(lambda), enclosing_id);
        }
        format!("{raw}{label}")
    }

    fn visit_function(&mut self, node: Node<'tree>, id: NodeId) {
        let declarator = node.child_by_field_name("declarator");
        let mut label = String::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() != "compound_statement" && child.kind() != "function_body" {
                label.push(' ');
                label.push_str(&self.text(child));
            }
        }

        let name_node = declarator.and_then(|d| cst::innermost_function_declarator(d).or(Some(d)));
        let function_name = name_node
            .and_then(cst::declarator_name)
            .map(|n| self.text(n))
            .unwrap_or_else(|| "unknown".to_owned());

        let class_info = if self.lang == Lang::Cpp {
            self.enclosing_class_names(node)
        } else {
            None
        };

        if self.lang == Lang::Cpp && class_info.is_some() {
            let virt = self.virt_specifiers(node);
            if virt.is_virtual || virt.is_pure_virtual {
                self.records.virtual_functions.insert(id, virt);
            }
        }

        let signature = declarator
            .map(|d| cst::parameter_signature(d, self.lang))
            .unwrap_or_default();
        let return_type = node
            .child_by_field_name("type")
            .map(|t| self.text(t))
            .unwrap_or_else(|| "void".to_owned());

        self.record_function(id, &function_name, &signature, &return_type, class_info);
        self.push(id, node, label.trim_start().to_owned(), "function_definition");
    }

    /// Scans `node`'s direct children for a `virtual` keyword token (spec
    /// §4.1 "parse virt-specifiers/pure-virtual markers"). A defined method
    /// (has a body) is never pure-virtual; `= 0` only appears on the
    /// bodyless `field_declaration` form, which this extractor does not
    /// treat as a function definition.
    fn virt_specifiers(&self, node: Node<'tree>) -> VirtualInfo {
        let mut cursor = node.walk();
        let is_virtual = node
            .children(&mut cursor)
            .any(|c| !c.is_named() && self.text(c) == "virtual");
        VirtualInfo {
            is_virtual,
            is_pure_virtual: false,
        }
    }

    fn visit_ctor_dtor(&mut self, node: Node<'tree>, id: NodeId) {
        let declarator = cst::first_child_of_kind(
            node,
            &["function_declarator", "destructor_name"],
        );
        let name_node = declarator.and_then(cst::declarator_name).or(declarator);
        let raw_name = name_node
            .map(|n| self.text(n))
            .unwrap_or_else(|| "unknown".to_owned());
        let is_destructor = raw_name.starts_with('~');
        let function_name = raw_name.trim_start_matches('~').to_owned();

        let class_info = self.enclosing_class_names(node);
        let signature = declarator
            .map(|d| cst::parameter_signature(d, self.lang))
            .unwrap_or_default();

        if is_destructor {
            self.records
                .virtual_functions
                .entry(id)
                .or_insert_with(VirtualInfo::default);
        }

        let mut label = String::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() != "compound_statement" && child.kind() != "field_initializer_list" {
                label.push(' ');
                label.push_str(&self.text(child));
            }
        }

        self.record_function(id, &function_name, &signature, "void", class_info.clone());
        if is_destructor {
            if let Some((_, names)) = &class_info {
                for class_name in names {
                    self.records.function_list.insert(
                        ((Some(class_name.clone()), format!("~{function_name}")), signature.clone()),
                        id,
                    );
                }
            }
        }
        self.push(id, node, label.trim_start().to_owned(), "function_definition");
    }

    fn record_function(
        &mut self,
        id: NodeId,
        function_name: &str,
        signature: &[String],
        return_type: &str,
        class_info: Option<(NodeId, Vec<String>)>,
    ) {
        match class_info {
            Some((class_id, class_names)) => {
                if function_name == "main" {
                    self.records.main_function = Some(id);
                    self.records.main_class = Some(class_id);
                }
                for class_name in class_names {
                    let key: FunctionKey = ((Some(class_name), function_name.to_owned()), signature.to_vec());
                    self.records.function_list.insert(key.clone(), id);
                    self.records.return_type.insert(key, return_type.to_owned());
                }
            }
            None => {
                if function_name == "main" {
                    self.records.main_function = Some(id);
                }
                let key: FunctionKey = ((None, function_name.to_owned()), signature.to_vec());
                self.records.function_list.insert(key.clone(), id);
                self.records.return_type.insert(key, return_type.to_owned());
            }
        }
    }

    fn visit_class(&mut self, node: Node<'tree>, id: NodeId, kind: Kind) {
        let class_name_node = cst::first_child_of_kind(node, &["type_identifier"]);
        let (label, class_name) = match class_name_node {
            Some(n) => {
                let name = self.text(n);
                let tag = if kind == Kind::ClassSpecifier { "class" } else { "struct" };
                (format!("{tag} {name}"), name)
            }
            None => {
                let tag = if kind == Kind::ClassSpecifier {
                    "anonymous_class"
                } else {
                    "anonymous_struct"
                };
                (tag.to_owned(), tag.to_owned())
            }
        };
        self.records.class_list.insert(class_name.clone(), id);

        if let Some(base_list) = node.child_by_field_name("base_class_clause") {
            let mut cursor = base_list.walk();
            for child in base_list.children(&mut cursor) {
                if matches!(
                    child.kind(),
                    "type_identifier" | "template_type" | "qualified_identifier"
                ) {
                    self.records
                        .extends
                        .entry(class_name.clone())
                        .or_default()
                        .push(self.text(child));
                }
            }
        }
        self.push(id, node, label, node.kind());
    }

    /// Returns `(class_id, [class_name, base_names...])` for the class/struct
    /// enclosing `node` (`cpp_nodes.py::get_class_name`).
    fn enclosing_class_names(&mut self, node: Node<'tree>) -> Option<(NodeId, Vec<String>)> {
        let mut current = node.parent();
        while let Some(n) = current {
            if n.kind() == "field_declaration_list" {
                if let Some(class_node) = n.parent() {
                    if matches!(class_node.kind(), "class_specifier" | "struct_specifier") {
                        let class_id = self.id_of(class_node)?;
                        let class_name_node =
                            cst::first_child_of_kind(class_node, &["type_identifier"]);
                        let mut names = match class_name_node {
                            Some(cn) => vec![self.text(cn)],
                            None => vec![if class_node.kind() == "class_specifier" {
                                "anonymous_class".to_owned()
                            } else {
                                "anonymous_struct".to_owned()
                            }],
                        };
                        if class_node.kind() == "class_specifier" {
                            if let Some(base_list) = class_node.child_by_field_name("base_class_clause") {
                                let mut cursor = base_list.walk();
                                for child in base_list.children(&mut cursor) {
                                    if matches!(
                                        child.kind(),
                                        "type_identifier" | "template_type" | "qualified_identifier"
                                    ) {
                                        names.push(self.text(child));
                                    }
                                }
                            }
                        }
                        return Some((class_id, names));
                    }
                }
            }
            current = n.parent();
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::NullSink;
    use crate::model::AstKey as Key;
    use crate::symbols::MapIndex;
    use std::collections::HashMap as Map;

    fn index_everything(root: Node) -> MapIndex {
        let mut map = Map::new();
        let mut next = 3i64;
        let mut stack = vec![root];
        while let Some(n) = stack.pop() {
            map.entry(Key::of(n)).or_insert_with(|| {
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

    fn parse_cpp(src: &str) -> tree_sitter::Tree {
        let mut parser = tree_sitter::Parser::new();
        parser.set_language(&tree_sitter_cpp::LANGUAGE.into()).unwrap();
        parser.parse(src, None).unwrap()
    }

    #[test]
    fn c_sequential_emits_three_statement_nodes() {
        let src = "int main(){ int x=1; int y=x+1; return y; }";
        let tree = parse_c(src);
        let root = tree.root_node();
        let index = index_everything(root);
        let mut sink = NullSink;
        let extraction = extract(Lang::C, root, src.as_bytes(), &index, &mut sink);
        let tags: Vec<&str> = extraction
            .graph_nodes
            .iter()
            .map(|n| n.type_tag.as_str())
            .collect();
        assert!(tags.contains(&"function_definition"));
        assert!(tags.iter().filter(|t| **t == "declaration").count() == 2);
        assert!(tags.contains(&"return"));
        assert_eq!(extraction.records.main_function, extraction.graph_nodes.iter().find(|n| n.type_tag == "function_definition").map(|n| n.id));
    }

    #[test]
    fn for_loop_init_and_update_are_not_standalone_nodes() {
        let src = "int main(){ for(int i=0;i<10;i++) { x=1; } }";
        let tree = parse_c(src);
        let root = tree.root_node();
        let index = index_everything(root);
        let mut sink = NullSink;
        let extraction = extract(Lang::C, root, src.as_bytes(), &index, &mut sink);
        let tags: Vec<&str> = extraction
            .graph_nodes
            .iter()
            .map(|n| n.type_tag.as_str())
            .collect();
        assert_eq!(tags.iter().filter(|t| **t == "for").count(), 1);
        // only the body assignment is a standalone declaration/expression node
        assert_eq!(tags.iter().filter(|t| **t == "expression_statement").count(), 1);
    }

    #[test]
    fn do_while_condition_is_its_own_node() {
        let src = "int main(){ do { i++; } while(i<10); }";
        let tree = parse_c(src);
        let root = tree.root_node();
        let index = index_everything(root);
        let mut sink = NullSink;
        let extraction = extract(Lang::C, root, src.as_bytes(), &index, &mut sink);
        let while_nodes: Vec<_> = extraction
            .graph_nodes
            .iter()
            .filter(|n| n.type_tag == "while")
            .collect();
        assert_eq!(while_nodes.len(), 1);
        assert!(while_nodes[0].label.starts_with("while("));
    }

    #[test]
    fn cpp_class_with_virtual_method_populates_class_list() {
        let src = "class Base { public: virtual void method(); };";
        let tree = parse_cpp(src);
        let root = tree.root_node();
        let index = index_everything(root);
        let mut sink = NullSink;
        let extraction = extract(Lang::Cpp, root, src.as_bytes(), &index, &mut sink);
        assert!(extraction.records.class_list.contains_key("Base"));
    }
}

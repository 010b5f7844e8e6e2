//! Node-kind table for `tree-sitter-cpp`, grounded in
//! `original_source/src/comex/utils/cpp_nodes.py`'s `statement_types` dict.
//! Supersedes the C table; `catch_clause` is handled as a special case in
//! `extract::get_nodes` (it sits outside `node_list_type` in the reference
//! too) and is tabulated here only for its `STATEMENT_HOLDER` membership.

use phf::{Map, phf_map};

use super::{Kind, StmtClass, StmtInfo};

const NODE_LIST: StmtClass = StmtClass::NODE_LIST;
const NON_CONTROL: StmtClass = StmtClass::NON_CONTROL;
const CONTROL: StmtClass = StmtClass::CONTROL;
const LOOP_CONTROL: StmtClass = StmtClass::LOOP_CONTROL;
const INNER_NODE: StmtClass = StmtClass::INNER_NODE;
const OUTER_NODE: StmtClass = StmtClass::OUTER_NODE;
const STATEMENT_HOLDER: StmtClass = StmtClass::STATEMENT_HOLDER;
const DEFINITION: StmtClass = StmtClass::DEFINITION;

pub static TABLE: Map<&'static str, StmtInfo> = phf_map! {
    "declaration" => StmtInfo {
        kind: Kind::Declaration,
        class: NODE_LIST.union(NON_CONTROL).union(INNER_NODE),
    },
    "expression_statement" => StmtInfo {
        kind: Kind::ExpressionStatement,
        class: NODE_LIST.union(NON_CONTROL).union(INNER_NODE),
    },
    "labeled_statement" => StmtInfo {
        kind: Kind::LabeledStatement,
        class: NODE_LIST,
    },
    "if_statement" => StmtInfo {
        kind: Kind::If,
        class: NODE_LIST.union(CONTROL),
    },
    "while_statement" => StmtInfo {
        kind: Kind::While,
        class: NODE_LIST.union(CONTROL).union(LOOP_CONTROL),
    },
    "for_statement" => StmtInfo {
        kind: Kind::For,
        class: NODE_LIST.union(CONTROL).union(LOOP_CONTROL).union(OUTER_NODE),
    },
    "for_range_loop" => StmtInfo {
        kind: Kind::ForRange,
        class: NODE_LIST.union(CONTROL).union(LOOP_CONTROL).union(OUTER_NODE),
    },
    "do_statement" => StmtInfo {
        kind: Kind::Do,
        class: NODE_LIST.union(CONTROL).union(LOOP_CONTROL),
    },
    "break_statement" => StmtInfo {
        kind: Kind::Break,
        class: NODE_LIST.union(CONTROL),
    },
    "continue_statement" => StmtInfo {
        kind: Kind::Continue,
        class: NODE_LIST.union(CONTROL),
    },
    "return_statement" => StmtInfo {
        kind: Kind::Return,
        class: NODE_LIST.union(CONTROL),
    },
    "switch_statement" => StmtInfo {
        kind: Kind::Switch,
        class: NODE_LIST.union(CONTROL),
    },
    "case_statement" => StmtInfo {
        kind: Kind::Case,
        class: NODE_LIST.union(CONTROL).union(STATEMENT_HOLDER),
    },
    "throw_statement" => StmtInfo {
        kind: Kind::ThrowStatement,
        class: NODE_LIST.union(CONTROL),
    },
    "try_statement" => StmtInfo {
        kind: Kind::TryStatement,
        class: NODE_LIST.union(CONTROL),
    },
    "catch_clause" => StmtInfo {
        kind: Kind::CatchClause,
        class: STATEMENT_HOLDER,
    },
    "function_definition" => StmtInfo {
        kind: Kind::FunctionDefinition,
        class: NODE_LIST.union(STATEMENT_HOLDER).union(DEFINITION),
    },
    "class_specifier" => StmtInfo {
        kind: Kind::ClassSpecifier,
        class: NODE_LIST.union(STATEMENT_HOLDER).union(DEFINITION),
    },
    "struct_specifier" => StmtInfo {
        kind: Kind::StructSpecifier,
        class: NODE_LIST.union(STATEMENT_HOLDER).union(DEFINITION),
    },
    "namespace_definition" => StmtInfo {
        kind: Kind::NamespaceDefinition,
        class: NODE_LIST.union(STATEMENT_HOLDER).union(DEFINITION),
    },
    "using_declaration" => StmtInfo {
        kind: Kind::UsingDeclaration,
        class: NODE_LIST.union(NON_CONTROL),
    },
    "alias_declaration" => StmtInfo {
        kind: Kind::AliasDeclaration,
        class: NODE_LIST.union(NON_CONTROL),
    },
    "template_declaration" => StmtInfo {
        kind: Kind::TemplateDeclaration,
        class: NODE_LIST.union(DEFINITION),
    },
    "field_declaration" => StmtInfo {
        kind: Kind::FieldDeclaration,
        class: NODE_LIST.union(NON_CONTROL).union(DEFINITION),
    },
    "access_specifier" => StmtInfo {
        kind: Kind::AccessSpecifier,
        class: NODE_LIST.union(NON_CONTROL),
    },
    "constructor_or_destructor_definition" => StmtInfo {
        kind: Kind::ConstructorOrDestructorDefinition,
        class: NODE_LIST.union(STATEMENT_HOLDER).union(DEFINITION),
    },
    "operator_cast" => StmtInfo {
        kind: Kind::OperatorCast,
        class: NODE_LIST,
    },
    "delete_expression" => StmtInfo {
        kind: Kind::DeleteExpression,
        class: NODE_LIST,
    },
    "lambda_expression" => StmtInfo {
        kind: Kind::LambdaExpression,
        class: NODE_LIST,
    },
    "compound_statement" => StmtInfo {
        kind: Kind::CompoundStatement,
        class: STATEMENT_HOLDER,
    },
    "translation_unit" => StmtInfo {
        kind: Kind::TranslationUnit,
        class: STATEMENT_HOLDER,
    },
};

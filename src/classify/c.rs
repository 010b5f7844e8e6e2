//! Node-kind table for `tree-sitter-c`, grounded in
//! `original_source/src/comex/utils/c_nodes.py`'s `statement_types` dict.

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
        class: NODE_LIST.union(NON_CONTROL).union(INNER_NODE).union(DEFINITION),
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
    "function_definition" => StmtInfo {
        kind: Kind::FunctionDefinition,
        class: NODE_LIST.union(STATEMENT_HOLDER).union(DEFINITION),
    },
    "case_statement" => StmtInfo {
        kind: Kind::Case,
        class: NODE_LIST.union(CONTROL).union(STATEMENT_HOLDER),
    },
    "goto_statement" => StmtInfo {
        kind: Kind::Goto,
        class: NODE_LIST.union(CONTROL),
    },
    "compound_statement" => StmtInfo {
        kind: Kind::CompoundStatement,
        class: NODE_LIST.union(STATEMENT_HOLDER),
    },
    "preproc_include" => StmtInfo {
        kind: Kind::PreprocInclude,
        class: NODE_LIST.union(NON_CONTROL),
    },
    "preproc_def" => StmtInfo {
        kind: Kind::PreprocDef,
        class: NODE_LIST.union(NON_CONTROL),
    },
    "preproc_function_def" => StmtInfo {
        kind: Kind::PreprocFunctionDef,
        class: NODE_LIST.union(NON_CONTROL),
    },
    "preproc_call" => StmtInfo {
        kind: Kind::PreprocCall,
        class: NODE_LIST.union(NON_CONTROL),
    },
    "preproc_if" => StmtInfo {
        kind: Kind::PreprocIf,
        class: NODE_LIST.union(CONTROL),
    },
    "preproc_ifdef" => StmtInfo {
        kind: Kind::PreprocIfdef,
        class: NODE_LIST.union(CONTROL),
    },
    "preproc_elif" => StmtInfo {
        kind: Kind::PreprocElif,
        class: NODE_LIST.union(CONTROL),
    },
    "preproc_else" => StmtInfo {
        kind: Kind::PreprocElse,
        class: NODE_LIST.union(CONTROL),
    },
    "translation_unit" => StmtInfo {
        kind: Kind::TranslationUnit,
        class: STATEMENT_HOLDER,
    },
    "struct_specifier" => StmtInfo {
        kind: Kind::StructSpecifier,
        class: DEFINITION,
    },
    "union_specifier" => StmtInfo {
        kind: Kind::StructSpecifier,
        class: DEFINITION,
    },
    "enum_specifier" => StmtInfo {
        kind: Kind::StructSpecifier,
        class: DEFINITION,
    },
};

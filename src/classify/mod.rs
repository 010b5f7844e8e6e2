//! Tree walker & node classifier (spec §2 component 1, §4.1). Maps a raw
//! tree-sitter node-kind string to (a) a dispatch tag used throughout
//! `extract`/`cfg`/`dfg`, and (b) the statement-set membership bitflags the
//! reference's `c_nodes.py`/`cpp_nodes.py` keep as parallel lists
//! (`node_list_type`, `non_control_statement`, ...). One table per language,
//! phf-backed the way the teacher's `labels::rust::KINDS` is.

mod c;
mod cpp;

use bitflags::bitflags;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lang {
    C,
    Cpp,
}

bitflags! {
    /// Statement-set membership (`c_nodes.py`/`cpp_nodes.py` §4.1). A node
    /// kind can sit in more than one set at once (e.g. `if_statement` is
    /// both `NODE_LIST` and `CONTROL`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StmtClass: u16 {
        /// Becomes a `CfgNode` (subject to the `inner_node_type` exclusions
        /// in §4.1).
        const NODE_LIST         = 1 << 0;
        const NON_CONTROL       = 1 << 1;
        const CONTROL           = 1 << 2;
        const LOOP_CONTROL      = 1 << 3;
        /// for-loop init/update clause candidates (`inner_node_type`).
        const INNER_NODE        = 1 << 4;
        /// `for_statement`/`for_range_loop` — parents that own inner nodes.
        const OUTER_NODE        = 1 << 5;
        const STATEMENT_HOLDER  = 1 << 6;
        const DEFINITION        = 1 << 7;
    }
}

/// Dispatch tag driving `cfg::build_sub`'s per-statement edge rules
/// (spec §4.2 step 6 table). Distinct from `StmtClass`: this identifies
/// *which* rule applies, `StmtClass` identifies *which sets* a kind is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Declaration,
    ExpressionStatement,
    LabeledStatement,
    If,
    While,
    For,
    ForRange,
    Do,
    Break,
    Continue,
    Return,
    Goto,
    Switch,
    Case,
    FunctionDefinition,
    CompoundStatement,
    PreprocInclude,
    PreprocDef,
    PreprocFunctionDef,
    PreprocCall,
    PreprocIf,
    PreprocIfdef,
    PreprocElif,
    PreprocElse,
    ClassSpecifier,
    StructSpecifier,
    NamespaceDefinition,
    UsingDeclaration,
    AliasDeclaration,
    TemplateDeclaration,
    FieldDeclaration,
    AccessSpecifier,
    ConstructorOrDestructorDefinition,
    OperatorCast,
    DeleteExpression,
    LambdaExpression,
    TryStatement,
    CatchClause,
    ThrowStatement,
    TranslationUnit,
    Other,
}

struct StmtInfo {
    kind: Kind,
    class: StmtClass,
}

#[inline]
pub fn lookup(lang: Lang, node_kind: &str) -> Kind {
    info(lang, node_kind).map(|i| i.kind).unwrap_or(Kind::Other)
}

#[inline]
pub fn classify(lang: Lang, node_kind: &str) -> StmtClass {
    info(lang, node_kind)
        .map(|i| i.class)
        .unwrap_or(StmtClass::empty())
}

#[inline]
pub fn is_statement(lang: Lang, node_kind: &str) -> bool {
    classify(lang, node_kind).contains(StmtClass::NODE_LIST)
}

#[inline]
pub fn is_definition(lang: Lang, node_kind: &str) -> bool {
    classify(lang, node_kind).contains(StmtClass::DEFINITION)
}

#[inline]
pub fn is_statement_holder(lang: Lang, node_kind: &str) -> bool {
    classify(lang, node_kind).contains(StmtClass::STATEMENT_HOLDER)
        || node_kind == "translation_unit"
}

/// `break, continue, return, goto, throw` — suppress fall-through edges
/// from a control-block tail (spec GLOSSARY "Jump statement").
pub fn is_jump(kind: Kind) -> bool {
    matches!(
        kind,
        Kind::Break | Kind::Continue | Kind::Return | Kind::Goto | Kind::ThrowStatement
    )
}

fn info(lang: Lang, node_kind: &str) -> Option<&'static StmtInfo> {
    match lang {
        Lang::C => c::TABLE.get(node_kind),
        Lang::Cpp => cpp::TABLE.get(node_kind),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn c_if_statement_is_control_and_node_list() {
        let class = classify(Lang::C, "if_statement");
        assert!(class.contains(StmtClass::NODE_LIST));
        assert!(class.contains(StmtClass::CONTROL));
        assert_eq!(lookup(Lang::C, "if_statement"), Kind::If);
    }

    #[test]
    fn cpp_adds_try_throw_and_lambda() {
        assert_eq!(lookup(Lang::Cpp, "try_statement"), Kind::TryStatement);
        assert_eq!(lookup(Lang::Cpp, "lambda_expression"), Kind::LambdaExpression);
        assert!(classify(Lang::Cpp, "throw_statement").contains(StmtClass::CONTROL));
    }

    #[test]
    fn unknown_kind_classifies_as_other_and_empty() {
        assert_eq!(lookup(Lang::C, "nonsense_node"), Kind::Other);
        assert!(classify(Lang::C, "nonsense_node").is_empty());
    }

    #[test]
    fn jump_statements_match_glossary_definition() {
        assert!(is_jump(Kind::Break));
        assert!(is_jump(Kind::Continue));
        assert!(is_jump(Kind::Return));
        assert!(is_jump(Kind::Goto));
        assert!(is_jump(Kind::ThrowStatement));
        assert!(!is_jump(Kind::If));
    }

    #[test]
    fn for_statement_is_outer_node_for_both_languages() {
        assert!(classify(Lang::C, "for_statement").contains(StmtClass::OUTER_NODE));
        assert!(classify(Lang::Cpp, "for_range_loop").contains(StmtClass::OUTER_NODE));
    }
}

//! Core data types shared by every construction stage: the AST key that
//! external collaborators key their tables on, the CFG/DFG node and edge
//! shapes, and the per-graph `Records` sidecar built during extraction.

use std::collections::HashMap;
use std::fmt;

use tree_sitter::Point;

/// Integer id assigned by the caller's `index` table. `1` and `2` are
/// reserved for the synthetic START/EXIT nodes and are never looked up.
pub type NodeId = i64;

pub const START_ID: NodeId = 1;
pub const EXIT_ID: NodeId = 2;

/// `(start_point, end_point, node_type)`, uniquely keying a CST node the way
/// the caller's `index` does. Used to look a node's id up without holding a
/// borrow on the `tree_sitter::Tree` it came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AstKey {
    pub start: Point,
    pub end: Point,
    pub kind: Box<str>,
}

impl AstKey {
    pub fn of(node: tree_sitter::Node) -> Self {
        AstKey {
            start: node.start_position(),
            end: node.end_position(),
            kind: node.kind().into(),
        }
    }
}

/// A node in the CFG/DFG: `(id, source_line, label, type_tag, block_index)`.
/// Immutable once created except for `block_index`, which is stamped by the
/// basic-block pass (`graph::assign_basic_blocks`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CfgNode {
    pub id: NodeId,
    pub line: usize,
    pub label: String,
    pub type_tag: String,
    pub block_index: usize,
}

/// Closed enumeration of CFG edge kinds (spec §6). Call/return kinds carry a
/// payload (`call_id` or a RAII variable name); the rest are bare.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CfgEdgeKind {
    NextLine,
    FirstNextLine,
    PosNext,
    NegNext,
    LoopControl,
    LoopUpdate,
    SwitchCase,
    CaseNext,
    SwitchExit,
    JumpNext,
    TryNext,
    CatchException,
    TryExit,
    CatchNext,
    CatchExit,
    ThrowExit,
    LambdaNext,
    NamespaceEntry,
    ClassNext,
    GlobalSequence,
    FunctionCall(CallId),
    MethodCall(CallId),
    VirtualCall(CallId),
    ConstructorCall(CallId),
    DestructorCall(CallId),
    IndirectCall(CallId),
    FunctionReturn,
    MethodReturn,
    ConstructorReturn,
    BaseConstructorReturn,
    DestructorReturn,
    BaseDestructorReturn,
    DestructorChain(Option<String>),
    ScopeExitDestructor,
    ScopeDestructorReturn(String),
    IndirectReturn,
    Next,
    LambdaInvocation,
}

/// Opaque identifier for a call site, used as the payload of call-kind CFG
/// edges (`function_call|<cid>` rendered form, see `Display`).
pub type CallId = u32;

impl fmt::Display for CfgEdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use CfgEdgeKind::*;
        match self {
            NextLine => write!(f, "next_line"),
            FirstNextLine => write!(f, "first_next_line"),
            PosNext => write!(f, "pos_next"),
            NegNext => write!(f, "neg_next"),
            LoopControl => write!(f, "loop_control"),
            LoopUpdate => write!(f, "loop_update"),
            SwitchCase => write!(f, "switch_case"),
            CaseNext => write!(f, "case_next"),
            SwitchExit => write!(f, "switch_exit"),
            JumpNext => write!(f, "jump_next"),
            TryNext => write!(f, "try_next"),
            CatchException => write!(f, "catch_exception"),
            TryExit => write!(f, "try_exit"),
            CatchNext => write!(f, "catch_next"),
            CatchExit => write!(f, "catch_exit"),
            ThrowExit => write!(f, "throw_exit"),
            LambdaNext => write!(f, "lambda_next"),
            NamespaceEntry => write!(f, "namespace_entry"),
            ClassNext => write!(f, "class_next"),
            GlobalSequence => write!(f, "global_sequence"),
            FunctionCall(cid) => write!(f, "function_call|{cid}"),
            MethodCall(cid) => write!(f, "method_call|{cid}"),
            VirtualCall(cid) => write!(f, "virtual_call|{cid}"),
            ConstructorCall(cid) => write!(f, "constructor_call|{cid}"),
            DestructorCall(cid) => write!(f, "destructor_call|{cid}"),
            IndirectCall(cid) => write!(f, "indirect_call|{cid}"),
            FunctionReturn => write!(f, "function_return"),
            MethodReturn => write!(f, "method_return"),
            ConstructorReturn => write!(f, "constructor_return"),
            BaseConstructorReturn => write!(f, "base_constructor_return"),
            DestructorReturn => write!(f, "destructor_return"),
            BaseDestructorReturn => write!(f, "base_destructor_return"),
            DestructorChain(Some(var)) => write!(f, "destructor_chain|{var}"),
            DestructorChain(None) => write!(f, "destructor_chain"),
            ScopeExitDestructor => write!(f, "scope_exit_destructor"),
            ScopeDestructorReturn(var) => write!(f, "scope_destructor_return|{var}"),
            IndirectReturn => write!(f, "indirect_return"),
            Next => write!(f, "next"),
            LambdaInvocation => write!(f, "lambda_invocation"),
        }
    }
}

/// `(src, dst, kind)`. Duplicates (same src, dst, kind — and payload, which
/// lives inside `kind` for call/RAII variants) are suppressed by `graph::Graph`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CfgEdge {
    pub src: NodeId,
    pub dst: NodeId,
    pub kind: CfgEdgeKind,
}

/// DFG dataflow classification (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DfgDataflowType {
    ComesFrom,
    Parameter,
    LastDef,
    LoopCarried,
    ConstructorCall,
    BaseConstructorCall,
    DestructorCall,
    BaseDestructorCall,
    VirtualDispatch,
    LambdaCall,
}

/// Interprocedural sub-classification, set only on edges crossing a call
/// boundary (spec §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interprocedural {
    ArgumentToParameter,
    ReturnToCaller,
    ModificationToUse,
}

/// Attributes carried by a DFG edge (spec §6). `color` mirrors the
/// reference's debug rendering and is otherwise inert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DfgEdgeAttrs {
    pub dataflow_type: DfgDataflowType,
    pub used_def: String,
    pub color: &'static str,
    pub interprocedural: Option<Interprocedural>,
    pub argument_index: Option<usize>,
    pub object_name: Option<String>,
}

impl DfgEdgeAttrs {
    pub fn comes_from(used_def: impl Into<String>) -> Self {
        DfgEdgeAttrs {
            dataflow_type: DfgDataflowType::ComesFrom,
            used_def: used_def.into(),
            color: "#00A3FF",
            interprocedural: None,
            argument_index: None,
            object_name: None,
        }
    }

    pub fn last_def(used_def: impl Into<String>) -> Self {
        DfgEdgeAttrs {
            dataflow_type: DfgDataflowType::LastDef,
            used_def: used_def.into(),
            color: "orange",
            interprocedural: None,
            argument_index: None,
            object_name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DfgEdge {
    pub src: NodeId,
    pub dst: NodeId,
    pub attrs: DfgEdgeAttrs,
}

/// A variable's visibility path: scope `A` reaches scope `B` iff `A` is a
/// prefix of `B` (spec §3).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Scope(pub Vec<i64>);

impl Scope {
    pub fn is_prefix_of(&self, other: &Scope) -> bool {
        self.0.len() <= other.0.len() && self.0.iter().zip(&other.0).all(|(a, b)| a == b)
    }

    pub fn global() -> Self {
        Scope(vec![0])
    }
}

/// Normalized name a reaching-definition fact is filed under. `*p`, `p[i]`,
/// `p->f` all resolve to a structured variant over the same base variable so
/// def/use matching does not need ad-hoc string surgery (spec §9).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FactName {
    Var(String),
    Field(String, String),
    Deref(String),
    Qualified(String, String),
    Literal(String),
}

impl FactName {
    /// The base variable name matching uses for scope/field-partial fallback.
    pub fn base(&self) -> &str {
        match self {
            FactName::Var(v) | FactName::Deref(v) => v,
            FactName::Field(obj, _) => obj,
            FactName::Qualified(ns, _) => ns,
            FactName::Literal(v) => v,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, FactName::Literal(_))
    }
}

impl fmt::Display for FactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactName::Var(v) => write!(f, "{v}"),
            FactName::Field(obj, field) => write!(f, "{obj}.{field}"),
            FactName::Deref(v) => write!(f, "*{v}"),
            FactName::Qualified(ns, name) => write!(f, "{ns}::{name}"),
            FactName::Literal(v) => write!(f, "{v}"),
        }
    }
}

/// A reaching-definition fact: either an identifier definition/use or a
/// literal value (spec §3, §4.6).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fact {
    pub name: FactName,
    /// Defining statement's NodeId; `None` for live uses that never resolved
    /// to a local def (kept only as a placeholder inside DEF/USE sets).
    pub line: Option<NodeId>,
    pub scope: Scope,
    pub variable_scope: Scope,
    pub declaration: bool,
    pub has_initializer: bool,
    pub method_call: bool,
    pub satisfied: bool,
    pub is_pointer_modification_at_call_site: bool,
}

impl Fact {
    pub fn identifier(name: FactName, line: NodeId, scope: Scope, variable_scope: Scope) -> Self {
        Fact {
            name,
            line: Some(line),
            scope,
            variable_scope,
            declaration: false,
            has_initializer: false,
            method_call: false,
            satisfied: false,
            is_pointer_modification_at_call_site: false,
        }
    }

    pub fn literal(text: impl Into<String>, variable_scope: Scope) -> Self {
        Fact {
            name: FactName::Literal(text.into()),
            line: None,
            scope: variable_scope.clone(),
            variable_scope,
            declaration: false,
            has_initializer: false,
            method_call: false,
            satisfied: true,
            is_pointer_modification_at_call_site: false,
        }
    }
}

/// Key used by `function_list`/`return_type`: the (possibly class-qualified)
/// function name plus its parameter-type signature.
pub type FunctionKey = ((Option<String>, String), Vec<String>);

/// `(call_site_inner_id, enclosing_statement_id)` — a recorded call.
pub type CallSite = (NodeId, NodeId);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VirtualInfo {
    pub is_virtual: bool,
    pub is_pure_virtual: bool,
}

/// Per-graph sidecar populated during extraction and consumed during edge
/// wiring (spec §3 "Records"). Dies with the engine once construction ends.
#[derive(Debug, Clone, Default)]
pub struct Records {
    pub basic_blocks: HashMap<usize, Vec<NodeId>>,
    pub function_list: HashMap<FunctionKey, NodeId>,
    pub return_type: HashMap<FunctionKey, String>,
    pub function_calls: HashMap<FunctionKey, Vec<CallSite>>,
    pub method_calls: HashMap<FunctionKey, Vec<CallSite>>,
    pub constructor_calls: HashMap<FunctionKey, Vec<CallSite>>,
    pub destructor_calls: HashMap<FunctionKey, Vec<CallSite>>,
    pub indirect_calls: HashMap<FunctionKey, Vec<CallSite>>,
    pub virtual_functions: HashMap<NodeId, VirtualInfo>,
    pub return_statement_map: HashMap<NodeId, Vec<NodeId>>,
    pub implicit_return_map: HashMap<NodeId, NodeId>,
    pub label_statement_map: HashMap<String, AstKey>,
    pub switch_child_map: HashMap<NodeId, NodeId>,
    pub lambda_map: HashMap<AstKey, NodeId>,
    pub function_pointer_assignments: HashMap<String, Vec<String>>,
    pub extends: HashMap<String, Vec<String>>,
    pub main_function: Option<NodeId>,
    pub main_class: Option<NodeId>,
    pub class_list: HashMap<String, NodeId>,
    pub next_implicit_id: NodeId,
}

impl Records {
    /// Synthetic ids for implicit returns are minted below `NodeId::MIN + N`
    /// style negative space so they can never collide with caller-assigned
    /// (positive) ids from `index`.
    pub fn fresh_implicit_id(&mut self) -> NodeId {
        self.next_implicit_id -= 1;
        self.next_implicit_id
    }
}

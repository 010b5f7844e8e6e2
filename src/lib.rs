//! CFG and static data-flow graph construction for C and C++ translation
//! units (spec §1-§2). The crate consumes a tree-sitter CST plus three
//! caller-supplied tables (`Index`, `SymbolTable`, `DeclarationMap`) and
//! returns a `Graph` of `CfgNode`/`CfgEdge` plus the derived `DfgEdge` set —
//! it never parses source itself, never assigns node ids, and never builds
//! scopes; those are the caller's job (spec §1 "Out of scope").
//!
//! ```ignore
//! let cfg = codeflow::build_cfg(Lang::C, root, code, &index, &symbols, &declarations, &mut sink)?;
//! let dfg = codeflow::build_dfg(Lang::C, root, code, &cfg, &index, &symbols, &EngineConfig::default(), &mut sink)?;
//! ```

pub mod cfg;
pub mod classify;
pub mod config;
pub mod cst;
pub mod diagnostics;
pub mod dfg;
pub mod errors;
pub mod extract;
pub mod graph;
pub mod model;
pub mod rda;
pub mod symbols;
pub mod types;

use std::collections::HashMap;

use tree_sitter::Node;

pub use classify::Lang;
pub use config::EngineConfig;
pub use dfg::DfgResult;
pub use diagnostics::{DiagnosticSink, NullSink, RecordingSink, SkipReason, TracingSink};
pub use errors::{EngineError, EngineResult};
pub use graph::Graph;
pub use model::{AstKey, CfgEdge, CfgEdgeKind, CfgNode, DfgDataflowType, DfgEdge, DfgEdgeAttrs, Interprocedural, NodeId, Records, Scope};
pub use symbols::{DeclarationMap, Index, MapDeclarationMap, MapIndex, MapSymbolTable, SymbolTable};

fn expected_language(lang: Lang) -> tree_sitter::Language {
    match lang {
        Lang::C => tree_sitter_c::LANGUAGE.into(),
        Lang::Cpp => tree_sitter_cpp::LANGUAGE.into(),
    }
}

fn check_language(lang: Lang, root: Node) -> EngineResult<()> {
    if root.language() != expected_language(lang) {
        return Err(EngineError::LanguageMismatch {
            expected: match lang {
                Lang::C => "c",
                Lang::Cpp => "cpp",
            },
            found: "mismatched grammar",
        });
    }
    Ok(())
}

/// The control-flow side of construction (spec §2 components 1-3, §4.1-§4.3):
/// the statement extractor feeds the CFG builder. `node_list` is retained
/// (rather than dropped with the extractor's own scratch state) so
/// `build_dfg` can walk the same CST for RDA fact collection without a
/// second tree-sitter pass.
pub struct CfgResult<'tree> {
    pub graph: Graph,
    pub records: Records,
    node_list: HashMap<AstKey, Node<'tree>>,
}

/// Builds the CFG for one translation unit (spec §4.2). Fails only on the
/// caller-error precondition in §4.11 (wrong grammar for the requested
/// `Lang`); every per-node construction failure is routed through `sink`
/// and the offending node is skipped (§4.10/§7).
pub fn build_cfg<'tree>(
    lang: Lang,
    root: Node<'tree>,
    code: &'tree [u8],
    index: &dyn Index,
    symbols: &dyn SymbolTable,
    declarations: &dyn DeclarationMap,
    sink: &mut dyn DiagnosticSink,
) -> EngineResult<CfgResult<'tree>> {
    check_language(lang, root)?;

    tracing::debug!(target: "cfg", ?lang, "starting CFG construction");
    let extraction = extract::extract(lang, root, code, index, sink);
    let node_list = extraction.node_list.clone();
    let (graph, records) = cfg::build(lang, root, code, extraction, index, symbols, declarations, sink);
    tracing::debug!(target: "cfg", nodes = graph.node_ids().count(), edges = graph.edges().len(), "CFG construction complete");

    Ok(CfgResult { graph, records, node_list })
}

/// Builds the SDFG for the translation unit a prior `build_cfg` call already
/// processed (spec §4.5-§4.8). Takes the `CfgResult` by reference so a
/// caller can request the debug RDA projection (`EngineConfig::debug_rda_projection`)
/// without giving up ownership of the CFG.
pub fn build_dfg<'tree>(
    lang: Lang,
    root: Node<'tree>,
    code: &'tree [u8],
    cfg: &CfgResult<'tree>,
    index: &dyn Index,
    symbols: &dyn SymbolTable,
    config: &EngineConfig,
    sink: &mut dyn DiagnosticSink,
) -> EngineResult<DfgResult> {
    check_language(lang, root)?;

    tracing::debug!(target: "dfg", ?lang, "starting SDFG construction");
    let result = dfg::build(lang, root, code, &cfg.node_list, &cfg.graph, &cfg.records, index, symbols, config, sink);
    tracing::debug!(target: "dfg", edges = result.edges.len(), "SDFG construction complete");

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::{MapDeclarationMap, MapIndex, MapSymbolTable};
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
    fn end_to_end_sequential_c_yields_cfg_and_dfg() {
        let src = "int main(){ int x=1; int y=x+1; return y; }";
        let tree = parse_c(src);
        let root = tree.root_node();
        let index = index_everything(root);
        let symbols = MapSymbolTable::default();
        let decls = MapDeclarationMap::default();
        let mut sink = NullSink;

        let cfg = build_cfg(Lang::C, root, src.as_bytes(), &index, &symbols, &decls, &mut sink).unwrap();
        assert!(cfg.records.main_function.is_some());

        let config = EngineConfig::default();
        let dfg = build_dfg(Lang::C, root, src.as_bytes(), &cfg, &index, &symbols, &config, &mut sink).unwrap();
        assert!(!dfg.edges.is_empty());
    }

    #[test]
    fn language_mismatch_is_reported_as_an_error() {
        let src = "int main(){ return 0; }";
        let tree = parse_c(src);
        let root = tree.root_node();
        let index = index_everything(root);
        let symbols = MapSymbolTable::default();
        let decls = MapDeclarationMap::default();
        let mut sink = NullSink;

        let result = build_cfg(Lang::Cpp, root, src.as_bytes(), &index, &symbols, &decls, &mut sink);
        assert!(matches!(result, Err(EngineError::LanguageMismatch { .. })));
    }

    #[test]
    fn cpp_virtual_call_pipeline_runs_end_to_end() {
        let src = r#"
            class Base { public: virtual void greet(); };
            class Derived : public Base { public: void greet(); };
            void call_it(Base *b) { b->greet(); }
        "#;
        let tree = parse_cpp(src);
        let root = tree.root_node();
        let index = index_everything(root);
        let symbols = MapSymbolTable::default();
        let decls = MapDeclarationMap::default();
        let mut sink = NullSink;

        let cfg = build_cfg(Lang::Cpp, root, src.as_bytes(), &index, &symbols, &decls, &mut sink).unwrap();
        let config = EngineConfig::default();
        let dfg = build_dfg(Lang::Cpp, root, src.as_bytes(), &cfg, &index, &symbols, &config, &mut sink);
        assert!(dfg.is_ok());
    }
}

//! Contracts for the external collaborators named in the purpose/scope: the
//! node index, symbol table, and declaration map. Construction (`cst`,
//! `extract`, `cfg`, `dfg`) only ever reads through these traits — it never
//! builds scopes or assigns ids itself.

use std::collections::HashMap;

use crate::model::{AstKey, NodeId, Scope};

/// `(start_point, end_point, node_type) -> NodeId`, assigned by the caller
/// before construction runs. Construction treats a missing entry as the
/// "missing index" failure mode (spec §7) and skips just that node.
pub trait Index {
    fn get(&self, key: &AstKey) -> Option<NodeId>;
}

/// A plain `HashMap`-backed `Index`, sufficient for callers that precompute
/// the whole table up front (the common case — one index per tree-sitter
/// parse, built while the CST is walked for id assignment).
#[derive(Debug, Clone, Default)]
pub struct MapIndex(pub HashMap<AstKey, NodeId>);

impl Index for MapIndex {
    fn get(&self, key: &AstKey) -> Option<NodeId> {
        self.0.get(key).copied()
    }
}

/// `symbol_table["scope_map"]` / `symbol_table["data_type"]` (spec §1).
pub trait SymbolTable {
    /// Hierarchical scope path for the occurrence at `id`.
    fn scope_of(&self, id: NodeId) -> Option<Scope>;
    /// Static type string recorded for the occurrence at `id`.
    fn data_type_of(&self, id: NodeId) -> Option<&str>;
}

#[derive(Debug, Clone, Default)]
pub struct MapSymbolTable {
    pub scope_map: HashMap<NodeId, Scope>,
    pub data_type: HashMap<NodeId, String>,
}

impl SymbolTable for MapSymbolTable {
    fn scope_of(&self, id: NodeId) -> Option<Scope> {
        self.scope_map.get(&id).cloned()
    }

    fn data_type_of(&self, id: NodeId) -> Option<&str> {
        self.data_type.get(&id).map(String::as_str)
    }
}

/// `declaration_map`: use-site id -> declaration id (spec §1).
pub trait DeclarationMap {
    fn declaration_of(&self, use_site: NodeId) -> Option<NodeId>;
}

#[derive(Debug, Clone, Default)]
pub struct MapDeclarationMap(pub HashMap<NodeId, NodeId>);

impl DeclarationMap for MapDeclarationMap {
    fn declaration_of(&self, use_site: NodeId) -> Option<NodeId> {
        self.0.get(&use_site).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_index_roundtrips() {
        let key = AstKey {
            start: tree_sitter::Point { row: 0, column: 0 },
            end: tree_sitter::Point { row: 0, column: 3 },
            kind: "identifier".into(),
        };
        let mut map = MapIndex::default();
        map.0.insert(key.clone(), 42);
        assert_eq!(map.get(&key), Some(42));
    }

    #[test]
    fn scope_prefix_matches_declaration_map_chain() {
        let mut decls = MapDeclarationMap::default();
        decls.0.insert(7, 3);
        assert_eq!(decls.declaration_of(7), Some(3));
        assert_eq!(decls.declaration_of(8), None);
    }
}

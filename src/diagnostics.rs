//! The "structured diagnostic may be logged through a pluggable sink" clause
//! of spec §7: construction never raises on malformed input, but it does
//! want somewhere to say *why* a node was skipped. `Diagnostics` is that
//! somewhere; the default implementation forwards to `tracing`, matching the
//! granularity the teacher's `cfg.rs` logs at (`debug!` per node/edge,
//! `warn!`/`trace!` at skip points).

use std::fmt;

use crate::model::NodeId;

/// One of the four failure modes spec §7 enumerates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingIndex,
    UnresolvedIdentifier,
    InvalidControlStructure,
    ParserInconsistency,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SkipReason::MissingIndex => "missing index",
            SkipReason::UnresolvedIdentifier => "unresolved identifier",
            SkipReason::InvalidControlStructure => "invalid control structure",
            SkipReason::ParserInconsistency => "parser inconsistency",
        };
        f.write_str(s)
    }
}

/// A sink construction routines push skip-reasons into. `node` is the
/// AST node kind being processed, `at` is its enclosing statement's NodeId
/// when known (None if the node itself had no index entry).
pub trait DiagnosticSink {
    fn skip(&mut self, reason: SkipReason, node_kind: &str, at: Option<NodeId>);
}

/// Default sink: forwards every skip to `tracing` at `warn!` for
/// `InvalidControlStructure`/`ParserInconsistency` (these usually indicate a
/// grammar mismatch worth a human's attention) and `trace!` for the other
/// two (routine — any unresolved identifier in a partially-indexed tree hits
/// this constantly).
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn skip(&mut self, reason: SkipReason, node_kind: &str, at: Option<NodeId>) {
        match reason {
            SkipReason::InvalidControlStructure | SkipReason::ParserInconsistency => {
                tracing::warn!(target: "codeflow", %reason, node_kind, ?at, "skipped node");
            }
            SkipReason::MissingIndex | SkipReason::UnresolvedIdentifier => {
                tracing::trace!(target: "codeflow", %reason, node_kind, ?at, "skipped node");
            }
        }
    }
}

/// No-op sink for callers who don't want a `tracing` subscriber installed.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn skip(&mut self, _reason: SkipReason, _node_kind: &str, _at: Option<NodeId>) {}
}

/// `Vec`-backed collector, handy in tests that want to assert on exactly
/// which nodes were skipped and why.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink(pub Vec<(SkipReason, String, Option<NodeId>)>);

impl DiagnosticSink for RecordingSink {
    fn skip(&mut self, reason: SkipReason, node_kind: &str, at: Option<NodeId>) {
        self.0.push((reason, node_kind.to_owned(), at));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_sink_captures_skips_in_order() {
        let mut sink = RecordingSink::default();
        sink.skip(SkipReason::MissingIndex, "if_statement", None);
        sink.skip(SkipReason::UnresolvedIdentifier, "identifier", Some(5));
        assert_eq!(sink.0.len(), 2);
        assert_eq!(sink.0[0].0, SkipReason::MissingIndex);
        assert_eq!(sink.0[1].2, Some(5));
    }

    #[test]
    fn null_sink_drops_everything() {
        let mut sink = NullSink;
        sink.skip(SkipReason::ParserInconsistency, "for_statement", Some(1));
    }
}

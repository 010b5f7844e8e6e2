use thiserror::Error;

pub type EngineResult<T, E = EngineError> = Result<T, E>;

/// Errors surfaced by the small number of precondition checks worth failing
/// loudly on (spec §4.11) — a caller-side mistake, not malformed source.
/// Per-node construction failures are never modeled here: they are logged
/// through `Diagnostics` and the offending node is simply skipped (spec §7).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("tree-sitter language error: {0}")]
    Language(#[from] tree_sitter::LanguageError),

    #[error("tree-sitter query error: {0}")]
    Query(#[from] tree_sitter::QueryError),

    #[error("CST root does not match the requested language (expected {expected}, found {found})")]
    LanguageMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("{0}")]
    Msg(String),
}

impl From<&str> for EngineError {
    fn from(s: &str) -> Self {
        EngineError::Msg(s.to_owned())
    }
}

impl From<String> for EngineError {
    fn from(s: String) -> Self {
        EngineError::Msg(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_mismatch_renders_both_names() {
        let e = EngineError::LanguageMismatch {
            expected: "c",
            found: "cpp",
        };
        let msg = e.to_string();
        assert!(msg.contains("c"));
        assert!(msg.contains("cpp"));
    }

    #[test]
    fn simple_string_into_msg() {
        let e: EngineError = "bad input".into();
        assert!(matches!(e, EngineError::Msg(s) if s == "bad input"));
    }
}

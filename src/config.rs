use serde::{Deserialize, Serialize};

/// The three configuration flags `spec.md` §6 enumerates. Constructed
/// directly by the caller — there is no file-loading path here, since
/// reading a config file off disk is a CLI/I-O concern out of scope for this
/// crate (see `SPEC_FULL.md` §4.13).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Emit killed-def `lastDef` edges during DFG edge building (§4.7 step 6).
    pub last_def: bool,

    /// Pre-solve toggle for RDA: remove cross-function predecessor edges
    /// before the fixed point runs, restricting reaching-definitions to a
    /// single function body. Off by default for both C and C++ (§9 Open
    /// Question, resolved in `DESIGN.md`).
    pub intraprocedural_rda: bool,

    /// Emit the additional RDA-projected CFG where every retained edge
    /// carries a summary of the definitions flowing across it (§6 "Debug
    /// mode").
    pub debug_rda_projection: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            last_def: false,
            intraprocedural_rda: false,
            debug_rda_projection: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = EngineConfig::default();
        assert!(!cfg.last_def);
        assert!(!cfg.intraprocedural_rda);
        assert!(!cfg.debug_rda_projection);
    }

    #[test]
    fn config_is_copy_and_clone() {
        let cfg = EngineConfig {
            last_def: true,
            ..EngineConfig::default()
        };
        let copied = cfg;
        assert!(copied.last_def);
        assert!(cfg.last_def);
    }
}

//! Compiler configuration.
//!
//! Hosts embedding the compiler can adjust the dialect defaults without
//! touching source programs: the default scalar type for bare
//! identifiers, the default array base, and test mode (deterministic
//! RND/TIMER, non-suspending SLEEP). Source-level `DEFtype` and
//! `OPTION BASE` statements override these per program.

use basil_core::ScalarKind;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerConfig {
    /// Type of undeclared identifiers without a sigil.
    pub default_type: ScalarKind,
    /// Default lower bound of `DIM X(n)` arrays (0 or 1).
    pub option_base: u8,
    /// Compile programs for deterministic test execution.
    pub test_mode: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            default_type: ScalarKind::Single,
            option_base: 0,
            test_mode: false,
        }
    }
}

impl CompilerConfig {
    pub fn new() -> Self {
        CompilerConfig::default()
    }

    pub fn with_default_type(mut self, kind: ScalarKind) -> Self {
        self.default_type = kind;
        self
    }

    pub fn with_option_base(mut self, base: u8) -> Self {
        self.option_base = base;
        self
    }

    pub fn with_test_mode(mut self, test_mode: bool) -> Self {
        self.test_mode = test_mode;
        self
    }

    /// Load from a TOML document, e.g.
    ///
    /// ```toml
    /// default_type = "Integer"
    /// option_base = 1
    /// test_mode = true
    /// ```
    pub fn from_toml_str(text: &str) -> Result<Self, String> {
        let config: CompilerConfig =
            toml::from_str(text).map_err(|e| format!("invalid compiler config: {}", e))?;
        if config.option_base > 1 {
            return Err(format!("option_base must be 0 or 1, got {}", config.option_base));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_dialect() {
        let c = CompilerConfig::default();
        assert_eq!(c.default_type, ScalarKind::Single);
        assert_eq!(c.option_base, 0);
        assert!(!c.test_mode);
    }

    #[test]
    fn toml_round_trip_and_validation() {
        let c = CompilerConfig::from_toml_str(
            "default_type = \"Integer\"\noption_base = 1\ntest_mode = true\n",
        )
        .unwrap();
        assert_eq!(c.default_type, ScalarKind::Integer);
        assert_eq!(c.option_base, 1);
        assert!(c.test_mode);

        assert!(CompilerConfig::from_toml_str("option_base = 2").is_err());
        assert!(CompilerConfig::from_toml_str("no_such_key = 1").is_err());
    }
}

//! Configuration for a translation run.
use serde::{Deserialize, Serialize};

/// Settings that shape a single lex→parse→validate→lower pipeline run.
///
/// `Config` is plain data: constructing a pipeline from it never fails on
/// its own (bad values, e.g. an empty `start_symbol`, surface later as an
/// ordinary [`crate::grammar::GrammarError`] once the grammar is known).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Config {
    /// The lhs name the grammar model looks up as its start symbol.
    /// The default is `start`.
    pub start_symbol: String,
    /// The name given to the scanner description's synthetic terminal for
    /// input that matches no literal and no named pattern.
    /// The default is `__unrecognized_character__`.
    pub unrecognized_terminal_name: String,
    /// Caps how many diagnostics a single pipeline run accumulates before
    /// it stops collecting more (the error set is still reported, just
    /// truncated). `None` means no cap.
    /// The default is `None`.
    pub max_errors: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            start_symbol: "start".to_string(),
            unrecognized_terminal_name: "__unrecognized_character__".to_string(),
            max_errors: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let c = Config::default();
        assert_eq!(c.start_symbol, "start");
        assert_eq!(c.unrecognized_terminal_name, "__unrecognized_character__");
        assert_eq!(c.max_errors, None);
    }

    #[test]
    fn config_round_trips_through_json() {
        let c = Config {
            start_symbol: "document".to_string(),
            unrecognized_terminal_name: "BAD".to_string(),
            max_errors: Some(50),
        };
        let json = serde_json::to_string(&c).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(c, back);
    }
}

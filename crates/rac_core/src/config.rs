//! Compiler configuration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Strategy used to extract a set of simultaneously executable motions
/// from the motion-conflict graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingStrategy {
    /// External `redumis` subprocess (maximum independent set).
    Mis,
    /// Library maximal independent set with a deterministic seed.
    MaximalIs,
    /// Greedy first-fit over motions sorted by descending qubit distance.
    #[default]
    MaximalIsSorted,
}

impl fmt::Display for RoutingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mis => write!(f, "mis"),
            Self::MaximalIs => write!(f, "maximalis"),
            Self::MaximalIsSorted => write!(f, "maximalis_sorted"),
        }
    }
}

/// Configuration shared by every stage of the compilation pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Motion-extraction strategy for the router
    pub routing_strategy: RoutingStrategy,
    /// Row-major identity placement instead of simulated annealing
    pub trivial_layout: bool,
    /// Restore the pre-layer mapping after each Rydberg stage
    pub reverse_to_initial: bool,
    /// Cap the motion candidate list entering MIS at 1000 entries
    pub use_window: bool,
    /// Attach a full array snapshot to every emitted instruction
    pub full_code: bool,
    /// Squared-Euclidean wirelength in the placers (Euclidean otherwise)
    pub l2: bool,
    /// Gates are order-dependent: schedule ASAP instead of edge coloring
    pub dependency: bool,
    /// Run the diagnostic verifiers on scheduling and placement output
    pub verify: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            routing_strategy: RoutingStrategy::MaximalIsSorted,
            trivial_layout: false,
            reverse_to_initial: false,
            use_window: false,
            full_code: false,
            l2: false,
            dependency: false,
            verify: false,
        }
    }
}

impl CompilerConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a configuration from a JSON string.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        serde_json::from_str(json).map_err(Into::into)
    }

    /// Serializes the configuration to a JSON string.
    pub fn to_json(&self) -> crate::Result<String> {
        serde_json::to_string_pretty(self).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CompilerConfig::default();
        assert_eq!(config.routing_strategy, RoutingStrategy::MaximalIsSorted);
        assert!(!config.reverse_to_initial);
        assert!(!config.full_code);
    }

    #[test]
    fn test_json_roundtrip() {
        let mut config = CompilerConfig::default();
        config.routing_strategy = RoutingStrategy::Mis;
        config.use_window = true;

        let json = config.to_json().unwrap();
        let parsed = CompilerConfig::from_json(&json).unwrap();

        assert_eq!(parsed.routing_strategy, RoutingStrategy::Mis);
        assert!(parsed.use_window);
    }

    #[test]
    fn test_strategy_display() {
        assert_eq!(RoutingStrategy::MaximalIsSorted.to_string(), "maximalis_sorted");
        assert_eq!(RoutingStrategy::Mis.to_string(), "mis");
    }
}

//! Progress state of executable nodes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coarse lifecycle label shown for an executable node.
///
/// Transitions driven by the runner: `Dirty -> Queued -> Processing ->
/// Clean | Error`. Any state falls back to `Dirty` when an upstream value
/// changes (see `NodeGraph::value_changed`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProgressState {
    Clean,
    #[default]
    Dirty,
    Queued,
    Processing,
    Error,
}

impl ProgressState {
    /// Message displayed in the node's progress bar
    pub fn message(&self) -> &'static str {
        match self {
            ProgressState::Clean => "clean",
            ProgressState::Dirty => "dirty",
            ProgressState::Queued => "queued",
            ProgressState::Processing => "processing",
            ProgressState::Error => "error",
        }
    }

    /// Queued or processing: owned by an in-flight run
    pub fn is_busy(&self) -> bool {
        matches!(self, ProgressState::Queued | ProgressState::Processing)
    }
}

impl fmt::Display for ProgressState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl FromStr for ProgressState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "clean" => Ok(ProgressState::Clean),
            "dirty" => Ok(ProgressState::Dirty),
            "queued" => Ok(ProgressState::Queued),
            "processing" => Ok(ProgressState::Processing),
            "error" => Ok(ProgressState::Error),
            other => Err(format!("unknown progress state: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_roundtrip() {
        for state in [
            ProgressState::Clean,
            ProgressState::Dirty,
            ProgressState::Queued,
            ProgressState::Processing,
            ProgressState::Error,
        ] {
            assert_eq!(state.message().parse::<ProgressState>(), Ok(state));
        }
        assert!("busy".parse::<ProgressState>().is_err());
    }

    #[test]
    fn test_default_is_dirty() {
        assert_eq!(ProgressState::default(), ProgressState::Dirty);
        assert!(!ProgressState::Dirty.is_busy());
        assert!(ProgressState::Queued.is_busy());
    }
}

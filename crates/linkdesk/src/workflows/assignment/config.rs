use serde::{Deserialize, Serialize};

/// Tunables for the assignment planner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentConfig {
    /// Minimum evidence score (inclusive) a best-available match needs before
    /// the planner accepts it ahead of positional fallback.
    pub best_available_threshold: u8,
}

impl Default for AssignmentConfig {
    fn default() -> Self {
        Self {
            best_available_threshold: 60,
        }
    }
}

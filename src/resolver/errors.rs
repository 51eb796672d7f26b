//! Resolution error types.

use thiserror::Error;

/// Error raised by strict graph validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("cycle detected in dependency graph: {}", .members.join(" -> "))]
    Cycle { members: Vec<String> },
}

impl GraphError {
    /// Build a cycle error from the first detected cycle.
    pub fn from_cycles(cycles: &[Vec<String>]) -> Option<Self> {
        cycles.first().map(|members| GraphError::Cycle {
            members: members.clone(),
        })
    }

    /// Suggestion shown under the error by the CLI.
    pub fn help(&self) -> &'static str {
        match self {
            GraphError::Cycle { .. } => {
                "break the cycle by removing or restructuring dependencies"
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message() {
        let err = GraphError::from_cycles(&[vec!["a".into(), "b".into()]]).unwrap();
        assert_eq!(err.to_string(), "cycle detected in dependency graph: a -> b");
        assert!(GraphError::from_cycles(&[]).is_none());
    }
}

//! Error taxonomy for query rewriting
//!
//! Error codes are stable strings so wrappers can match on them.
//! Never rename a code - add new ones instead.

/// Errors raised while turning a WITH query into a nested query
///
/// Only structural failures are errors. Missing FROM/JOIN clauses, missing
/// aliases and unbalanced parentheses degrade silently instead.
#[derive(Debug, thiserror::Error)]
pub enum NestError {
    /// The component dependency graph contains a cycle (self-loops included)
    #[error("Query dependence structure contains a cycle: {}", .cycle.join(" -> "))]
    CyclicDependency {
        /// Component names along the cycle; the first name is repeated at the end
        cycle: Vec<String>,
    },

    /// The input query could not be read
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The nested query could not be written
    #[error("Failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl NestError {
    /// Get the error code as a stable string identifier
    pub fn code(&self) -> &'static str {
        match self {
            Self::CyclicDependency { .. } => "CYCLIC_DEPENDENCY",
            Self::Read { .. } => "READ_ERROR",
            Self::Write { .. } => "WRITE_ERROR",
        }
    }
}

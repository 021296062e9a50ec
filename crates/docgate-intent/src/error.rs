//! Intent engine error types.
//!
//! All interpreter subsystems surface errors through [`IntentError`].  The
//! `Display` text of the extraction variants is shown to end users as the
//! `error` of the response envelope.

/// Unified error type for the intent engine.
#[derive(Debug, thiserror::Error)]
pub enum IntentError {
    // -- Setup ---------------------------------------------------------------
    /// A built-in pattern failed to compile.
    #[error("invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: &'static str,
        #[source]
        source: regex::Error,
    },

    /// The keyword automaton could not be built.
    #[error("failed to build keyword matcher: {0}")]
    Keywords(#[from] aho_corasick::BuildError),

    // -- Extraction ----------------------------------------------------------
    /// An insert command lacks one of the required fields.
    #[error("Missing required details (name, department, city): no {field} given.")]
    MissingDetails { field: &'static str },

    /// A delete command does not name the employee.
    #[error("Missing employee name.")]
    MissingName,

    /// A numeric token does not fit the supported range.
    #[error("invalid number `{text}`")]
    InvalidNumber { text: String },
}

/// Convenience alias used throughout the intent crate.
pub type Result<T> = std::result::Result<T, IntentError>;

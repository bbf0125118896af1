//! Errors for the element tree store.

/// Errors returned by container operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// No element resolved at the given path.
    #[error("not found at `{path}`: {detail}")]
    NotFound {
        /// The path that failed to resolve
        path: String,
        /// What was missing (segment, value, or kind mismatch)
        detail: String,
    },
    /// An element with the same `idShort` already exists among siblings.
    #[error("element `{id_short}` already exists")]
    Conflict {
        /// The duplicate `idShort`
        id_short: String,
    },
    /// A required input was empty or malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl StoreError {
    /// A `NotFound` for a path segment that does not resolve.
    #[must_use]
    pub fn missing(path: &str, segment: &str) -> Self {
        Self::NotFound {
            path: path.to_string(),
            detail: format!("no element `{segment}`"),
        }
    }

    /// A `NotFound` for a node that exists but carries no value.
    #[must_use]
    pub fn no_value(path: &str) -> Self {
        Self::NotFound {
            path: path.to_string(),
            detail: "node carries no element value".to_string(),
        }
    }
}

/// A typed retrieval found an element of a different kind.
///
/// Kept separate from a missing path so callers can tell "nothing
/// there" apart from "something else there".
#[derive(Debug, Clone, thiserror::Error)]
#[error("element is {found}, not {expected}")]
pub struct KindMismatch {
    /// The kind the caller asked for
    pub expected: &'static str,
    /// The kind actually stored
    pub found: &'static str,
}

impl KindMismatch {
    /// Create a new mismatch record.
    #[must_use]
    pub fn new(expected: &'static str, found: &'static str) -> Self {
        Self { expected, found }
    }
}

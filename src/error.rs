//! Error type shared by the thought model, the graph index and the host seam.

use std::path::PathBuf;
use thiserror::Error;

/// Error type for thought and index operations
#[derive(Debug, Error)]
pub enum GhostError {
    /// A mutating call received a thought that has no host-assigned id yet
    #[error("Thought has no id; publish it to a host before indexing")]
    MissingIdentifier,

    /// An id (or backup path) that the index does not know about
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid status '{0}'. Must be one of: new, processing, complete, evolving")]
    InvalidStatus(String),

    /// One or both endpoints of a link are absent from the index
    #[error("{}", endpoints_message(.from, .to, .from_missing, .to_missing))]
    InvalidRelationshipEndpoints {
        from: String,
        to: String,
        from_missing: bool,
        to_missing: bool,
    },

    /// Empty link types and the reserved lineage types cannot be used for links
    #[error("Invalid relationship type '{0}': must be non-empty and not evolved_to/evolved_from")]
    InvalidRelationship(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The snapshot (or a backup) could not be decoded
    #[error("Corrupt snapshot at {}: {source}", .path.display())]
    CorruptSnapshot {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A hosted document with no files, or an embedded JSON body that does not decode
    #[error("Malformed document {id}: {reason}")]
    MalformedDocument { id: String, reason: String },

    #[error("Failed to persist {}: {source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

fn endpoints_message(from: &str, to: &str, from_missing: &bool, to_missing: &bool) -> String {
    match (*from_missing, *to_missing) {
        (true, true) => format!(
            "Both thoughts {} and {} do not exist. Run 'gistghost list' to see indexed thoughts.",
            from, to
        ),
        (true, false) => format!(
            "Source thought {} does not exist. Run 'gistghost list' to see indexed thoughts.",
            from
        ),
        _ => format!(
            "Target thought {} does not exist. Run 'gistghost list' to see indexed thoughts.",
            to
        ),
    }
}

impl GhostError {
    pub(crate) fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GhostError::Persistence {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, GhostError>;

use std::collections::BTreeSet;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for registry loading and group builds.
///
/// Every variant raised while a group is being built aborts that build; no partial
/// document is ever returned.
#[derive(Error, Debug)]
pub enum Error {
    /// An operation in the document has no registered handler.
    #[error("operation handler not found for operation `{operation_id}` at {path}")]
    HandlerNotFound { operation_id: String, path: String },

    /// Several declaring types assign different orders to the same tag.
    #[error("multiple orders for tag `{tag}`: {orders:?}")]
    ConflictingTagOrder { tag: String, orders: BTreeSet<i32> },

    /// A handler type is declared more than once with different orders.
    #[error("multiple orders for handler type `{declaring_type}`: {orders:?}")]
    ConflictingTypeOrder {
        declaring_type: String,
        orders: BTreeSet<i32>,
    },

    /// The same operation id is registered by more than one manifest entry.
    #[error("handler for operation `{operation_id}` registered twice ({first} and {second})")]
    DuplicateHandler {
        operation_id: String,
        first: String,
        second: String,
    },

    #[error("invalid group configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown documentation group `{0}`")]
    UnknownGroup(String),

    /// A pipeline pass failed; wraps the underlying cause with the pass name.
    #[error("pass `{pass}` failed: {source}")]
    Pass {
        pass: &'static str,
        #[source]
        source: Box<Error>,
    },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid handler manifest {}: {source}", .path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Returns the innermost error, unwrapping any pass context.
    pub fn root(&self) -> &Error {
        match self {
            Error::Pass { source, .. } => source.root(),
            other => other,
        }
    }
}

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the helper core.
#[derive(Debug, Error)]
pub enum Error {
    /// Unparseable or unexpected protocol input.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Object framing is broken (missing NUL, bad length, bad header field).
    #[error("malformed object header: {0}")]
    MalformedHeader(String),

    /// A tree entry is truncated or overruns the payload.
    #[error("malformed tree: {0}")]
    MalformedTree(String),

    /// Header names a kind other than commit, tree, blob or tag.
    #[error("unknown object kind: {0}")]
    UnknownKind(String),

    #[error("object not found: {0}")]
    ObjectNotFound(String),

    /// The dependency graph loops back on itself or is deeper than allowed.
    #[error("cycle detected: {0}")]
    CycleDetected(String),

    #[error("store I/O error on {path:?}: {source}")]
    StoreIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reserved for optimistic concurrency control on refs.
    #[allow(dead_code)]
    #[error("ref conflict on {0}")]
    RefConflict(String),

    /// Content hash does not match the id it was stored under.
    #[error("hash mismatch: expected {expected}, content hashes to {actual}")]
    HashMismatch { expected: String, actual: String },

    /// The host `git` invocation failed.
    #[error("git error: {0}")]
    Git(String),

    #[error("ref table is corrupt: {0}")]
    RefTable(#[from] serde_json::Error),
}

impl Error {
    pub fn store_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::StoreIo {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

//! Error types for generated file output.

use std::path::PathBuf;

/// Errors raised while producing generated files.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    /// A generated file or its temporary sibling could not be written.
    #[error("cannot write {path}: {source}")]
    Io {
        /// The file being written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A rule was requested without a target.
    #[error("rule has no target (comment: {comment:?})")]
    EmptyTarget {
        /// The rule's comment, to identify it.
        comment: Option<String>,
    },
}

//! Error types for source scanning.

use std::path::PathBuf;

/// Errors that abort scanning of a source.
///
/// Any of these fails the generation pass of the owning target: a scan that
/// cannot complete must never be mistaken for a source without dependencies.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// A source or included file could not be read.
    #[error("cannot open {path}: {source}")]
    Open {
        /// The file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A module-language source is not a well-formed translation unit.
    #[error("{path}:{line}: {reason}")]
    Parse {
        /// The file containing the error.
        path: PathBuf,
        /// 1-based line of the error.
        line: u32,
        /// What is wrong.
        reason: String,
    },

    /// An include matching the complain pattern was not found anywhere.
    #[error("cannot find include file \"{include}\" included from {path}")]
    MissingInclude {
        /// The file containing the include directive.
        path: PathBuf,
        /// The include name as written.
        include: String,
    },

    /// A configured include pattern is not a valid regular expression.
    #[error("invalid include pattern \"{pattern}\": {reason}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// The regex compiler's message.
        reason: String,
    },

    /// The predefined macro query could not be run.
    #[error("predefined macro query `{command}` failed: {reason}")]
    MacroQuery {
        /// The command line that was run.
        command: String,
        /// Why it failed.
        reason: String,
    },

    /// A scanner cache file could not be written.
    #[error("cannot write {path}: {source}")]
    Io {
        /// The file being written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

impl ScanError {
    /// The file the error is about, when there is one.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            ScanError::Open { path, .. }
            | ScanError::Parse { path, .. }
            | ScanError::MissingInclude { path, .. }
            | ScanError::Io { path, .. } => Some(path),
            ScanError::InvalidPattern { .. } | ScanError::MacroQuery { .. } => None,
        }
    }

    /// The 1-based line the error is about, for parse errors.
    pub fn line(&self) -> Option<u32> {
        match self {
            ScanError::Parse { line, .. } => Some(*line),
            _ => None,
        }
    }
}

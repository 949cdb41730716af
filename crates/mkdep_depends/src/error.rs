//! Error types for dependency generation.

use std::path::PathBuf;

use mkdep_config::ConfigError;
use mkdep_diagnostics::code::{
    INVALID_DESCRIPTOR, IO_FAILED, MISSING_INCLUDE, MODULE_COLLISION, SCAN_FAILED,
};
use mkdep_diagnostics::{Diagnostic, Location};
use mkdep_make::WriteError;
use mkdep_scan::ScanError;

/// Errors that abort the generation pass of one target.
///
/// When a pass fails with any of these, the previous `depend.make` and
/// `depend.internal` of the target are left as they were.
#[derive(Debug, thiserror::Error)]
pub enum DependsError {
    /// A source could not be scanned.
    #[error(transparent)]
    Scan(ScanError),

    /// Two sources of the target provide the same module.
    #[error("module '{module}' is provided by both {} and {}", first.display(), second.display())]
    NameCollision {
        /// The module name, lower case.
        module: String,
        /// The source that declared it first.
        first: PathBuf,
        /// The source that declared it again.
        second: PathBuf,
    },

    /// A file could not be read or written.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A descriptor could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The compiler's predefined macros could not be queried.
    #[error("predefined macro query `{command}` failed: {reason}")]
    MacroQuery {
        /// The command line that was run.
        command: String,
        /// Why it failed.
        reason: String,
    },

    /// A generated file could not be written.
    #[error(transparent)]
    Write(#[from] WriteError),

    /// Neither spelling of a compiled module file exists.
    #[error("cannot find module file: tried {} and {}", upper.display(), lower.display())]
    MissingModule {
        /// The upper-case file name that was tried.
        upper: PathBuf,
        /// The lower-case file name that was tried.
        lower: PathBuf,
    },
}

impl From<ScanError> for DependsError {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::MacroQuery { command, reason } => DependsError::MacroQuery { command, reason },
            other => DependsError::Scan(other),
        }
    }
}

impl DependsError {
    /// Converts the error into a diagnostic naming the offending file.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            DependsError::Scan(err) => {
                let code = match err {
                    ScanError::MissingInclude { .. } => MISSING_INCLUDE,
                    _ => SCAN_FAILED,
                };
                let diag = Diagnostic::error(code, err.to_string());
                match (err.path(), err.line()) {
                    (Some(path), Some(line)) => diag.at(Location::line(path, line)),
                    (Some(path), None) => diag.at(Location::file(path)),
                    _ => diag,
                }
            }
            DependsError::NameCollision {
                module,
                first,
                second,
            } => Diagnostic::error(
                MODULE_COLLISION,
                format!("module '{module}' is provided by more than one source"),
            )
            .at(Location::file(second))
            .with_note(format!("also provided by {}", first.display())),
            DependsError::Io { path, .. } => {
                Diagnostic::error(IO_FAILED, self.to_string()).at(Location::file(path))
            }
            DependsError::Write(WriteError::Io { path, .. }) => {
                Diagnostic::error(IO_FAILED, self.to_string()).at(Location::file(path))
            }
            DependsError::Write(_) | DependsError::MissingModule { .. } => {
                Diagnostic::error(IO_FAILED, self.to_string())
            }
            DependsError::Config(_) => Diagnostic::error(INVALID_DESCRIPTOR, self.to_string()),
            DependsError::MacroQuery { .. } => Diagnostic::error(SCAN_FAILED, self.to_string()),
        }
    }
}

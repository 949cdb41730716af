//! Error types for descriptor loading and validation.

use std::path::PathBuf;

/// Errors that can occur when loading or validating a descriptor file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An I/O error occurred while reading a descriptor file.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The descriptor that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse descriptor: {0}")]
    Parse(String),

    /// A required field is missing or empty.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// A descriptor value failed validation.
    #[error("validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_missing_field() {
        let err = ConfigError::MissingField("name".to_string());
        assert_eq!(format!("{err}"), "missing required field: name");
    }

    #[test]
    fn display_parse_error() {
        let err = ConfigError::Parse("expected '=' at line 3".to_string());
        assert_eq!(
            format!("{err}"),
            "failed to parse descriptor: expected '=' at line 3"
        );
    }

    #[test]
    fn display_io_error() {
        let err = ConfigError::Io {
            path: PathBuf::from("/b/MkdepFiles/app.dir/DependInfo.toml"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        };
        let display = format!("{err}");
        assert!(display.starts_with("failed to read /b/MkdepFiles/app.dir/DependInfo.toml"));
    }
}

//! Descriptor file loading and validation.

use crate::error::ConfigError;
use crate::types::{DirectoryInfo, TargetInfo};
use std::path::Path;

/// File name of the per-directory descriptor.
pub const DIRECTORY_INFO_FILE: &str = "DirectoryInformation.toml";

/// File name of the per-target descriptor.
pub const TARGET_INFO_FILE: &str = "DependInfo.toml";

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Loads and validates a `DirectoryInformation.toml` file.
pub fn load_directory_info(path: &Path) -> Result<DirectoryInfo, ConfigError> {
    load_directory_info_from_str(&read(path)?)
}

/// Parses and validates a directory descriptor from a string.
pub fn load_directory_info_from_str(content: &str) -> Result<DirectoryInfo, ConfigError> {
    let info: DirectoryInfo =
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
    validate_directory_info(&info)?;
    Ok(info)
}

/// Loads and validates a `DependInfo.toml` file.
pub fn load_target_info(path: &Path) -> Result<TargetInfo, ConfigError> {
    load_target_info_from_str(&read(path)?)
}

/// Parses and validates a target descriptor from a string.
pub fn load_target_info_from_str(content: &str) -> Result<TargetInfo, ConfigError> {
    let info: TargetInfo =
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
    validate_target_info(&info)?;
    Ok(info)
}

fn validate_directory_info(info: &DirectoryInfo) -> Result<(), ConfigError> {
    if info.source_dir.as_os_str().is_empty() {
        return Err(ConfigError::MissingField("source_dir".to_string()));
    }
    if info.binary_dir.as_os_str().is_empty() {
        return Err(ConfigError::MissingField("binary_dir".to_string()));
    }
    if !info.binary_dir.is_absolute() || !info.source_dir.is_absolute() {
        return Err(ConfigError::Validation(
            "source_dir and binary_dir must be absolute".to_string(),
        ));
    }
    if info.tool_command.trim().is_empty() {
        return Err(ConfigError::MissingField("tool_command".to_string()));
    }
    Ok(())
}

fn validate_target_info(info: &TargetInfo) -> Result<(), ConfigError> {
    if info.name.is_empty() {
        return Err(ConfigError::MissingField("name".to_string()));
    }
    for source in &info.sources {
        if source.path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(format!(
                "target '{}' lists a source without a path",
                info.name
            )));
        }
        if source.object.as_os_str().is_empty() {
            return Err(ConfigError::Validation(format!(
                "source '{}' has no object file",
                source.path.display()
            )));
        }
    }
    Ok(())
}

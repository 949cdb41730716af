//! Parsing and validation of the descriptors handed to mkdep by the configure step.
//!
//! Two TOML files drive a generation pass: the per-directory
//! `DirectoryInformation.toml` ([`DirectoryInfo`]) and the per-target
//! `DependInfo.toml` ([`TargetInfo`]). Their modification times also take part in
//! staleness decisions, so this crate only reads them and never rewrites them.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{
    load_directory_info, load_directory_info_from_str, load_target_info,
    load_target_info_from_str, DIRECTORY_INFO_FILE, TARGET_INFO_FILE,
};
pub use resolve::{resolve_target, ResolvedSource, ResolvedTarget};
pub use types::*;

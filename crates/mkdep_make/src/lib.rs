//! Make-syntax text generation for mkdep.
//!
//! Converts paths into the exact spelling a `make` dialect expects and writes
//! generated files without needless timestamp bumps:
//!
//! - [`ShellDialect`] captures the quoting and path rules of one `make`
//!   flavour, chosen once from the directory descriptor.
//! - [`PathNormalizer`] relativizes paths inside the configured top
//!   directories and escapes them for rule positions.
//! - [`RuleWriter`] writes rules with one prerequisite per line.
//! - [`generated`] stages files in temporary siblings and replaces the
//!   target only when content changed.

#![warn(missing_docs)]

pub mod dialect;
pub mod error;
pub mod generated;
pub mod path;
pub mod path_cache;
pub mod rule;

pub use dialect::ShellDialect;
pub use error::WriteError;
pub use generated::{disclaimer, StagedFile, WriteMode};
pub use path::PathNormalizer;
pub use path_cache::PathCache;
pub use rule::{MakeRule, RuleWriter};

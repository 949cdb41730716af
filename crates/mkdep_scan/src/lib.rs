//! Per-language dependency scanners for mkdep.
//!
//! A [`Scanner`] turns one source file into a [`SourceInfo`]: the headers it
//! transitively includes and, for module languages, the modules it provides
//! and requires. Two implementations exist:
//!
//! - [`CFamilyScanner`] follows `#include` lines textually through the
//!   directory of the including file and the include path, backed by a
//!   persistent per-language [`IncludeCache`].
//! - [`FortranScanner`] lexes free- and fixed-form Fortran, tracks
//!   preprocessor conditional state, and records `MODULE`/`USE`/`SUBMODULE`
//!   statements.

#![warn(missing_docs)]

pub mod cfamily;
pub mod error;
pub mod fortran;
pub mod include_cache;
pub mod include_chain;
pub mod macros;
pub mod scanner;
pub mod source_info;

pub use cfamily::CFamilyScanner;
pub use error::ScanError;
pub use fortran::FortranScanner;
pub use include_cache::{CachedInclude, IncludeCache};
pub use macros::{MacroQuery, ProcessMacroQuery};
pub use scanner::Scanner;
pub use source_info::SourceInfo;

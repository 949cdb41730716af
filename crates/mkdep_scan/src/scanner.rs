//! The scanner capability shared by all languages.

use crate::error::ScanError;
use crate::source_info::SourceInfo;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Scans one source for what it depends on.
///
/// Implementations may keep caches across calls within one generation pass;
/// they are created per target and language and dropped with the pass.
pub trait Scanner {
    /// Scans `source`, resolving includes through `search_paths` in order.
    ///
    /// `macros` is the set of preprocessor symbols considered defined. A
    /// source that cannot be read, or a module-language source that does not
    /// parse, is an error rather than an empty result.
    fn scan(
        &mut self,
        source: &Path,
        search_paths: &[PathBuf],
        macros: &BTreeSet<String>,
    ) -> Result<SourceInfo, ScanError>;
}

//! The per-source scan result.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// What one source file depends on.
///
/// For C-family sources `includes` holds every transitively included header
/// that was found; `requires` and `provides` stay empty. For module languages
/// `includes` holds files pulled in with `INCLUDE`/`#include`, `requires` the
/// lower-cased names of used modules and `provides` the lower-cased names of
/// modules defined here.
///
/// A module both provided and required by the same source is not a
/// requirement: construction removes it from `requires`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    source: PathBuf,
    includes: BTreeSet<PathBuf>,
    requires: BTreeSet<String>,
    provides: BTreeSet<String>,
}

impl SourceInfo {
    /// Builds a scan result, filtering self-provided modules out of `requires`.
    pub fn new(
        source: PathBuf,
        includes: BTreeSet<PathBuf>,
        mut requires: BTreeSet<String>,
        provides: BTreeSet<String>,
    ) -> Self {
        requires.retain(|m| !provides.contains(m));
        Self {
            source,
            includes,
            requires,
            provides,
        }
    }

    /// A C-family result with no module information.
    pub fn with_includes(source: PathBuf, includes: BTreeSet<PathBuf>) -> Self {
        Self::new(source, includes, BTreeSet::new(), BTreeSet::new())
    }

    /// The scanned source.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Files this source includes, directly or transitively.
    pub fn includes(&self) -> &BTreeSet<PathBuf> {
        &self.includes
    }

    /// Modules used but not defined by this source.
    pub fn requires(&self) -> &BTreeSet<String> {
        &self.requires
    }

    /// Modules defined by this source.
    pub fn provides(&self) -> &BTreeSet<String> {
        &self.provides
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn self_provided_modules_are_not_required() {
        let info = SourceInfo::new(
            PathBuf::from("/src/m.f90"),
            BTreeSet::new(),
            set(&["alpha", "beta"]),
            set(&["alpha"]),
        );
        assert_eq!(info.requires(), &set(&["beta"]));
        assert_eq!(info.provides(), &set(&["alpha"]));
        assert!(info.requires().is_disjoint(info.provides()));
    }

    #[test]
    fn c_family_has_no_modules() {
        let includes: BTreeSet<PathBuf> = [PathBuf::from("/src/a.h")].into_iter().collect();
        let info = SourceInfo::with_includes(PathBuf::from("/src/a.cpp"), includes);
        assert_eq!(info.source(), Path::new("/src/a.cpp"));
        assert_eq!(info.includes().len(), 1);
        assert!(info.requires().is_empty());
        assert!(info.provides().is_empty());
    }
}

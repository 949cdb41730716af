//! Modules provided and required by one target.

use std::collections::BTreeMap;
use std::path::PathBuf;

use mkdep_scan::SourceInfo;

use crate::error::DependsError;

/// Where a required module comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleLocation {
    /// Not found; the compiler is expected to find it on its own path.
    Unresolved,
    /// Provided by this target or a linked one; tracked through its stamp.
    Stamp(PathBuf),
    /// A compiled module file found in the include path.
    ModuleFile(PathBuf),
}

/// The modules of one target during a generation pass.
///
/// Built by folding in every scanned source, then resolved once.
#[derive(Debug, Default)]
pub struct ModuleLedger {
    provides: BTreeMap<String, PathBuf>,
    requires: BTreeMap<String, ModuleLocation>,
}

impl ModuleLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the provides and requires of one scanned source.
    ///
    /// Fails if a module it provides is already provided by another source.
    pub fn add_source(&mut self, info: &SourceInfo) -> Result<(), DependsError> {
        for module in info.provides() {
            match self.provides.get(module) {
                Some(first) if first != info.source() => {
                    return Err(DependsError::NameCollision {
                        module: module.clone(),
                        first: first.clone(),
                        second: info.source().to_path_buf(),
                    });
                }
                Some(_) => {}
                None => {
                    self.provides
                        .insert(module.clone(), info.source().to_path_buf());
                }
            }
        }
        for module in info.requires() {
            self.requires
                .entry(module.clone())
                .or_insert(ModuleLocation::Unresolved);
        }
        Ok(())
    }

    /// Every module this target provides, in name order.
    pub fn target_provides(&self) -> impl Iterator<Item = &str> {
        self.provides.keys().map(String::as_str)
    }

    /// Returns `true` if a source of this target provides `module`.
    pub fn provides_locally(&self, module: &str) -> bool {
        self.provides.contains_key(module)
    }

    /// Every module required by some source, with its location.
    pub fn target_requires(&self) -> impl Iterator<Item = (&str, &ModuleLocation)> {
        self.requires.iter().map(|(m, l)| (m.as_str(), l))
    }

    /// The location of a required module.
    pub fn location(&self, module: &str) -> Option<&ModuleLocation> {
        self.requires.get(module)
    }

    /// Required modules not located yet.
    pub fn unresolved(&self) -> impl Iterator<Item = &str> {
        self.requires
            .iter()
            .filter(|(_, l)| **l == ModuleLocation::Unresolved)
            .map(|(m, _)| m.as_str())
    }

    /// Sets the location of `module` if it is required and still unresolved.
    /// Returns `true` if the location was set.
    pub(crate) fn locate(&mut self, module: &str, location: ModuleLocation) -> bool {
        match self.requires.get_mut(module) {
            Some(slot) if *slot == ModuleLocation::Unresolved => {
                *slot = location;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn info(source: &str, requires: &[&str], provides: &[&str]) -> SourceInfo {
        SourceInfo::new(
            PathBuf::from(source),
            BTreeSet::new(),
            requires.iter().map(|s| s.to_string()).collect(),
            provides.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn collects_provides_and_requires() {
        let mut ledger = ModuleLedger::new();
        ledger.add_source(&info("/src/a.f90", &[], &["alpha"])).unwrap();
        ledger
            .add_source(&info("/src/b.f90", &["alpha", "beta"], &[]))
            .unwrap();
        assert_eq!(ledger.target_provides().collect::<Vec<_>>(), vec!["alpha"]);
        assert!(ledger.provides_locally("alpha"));
        assert!(!ledger.provides_locally("beta"));
        assert_eq!(ledger.unresolved().collect::<Vec<_>>(), vec!["alpha", "beta"]);
    }

    #[test]
    fn same_module_in_two_sources_collides() {
        let mut ledger = ModuleLedger::new();
        ledger.add_source(&info("/src/a.f90", &[], &["foo"])).unwrap();
        let err = ledger
            .add_source(&info("/src/b.f90", &[], &["foo"]))
            .unwrap_err();
        match err {
            DependsError::NameCollision {
                module,
                first,
                second,
            } => {
                assert_eq!(module, "foo");
                assert_eq!(first, PathBuf::from("/src/a.f90"));
                assert_eq!(second, PathBuf::from("/src/b.f90"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn locate_only_fills_unresolved() {
        let mut ledger = ModuleLedger::new();
        ledger.add_source(&info("/src/b.f90", &["alpha"], &[])).unwrap();
        assert!(ledger.locate("alpha", ModuleLocation::Stamp(PathBuf::from("/t1/alpha.mod.stamp"))));
        assert!(!ledger.locate("alpha", ModuleLocation::Stamp(PathBuf::from("/t2/alpha.mod.stamp"))));
        assert!(!ledger.locate("gamma", ModuleLocation::Unresolved));
        assert_eq!(
            ledger.location("alpha"),
            Some(&ModuleLocation::Stamp(PathBuf::from("/t1/alpha.mod.stamp")))
        );
    }
}

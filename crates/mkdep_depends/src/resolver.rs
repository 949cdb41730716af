//! Locating the modules a target requires.
//!
//! A required module is looked up, in order:
//!
//! 1. among the modules this target provides;
//! 2. in the export manifests of linked targets, in link order, first
//!    manifest wins;
//! 3. as `<name>.mod` or `<NAME>.mod` in the include path.
//!
//! Modules found by 1 or 2 are tracked through the providing target's stamp
//! file. Anything left is assumed to come from the compiler's own module
//! path and does not become a dependency.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use mkdep_diagnostics::code::UNRESOLVED_MODULE;
use mkdep_diagnostics::{Diagnostic, DiagnosticSink};

use crate::ledger::{ModuleLedger, ModuleLocation};

/// File name of a target's module export manifest.
pub const MANIFEST_FILE: &str = "fortran.internal";

/// The stamp file tracking `module` in `stamp_dir`.
pub fn stamp_file(stamp_dir: &Path, module: &str) -> PathBuf {
    stamp_dir.join(format!("{}.mod.stamp", module.to_lowercase()))
}

/// The proxy target sequencing consumers of `module` after its producer.
pub fn proxy_target(stamp_dir: &Path, module: &str) -> PathBuf {
    stamp_dir.join(format!("{}.mod.proxy", module.to_lowercase()))
}

/// The modules exported by one target, as recorded in its manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvidesManifest {
    stamp_dir: PathBuf,
    modules: BTreeSet<String>,
}

impl ProvidesManifest {
    /// A manifest of `modules` whose stamps live in `stamp_dir`.
    pub fn new(stamp_dir: PathBuf, modules: BTreeSet<String>) -> Self {
        Self { stamp_dir, modules }
    }

    /// Parses manifest text. Modules are listed one per line, indented by a
    /// single space, under a `provides` line.
    pub fn parse(text: &str, stamp_dir: PathBuf) -> Self {
        let mut modules = BTreeSet::new();
        let mut in_provides = false;
        for line in text.lines() {
            let line = line.trim_end_matches('\r');
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(module) = line.strip_prefix(' ') {
                if in_provides && !module.is_empty() {
                    modules.insert(module.to_string());
                }
            } else {
                in_provides = line == "provides";
            }
        }
        Self { stamp_dir, modules }
    }

    /// Loads the manifest in `target_dir`, if it exists.
    pub fn load(target_dir: &Path) -> Option<Self> {
        let path = target_dir.join(MANIFEST_FILE);
        match fs::read_to_string(&path) {
            Ok(text) => Some(Self::parse(&text, target_dir.to_path_buf())),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "no module manifest");
                None
            }
        }
    }

    /// Renders manifest text for `modules`.
    pub fn render<'a>(modules: impl IntoIterator<Item = &'a str>) -> String {
        let mut out = String::from("# The fortran modules provided by this target.\nprovides\n");
        for module in modules {
            let _ = writeln!(out, " {module}");
        }
        out
    }

    /// Directory holding the exporting target's stamps.
    pub fn stamp_dir(&self) -> &Path {
        &self.stamp_dir
    }

    /// Returns `true` if the target exports `module`.
    pub fn provides(&self, module: &str) -> bool {
        self.modules.contains(module)
    }

    /// The exported modules, in name order.
    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(String::as_str)
    }
}

/// Looks for `<module>.mod` then `<MODULE>.mod` in each include directory.
pub fn find_module_file(module: &str, include_paths: &[PathBuf]) -> Option<PathBuf> {
    let lower = format!("{module}.mod");
    let upper = format!("{}.mod", module.to_uppercase());
    include_paths
        .iter()
        .flat_map(|dir| [dir.join(&lower), dir.join(&upper)])
        .find(|candidate| candidate.is_file())
}

/// Resolves every required module of `ledger`.
///
/// `stamp_dir` is this target's stamp directory; `manifests` are those of
/// linked targets in link order. Modules left unresolved are reported to
/// `sink` as warnings.
pub fn resolve(
    ledger: &mut ModuleLedger,
    stamp_dir: &Path,
    manifests: &[ProvidesManifest],
    include_paths: &[PathBuf],
    sink: &DiagnosticSink,
) {
    let required: Vec<String> = ledger.unresolved().map(str::to_string).collect();
    for module in required {
        if ledger.provides_locally(&module) {
            ledger.locate(&module, ModuleLocation::Stamp(stamp_file(stamp_dir, &module)));
            continue;
        }
        if let Some(manifest) = manifests.iter().find(|m| m.provides(&module)) {
            tracing::debug!(
                module = %module,
                stamp_dir = %manifest.stamp_dir().display(),
                "module provided by linked target"
            );
            ledger.locate(
                &module,
                ModuleLocation::Stamp(stamp_file(manifest.stamp_dir(), &module)),
            );
            continue;
        }
        if let Some(file) = find_module_file(&module, include_paths) {
            ledger.locate(&module, ModuleLocation::ModuleFile(file));
            continue;
        }
        sink.emit(
            Diagnostic::warning(
                UNRESOLVED_MODULE,
                format!("module '{module}' is not provided by this target or any linked target"),
            )
            .with_note("assuming the compiler finds it on its own module path"),
        );
    }
}

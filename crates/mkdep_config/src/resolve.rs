//! Resolution of a target descriptor against its directory descriptor.
//!
//! Produces absolute, lexically collapsed paths for every source, object, and
//! include directory so downstream stages never have to know which tree a
//! relative path was written against.

use crate::error::ConfigError;
use crate::types::{DirectoryInfo, Language, TargetInfo, TargetKind};
use mkdep_common::paths::join_collapsed;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// A source file with absolute paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    /// Absolute source path.
    pub path: PathBuf,
    /// Absolute object path.
    pub object: PathBuf,
    /// The language the source is compiled as.
    pub language: Language,
}

/// A fully resolved target ready for a generation pass.
#[derive(Debug, Clone)]
pub struct ResolvedTarget {
    /// Target name.
    pub name: String,
    /// Artifact kind.
    pub kind: TargetKind,
    /// The target directory holding `DependInfo.toml` and the generated files.
    pub target_dir: PathBuf,
    /// The `DependInfo.toml` this target was loaded from.
    pub info_file: PathBuf,
    /// Sources in descriptor order.
    pub sources: Vec<ResolvedSource>,
    /// Absolute include search path, in search order.
    pub include_paths: Vec<PathBuf>,
    /// Defined preprocessor symbol names.
    pub defines: BTreeSet<String>,
    /// Absolute `DependInfo.toml` paths of linked targets, in link order.
    pub linked_info_files: Vec<PathBuf>,
    /// Fortran compiler family identifier, if known.
    pub compiler_id: Option<String>,
    /// Directory `.mod` files are written to.
    pub module_dir: PathBuf,
    /// Command printing the compiler's predefined macros.
    pub predefined_macros_command: Vec<String>,
}

impl ResolvedTarget {
    /// Sources compiled as `language`, in descriptor order.
    pub fn sources_for(&self, language: Language) -> impl Iterator<Item = &ResolvedSource> {
        self.sources.iter().filter(move |s| s.language == language)
    }

    /// The distinct languages of this target, in a stable order.
    pub fn languages(&self) -> BTreeSet<Language> {
        self.sources.iter().map(|s| s.language).collect()
    }
}

/// Resolves `target` (loaded from `info_file`) against `dir`.
///
/// Source paths are taken relative to the source directory; object, include,
/// module, and linked-info paths relative to the build directory.
pub fn resolve_target(
    target: &TargetInfo,
    dir: &DirectoryInfo,
    info_file: &Path,
) -> Result<ResolvedTarget, ConfigError> {
    let target_dir = info_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .ok_or_else(|| {
            ConfigError::Validation(format!(
                "target info file {} has no parent directory",
                info_file.display()
            ))
        })?;

    let mut seen_objects = BTreeSet::new();
    let mut sources = Vec::with_capacity(target.sources.len());
    for entry in &target.sources {
        let object = join_collapsed(&dir.binary_dir, &entry.object);
        if !seen_objects.insert(object.clone()) {
            return Err(ConfigError::Validation(format!(
                "object {} is produced by more than one source",
                object.display()
            )));
        }
        sources.push(ResolvedSource {
            path: join_collapsed(&dir.source_dir, &entry.path),
            object,
            language: entry.language,
        });
    }

    let include_paths = target
        .include_paths
        .iter()
        .map(|p| join_collapsed(&dir.binary_dir, p))
        .collect();
    let linked_info_files = target
        .linked_info_files
        .iter()
        .map(|p| join_collapsed(&dir.binary_dir, p))
        .collect();
    let module_dir = match &target.fortran.module_dir {
        Some(p) => join_collapsed(&dir.binary_dir, p),
        None => dir.binary_dir.clone(),
    };

    Ok(ResolvedTarget {
        name: target.name.clone(),
        kind: target.kind,
        target_dir,
        info_file: info_file.to_path_buf(),
        sources,
        include_paths,
        defines: target.defined_symbols(),
        linked_info_files,
        compiler_id: target
            .fortran
            .compiler_id
            .clone()
            .filter(|id| !id.is_empty()),
        module_dir,
        predefined_macros_command: target.fortran.predefined_macros_command.clone(),
    })
}

//! End-to-end scenarios for mkdep dependency generation.
//!
//! Provides a throwaway source and build tree with helpers for writing
//! descriptors, running generation passes and moving file timestamps around.
//! The scenarios themselves live in `tests/`.

#![warn(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use mkdep_depends::{
    DependencyStore, DependsError, DependsGenerator, GenerationReport, LoadedTarget, RescanPlan,
};
use mkdep_diagnostics::{Diagnostic, DiagnosticSink};
use mkdep_scan::ProcessMacroQuery;

/// Directory of per-target subdirectories, relative to the build directory.
pub const FILES_DIR: &str = "MkdepFiles";

/// A source tree under `src/` and a build tree under `build/`.
pub struct BuildTree {
    dir: tempfile::TempDir,
}

/// The outcome of one generation pass.
pub struct Pass {
    /// The report, or the error that aborted the pass.
    pub result: Result<GenerationReport, DependsError>,
    /// Diagnostics emitted during the pass.
    pub diagnostics: Vec<Diagnostic>,
}

impl Pass {
    /// The report of a successful pass.
    ///
    /// # Panics
    ///
    /// Panics if the pass failed.
    pub fn report(self) -> GenerationReport {
        match self.result {
            Ok(report) => report,
            Err(e) => panic!("generation failed: {e}"),
        }
    }
}

impl BuildTree {
    /// Creates an empty tree with a default directory descriptor.
    pub fn new() -> Self {
        Self::with_directory_extra("")
    }

    /// Creates an empty tree whose directory descriptor ends with `extra`.
    pub fn with_directory_extra(extra: &str) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let tree = Self { dir };
        fs::create_dir_all(tree.path("src")).expect("create source dir");
        fs::create_dir_all(tree.path(&format!("build/{FILES_DIR}"))).expect("create build dir");
        tree.write_directory_info(extra);
        tree
    }

    /// Absolute path of `rel` inside the tree.
    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// The build directory.
    pub fn binary_dir(&self) -> PathBuf {
        self.path("build")
    }

    /// The directory holding the files of target `name`.
    pub fn target_dir(&self, name: &str) -> PathBuf {
        self.path(&format!("build/{FILES_DIR}/{name}.dir"))
    }

    /// The directory descriptor.
    pub fn directory_info_file(&self) -> PathBuf {
        self.path(&format!("build/{FILES_DIR}/DirectoryInformation.toml"))
    }

    /// The descriptor of target `name`.
    pub fn target_info_file(&self, name: &str) -> PathBuf {
        self.target_dir(name).join("DependInfo.toml")
    }

    /// Absolute path of the object `file` of target `name`.
    pub fn object(&self, name: &str, file: &str) -> PathBuf {
        self.target_dir(name).join(file)
    }

    /// Rewrites the directory descriptor, appending `extra` to the two
    /// required directory keys.
    pub fn write_directory_info(&self, extra: &str) {
        let text = format!(
            "source_dir = \"{}\"\nbinary_dir = \"{}\"\n{extra}",
            to_toml(&self.path("src")),
            to_toml(&self.binary_dir()),
        );
        write_file(&self.directory_info_file(), &text);
    }

    /// Writes `content` to `rel`, creating parent directories.
    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.path(rel);
        write_file(&path, content);
        path
    }

    /// Writes a source file under `src/`.
    pub fn source(&self, rel: &str, content: &str) -> PathBuf {
        self.write(&format!("src/{rel}"), content)
    }

    /// Writes the descriptor of target `name`.
    pub fn target(&self, name: &str, toml: &str) -> PathBuf {
        let path = self.target_info_file(name);
        write_file(&path, toml);
        path
    }

    /// Reads `rel` as text.
    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.path(rel)).unwrap_or_else(|e| panic!("read {rel}: {e}"))
    }

    /// Reads a generated file of target `name`.
    pub fn read_target_file(&self, name: &str, file: &str) -> String {
        let path = self.target_dir(name).join(file);
        fs::read_to_string(&path).unwrap_or_else(|e| panic!("read {}: {e}", path.display()))
    }

    /// Loads target `name` with its default directory descriptor.
    pub fn load(&self, name: &str) -> LoadedTarget {
        match LoadedTarget::load(&self.target_info_file(name), None) {
            Ok(loaded) => loaded,
            Err(e) => panic!("load {name}: {e}"),
        }
    }

    /// Runs one generation pass over target `name`.
    pub fn generate(&self, name: &str) -> Pass {
        let sink = DiagnosticSink::new();
        let query = ProcessMacroQuery;
        let result = DependsGenerator::new(&sink, &query).generate(&self.load(name));
        Pass {
            result,
            diagnostics: sink.take_all(),
        }
    }

    /// Decides what a pass over target `name` would rescan.
    pub fn check(&self, name: &str) -> RescanPlan {
        let sink = DiagnosticSink::new();
        let query = ProcessMacroQuery;
        DependsGenerator::new(&sink, &query).check(&self.load(name))
    }

    /// The dependency store of target `name`.
    pub fn store(&self, name: &str) -> DependencyStore {
        DependencyStore::new(&self.target_dir(name), &self.binary_dir())
    }

    /// Moves every file in the tree one hour into the past.
    pub fn age_everything(&self) {
        let past = SystemTime::now() - Duration::from_secs(3600);
        for file in files_under(self.dir.path()) {
            set_mtime(&file, past);
        }
    }

    /// Moves `rel` one hour into the future.
    pub fn touch_future(&self, rel: &str) {
        set_mtime(&self.path(rel), SystemTime::now() + Duration::from_secs(3600));
    }
}

impl Default for BuildTree {
    fn default() -> Self {
        Self::new()
    }
}

/// One `[[sources]]` table of a target descriptor.
pub fn source_entry(path: &str, object: &str, language: &str) -> String {
    format!("[[sources]]\npath = \"{path}\"\nobject = \"{object}\"\nlanguage = \"{language}\"\n")
}

/// A target descriptor named `name` with one source per `(path, language)`.
///
/// Objects are placed in the target directory, named after the source with
/// an `.o` extension.
pub fn target_toml(name: &str, sources: &[(&str, &str)]) -> String {
    let mut out = format!("name = \"{name}\"\n");
    for (path, language) in sources {
        let stem = path.rsplit_once('.').map_or(*path, |(stem, _)| stem);
        out.push_str(&source_entry(
            path,
            &format!("{FILES_DIR}/{name}.dir/{stem}.o"),
            language,
        ));
    }
    out
}

/// Modification time of `path`.
pub fn mtime(path: &Path) -> SystemTime {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .unwrap_or_else(|e| panic!("mtime of {}: {e}", path.display()))
}

/// Sets the modification time of `path`.
pub fn set_mtime(path: &Path, time: SystemTime) {
    fs::File::options()
        .write(true)
        .open(path)
        .and_then(|f| f.set_modified(time))
        .unwrap_or_else(|e| panic!("set mtime of {}: {e}", path.display()));
}

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap_or_else(|e| panic!("create {}: {e}", parent.display()));
    }
    fs::write(path, content).unwrap_or_else(|e| panic!("write {}: {e}", path.display()));
}

fn files_under(dir: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
            } else {
                out.push(path);
            }
        }
    }
    out
}

/// Escapes a path for a TOML basic string.
fn to_toml(path: &Path) -> String {
    path.display().to_string().replace('\\', "\\\\")
}

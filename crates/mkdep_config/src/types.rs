//! Descriptor types deserialized from `DirectoryInformation.toml` and `DependInfo.toml`.

use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

/// Per-directory information shared by every target of one build directory.
///
/// Include scanning patterns and the relative path boundaries live here, which
/// is why a newer directory info file invalidates every target's records.
#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryInfo {
    /// Top of the source tree for this directory.
    pub source_dir: PathBuf,
    /// Top of the build tree for this directory.
    pub binary_dir: PathBuf,
    /// Paths below this directory may be written relative to each other.
    /// Defaults to `source_dir`.
    #[serde(default)]
    pub relative_path_top_source: Option<PathBuf>,
    /// Paths below this directory may be written relative to each other.
    /// Defaults to `binary_dir`.
    #[serde(default)]
    pub relative_path_top_binary: Option<PathBuf>,
    /// Write forward slashes even for Windows shells.
    #[serde(default)]
    pub force_unix_paths: bool,
    /// The `make` flavour the generated fragments are written for.
    #[serde(default)]
    pub dialect: DialectKind,
    /// Command prefix used in generated recipes to call back into mkdep.
    #[serde(default = "default_tool_command")]
    pub tool_command: String,
    /// Per-language include scanning patterns, keyed by [`Language::as_str`].
    #[serde(default)]
    pub scan: BTreeMap<String, ScanPatterns>,
}

impl DirectoryInfo {
    /// The effective source-tree relative path boundary.
    pub fn relative_top_source(&self) -> PathBuf {
        self.relative_path_top_source
            .clone()
            .unwrap_or_else(|| self.source_dir.clone())
    }

    /// The effective build-tree relative path boundary.
    pub fn relative_top_binary(&self) -> PathBuf {
        self.relative_path_top_binary
            .clone()
            .unwrap_or_else(|| self.binary_dir.clone())
    }

    /// Scanning patterns for `language`, falling back to the defaults.
    pub fn scan_patterns(&self, language: Language) -> ScanPatterns {
        self.scan
            .get(language.as_str())
            .cloned()
            .unwrap_or_default()
    }
}

fn default_tool_command() -> String {
    "$(MKDEP)".to_string()
}

/// Regular expressions steering the C-family include scanner.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScanPatterns {
    /// Only include names matching this pattern are followed.
    #[serde(default = "default_regex_scan")]
    pub include_regex_scan: String,
    /// Include names matching this pattern must be found, or scanning fails.
    #[serde(default = "default_regex_complain")]
    pub include_regex_complain: String,
}

fn default_regex_scan() -> String {
    "^.*$".to_string()
}

fn default_regex_complain() -> String {
    "^$".to_string()
}

impl Default for ScanPatterns {
    fn default() -> Self {
        Self {
            include_regex_scan: default_regex_scan(),
            include_regex_complain: default_regex_complain(),
        }
    }
}

/// The `make` flavour generated fragments target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DialectKind {
    /// GNU/BSD make driving a POSIX shell.
    #[default]
    Posix,
    /// NMake-style tools driving `cmd.exe`.
    WindowsCmd,
    /// Open Watcom `wmake`.
    WatcomWmake,
}

/// Source languages with dependency scanning support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
pub enum Language {
    /// C.
    #[serde(rename = "C", alias = "c")]
    C,
    /// C++.
    #[serde(rename = "CXX", alias = "cxx")]
    Cxx,
    /// Assembly run through the C preprocessor.
    #[serde(rename = "ASM", alias = "asm")]
    Asm,
    /// CUDA.
    #[serde(rename = "CUDA", alias = "cuda")]
    Cuda,
    /// Windows resource scripts.
    #[serde(rename = "RC", alias = "rc")]
    Rc,
    /// Fortran.
    #[serde(rename = "Fortran", alias = "fortran")]
    Fortran,
}

impl Language {
    /// Returns `true` for languages with provides/requires module semantics.
    pub fn has_modules(self) -> bool {
        matches!(self, Language::Fortran)
    }

    /// The canonical spelling used in file names (`CXX.includecache`).
    pub fn as_str(self) -> &'static str {
        match self {
            Language::C => "C",
            Language::Cxx => "CXX",
            Language::Asm => "ASM",
            Language::Cuda => "CUDA",
            Language::Rc => "RC",
            Language::Fortran => "Fortran",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of artifact a target produces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetKind {
    /// A linked executable.
    #[default]
    Executable,
    /// A static archive.
    StaticLibrary,
    /// A shared library.
    SharedLibrary,
    /// A loadable module.
    ModuleLibrary,
    /// A collection of object files.
    ObjectLibrary,
}

/// The per-target descriptor listing what to scan.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetInfo {
    /// Target name.
    pub name: String,
    /// Artifact kind.
    #[serde(default)]
    pub kind: TargetKind,
    /// Sources in target order, each with the object it compiles to.
    #[serde(default)]
    pub sources: Vec<SourceEntry>,
    /// Include search path, in search order.
    #[serde(default)]
    pub include_paths: Vec<PathBuf>,
    /// Preprocessor definitions (`NAME` or `NAME=value`).
    #[serde(default)]
    pub defines: Vec<String>,
    /// `DependInfo.toml` files of the targets this one links to, in link order.
    #[serde(default)]
    pub linked_info_files: Vec<PathBuf>,
    /// Fortran specific settings.
    #[serde(default)]
    pub fortran: FortranSettings,
}

impl TargetInfo {
    /// The distinct languages of this target's sources, in a stable order.
    pub fn languages(&self) -> BTreeSet<Language> {
        self.sources.iter().map(|s| s.language).collect()
    }

    /// The preprocessor symbol names defined for this target.
    ///
    /// `NAME=value` contributes `NAME`; values are not tracked.
    pub fn defined_symbols(&self) -> BTreeSet<String> {
        self.defines
            .iter()
            .map(|d| match d.split_once('=') {
                Some((name, _)) => name.to_string(),
                None => d.clone(),
            })
            .filter(|name| !name.is_empty())
            .collect()
    }
}

/// One source file of a target.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceEntry {
    /// The source file; relative paths are taken from the source directory.
    pub path: PathBuf,
    /// The object file; relative paths are taken from the build directory.
    pub object: PathBuf,
    /// The language the source is compiled as.
    pub language: Language,
}

/// Fortran compiler settings of a target.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FortranSettings {
    /// Compiler family identifier (`GNU`, `Intel`, `SunPro`, ...).
    #[serde(default)]
    pub compiler_id: Option<String>,
    /// Directory the compiler writes `.mod` files to. Defaults to the build directory.
    #[serde(default)]
    pub module_dir: Option<PathBuf>,
    /// Command printing the compiler's predefined macros as `#define` lines.
    #[serde(default)]
    pub predefined_macros_command: Vec<String>,
}

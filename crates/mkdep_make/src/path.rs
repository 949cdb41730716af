//! Relative path conversion and rule escaping.

use std::path::{Component, Path, PathBuf};

use mkdep_common::paths::{collapse, to_slash};
use mkdep_config::DirectoryInfo;

use crate::dialect::ShellDialect;

/// Converts absolute paths to relative ones where safe, and escapes paths
/// for rule positions.
///
/// A path is only made relative when it and the base both lie inside the
/// source-tree top or both inside the build-tree top. Relative paths that
/// reach out of the project would break when `make` runs from another
/// directory.
#[derive(Debug, Clone)]
pub struct PathNormalizer {
    top_source: PathBuf,
    top_binary: PathBuf,
    dialect: ShellDialect,
}

impl PathNormalizer {
    /// Creates a normalizer from explicit top directories.
    pub fn new(top_source: &Path, top_binary: &Path, dialect: ShellDialect) -> Self {
        Self {
            top_source: collapse(top_source),
            top_binary: collapse(top_binary),
            dialect,
        }
    }

    /// Creates the normalizer described by a directory descriptor.
    pub fn for_directory(info: &DirectoryInfo) -> Self {
        Self::new(
            &info.relative_top_source(),
            &info.relative_top_binary(),
            ShellDialect::new(info.dialect, info.force_unix_paths),
        )
    }

    /// The dialect paths are escaped for.
    pub fn dialect(&self) -> ShellDialect {
        self.dialect
    }

    /// Returns `target` relative to `base` when both lie inside the same
    /// top directory, otherwise `target` unchanged.
    ///
    /// Relative input is returned as is, so applying this twice is the same
    /// as applying it once.
    pub fn relativize(&self, base: &Path, target: &Path) -> String {
        if !target.is_absolute() {
            return to_slash(target);
        }
        let base = collapse(base);
        let target = collapse(target);
        let inside = |top: &Path| base.starts_with(top) && target.starts_with(top);
        if !inside(&self.top_source) && !inside(&self.top_binary) {
            return to_slash(&target);
        }
        force_relative(&base, &target)
    }

    /// Relativizes `target` against `base` and escapes it for a rule.
    pub fn rule_path(&self, base: &Path, target: &Path) -> String {
        self.escape_for_rule(&self.relativize(base, target))
    }

    /// Converts `path` to the dialect's spelling and replaces `=` with
    /// `$(EQUALS)`.
    pub fn escape_for_rule(&self, path: &str) -> String {
        make_safe(&self.dialect.output_path(path))
    }
}

/// Replaces `=` with `$(EQUALS)` so `make` does not read an assignment.
pub fn make_safe(text: &str) -> String {
    text.replace('=', "$(EQUALS)")
}

/// Relative path from `base` to `target`, both absolute and collapsed.
///
/// Paths sharing nothing below the root are returned absolute.
fn force_relative(base: &Path, target: &Path) -> String {
    if base == target {
        return ".".to_string();
    }
    let local: Vec<Component<'_>> = base.components().collect();
    let remote: Vec<Component<'_>> = target.components().collect();
    if local.first() != remote.first() {
        return to_slash(target);
    }
    let common = local
        .iter()
        .zip(&remote)
        .take_while(|(a, b)| a == b)
        .count();
    if common <= 1 {
        return to_slash(target);
    }

    let mut parts: Vec<String> = Vec::with_capacity(local.len() - common + remote.len() - common);
    parts.extend((common..local.len()).map(|_| "..".to_string()));
    parts.extend(
        remote[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );
    if parts.is_empty() {
        return ".".to_string();
    }
    parts.join("/")
}

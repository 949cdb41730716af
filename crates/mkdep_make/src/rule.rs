//! Writing `make` rules.
//!
//! Every prerequisite gets its own `target: prerequisite` line; some `make`
//! implementations truncate long lines, and repeating the target is always
//! understood. Targets and prerequisites are relativized against the build
//! directory and escaped before they are written.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use mkdep_common::paths::to_slash;

use crate::error::WriteError;
use crate::path::PathNormalizer;
use crate::path_cache::PathCache;

/// One rule to write.
#[derive(Debug, Clone, Default)]
pub struct MakeRule {
    /// Comment written above the rule, one `#` line per text line.
    pub comment: Option<String>,
    /// The target path.
    pub target: PathBuf,
    /// Prerequisite paths, in order.
    pub depends: Vec<PathBuf>,
    /// Recipe lines, written verbatim after a tab.
    pub commands: Vec<String>,
    /// Declare the target `.PHONY` where the dialect allows it.
    pub symbolic: bool,
}

impl MakeRule {
    /// A rule for `target` with no prerequisites or commands.
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            ..Self::default()
        }
    }

    /// Sets the comment.
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Adds a prerequisite.
    pub fn depend(mut self, path: impl Into<PathBuf>) -> Self {
        self.depends.push(path.into());
        self
    }

    /// Adds a recipe line.
    pub fn command(mut self, command: impl Into<String>) -> Self {
        self.commands.push(command.into());
        self
    }

    /// Marks the rule symbolic.
    pub fn symbolic(mut self) -> Self {
        self.symbolic = true;
        self
    }
}

/// Writes rules relative to one build directory.
///
/// Owns the [`PathCache`] of the pass, so a writer should live exactly as
/// long as one generation pass.
pub struct RuleWriter<'n> {
    normalizer: &'n PathNormalizer,
    base: PathBuf,
    cache: PathCache,
}

impl<'n> RuleWriter<'n> {
    /// Creates a writer producing paths relative to `base`.
    pub fn new(normalizer: &'n PathNormalizer, base: &Path) -> Self {
        Self {
            normalizer,
            base: base.to_path_buf(),
            cache: PathCache::new(),
        }
    }

    /// The normalizer this writer converts paths with.
    pub fn normalizer(&self) -> &'n PathNormalizer {
        self.normalizer
    }

    /// The directory rule paths are relative to.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// The rule spelling of `path`: relativized, converted and escaped.
    pub fn rule_path(&mut self, path: &Path) -> String {
        let Self {
            normalizer,
            base,
            cache,
        } = self;
        cache
            .get_or_convert(&to_slash(path), |_| normalizer.rule_path(base, path))
            .to_string()
    }

    /// `path` relativized against the base, without escaping.
    pub fn relative(&self, path: &Path) -> String {
        self.normalizer.relativize(&self.base, path)
    }

    /// `path` relativized against the base and quoted as a recipe argument.
    pub fn shell_path(&self, path: &Path) -> String {
        let dialect = self.normalizer.dialect();
        let mut relative = self.relative(path);
        if dialect.path_separator() == '\\' {
            relative = relative.replace('/', "\\");
        }
        dialect.quote(&relative)
    }

    /// Writes `target: dep` lines, one per prerequisite, with no trailing
    /// blank line.
    pub fn write_dependency_lines<'p>(
        &mut self,
        out: &mut String,
        target: &Path,
        depends: impl IntoIterator<Item = &'p Path>,
    ) {
        let tgt = self.rule_path(target);
        for dep in depends {
            let dep = self.rule_path(dep);
            let _ = writeln!(out, "{tgt}: {dep}");
        }
    }

    /// Writes a complete rule: comment, prerequisite lines, recipe,
    /// optional `.PHONY` declaration and a separating blank line.
    pub fn write_rule(&mut self, out: &mut String, rule: &MakeRule) -> Result<(), WriteError> {
        if rule.target.as_os_str().is_empty() {
            return Err(WriteError::EmptyTarget {
                comment: rule.comment.clone(),
            });
        }
        if let Some(comment) = &rule.comment {
            for line in comment.split('\n') {
                let _ = writeln!(out, "# {line}");
            }
        }

        let tgt = self.rule_path(&rule.target);
        // A one-character target could be mistaken for a drive letter.
        let space = if tgt.chars().count() == 1 { " " } else { "" };
        if rule.depends.is_empty() {
            let _ = writeln!(out, "{tgt}{space}:");
        } else {
            for dep in &rule.depends {
                let dep = self.rule_path(dep);
                let _ = writeln!(out, "{tgt}{space}: {dep}");
            }
        }

        for command in &rule.commands {
            let _ = writeln!(out, "\t{command}");
        }
        if rule.commands.is_empty() {
            out.push('\n');
        }
        if rule.symbolic && self.normalizer.dialect().supports_phony_targets() {
            let _ = writeln!(out, ".PHONY : {tgt}");
        }
        out.push('\n');
        Ok(())
    }

    /// Number of distinct paths converted by this writer.
    pub fn converted_paths(&self) -> usize {
        self.cache.len()
    }
}

//! Per-object dependency records and the internal record format.
//!
//! The internal stream lists each object on its own line followed by its
//! source and dependencies, one per line, each indented by a single space:
//!
//! ```text
//! app.dir/a.o
//!  /proj/src/a.cpp
//!  /proj/src/a.h
//! ```
//!
//! Object lines are relative to the build directory when possible; source
//! and dependency lines are absolute. Empty lines and `#` comments are
//! ignored when reading.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use mkdep_common::paths::{join_collapsed, to_slash};
use mkdep_scan::SourceInfo;

/// The dependencies of one compiled object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRecord {
    /// Absolute object path.
    pub object: PathBuf,
    /// Absolute source path.
    pub source: PathBuf,
    /// Files the object depends on besides its source, in order.
    pub dependencies: Vec<PathBuf>,
}

impl ObjectRecord {
    /// Creates a record.
    pub fn new(object: PathBuf, source: PathBuf, dependencies: Vec<PathBuf>) -> Self {
        Self {
            object,
            source,
            dependencies,
        }
    }

    /// The record for `object` compiled from the scanned `info`.
    pub fn from_scan(object: &Path, info: &SourceInfo) -> Self {
        Self {
            object: object.to_path_buf(),
            source: info.source().to_path_buf(),
            dependencies: info
                .includes()
                .iter()
                .filter(|p| p.as_path() != info.source())
                .cloned()
                .collect(),
        }
    }

    /// The source followed by every dependency.
    pub fn inputs(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.source.as_path()).chain(self.dependencies.iter().map(PathBuf::as_path))
    }
}

/// Appends the internal-stream entry of `record`, writing its object as
/// `object_text`.
pub fn write_internal_entry(out: &mut String, object_text: &str, record: &ObjectRecord) {
    let _ = writeln!(out, "{object_text}");
    for input in record.inputs() {
        let _ = writeln!(out, " {}", to_slash(input));
    }
}

/// Reads an internal stream. Relative paths are resolved against `base`.
///
/// An object line without a following source line is dropped.
pub fn parse_internal(text: &str, base: &Path) -> Vec<ObjectRecord> {
    let mut records = Vec::new();
    let mut current: Option<(PathBuf, Option<PathBuf>, Vec<PathBuf>)> = None;

    let mut finish = |current: Option<(PathBuf, Option<PathBuf>, Vec<PathBuf>)>| {
        if let Some((object, Some(source), dependencies)) = current {
            records.push(ObjectRecord::new(object, source, dependencies));
        }
    };

    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(path) = line.strip_prefix(' ') {
            let Some((_, source, deps)) = current.as_mut() else {
                continue;
            };
            let path = join_collapsed(base, Path::new(path));
            if source.is_none() {
                *source = Some(path);
            } else {
                deps.push(path);
            }
        } else {
            finish(current.take());
            current = Some((join_collapsed(base, Path::new(line)), None, Vec::new()));
        }
    }
    finish(current);
    records
}

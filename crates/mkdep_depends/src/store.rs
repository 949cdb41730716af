//! The persisted dependency records of one target.
//!
//! Two files live in the target directory: `depend.make`, included by the
//! generated makefiles, and `depend.internal`, read back by the next pass.
//! The modification time of `depend.internal` is the reference every
//! recorded dependency is compared against.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use mkdep_make::{StagedFile, WriteMode};

use crate::error::DependsError;
use crate::record::{parse_internal, ObjectRecord};

/// File name of the rule stream.
pub const DEPEND_MAKE_FILE: &str = "depend.make";
/// File name of the internal record stream.
pub const DEPEND_INTERNAL_FILE: &str = "depend.internal";

/// Modification time of `path`, if it exists.
pub(crate) fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// The records of the previous pass that are still accurate.
#[derive(Debug, Default)]
pub struct StalenessCache {
    valid: BTreeMap<PathBuf, ObjectRecord>,
    stale: BTreeSet<PathBuf>,
}

impl StalenessCache {
    /// A cache with nothing in it.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The still-valid record of `object`.
    pub fn get(&self, object: &Path) -> Option<&ObjectRecord> {
        self.valid.get(object)
    }

    /// Objects whose records were confirmed, keyed by object path.
    pub fn valid(&self) -> &BTreeMap<PathBuf, ObjectRecord> {
        &self.valid
    }

    /// Objects that had a record with at least one newer or missing input.
    pub fn stale(&self) -> &BTreeSet<PathBuf> {
        &self.stale
    }

    /// Every object the previous pass recorded.
    pub fn recorded_objects(&self) -> impl Iterator<Item = &Path> {
        self.valid
            .keys()
            .chain(self.stale.iter())
            .map(PathBuf::as_path)
    }

    /// Returns `true` if no record survived.
    pub fn is_empty(&self) -> bool {
        self.valid.is_empty()
    }
}

/// The `depend.make` / `depend.internal` pair of one target.
#[derive(Debug, Clone)]
pub struct DependencyStore {
    make_file: PathBuf,
    internal_file: PathBuf,
    base: PathBuf,
}

impl DependencyStore {
    /// The store in `target_dir`, with object paths relative to `base`.
    pub fn new(target_dir: &Path, base: &Path) -> Self {
        Self {
            make_file: target_dir.join(DEPEND_MAKE_FILE),
            internal_file: target_dir.join(DEPEND_INTERNAL_FILE),
            base: base.to_path_buf(),
        }
    }

    /// Path of the rule stream.
    pub fn make_file(&self) -> &Path {
        &self.make_file
    }

    /// Path of the internal record stream.
    pub fn internal_file(&self) -> &Path {
        &self.internal_file
    }

    /// Directory relative object paths are resolved against.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Modification time of the internal record, if there is one.
    pub fn record_time(&self) -> Option<SystemTime> {
        modified(&self.internal_file)
    }

    /// Returns `true` if `reference` is newer than the internal record, or
    /// either file is missing.
    pub fn is_outdated_by(&self, reference: &Path) -> bool {
        match (self.record_time(), modified(reference)) {
            (Some(record), Some(reference)) => reference > record,
            _ => true,
        }
    }

    /// Reads the previous records, keeping those whose inputs all exist and
    /// are not newer than the record itself.
    ///
    /// If any of `references` is newer than the record, nothing is kept.
    /// An unreadable record yields an empty cache.
    pub fn read_valid_subset(&self, references: &[&Path]) -> StalenessCache {
        let Some(record_time) = self.record_time() else {
            return StalenessCache::empty();
        };
        if let Some(newer) = references.iter().find(|r| self.is_outdated_by(r)) {
            tracing::debug!(
                reference = %newer.display(),
                "dependency records older than reference, discarding all"
            );
            return StalenessCache::empty();
        }
        let text = match fs::read_to_string(&self.internal_file) {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!(
                    path = %self.internal_file.display(),
                    error = %e,
                    "cannot read dependency records"
                );
                return StalenessCache::empty();
            }
        };

        let mut cache = StalenessCache::empty();
        for record in parse_internal(&text, &self.base) {
            let newer = record
                .inputs()
                .find(|input| modified(input).map_or(true, |t| t > record_time));
            match newer {
                None => {
                    cache.stale.remove(&record.object);
                    cache.valid.insert(record.object.clone(), record);
                }
                Some(input) => {
                    tracing::debug!(
                        object = %record.object.display(),
                        input = %input.display(),
                        "dependency newer than record"
                    );
                    cache.valid.remove(&record.object);
                    cache.stale.insert(record.object.clone());
                }
            }
        }
        cache
    }

    /// Stages both streams without replacing either file.
    ///
    /// `depend.make` is only replaced when its content changed;
    /// `depend.internal` is always replaced so its timestamp marks the pass.
    pub fn stage(&self, rules: &str, internal: &str) -> Result<StagedRecords, DependsError> {
        Ok(StagedRecords {
            make: StagedFile::stage(&self.make_file, rules, WriteMode::CopyIfDifferent)?,
            record: StagedFile::stage(&self.internal_file, internal, WriteMode::Replace)?,
        })
    }
}

/// Both record files of a target, staged and not yet in place.
#[derive(Debug)]
pub struct StagedRecords {
    make: StagedFile,
    record: StagedFile,
}

impl StagedRecords {
    /// Replaces `depend.make`, then `depend.internal`. If the second
    /// replacement fails, the old `depend.internal` is removed so the next
    /// pass starts from scratch. Returns `true` if `depend.make` was
    /// rewritten.
    pub fn commit(self) -> Result<bool, DependsError> {
        let internal_file = self.record.path().to_path_buf();
        let rules_written = self.make.commit()?;
        if let Err(e) = self.record.commit() {
            if let Err(remove) = fs::remove_file(&internal_file) {
                tracing::warn!(
                    path = %internal_file.display(),
                    error = %remove,
                    "cannot remove outdated dependency records"
                );
            }
            return Err(e.into());
        }
        tracing::debug!(path = %internal_file.display(), rules_written, "dependency records written");
        Ok(rules_written)
    }
}

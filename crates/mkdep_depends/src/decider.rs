//! Deciding what to rescan.
//!
//! Rules are applied in a fixed order and the first match wins:
//!
//! 1. no previous record, or the target descriptor is newer than it: the
//!    whole target is rescanned;
//! 2. the directory descriptor is newer than the record: the whole target is
//!    rescanned, since include paths may have changed for every object;
//! 3. otherwise each object is fresh when every input of its previous
//!    record is still present and not newer than the record, and is
//!    rescanned on its own when not.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use mkdep_config::ResolvedTarget;
use mkdep_diagnostics::code::STALE_CACHE_DISCARDED;
use mkdep_diagnostics::{Diagnostic, DiagnosticSink, Location};

use crate::record::ObjectRecord;
use crate::store::{DependencyStore, StalenessCache};

/// What happens to one object in this pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rescan {
    /// The previous record is reused as is.
    Fresh,
    /// Only this object's source is rescanned.
    Partial,
    /// The whole target is rescanned.
    Full,
}

impl fmt::Display for Rescan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Rescan::Fresh => "fresh",
            Rescan::Partial => "partial",
            Rescan::Full => "full",
        })
    }
}

/// Why the whole target is rescanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FullReason {
    /// There is no readable previous record.
    NoRecord,
    /// The target descriptor changed after the record was written.
    TargetInfoNewer,
    /// The directory descriptor changed after the record was written.
    DirectoryInfoNewer,
}

/// The per-object decisions of one pass.
#[derive(Debug)]
pub struct RescanPlan {
    full: Option<FullReason>,
    objects: BTreeMap<PathBuf, Rescan>,
    removed: Vec<PathBuf>,
    cache: StalenessCache,
}

impl RescanPlan {
    /// The reason the whole target is rescanned, if it is.
    pub fn full_reason(&self) -> Option<FullReason> {
        self.full
    }

    /// The decision for `object`. Unknown objects are rescanned.
    pub fn state(&self, object: &Path) -> Rescan {
        match self.full {
            Some(_) => Rescan::Full,
            None => self.objects.get(object).copied().unwrap_or(Rescan::Partial),
        }
    }

    /// Every object of the target with its decision.
    pub fn objects(&self) -> impl Iterator<Item = (&Path, Rescan)> {
        self.objects.iter().map(|(o, r)| (o.as_path(), *r))
    }

    /// Objects recorded previously that the target no longer builds.
    pub fn removed(&self) -> &[PathBuf] {
        &self.removed
    }

    /// The previous record of `object`, when it can be reused.
    pub fn reusable(&self, object: &Path) -> Option<&ObjectRecord> {
        match self.state(object) {
            Rescan::Fresh => self.cache.get(object),
            Rescan::Partial | Rescan::Full => None,
        }
    }

    /// Returns `true` if nothing needs to be regenerated.
    pub fn is_fresh(&self) -> bool {
        self.full.is_none()
            && self.removed.is_empty()
            && self.objects.values().all(|r| *r == Rescan::Fresh)
    }
}

/// Applies the rescan rules to `target`.
///
/// `directory_info` is the directory descriptor the target was configured
/// with. A discarded record is reported to `sink` as a note.
pub fn decide(
    store: &DependencyStore,
    target: &ResolvedTarget,
    directory_info: &Path,
    sink: &DiagnosticSink,
) -> RescanPlan {
    let full_plan = |reason: FullReason| RescanPlan {
        full: Some(reason),
        objects: target
            .sources
            .iter()
            .map(|s| (s.object.clone(), Rescan::Full))
            .collect(),
        removed: Vec::new(),
        cache: StalenessCache::empty(),
    };

    if store.record_time().is_none() {
        tracing::debug!(target = %target.name, "no dependency records, scanning everything");
        return full_plan(FullReason::NoRecord);
    }
    for (reference, reason, what) in [
        (
            target.info_file.as_path(),
            FullReason::TargetInfoNewer,
            "target descriptor",
        ),
        (
            directory_info,
            FullReason::DirectoryInfoNewer,
            "directory descriptor",
        ),
    ] {
        if store.is_outdated_by(reference) {
            tracing::info!(
                target = %target.name,
                reference = %reference.display(),
                "dependency records discarded"
            );
            sink.emit(
                Diagnostic::note(
                    STALE_CACHE_DISCARDED,
                    format!(
                        "dependency records of target '{}' are older than its {what}; rescanning all sources",
                        target.name
                    ),
                )
                .at(Location::file(reference)),
            );
            return full_plan(reason);
        }
    }

    let cache = store.read_valid_subset(&[]);
    let mut objects = BTreeMap::new();
    for source in &target.sources {
        let fresh = cache
            .get(&source.object)
            .is_some_and(|record| record.source == source.path);
        let state = if fresh { Rescan::Fresh } else { Rescan::Partial };
        if state == Rescan::Partial {
            tracing::debug!(object = %source.object.display(), "rescanning object");
        }
        objects.insert(source.object.clone(), state);
    }
    let removed = cache
        .recorded_objects()
        .filter(|o| !objects.contains_key(*o))
        .map(Path::to_path_buf)
        .collect();

    RescanPlan {
        full: None,
        objects,
        removed,
        cache,
    }
}

//! Textual `#include` scanner for C, C++, assembly, CUDA and resource files.
//!
//! Include lines are matched by pattern; the argument is never macro
//! expanded. Each include is resolved against, in order:
//!
//! 1. the directory of the including file, for quoted relative includes;
//! 2. names already resolved earlier in this pass;
//! 3. the include path, first match wins.
//!
//! Includes that cannot be resolved are not dependencies. If their name
//! matches the complain pattern the scan fails instead.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use mkdep_common::paths::{collapse, join_collapsed};
use mkdep_diagnostics::code::UNSUPPORTED_ENCODING;
use mkdep_diagnostics::{Diagnostic, DiagnosticSink, Location};
use regex::Regex;

use crate::error::ScanError;
use crate::include_cache::{CachedInclude, IncludeCache};
use crate::scanner::Scanner;
use crate::source_info::SourceInfo;

const INCLUDE_LINE: &str = r#"^[ \t]*[#%][ \t]*(?:include|import)[ \t]*[<"]([^">]+)([">])"#;

/// An include waiting to be resolved.
struct Pending {
    name: String,
    quoted_location: Option<PathBuf>,
    includer: PathBuf,
}

/// The C-family [`Scanner`].
///
/// Owns the header location cache and the persistent include cache of one
/// target and language for the duration of a generation pass.
pub struct CFamilyScanner<'a> {
    sink: &'a DiagnosticSink,
    include_line: Regex,
    include_regex_scan: Regex,
    include_regex_complain: Regex,
    cache: IncludeCache,
    header_locations: HashMap<String, PathBuf>,
}

impl<'a> CFamilyScanner<'a> {
    /// Creates a scanner following includes whose names match
    /// `include_regex_scan` and failing on unresolved names matching
    /// `include_regex_complain`.
    pub fn new(
        sink: &'a DiagnosticSink,
        include_regex_scan: &str,
        include_regex_complain: &str,
        cache: IncludeCache,
    ) -> Result<Self, ScanError> {
        Ok(Self {
            sink,
            include_line: compile(INCLUDE_LINE)?,
            include_regex_scan: compile(include_regex_scan)?,
            include_regex_complain: compile(include_regex_complain)?,
            cache,
            header_locations: HashMap::new(),
        })
    }

    /// The include cache, including entries added by this pass.
    pub fn cache(&self) -> &IncludeCache {
        &self.cache
    }

    /// Consumes the scanner, returning its include cache for saving.
    pub fn into_cache(self) -> IncludeCache {
        self.cache
    }

    /// Returns the include directives of `file`, from the cache when valid.
    fn includes_of(&mut self, file: &Path) -> Result<Vec<CachedInclude>, ScanError> {
        if let Some(cached) = self.cache.lookup(file) {
            return Ok(cached);
        }
        let bytes = std::fs::read(file).map_err(|e| ScanError::Open {
            path: file.to_path_buf(),
            source: e,
        })?;
        let includes = match decode(&bytes) {
            Some(text) => self.extract(file, &text),
            None => {
                self.sink.emit(
                    Diagnostic::warning(
                        UNSUPPORTED_ENCODING,
                        "file is UTF-16 or UTF-32 encoded; its includes are not scanned",
                    )
                    .at(Location::file(file)),
                );
                Vec::new()
            }
        };
        self.cache.insert(file.to_path_buf(), includes.clone());
        Ok(includes)
    }

    fn extract(&self, file: &Path, text: &str) -> Vec<CachedInclude> {
        let dir = file.parent().unwrap_or_else(|| Path::new(""));
        text.lines()
            .filter_map(|line| self.include_line.captures(line))
            .filter_map(|caps| {
                let name = caps.get(1)?.as_str();
                if !self.include_regex_scan.is_match(name) {
                    return None;
                }
                let quoted = caps.get(2).is_some_and(|d| d.as_str() == "\"");
                let quoted_location =
                    (quoted && !Path::new(name).is_absolute()).then(|| join_collapsed(dir, Path::new(name)));
                Some(CachedInclude {
                    name: name.to_string(),
                    quoted_location,
                })
            })
            .collect()
    }

    fn locate(&mut self, pending: &Pending, search_paths: &[PathBuf]) -> Option<PathBuf> {
        let name = Path::new(&pending.name);
        if name.is_absolute() {
            let full = collapse(name);
            return full.is_file().then_some(full);
        }
        if let Some(quoted) = &pending.quoted_location {
            if quoted.is_file() {
                return Some(quoted.clone());
            }
        }
        if let Some(known) = self.header_locations.get(&pending.name) {
            return Some(known.clone());
        }
        let found = search_paths
            .iter()
            .map(|dir| join_collapsed(dir, name))
            .find(|candidate| candidate.is_file())?;
        self.header_locations
            .insert(pending.name.clone(), found.clone());
        Some(found)
    }
}

impl Scanner for CFamilyScanner<'_> {
    fn scan(
        &mut self,
        source: &Path,
        search_paths: &[PathBuf],
        _macros: &BTreeSet<String>,
    ) -> Result<SourceInfo, ScanError> {
        let source = collapse(source);
        let mut includes = BTreeSet::new();
        let mut scanned: HashSet<PathBuf> = HashSet::new();
        let mut encountered: HashSet<(String, Option<PathBuf>)> = HashSet::new();
        let mut queue: VecDeque<Pending> = VecDeque::new();

        scanned.insert(source.clone());
        let mut current = source.clone();
        let mut directives = self.includes_of(&source)?;
        loop {
            for directive in directives {
                let key = (directive.name.clone(), directive.quoted_location.clone());
                if encountered.insert(key) {
                    queue.push_back(Pending {
                        name: directive.name,
                        quoted_location: directive.quoted_location,
                        includer: current.clone(),
                    });
                }
            }

            let Some(pending) = queue.pop_front() else {
                break;
            };
            match self.locate(&pending, search_paths) {
                Some(full) => {
                    if !scanned.insert(full.clone()) {
                        directives = Vec::new();
                        continue;
                    }
                    includes.insert(full.clone());
                    directives = self.includes_of(&full)?;
                    current = full;
                }
                None if self.include_regex_complain.is_match(&pending.name) => {
                    return Err(ScanError::MissingInclude {
                        path: pending.includer,
                        include: pending.name,
                    });
                }
                None => {
                    tracing::trace!(include = %pending.name, "include not found, not tracked");
                    directives = Vec::new();
                }
            }
        }

        includes.remove(&source);
        Ok(SourceInfo::with_includes(source, includes))
    }
}

fn compile(pattern: &str) -> Result<Regex, ScanError> {
    Regex::new(pattern).map_err(|e| ScanError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

/// Decodes file content for line matching.
///
/// Returns `None` for UTF-16 and UTF-32 content, detected by byte-order mark.
/// A UTF-8 byte-order mark is dropped.
fn decode(bytes: &[u8]) -> Option<String> {
    const UTF32_LE: &[u8] = &[0xFF, 0xFE, 0x00, 0x00];
    const UTF32_BE: &[u8] = &[0x00, 0x00, 0xFE, 0xFF];
    if bytes.starts_with(UTF32_LE)
        || bytes.starts_with(UTF32_BE)
        || bytes.starts_with(&[0xFF, 0xFE])
        || bytes.starts_with(&[0xFE, 0xFF])
    {
        return None;
    }
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    Some(String::from_utf8_lossy(bytes).into_owned())
}

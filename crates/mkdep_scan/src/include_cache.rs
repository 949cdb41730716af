//! Persistent cache of the include directives found in scanned files.
//!
//! Each target keeps one cache per C-family language (`C.includecache`,
//! `CXX.includecache`, ...). An entry lists the include directives of one
//! header so an unchanged header never has to be read again. The file is a
//! binary artifact: a 4-byte little-endian header length, a `bincode` header
//! with magic bytes, format version and payload checksum, then the payload.
//! Anything unreadable is treated as an empty cache.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use mkdep_common::ContentHash;
use serde::{Deserialize, Serialize};

use crate::error::ScanError;

const CACHE_MAGIC: [u8; 4] = *b"MKIC";

const CACHE_FORMAT_VERSION: u32 = 1;

/// One include directive recorded for a scanned file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedInclude {
    /// The include name as written between the delimiters.
    pub name: String,
    /// For a quoted relative include, the candidate path next to the
    /// including file; it is tried before the include path.
    pub quoted_location: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheHeader {
    magic: [u8; 4],
    format_version: u32,
    checksum: ContentHash,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CachePayload {
    include_regex_scan: String,
    include_regex_complain: String,
    entries: BTreeMap<PathBuf, Vec<CachedInclude>>,
}

#[derive(Debug)]
struct Entry {
    includes: Vec<CachedInclude>,
    used: bool,
}

/// The include cache of one target and language for one generation pass.
#[derive(Debug)]
pub struct IncludeCache {
    path: PathBuf,
    include_regex_scan: String,
    include_regex_complain: String,
    written_at: Option<SystemTime>,
    entries: BTreeMap<PathBuf, Entry>,
}

impl IncludeCache {
    /// Creates an empty cache that will be saved to `path`.
    pub fn empty(path: &Path, include_regex_scan: &str, include_regex_complain: &str) -> Self {
        Self {
            path: path.to_path_buf(),
            include_regex_scan: include_regex_scan.to_string(),
            include_regex_complain: include_regex_complain.to_string(),
            written_at: None,
            entries: BTreeMap::new(),
        }
    }

    /// Loads the cache at `path`.
    ///
    /// A missing, corrupt or outdated file, or one written with different
    /// include patterns, yields an empty cache.
    pub fn load(path: &Path, include_regex_scan: &str, include_regex_complain: &str) -> Self {
        let mut cache = Self::empty(path, include_regex_scan, include_regex_complain);
        let Some(payload) = read_payload(path) else {
            return cache;
        };
        if payload.include_regex_scan != include_regex_scan
            || payload.include_regex_complain != include_regex_complain
        {
            tracing::debug!(path = %path.display(), "include patterns changed, dropping include cache");
            return cache;
        }
        cache.written_at = std::fs::metadata(path).and_then(|m| m.modified()).ok();
        cache.entries = payload
            .entries
            .into_iter()
            .map(|(file, includes)| {
                (
                    file,
                    Entry {
                        includes,
                        used: false,
                    },
                )
            })
            .collect();
        cache
    }

    /// Returns the recorded includes of `file` if the entry is still valid.
    ///
    /// An entry is valid when `file` has not been modified after the cache
    /// was written. A valid entry is marked used and will be saved again.
    pub fn lookup(&mut self, file: &Path) -> Option<Vec<CachedInclude>> {
        let written_at = self.written_at?;
        let entry = self.entries.get_mut(file)?;
        let modified = std::fs::metadata(file).and_then(|m| m.modified()).ok()?;
        if modified > written_at {
            return None;
        }
        entry.used = true;
        Some(entry.includes.clone())
    }

    /// Records the includes found in a freshly read `file`.
    pub fn insert(&mut self, file: PathBuf, includes: Vec<CachedInclude>) {
        self.entries.insert(
            file,
            Entry {
                includes,
                used: true,
            },
        );
    }

    /// Number of entries, used or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes the entries used during this pass back to disk.
    pub fn save(&self) -> Result<(), ScanError> {
        let payload = CachePayload {
            include_regex_scan: self.include_regex_scan.clone(),
            include_regex_complain: self.include_regex_complain.clone(),
            entries: self
                .entries
                .iter()
                .filter(|(_, e)| e.used)
                .map(|(file, e)| (file.clone(), e.includes.clone()))
                .collect(),
        };
        let data = encode(&payload, &self.path)?;
        let header = CacheHeader {
            magic: CACHE_MAGIC,
            format_version: CACHE_FORMAT_VERSION,
            checksum: ContentHash::from_bytes(&data),
        };
        let header_bytes = encode(&header, &self.path)?;

        let header_len = header_bytes.len() as u32;
        let mut output = Vec::with_capacity(4 + header_bytes.len() + data.len());
        output.extend_from_slice(&header_len.to_le_bytes());
        output.extend_from_slice(&header_bytes);
        output.extend_from_slice(&data);

        std::fs::write(&self.path, &output).map_err(|e| ScanError::Io {
            path: self.path.clone(),
            source: e,
        })
    }
}

fn encode<T: Serialize>(value: &T, path: &Path) -> Result<Vec<u8>, ScanError> {
    bincode::serde::encode_to_vec(value, bincode::config::standard()).map_err(|e| ScanError::Io {
        path: path.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()),
    })
}

fn read_payload(path: &Path) -> Option<CachePayload> {
    let raw = std::fs::read(path).ok()?;
    if raw.len() < 4 {
        return None;
    }
    let header_len = u32::from_le_bytes(raw[..4].try_into().ok()?) as usize;
    if raw.len() < 4 + header_len {
        return None;
    }
    let header: CacheHeader =
        bincode::serde::decode_from_slice(&raw[4..4 + header_len], bincode::config::standard())
            .ok()?
            .0;
    if header.magic != CACHE_MAGIC || header.format_version != CACHE_FORMAT_VERSION {
        return None;
    }
    let data = &raw[4 + header_len..];
    if ContentHash::from_bytes(data) != header.checksum {
        return None;
    }
    bincode::serde::decode_from_slice(data, bincode::config::standard())
        .ok()
        .map(|(payload, _)| payload)
}

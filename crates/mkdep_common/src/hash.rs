//! XXH3-128 digests of generated text and cache payloads.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Digest deciding whether a generated file already holds the content
/// about to be written, and whether a cache payload survived intact.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash([u8; 16]);

impl ContentHash {
    /// Digest of `data`.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self(xxhash_rust::xxh3::xxh3_128(data).to_le_bytes())
    }

    /// Digest of the file at `path`, or `None` when it cannot be read.
    pub fn from_file(path: &Path) -> Option<Self> {
        std::fs::read(path).ok().map(|data| Self::from_bytes(&data))
    }

    /// Returns `true` if the file at `path` exists and holds exactly `content`.
    pub fn file_matches(path: &Path, content: &[u8]) -> bool {
        Self::from_file(path) == Some(Self::from_bytes(content))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.iter().try_for_each(|b| write!(f, "{b:02x}"))
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({self})")
    }
}

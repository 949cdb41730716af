//! Per-pass memo of converted rule paths.

use std::collections::HashMap;

use mkdep_common::{PathInterner, Symbol};

/// Remembers the rule spelling of every path converted during one pass.
///
/// Objects of one target mostly include the same headers, so each distinct
/// path is relativized and escaped once. Owned by the rule writer and dropped
/// with it; nothing is shared between passes.
#[derive(Default)]
pub struct PathCache {
    interner: PathInterner,
    converted: HashMap<Symbol, String>,
}

impl PathCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached conversion of `path`, computing it with `convert`
    /// on first use.
    pub fn get_or_convert(&mut self, path: &str, convert: impl FnOnce(&str) -> String) -> &str {
        let sym = self.interner.get_or_intern(path);
        self.converted
            .entry(sym)
            .or_insert_with(|| convert(path))
            .as_str()
    }

    /// Number of distinct paths converted so far.
    pub fn len(&self) -> usize {
        self.converted.len()
    }

    /// Returns `true` if nothing was converted yet.
    pub fn is_empty(&self) -> bool {
        self.converted.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_once_per_path() {
        let mut cache = PathCache::new();
        let mut calls = 0;
        for _ in 0..3 {
            let out = cache
                .get_or_convert("/proj/a=b.h", |p| {
                    calls += 1;
                    p.replace('=', "$(EQUALS)")
                })
                .to_string();
            assert_eq!(out, "/proj/a$(EQUALS)b.h");
        }
        assert_eq!(calls, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn distinct_paths_distinct_entries() {
        let mut cache = PathCache::new();
        cache.get_or_convert("a.h", str::to_string);
        cache.get_or_convert("b.h", str::to_string);
        assert_eq!(cache.len(), 2);
        assert!(!cache.is_empty());
    }
}

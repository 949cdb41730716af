//! Interned path symbols for cheap cloning and O(1) equality comparison.

use lasso::Rodeo;

/// An interned path or name string.
///
/// Symbols are `u32` indices into a [`PathInterner`]. They are only meaningful
/// together with the interner that produced them.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Symbol(u32);

// SAFETY: `Symbol` wraps a `u32` which is always a valid `usize` on 32-bit and
// 64-bit platforms. `try_from_usize` rejects values that don't fit in `u32`.
unsafe impl lasso::Key for Symbol {
    fn into_usize(self) -> usize {
        self.0 as usize
    }

    fn try_from_usize(int: usize) -> Option<Self> {
        u32::try_from(int).ok().map(Symbol)
    }
}

/// Single-threaded string interner backed by [`lasso::Rodeo`].
///
/// A generation pass owns exactly one interner; it is dropped with the pass.
/// Dependency paths repeat heavily across objects of one target (every object
/// tends to include the same headers), so conversions keyed by [`Symbol`] are
/// computed once per pass.
pub struct PathInterner {
    rodeo: Rodeo<Symbol>,
}

impl PathInterner {
    /// Creates a new empty interner.
    pub fn new() -> Self {
        Self {
            rodeo: Rodeo::new(),
        }
    }

    /// Interns a string, returning its [`Symbol`].
    pub fn get_or_intern(&mut self, s: &str) -> Symbol {
        self.rodeo.get_or_intern(s)
    }

    /// Returns the symbol for `s` if it was interned before.
    pub fn get(&self, s: &str) -> Option<Symbol> {
        self.rodeo.get(s)
    }

    /// Resolves a [`Symbol`] back to its string value.
    ///
    /// # Panics
    ///
    /// Panics if the `Symbol` was not created by this interner.
    pub fn resolve(&self, sym: Symbol) -> &str {
        self.rodeo.resolve(&sym)
    }

    /// Returns the number of distinct strings interned so far.
    pub fn len(&self) -> usize {
        self.rodeo.len()
    }

    /// Returns `true` if nothing has been interned.
    pub fn is_empty(&self) -> bool {
        self.rodeo.is_empty()
    }
}

impl Default for PathInterner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_resolve_roundtrip() {
        let mut interner = PathInterner::new();
        let id = interner.get_or_intern("/src/a.h");
        assert_eq!(interner.resolve(id), "/src/a.h");
    }

    #[test]
    fn same_string_same_symbol() {
        let mut interner = PathInterner::new();
        let a = interner.get_or_intern("/src/a.h");
        let b = interner.get_or_intern("/src/a.h");
        assert_eq!(a, b);
        assert_eq!(interner.len(), 1);
    }

    #[test]
    fn different_strings_different_symbols() {
        let mut interner = PathInterner::new();
        let a = interner.get_or_intern("a.h");
        let b = interner.get_or_intern("b.h");
        assert_ne!(a, b);
    }

    #[test]
    fn get_without_interning() {
        let mut interner = PathInterner::new();
        assert!(interner.get("x").is_none());
        let x = interner.get_or_intern("x");
        assert_eq!(interner.get("x"), Some(x));
    }
}

//! Diagnostic codes with category prefixes for structured error identification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The category of a diagnostic code, determining its prefix letter.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Category {
    /// Error diagnostics, prefixed with `E`.
    Error,
    /// Warning diagnostics, prefixed with `W`.
    Warning,
    /// Informational notes, prefixed with `N`.
    Note,
}

impl Category {
    /// Returns the single-character prefix for this category.
    pub fn prefix(self) -> char {
        match self {
            Category::Error => 'E',
            Category::Warning => 'W',
            Category::Note => 'N',
        }
    }
}

/// A structured diagnostic code combining a category prefix and a numeric identifier.
///
/// Displayed as the category prefix followed by a zero-padded 3-digit number,
/// e.g., `E001`, `W101`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct DiagnosticCode {
    /// The category of this diagnostic.
    pub category: Category,
    /// The numeric identifier within the category.
    pub number: u16,
}

impl DiagnosticCode {
    /// Creates a new diagnostic code.
    pub const fn new(category: Category, number: u16) -> Self {
        Self { category, number }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:03}", self.category.prefix(), self.number)
    }
}

/// A source file could not be opened or failed to parse.
pub const SCAN_FAILED: DiagnosticCode = DiagnosticCode::new(Category::Error, 1);
/// Two sources of one target provide the same module.
pub const MODULE_COLLISION: DiagnosticCode = DiagnosticCode::new(Category::Error, 2);
/// A dependency stream could not be read or written.
pub const IO_FAILED: DiagnosticCode = DiagnosticCode::new(Category::Error, 3);
/// An include matching the complain pattern could not be found.
pub const MISSING_INCLUDE: DiagnosticCode = DiagnosticCode::new(Category::Error, 4);
/// A directory or target descriptor is malformed.
pub const INVALID_DESCRIPTOR: DiagnosticCode = DiagnosticCode::new(Category::Error, 5);
/// A required module was found nowhere.
pub const UNRESOLVED_MODULE: DiagnosticCode = DiagnosticCode::new(Category::Warning, 101);
/// A compiled module file does not have the layout its compiler normally writes.
pub const UNEXPECTED_MODULE_FORMAT: DiagnosticCode = DiagnosticCode::new(Category::Warning, 102);
/// A file was skipped because of its byte-order mark.
pub const UNSUPPORTED_ENCODING: DiagnosticCode = DiagnosticCode::new(Category::Warning, 103);
/// The previous dependency records were discarded.
pub const STALE_CACHE_DISCARDED: DiagnosticCode = DiagnosticCode::new(Category::Note, 201);

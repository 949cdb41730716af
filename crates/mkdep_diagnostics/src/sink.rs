//! Collects the diagnostics of one generation pass.

use std::cell::RefCell;

use crate::diagnostic::Diagnostic;
use crate::severity::Severity;

/// Diagnostics emitted while one target is processed.
///
/// Scanners, the resolver and the decider all report through a shared
/// `&DiagnosticSink`; a pass runs on one thread, so a `RefCell` suffices.
/// Per-severity tallies survive [`take_all`](Self::take_all).
#[derive(Default)]
pub struct DiagnosticSink {
    pending: RefCell<Vec<Diagnostic>>,
    tally: RefCell<[usize; 3]>,
}

impl DiagnosticSink {
    /// An empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `diag`.
    pub fn emit(&self, diag: Diagnostic) {
        tracing::trace!(code = %diag.code, message = %diag.message, "diagnostic");
        self.tally.borrow_mut()[diag.severity.index()] += 1;
        self.pending.borrow_mut().push(diag);
    }

    /// How many diagnostics of `severity` were emitted so far.
    pub fn count(&self, severity: Severity) -> usize {
        self.tally.borrow()[severity.index()]
    }

    /// Returns `true` once any error was emitted.
    pub fn has_errors(&self) -> bool {
        self.count(Severity::Error) > 0
    }

    /// Number of warnings emitted so far.
    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    /// Drains the pending diagnostics in emission order.
    pub fn take_all(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.pending.borrow_mut())
    }

    /// A copy of the pending diagnostics.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.pending.borrow().clone()
    }
}

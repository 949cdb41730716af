//! Rendering diagnostics for the terminal or as JSON.

use mkdep_diagnostics::{Diagnostic, DiagnosticRenderer, Severity, TerminalRenderer};

use crate::GlobalArgs;

/// Writes `diagnostics` to stderr in text form.
///
/// With `--quiet` only errors are shown.
pub fn render_text(diagnostics: &[Diagnostic], global: &GlobalArgs) {
    let renderer = TerminalRenderer::new(global.color);
    for diag in diagnostics {
        if global.quiet && diag.severity != Severity::Error {
            continue;
        }
        eprint!("{}", renderer.render(diag));
    }
}

/// Counts errors and warnings.
pub fn counts(diagnostics: &[Diagnostic]) -> (usize, usize) {
    let errors = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .count();
    let warnings = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Warning)
        .count();
    (errors, warnings)
}

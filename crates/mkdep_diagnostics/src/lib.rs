//! Problems found while generating dependencies, and how they are shown.
//!
//! Every stage of a pass reports through one [`DiagnosticSink`]. Each
//! [`Diagnostic`] carries a [`Severity`], a stable [`DiagnosticCode`]
//! (`E001`, `W101`, ...), an optional file [`Location`] and notes.
//! [`TerminalRenderer`] prints them for the person running the build.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod location;
pub mod renderer;
pub mod severity;
pub mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::Diagnostic;
pub use location::Location;
pub use renderer::{DiagnosticRenderer, TerminalRenderer};
pub use severity::Severity;
pub use sink::DiagnosticSink;

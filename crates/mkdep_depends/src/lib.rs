//! Dependency generation for one build target.
//!
//! A [`DependsGenerator`] pass turns a target descriptor into two files in
//! the target directory:
//!
//! - `depend.make`, included by the host build's makefiles, with one
//!   `object: dependency` line per prerequisite;
//! - `depend.internal`, read back by the next pass to decide which objects
//!   need rescanning.
//!
//! Module-language targets additionally get a module export manifest read
//! by the targets linking to them, and a clean script removing their
//! compiled modules. Stamps of provided modules are refreshed at build time
//! by [`copy_module`], which only touches a stamp when the module's
//! interface actually changed.

#![warn(missing_docs)]

pub mod clean;
pub mod decider;
pub mod emitter;
pub mod error;
pub mod generator;
pub mod ledger;
pub mod module_diff;
pub mod record;
pub mod resolver;
pub mod store;

pub use decider::{decide, FullReason, Rescan, RescanPlan};
pub use emitter::{EmittedStreams, EmitterConfig, RuleEmitter};
pub use error::DependsError;
pub use generator::{DependsGenerator, GenerationReport, LoadedTarget};
pub use ledger::{ModuleLedger, ModuleLocation};
pub use module_diff::{
    compare_modules, copy_module, modules_differ, CompilerFamily, CopyOutcome, ModuleComparison,
};
pub use record::ObjectRecord;
pub use resolver::{resolve, ProvidesManifest};
pub use store::{DependencyStore, StagedRecords, StalenessCache};

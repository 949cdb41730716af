//! Shared foundational types used across the mkdep dependency tooling.
//!
//! This crate provides content hashing for copy-if-different writes, interned
//! path symbols for per-pass path conversion caches, and lexical path
//! normalization.

#![warn(missing_docs)]

pub mod hash;
pub mod ident;
pub mod paths;

pub use hash::ContentHash;
pub use ident::{PathInterner, Symbol};

//! Compiler extension for a reactive state-property DSL.
//!
//! Source files declare state properties with `define`, assert their shape
//! with `expect`, and read or write them through `access` and `mutate`
//! blocks. The pipeline scans every file for these calls, folds the
//! collected definitions into a dotted namespace schema, generates the
//! synthetic declarations user code resolves against, and lowers each call
//! into instructions over a small runtime.
//!
//! The phases live in the workspace crates; this crate wires them together
//! and provides the command-line front end.

pub mod cli;
pub mod pipeline;

pub use pipeline::{
    Compilation, CompileOptions, CompileResult, LoweredUnit, SourceInput, SourceUnit,
};

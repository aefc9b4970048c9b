//! Strict diagnostics for definition blocks.
//!
//! The collector is deliberately lenient; this crate re-walks every `define`
//! block with the exact statement grammar and reports everything the
//! builder silently tolerated. Diagnostics never short-circuit a phase.

pub mod call_checker;
pub mod capture;

pub use call_checker::PropertyDefinitionCallChecker;
pub use capture::InitializerCaptureChecker;

//! Shared data types for the propel compiler extension pipeline:
//! source spans, the diagnostic model, and dotted-path utilities.

pub mod diagnostics;
pub mod paths;
pub mod span;

pub use diagnostics::{Diagnostic, DiagnosticCategory, DiagnosticRelatedInformation};
pub use span::Span;

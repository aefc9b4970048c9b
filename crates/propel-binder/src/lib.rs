//! Scanning and binding for state-property definitions: per-file import
//! resolution, `define` call collection, the shared definition registry, and
//! the namespace schema tree it folds into.

pub mod collector;
pub mod imports;
pub mod radix;
pub mod registry;
pub mod schema;

pub use collector::{DefinitionCollector, DslEntryPoint, dsl_entry_point};
pub use imports::ImportResolutionContainer;
pub use radix::PackageRadixTree;
pub use registry::{IntermediatePropertyDefinition, PropertyDefinitionRegistry};
pub use schema::{StatePackage, StateProperty};

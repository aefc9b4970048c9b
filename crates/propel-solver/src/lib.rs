//! Type model for the propel pipeline: the intermediate (pre-resolution)
//! type representation, the host type table, the late type resolver, and the
//! host symbol facts consumed by capture checking.

pub mod resolver;
pub mod symbols;
pub mod table;
pub mod types;

pub use resolver::{ResolvedType, ResolvedTypeArgument, TypeResolver, ERROR_TYPE_NAME};
pub use symbols::{HostSymbol, HostSymbolId, HostSymbolTable, symbol_flags};
pub use table::{ClassEntry, ClassId, TypeTable};
pub use types::{
    DEFAULT_IMPORTS, IntermediateType, IntermediateTypeArgument, TypeReference, Variance,
};

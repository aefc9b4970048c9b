//! Synthetic declaration generation and call-site lowering.
//!
//! The `declarations` half turns a resolved schema tree into the interfaces
//! and entry-point functions later phases resolve user code against. The
//! `lowering` half rewrites every recognized call into instructions over the
//! runtime intrinsics.

pub mod declarations;
pub mod lowering;

pub use declarations::generate::DeclarationGenerator;
pub use declarations::model::{SyntheticDeclarations, SyntheticKind};
pub use declarations::naming::CountingNamingStrategy;
pub use lowering::call_index::{CallIndex, CallIndexBuilder};
pub use lowering::ir::Instruction;
pub use lowering::{LoweredCall, LoweringError, LoweringPass, SyntheticInitializer};

//! Instruction forms emitted by lowering, plus the fixed runtime surface.
//!
//! Instructions are deliberately close to stack-machine bytecode: the host
//! emission hook maps them one-to-one. `EvalExpression` defers an arbitrary
//! sub-expression to the host's own codegen.

use propel_common::paths::{capitalize, split_last_segment};
use propel_parser::parser::node::NodeIndex;
use serde::Serialize;
use std::fmt;

/// Owner of the static runtime entry points.
pub const INTRINSICS_OWNER: &str = "propel/runtime/Intrinsics";

/// Capability every synthesized initializer singleton implements.
pub const INITIALIZER_INTERFACE: &str = "propel/runtime/Initializer";

/// Process-wide context singleton used when no explicit context is given.
pub const GLOBAL_CONTEXT_OWNER: &str = "propel/GlobalContext";

pub const OBTAIN_PROPERTY: &str = "obtainPropertyWithin";
pub const OBTAIN_PROPERTY_DESCRIPTOR: &str =
    "(Ljava/lang/String;Lpropel/runtime/Initializer;Lpropel/Context;)Lpropel/Property;";

pub const GET_VALUE: &str = "getValueWithin";
pub const GET_VALUE_DESCRIPTOR: &str =
    "(Ljava/lang/String;Lpropel/runtime/Initializer;Lpropel/Context;)Ljava/lang/Object;";

pub const SET_VALUE: &str = "setValueWithin";
pub const SET_VALUE_DESCRIPTOR: &str =
    "(Ljava/lang/String;Ljava/lang/Object;Lpropel/runtime/Initializer;Lpropel/Context;)V";

/// Deterministic identity of the initializer singleton for one property.
/// Repeated compilation of the same identifier regenerates the same class.
pub fn initializer_singleton_owner(identifier: &str) -> String {
    let (package, leaf) = split_last_segment(identifier);

    let mut owner = String::from("propel/synthetic/");
    if !package.is_empty() {
        owner.push_str(&package.replace('.', "/"));
        owner.push('/');
    }
    owner.push_str(&capitalize(leaf));
    owner.push_str("Initializer");
    owner
}

/// `core.String` to `core/String`.
pub fn internal_name(qualified_name: &str) -> String {
    qualified_name.replace('.', "/")
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Instruction {
    PushString(String),
    PushNull,
    /// Load the `INSTANCE` field of a singleton class.
    LoadSingleton { owner: String },
    /// Evaluate a source sub-expression via the host codegen.
    EvalExpression { node: NodeIndex },
    CheckCast { class: String },
    StoreLocal { slot: u16 },
    LoadLocal { slot: u16 },
    InvokeStatic {
        owner: String,
        name: String,
        descriptor: String,
    },
    InvokeInterface {
        owner: String,
        name: String,
        descriptor: String,
    },
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::PushString(value) => write!(f, "LDC {value:?}"),
            Instruction::PushNull => write!(f, "ACONST_NULL"),
            Instruction::LoadSingleton { owner } => write!(f, "GETSTATIC {owner}.INSTANCE"),
            Instruction::EvalExpression { node } => write!(f, "EVAL #{}", node.0),
            Instruction::CheckCast { class } => write!(f, "CHECKCAST {class}"),
            Instruction::StoreLocal { slot } => write!(f, "ASTORE {slot}"),
            Instruction::LoadLocal { slot } => write!(f, "ALOAD {slot}"),
            Instruction::InvokeStatic { owner, name, descriptor } => {
                write!(f, "INVOKESTATIC {owner}.{name}{descriptor}")
            }
            Instruction::InvokeInterface { owner, name, descriptor } => {
                write!(f, "INVOKEINTERFACE {owner}.{name}{descriptor}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initializer_owner_is_derived_from_identifier() {
        assert_eq!(
            initializer_singleton_owner("ui.message"),
            "propel/synthetic/ui/MessageInitializer"
        );
        assert_eq!(
            initializer_singleton_owner("count"),
            "propel/synthetic/CountInitializer"
        );
        assert_eq!(
            initializer_singleton_owner("app.auth.session"),
            "propel/synthetic/app/auth/SessionInitializer"
        );
    }

    #[test]
    fn instruction_rendering() {
        let instruction = Instruction::InvokeStatic {
            owner: INTRINSICS_OWNER.to_string(),
            name: OBTAIN_PROPERTY.to_string(),
            descriptor: OBTAIN_PROPERTY_DESCRIPTOR.to_string(),
        };
        assert_eq!(
            instruction.to_string(),
            "INVOKESTATIC propel/runtime/Intrinsics.obtainPropertyWithin(Ljava/lang/String;Lpropel/runtime/Initializer;Lpropel/Context;)Lpropel/Property;"
        );
    }
}

//! Intermediate type representation.
//!
//! Types mentioned in definition blocks are captured structurally at scan
//! time; names that cannot be pinned to a package yet carry the candidate
//! package list from the import container and are resolved late, once the
//! whole host environment is known.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Packages searched, in order, for a bare type name before any file-local
/// import applies. The empty string is the root package.
pub const DEFAULT_IMPORTS: &[&str] = &[
    "",
    "core",
    "core.collections",
    "core.ranges",
    "core.text",
    "std",
];

pub const UNIT_TYPE_NAME: &str = "core.Unit";

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Variance {
    Invariant,
    In,
    Out,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeReference {
    /// Fully qualified name, fixed at scan time.
    Resolved(String),
    /// Bare name with the packages it may live in, in precedence order.
    Unresolved {
        name: String,
        candidate_packages: Vec<String>,
    },
}

/// One type argument; `ty` is `None` for a star projection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntermediateTypeArgument {
    pub variance: Variance,
    pub ty: Option<IntermediateType>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntermediateType {
    pub reference: TypeReference,
    pub nullable: bool,
    pub arguments: Vec<IntermediateTypeArgument>,
}

impl IntermediateType {
    pub fn resolved(qualified_name: impl Into<String>) -> Self {
        Self {
            reference: TypeReference::Resolved(qualified_name.into()),
            nullable: false,
            arguments: Vec::new(),
        }
    }

    /// Fallback type for definitions without a declared type.
    pub fn unit() -> Self {
        Self::resolved(UNIT_TYPE_NAME)
    }
}

impl fmt::Display for IntermediateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reference {
            TypeReference::Resolved(name) => write!(f, "{name}")?,
            TypeReference::Unresolved {
                name,
                candidate_packages,
            } => {
                // Default-import candidates add noise, show only the rest.
                let extra: Vec<&str> = candidate_packages
                    .iter()
                    .map(|p| p.as_str())
                    .filter(|p| !DEFAULT_IMPORTS.contains(p))
                    .collect();
                match extra.as_slice() {
                    [] => write!(f, "{name}")?,
                    [single] => write!(f, "{single}.{name}")?,
                    many => write!(f, "{{{}}}.{name}", many.join(", "))?,
                }
            }
        }
        if !self.arguments.is_empty() {
            write!(f, "<")?;
            for (i, argument) in self.arguments.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                match (&argument.ty, argument.variance) {
                    (None, _) => write!(f, "*")?,
                    (Some(ty), Variance::Invariant) => write!(f, "{ty}")?,
                    (Some(ty), Variance::In) => write!(f, "in {ty}")?,
                    (Some(ty), Variance::Out) => write!(f, "out {ty}")?,
                }
            }
            write!(f, ">")?;
        }
        if self.nullable {
            write!(f, "?")?;
        }
        Ok(())
    }
}

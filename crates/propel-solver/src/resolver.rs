//! Late type resolution.
//!
//! Resolution runs after every definition has been collected, so bare names
//! are probed against their candidate packages in precedence order. Lookups
//! are memoized per qualified name.

use std::cell::RefCell;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::table::{ClassId, TypeTable};
use crate::types::{IntermediateType, IntermediateTypeArgument, TypeReference, Variance};

pub const ERROR_TYPE_NAME: &str = "<error>";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTypeArgument {
    pub variance: Variance,
    /// `None` for a star projection.
    pub ty: Option<ResolvedType>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedType {
    pub class: Option<ClassId>,
    pub qualified_name: String,
    pub nullable: bool,
    pub arguments: Vec<ResolvedTypeArgument>,
}

impl ResolvedType {
    pub fn is_error(&self) -> bool {
        self.class.is_none()
    }

    /// Rendered form: `core.Map<in core.Int, *>?`.
    pub fn display_name(&self) -> String {
        let mut out = self.qualified_name.clone();
        if !self.arguments.is_empty() {
            out.push('<');
            for (i, argument) in self.arguments.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                match (&argument.ty, argument.variance) {
                    (None, _) => out.push('*'),
                    (Some(ty), Variance::Invariant) => out.push_str(&ty.display_name()),
                    (Some(ty), Variance::In) => {
                        out.push_str("in ");
                        out.push_str(&ty.display_name());
                    }
                    (Some(ty), Variance::Out) => {
                        out.push_str("out ");
                        out.push_str(&ty.display_name());
                    }
                }
            }
            out.push('>');
        }
        if self.nullable {
            out.push('?');
        }
        out
    }
}

pub struct TypeResolver<'a> {
    table: &'a TypeTable,
    cache: RefCell<FxHashMap<String, Option<ClassId>>>,
}

impl<'a> TypeResolver<'a> {
    pub fn new(table: &'a TypeTable) -> Self {
        Self {
            table,
            cache: RefCell::new(FxHashMap::default()),
        }
    }

    pub fn find_by_qualified_name(&self, qualified_name: &str) -> Option<ClassId> {
        if let Some(&cached) = self.cache.borrow().get(qualified_name) {
            return cached;
        }
        let found = self.table.find(qualified_name);
        self.cache
            .borrow_mut()
            .insert(qualified_name.to_string(), found);
        found
    }

    /// Resolves an intermediate type, producing the error type on failure.
    pub fn create_type(&self, intermediate: &IntermediateType) -> ResolvedType {
        let class = match &intermediate.reference {
            TypeReference::Resolved(name) => self.find_by_qualified_name(name),
            TypeReference::Unresolved {
                name,
                candidate_packages,
            } => candidate_packages.iter().find_map(|package| {
                let candidate = if package.is_empty() {
                    name.clone()
                } else {
                    format!("{package}.{name}")
                };
                self.find_by_qualified_name(&candidate)
            }),
        };
        let Some(class) = class else {
            warn!(ty = %intermediate, "type did not resolve to a registered class");
            return ResolvedType {
                class: None,
                qualified_name: ERROR_TYPE_NAME.to_string(),
                nullable: intermediate.nullable,
                arguments: Vec::new(),
            };
        };
        let qualified_name = self.table.entry(class).qualified_name.clone();
        debug!(ty = %intermediate, resolved = %qualified_name, "resolved type");
        ResolvedType {
            class: Some(class),
            qualified_name,
            nullable: intermediate.nullable,
            arguments: intermediate
                .arguments
                .iter()
                .map(|argument| self.create_argument(argument))
                .collect(),
        }
    }

    fn create_argument(&self, argument: &IntermediateTypeArgument) -> ResolvedTypeArgument {
        ResolvedTypeArgument {
            variance: argument.variance,
            ty: argument.ty.as_ref().map(|ty| self.create_type(ty)),
        }
    }

    pub fn unit_type(&self) -> ResolvedType {
        self.create_type(&IntermediateType::unit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> TypeTable {
        let mut table = TypeTable::new();
        table.register_class("core.Unit", 0);
        table.register_class("core.String", 0);
        table.register_class("core.collections.List", 1);
        table.register_class("auth.model.Session", 0);
        table
    }

    #[test]
    fn resolves_bare_name_by_package_precedence() {
        let table = table();
        let resolver = TypeResolver::new(&table);
        let ty = IntermediateType {
            reference: TypeReference::Unresolved {
                name: "List".to_string(),
                candidate_packages: vec![
                    "".to_string(),
                    "core".to_string(),
                    "core.collections".to_string(),
                ],
            },
            nullable: false,
            arguments: Vec::new(),
        };
        let resolved = resolver.create_type(&ty);
        assert_eq!(resolved.qualified_name, "core.collections.List");
        assert!(!resolved.is_error());
    }

    #[test]
    fn earlier_candidate_package_wins() {
        let mut table = table();
        table.register_class("first.Thing", 0);
        table.register_class("second.Thing", 0);
        let resolver = TypeResolver::new(&table);
        let ty = IntermediateType {
            reference: TypeReference::Unresolved {
                name: "Thing".to_string(),
                candidate_packages: vec!["first".to_string(), "second".to_string()],
            },
            nullable: false,
            arguments: Vec::new(),
        };
        assert_eq!(resolver.create_type(&ty).qualified_name, "first.Thing");
    }

    #[test]
    fn unresolvable_becomes_error_type() {
        let table = table();
        let resolver = TypeResolver::new(&table);
        let ty = IntermediateType {
            reference: TypeReference::Unresolved {
                name: "Missing".to_string(),
                candidate_packages: vec!["core".to_string()],
            },
            nullable: false,
            arguments: Vec::new(),
        };
        let resolved = resolver.create_type(&ty);
        assert!(resolved.is_error());
        assert_eq!(resolved.qualified_name, ERROR_TYPE_NAME);
    }

    #[test]
    fn arguments_resolve_recursively() {
        let table = table();
        let resolver = TypeResolver::new(&table);
        let ty = IntermediateType {
            reference: TypeReference::Resolved("core.collections.List".to_string()),
            nullable: true,
            arguments: vec![IntermediateTypeArgument {
                variance: Variance::Invariant,
                ty: Some(IntermediateType::resolved("core.String")),
            }],
        };
        let resolved = resolver.create_type(&ty);
        assert_eq!(
            resolved.display_name(),
            "core.collections.List<core.String>?"
        );
    }

    #[test]
    fn lookups_are_memoized() {
        let table = table();
        let resolver = TypeResolver::new(&table);
        assert!(resolver.find_by_qualified_name("core.String").is_some());
        assert!(resolver.find_by_qualified_name("core.String").is_some());
        assert_eq!(resolver.cache.borrow().len(), 1);
    }
}

//! Per-file import resolution.
//!
//! The container tracks, for one source file, which packages a bare name may
//! come from (default imports first, then wildcard imports in file order)
//! and which names are pinned by explicit imports. It converts parsed type
//! syntax into the intermediate type model without consulting the host type
//! table; that happens late, in the resolver.

use propel_parser::NodeArena;
use propel_parser::parser::node::{NodeIndex, TypeVariance};
use propel_solver::types::{
    DEFAULT_IMPORTS, IntermediateType, IntermediateTypeArgument, TypeReference, Variance,
};
use rustc_hash::FxHashMap;
use tracing::debug;

#[derive(Clone, Debug)]
pub struct ImportResolutionContainer {
    /// Candidate packages for bare names, in precedence order.
    packages: Vec<String>,
    /// Explicitly imported names: simple name (or alias) to qualified name.
    named: FxHashMap<String, String>,
}

impl ImportResolutionContainer {
    pub fn new() -> Self {
        Self {
            packages: DEFAULT_IMPORTS.iter().map(|p| p.to_string()).collect(),
            named: FxHashMap::default(),
        }
    }

    /// Container with extra always-available packages (the runtime package).
    pub fn with_base_packages(base: &[&str]) -> Self {
        let mut container = Self::new();
        for package in base {
            container.register_package(package);
        }
        container
    }

    pub fn register_package(&mut self, package: &str) {
        if !self.packages.iter().any(|p| p == package) {
            self.packages.push(package.to_string());
        }
    }

    pub fn register_name(&mut self, name: impl Into<String>, qualified: impl Into<String>) {
        self.named.insert(name.into(), qualified.into());
    }

    /// Applies one parsed import declaration.
    pub fn register_import(&mut self, arena: &NodeArena, import: NodeIndex) {
        let Some(data) = arena.get_import(import) else { return };
        if data.wildcard {
            debug!(package = %data.path, "registering wildcard import");
            self.register_package(&data.path);
            return;
        }
        let name = match &data.alias {
            Some(alias) => alias.clone(),
            None => data.path.rsplit('.').next().unwrap_or(&data.path).to_string(),
        };
        debug!(name = %name, qualified = %data.path, "registering named import");
        self.named.insert(name, data.path.clone());
    }

    pub fn packages(&self) -> &[String] {
        &self.packages
    }

    /// Could the bare `name` refer to `package.name` in this file? An
    /// explicit import of the same simple name from elsewhere shadows the
    /// package-based resolution.
    pub fn is_potentially_resolvable(&self, package: &str, name: &str) -> bool {
        let qualified = format!("{package}.{name}");
        match self.named.get(name) {
            Some(target) => *target == qualified,
            None => self.packages.iter().any(|p| p == package),
        }
    }

    /// Reference for a bare or dotted name occurring in type position.
    pub fn resolve_name(&self, name: &str) -> TypeReference {
        if name.contains('.') {
            return TypeReference::Resolved(name.to_string());
        }
        if let Some(qualified) = self.named.get(name) {
            return TypeReference::Resolved(qualified.clone());
        }
        TypeReference::Unresolved {
            name: name.to_string(),
            candidate_packages: self.packages.clone(),
        }
    }

    /// Qualified names a callable reference may resolve to, in precedence
    /// order. Dotted names and aliases are exact; bare names probe the
    /// package list.
    pub fn qualified_candidates(&self, name: &str) -> Vec<String> {
        if name.contains('.') {
            return vec![name.to_string()];
        }
        if let Some(qualified) = self.named.get(name) {
            return vec![qualified.clone()];
        }
        self.packages
            .iter()
            .map(|package| {
                if package.is_empty() {
                    name.to_string()
                } else {
                    format!("{package}.{name}")
                }
            })
            .collect()
    }

    /// Converts a parsed type reference node into an intermediate type.
    /// Malformed syntax (missing name anywhere in the tree) yields `None`.
    pub fn resolve_type(&self, arena: &NodeArena, node: NodeIndex) -> Option<IntermediateType> {
        let data = arena.get_type_reference(node)?;
        if data.name.is_empty() {
            return None;
        }
        let reference = if data.qualifier.is_empty() {
            self.resolve_name(&data.name)
        } else {
            TypeReference::Resolved(format!("{}.{}", data.qualifier.join("."), data.name))
        };
        let mut arguments = Vec::with_capacity(data.arguments.len());
        for argument in &data.arguments {
            if argument.variance == TypeVariance::Star {
                arguments.push(IntermediateTypeArgument {
                    variance: Variance::Invariant,
                    ty: None,
                });
                continue;
            }
            let ty = self.resolve_type(arena, argument.ty)?;
            arguments.push(IntermediateTypeArgument {
                variance: match argument.variance {
                    TypeVariance::In => Variance::In,
                    TypeVariance::Out => Variance::Out,
                    _ => Variance::Invariant,
                },
                ty: Some(ty),
            });
        }
        Some(IntermediateType {
            reference,
            nullable: data.nullable,
            arguments,
        })
    }
}

impl Default for ImportResolutionContainer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use propel_parser::ParserState;

    fn container_for(source: &str) -> (NodeArena, NodeIndex, ImportResolutionContainer) {
        let (arena, root, diagnostics) = ParserState::new("test.prp", source).parse_source_file();
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let mut container = ImportResolutionContainer::new();
        let imports = arena.get_source_file(root).unwrap().imports.clone();
        for import in imports {
            container.register_import(&arena, import);
        }
        (arena, root, container)
    }

    fn first_cast_type(arena: &NodeArena, root: NodeIndex) -> NodeIndex {
        let statement = arena.get_source_file(root).unwrap().statements[0];
        let cast = arena.get_binary_expression(statement).unwrap().left;
        arena.get_cast_expression(cast).unwrap().target_type
    }

    #[test]
    fn default_packages_precede_wildcard_imports() {
        let (_, _, container) = container_for("import auth.model.*\nval x = 1");
        let packages = container.packages();
        assert_eq!(packages.first().map(String::as_str), Some(""));
        assert_eq!(packages.last().map(String::as_str), Some("auth.model"));
        assert_eq!(
            packages.iter().position(|p| p == "core").unwrap() + 4,
            packages.iter().position(|p| p == "std").unwrap()
        );
    }

    #[test]
    fn explicit_import_pins_bare_name() {
        let (_, _, container) = container_for("import auth.model.Session\nval x = 1");
        assert_eq!(
            container.resolve_name("Session"),
            TypeReference::Resolved("auth.model.Session".to_string())
        );
    }

    #[test]
    fn aliased_import_resolves_alias_not_original() {
        let (_, _, container) = container_for("import auth.model.Session as Auth\nval x = 1");
        assert_eq!(
            container.resolve_name("Auth"),
            TypeReference::Resolved("auth.model.Session".to_string())
        );
        assert!(matches!(
            container.resolve_name("Session"),
            TypeReference::Unresolved { .. }
        ));
    }

    #[test]
    fn shadowing_import_blocks_package_resolution() {
        let (_, _, container) = container_for("import my.define\nval x = 1");
        let mut container = container;
        container.register_package("propel");
        assert!(!container.is_potentially_resolvable("propel", "define"));
        assert!(container.is_potentially_resolvable("propel", "expect"));
    }

    #[test]
    fn type_syntax_to_intermediate() {
        let (arena, root, container) =
            container_for("import auth.model.*\nx as List<Session?> initially y");
        let ty_node = first_cast_type(&arena, root);
        let ty = container.resolve_type(&arena, ty_node).unwrap();
        assert!(matches!(
            &ty.reference,
            TypeReference::Unresolved { name, candidate_packages }
                if name == "List" && candidate_packages.contains(&"auth.model".to_string())
        ));
        let inner = ty.arguments[0].ty.as_ref().unwrap();
        assert!(inner.nullable);
    }

    #[test]
    fn qualified_type_is_resolved_directly() {
        let (arena, root, container) = container_for("x as a.b.Thing initially y");
        let ty_node = first_cast_type(&arena, root);
        let ty = container.resolve_type(&arena, ty_node).unwrap();
        assert_eq!(
            ty.reference,
            TypeReference::Resolved("a.b.Thing".to_string())
        );
    }
}

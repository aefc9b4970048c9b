//! Shared registry of collected property definitions.
//!
//! Append-only during the scan phase; the driver freezes it by handing out
//! only shared references afterward. Duplicate and clash queries feed the
//! checker, `resolve` folds the definitions into the schema tree.

use propel_common::paths::{split_last_segment, subpackages_of};
use propel_solver::types::IntermediateType;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use tracing::debug;

use crate::radix::PackageRadixTree;
use crate::schema::{StatePackage, StateProperty};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IntermediatePropertyDefinition {
    /// Full dotted identifier, e.g. "ui.login.attempts".
    pub identifier: String,
    pub ty: IntermediateType,
}

#[derive(Default, Debug)]
pub struct PropertyDefinitionRegistry {
    definitions: Vec<IntermediatePropertyDefinition>,
}

impl PropertyDefinitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, definition: IntermediatePropertyDefinition) {
        debug!(
            identifier = %definition.identifier,
            ty = %definition.ty,
            "registering state property definition"
        );
        self.definitions.push(definition);
    }

    pub fn definitions(&self) -> &[IntermediatePropertyDefinition] {
        &self.definitions
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Identifiers defined more than once.
    pub fn duplicated_property_names(&self) -> FxHashSet<String> {
        let mut counts: FxHashMap<&str, u32> = FxHashMap::default();
        for definition in &self.definitions {
            *counts.entry(definition.identifier.as_str()).or_default() += 1;
        }
        counts
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(name, _)| name.to_string())
            .collect()
    }

    /// Identifiers that are also a package prefix of another identifier
    /// ("ui" clashes when "ui.message" exists too).
    pub fn clashing_property_names(&self) -> FxHashSet<String> {
        let mut prefixes: FxHashSet<String> = FxHashSet::default();
        for definition in &self.definitions {
            for prefix in subpackages_of(&definition.identifier) {
                prefixes.insert(prefix);
            }
        }
        self.definitions
            .iter()
            .filter(|d| prefixes.contains(&d.identifier))
            .map(|d| d.identifier.clone())
            .collect()
    }

    /// Folds the registered definitions into the schema tree. Leaf types are
    /// carried intermediate and resolve lazily.
    pub fn resolve(&self) -> StatePackage {
        let mut tree = PackageRadixTree::new();
        for definition in &self.definitions {
            let (package, leaf) = split_last_segment(&definition.identifier);
            tree.insert(package, StateProperty::new(leaf, definition.ty.clone()));
        }
        tree.fold(&mut |name, packages, properties| StatePackage {
            name: name.to_string(),
            packages,
            properties,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(identifier: &str) -> IntermediatePropertyDefinition {
        IntermediatePropertyDefinition {
            identifier: identifier.to_string(),
            ty: IntermediateType::unit(),
        }
    }

    #[test]
    fn duplicates_are_detected() {
        let mut registry = PropertyDefinitionRegistry::new();
        registry.register(definition("ui.message"));
        registry.register(definition("ui.visible"));
        registry.register(definition("ui.message"));
        let duplicated = registry.duplicated_property_names();
        assert_eq!(duplicated.len(), 1);
        assert!(duplicated.contains("ui.message"));
        assert!(registry.clashing_property_names().is_empty());
    }

    #[test]
    fn clash_is_a_strict_prefix_match() {
        let mut registry = PropertyDefinitionRegistry::new();
        registry.register(definition("ui"));
        registry.register(definition("ui.message"));
        registry.register(definition("other"));
        let clashing = registry.clashing_property_names();
        assert_eq!(clashing.len(), 1);
        assert!(clashing.contains("ui"));
    }

    #[test]
    fn deep_prefix_clash() {
        let mut registry = PropertyDefinitionRegistry::new();
        registry.register(definition("a.b"));
        registry.register(definition("a.b.c.d"));
        let clashing = registry.clashing_property_names();
        assert!(clashing.contains("a.b"));
        assert!(!clashing.contains("a.b.c.d"));
    }

    #[test]
    fn resolve_builds_nested_schema() {
        let mut registry = PropertyDefinitionRegistry::new();
        registry.register(definition("message"));
        registry.register(definition("ui.visible"));
        registry.register(definition("ui.login.attempts"));
        let schema = registry.resolve();
        assert!(schema.is_top_level());
        assert!(schema.find_property("message").is_some());
        let ui = schema.find_package("ui").unwrap();
        assert!(ui.find_property("visible").is_some());
        let login = ui.find_package("login").unwrap();
        assert!(login.find_property("attempts").is_some());
    }
}

//! The schema tree: nested state packages with their properties.
//!
//! Leaf types stay intermediate until a resolver is available; each property
//! resolves at most once, on first request.

use once_cell::unsync::OnceCell;
use propel_solver::resolver::{ResolvedType, TypeResolver};
use propel_solver::types::IntermediateType;
use serde::Serialize;
use tracing::debug;

#[derive(Clone, Debug, Serialize)]
pub struct StateProperty {
    pub name: String,
    pub intermediate: IntermediateType,
    #[serde(skip)]
    resolved: OnceCell<ResolvedType>,
}

impl StateProperty {
    pub fn new(name: impl Into<String>, intermediate: IntermediateType) -> Self {
        Self {
            name: name.into(),
            intermediate,
            resolved: OnceCell::new(),
        }
    }

    pub fn resolved_type(&self, resolver: &TypeResolver<'_>) -> &ResolvedType {
        self.resolved
            .get_or_init(|| resolver.create_type(&self.intermediate))
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct StatePackage {
    /// Single segment name; empty for the top-level package.
    pub name: String,
    pub packages: Vec<StatePackage>,
    pub properties: Vec<StateProperty>,
}

impl StatePackage {
    pub fn is_top_level(&self) -> bool {
        self.name.is_empty()
    }

    pub fn find_package(&self, name: &str) -> Option<&StatePackage> {
        self.packages.iter().find(|p| p.name == name)
    }

    pub fn find_property(&self, name: &str) -> Option<&StateProperty> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Logs the package hierarchy at debug level.
    pub fn dump(&self) {
        for line in self.dump_lines() {
            debug!("{line}");
        }
    }

    pub fn dump_lines(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_lines(0, &mut out);
        out
    }

    fn collect_lines(&self, depth: usize, out: &mut Vec<String>) {
        let indent = "  ".repeat(depth);
        let name = if self.is_top_level() { "<root>" } else { &self.name };
        out.push(format!("{indent}package {name}"));
        for property in &self.properties {
            out.push(format!("{indent}  {}: {}", property.name, property.intermediate));
        }
        for package in &self.packages {
            package.collect_lines(depth + 1, out);
        }
    }
}

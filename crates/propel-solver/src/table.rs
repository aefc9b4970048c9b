//! Registered host classes, addressable by fully qualified name.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassId(pub u32);

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClassEntry {
    pub qualified_name: String,
    pub type_parameter_count: u8,
}

#[derive(Default, Clone, Debug)]
pub struct TypeTable {
    classes: Vec<ClassEntry>,
    by_name: FxHashMap<String, ClassId>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a class, returning the existing id when the name is known.
    pub fn register_class(
        &mut self,
        qualified_name: impl Into<String>,
        type_parameter_count: u8,
    ) -> ClassId {
        let qualified_name = qualified_name.into();
        if let Some(&id) = self.by_name.get(&qualified_name) {
            return id;
        }
        let id = ClassId(self.classes.len() as u32);
        self.by_name.insert(qualified_name.clone(), id);
        self.classes.push(ClassEntry {
            qualified_name,
            type_parameter_count,
        });
        id
    }

    pub fn find(&self, qualified_name: &str) -> Option<ClassId> {
        self.by_name.get(qualified_name).copied()
    }

    pub fn entry(&self, id: ClassId) -> &ClassEntry {
        &self.classes[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_is_idempotent() {
        let mut table = TypeTable::new();
        let a = table.register_class("core.String", 0);
        let b = table.register_class("core.String", 0);
        assert_eq!(a, b);
        assert_eq!(table.len(), 1);
        assert_eq!(table.entry(a).qualified_name, "core.String");
    }
}

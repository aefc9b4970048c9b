//! Collision handling for generated declaration names.

use indexmap::IndexMap;

/// First use of a name stays unmodified, every later use gets the running
/// count appended. Insertion-ordered so regenerating from the same schema in
/// the same call order yields the same names.
#[derive(Debug, Default)]
pub struct CountingNamingStrategy {
    used_names: IndexMap<String, u32>,
}

impl CountingNamingStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rename(&mut self, name: &str) -> String {
        let count = self
            .used_names
            .entry(name.to_string())
            .and_modify(|c| *c += 1)
            .or_insert(1);

        if *count > 1 {
            format!("{name}{count}")
        } else {
            name.to_string()
        }
    }
}

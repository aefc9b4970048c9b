//! Facts about host callables, keyed by fully qualified name.
//!
//! The capture checker only needs two bits per symbol: whether a call to it
//! captures enclosing state (anything not static-like does) and whether it
//! is publicly visible.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

pub mod symbol_flags {
    /// Top-level function, singleton member, or other receiverless callable.
    pub const STATIC_LIKE: u8 = 1 << 0;
    pub const PUBLIC: u8 = 1 << 1;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HostSymbolId(pub u32);

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HostSymbol {
    pub qualified_name: String,
    pub flags: u8,
}

#[derive(Default, Clone, Debug)]
pub struct HostSymbolTable {
    symbols: Vec<HostSymbol>,
    by_name: FxHashMap<String, HostSymbolId>,
}

impl HostSymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, qualified_name: impl Into<String>, flags: u8) -> HostSymbolId {
        let qualified_name = qualified_name.into();
        if let Some(&id) = self.by_name.get(&qualified_name) {
            self.symbols[id.0 as usize].flags = flags;
            return id;
        }
        let id = HostSymbolId(self.symbols.len() as u32);
        self.by_name.insert(qualified_name.clone(), id);
        self.symbols.push(HostSymbol {
            qualified_name,
            flags,
        });
        id
    }

    pub fn find(&self, qualified_name: &str) -> Option<HostSymbolId> {
        self.by_name.get(qualified_name).copied()
    }

    pub fn get(&self, id: HostSymbolId) -> &HostSymbol {
        &self.symbols[id.0 as usize]
    }

    pub fn is_static_like(&self, id: HostSymbolId) -> bool {
        self.get(id).flags & symbol_flags::STATIC_LIKE != 0
    }

    pub fn is_public(&self, id: HostSymbolId) -> bool {
        self.get(id).flags & symbol_flags::PUBLIC != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_roundtrip() {
        let mut table = HostSymbolTable::new();
        let id = table.register(
            "util.newSession",
            symbol_flags::STATIC_LIKE | symbol_flags::PUBLIC,
        );
        assert!(table.is_static_like(id));
        assert!(table.is_public(id));
        let id = table.register("app.Widget.helper", symbol_flags::PUBLIC);
        assert!(!table.is_static_like(id));
        assert_eq!(table.find("app.Widget.helper"), Some(id));
    }
}

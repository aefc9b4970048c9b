pub mod node;
pub mod node_arena;
pub mod state;

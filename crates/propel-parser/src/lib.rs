//! Arena-based AST and recursive-descent parser for the host-language
//! subset the propel pipeline consumes.

pub mod parser;
pub mod syntax;

pub use parser::node::{Node, NodeIndex, NodeList, syntax_kind_ext};
pub use parser::node_arena::NodeArena;
pub use parser::state::ParserState;

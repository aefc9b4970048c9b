//! Small tree queries shared by the later pipeline phases.

use tracing::warn;

use crate::parser::node::{NodeIndex, syntax_kind_ext};
use crate::parser::node_arena::NodeArena;

/// Strips any number of wrapping parentheses.
pub fn unparenthesize(arena: &NodeArena, mut index: NodeIndex) -> NodeIndex {
    while let Some(data) = arena.get_parenthesized(index) {
        index = data.expression;
    }
    index
}

/// Dotted name of an identifier chain: `a`, `a.b`, `a.b.c()`. Calls
/// contribute their callee name. Returns `None` for any other shape.
pub fn qualified_name(arena: &NodeArena, index: NodeIndex) -> Option<String> {
    let node = arena.get(index)?;
    if let Some(text) = arena.get_identifier_text(index) {
        return Some(text.to_string());
    }
    match node.kind {
        k if k == syntax_kind_ext::QUALIFIED_ACCESS => {
            let data = arena.get_qualified_access(index)?;
            let receiver = qualified_name(arena, data.receiver)?;
            let selector = qualified_name(arena, data.selector)?;
            Some(format!("{receiver}.{selector}"))
        }
        k if k == syntax_kind_ext::CALL_EXPRESSION => {
            let data = arena.get_call_expression(index)?;
            qualified_name(arena, data.callee)
        }
        k if k == syntax_kind_ext::PARENTHESIZED_EXPRESSION => {
            let data = arena.get_parenthesized(index)?;
            qualified_name(arena, data.expression)
        }
        kind => {
            warn!(kind, "unhandled expression shape in qualified name");
            None
        }
    }
}

/// Name of a call's callee when it is a plain or qualified identifier.
pub fn callee_name(arena: &NodeArena, call: NodeIndex) -> Option<String> {
    let data = arena.get_call_expression(call)?;
    qualified_name(arena, data.callee)
}

/// True when the expression is only identifiers joined by dots, with no
/// calls, literals, or operators anywhere in the chain.
pub fn is_pure_identifier_chain(arena: &NodeArena, index: NodeIndex) -> bool {
    if arena.get_identifier_text(index).is_some() {
        return true;
    }
    if let Some(data) = arena.get_qualified_access(index) {
        return is_pure_identifier_chain(arena, data.receiver)
            && arena.get_identifier_text(data.selector).is_some();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::state::ParserState;

    fn parse_expression(source: &str) -> (NodeArena, NodeIndex) {
        let (arena, root, diagnostics) =
            ParserState::new("test.prp", source).parse_source_file();
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let statement = arena.get_source_file(root).unwrap().statements[0];
        (arena, statement)
    }

    #[test]
    fn qualified_name_of_dotted_chain() {
        let (arena, expr) = parse_expression("a.b.c");
        assert_eq!(qualified_name(&arena, expr).as_deref(), Some("a.b.c"));
    }

    #[test]
    fn qualified_name_through_call_selector() {
        let (arena, expr) = parse_expression("propel.define { }");
        assert_eq!(
            qualified_name(&arena, expr).as_deref(),
            Some("propel.define")
        );
    }

    #[test]
    fn qualified_name_rejects_literals() {
        let (arena, expr) = parse_expression("\"text\"");
        assert_eq!(qualified_name(&arena, expr), None);
    }

    #[test]
    fn pure_identifier_chain() {
        let (arena, expr) = parse_expression("ui.login.attempts");
        assert!(is_pure_identifier_chain(&arena, expr));
        let (arena, expr) = parse_expression("ui.login()");
        assert!(!is_pure_identifier_chain(&arena, expr));
    }

    #[test]
    fn unparenthesize_nested() {
        let (arena, expr) = parse_expression("((x))");
        let inner = unparenthesize(&arena, expr);
        assert_eq!(arena.get_identifier_text(inner), Some("x"));
    }
}

//! Capture checking for initializer expressions.
//!
//! Initial values may run long after the defining scope is gone, so every
//! call inside an initializer must target a static-like, public host symbol.
//! A single syntactic call chain produces several nested expressions that
//! all resolve to the same target; resolutions are deduplicated by the
//! chain's outermost node so each offending call reports once.

use propel_common::{Diagnostic, Span};
use propel_common::diagnostics::{diagnostic_codes, get_message_template};
use propel_binder::ImportResolutionContainer;
use propel_parser::NodeArena;
use propel_parser::parser::node::{NodeIndex, syntax_kind_ext};
use propel_parser::syntax::ast_util::qualified_name;
use propel_solver::symbols::{HostSymbolId, HostSymbolTable};
use rustc_hash::FxHashSet;
use smallvec::SmallVec;

pub struct InitializerCaptureChecker<'a> {
    arena: &'a NodeArena,
    file_name: &'a str,
    container: &'a ImportResolutionContainer,
    symbols: &'a HostSymbolTable,
    known_calls: FxHashSet<NodeIndex>,
    pub diagnostics: Vec<Diagnostic>,
}

impl<'a> InitializerCaptureChecker<'a> {
    pub fn new(
        arena: &'a NodeArena,
        file_name: &'a str,
        container: &'a ImportResolutionContainer,
        symbols: &'a HostSymbolTable,
    ) -> Self {
        Self {
            arena,
            file_name,
            container,
            symbols,
            known_calls: FxHashSet::default(),
            diagnostics: Vec::new(),
        }
    }

    /// Checks every expression under `expression`, children first.
    pub fn check(&mut self, expression: NodeIndex) {
        let mut children: SmallVec<[NodeIndex; 8]> = SmallVec::new();
        self.arena
            .for_each_child(expression, &mut |child| children.push(child));
        for child in children {
            self.check(child);
        }
        self.check_resolution(expression);
    }

    fn check_resolution(&mut self, expression: NodeIndex) {
        let Some((anchor, symbol)) = self.resolve_call(expression) else {
            return;
        };
        if !self.known_calls.insert(anchor) {
            return;
        }
        let span = self.arena.span(expression);
        if !self.symbols.is_static_like(symbol) {
            self.report(span, diagnostic_codes::CAPTURING_IN_INITIALIZER);
        }
        if !self.symbols.is_public(symbol) {
            self.report(span, diagnostic_codes::NON_PUBLIC_CALL_IN_INITIALIZER);
        }
    }

    fn report(&mut self, span: Span, code: u32) {
        let message = get_message_template(code).unwrap_or_default();
        self.diagnostics.push(Diagnostic::error(
            self.file_name,
            span.start,
            span.len().max(1),
            message,
            code,
        ));
    }

    /// Resolves the call chain `expression` participates in, returning the
    /// chain's outermost node and the host symbol it targets.
    fn resolve_call(&self, expression: NodeIndex) -> Option<(NodeIndex, HostSymbolId)> {
        let root = self.chain_root(expression);
        if self.arena.kind(root) != syntax_kind_ext::CALL_EXPRESSION
            && self.arena.kind(root) != syntax_kind_ext::QUALIFIED_ACCESS
        {
            return None;
        }
        // Qualified access without any call in it is a value path, not a
        // call; only chains containing a call expression resolve here.
        if !self.chain_contains_call(root) {
            return None;
        }
        let name = qualified_name(self.arena, root)?;
        let symbol = self
            .container
            .qualified_candidates(&name)
            .iter()
            .find_map(|candidate| self.symbols.find(candidate))?;
        Some((root, symbol))
    }

    fn chain_root(&self, expression: NodeIndex) -> NodeIndex {
        let mut current = expression;
        loop {
            let parent = self.arena.parent(current);
            match self.arena.kind(parent) {
                k if k == syntax_kind_ext::CALL_EXPRESSION => {
                    let data = self.arena.get_call_expression(parent);
                    if data.is_some_and(|d| d.callee == current) {
                        current = parent;
                        continue;
                    }
                    break;
                }
                k if k == syntax_kind_ext::QUALIFIED_ACCESS => {
                    let data = self.arena.get_qualified_access(parent);
                    if data.is_some_and(|d| d.selector == current) {
                        current = parent;
                        continue;
                    }
                    break;
                }
                _ => break,
            }
        }
        current
    }

    fn chain_contains_call(&self, index: NodeIndex) -> bool {
        match self.arena.kind(index) {
            k if k == syntax_kind_ext::CALL_EXPRESSION => true,
            k if k == syntax_kind_ext::QUALIFIED_ACCESS => self
                .arena
                .get_qualified_access(index)
                .is_some_and(|d| self.chain_contains_call(d.selector)),
            _ => false,
        }
    }
}

//! Structural checking of `define` blocks.
//!
//! Each top-level statement of a definition block must be, after stripping
//! parentheses, `name as Type initially value` optionally followed by
//! `within context`. Every deviation is reported, and one malformed
//! statement may produce several diagnostics; missing-type and
//! missing-initializer are anchored on the call site, shape problems on the
//! offending sub-expression.

use propel_common::{Diagnostic, Span};
use propel_common::diagnostics::{diagnostic_codes, get_message_template};
use propel_binder::{DslEntryPoint, ImportResolutionContainer, dsl_entry_point};
use propel_parser::NodeArena;
use propel_parser::parser::node::{BinaryExpressionData, NodeIndex, syntax_kind_ext};
use propel_parser::syntax::ast_util::{is_pure_identifier_chain, qualified_name};
use propel_scanner::SyntaxKind;
use propel_solver::symbols::HostSymbolTable;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use tracing::debug;

use crate::capture::InitializerCaptureChecker;

pub struct PropertyDefinitionCallChecker<'a> {
    arena: &'a NodeArena,
    file_name: &'a str,
    container: &'a ImportResolutionContainer,
    symbols: &'a HostSymbolTable,
    duplicated: &'a FxHashSet<String>,
    clashing: &'a FxHashSet<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl<'a> PropertyDefinitionCallChecker<'a> {
    pub fn new(
        arena: &'a NodeArena,
        file_name: &'a str,
        container: &'a ImportResolutionContainer,
        symbols: &'a HostSymbolTable,
        duplicated: &'a FxHashSet<String>,
        clashing: &'a FxHashSet<String>,
    ) -> Self {
        Self {
            arena,
            file_name,
            container,
            symbols,
            duplicated,
            clashing,
            diagnostics: Vec::new(),
        }
    }

    /// Checks every `define` call in the file.
    pub fn check_file(&mut self, root: NodeIndex) {
        if dsl_entry_point(self.arena, self.container, root) == Some(DslEntryPoint::Define) {
            self.check_call(root);
        }
        let mut children: SmallVec<[NodeIndex; 8]> = SmallVec::new();
        self.arena
            .for_each_child(root, &mut |child| children.push(child));
        for child in children {
            self.check_file(child);
        }
    }

    pub fn check_call(&mut self, call: NodeIndex) {
        let Some(data) = self.arena.get_call_expression(call) else { return };
        let report_on = self.arena.span(data.callee);
        let Some(lambda) = self.arena.get_lambda(data.trailing_lambda) else { return };
        debug!(statements = lambda.statements.len(), "checking definition block");
        for &statement in &lambda.statements.clone() {
            self.check_expression(statement, report_on);
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

    fn check_expression(&mut self, expression: NodeIndex, report_on: Span) {
        match self.arena.kind(expression) {
            k if k == syntax_kind_ext::PARENTHESIZED_EXPRESSION => {
                if let Some(data) = self.arena.get_parenthesized(expression) {
                    self.check_expression(data.expression, report_on);
                }
            }
            k if k == SyntaxKind::Identifier as u16 || k == syntax_kind_ext::QUALIFIED_ACCESS => {
                self.check_identifier_expression(expression, report_on);
                self.report(report_on, diagnostic_codes::MISSING_TYPE_DECLARATION);
                self.report(report_on, diagnostic_codes::MISSING_INITIALIZER_EXPRESSION);
            }
            k if k == syntax_kind_ext::CAST_EXPRESSION => {
                self.report(report_on, diagnostic_codes::MISSING_INITIALIZER_EXPRESSION);
                let Some(data) = self.arena.get_cast_expression(expression).cloned() else {
                    return;
                };
                if data.safe {
                    self.report(report_on, diagnostic_codes::MISSING_TYPE_DECLARATION);
                    self.report(data.operator_span, diagnostic_codes::ILLEGAL_OPERATOR);
                } else {
                    self.check_identifier_expression(data.operand, report_on);
                }
            }
            k if k == syntax_kind_ext::BINARY_EXPRESSION => {
                let Some(data) = self.arena.get_binary_expression(expression).cloned() else {
                    return;
                };
                match data.operator.as_str() {
                    "within" => self.check_context_expression(&data, report_on),
                    "initially" => self.check_initialisation_expression(&data, report_on),
                    _ => {
                        self.report(report_on, diagnostic_codes::MISSING_INITIALIZER_EXPRESSION);
                        self.report(data.operator_span, diagnostic_codes::ILLEGAL_OPERATOR);
                    }
                }
            }
            _ => {
                self.report(report_on, diagnostic_codes::MISSING_TYPE_DECLARATION);
                self.report(report_on, diagnostic_codes::MISSING_INITIALIZER_EXPRESSION);
                self.report(
                    self.arena.span(expression),
                    diagnostic_codes::ILLEGAL_PROPERTY_NAME,
                );
            }
        }
    }

    /// `... within ctx`: the left side must be an `initially` application.
    fn check_context_expression(&mut self, within: &BinaryExpressionData, report_on: Span) {
        let left = within.left;
        if left.is_none() {
            self.report(report_on, diagnostic_codes::MISSING_INITIALIZER_EXPRESSION);
            return;
        }
        let Some(data) = self.arena.get_binary_expression(left).cloned() else {
            self.report(report_on, diagnostic_codes::MISSING_INITIALIZER_EXPRESSION);
            self.report(self.arena.span(left), diagnostic_codes::ILLEGAL_EXPRESSION);
            return;
        };
        if data.operator != "initially" {
            self.report(report_on, diagnostic_codes::MISSING_INITIALIZER_EXPRESSION);
            self.report(within.operator_span, diagnostic_codes::ILLEGAL_OPERATOR);
            return;
        }
        self.check_initialisation_expression(&data, report_on);
    }

    /// `... initially value`: the left side must be a plain `as` cast of a
    /// pure identifier; the right side is capture-checked.
    fn check_initialisation_expression(
        &mut self,
        initially: &BinaryExpressionData,
        report_on: Span,
    ) {
        let left = initially.left;
        if left.is_none() {
            self.report(report_on, diagnostic_codes::MISSING_TYPE_DECLARATION);
        } else if let Some(cast) = self.arena.get_cast_expression(left).cloned() {
            if cast.safe {
                self.report(report_on, diagnostic_codes::MISSING_TYPE_DECLARATION);
                self.report(initially.operator_span, diagnostic_codes::ILLEGAL_OPERATOR);
            } else {
                self.check_identifier_expression(cast.operand, report_on);
            }
        } else {
            self.report(report_on, diagnostic_codes::MISSING_TYPE_DECLARATION);
            self.report(self.arena.span(left), diagnostic_codes::ILLEGAL_EXPRESSION);
        }

        if initially.right.is_some() {
            let mut capture_checker = InitializerCaptureChecker::new(
                self.arena,
                self.file_name,
                self.container,
                self.symbols,
            );
            capture_checker.check(initially.right);
            self.diagnostics.append(&mut capture_checker.diagnostics);
        }
    }

    fn check_identifier_expression(&mut self, expression: NodeIndex, report_on: Span) {
        if !is_pure_identifier_chain(self.arena, expression) {
            self.report(
                self.arena.span(expression),
                diagnostic_codes::ILLEGAL_PROPERTY_NAME,
            );
            return;
        }
        let Some(name) = qualified_name(self.arena, expression) else { return };
        // A duplicated name that also clashes reports only the duplication.
        if self.duplicated.contains(&name) {
            self.report(report_on, diagnostic_codes::DUPLICATED_PROPERTY_NAME);
        } else if self.clashing.contains(&name) {
            self.report(report_on, diagnostic_codes::CLASHING_PROPERTY_NAME);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use propel_binder::{DefinitionCollector, PropertyDefinitionRegistry};
    use propel_parser::ParserState;
    use propel_solver::symbols::symbol_flags;

    fn check(source: &str) -> Vec<u32> {
        let (arena, root, parse_diagnostics) =
            ParserState::new("test.prp", source).parse_source_file();
        assert!(parse_diagnostics.is_empty(), "{parse_diagnostics:?}");
        let mut registry = PropertyDefinitionRegistry::new();
        let base = ImportResolutionContainer::with_base_packages(&["propel"]);
        let container = DefinitionCollector::new(&arena, &mut registry, base).collect(root);
        let duplicated = registry.duplicated_property_names();
        let clashing = registry.clashing_property_names();
        let mut symbols = HostSymbolTable::new();
        symbols.register("core.listOf", symbol_flags::STATIC_LIKE | symbol_flags::PUBLIC);
        symbols.register("app.Widget.helper", symbol_flags::PUBLIC);
        let mut checker = PropertyDefinitionCallChecker::new(
            &arena,
            "test.prp",
            &container,
            &symbols,
            &duplicated,
            &clashing,
        );
        checker.check_file(root);
        checker.diagnostics.iter().map(|d| d.code).collect()
    }

    #[test]
    fn well_formed_definition_is_clean() {
        assert!(check("define { ui.message as String initially \"\" }").is_empty());
        assert!(check("define { ui.message as String initially \"\" within ctx }").is_empty());
    }

    #[test]
    fn bare_identifier_reports_missing_type_and_initializer() {
        assert_eq!(
            check("define { ui.message }"),
            vec![
                diagnostic_codes::MISSING_TYPE_DECLARATION,
                diagnostic_codes::MISSING_INITIALIZER_EXPRESSION,
            ]
        );
    }

    #[test]
    fn cast_without_initializer() {
        assert_eq!(
            check("define { ui.message as String }"),
            vec![diagnostic_codes::MISSING_INITIALIZER_EXPRESSION]
        );
    }

    #[test]
    fn safe_cast_is_an_illegal_operator() {
        assert_eq!(
            check("define { ui.message as? String }"),
            vec![
                diagnostic_codes::MISSING_INITIALIZER_EXPRESSION,
                diagnostic_codes::MISSING_TYPE_DECLARATION,
                diagnostic_codes::ILLEGAL_OPERATOR,
            ]
        );
    }

    #[test]
    fn safe_cast_under_initially() {
        assert_eq!(
            check("define { ui.message as? String initially \"\" }"),
            vec![
                diagnostic_codes::MISSING_TYPE_DECLARATION,
                diagnostic_codes::ILLEGAL_OPERATOR,
            ]
        );
    }

    #[test]
    fn unknown_operator_is_illegal() {
        assert_eq!(
            check("define { ui.message suddenly \"\" }"),
            vec![
                diagnostic_codes::MISSING_INITIALIZER_EXPRESSION,
                diagnostic_codes::ILLEGAL_OPERATOR,
            ]
        );
    }

    #[test]
    fn within_requires_initially_on_its_left() {
        assert_eq!(
            check("define { ui.message as String within ctx }"),
            vec![
                diagnostic_codes::MISSING_INITIALIZER_EXPRESSION,
                diagnostic_codes::ILLEGAL_EXPRESSION,
            ]
        );
    }

    #[test]
    fn initially_requires_a_cast_on_its_left() {
        assert_eq!(
            check("define { ui.message initially \"\" }"),
            vec![
                diagnostic_codes::MISSING_TYPE_DECLARATION,
                diagnostic_codes::ILLEGAL_EXPRESSION,
            ]
        );
    }

    #[test]
    fn literal_statement_is_an_illegal_property_name() {
        assert_eq!(
            check("define { \"text\" }"),
            vec![
                diagnostic_codes::MISSING_TYPE_DECLARATION,
                diagnostic_codes::MISSING_INITIALIZER_EXPRESSION,
                diagnostic_codes::ILLEGAL_PROPERTY_NAME,
            ]
        );
    }

    #[test]
    fn call_in_property_position_is_illegal() {
        let codes = check("define { ui.message() as String initially \"\" }");
        assert_eq!(codes, vec![diagnostic_codes::ILLEGAL_PROPERTY_NAME]);
    }

    #[test]
    fn duplicate_reported_at_every_occurrence() {
        let codes = check(
            "define { x as Int initially 1 }\ndefine { x as Int initially 2 }",
        );
        assert_eq!(
            codes,
            vec![
                diagnostic_codes::DUPLICATED_PROPERTY_NAME,
                diagnostic_codes::DUPLICATED_PROPERTY_NAME,
            ]
        );
    }

    #[test]
    fn clash_reported_on_prefix_property() {
        let codes = check(
            "define { ui as Int initially 1 }\ndefine { ui.message as String initially \"\" }",
        );
        assert_eq!(codes, vec![diagnostic_codes::CLASHING_PROPERTY_NAME]);
    }

    #[test]
    fn duplication_wins_over_clash() {
        let codes = check(
            "define { ui as Int initially 1 }\ndefine { ui as Int initially 2 }\ndefine { ui.message as String initially \"\" }",
        );
        assert_eq!(
            codes,
            vec![
                diagnostic_codes::DUPLICATED_PROPERTY_NAME,
                diagnostic_codes::DUPLICATED_PROPERTY_NAME,
            ]
        );
    }

    #[test]
    fn initializer_capture_is_checked() {
        let codes = check(
            "define { w as Int initially app.Widget.helper() }",
        );
        assert_eq!(codes, vec![diagnostic_codes::CAPTURING_IN_INITIALIZER]);
    }

    #[test]
    fn static_public_initializer_call_is_clean() {
        assert!(check("define { xs as List<Int> initially listOf(1, 2) }").is_empty());
    }
}

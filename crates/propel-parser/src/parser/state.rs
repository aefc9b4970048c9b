//! Recursive-descent parser producing arena nodes.
//!
//! Expression precedence, loosest to tightest: assignment, named infix
//! (identifier operators such as `initially` and `within`), additive,
//! multiplicative, cast (`as` / `as?`), postfix (qualified access, calls,
//! trailing lambdas). A named infix operator must start on the same line as
//! its left operand, otherwise the identifier begins a new statement.

use propel_common::{Diagnostic, Span};
use propel_common::diagnostics::{diagnostic_codes, format_message, get_message_template};
use propel_scanner::{ScannerState, SyntaxKind};
use smallvec::SmallVec;
use tracing::trace;

use super::node::{NodeIndex, NodeList, TypeArgument, TypeReferenceData, TypeVariance};
use super::node_arena::NodeArena;

const PRECEDENCE_ASSIGNMENT: u8 = 1;
const PRECEDENCE_NAMED_INFIX: u8 = 2;
const PRECEDENCE_ADDITIVE: u8 = 3;
const PRECEDENCE_MULTIPLICATIVE: u8 = 4;

pub struct ParserState<'a> {
    scanner: ScannerState<'a>,
    file_name: String,
    source_len: u32,
    pub arena: NodeArena,
    pub diagnostics: Vec<Diagnostic>,
    token: SyntaxKind,
    token_span: Span,
    line_break_before: bool,
    prev_token_end: u32,
}

impl<'a> ParserState<'a> {
    pub fn new(file_name: impl Into<String>, source: &'a str) -> Self {
        Self {
            scanner: ScannerState::new(source),
            file_name: file_name.into(),
            source_len: source.len() as u32,
            arena: NodeArena::new(),
            diagnostics: Vec::new(),
            token: SyntaxKind::Unknown,
            token_span: Span::default(),
            line_break_before: false,
            prev_token_end: 0,
        }
    }

    /// Parses the whole file and hands back the arena, the source-file node,
    /// and any parse diagnostics.
    pub fn parse_source_file(mut self) -> (NodeArena, NodeIndex, Vec<Diagnostic>) {
        trace!(file = %self.file_name, "parsing source file");
        self.next_token();
        let mut imports: NodeList = Vec::new();
        let mut statements: NodeList = Vec::new();
        while self.token != SyntaxKind::EndOfFileToken {
            if self.token == SyntaxKind::ImportKeyword {
                let import = self.parse_import();
                imports.push(import);
            } else {
                let statement = self.parse_statement();
                statements.push(statement);
            }
        }
        let span = Span::new(0, self.source_len);
        let file_name = self.file_name.clone();
        let root = self
            .arena
            .create_source_file(file_name, imports, statements, span);
        (self.arena, root, self.diagnostics)
    }

    fn next_token(&mut self) {
        self.prev_token_end = self.token_span.end;
        self.token = self.scanner.scan();
        self.token_span = self.scanner.token_span();
        self.line_break_before = self.scanner.preceded_by_line_break;
    }

    fn error_unexpected(&mut self) {
        let template =
            get_message_template(diagnostic_codes::UNEXPECTED_TOKEN).unwrap_or("Unexpected token '{0}'");
        let text = if self.token == SyntaxKind::EndOfFileToken {
            "<eof>"
        } else {
            self.scanner.token_text()
        };
        let message = format_message(template, &[text]);
        self.diagnostics.push(Diagnostic::error(
            self.file_name.clone(),
            self.token_span.start,
            self.token_span.len().max(1),
            message,
            diagnostic_codes::UNEXPECTED_TOKEN,
        ));
    }

    fn expect(&mut self, kind: SyntaxKind) -> bool {
        if self.token == kind {
            self.next_token();
            true
        } else {
            self.error_unexpected();
            false
        }
    }

    fn identifier_text_or_empty(&mut self) -> String {
        if self.token == SyntaxKind::Identifier {
            let text = self.scanner.token_text().to_string();
            self.next_token();
            text
        } else {
            self.error_unexpected();
            String::new()
        }
    }

    // ---- declarations ----

    fn parse_import(&mut self) -> NodeIndex {
        let start = self.token_span.start;
        self.next_token();
        let mut segments = Vec::new();
        let mut wildcard = false;
        if self.token == SyntaxKind::Identifier {
            segments.push(self.scanner.token_text().to_string());
            self.next_token();
            while self.token == SyntaxKind::DotToken {
                self.next_token();
                match self.token {
                    SyntaxKind::AsteriskToken => {
                        wildcard = true;
                        self.next_token();
                        break;
                    }
                    SyntaxKind::Identifier => {
                        segments.push(self.scanner.token_text().to_string());
                        self.next_token();
                    }
                    _ => {
                        self.error_unexpected();
                        break;
                    }
                }
            }
        } else {
            self.error_unexpected();
        }
        let alias = if self.token == SyntaxKind::AsKeyword {
            self.next_token();
            Some(self.identifier_text_or_empty())
        } else {
            None
        };
        let span = Span::new(start, self.prev_token_end);
        self.arena
            .create_import(segments.join("."), alias, wildcard, span)
    }

    fn parse_statement(&mut self) -> NodeIndex {
        match self.token {
            SyntaxKind::FunKeyword => self.parse_function(),
            SyntaxKind::ValKeyword | SyntaxKind::VarKeyword => self.parse_variable(),
            _ => self.parse_expression(),
        }
    }

    fn parse_function(&mut self) -> NodeIndex {
        let start = self.token_span.start;
        self.next_token();
        let name = self.identifier_text_or_empty();
        let mut parameters = Vec::new();
        if self.token == SyntaxKind::OpenParenToken {
            self.next_token();
            while self.token != SyntaxKind::CloseParenToken
                && self.token != SyntaxKind::EndOfFileToken
            {
                if self.token == SyntaxKind::Identifier {
                    parameters.push(self.scanner.token_text().to_string());
                    self.next_token();
                    if self.token == SyntaxKind::ColonToken {
                        self.next_token();
                        self.parse_type();
                    }
                } else {
                    self.error_unexpected();
                    self.next_token();
                }
                if self.token == SyntaxKind::CommaToken {
                    self.next_token();
                }
            }
            self.expect(SyntaxKind::CloseParenToken);
        }
        let body = if self.token == SyntaxKind::OpenBraceToken {
            self.parse_block()
        } else {
            Vec::new()
        };
        let span = Span::new(start, self.prev_token_end);
        self.arena.create_function(name, parameters, body, span)
    }

    fn parse_variable(&mut self) -> NodeIndex {
        let start = self.token_span.start;
        let mutable = self.token == SyntaxKind::VarKeyword;
        self.next_token();
        let name = self.identifier_text_or_empty();
        if self.token == SyntaxKind::ColonToken {
            self.next_token();
            self.parse_type();
        }
        let mut delegated = false;
        let initializer = match self.token {
            SyntaxKind::EqualsToken => {
                self.next_token();
                self.parse_expression()
            }
            SyntaxKind::ByKeyword => {
                delegated = true;
                self.next_token();
                self.parse_expression()
            }
            _ => NodeIndex::NONE,
        };
        let span = Span::new(start, self.prev_token_end);
        self.arena
            .create_variable(name, mutable, delegated, initializer, span)
    }

    /// Consumes a `{ ... }` block, returning its statements.
    fn parse_block(&mut self) -> NodeList {
        self.expect(SyntaxKind::OpenBraceToken);
        let mut statements = Vec::new();
        while self.token != SyntaxKind::CloseBraceToken
            && self.token != SyntaxKind::EndOfFileToken
        {
            statements.push(self.parse_statement());
        }
        self.expect(SyntaxKind::CloseBraceToken);
        statements
    }

    // ---- expressions ----

    pub fn parse_expression(&mut self) -> NodeIndex {
        self.parse_binary(PRECEDENCE_ASSIGNMENT)
    }

    fn current_operator(&self) -> Option<(u8, bool)> {
        match self.token {
            SyntaxKind::EqualsToken => Some((PRECEDENCE_ASSIGNMENT, true)),
            SyntaxKind::Identifier if !self.line_break_before => {
                Some((PRECEDENCE_NAMED_INFIX, false))
            }
            SyntaxKind::PlusToken | SyntaxKind::MinusToken => Some((PRECEDENCE_ADDITIVE, false)),
            SyntaxKind::AsteriskToken
            | SyntaxKind::SlashToken
            | SyntaxKind::PercentToken => Some((PRECEDENCE_MULTIPLICATIVE, false)),
            _ => None,
        }
    }

    fn parse_binary(&mut self, min_precedence: u8) -> NodeIndex {
        let mut left = self.parse_cast_operand();
        while let Some((precedence, right_assoc)) = self.current_operator() {
            if precedence < min_precedence {
                break;
            }
            let operator = self.scanner.token_text().to_string();
            let operator_span = self.token_span;
            let start = self.arena.span(left).start;
            self.next_token();
            let next_min = if right_assoc { precedence } else { precedence + 1 };
            let right = self.parse_binary(next_min);
            let span = Span::new(start, self.prev_token_end);
            left = self
                .arena
                .create_binary_expression(left, operator, operator_span, right, span);
        }
        left
    }

    fn parse_cast_operand(&mut self) -> NodeIndex {
        let mut expression = self.parse_postfix();
        while matches!(self.token, SyntaxKind::AsKeyword | SyntaxKind::AsSafeKeyword) {
            let safe = self.token == SyntaxKind::AsSafeKeyword;
            let operator_span = self.token_span;
            let start = self.arena.span(expression).start;
            self.next_token();
            let target_type = self.parse_type();
            let span = Span::new(start, self.prev_token_end);
            expression = self
                .arena
                .create_cast_expression(expression, target_type, operator_span, safe, span);
        }
        expression
    }

    fn parse_postfix(&mut self) -> NodeIndex {
        let mut expression = self.parse_primary();
        loop {
            match self.token {
                SyntaxKind::DotToken => {
                    let start = self.arena.span(expression).start;
                    self.next_token();
                    if self.token != SyntaxKind::Identifier {
                        self.error_unexpected();
                        break;
                    }
                    let name_span = self.token_span;
                    let text = self.scanner.token_text().to_string();
                    let identifier = self.arena.create_identifier(text, name_span);
                    self.next_token();
                    let selector = if self.token == SyntaxKind::OpenParenToken
                        || (self.token == SyntaxKind::OpenBraceToken && !self.line_break_before)
                    {
                        self.parse_call_suffix(identifier)
                    } else {
                        identifier
                    };
                    let span = Span::new(start, self.prev_token_end);
                    expression = self.arena.create_qualified_access(expression, selector, span);
                }
                SyntaxKind::OpenParenToken => {
                    expression = self.parse_call_suffix(expression);
                }
                SyntaxKind::OpenBraceToken if !self.line_break_before => {
                    expression = self.parse_call_suffix(expression);
                }
                _ => break,
            }
        }
        expression
    }

    /// Parses `(args)`, a trailing lambda, or both, onto `callee`.
    fn parse_call_suffix(&mut self, callee: NodeIndex) -> NodeIndex {
        let start = self.arena.span(callee).start;
        let mut arguments = Vec::new();
        if self.token == SyntaxKind::OpenParenToken {
            self.next_token();
            while self.token != SyntaxKind::CloseParenToken
                && self.token != SyntaxKind::EndOfFileToken
            {
                arguments.push(self.parse_expression());
                if self.token == SyntaxKind::CommaToken {
                    self.next_token();
                } else {
                    break;
                }
            }
            self.expect(SyntaxKind::CloseParenToken);
        }
        let trailing_lambda =
            if self.token == SyntaxKind::OpenBraceToken && !self.line_break_before {
                self.parse_lambda()
            } else {
                NodeIndex::NONE
            };
        let span = Span::new(start, self.prev_token_end);
        self.arena
            .create_call_expression(callee, arguments, trailing_lambda, span)
    }

    fn parse_lambda(&mut self) -> NodeIndex {
        let start = self.token_span.start;
        let statements = self.parse_block();
        let span = Span::new(start, self.prev_token_end);
        self.arena.create_lambda(statements, span)
    }

    fn parse_primary(&mut self) -> NodeIndex {
        match self.token {
            SyntaxKind::Identifier => {
                let span = self.token_span;
                let text = self.scanner.token_text().to_string();
                self.next_token();
                self.arena.create_identifier(text, span)
            }
            SyntaxKind::StringLiteral => {
                let span = self.token_span;
                let text = self.scanner.token_text().to_string();
                let value = self.scanner.token_value().to_string();
                self.next_token();
                self.arena
                    .create_literal(SyntaxKind::StringLiteral, text, value, span)
            }
            SyntaxKind::NumericLiteral
            | SyntaxKind::TrueKeyword
            | SyntaxKind::FalseKeyword
            | SyntaxKind::NullKeyword => {
                let kind = self.token;
                let span = self.token_span;
                let text = self.scanner.token_text().to_string();
                self.next_token();
                self.arena.create_literal(kind, text.clone(), text, span)
            }
            SyntaxKind::OpenParenToken => {
                let start = self.token_span.start;
                self.next_token();
                let inner = self.parse_expression();
                self.expect(SyntaxKind::CloseParenToken);
                let span = Span::new(start, self.prev_token_end);
                self.arena.create_parenthesized(inner, span)
            }
            SyntaxKind::OpenBraceToken => self.parse_lambda(),
            _ => {
                self.error_unexpected();
                let span = self.token_span;
                self.next_token();
                self.arena.create_unknown(span)
            }
        }
    }

    // ---- types ----

    fn parse_type(&mut self) -> NodeIndex {
        let start = self.token_span.start;
        let mut segments: SmallVec<[String; 4]> = SmallVec::new();
        if self.token == SyntaxKind::Identifier {
            segments.push(self.scanner.token_text().to_string());
            self.next_token();
            while self.token == SyntaxKind::DotToken {
                self.next_token();
                if self.token == SyntaxKind::Identifier {
                    segments.push(self.scanner.token_text().to_string());
                    self.next_token();
                } else {
                    self.error_unexpected();
                    break;
                }
            }
        } else {
            self.error_unexpected();
        }
        let name = segments.pop().unwrap_or_default();
        let qualifier = segments.into_vec();

        let mut arguments = Vec::new();
        if self.token == SyntaxKind::LessThanToken {
            self.next_token();
            while self.token != SyntaxKind::GreaterThanToken
                && self.token != SyntaxKind::EndOfFileToken
            {
                let argument = match self.token {
                    SyntaxKind::AsteriskToken => {
                        self.next_token();
                        TypeArgument {
                            variance: TypeVariance::Star,
                            ty: NodeIndex::NONE,
                        }
                    }
                    SyntaxKind::InKeyword => {
                        self.next_token();
                        TypeArgument {
                            variance: TypeVariance::In,
                            ty: self.parse_type(),
                        }
                    }
                    SyntaxKind::OutKeyword => {
                        self.next_token();
                        TypeArgument {
                            variance: TypeVariance::Out,
                            ty: self.parse_type(),
                        }
                    }
                    _ => TypeArgument {
                        variance: TypeVariance::Invariant,
                        ty: self.parse_type(),
                    },
                };
                arguments.push(argument);
                if self.token == SyntaxKind::CommaToken {
                    self.next_token();
                } else {
                    break;
                }
            }
            self.expect(SyntaxKind::GreaterThanToken);
        }

        let nullable = if self.token == SyntaxKind::QuestionToken {
            self.next_token();
            true
        } else {
            false
        };

        let span = Span::new(start, self.prev_token_end);
        self.arena.create_type_reference(
            TypeReferenceData {
                qualifier,
                name,
                arguments,
                nullable,
            },
            span,
        )
    }
}

//! Tokenizer for the host-language subset consumed by the propel pipeline.
//!
//! This crate provides the lexical analysis phase:
//! - `SyntaxKind` - Token types (also reused as AST node kinds by the parser)
//! - `ScannerState` - Tokenizer state machine

use memchr::memchr;
use propel_common::Span;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum SyntaxKind {
    Unknown = 0,
    EndOfFileToken,

    Identifier,
    StringLiteral,
    NumericLiteral,

    ImportKeyword,
    FunKeyword,
    ValKeyword,
    VarKeyword,
    ByKeyword,
    AsKeyword,
    /// The safe-cast operator `as?`, scanned as a single token.
    AsSafeKeyword,
    InKeyword,
    OutKeyword,
    TrueKeyword,
    FalseKeyword,
    NullKeyword,

    OpenParenToken,
    CloseParenToken,
    OpenBraceToken,
    CloseBraceToken,
    DotToken,
    CommaToken,
    ColonToken,
    QuestionToken,
    AsteriskToken,
    PlusToken,
    MinusToken,
    SlashToken,
    PercentToken,
    EqualsToken,
    LessThanToken,
    GreaterThanToken,
}

impl SyntaxKind {
    pub fn is_keyword(self) -> bool {
        matches!(
            self,
            SyntaxKind::ImportKeyword
                | SyntaxKind::FunKeyword
                | SyntaxKind::ValKeyword
                | SyntaxKind::VarKeyword
                | SyntaxKind::ByKeyword
                | SyntaxKind::AsKeyword
                | SyntaxKind::AsSafeKeyword
                | SyntaxKind::InKeyword
                | SyntaxKind::OutKeyword
                | SyntaxKind::TrueKeyword
                | SyntaxKind::FalseKeyword
                | SyntaxKind::NullKeyword
        )
    }

    pub fn is_literal(self) -> bool {
        matches!(
            self,
            SyntaxKind::StringLiteral
                | SyntaxKind::NumericLiteral
                | SyntaxKind::TrueKeyword
                | SyntaxKind::FalseKeyword
                | SyntaxKind::NullKeyword
        )
    }
}

fn keyword_kind(text: &str) -> Option<SyntaxKind> {
    Some(match text {
        "import" => SyntaxKind::ImportKeyword,
        "fun" => SyntaxKind::FunKeyword,
        "val" => SyntaxKind::ValKeyword,
        "var" => SyntaxKind::VarKeyword,
        "by" => SyntaxKind::ByKeyword,
        "as" => SyntaxKind::AsKeyword,
        "in" => SyntaxKind::InKeyword,
        "out" => SyntaxKind::OutKeyword,
        "true" => SyntaxKind::TrueKeyword,
        "false" => SyntaxKind::FalseKeyword,
        "null" => SyntaxKind::NullKeyword,
        _ => return None,
    })
}

fn is_identifier_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_identifier_part(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Single-pass tokenizer. `scan` advances to the next token and leaves its
/// kind, span, and text available on the state.
pub struct ScannerState<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    pub token: SyntaxKind,
    pub token_start: u32,
    pub token_end: u32,
    /// Cooked value for string literals (escapes resolved).
    token_value: String,
    /// True when a line break occurred before the current token.
    pub preceded_by_line_break: bool,
}

impl<'a> ScannerState<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            token: SyntaxKind::Unknown,
            token_start: 0,
            token_end: 0,
            token_value: String::new(),
            preceded_by_line_break: false,
        }
    }

    /// Raw source text of the current token.
    pub fn token_text(&self) -> &'a str {
        &self.source[self.token_start as usize..self.token_end as usize]
    }

    /// Cooked string value for `StringLiteral` tokens, raw text otherwise.
    pub fn token_value(&self) -> &str {
        if self.token == SyntaxKind::StringLiteral {
            &self.token_value
        } else {
            self.token_text()
        }
    }

    pub fn token_span(&self) -> Span {
        Span::new(self.token_start, self.token_end)
    }

    fn peek(&self, offset: usize) -> u8 {
        *self.bytes.get(self.pos + offset).unwrap_or(&0)
    }

    fn skip_trivia(&mut self) {
        self.preceded_by_line_break = false;
        loop {
            match self.peek(0) {
                b'\n' => {
                    self.preceded_by_line_break = true;
                    self.pos += 1;
                }
                b' ' | b'\t' | b'\r' => self.pos += 1,
                b'/' if self.peek(1) == b'/' => {
                    match memchr(b'\n', &self.bytes[self.pos..]) {
                        Some(offset) => self.pos += offset,
                        None => self.pos = self.bytes.len(),
                    }
                }
                b'/' if self.peek(1) == b'*' => {
                    self.pos += 2;
                    while self.pos < self.bytes.len() {
                        if self.peek(0) == b'*' && self.peek(1) == b'/' {
                            self.pos += 2;
                            break;
                        }
                        if self.peek(0) == b'\n' {
                            self.preceded_by_line_break = true;
                        }
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
    }

    pub fn scan(&mut self) -> SyntaxKind {
        self.skip_trivia();
        self.token_start = self.pos as u32;
        self.token_value.clear();

        let kind = if self.pos >= self.bytes.len() {
            SyntaxKind::EndOfFileToken
        } else {
            let b = self.bytes[self.pos];
            match b {
                b'(' => self.single(SyntaxKind::OpenParenToken),
                b')' => self.single(SyntaxKind::CloseParenToken),
                b'{' => self.single(SyntaxKind::OpenBraceToken),
                b'}' => self.single(SyntaxKind::CloseBraceToken),
                b'.' => self.single(SyntaxKind::DotToken),
                b',' => self.single(SyntaxKind::CommaToken),
                b':' => self.single(SyntaxKind::ColonToken),
                b'?' => self.single(SyntaxKind::QuestionToken),
                b'*' => self.single(SyntaxKind::AsteriskToken),
                b'+' => self.single(SyntaxKind::PlusToken),
                b'-' => self.single(SyntaxKind::MinusToken),
                b'/' => self.single(SyntaxKind::SlashToken),
                b'%' => self.single(SyntaxKind::PercentToken),
                b'=' => self.single(SyntaxKind::EqualsToken),
                b'<' => self.single(SyntaxKind::LessThanToken),
                b'>' => self.single(SyntaxKind::GreaterThanToken),
                b'"' => self.scan_string(),
                b'0'..=b'9' => self.scan_number(),
                _ if is_identifier_start(b) => self.scan_identifier_or_keyword(),
                _ => self.single(SyntaxKind::Unknown),
            }
        };

        self.token_end = self.pos as u32;
        self.token = kind;
        kind
    }

    fn single(&mut self, kind: SyntaxKind) -> SyntaxKind {
        self.pos += 1;
        kind
    }

    fn scan_string(&mut self) -> SyntaxKind {
        self.pos += 1;
        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b'"' => {
                    self.pos += 1;
                    return SyntaxKind::StringLiteral;
                }
                b'\\' => {
                    let escaped = self.peek(1);
                    self.token_value.push(match escaped {
                        b'n' => '\n',
                        b't' => '\t',
                        b'r' => '\r',
                        other => other as char,
                    });
                    self.pos += 2;
                }
                b'\n' => break,
                other => {
                    // Multi-byte UTF-8 sequences are copied through untouched.
                    if other < 0x80 {
                        self.token_value.push(other as char);
                        self.pos += 1;
                    } else {
                        let rest = &self.source[self.pos..];
                        let ch = rest.chars().next().unwrap_or('\u{FFFD}');
                        self.token_value.push(ch);
                        self.pos += ch.len_utf8();
                    }
                }
            }
        }
        // Unterminated string, recover at line end.
        SyntaxKind::StringLiteral
    }

    fn scan_number(&mut self) -> SyntaxKind {
        while self.peek(0).is_ascii_digit() {
            self.pos += 1;
        }
        if self.peek(0) == b'.' && self.peek(1).is_ascii_digit() {
            self.pos += 1;
            while self.peek(0).is_ascii_digit() {
                self.pos += 1;
            }
        }
        SyntaxKind::NumericLiteral
    }

    fn scan_identifier_or_keyword(&mut self) -> SyntaxKind {
        let start = self.pos;
        while self.pos < self.bytes.len() && is_identifier_part(self.bytes[self.pos]) {
            self.pos += 1;
        }
        let text = &self.source[start..self.pos];
        match keyword_kind(text) {
            Some(SyntaxKind::AsKeyword) if self.peek(0) == b'?' => {
                self.pos += 1;
                SyntaxKind::AsSafeKeyword
            }
            Some(kind) => kind,
            None => SyntaxKind::Identifier,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<SyntaxKind> {
        let mut scanner = ScannerState::new(source);
        let mut out = Vec::new();
        loop {
            let kind = scanner.scan();
            if kind == SyntaxKind::EndOfFileToken {
                break;
            }
            out.push(kind);
        }
        out
    }

    #[test]
    fn scans_define_call() {
        assert_eq!(
            kinds("define { message as String initially \"hi\" }"),
            vec![
                SyntaxKind::Identifier,
                SyntaxKind::OpenBraceToken,
                SyntaxKind::Identifier,
                SyntaxKind::AsKeyword,
                SyntaxKind::Identifier,
                SyntaxKind::Identifier,
                SyntaxKind::StringLiteral,
                SyntaxKind::CloseBraceToken,
            ]
        );
    }

    #[test]
    fn safe_cast_is_one_token() {
        assert_eq!(
            kinds("x as? Int"),
            vec![
                SyntaxKind::Identifier,
                SyntaxKind::AsSafeKeyword,
                SyntaxKind::Identifier,
            ]
        );
        // A space between `as` and `?` keeps them separate.
        assert_eq!(
            kinds("x as ? Int"),
            vec![
                SyntaxKind::Identifier,
                SyntaxKind::AsKeyword,
                SyntaxKind::QuestionToken,
                SyntaxKind::Identifier,
            ]
        );
    }

    #[test]
    fn string_escapes_are_cooked() {
        let mut scanner = ScannerState::new("\"a\\nb\"");
        assert_eq!(scanner.scan(), SyntaxKind::StringLiteral);
        assert_eq!(scanner.token_value(), "a\nb");
    }

    #[test]
    fn comments_are_trivia() {
        assert_eq!(
            kinds("a // line\n /* block */ b"),
            vec![SyntaxKind::Identifier, SyntaxKind::Identifier]
        );
    }

    #[test]
    fn line_break_flag() {
        let mut scanner = ScannerState::new("a\nb c");
        scanner.scan();
        assert!(!scanner.preceded_by_line_break);
        scanner.scan();
        assert!(scanner.preceded_by_line_break);
        scanner.scan();
        assert!(!scanner.preceded_by_line_break);
    }

    #[test]
    fn number_with_fraction() {
        let mut scanner = ScannerState::new("3.25");
        assert_eq!(scanner.scan(), SyntaxKind::NumericLiteral);
        assert_eq!(scanner.token_text(), "3.25");
    }
}

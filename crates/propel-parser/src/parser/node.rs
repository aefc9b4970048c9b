//! Thin node header and typed payload definitions.
//!
//! Each AST node is a small fixed-size header (`Node`) holding a kind tag, a
//! source span, and an index into a kind-specific payload pool on the arena.
//! Token kinds from the scanner double as node kinds for identifiers and
//! literals; structural kinds live in `syntax_kind_ext`.

use propel_common::Span;
use serde::{Deserialize, Serialize};

/// Index of a node inside a `NodeArena`. `NONE` is the absent-child sentinel.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeIndex(pub u32);

impl NodeIndex {
    pub const NONE: NodeIndex = NodeIndex(u32::MAX);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    pub fn is_some(self) -> bool {
        self != Self::NONE
    }
}

pub type NodeList = Vec<NodeIndex>;

/// Node kinds with no corresponding token.
pub mod syntax_kind_ext {
    pub const SOURCE_FILE: u16 = 200;
    pub const IMPORT_DECLARATION: u16 = 201;
    pub const FUNCTION_DECLARATION: u16 = 202;
    pub const VARIABLE_DECLARATION: u16 = 203;
    pub const BINARY_EXPRESSION: u16 = 204;
    pub const CAST_EXPRESSION: u16 = 205;
    pub const CALL_EXPRESSION: u16 = 206;
    pub const QUALIFIED_ACCESS: u16 = 207;
    pub const PARENTHESIZED_EXPRESSION: u16 = 208;
    pub const LAMBDA_EXPRESSION: u16 = 209;
    pub const TYPE_REFERENCE: u16 = 210;
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Node {
    /// SyntaxKind value or `syntax_kind_ext` constant.
    pub kind: u16,
    pub span: Span,
    /// Index into the kind-specific pool, `Node::NO_DATA` when payload-free.
    pub data_index: u32,
}

impl Node {
    pub const NO_DATA: u32 = u32::MAX;
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IdentifierData {
    pub text: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LiteralData {
    /// Raw source text.
    pub text: String,
    /// Cooked value (escapes resolved for strings, otherwise the raw text).
    pub value: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BinaryExpressionData {
    pub left: NodeIndex,
    /// Operator spelling: a symbolic token ("+", "=") or a named infix
    /// identifier ("initially", "within").
    pub operator: String,
    pub operator_span: Span,
    pub right: NodeIndex,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CastExpressionData {
    pub operand: NodeIndex,
    pub target_type: NodeIndex,
    pub operator_span: Span,
    /// True for the `as?` form.
    pub safe: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CallExpressionData {
    pub callee: NodeIndex,
    pub arguments: NodeList,
    pub trailing_lambda: NodeIndex,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QualifiedAccessData {
    pub receiver: NodeIndex,
    /// Identifier or call expression selected on the receiver.
    pub selector: NodeIndex,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParenthesizedData {
    pub expression: NodeIndex,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LambdaData {
    pub statements: NodeList,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImportData {
    /// Dotted path without the trailing `.*` for wildcard imports.
    pub path: String,
    pub alias: Option<String>,
    pub wildcard: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeVariance {
    Invariant,
    In,
    Out,
    /// Star projection; the argument carries no type.
    Star,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TypeArgument {
    pub variance: TypeVariance,
    pub ty: NodeIndex,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TypeReferenceData {
    pub qualifier: Vec<String>,
    /// Empty when the type syntax was malformed.
    pub name: String,
    pub arguments: Vec<TypeArgument>,
    pub nullable: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FunctionData {
    pub name: String,
    pub parameters: Vec<String>,
    pub body: NodeList,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VariableData {
    pub name: String,
    pub mutable: bool,
    /// True for `val x by expr` delegation.
    pub delegated: bool,
    pub initializer: NodeIndex,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourceFileData {
    pub file_name: String,
    pub imports: NodeList,
    pub statements: NodeList,
}

//! Arena storage for AST nodes.
//!
//! Nodes are thin headers in one vector; payloads live in typed side pools
//! addressed by `data_index`. Parent links are kept in a parallel vector so
//! upward walks (value-access resolution, checker context searches) are O(1)
//! per step.

use propel_common::Span;
use propel_scanner::SyntaxKind;
use serde::{Deserialize, Serialize};

use super::node::*;

#[derive(Default, Clone, Debug, Serialize, Deserialize)]
pub struct NodeArena {
    nodes: Vec<Node>,
    parents: Vec<NodeIndex>,

    identifiers: Vec<IdentifierData>,
    literals: Vec<LiteralData>,
    binaries: Vec<BinaryExpressionData>,
    casts: Vec<CastExpressionData>,
    calls: Vec<CallExpressionData>,
    qualified: Vec<QualifiedAccessData>,
    parens: Vec<ParenthesizedData>,
    lambdas: Vec<LambdaData>,
    imports: Vec<ImportData>,
    type_refs: Vec<TypeReferenceData>,
    functions: Vec<FunctionData>,
    variables: Vec<VariableData>,
    source_files: Vec<SourceFileData>,
}

macro_rules! pool_accessor {
    ($get:ident, $pool:ident, $data:ty, $kind:expr) => {
        pub fn $get(&self, index: NodeIndex) -> Option<&$data> {
            let node = self.get(index)?;
            if node.kind != $kind {
                return None;
            }
            self.$pool.get(node.data_index as usize)
        }
    };
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn push(&mut self, node: Node) -> NodeIndex {
        let index = NodeIndex(self.nodes.len() as u32);
        self.nodes.push(node);
        self.parents.push(NodeIndex::NONE);
        index
    }

    pub fn get(&self, index: NodeIndex) -> Option<&Node> {
        if index.is_none() {
            return None;
        }
        self.nodes.get(index.0 as usize)
    }

    pub fn kind(&self, index: NodeIndex) -> u16 {
        self.get(index).map_or(SyntaxKind::Unknown as u16, |n| n.kind)
    }

    pub fn span(&self, index: NodeIndex) -> Span {
        self.get(index).map_or(Span::default(), |n| n.span)
    }

    pub fn parent(&self, index: NodeIndex) -> NodeIndex {
        if index.is_none() {
            return NodeIndex::NONE;
        }
        self.parents
            .get(index.0 as usize)
            .copied()
            .unwrap_or(NodeIndex::NONE)
    }

    pub fn set_parent(&mut self, child: NodeIndex, parent: NodeIndex) {
        if child.is_some() {
            if let Some(slot) = self.parents.get_mut(child.0 as usize) {
                *slot = parent;
            }
        }
    }

    // ---- constructors ----

    pub fn create_identifier(&mut self, text: impl Into<String>, span: Span) -> NodeIndex {
        let data_index = self.identifiers.len() as u32;
        self.identifiers.push(IdentifierData { text: text.into() });
        self.push(Node {
            kind: SyntaxKind::Identifier as u16,
            span,
            data_index,
        })
    }

    /// Literal node; `kind` is the literal's token kind.
    pub fn create_literal(
        &mut self,
        kind: SyntaxKind,
        text: impl Into<String>,
        value: impl Into<String>,
        span: Span,
    ) -> NodeIndex {
        let data_index = self.literals.len() as u32;
        self.literals.push(LiteralData {
            text: text.into(),
            value: value.into(),
        });
        self.push(Node {
            kind: kind as u16,
            span,
            data_index,
        })
    }

    pub fn create_binary_expression(
        &mut self,
        left: NodeIndex,
        operator: impl Into<String>,
        operator_span: Span,
        right: NodeIndex,
        span: Span,
    ) -> NodeIndex {
        let data_index = self.binaries.len() as u32;
        self.binaries.push(BinaryExpressionData {
            left,
            operator: operator.into(),
            operator_span,
            right,
        });
        let index = self.push(Node {
            kind: syntax_kind_ext::BINARY_EXPRESSION,
            span,
            data_index,
        });
        self.set_parent(left, index);
        self.set_parent(right, index);
        index
    }

    pub fn create_cast_expression(
        &mut self,
        operand: NodeIndex,
        target_type: NodeIndex,
        operator_span: Span,
        safe: bool,
        span: Span,
    ) -> NodeIndex {
        let data_index = self.casts.len() as u32;
        self.casts.push(CastExpressionData {
            operand,
            target_type,
            operator_span,
            safe,
        });
        let index = self.push(Node {
            kind: syntax_kind_ext::CAST_EXPRESSION,
            span,
            data_index,
        });
        self.set_parent(operand, index);
        self.set_parent(target_type, index);
        index
    }

    pub fn create_call_expression(
        &mut self,
        callee: NodeIndex,
        arguments: NodeList,
        trailing_lambda: NodeIndex,
        span: Span,
    ) -> NodeIndex {
        let data_index = self.calls.len() as u32;
        let argument_list = arguments.clone();
        self.calls.push(CallExpressionData {
            callee,
            arguments,
            trailing_lambda,
        });
        let index = self.push(Node {
            kind: syntax_kind_ext::CALL_EXPRESSION,
            span,
            data_index,
        });
        self.set_parent(callee, index);
        for argument in argument_list {
            self.set_parent(argument, index);
        }
        self.set_parent(trailing_lambda, index);
        index
    }

    pub fn create_qualified_access(
        &mut self,
        receiver: NodeIndex,
        selector: NodeIndex,
        span: Span,
    ) -> NodeIndex {
        let data_index = self.qualified.len() as u32;
        self.qualified.push(QualifiedAccessData { receiver, selector });
        let index = self.push(Node {
            kind: syntax_kind_ext::QUALIFIED_ACCESS,
            span,
            data_index,
        });
        self.set_parent(receiver, index);
        self.set_parent(selector, index);
        index
    }

    pub fn create_parenthesized(&mut self, expression: NodeIndex, span: Span) -> NodeIndex {
        let data_index = self.parens.len() as u32;
        self.parens.push(ParenthesizedData { expression });
        let index = self.push(Node {
            kind: syntax_kind_ext::PARENTHESIZED_EXPRESSION,
            span,
            data_index,
        });
        self.set_parent(expression, index);
        index
    }

    pub fn create_lambda(&mut self, statements: NodeList, span: Span) -> NodeIndex {
        let data_index = self.lambdas.len() as u32;
        let children = statements.clone();
        self.lambdas.push(LambdaData { statements });
        let index = self.push(Node {
            kind: syntax_kind_ext::LAMBDA_EXPRESSION,
            span,
            data_index,
        });
        for child in children {
            self.set_parent(child, index);
        }
        index
    }

    pub fn create_import(
        &mut self,
        path: impl Into<String>,
        alias: Option<String>,
        wildcard: bool,
        span: Span,
    ) -> NodeIndex {
        let data_index = self.imports.len() as u32;
        self.imports.push(ImportData {
            path: path.into(),
            alias,
            wildcard,
        });
        self.push(Node {
            kind: syntax_kind_ext::IMPORT_DECLARATION,
            span,
            data_index,
        })
    }

    pub fn create_type_reference(&mut self, data: TypeReferenceData, span: Span) -> NodeIndex {
        let children: Vec<NodeIndex> = data
            .arguments
            .iter()
            .filter(|a| a.ty.is_some())
            .map(|a| a.ty)
            .collect();
        let data_index = self.type_refs.len() as u32;
        self.type_refs.push(data);
        let index = self.push(Node {
            kind: syntax_kind_ext::TYPE_REFERENCE,
            span,
            data_index,
        });
        for child in children {
            self.set_parent(child, index);
        }
        index
    }

    pub fn create_function(
        &mut self,
        name: impl Into<String>,
        parameters: Vec<String>,
        body: NodeList,
        span: Span,
    ) -> NodeIndex {
        let data_index = self.functions.len() as u32;
        let children = body.clone();
        self.functions.push(FunctionData {
            name: name.into(),
            parameters,
            body,
        });
        let index = self.push(Node {
            kind: syntax_kind_ext::FUNCTION_DECLARATION,
            span,
            data_index,
        });
        for child in children {
            self.set_parent(child, index);
        }
        index
    }

    pub fn create_variable(
        &mut self,
        name: impl Into<String>,
        mutable: bool,
        delegated: bool,
        initializer: NodeIndex,
        span: Span,
    ) -> NodeIndex {
        let data_index = self.variables.len() as u32;
        self.variables.push(VariableData {
            name: name.into(),
            mutable,
            delegated,
            initializer,
        });
        let index = self.push(Node {
            kind: syntax_kind_ext::VARIABLE_DECLARATION,
            span,
            data_index,
        });
        self.set_parent(initializer, index);
        index
    }

    pub fn create_source_file(
        &mut self,
        file_name: impl Into<String>,
        imports: NodeList,
        statements: NodeList,
        span: Span,
    ) -> NodeIndex {
        let data_index = self.source_files.len() as u32;
        let children: Vec<NodeIndex> = imports.iter().chain(statements.iter()).copied().collect();
        self.source_files.push(SourceFileData {
            file_name: file_name.into(),
            imports,
            statements,
        });
        let index = self.push(Node {
            kind: syntax_kind_ext::SOURCE_FILE,
            span,
            data_index,
        });
        for child in children {
            self.set_parent(child, index);
        }
        index
    }

    pub fn create_unknown(&mut self, span: Span) -> NodeIndex {
        self.push(Node {
            kind: SyntaxKind::Unknown as u16,
            span,
            data_index: Node::NO_DATA,
        })
    }

    // ---- typed accessors ----

    pool_accessor!(get_binary_expression, binaries, BinaryExpressionData, syntax_kind_ext::BINARY_EXPRESSION);
    pool_accessor!(get_cast_expression, casts, CastExpressionData, syntax_kind_ext::CAST_EXPRESSION);
    pool_accessor!(get_call_expression, calls, CallExpressionData, syntax_kind_ext::CALL_EXPRESSION);
    pool_accessor!(get_qualified_access, qualified, QualifiedAccessData, syntax_kind_ext::QUALIFIED_ACCESS);
    pool_accessor!(get_parenthesized, parens, ParenthesizedData, syntax_kind_ext::PARENTHESIZED_EXPRESSION);
    pool_accessor!(get_lambda, lambdas, LambdaData, syntax_kind_ext::LAMBDA_EXPRESSION);
    pool_accessor!(get_import, imports, ImportData, syntax_kind_ext::IMPORT_DECLARATION);
    pool_accessor!(get_type_reference, type_refs, TypeReferenceData, syntax_kind_ext::TYPE_REFERENCE);
    pool_accessor!(get_function, functions, FunctionData, syntax_kind_ext::FUNCTION_DECLARATION);
    pool_accessor!(get_variable, variables, VariableData, syntax_kind_ext::VARIABLE_DECLARATION);
    pool_accessor!(get_source_file, source_files, SourceFileData, syntax_kind_ext::SOURCE_FILE);

    pub fn get_identifier_text(&self, index: NodeIndex) -> Option<&str> {
        let node = self.get(index)?;
        if node.kind != SyntaxKind::Identifier as u16 {
            return None;
        }
        self.identifiers
            .get(node.data_index as usize)
            .map(|d| d.text.as_str())
    }

    pub fn get_literal(&self, index: NodeIndex) -> Option<&LiteralData> {
        let node = self.get(index)?;
        let kind = node.kind;
        let is_literal = kind == SyntaxKind::StringLiteral as u16
            || kind == SyntaxKind::NumericLiteral as u16
            || kind == SyntaxKind::TrueKeyword as u16
            || kind == SyntaxKind::FalseKeyword as u16
            || kind == SyntaxKind::NullKeyword as u16;
        if !is_literal {
            return None;
        }
        self.literals.get(node.data_index as usize)
    }

    /// Invokes `f` for every direct child, in source order.
    pub fn for_each_child(&self, index: NodeIndex, f: &mut impl FnMut(NodeIndex)) {
        let Some(node) = self.get(index) else { return };
        let mut visit = |child: NodeIndex| {
            if child.is_some() {
                f(child);
            }
        };
        match node.kind {
            k if k == syntax_kind_ext::BINARY_EXPRESSION => {
                if let Some(data) = self.get_binary_expression(index) {
                    visit(data.left);
                    visit(data.right);
                }
            }
            k if k == syntax_kind_ext::CAST_EXPRESSION => {
                if let Some(data) = self.get_cast_expression(index) {
                    visit(data.operand);
                    visit(data.target_type);
                }
            }
            k if k == syntax_kind_ext::CALL_EXPRESSION => {
                if let Some(data) = self.get_call_expression(index) {
                    visit(data.callee);
                    for &argument in &data.arguments {
                        visit(argument);
                    }
                    visit(data.trailing_lambda);
                }
            }
            k if k == syntax_kind_ext::QUALIFIED_ACCESS => {
                if let Some(data) = self.get_qualified_access(index) {
                    visit(data.receiver);
                    visit(data.selector);
                }
            }
            k if k == syntax_kind_ext::PARENTHESIZED_EXPRESSION => {
                if let Some(data) = self.get_parenthesized(index) {
                    visit(data.expression);
                }
            }
            k if k == syntax_kind_ext::LAMBDA_EXPRESSION => {
                if let Some(data) = self.get_lambda(index) {
                    for &statement in &data.statements {
                        visit(statement);
                    }
                }
            }
            k if k == syntax_kind_ext::FUNCTION_DECLARATION => {
                if let Some(data) = self.get_function(index) {
                    for &statement in &data.body {
                        visit(statement);
                    }
                }
            }
            k if k == syntax_kind_ext::VARIABLE_DECLARATION => {
                if let Some(data) = self.get_variable(index) {
                    visit(data.initializer);
                }
            }
            k if k == syntax_kind_ext::SOURCE_FILE => {
                if let Some(data) = self.get_source_file(index) {
                    for &import in &data.imports {
                        visit(import);
                    }
                    for &statement in &data.statements {
                        visit(statement);
                    }
                }
            }
            _ => {}
        }
    }
}

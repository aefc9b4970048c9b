//! Call-site lowering.
//!
//! Runs after collection and declaration generation, re-deriving each call's
//! property identifier directly from syntax. Definition and expectation
//! calls become one `obtainPropertyWithin` invocation; access and mutate
//! blocks are inlined at the call site, with each value read or write
//! becoming a `getValueWithin`/`setValueWithin` invocation. Failures here
//! are hard errors: a call recognized as DSL-shaped with a malformed chain
//! means the earlier phases' invariants were broken.

pub mod call_index;
pub mod ir;

use indexmap::IndexMap;
use propel_binder::StatePackage;
use propel_common::Span;
use propel_common::paths::{capitalize, split_last_segment};
use propel_parser::NodeArena;
use propel_parser::parser::node::{NodeIndex, syntax_kind_ext};
use propel_parser::syntax::ast_util::{qualified_name, unparenthesize};
use propel_scanner::SyntaxKind;
use propel_solver::resolver::TypeResolver;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use std::fmt;
use tracing::debug;

use crate::declarations::model::SyntheticKind;
use crate::lowering::call_index::CallIndex;
use crate::lowering::ir::{
    GET_VALUE, GET_VALUE_DESCRIPTOR, GLOBAL_CONTEXT_OWNER, INTRINSICS_OWNER, Instruction,
    OBTAIN_PROPERTY, OBTAIN_PROPERTY_DESCRIPTOR, SET_VALUE, SET_VALUE_DESCRIPTOR,
    initializer_singleton_owner, internal_name,
};

const SYNTHETIC_PACKAGE_PREFIX: &str = "propel/functions/";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoweringError {
    MissingIdentifier { file: String, span: Span },
    UnresolvedContext { file: String, span: Span },
}

impl fmt::Display for LoweringError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoweringError::MissingIdentifier { file, span } => {
                write!(f, "{file}:{}: missing identifier", span.start)
            }
            LoweringError::UnresolvedContext { file, span } => {
                write!(f, "{file}:{}: cannot resolve context", span.start)
            }
        }
    }
}

impl std::error::Error for LoweringError {}

/// Identifier, initializer and context re-derived from one call's syntax.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedPropertyCall {
    pub identifier: String,
    pub initializer: Option<NodeIndex>,
    pub context: Option<NodeIndex>,
}

/// A singleton class to synthesize: evaluates the captured initializer
/// expression on demand.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyntheticInitializer {
    pub class_name: String,
    pub identifier: String,
    pub expression: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct LoweredCall {
    pub call: NodeIndex,
    pub kind: SyntheticKind,
    pub instructions: Vec<Instruction>,
}

#[derive(Default)]
struct PropertyCallState {
    identifier: Option<String>,
    initializer: Option<NodeIndex>,
    context: Option<NodeIndex>,
}

pub struct LoweringPass<'a> {
    arena: &'a NodeArena,
    file_name: &'a str,
    index: &'a CallIndex,
    schema: &'a StatePackage,
    resolver: &'a TypeResolver<'a>,
    optimize: bool,
    next_slot: u16,
    initializers: IndexMap<String, SyntheticInitializer>,
}

impl<'a> LoweringPass<'a> {
    pub fn new(
        arena: &'a NodeArena,
        file_name: &'a str,
        index: &'a CallIndex,
        schema: &'a StatePackage,
        resolver: &'a TypeResolver<'a>,
        optimize: bool,
    ) -> Self {
        Self {
            arena,
            file_name,
            index,
            schema,
            resolver,
            optimize,
            next_slot: 0,
            initializers: IndexMap::new(),
        }
    }

    pub fn lower_file(&mut self, root: NodeIndex) -> Result<Vec<LoweredCall>, LoweringError> {
        let mut lowered = Vec::new();
        self.walk(root, &mut lowered)?;
        Ok(lowered)
    }

    /// Initializer singletons recorded while lowering, in first-seen order.
    pub fn into_initializers(self) -> Vec<SyntheticInitializer> {
        self.initializers.into_values().collect()
    }

    fn walk(&mut self, node: NodeIndex, out: &mut Vec<LoweredCall>) -> Result<(), LoweringError> {
        match self.index.kind_of(node) {
            SyntheticKind::DefineFunction => {
                out.push(self.lower_property_obtain(node, SyntheticKind::DefineFunction)?);
                return Ok(());
            }
            SyntheticKind::ExpectFunction => {
                out.push(self.lower_property_obtain(node, SyntheticKind::ExpectFunction)?);
                return Ok(());
            }
            SyntheticKind::AccessFunction => {
                out.push(self.lower_access_block(node, SyntheticKind::AccessFunction)?);
                return Ok(());
            }
            SyntheticKind::MutateFunction => {
                out.push(self.lower_access_block(node, SyntheticKind::MutateFunction)?);
                return Ok(());
            }
            _ => {}
        }

        let mut children: SmallVec<[NodeIndex; 8]> = SmallVec::new();
        self.arena.for_each_child(node, &mut |child| children.push(child));
        for child in children {
            self.walk(child, out)?;
        }
        Ok(())
    }

    fn lower_property_obtain(
        &mut self,
        call: NodeIndex,
        kind: SyntheticKind,
    ) -> Result<LoweredCall, LoweringError> {
        let is_definition = kind == SyntheticKind::DefineFunction;
        let resolved = self.resolve_state_property_call(call, is_definition)?;
        let owner = initializer_singleton_owner(&resolved.identifier);

        let mut instructions = vec![
            Instruction::PushString(resolved.identifier.clone()),
            Instruction::LoadSingleton { owner: owner.clone() },
        ];
        self.push_context(resolved.context, &mut instructions);
        instructions.push(Instruction::InvokeStatic {
            owner: INTRINSICS_OWNER.to_string(),
            name: OBTAIN_PROPERTY.to_string(),
            descriptor: OBTAIN_PROPERTY_DESCRIPTOR.to_string(),
        });

        if is_definition
            && let Some(expression) = resolved.initializer
        {
            debug!(identifier = %resolved.identifier, class = %owner, "recording initializer singleton");
            self.initializers
                .entry(owner.clone())
                .or_insert(SyntheticInitializer {
                    class_name: owner,
                    identifier: resolved.identifier,
                    expression,
                });
        }

        Ok(LoweredCall { call, kind, instructions })
    }

    /// Re-derives identifier, initializer and context from the call's block.
    /// Later statements overwrite earlier ones; a block that never produces
    /// an identifier is a hard error.
    pub fn resolve_state_property_call(
        &self,
        call: NodeIndex,
        is_definition: bool,
    ) -> Result<ResolvedPropertyCall, LoweringError> {
        let mut state = PropertyCallState::default();

        if let Some(data) = self.arena.get_call_expression(call)
            && let Some(lambda) = self.arena.get_lambda(data.trailing_lambda)
        {
            for &statement in &lambda.statements.clone() {
                self.visit_property_statement(statement, is_definition, &mut state);
            }
        }

        let identifier = state.identifier.ok_or_else(|| LoweringError::MissingIdentifier {
            file: self.file_name.to_string(),
            span: self.arena.span(call),
        })?;

        Ok(ResolvedPropertyCall {
            identifier,
            initializer: state.initializer,
            context: state.context,
        })
    }

    fn visit_property_statement(
        &self,
        node: NodeIndex,
        is_definition: bool,
        state: &mut PropertyCallState,
    ) {
        let kind = self.arena.kind(node);

        if kind == syntax_kind_ext::PARENTHESIZED_EXPRESSION {
            return self.visit_property_statement(
                unparenthesize(self.arena, node),
                is_definition,
                state,
            );
        }

        if kind == syntax_kind_ext::BINARY_EXPRESSION {
            let Some(data) = self.arena.get_binary_expression(node).cloned() else { return };
            match data.operator.as_str() {
                "within" => {
                    if data.right.is_none() {
                        return;
                    }
                    state.context = Some(unparenthesize(self.arena, data.right));

                    // Outside a definition the left side is the identifier
                    // chain itself; inside one it is the `initially` chain.
                    if !is_definition && data.left.is_some() {
                        return self.visit_identifier_expression(data.left, state);
                    }
                }
                "initially" => {
                    if is_definition {
                        if data.right.is_none() {
                            return;
                        }
                        state.initializer = Some(unparenthesize(self.arena, data.right));
                    }
                }
                _ => {}
            }

            if data.left.is_none() {
                return;
            }
            let left_kind = self.arena.kind(data.left);
            if (left_kind == syntax_kind_ext::BINARY_EXPRESSION
                || left_kind == syntax_kind_ext::CAST_EXPRESSION)
                && is_definition
            {
                self.visit_property_statement(data.left, is_definition, state);
            } else if left_kind == syntax_kind_ext::PARENTHESIZED_EXPRESSION {
                self.visit_property_statement(
                    unparenthesize(self.arena, data.left),
                    is_definition,
                    state,
                );
            }
            return;
        }

        if kind == syntax_kind_ext::CAST_EXPRESSION {
            if let Some(data) = self.arena.get_cast_expression(node)
                && !data.safe
            {
                self.visit_identifier_expression(data.operand, state);
            }
            return;
        }

        if (kind == SyntaxKind::Identifier as u16 || kind == syntax_kind_ext::QUALIFIED_ACCESS)
            && !is_definition
        {
            self.visit_identifier_expression(node, state);
        }
    }

    fn visit_identifier_expression(&self, node: NodeIndex, state: &mut PropertyCallState) {
        let node = unparenthesize(self.arena, node);
        if let Some(name) = qualified_name(self.arena, node) {
            state.identifier = Some(name);
        }
    }

    fn lower_access_block(
        &mut self,
        call: NodeIndex,
        kind: SyntheticKind,
    ) -> Result<LoweredCall, LoweringError> {
        let mutable = kind == SyntheticKind::MutateFunction;
        let mut instructions = Vec::new();
        let mut construct_classes = FxHashSet::default();

        self.inline_block(call, "", mutable, &mut instructions, &mut construct_classes)?;

        if self.optimize {
            remove_inline_prologues(&mut instructions, &construct_classes);
        }

        Ok(LoweredCall { call, kind, instructions })
    }

    /// Splices the block body in at the call site. The prologue mirrors the
    /// generic-dispatch preamble the host would emit for an inlined
    /// receiver; the cleanup pass deletes it again when optimizing.
    fn inline_block(
        &mut self,
        call: NodeIndex,
        package_name: &str,
        mutable: bool,
        out: &mut Vec<Instruction>,
        construct_classes: &mut FxHashSet<String>,
    ) -> Result<(), LoweringError> {
        let class = construct_class(package_name, mutable);
        construct_classes.insert(class.clone());

        let slot = self.next_slot;
        self.next_slot += 1;
        out.push(Instruction::PushNull);
        out.push(Instruction::CheckCast { class });
        out.push(Instruction::StoreLocal { slot });

        let Some(data) = self.arena.get_call_expression(call) else { return Ok(()) };
        let Some(lambda) = self.arena.get_lambda(data.trailing_lambda) else { return Ok(()) };
        for &statement in &lambda.statements.clone() {
            self.lower_block_statement(statement, mutable, out, construct_classes)?;
        }
        Ok(())
    }

    fn lower_block_statement(
        &mut self,
        statement: NodeIndex,
        mutable: bool,
        out: &mut Vec<Instruction>,
        construct_classes: &mut FxHashSet<String>,
    ) -> Result<(), LoweringError> {
        let expression = unparenthesize(self.arena, statement);
        let kind = self.arena.kind(expression);

        if kind == syntax_kind_ext::BINARY_EXPRESSION {
            let Some(data) = self.arena.get_binary_expression(expression).cloned() else {
                return Ok(());
            };
            if data.operator == "="
                && let Some(leaf) = self.find_value_access(data.left)
            {
                let resolved = self.resolve_value_access(leaf)?;
                out.push(Instruction::PushString(resolved.identifier.clone()));
                out.push(Instruction::EvalExpression { node: data.right });
                out.push(Instruction::LoadSingleton {
                    owner: initializer_singleton_owner(&resolved.identifier),
                });
                self.push_context(resolved.context, out);
                out.push(Instruction::InvokeStatic {
                    owner: INTRINSICS_OWNER.to_string(),
                    name: SET_VALUE.to_string(),
                    descriptor: SET_VALUE_DESCRIPTOR.to_string(),
                });
                return Ok(());
            }
            out.push(Instruction::EvalExpression { node: expression });
            return Ok(());
        }

        if kind == syntax_kind_ext::CALL_EXPRESSION {
            match self.index.kind_of(expression) {
                SyntheticKind::PackageAccessWithBlockAndContext => {
                    let name = self
                        .arena
                        .get_call_expression(expression)
                        .and_then(|data| self.arena.get_identifier_text(data.callee))
                        .unwrap_or_default()
                        .to_string();
                    return self.inline_block(expression, &name, mutable, out, construct_classes);
                }
                // Exists only to receive further chained access.
                SyntheticKind::PackageAccessWithContext => return Ok(()),
                _ => {}
            }
        }

        if let Some(leaf) = self.find_value_access(expression) {
            let resolved = self.resolve_value_access(leaf)?;
            out.push(Instruction::PushString(resolved.identifier.clone()));
            out.push(Instruction::LoadSingleton {
                owner: initializer_singleton_owner(&resolved.identifier),
            });
            self.push_context(resolved.context, out);
            out.push(Instruction::InvokeStatic {
                owner: INTRINSICS_OWNER.to_string(),
                name: GET_VALUE.to_string(),
                descriptor: GET_VALUE_DESCRIPTOR.to_string(),
            });
            out.push(Instruction::CheckCast {
                class: self.leaf_type_class(&resolved.identifier),
            });
            return Ok(());
        }

        out.push(Instruction::EvalExpression { node: expression });
        Ok(())
    }

    /// Leaf node of a value read within `node`, if any.
    fn find_value_access(&self, node: NodeIndex) -> Option<NodeIndex> {
        let node = unparenthesize(self.arena, node);
        if self.index.kind_of(node) == SyntheticKind::ValueAccess {
            return Some(node);
        }
        if self.arena.kind(node) == syntax_kind_ext::QUALIFIED_ACCESS {
            let data = self.arena.get_qualified_access(node)?;
            return self.find_value_access(data.selector);
        }
        None
    }

    /// Walks up from a value-access leaf accumulating namespace segments and
    /// capturing the innermost explicit context argument, until the access
    /// or mutate call that forms the boundary of the chain.
    pub fn resolve_value_access(
        &self,
        leaf: NodeIndex,
    ) -> Result<ResolvedPropertyCall, LoweringError> {
        let unresolved = || LoweringError::UnresolvedContext {
            file: self.file_name.to_string(),
            span: self.arena.span(leaf),
        };

        let mut identifier = self
            .arena
            .get_identifier_text(leaf)
            .unwrap_or_default()
            .to_string();
        let mut context: Option<NodeIndex> = None;

        let mut current = leaf;
        loop {
            if self.is_access_boundary(current) {
                break;
            }

            let kind = self.arena.kind(current);
            if kind == SyntaxKind::Identifier as u16 {
                if current != leaf && self.index.is_package_member(current) {
                    let segment = self.arena.get_identifier_text(current).unwrap_or_default();
                    identifier = format!("{segment}.{identifier}");
                }
            } else if kind == syntax_kind_ext::QUALIFIED_ACCESS {
                if let Some(data) = self.arena.get_qualified_access(current) {
                    let receiver = data.receiver;
                    if self.is_package_member_expression(receiver) {
                        self.prepend_receiver(receiver, &mut identifier, &mut context);
                    }
                }
            } else if kind == syntax_kind_ext::CALL_EXPRESSION
                && self.index.is_package_member(current)
            {
                self.prepend_receiver(current, &mut identifier, &mut context);
            }

            let parent = self.arena.parent(current);
            if parent.is_none() {
                return Err(unresolved());
            }
            current = parent;
        }

        // The boundary call's own context parameter applies only when no
        // explicit context appeared anywhere in the chain.
        if context.is_none()
            && let Some(data) = self.arena.get_call_expression(current)
            && let Some(&argument) = data.arguments.first()
            && self.arena.kind(argument) != syntax_kind_ext::LAMBDA_EXPRESSION
        {
            context = Some(argument);
        }

        Ok(ResolvedPropertyCall {
            identifier,
            initializer: None,
            context,
        })
    }

    fn prepend_receiver(
        &self,
        receiver: NodeIndex,
        identifier: &mut String,
        context: &mut Option<NodeIndex>,
    ) {
        let kind = self.arena.kind(receiver);
        if kind == SyntaxKind::Identifier as u16 || kind == syntax_kind_ext::QUALIFIED_ACCESS {
            if let Some(name) = qualified_name(self.arena, receiver) {
                *identifier = format!("{name}.{identifier}");
            }
        } else if kind == syntax_kind_ext::CALL_EXPRESSION
            && let Some(data) = self.arena.get_call_expression(receiver)
        {
            if let Some(name) = self.arena.get_identifier_text(data.callee) {
                *identifier = format!("{name}.{identifier}");
            }
            if context.is_none()
                && let Some(&argument) = data.arguments.first()
                && self.arena.kind(argument) != syntax_kind_ext::LAMBDA_EXPRESSION
            {
                *context = Some(argument);
            }
        }
    }

    fn is_package_member_expression(&self, node: NodeIndex) -> bool {
        if self.arena.kind(node) == syntax_kind_ext::QUALIFIED_ACCESS {
            return self
                .arena
                .get_qualified_access(node)
                .is_some_and(|data| self.is_package_member_expression(data.selector));
        }
        self.index.is_package_member(node)
    }

    fn is_access_boundary(&self, node: NodeIndex) -> bool {
        self.arena.kind(node) == syntax_kind_ext::CALL_EXPRESSION
            && matches!(
                self.index.kind_of(node),
                SyntheticKind::AccessFunction | SyntheticKind::MutateFunction
            )
    }

    fn push_context(&self, context: Option<NodeIndex>, out: &mut Vec<Instruction>) {
        match context {
            Some(node) => out.push(Instruction::EvalExpression { node }),
            None => out.push(Instruction::LoadSingleton {
                owner: GLOBAL_CONTEXT_OWNER.to_string(),
            }),
        }
    }

    fn leaf_type_class(&self, identifier: &str) -> String {
        let (package_path, leaf) = split_last_segment(identifier);
        let mut package = self.schema;
        if !package_path.is_empty() {
            for segment in package_path.split('.') {
                match package.find_package(segment) {
                    Some(nested) => package = nested,
                    None => return "java/lang/Object".to_string(),
                }
            }
        }
        match package.find_property(leaf) {
            Some(property) => internal_name(&property.resolved_type(self.resolver).qualified_name),
            None => "java/lang/Object".to_string(),
        }
    }
}

fn construct_class(package_name: &str, mutable: bool) -> String {
    let mut class = String::from(SYNTHETIC_PACKAGE_PREFIX);
    if mutable {
        class.push_str("Mutable");
    }
    class.push_str(&capitalize(package_name));
    class.push_str("ValueAccessConstruct");
    class
}

/// Deletes the null-cast-store prologues made dead by inlining.
fn remove_inline_prologues(instructions: &mut Vec<Instruction>, construct_classes: &FxHashSet<String>) {
    let mut result = Vec::with_capacity(instructions.len());
    let mut i = 0;
    while i < instructions.len() {
        if instructions[i] == Instruction::PushNull
            && matches!(
                instructions.get(i + 1),
                Some(Instruction::CheckCast { class }) if construct_classes.contains(class)
            )
            && matches!(instructions.get(i + 2), Some(Instruction::StoreLocal { .. }))
        {
            i += 3;
            continue;
        }
        result.push(instructions[i].clone());
        i += 1;
    }
    *instructions = result;
}

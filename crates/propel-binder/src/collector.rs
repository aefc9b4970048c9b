//! Definition collection.
//!
//! Walks a parsed file, recognizes DSL entry-point calls, and runs the
//! lenient per-statement builder over `define` blocks. The builder takes the
//! first identifier, type, initializer, and context it sees and ignores the
//! rest; the strict checker reports what the builder tolerates.

use propel_parser::NodeArena;
use propel_parser::parser::node::{NodeIndex, syntax_kind_ext};
use propel_parser::syntax::ast_util::{qualified_name, unparenthesize};
use propel_solver::types::IntermediateType;
use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::imports::ImportResolutionContainer;
use crate::registry::{IntermediatePropertyDefinition, PropertyDefinitionRegistry};

/// The package the DSL entry points live in.
pub const DSL_PACKAGE: &str = "propel";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DslEntryPoint {
    Define,
    Expect,
    Access,
    Mutate,
}

impl DslEntryPoint {
    pub fn name(self) -> &'static str {
        match self {
            DslEntryPoint::Define => "define",
            DslEntryPoint::Expect => "expect",
            DslEntryPoint::Access => "access",
            DslEntryPoint::Mutate => "mutate",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "define" => DslEntryPoint::Define,
            "expect" => DslEntryPoint::Expect,
            "access" => DslEntryPoint::Access,
            "mutate" => DslEntryPoint::Mutate,
            _ => return None,
        })
    }
}

/// Recognizes a call node as a DSL entry point. A call qualifies when it
/// carries a trailing lambda and is either the exact qualified form
/// (`propel.define { }`) or a bare name that may still resolve to the DSL
/// package in this file.
pub fn dsl_entry_point(
    arena: &NodeArena,
    container: &ImportResolutionContainer,
    call: NodeIndex,
) -> Option<DslEntryPoint> {
    let data = arena.get_call_expression(call)?;
    if data.trailing_lambda.is_none() {
        return None;
    }
    let name = arena.get_identifier_text(data.callee)?;
    let entry = DslEntryPoint::from_name(name)?;
    let parent = arena.parent(call);
    if arena.kind(parent) == syntax_kind_ext::QUALIFIED_ACCESS {
        let qualified = qualified_name(arena, parent)?;
        if qualified == format!("{DSL_PACKAGE}.{}", entry.name()) {
            return Some(entry);
        }
        return None;
    }
    if container.is_potentially_resolvable(DSL_PACKAGE, name) {
        Some(entry)
    } else {
        None
    }
}

/// First-wins accumulator for one definition statement.
struct PropertyDefinitionBuilder<'a> {
    container: &'a ImportResolutionContainer,
    identifier: Option<String>,
    ty: Option<IntermediateType>,
    initializer: Option<NodeIndex>,
    context: Option<NodeIndex>,
}

impl<'a> PropertyDefinitionBuilder<'a> {
    fn new(container: &'a ImportResolutionContainer) -> Self {
        Self {
            container,
            identifier: None,
            ty: None,
            initializer: None,
            context: None,
        }
    }

    fn identifier(&mut self, identifier: String) {
        if self.identifier.is_none() {
            debug!(identifier = %identifier, "builder: identifier");
            self.identifier = Some(identifier);
        }
    }

    fn ty(&mut self, ty: IntermediateType) {
        if self.ty.is_none() {
            debug!(ty = %ty, "builder: type");
            self.ty = Some(ty);
        }
    }

    fn initializer(&mut self, expression: NodeIndex) {
        if self.initializer.is_none() {
            self.initializer = Some(expression);
        }
    }

    fn context(&mut self, expression: NodeIndex) {
        if self.context.is_none() {
            self.context = Some(expression);
        }
    }

    fn build(self) -> Option<IntermediatePropertyDefinition> {
        let identifier = self.identifier?;
        Some(IntermediatePropertyDefinition {
            identifier,
            ty: self.ty.unwrap_or_else(IntermediateType::unit),
        })
    }

    fn visit(&mut self, arena: &NodeArena, index: NodeIndex) {
        if index.is_none() {
            return;
        }
        match arena.kind(index) {
            k if k == syntax_kind_ext::BINARY_EXPRESSION => {
                let data = arena.get_binary_expression(index).cloned();
                let Some(data) = data else { return };
                if data.left.is_some() {
                    self.visit(arena, data.left);
                }
                let right = unparenthesize(arena, data.right);
                match data.operator.as_str() {
                    "initially" => {
                        if right.is_some() {
                            self.initializer(right);
                        }
                    }
                    "within" => {
                        if right.is_some() {
                            self.context(right);
                        }
                    }
                    _ => {}
                }
            }
            k if k == syntax_kind_ext::CAST_EXPRESSION => {
                let data = arena.get_cast_expression(index).cloned();
                let Some(data) = data else { return };
                // `as?` declares neither an identifier nor a type.
                if data.safe {
                    return;
                }
                self.visit_identifier(arena, data.operand);
                if let Some(ty) = self.container.resolve_type(arena, data.target_type) {
                    self.ty(ty);
                }
            }
            k if k == propel_scanner::SyntaxKind::Identifier as u16
                || k == syntax_kind_ext::QUALIFIED_ACCESS =>
            {
                self.visit_identifier(arena, index);
            }
            k if k == syntax_kind_ext::PARENTHESIZED_EXPRESSION => {
                let inner = unparenthesize(arena, index);
                self.visit(arena, inner);
            }
            _ => {
                let mut children: SmallVec<[NodeIndex; 8]> = SmallVec::new();
                arena.for_each_child(index, &mut |child| children.push(child));
                for child in children {
                    self.visit(arena, child);
                }
            }
        }
    }

    fn visit_identifier(&mut self, arena: &NodeArena, index: NodeIndex) {
        let index = unparenthesize(arena, index);
        match qualified_name(arena, index) {
            Some(name) => self.identifier(name),
            None => warn!("unable to read a property identifier from the expression"),
        }
    }
}

/// Walks one file, collecting every definition into the shared registry.
pub struct DefinitionCollector<'a> {
    arena: &'a NodeArena,
    registry: &'a mut PropertyDefinitionRegistry,
    container: ImportResolutionContainer,
}

impl<'a> DefinitionCollector<'a> {
    pub fn new(
        arena: &'a NodeArena,
        registry: &'a mut PropertyDefinitionRegistry,
        container: ImportResolutionContainer,
    ) -> Self {
        Self {
            arena,
            registry,
            container,
        }
    }

    /// Collects the file rooted at `root` and returns the file's import
    /// container for the later phases.
    pub fn collect(mut self, root: NodeIndex) -> ImportResolutionContainer {
        let imports = self
            .arena
            .get_source_file(root)
            .map(|f| f.imports.clone())
            .unwrap_or_default();
        for import in imports {
            self.container.register_import(self.arena, import);
        }
        self.walk(root);
        self.container
    }

    fn walk(&mut self, index: NodeIndex) {
        if arena_is_define_call(self.arena, &self.container, index) {
            self.collect_definition_call(index);
        }
        let mut children: SmallVec<[NodeIndex; 8]> = SmallVec::new();
        self.arena
            .for_each_child(index, &mut |child| children.push(child));
        for child in children {
            self.walk(child);
        }
    }

    fn collect_definition_call(&mut self, call: NodeIndex) {
        let Some(data) = self.arena.get_call_expression(call) else { return };
        let Some(lambda) = self.arena.get_lambda(data.trailing_lambda) else { return };
        for &statement in &lambda.statements {
            let mut builder = PropertyDefinitionBuilder::new(&self.container);
            builder.visit(self.arena, statement);
            if let Some(definition) = builder.build() {
                self.registry.register(definition);
            }
        }
    }
}

fn arena_is_define_call(
    arena: &NodeArena,
    container: &ImportResolutionContainer,
    index: NodeIndex,
) -> bool {
    dsl_entry_point(arena, container, index) == Some(DslEntryPoint::Define)
}

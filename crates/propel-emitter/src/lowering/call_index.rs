//! Per-file synthetic-kind tagging.
//!
//! Later phases of the host compiler would answer "what does this node
//! resolve to" from its binding context; here the index precomputes that
//! answer for every node lowering cares about. Entry calls are tagged from
//! import-aware recognition, value-access chains by resolving names against
//! the schema tree.

use propel_binder::{DslEntryPoint, ImportResolutionContainer, StatePackage, dsl_entry_point};
use propel_parser::NodeArena;
use propel_parser::parser::node::{NodeIndex, syntax_kind_ext};
use propel_parser::syntax::ast_util::unparenthesize;
use propel_scanner::SyntaxKind;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::trace;

use crate::declarations::model::SyntheticKind;

#[derive(Debug, Default)]
pub struct CallIndex {
    kinds: FxHashMap<NodeIndex, SyntheticKind>,
}

impl CallIndex {
    pub fn kind_of(&self, node: NodeIndex) -> SyntheticKind {
        self.kinds.get(&node).copied().unwrap_or(SyntheticKind::Unknown)
    }

    pub fn is_package_member(&self, node: NodeIndex) -> bool {
        matches!(
            self.kind_of(node),
            SyntheticKind::PackageAccess
                | SyntheticKind::PackageAccessWithContext
                | SyntheticKind::PackageAccessWithBlockAndContext
        )
    }

    fn tag(&mut self, node: NodeIndex, kind: SyntheticKind) {
        trace!(node = node.0, ?kind, "tagging node");
        self.kinds.insert(node, kind);
    }
}

/// What a tagged expression denotes inside a value-access block.
enum PathTarget<'a> {
    Leaf,
    Package(&'a StatePackage),
}

pub struct CallIndexBuilder<'a> {
    arena: &'a NodeArena,
    container: &'a ImportResolutionContainer,
    schema: &'a StatePackage,
    index: CallIndex,
}

impl<'a> CallIndexBuilder<'a> {
    pub fn new(
        arena: &'a NodeArena,
        container: &'a ImportResolutionContainer,
        schema: &'a StatePackage,
    ) -> Self {
        Self {
            arena,
            container,
            schema,
            index: CallIndex::default(),
        }
    }

    pub fn build(mut self, root: NodeIndex) -> CallIndex {
        self.walk(root);
        self.index
    }

    fn walk(&mut self, node: NodeIndex) {
        if self.arena.kind(node) == syntax_kind_ext::CALL_EXPRESSION {
            if let Some(entry) = dsl_entry_point(self.arena, self.container, node) {
                let kind = match entry {
                    DslEntryPoint::Define => SyntheticKind::DefineFunction,
                    DslEntryPoint::Expect => SyntheticKind::ExpectFunction,
                    DslEntryPoint::Access => SyntheticKind::AccessFunction,
                    DslEntryPoint::Mutate => SyntheticKind::MutateFunction,
                };
                self.index.tag(node, kind);

                if matches!(kind, SyntheticKind::AccessFunction | SyntheticKind::MutateFunction) {
                    self.tag_block_statements(node, self.schema);
                }
            }
        }

        let mut children: SmallVec<[NodeIndex; 8]> = SmallVec::new();
        self.arena.for_each_child(node, &mut |child| children.push(child));
        for child in children {
            self.walk(child);
        }
    }

    fn tag_block_statements(&mut self, call: NodeIndex, package: &'a StatePackage) {
        let Some(data) = self.arena.get_call_expression(call) else { return };
        let Some(lambda) = self.arena.get_lambda(data.trailing_lambda) else { return };
        for &statement in &lambda.statements.clone() {
            self.tag_in_expression(statement, package);
        }
    }

    /// Tags every schema path root under `node`; descends into everything
    /// that is not itself a path.
    fn tag_in_expression(&mut self, node: NodeIndex, package: &'a StatePackage) {
        if self.arena.kind(node) == syntax_kind_ext::BINARY_EXPRESSION {
            let Some(data) = self.arena.get_binary_expression(node) else { return };
            let (left, right) = (data.left, data.right);
            if left.is_some() {
                self.tag_in_expression(left, package);
            }
            if right.is_some() {
                self.tag_in_expression(right, package);
            }
            return;
        }

        if self.tag_path(node, package).is_some() {
            return;
        }

        let mut children: SmallVec<[NodeIndex; 8]> = SmallVec::new();
        self.arena.for_each_child(node, &mut |child| children.push(child));
        for child in children {
            self.tag_in_expression(child, package);
        }
    }

    /// Tags one dotted chain rooted at `node`, resolving each segment
    /// against the current schema package. Returns what the chain denotes,
    /// or `None` when `node` is not a schema path.
    fn tag_path(&mut self, node: NodeIndex, package: &'a StatePackage) -> Option<PathTarget<'a>> {
        let node = unparenthesize(self.arena, node);
        let kind = self.arena.kind(node);

        if kind == SyntaxKind::Identifier as u16 {
            let name = self.arena.get_identifier_text(node)?;
            if package.find_property(name).is_some() {
                self.index.tag(node, SyntheticKind::ValueAccess);
                return Some(PathTarget::Leaf);
            }
            if let Some(child) = package.find_package(name) {
                self.index.tag(node, SyntheticKind::PackageAccess);
                return Some(PathTarget::Package(child));
            }
            return None;
        }

        if kind == syntax_kind_ext::QUALIFIED_ACCESS {
            let data = self.arena.get_qualified_access(node)?;
            let (receiver, selector) = (data.receiver, data.selector);
            let target = self.tag_path(receiver, package)?;
            let PathTarget::Package(child) = target else { return None };
            return self.tag_path(selector, child);
        }

        if kind == syntax_kind_ext::CALL_EXPRESSION {
            let data = self.arena.get_call_expression(node)?;
            let (callee, trailing_lambda) = (data.callee, data.trailing_lambda);
            let name = self.arena.get_identifier_text(callee)?.to_string();
            let child = package.find_package(&name)?;

            if trailing_lambda.is_some() {
                self.index.tag(node, SyntheticKind::PackageAccessWithBlockAndContext);
                self.tag_block_statements(node, child);
            } else {
                self.index.tag(node, SyntheticKind::PackageAccessWithContext);
            }
            return Some(PathTarget::Package(child));
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use propel_binder::registry::IntermediatePropertyDefinition;
    use propel_binder::PropertyDefinitionRegistry;
    use propel_parser::ParserState;
    use propel_solver::types::IntermediateType;

    fn schema() -> StatePackage {
        let mut registry = PropertyDefinitionRegistry::new();
        for identifier in ["ui.message", "ui.theme.color", "count"] {
            registry.register(IntermediatePropertyDefinition {
                identifier: identifier.to_string(),
                ty: IntermediateType::resolved("core.String"),
            });
        }
        registry.resolve()
    }

    fn index_for(source: &str) -> (NodeArena, NodeIndex, CallIndex, StatePackage) {
        let (arena, root, diagnostics) = ParserState::new("test.prp", source).parse_source_file();
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let schema = schema();
        let container = ImportResolutionContainer::with_base_packages(&["propel"]);
        let index = CallIndexBuilder::new(&arena, &container, &schema).build(root);
        (arena, root, index, schema)
    }

    fn find_identifier(arena: &NodeArena, root: NodeIndex, text: &str) -> NodeIndex {
        let mut found = NodeIndex::NONE;
        fn walk(arena: &NodeArena, node: NodeIndex, text: &str, found: &mut NodeIndex) {
            if arena.get_identifier_text(node) == Some(text) {
                *found = node;
            }
            let mut children: SmallVec<[NodeIndex; 8]> = SmallVec::new();
            arena.for_each_child(node, &mut |child| children.push(child));
            for child in children {
                walk(arena, child, text, found);
            }
        }
        walk(arena, root, text, &mut found);
        assert!(found.is_some(), "identifier {text} not found");
        found
    }

    #[test]
    fn entry_calls_are_tagged() {
        let (arena, root, index, _) = index_for("access { count }");
        let statement = arena.get_source_file(root).unwrap().statements[0];
        assert_eq!(index.kind_of(statement), SyntheticKind::AccessFunction);
    }

    #[test]
    fn dotted_chain_tags_packages_and_leaf() {
        let (arena, root, index, _) = index_for("access { ui.message }");
        assert_eq!(
            index.kind_of(find_identifier(&arena, root, "ui")),
            SyntheticKind::PackageAccess
        );
        assert_eq!(
            index.kind_of(find_identifier(&arena, root, "message")),
            SyntheticKind::ValueAccess
        );
    }

    #[test]
    fn block_form_tags_nested_scope() {
        let (arena, root, index, _) = index_for("mutate { ui { theme { color = x } } }");
        let ui_call = arena.parent(find_identifier(&arena, root, "ui"));
        assert_eq!(index.kind_of(ui_call), SyntheticKind::PackageAccessWithBlockAndContext);
        assert_eq!(
            index.kind_of(find_identifier(&arena, root, "color")),
            SyntheticKind::ValueAccess
        );
        // `x` is not part of the schema.
        assert_eq!(
            index.kind_of(find_identifier(&arena, root, "x")),
            SyntheticKind::Unknown
        );
    }

    #[test]
    fn context_call_form_is_tagged() {
        let (arena, root, index, _) = index_for("access { ui(ctx).message }");
        let ui_call = arena.parent(find_identifier(&arena, root, "ui"));
        assert_eq!(index.kind_of(ui_call), SyntheticKind::PackageAccessWithContext);
        assert_eq!(
            index.kind_of(find_identifier(&arena, root, "message")),
            SyntheticKind::ValueAccess
        );
    }

    #[test]
    fn unrelated_names_stay_untagged() {
        let (arena, root, index, _) = index_for("access { helper(count) }");
        assert_eq!(
            index.kind_of(find_identifier(&arena, root, "helper")),
            SyntheticKind::Unknown
        );
        // Paths nested inside unrelated calls still resolve.
        assert_eq!(
            index.kind_of(find_identifier(&arena, root, "count")),
            SyntheticKind::ValueAccess
        );
    }
}

//! Multi-pass compilation driver.
//!
//! Pass order matters: definitions from every file are collected into one
//! shared registry before any file is checked, so duplicate and clash
//! detection see the whole program. Lowering runs last and only on clean
//! programs; a lowering failure is a bug surfaced as a hard error, not a
//! diagnostic.

use indexmap::IndexMap;
use propel_binder::{
    DefinitionCollector, ImportResolutionContainer, PropertyDefinitionRegistry, StatePackage,
};
use propel_checker::PropertyDefinitionCallChecker;
use propel_common::{Diagnostic, DiagnosticCategory};
use propel_emitter::{
    CallIndexBuilder, DeclarationGenerator, LoweredCall, LoweringError, LoweringPass,
    SyntheticDeclarations, SyntheticInitializer,
};
use propel_parser::parser::node::NodeIndex;
use propel_parser::{NodeArena, ParserState};
use propel_solver::{HostSymbolTable, TypeResolver, TypeTable, symbol_flags};
use tracing::{debug, info};

/// Package whose callables form the DSL entry points.
pub const DSL_PACKAGE: &str = "propel";

#[derive(Clone, Debug, Default)]
pub struct CompileOptions {
    /// Strip the inlining prologues from lowered instruction streams.
    pub optimize: bool,
}

#[derive(Clone, Debug)]
pub struct SourceInput {
    pub file_name: String,
    pub text: String,
}

impl SourceInput {
    pub fn new(file_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            text: text.into(),
        }
    }
}

/// One parsed file together with its import container.
pub struct SourceUnit {
    pub file_name: String,
    pub arena: NodeArena,
    pub root: NodeIndex,
    pub container: ImportResolutionContainer,
}

pub struct LoweredUnit {
    pub file_name: String,
    pub calls: Vec<LoweredCall>,
}

pub struct CompileResult {
    pub diagnostics: Vec<Diagnostic>,
    pub schema: StatePackage,
    pub declarations: SyntheticDeclarations,
    /// Empty when diagnostics contain errors; lowering is skipped then.
    pub lowered: Vec<LoweredUnit>,
    pub initializers: Vec<SyntheticInitializer>,
    /// Internal invariant violations; the offending file contributes no
    /// lowered output, other files are unaffected.
    pub lowering_errors: Vec<LoweringError>,
}

impl CompileResult {
    pub fn has_errors(&self) -> bool {
        !self.lowering_errors.is_empty()
            || self
                .diagnostics
                .iter()
                .any(|diagnostic| diagnostic.category == DiagnosticCategory::Error)
    }
}

pub struct Compilation {
    options: CompileOptions,
    table: TypeTable,
    symbols: HostSymbolTable,
}

impl Compilation {
    pub fn new(options: CompileOptions) -> Self {
        let mut table = TypeTable::new();
        for (name, type_parameter_count) in [
            ("core.Unit", 0),
            ("core.Boolean", 0),
            ("core.Int", 0),
            ("core.Long", 0),
            ("core.Double", 0),
            ("core.String", 0),
            ("core.collections.List", 1),
            ("core.collections.Set", 1),
            ("core.collections.Map", 2),
            ("propel.Context", 0),
            ("propel.GlobalContext", 0),
            ("propel.Property", 1),
        ] {
            table.register_class(name, type_parameter_count);
        }

        let mut symbols = HostSymbolTable::new();
        for name in [
            "core.collections.listOf",
            "core.collections.setOf",
            "core.collections.mapOf",
            "core.collections.emptyList",
            "core.collections.emptyMap",
            "core.text.buildString",
        ] {
            symbols.register(name, symbol_flags::STATIC_LIKE | symbol_flags::PUBLIC);
        }

        Self {
            options,
            table,
            symbols,
        }
    }

    /// Makes a host class visible to type resolution.
    pub fn register_class(&mut self, qualified_name: &str, type_parameter_count: u8) {
        self.table.register_class(qualified_name, type_parameter_count);
    }

    /// Makes a host callable visible to initializer capture checking.
    pub fn register_symbol(&mut self, qualified_name: &str, flags: u8) {
        self.symbols.register(qualified_name, flags);
    }

    pub fn compile(&self, inputs: &[SourceInput]) -> CompileResult {
        info!(files = inputs.len(), "compiling");
        let mut diagnostics = Vec::new();

        let mut parsed = Vec::new();
        for input in inputs {
            let (arena, root, parse_diagnostics) =
                ParserState::new(&input.file_name, &input.text).parse_source_file();
            diagnostics.extend(parse_diagnostics);
            parsed.push((input.file_name.clone(), arena, root));
        }

        // Collection pass: every file feeds the one shared registry.
        let mut registry = PropertyDefinitionRegistry::new();
        let mut units = Vec::new();
        for (file_name, arena, root) in parsed {
            let collector = DefinitionCollector::new(
                &arena,
                &mut registry,
                ImportResolutionContainer::with_base_packages(&[DSL_PACKAGE]),
            );
            let container = collector.collect(root);
            units.push(SourceUnit {
                file_name,
                arena,
                root,
                container,
            });
        }

        let duplicated = registry.duplicated_property_names();
        let clashing = registry.clashing_property_names();
        for unit in &units {
            let mut checker = PropertyDefinitionCallChecker::new(
                &unit.arena,
                &unit.file_name,
                &unit.container,
                &self.symbols,
                &duplicated,
                &clashing,
            );
            checker.check_file(unit.root);
            diagnostics.extend(checker.diagnostics);
        }

        let schema = registry.resolve();
        let resolver = TypeResolver::new(&self.table);
        let declarations = DeclarationGenerator::new(&resolver).generate(&schema);

        let mut lowered = Vec::new();
        let mut lowering_errors = Vec::new();
        let mut initializers: IndexMap<String, SyntheticInitializer> = IndexMap::new();
        let has_errors = diagnostics
            .iter()
            .any(|diagnostic| diagnostic.category == DiagnosticCategory::Error);
        if !has_errors {
            for unit in &units {
                let index =
                    CallIndexBuilder::new(&unit.arena, &unit.container, &schema).build(unit.root);
                let mut pass = LoweringPass::new(
                    &unit.arena,
                    &unit.file_name,
                    &index,
                    &schema,
                    &resolver,
                    self.options.optimize,
                );
                let calls = match pass.lower_file(unit.root) {
                    Ok(calls) => calls,
                    Err(error) => {
                        lowering_errors.push(error);
                        continue;
                    }
                };
                debug!(file = %unit.file_name, calls = calls.len(), "lowered");
                for initializer in pass.into_initializers() {
                    initializers
                        .entry(initializer.class_name.clone())
                        .or_insert(initializer);
                }
                lowered.push(LoweredUnit {
                    file_name: unit.file_name.clone(),
                    calls,
                });
            }
        }

        CompileResult {
            diagnostics,
            schema,
            declarations,
            lowered,
            initializers: initializers.into_values().collect(),
            lowering_errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(sources: &[(&str, &str)]) -> CompileResult {
        let inputs: Vec<SourceInput> = sources
            .iter()
            .map(|(file, text)| SourceInput::new(*file, *text))
            .collect();
        Compilation::new(CompileOptions::default()).compile(&inputs)
    }

    #[test]
    fn clean_program_compiles_and_lowers() {
        let result = compile(&[(
            "app.prp",
            "define { ui.message as String initially \"hi\" }\naccess { ui.message }",
        )]);
        assert!(!result.has_errors(), "{:?}", result.diagnostics);
        assert_eq!(result.lowered.len(), 1);
        assert_eq!(result.lowered[0].calls.len(), 2);
        assert_eq!(result.initializers.len(), 1);
    }

    #[test]
    fn definitions_are_shared_across_files() {
        let result = compile(&[
            ("a.prp", "define { ui.message as String initially \"hi\" }"),
            ("b.prp", "define { ui.message as String initially \"yo\" }"),
        ]);
        assert!(result.has_errors());
        // Both occurrences report.
        let dup_count = result
            .diagnostics
            .iter()
            .filter(|d| d.code == propel_common::diagnostics::diagnostic_codes::DUPLICATED_PROPERTY_NAME)
            .count();
        assert_eq!(dup_count, 2);
    }

    #[test]
    fn errors_suppress_lowering() {
        let result = compile(&[("app.prp", "define { ui.message }")]);
        assert!(result.has_errors());
        assert!(result.lowered.is_empty());
        // The schema and declarations are still produced for tooling.
        assert!(result.schema.find_package("ui").is_some());
    }

    #[test]
    fn declarations_cover_the_whole_schema() {
        let result = compile(&[(
            "app.prp",
            "define { ui.theme.color as String initially \"red\" }",
        )]);
        assert!(result.declarations.find_interface("UiValueAccessConstruct").is_some());
        assert!(result.declarations.find_function("define").is_some());
        assert!(result.declarations.find_function("mutate").is_some());
    }
}

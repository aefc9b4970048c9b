//! Declaration generation from a resolved schema tree.
//!
//! Children are always generated before their parents, so a parent interface
//! can reference child construct names without back-references. The two
//! builder interfaces regenerate the nested property-access constructs
//! independently; the counting strategy keeps the second batch distinct.

use propel_binder::StatePackage;
use propel_common::paths::capitalize;
use propel_solver::resolver::TypeResolver;
use tracing::debug;

use crate::declarations::model::{
    CONTEXT_TYPE_NAME, PROPERTY_TYPE_NAME, SYNTHETIC_PACKAGE, SyntheticDeclarations,
    SyntheticFunction, SyntheticInterface, SyntheticKind, SyntheticParameter, SyntheticProperty,
    TypeExpr,
};
use crate::declarations::naming::CountingNamingStrategy;

const PROPERTY_ACCESS_CONSTRUCT_SUFFIX: &str = "PropertyAccessConstruct";
const VALUE_ACCESS_CONSTRUCT_SUFFIX: &str = "ValueAccessConstruct";
const MUTABLE_PREFIX: &str = "Mutable";

pub struct DeclarationGenerator<'a> {
    resolver: &'a TypeResolver<'a>,
    naming: CountingNamingStrategy,
    interfaces: Vec<SyntheticInterface>,
}

impl<'a> DeclarationGenerator<'a> {
    pub fn new(resolver: &'a TypeResolver<'a>) -> Self {
        Self {
            resolver,
            naming: CountingNamingStrategy::new(),
            interfaces: Vec::new(),
        }
    }

    pub fn generate(mut self, root: &StatePackage) -> SyntheticDeclarations {
        debug!(
            packages = root.packages.len(),
            properties = root.properties.len(),
            "generating synthetic declarations"
        );

        let definition_members =
            self.property_access_members(root, PROPERTY_ACCESS_CONSTRUCT_SUFFIX);
        self.interfaces.push(SyntheticInterface {
            name: "PropertyDefinitionBuilder".to_string(),
            properties: definition_members,
            functions: vec![within_function(), initially_function()],
        });

        let expect_members = self.property_access_members(root, PROPERTY_ACCESS_CONSTRUCT_SUFFIX);
        self.interfaces.push(SyntheticInterface {
            name: "PropertyExpectBuilder".to_string(),
            properties: expect_members,
            functions: vec![within_function()],
        });

        let value_access = self.value_access_construct(root, false);
        let mutable_value_access = self.value_access_construct(root, true);

        let functions = vec![
            entry_point_with_builder("define", SyntheticKind::DefineFunction, "PropertyDefinitionBuilder"),
            entry_point_with_builder("expect", SyntheticKind::ExpectFunction, "PropertyExpectBuilder"),
            entry_point_with_construct("access", SyntheticKind::AccessFunction, &value_access),
            entry_point_with_construct("mutate", SyntheticKind::MutateFunction, &mutable_value_access),
        ];

        SyntheticDeclarations {
            package: SYNTHETIC_PACKAGE.to_string(),
            interfaces: self.interfaces,
            functions,
        }
    }

    /// Property-handle members of one package: one per leaf property and one
    /// per child namespace, generating the child constructs as a side effect.
    fn property_access_members(
        &mut self,
        state_package: &StatePackage,
        suffix: &str,
    ) -> Vec<SyntheticProperty> {
        let nested_names: Vec<String> = state_package
            .packages
            .iter()
            .map(|nested| self.property_access_construct(nested, suffix))
            .collect();

        let mut properties = Vec::new();
        for property in &state_package.properties {
            let resolved = property.resolved_type(self.resolver);
            properties.push(SyntheticProperty {
                name: property.name.clone(),
                kind: SyntheticKind::Unknown,
                ty: TypeExpr::generic(
                    PROPERTY_TYPE_NAME,
                    vec![TypeExpr::named(resolved.display_name())],
                ),
                mutable: false,
            });
        }
        for (nested, construct_name) in state_package.packages.iter().zip(nested_names) {
            properties.push(SyntheticProperty {
                name: nested.name.clone(),
                kind: SyntheticKind::Unknown,
                ty: TypeExpr::named(construct_name),
                mutable: false,
            });
        }
        properties
    }

    fn property_access_construct(&mut self, state_package: &StatePackage, suffix: &str) -> String {
        let name = self
            .naming
            .rename(&format!("{}{}", capitalize(&state_package.name), suffix));
        let properties = self.property_access_members(state_package, suffix);

        self.interfaces.push(SyntheticInterface {
            name: name.clone(),
            properties,
            functions: Vec::new(),
        });
        name
    }

    fn value_access_construct(&mut self, state_package: &StatePackage, mutable: bool) -> String {
        let nested_names: Vec<String> = state_package
            .packages
            .iter()
            .map(|nested| self.value_access_construct(nested, mutable))
            .collect();

        let mut name = String::new();
        if mutable {
            name.push_str(MUTABLE_PREFIX);
        }
        name.push_str(&capitalize(&state_package.name));
        name.push_str(VALUE_ACCESS_CONSTRUCT_SUFFIX);
        let name = self.naming.rename(&name);

        let mut properties = Vec::new();
        let mut functions = Vec::new();

        for property in &state_package.properties {
            let resolved = property.resolved_type(self.resolver);
            properties.push(SyntheticProperty {
                name: property.name.clone(),
                kind: SyntheticKind::ValueAccess,
                ty: TypeExpr::named(resolved.display_name()),
                mutable,
            });
        }

        for (nested, construct_name) in state_package.packages.iter().zip(nested_names) {
            let construct_type = TypeExpr::named(construct_name);
            properties.push(SyntheticProperty {
                name: nested.name.clone(),
                kind: SyntheticKind::PackageAccess,
                ty: construct_type.clone(),
                mutable: false,
            });
            functions.push(package_access_function(&nested.name, construct_type.clone()));
            functions.push(package_block_access_function(&nested.name, construct_type));
        }

        self.interfaces.push(SyntheticInterface {
            name: name.clone(),
            properties,
            functions,
        });
        name
    }
}

fn context_parameter(has_default: bool) -> SyntheticParameter {
    SyntheticParameter {
        name: "context".to_string(),
        ty: TypeExpr::named(CONTEXT_TYPE_NAME),
        has_default,
    }
}

fn generic_property_type() -> TypeExpr {
    TypeExpr::generic(PROPERTY_TYPE_NAME, vec![TypeExpr::TypeParameter("T".to_string())])
}

/// `infix fun <T> Property<T>.within(context: Context): Property<T>`
fn within_function() -> SyntheticFunction {
    SyntheticFunction {
        name: "within".to_string(),
        kind: SyntheticKind::Unknown,
        type_parameters: vec!["T".to_string()],
        receiver: Some(generic_property_type()),
        parameters: vec![context_parameter(false)],
        return_type: generic_property_type(),
        infix: true,
        inline: false,
    }
}

/// `infix fun <T> T.initially(value: T): Property<T>`
fn initially_function() -> SyntheticFunction {
    SyntheticFunction {
        name: "initially".to_string(),
        kind: SyntheticKind::Unknown,
        type_parameters: vec!["T".to_string()],
        receiver: Some(TypeExpr::TypeParameter("T".to_string())),
        parameters: vec![SyntheticParameter {
            name: "value".to_string(),
            ty: TypeExpr::TypeParameter("T".to_string()),
            has_default: false,
        }],
        return_type: generic_property_type(),
        infix: true,
        inline: false,
    }
}

fn entry_point_with_builder(name: &str, kind: SyntheticKind, builder: &str) -> SyntheticFunction {
    SyntheticFunction {
        name: name.to_string(),
        kind,
        type_parameters: vec!["T".to_string()],
        receiver: None,
        parameters: vec![SyntheticParameter {
            name: "block".to_string(),
            ty: TypeExpr::block(TypeExpr::named(builder), generic_property_type()),
            has_default: false,
        }],
        return_type: generic_property_type(),
        infix: false,
        inline: false,
    }
}

fn entry_point_with_construct(name: &str, kind: SyntheticKind, construct: &str) -> SyntheticFunction {
    SyntheticFunction {
        name: name.to_string(),
        kind,
        type_parameters: vec!["T".to_string()],
        receiver: None,
        parameters: vec![
            context_parameter(true),
            SyntheticParameter {
                name: "block".to_string(),
                ty: TypeExpr::block(
                    TypeExpr::named(construct),
                    TypeExpr::TypeParameter("T".to_string()),
                ),
                has_default: false,
            },
        ],
        return_type: TypeExpr::TypeParameter("T".to_string()),
        infix: false,
        inline: true,
    }
}

fn package_access_function(name: &str, construct_type: TypeExpr) -> SyntheticFunction {
    SyntheticFunction {
        name: name.to_string(),
        kind: SyntheticKind::PackageAccessWithContext,
        type_parameters: Vec::new(),
        receiver: None,
        parameters: vec![context_parameter(true)],
        return_type: construct_type,
        infix: false,
        inline: false,
    }
}

fn package_block_access_function(name: &str, construct_type: TypeExpr) -> SyntheticFunction {
    SyntheticFunction {
        name: name.to_string(),
        kind: SyntheticKind::PackageAccessWithBlockAndContext,
        type_parameters: vec!["T".to_string()],
        receiver: None,
        parameters: vec![
            context_parameter(true),
            SyntheticParameter {
                name: "block".to_string(),
                ty: TypeExpr::block(construct_type.clone(), TypeExpr::TypeParameter("T".to_string())),
                has_default: false,
            },
        ],
        return_type: TypeExpr::TypeParameter("T".to_string()),
        infix: false,
        inline: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use propel_binder::PropertyDefinitionRegistry;
    use propel_binder::registry::IntermediatePropertyDefinition;
    use propel_solver::table::TypeTable;
    use propel_solver::types::IntermediateType;

    fn schema_for(identifiers: &[(&str, &str)]) -> StatePackage {
        let mut registry = PropertyDefinitionRegistry::new();
        for (identifier, type_name) in identifiers {
            registry.register(IntermediatePropertyDefinition {
                identifier: identifier.to_string(),
                ty: IntermediateType::resolved(*type_name),
            });
        }
        registry.resolve()
    }

    fn table() -> TypeTable {
        let mut table = TypeTable::new();
        table.register_class("core.String", 0);
        table.register_class("core.Int", 0);
        table
    }

    fn generate(identifiers: &[(&str, &str)]) -> SyntheticDeclarations {
        let schema = schema_for(identifiers);
        let table = table();
        let resolver = TypeResolver::new(&table);
        DeclarationGenerator::new(&resolver).generate(&schema)
    }

    #[test]
    fn nested_package_yields_named_constructs() {
        let declarations = generate(&[("ui.message", "core.String")]);

        let value_access = declarations.find_interface("UiValueAccessConstruct").unwrap();
        let message = value_access.find_property("message").unwrap();
        assert_eq!(message.kind, SyntheticKind::ValueAccess);
        assert_eq!(message.ty.to_string(), "core.String");
        assert!(!message.mutable);

        let mutable = declarations
            .find_interface("MutableUiValueAccessConstruct")
            .unwrap();
        assert!(mutable.find_property("message").unwrap().mutable);
    }

    #[test]
    fn builders_regenerate_access_constructs_with_counted_names() {
        let declarations = generate(&[("ui.message", "core.String")]);

        // The definition builder generates the first batch, the expect
        // builder the second.
        assert!(declarations.find_interface("UiPropertyAccessConstruct").is_some());
        assert!(declarations.find_interface("UiPropertyAccessConstruct2").is_some());

        let builder = declarations.find_interface("PropertyDefinitionBuilder").unwrap();
        assert_eq!(
            builder.find_property("ui").unwrap().ty.to_string(),
            "UiPropertyAccessConstruct"
        );
        let expect_builder = declarations.find_interface("PropertyExpectBuilder").unwrap();
        assert_eq!(
            expect_builder.find_property("ui").unwrap().ty.to_string(),
            "UiPropertyAccessConstruct2"
        );
    }

    #[test]
    fn builder_operator_members() {
        let declarations = generate(&[("x", "core.Int")]);

        let builder = declarations.find_interface("PropertyDefinitionBuilder").unwrap();
        let initially = builder.find_function("initially").unwrap();
        assert!(initially.infix);
        assert_eq!(initially.return_type.to_string(), "propel.Property<T>");
        assert!(builder.find_function("within").is_some());

        let expect_builder = declarations.find_interface("PropertyExpectBuilder").unwrap();
        assert!(expect_builder.find_function("within").is_some());
        assert!(expect_builder.find_function("initially").is_none());
    }

    #[test]
    fn entry_points_are_tagged() {
        let declarations = generate(&[("x", "core.Int")]);

        assert_eq!(
            declarations.find_function("define").unwrap().kind,
            SyntheticKind::DefineFunction
        );
        assert_eq!(
            declarations.find_function("expect").unwrap().kind,
            SyntheticKind::ExpectFunction
        );
        let access = declarations.find_function("access").unwrap();
        assert_eq!(access.kind, SyntheticKind::AccessFunction);
        assert!(access.inline);
        assert!(access.parameters[0].has_default);
        let mutate = declarations.find_function("mutate").unwrap();
        assert_eq!(mutate.kind, SyntheticKind::MutateFunction);
        assert_eq!(
            mutate.parameters[1].ty.to_string(),
            "MutableValueAccessConstruct.() -> T"
        );
    }

    #[test]
    fn child_namespaces_get_access_functions() {
        let declarations = generate(&[("ui.theme.color", "core.String")]);

        let ui = declarations.find_interface("UiValueAccessConstruct").unwrap();
        let theme_property = ui.find_property("theme").unwrap();
        assert_eq!(theme_property.kind, SyntheticKind::PackageAccess);
        assert_eq!(theme_property.ty.to_string(), "ThemeValueAccessConstruct");

        let theme_functions: Vec<_> = ui.functions.iter().filter(|f| f.name == "theme").collect();
        assert_eq!(theme_functions.len(), 2);
        assert_eq!(theme_functions[0].kind, SyntheticKind::PackageAccessWithContext);
        assert_eq!(
            theme_functions[1].kind,
            SyntheticKind::PackageAccessWithBlockAndContext
        );
    }

    #[test]
    fn generation_is_deterministic_across_runs() {
        let first = generate(&[("ui.message", "core.String"), ("ui.count", "core.Int")]);
        let second = generate(&[("ui.message", "core.String"), ("ui.count", "core.Int")]);

        let first_names: Vec<_> = first.interfaces.iter().map(|i| &i.name).collect();
        let second_names: Vec<_> = second.interfaces.iter().map(|i| &i.name).collect();
        assert_eq!(first_names, second_names);
    }
}

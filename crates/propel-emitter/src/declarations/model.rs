//! Value model of the generated declarations.
//!
//! Every synthesized function and property carries a `SyntheticKind` tag;
//! lowering dispatches on the tag alone and never inspects names.

use serde::Serialize;
use std::fmt;

/// Package all synthesized top-level declarations live in.
pub const SYNTHETIC_PACKAGE: &str = "propel.functions";

/// Qualified name of the generic property handle type.
pub const PROPERTY_TYPE_NAME: &str = "propel.Property";

/// Qualified name of the storage context capability.
pub const CONTEXT_TYPE_NAME: &str = "propel.Context";

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum SyntheticKind {
    Unknown,

    DefineFunction,
    ExpectFunction,
    AccessFunction,
    MutateFunction,

    ValueAccess,
    PackageAccess,
    PackageAccessWithContext,
    PackageAccessWithBlockAndContext,
}

/// Rendered type expression in a synthetic signature.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum TypeExpr {
    Named {
        name: String,
        arguments: Vec<TypeExpr>,
    },
    TypeParameter(String),
    /// `Receiver.() -> Result` function literal with receiver.
    FunctionWithReceiver {
        receiver: Box<TypeExpr>,
        result: Box<TypeExpr>,
    },
}

impl TypeExpr {
    pub fn named(name: impl Into<String>) -> Self {
        TypeExpr::Named {
            name: name.into(),
            arguments: Vec::new(),
        }
    }

    pub fn generic(name: impl Into<String>, arguments: Vec<TypeExpr>) -> Self {
        TypeExpr::Named {
            name: name.into(),
            arguments,
        }
    }

    pub fn block(receiver: TypeExpr, result: TypeExpr) -> Self {
        TypeExpr::FunctionWithReceiver {
            receiver: Box::new(receiver),
            result: Box::new(result),
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Named { name, arguments } => {
                write!(f, "{name}")?;
                if !arguments.is_empty() {
                    write!(f, "<")?;
                    for (i, argument) in arguments.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{argument}")?;
                    }
                    write!(f, ">")?;
                }
                Ok(())
            }
            TypeExpr::TypeParameter(name) => write!(f, "{name}"),
            TypeExpr::FunctionWithReceiver { receiver, result } => {
                write!(f, "{receiver}.() -> {result}")
            }
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct SyntheticParameter {
    pub name: String,
    pub ty: TypeExpr,
    pub has_default: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct SyntheticFunction {
    pub name: String,
    pub kind: SyntheticKind,
    pub type_parameters: Vec<String>,
    /// Extension receiver type for infix members.
    pub receiver: Option<TypeExpr>,
    pub parameters: Vec<SyntheticParameter>,
    pub return_type: TypeExpr,
    pub infix: bool,
    pub inline: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct SyntheticProperty {
    pub name: String,
    pub kind: SyntheticKind,
    pub ty: TypeExpr,
    pub mutable: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct SyntheticInterface {
    pub name: String,
    pub properties: Vec<SyntheticProperty>,
    pub functions: Vec<SyntheticFunction>,
}

impl SyntheticInterface {
    pub fn find_property(&self, name: &str) -> Option<&SyntheticProperty> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn find_function(&self, name: &str) -> Option<&SyntheticFunction> {
        self.functions.iter().find(|f| f.name == name)
    }
}

/// Everything contributed to the synthetic package for one compilation.
#[derive(Clone, Debug, Serialize)]
pub struct SyntheticDeclarations {
    pub package: String,
    pub interfaces: Vec<SyntheticInterface>,
    pub functions: Vec<SyntheticFunction>,
}

impl SyntheticDeclarations {
    pub fn find_interface(&self, name: &str) -> Option<&SyntheticInterface> {
        self.interfaces.iter().find(|i| i.name == name)
    }

    pub fn find_function(&self, name: &str) -> Option<&SyntheticFunction> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn dump_lines(&self) -> Vec<String> {
        let mut out = Vec::new();
        out.push(format!("package {}", self.package));
        for interface in &self.interfaces {
            out.push(format!("  interface {}", interface.name));
            for property in &interface.properties {
                let keyword = if property.mutable { "var" } else { "val" };
                out.push(format!(
                    "    {keyword} {}: {}  [{:?}]",
                    property.name, property.ty, property.kind
                ));
            }
            for function in &interface.functions {
                out.push(format!("    {}", render_function(function)));
            }
        }
        for function in &self.functions {
            out.push(format!("  {}", render_function(function)));
        }
        out
    }
}

fn render_function(function: &SyntheticFunction) -> String {
    let mut text = String::new();
    if function.inline {
        text.push_str("inline ");
    }
    if function.infix {
        text.push_str("infix ");
    }
    text.push_str("fun ");
    if !function.type_parameters.is_empty() {
        text.push('<');
        text.push_str(&function.type_parameters.join(", "));
        text.push_str("> ");
    }
    if let Some(receiver) = &function.receiver {
        text.push_str(&format!("{receiver}."));
    }
    text.push_str(&function.name);
    text.push('(');
    for (i, parameter) in function.parameters.iter().enumerate() {
        if i > 0 {
            text.push_str(", ");
        }
        text.push_str(&format!("{}: {}", parameter.name, parameter.ty));
        if parameter.has_default {
            text.push_str(" = ...");
        }
    }
    text.push_str(&format!("): {}  [{:?}]", function.return_type, function.kind));
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_expr_rendering() {
        let ty = TypeExpr::generic(
            "propel.Property",
            vec![TypeExpr::generic("core.List", vec![TypeExpr::named("core.Int")])],
        );
        assert_eq!(ty.to_string(), "propel.Property<core.List<core.Int>>");

        let block = TypeExpr::block(
            TypeExpr::named("ValueAccessConstruct"),
            TypeExpr::TypeParameter("T".to_string()),
        );
        assert_eq!(block.to_string(), "ValueAccessConstruct.() -> T");
    }
}

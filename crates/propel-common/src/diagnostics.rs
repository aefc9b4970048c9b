use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticCategory {
    Warning,
    Error,
    Suggestion,
    Message,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DiagnosticMessage {
    pub code: u32,
    pub category: DiagnosticCategory,
    pub message: &'static str,
}

/// Stable codes for every diagnostic the pipeline can emit.
pub mod diagnostic_codes {
    pub const UNEXPECTED_TOKEN: u32 = 1000;
    pub const MISSING_TYPE_DECLARATION: u32 = 1001;
    pub const MISSING_INITIALIZER_EXPRESSION: u32 = 1002;
    pub const DUPLICATED_PROPERTY_NAME: u32 = 1003;
    pub const CLASHING_PROPERTY_NAME: u32 = 1004;
    pub const ILLEGAL_PROPERTY_NAME: u32 = 1005;
    pub const ILLEGAL_OPERATOR: u32 = 1006;
    pub const ILLEGAL_EXPRESSION: u32 = 1007;
    pub const CAPTURING_IN_INITIALIZER: u32 = 1008;
    pub const NON_PUBLIC_CALL_IN_INITIALIZER: u32 = 1009;
}

pub static DIAGNOSTIC_MESSAGES: &[DiagnosticMessage] = &[
    DiagnosticMessage {
        code: diagnostic_codes::UNEXPECTED_TOKEN,
        category: DiagnosticCategory::Error,
        message: "Unexpected token '{0}'",
    },
    DiagnosticMessage {
        code: diagnostic_codes::MISSING_TYPE_DECLARATION,
        category: DiagnosticCategory::Error,
        message: "Missing type declaration",
    },
    DiagnosticMessage {
        code: diagnostic_codes::MISSING_INITIALIZER_EXPRESSION,
        category: DiagnosticCategory::Error,
        message: "Missing initializer expression",
    },
    DiagnosticMessage {
        code: diagnostic_codes::DUPLICATED_PROPERTY_NAME,
        category: DiagnosticCategory::Error,
        message: "Redefinition of property name: property cannot be declared more than once",
    },
    DiagnosticMessage {
        code: diagnostic_codes::CLASHING_PROPERTY_NAME,
        category: DiagnosticCategory::Error,
        message: "Property name may not be a sub identifier of another property",
    },
    DiagnosticMessage {
        code: diagnostic_codes::ILLEGAL_PROPERTY_NAME,
        category: DiagnosticCategory::Error,
        message: "Property name may only consist of identifiers and dots",
    },
    DiagnosticMessage {
        code: diagnostic_codes::ILLEGAL_OPERATOR,
        category: DiagnosticCategory::Error,
        message: "Illegal operator",
    },
    DiagnosticMessage {
        code: diagnostic_codes::ILLEGAL_EXPRESSION,
        category: DiagnosticCategory::Error,
        message: "Illegal expression",
    },
    DiagnosticMessage {
        code: diagnostic_codes::CAPTURING_IN_INITIALIZER,
        category: DiagnosticCategory::Error,
        message: "Cannot capture local/non-static variable or function in initializer",
    },
    DiagnosticMessage {
        code: diagnostic_codes::NON_PUBLIC_CALL_IN_INITIALIZER,
        category: DiagnosticCategory::Error,
        message: "Cannot access non-public variable or function in initializer",
    },
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticRelatedInformation {
    pub category: DiagnosticCategory,
    pub code: u32,
    pub file: String,
    pub start: u32,
    pub length: u32,
    pub message_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub category: DiagnosticCategory,
    pub code: u32,
    pub file: String,
    pub start: u32,
    pub length: u32,
    pub message_text: String,
    pub related_information: Vec<DiagnosticRelatedInformation>,
}

impl Diagnostic {
    pub fn error(
        file: impl Into<String>,
        start: u32,
        length: u32,
        message: impl Into<String>,
        code: u32,
    ) -> Self {
        Self {
            category: DiagnosticCategory::Error,
            message_text: message.into(),
            code,
            file: file.into(),
            start,
            length,
            related_information: Vec::new(),
        }
    }

    pub fn with_related(
        mut self,
        file: impl Into<String>,
        start: u32,
        length: u32,
        message: impl Into<String>,
    ) -> Self {
        self.related_information.push(DiagnosticRelatedInformation {
            category: DiagnosticCategory::Message,
            code: 0,
            file: file.into(),
            start,
            length,
            message_text: message.into(),
        });
        self
    }
}

pub fn get_message_template(code: u32) -> Option<&'static str> {
    DIAGNOSTIC_MESSAGES
        .iter()
        .find(|m| m.code == code)
        .map(|m| m.message)
}

pub fn format_message(message: &str, args: &[&str]) -> String {
    let mut result = message.to_string();
    for (i, arg) in args.iter().enumerate() {
        result = result.replace(&format!("{{{i}}}"), arg);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_lookup_and_formatting() {
        let template = get_message_template(diagnostic_codes::UNEXPECTED_TOKEN).unwrap();
        assert_eq!(format_message(template, &["}"]), "Unexpected token '}'");
        assert_eq!(
            get_message_template(diagnostic_codes::ILLEGAL_OPERATOR),
            Some("Illegal operator")
        );
    }

    #[test]
    fn codes_are_unique() {
        for (i, a) in DIAGNOSTIC_MESSAGES.iter().enumerate() {
            for b in &DIAGNOSTIC_MESSAGES[i + 1..] {
                assert_ne!(a.code, b.code);
            }
        }
    }
}

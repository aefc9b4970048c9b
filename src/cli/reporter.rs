use colored::Colorize;
use std::collections::HashMap;

use propel_common::{Diagnostic, DiagnosticCategory};

/// Renders diagnostics as `file:line:col - error PE1234: message`.
pub struct Reporter {
    color: bool,
    sources: HashMap<String, String>,
}

impl Reporter {
    pub fn new(color: bool) -> Self {
        Reporter {
            color,
            sources: HashMap::new(),
        }
    }

    /// Sources are needed to turn byte offsets into line and column.
    pub fn register_source(&mut self, file_name: &str, text: &str) {
        self.sources.insert(file_name.to_string(), text.to_string());
    }

    pub fn render(&self, diagnostics: &[Diagnostic]) -> String {
        let mut out = String::new();
        for (index, diagnostic) in diagnostics.iter().enumerate() {
            if index > 0 {
                out.push('\n');
            }
            out.push_str(&self.format_diagnostic(diagnostic));
        }
        out
    }

    pub fn format_diagnostic(&self, diagnostic: &Diagnostic) -> String {
        let location = match self.sources.get(&diagnostic.file) {
            Some(source) => {
                let (line, col) = line_col(source, diagnostic.start);
                format!("{}:{line}:{col}", diagnostic.file)
            }
            None if diagnostic.file.is_empty() => "<unknown>".to_string(),
            None => diagnostic.file.clone(),
        };

        let category = self.format_category(diagnostic.category);
        let code = format!("PE{}", diagnostic.code);
        let code = if self.color {
            code.dimmed().to_string()
        } else {
            code
        };

        format!(
            "{location} - {category} {code}: {}",
            diagnostic.message_text
        )
    }

    fn format_category(&self, category: DiagnosticCategory) -> String {
        let text = match category {
            DiagnosticCategory::Error => "error",
            DiagnosticCategory::Warning => "warning",
            DiagnosticCategory::Suggestion => "suggestion",
            DiagnosticCategory::Message => "message",
        };
        if !self.color {
            return text.to_string();
        }
        match category {
            DiagnosticCategory::Error => text.red().to_string(),
            DiagnosticCategory::Warning => text.yellow().to_string(),
            _ => text.cyan().to_string(),
        }
    }
}

fn line_col(source: &str, offset: u32) -> (u32, u32) {
    let mut line = 1;
    let mut col = 1;
    for (index, byte) in source.bytes().enumerate() {
        if index as u32 >= offset {
            break;
        }
        if byte == b'\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}

#[cfg(test)]
mod tests {
    use super::*;
    use propel_common::diagnostics::diagnostic_codes;

    #[test]
    fn formats_with_location() {
        let mut reporter = Reporter::new(false);
        reporter.register_source("app.prp", "define {\n  ui.message\n}");
        let diagnostic = Diagnostic::error(
            "app.prp",
            11,
            10,
            "Missing type declaration",
            diagnostic_codes::MISSING_TYPE_DECLARATION,
        );
        assert_eq!(
            reporter.format_diagnostic(&diagnostic),
            "app.prp:2:3 - error PE1001: Missing type declaration"
        );
    }

    #[test]
    fn unknown_files_fall_back_to_the_name() {
        let reporter = Reporter::new(false);
        let diagnostic = Diagnostic::error("gone.prp", 0, 1, "Unexpected token", 1000);
        assert_eq!(
            reporter.format_diagnostic(&diagnostic),
            "gone.prp - error PE1000: Unexpected token"
        );
    }

    #[test]
    fn line_col_counts_from_one() {
        assert_eq!(line_col("abc", 0), (1, 1));
        assert_eq!(line_col("a\nbc", 2), (2, 1));
        assert_eq!(line_col("a\nbc", 3), (2, 2));
    }
}

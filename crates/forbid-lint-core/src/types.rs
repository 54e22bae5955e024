//! Core types for forbidden-identifier issues and lint results.

use miette::{Diagnostic, SourceSpan};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Severity level for lint violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message, does not fail lint.
    Info,
    /// Warning that should be addressed.
    Warning,
    /// Error that must be fixed.
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Source code location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// File path relative to project root.
    pub file: PathBuf,
    /// Line number (1-indexed).
    pub line: usize,
    /// Column number (1-indexed).
    pub column: usize,
    /// Byte offset in file (for miette integration).
    pub offset: usize,
    /// Length of the span in bytes.
    pub length: usize,
}

impl Location {
    /// Creates a new location with explicit values.
    #[must_use]
    pub fn new(file: PathBuf, line: usize, column: usize) -> Self {
        Self {
            file,
            line,
            column,
            offset: 0,
            length: 0,
        }
    }

    /// Sets the byte offset and length for this location.
    #[must_use]
    pub fn with_span(mut self, offset: usize, length: usize) -> Self {
        self.offset = offset;
        self.length = length;
        self
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.column)
    }
}

/// One occurrence of a forbidden expression.
///
/// `identifier` is always the expression as written in the source, even when
/// the match happened against its symbol-expanded form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Literal source text of the offending expression.
    pub identifier: String,
    /// Source of the regular expression that matched.
    pub pattern: String,
    /// Custom explanation attached to the pattern.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Where the expression starts.
    pub location: Location,
}

impl Issue {
    /// Returns the explanation without the location, e.g.
    /// ``use of `dbg` forbidden by pattern `^dbg$` ``.
    #[must_use]
    pub fn details(&self) -> String {
        match &self.message {
            Some(message) => format!(
                "use of `{}` forbidden because {:?}",
                self.identifier, message
            ),
            None => format!(
                "use of `{}` forbidden by pattern `{}`",
                self.identifier, self.pattern
            ),
        }
    }
}

impl std::fmt::Display for Issue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {}", self.details(), self.location)
    }
}

/// A lint violation reported by a rule to the [`Analyzer`](crate::Analyzer).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    /// Rule code (e.g., "FL001").
    pub code: String,
    /// Rule name (e.g., "forbidden-identifier").
    pub rule: String,
    /// Severity of this violation.
    pub severity: Severity,
    /// Primary location of the violation.
    pub location: Location,
    /// Human-readable message.
    pub message: String,
}

impl Violation {
    /// Creates a new violation.
    #[must_use]
    pub fn new(
        code: impl Into<String>,
        rule: impl Into<String>,
        severity: Severity,
        location: Location,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            rule: rule.into(),
            severity,
            location,
            message: message.into(),
        }
    }

    /// Formats the violation for terminal output.
    #[must_use]
    pub fn format(&self) -> String {
        use std::fmt::Write;
        let mut output = format!("{} {} at {}\n", self.code, self.rule, self.location);
        let _ = writeln!(output, "  {}: {}", self.severity, self.message);
        output
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} [{}] {}",
            self.location, self.severity, self.code, self.message
        )
    }
}

/// Converts a Violation to a miette Diagnostic for rich error display.
#[derive(Debug, thiserror::Error, Diagnostic)]
#[error("{message}")]
pub struct ViolationDiagnostic {
    message: String,
    #[label("{label_message}")]
    span: SourceSpan,
    label_message: String,
}

impl From<&Violation> for ViolationDiagnostic {
    fn from(v: &Violation) -> Self {
        Self {
            message: format!("[{}] {}", v.code, v.message),
            span: SourceSpan::from((v.location.offset, v.location.length)),
            label_message: v.rule.clone(),
        }
    }
}

/// Result of running lint analysis.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct LintResult {
    /// All violations found.
    pub violations: Vec<Violation>,
    /// Number of files checked.
    pub files_checked: usize,
}

impl LintResult {
    /// Creates a new empty result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.has_violations_at(Severity::Error)
    }

    /// Checks if any violations meet or exceed the given severity threshold.
    #[must_use]
    pub fn has_violations_at(&self, severity: Severity) -> bool {
        self.violations.iter().any(|v| v.severity >= severity)
    }

    /// Counts violations by severity.
    #[must_use]
    pub fn count_by_severity(&self) -> (usize, usize, usize) {
        let count = |severity| {
            self.violations
                .iter()
                .filter(|v| v.severity == severity)
                .count()
        };
        (
            count(Severity::Error),
            count(Severity::Warning),
            count(Severity::Info),
        )
    }

    /// Adds violations from another result.
    pub fn extend(&mut self, other: Self) {
        self.violations.extend(other.violations);
        self.files_checked += other.files_checked;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_issue(message: Option<&str>) -> Issue {
        Issue {
            identifier: "fmt::format".to_string(),
            pattern: r"fmt::format".to_string(),
            message: message.map(String::from),
            location: Location::new(PathBuf::from("src/lib.rs"), 5, 2),
        }
    }

    fn make_violation(severity: Severity) -> Violation {
        Violation::new(
            "FL001",
            "forbidden-identifier",
            severity,
            Location::new(PathBuf::from("src/lib.rs"), 42, 10),
            "use of `dbg` forbidden by pattern `^dbg$`",
        )
    }

    #[test]
    fn issue_display_uses_pattern_without_message() {
        insta::assert_snapshot!(
            make_issue(None).to_string(),
            @"use of `fmt::format` forbidden by pattern `fmt::format` at src/lib.rs:5:2"
        );
    }

    #[test]
    fn issue_display_quotes_custom_message() {
        insta::assert_snapshot!(
            make_issue(Some("a custom message")).to_string(),
            @r#"use of `fmt::format` forbidden because "a custom message" at src/lib.rs:5:2"#
        );
    }

    #[test]
    fn issue_details_escapes_quotes_in_message() {
        let issue = make_issue(Some(r#"say "no""#));
        assert_eq!(
            issue.details(),
            r#"use of `fmt::format` forbidden because "say \"no\"""#
        );
    }

    #[test]
    fn violation_display_is_compact() {
        let v = make_violation(Severity::Error);
        assert_eq!(
            v.to_string(),
            "src/lib.rs:42:10: error [FL001] use of `dbg` forbidden by pattern `^dbg$`"
        );
    }

    #[test]
    fn violation_format_has_two_lines() {
        let formatted = make_violation(Severity::Warning).format();
        assert!(formatted.starts_with("FL001 forbidden-identifier at src/lib.rs:42:10\n"));
        assert!(formatted.contains("  warning: use of `dbg`"));
    }

    #[test]
    fn has_violations_at_respects_threshold() {
        let mut result = LintResult::new();
        result.violations.push(make_violation(Severity::Warning));
        assert!(!result.has_errors());
        assert!(result.has_violations_at(Severity::Warning));
        assert!(result.has_violations_at(Severity::Info));
    }

    #[test]
    fn count_by_severity_and_extend() {
        let mut result = LintResult::new();
        result.files_checked = 2;
        result.violations.push(make_violation(Severity::Error));

        let mut other = LintResult::new();
        other.files_checked = 3;
        other.violations.push(make_violation(Severity::Info));
        other.violations.push(make_violation(Severity::Error));

        result.extend(other);
        assert_eq!(result.count_by_severity(), (2, 0, 1));
        assert_eq!(result.files_checked, 5);
    }
}

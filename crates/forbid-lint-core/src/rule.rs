//! The rule trait used by the [`Analyzer`](crate::Analyzer) and the
//! forbidden-identifier rule built on the [`Linter`].

use crate::config::{ConfigError, ForbidConfig};
use crate::context::FileContext;
use crate::linter::{Linter, LinterOptions, RunConfig, SourceFile};
use crate::pattern::PatternError;
use crate::resolver::SymbolIndex;
use crate::symbols::SymbolTable;
use crate::types::{Location, Severity, Violation};
use tracing::error;

/// A per-file lint rule based on `syn` AST analysis.
///
/// # Example
///
/// ```ignore
/// use forbid_lint_core::{FileContext, Rule, Violation};
///
/// pub struct NoTodoMacro;
///
/// impl Rule for NoTodoMacro {
///     fn name(&self) -> &'static str { "no-todo-macro" }
///     fn code(&self) -> &'static str { "FL100" }
///
///     fn check(&self, ctx: &FileContext, ast: &syn::File) -> Vec<Violation> {
///         let mut visitor = TodoVisitor::new(ctx);
///         visitor.visit_file(ast);
///         visitor.violations
///     }
/// }
/// ```
pub trait Rule: Send + Sync {
    /// Returns the kebab-case name of this rule (e.g., "forbidden-identifier").
    fn name(&self) -> &'static str;

    /// Returns the rule code (e.g., "FL001").
    fn code(&self) -> &'static str;

    /// Returns a brief description of what this rule checks.
    fn description(&self) -> &'static str {
        ""
    }

    /// Returns the default severity for violations from this rule.
    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    /// Checks a single file and returns any violations found.
    fn check(&self, ctx: &FileContext, ast: &syn::File) -> Vec<Violation>;
}

/// Type alias for boxed Rule trait objects.
pub type RuleBox = Box<dyn Rule>;

/// Flag values the forbidden-identifier rule is configured with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForbidFlags {
    /// Pattern strings, plain regex or structured. Empty selects the defaults.
    pub patterns: Vec<String>,
    /// Also check example functions in test files.
    pub include_examples: bool,
    /// Honor `permit:` comments.
    pub use_permit_directives: bool,
    /// Resolve symbols so that package-scoped patterns can match.
    pub analyze_types: bool,
}

impl Default for ForbidFlags {
    fn default() -> Self {
        Self {
            patterns: Vec::new(),
            include_examples: false,
            use_permit_directives: true,
            analyze_types: false,
        }
    }
}

impl ForbidFlags {
    fn linter_options(&self) -> LinterOptions {
        LinterOptions {
            exclude_examples: !self.include_examples,
            ignore_permit_directives: !self.use_permit_directives,
        }
    }
}

/// Reports every use of a forbidden identifier as a [`Violation`].
#[derive(Debug, Clone)]
pub struct ForbidRule {
    linter: Linter,
    analyze_types: bool,
}

impl ForbidRule {
    /// Rule name.
    pub const NAME: &'static str = "forbidden-identifier";
    /// Rule code.
    pub const CODE: &'static str = "FL001";

    /// Builds the rule from flag values.
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern is invalid.
    pub fn new(flags: &ForbidFlags) -> Result<Self, PatternError> {
        Ok(Self {
            linter: Linter::new(&flags.patterns, flags.linter_options())?,
            analyze_types: flags.analyze_types,
        })
    }

    /// Builds the rule from the `[forbid]` configuration section.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid pattern entry.
    pub fn from_config(config: &ForbidConfig) -> Result<Self, ConfigError> {
        let patterns = config.compile_patterns()?;
        let linter = if patterns.is_empty() {
            Linter::new::<&str>(&[], config.linter_options())
                .map_err(|source| ConfigError::Pattern { index: 0, source })?
        } else {
            Linter::from_patterns(patterns, config.linter_options())
        };
        Ok(Self {
            linter,
            analyze_types: config.analyze_types,
        })
    }

    /// The underlying linter.
    #[must_use]
    pub fn linter(&self) -> &Linter {
        &self.linter
    }
}

impl Rule for ForbidRule {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn code(&self) -> &'static str {
        Self::CODE
    }

    fn description(&self) -> &'static str {
        "Forbids identifiers and member accesses matching configured patterns"
    }

    fn check(&self, ctx: &FileContext, ast: &syn::File) -> Vec<Violation> {
        let index = self
            .analyze_types
            .then(|| SymbolIndex::for_file(ctx, ast));
        let config = RunConfig {
            symbols: index.as_ref().map(|i| i as &dyn SymbolTable),
            debug_log: None,
        };

        match self.linter.check_file(SourceFile::new(ctx, ast), &config) {
            Ok(issues) => issues
                .into_iter()
                .map(|issue| {
                    let message = issue.details();
                    Violation::new(
                        self.code(),
                        self.name(),
                        self.default_severity(),
                        issue.location,
                        message,
                    )
                })
                .collect(),
            Err(e) => {
                error!("Forbidden-identifier check failed: {e}");
                vec![Violation::new(
                    self.code(),
                    self.name(),
                    Severity::Error,
                    Location::new(ctx.relative_path.clone(), 1, 1),
                    e.to_string(),
                )]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn check(rule: &ForbidRule, path: &str, code: &str) -> Vec<Violation> {
        let ctx = FileContext::new(Path::new(path), code, Path::new(""));
        let ast = syn::parse_file(code).unwrap();
        rule.check(&ctx, &ast)
    }

    #[test]
    fn test_rule_metadata() {
        let rule = ForbidRule::new(&ForbidFlags::default()).unwrap();
        assert_eq!(rule.name(), "forbidden-identifier");
        assert_eq!(rule.code(), "FL001");
        assert_eq!(rule.default_severity(), Severity::Error);
        assert_eq!(rule.linter().patterns().len(), 1);
    }

    #[test]
    fn test_issues_become_violations() {
        let rule = ForbidRule::new(&ForbidFlags {
            patterns: vec![r"^std::process::exit(# exit through main)?$".to_string()],
            ..ForbidFlags::default()
        })
        .unwrap();
        let violations = check(&rule, "src/lib.rs", "fn f() {\n    std::process::exit(1);\n}\n");

        assert_eq!(violations.len(), 1);
        insta::assert_snapshot!(
            violations[0].to_string(),
            @r#"src/lib.rs:2:5: error [FL001] use of `std::process::exit` forbidden because "exit through main""#
        );
    }

    #[test]
    fn test_flags_map_to_linter_options() {
        let flags = ForbidFlags {
            include_examples: true,
            use_permit_directives: false,
            ..ForbidFlags::default()
        };
        let rule = ForbidRule::new(&flags).unwrap();
        assert_eq!(
            rule.linter().options(),
            LinterOptions {
                exclude_examples: false,
                ignore_permit_directives: true,
            }
        );

        let code = "fn example() {\n    dbg!(1); // permit:dbg\n}\n";
        assert_eq!(check(&rule, "tests/a.rs", code).len(), 1);

        let default_rule = ForbidRule::new(&ForbidFlags::default()).unwrap();
        assert!(check(&default_rule, "tests/a.rs", code).is_empty());
    }

    #[test]
    fn test_analyze_types_enables_package_patterns() {
        let mut flags = ForbidFlags {
            patterns: vec![r"{pattern: ^forbidden$, package: ^some::pkg$}".to_string()],
            ..ForbidFlags::default()
        };
        let code = "use some::pkg as alias;\nfn f() {\n    alias::forbidden();\n}\n";

        let rule = ForbidRule::new(&flags).unwrap();
        assert!(check(&rule, "src/lib.rs", code).is_empty());

        flags.analyze_types = true;
        let rule = ForbidRule::new(&flags).unwrap();
        let violations = check(&rule, "src/lib.rs", code);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.starts_with("use of `alias::forbidden`"));
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let flags = ForbidFlags {
            patterns: vec!["(".to_string()],
            ..ForbidFlags::default()
        };
        assert!(matches!(
            ForbidRule::new(&flags),
            Err(PatternError::Regex { .. })
        ));
    }
}

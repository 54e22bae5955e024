//! # forbid-lint-core
//!
//! Engine for forbidding identifiers and member accesses in Rust sources.
//!
//! Patterns are regular expressions matched against the source text of
//! candidate expressions (identifiers, paths, field accesses, method calls
//! and macro invocations). With a [`SymbolTable`] the engine also matches
//! against a symbol-expanded form that names the defining module, which makes
//! package-scoped patterns possible.
//!
//! - [`Pattern`] parses plain regexes and structured pattern documents
//! - [`Linter`] walks parsed files and reports each [`Issue`]
//! - [`SymbolIndex`] is a best-effort [`SymbolTable`] built from a file
//! - [`ForbidRule`] and [`Analyzer`] run the linter over a project
//!
//! ## Example
//!
//! ```ignore
//! use forbid_lint_core::{Analyzer, ForbidFlags, ForbidRule};
//!
//! let rule = ForbidRule::new(&ForbidFlags {
//!     patterns: vec![r"^std::process::exit$".to_string()],
//!     ..ForbidFlags::default()
//! })?;
//!
//! let analyzer = Analyzer::builder()
//!     .root("./src")
//!     .rule(rule)
//!     .build()?;
//!
//! let result = analyzer.analyze()?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod analyzer;
mod config;
mod context;
mod directive;
mod examples;
mod linter;
mod pattern;
mod resolver;
mod rule;
mod types;

/// Symbol-table contract and expansion strategies.
pub mod symbols;

pub use analyzer::{Analyzer, AnalyzerBuilder, AnalyzerError};
pub use config::{AnalyzerConfig, Config, ConfigError, ForbidConfig, PatternEntry, RuleConfig};
pub use context::FileContext;
pub use directive::{Comment, Comments};
pub use examples::{is_example_fn, is_whole_file_example, FnShape};
pub use linter::{LintError, Linter, LinterOptions, RunConfig, SourceFile};
pub use pattern::{default_patterns, Pattern, PatternError, PatternSpec, DEFAULT_PATTERNS};
pub use resolver::{FileSymbols, SymbolIndex};
pub use rule::{ForbidFlags, ForbidRule, Rule, RuleBox};
pub use symbols::{Expansion, Symbol, SymbolKind, SymbolTable};
pub use types::{Issue, LintResult, Location, Severity, Violation, ViolationDiagnostic};

//! Configuration types for forbid-lint.

use crate::linter::LinterOptions;
use crate::pattern::{Pattern, PatternError, PatternSpec};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Top-level configuration for forbid-lint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Analyzer configuration.
    #[serde(default)]
    pub analyzer: AnalyzerConfig,

    /// Settings of the forbidden-identifier rule.
    #[serde(default)]
    pub forbid: ForbidConfig,

    /// Per-rule configurations.
    #[serde(default)]
    pub rules: HashMap<String, RuleConfig>,
}

impl Config {
    /// Creates a new default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })
    }

    /// Checks if a rule is enabled.
    #[must_use]
    pub fn is_rule_enabled(&self, rule_name: &str) -> bool {
        self.rules
            .get(rule_name)
            .map_or(true, |c| c.enabled.unwrap_or(true))
    }

    /// Gets the severity override for a rule.
    #[must_use]
    pub fn rule_severity(&self, rule_name: &str) -> Option<crate::Severity> {
        self.rules.get(rule_name).and_then(|c| c.severity)
    }
}

/// Analyzer-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Root directory to analyze (default: current directory).
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Glob patterns to exclude from analysis.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Whether to respect .gitignore files.
    #[serde(default = "default_true")]
    pub respect_gitignore: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            exclude: vec!["**/target/**".to_string(), "**/vendor/**".to_string()],
            respect_gitignore: true,
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_true() -> bool {
    true
}

/// One entry of `forbid.patterns`: either a pattern string or an inline table.
///
/// ```toml
/// [forbid]
/// patterns = [
///     '^dbg$',
///     { pattern = '^forbidden$', package = '^some::pkg$', msg = "use the new API" },
/// ]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PatternEntry {
    /// A plain regex, or a JSON/YAML pattern document.
    Regex(String),
    /// A structured pattern.
    Spec(PatternSpec),
}

impl PatternEntry {
    /// Compiles this entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry is not a valid pattern.
    pub fn compile(&self) -> Result<Pattern, PatternError> {
        match self {
            Self::Regex(raw) => Pattern::parse(raw),
            Self::Spec(spec) => Pattern::from_spec(spec.clone()),
        }
    }
}

/// The `[forbid]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForbidConfig {
    /// Forbidden patterns. Empty selects the builtin defaults.
    #[serde(default)]
    pub patterns: Vec<PatternEntry>,

    /// Also check example functions in test files.
    #[serde(default)]
    pub include_examples: bool,

    /// Honor `permit:` comments.
    #[serde(default = "default_true")]
    pub use_permit_directives: bool,

    /// Resolve symbols so that package-scoped patterns can match.
    #[serde(default)]
    pub analyze_types: bool,
}

impl Default for ForbidConfig {
    fn default() -> Self {
        Self {
            patterns: Vec::new(),
            include_examples: false,
            use_permit_directives: true,
            analyze_types: false,
        }
    }
}

impl ForbidConfig {
    /// Compiles every pattern entry in order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Pattern`] for the first invalid entry.
    pub fn compile_patterns(&self) -> Result<Vec<Pattern>, ConfigError> {
        self.patterns
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                entry
                    .compile()
                    .map_err(|source| ConfigError::Pattern { index, source })
            })
            .collect()
    }

    /// Linter options derived from the flags in this section.
    #[must_use]
    pub fn linter_options(&self) -> LinterOptions {
        LinterOptions {
            exclude_examples: !self.include_examples,
            ignore_permit_directives: !self.use_permit_directives,
        }
    }
}

/// Per-rule configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Whether this rule is enabled.
    #[serde(default)]
    pub enabled: Option<bool>,

    /// Severity override for this rule.
    #[serde(default)]
    pub severity: Option<crate::Severity>,
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// Parse error in config file.
    #[error("Failed to parse config: {message}")]
    Parse {
        /// Parse error message.
        message: String,
    },

    /// A `forbid.patterns` entry is invalid.
    #[error("Invalid pattern at forbid.patterns[{index}]: {source}")]
    Pattern {
        /// Position of the entry.
        index: usize,
        /// Underlying pattern error.
        source: PatternError,
    },
}

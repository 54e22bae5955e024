//! Forbid patterns: parsing, validation and per-file applicability.
//!
//! A pattern is given either as a plain regular expression or as a small
//! JSON/YAML document:
//!
//! ```text
//! ^dbg$
//! ^std::process::exit(# use a proper shutdown path)?$
//! {pattern: ^forbidden$, package: ^some::pkg$, ignore: ["src/legacy/**", "!src/legacy/keep/**"]}
//! ```

use regex::Regex;
use regex_syntax::ast::{self, Ast};
use serde::{Deserialize, Serialize};

/// Patterns used when no pattern is configured: the debug-printing macros.
pub const DEFAULT_PATTERNS: &[&str] = &[r"^((std|core)::)?(print|println|eprint|eprintln|dbg)$"];

/// Returns the builtin pattern set as owned strings.
#[must_use]
pub fn default_patterns() -> Vec<String> {
    DEFAULT_PATTERNS.iter().map(|p| (*p).to_string()).collect()
}

/// Errors raised while building a [`Pattern`].
#[derive(Debug, thiserror::Error)]
pub enum PatternError {
    /// The structured document could not be decoded.
    #[error("parsing as JSON or YAML failed: {message}")]
    Document {
        /// Raw parser message.
        message: String,
    },

    /// The match regex does not compile.
    #[error("unable to compile source code pattern `{pattern}`: {source}")]
    Regex {
        /// The offending regex.
        pattern: String,
        /// Compiler error.
        source: regex::Error,
    },

    /// The match regex compiles but its syntax tree cannot be parsed.
    #[error("unable to parse source code pattern `{pattern}`: {source}")]
    Syntax {
        /// The offending regex.
        pattern: String,
        /// Parser error.
        source: Box<ast::Error>,
    },

    /// The package regex does not compile.
    #[error("unable to compile package pattern `{pattern}`: {source}")]
    Package {
        /// The offending regex.
        pattern: String,
        /// Compiler error.
        source: regex::Error,
    },

    /// An ignore glob is malformed.
    #[error("file glob pattern #{index} is invalid: {glob:?}: {source}")]
    Glob {
        /// Position in the `ignore` list.
        index: usize,
        /// The offending glob.
        glob: String,
        /// Glob error.
        source: glob::PatternError,
    },
}

/// Uncompiled, structured form of a pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatternSpec {
    /// Regular expression matched against the candidate text.
    #[serde(alias = "p")]
    pub pattern: String,

    /// Regular expression for the module path that defines the matched item.
    /// Only evaluated against symbol-expanded candidates.
    #[serde(default, alias = "pkg", skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,

    /// Explanation printed instead of the pattern.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,

    /// Globs over project-relative paths for which the pattern is ignored.
    /// A leading `!` reverts an earlier match.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore: Vec<String>,
}

impl PatternSpec {
    /// Creates a spec from a bare regex.
    #[must_use]
    pub fn from_regex(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
struct IgnoreGlob {
    negated: bool,
    glob: glob::Pattern,
}

/// A validated forbid rule. Immutable once built.
#[derive(Debug, Clone)]
pub struct Pattern {
    regex: Regex,
    package: Option<Regex>,
    message: Option<String>,
    ignore: Vec<IgnoreGlob>,
}

impl Pattern {
    /// Parses a plain regex or, if the trimmed input starts with `{` or the
    /// input spans several lines, a JSON/YAML [`PatternSpec`].
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed, contains unknown
    /// fields, or any regex or glob inside it is invalid.
    pub fn parse(spec: &str) -> Result<Self, PatternError> {
        if is_structured(spec) {
            let doc: PatternSpec =
                serde_yaml::from_str(spec).map_err(|e| PatternError::Document {
                    message: e.to_string(),
                })?;
            Self::from_spec(doc)
        } else {
            Self::from_spec(PatternSpec::from_regex(spec))
        }
    }

    /// Validates and compiles a structured spec.
    ///
    /// # Errors
    ///
    /// Returns an error if a regex or ignore glob is invalid.
    pub fn from_spec(spec: PatternSpec) -> Result<Self, PatternError> {
        let regex = Regex::new(&spec.pattern).map_err(|source| PatternError::Regex {
            pattern: spec.pattern.clone(),
            source,
        })?;

        let tree = ast::parse::Parser::new()
            .parse(&spec.pattern)
            .map_err(|source| PatternError::Syntax {
                pattern: spec.pattern.clone(),
                source: Box::new(source),
            })?;
        let message = spec
            .msg
            .filter(|m| !m.is_empty())
            .or_else(|| embedded_message(&spec.pattern, &tree));

        let package = spec
            .package
            .filter(|p| !p.is_empty())
            .map(|p| {
                Regex::new(&p).map_err(|source| PatternError::Package { pattern: p, source })
            })
            .transpose()?;

        let ignore = spec
            .ignore
            .into_iter()
            .enumerate()
            .map(|(index, raw)| {
                let (negated, body) = match raw.strip_prefix('!') {
                    Some(rest) => (true, rest),
                    None => (false, raw.as_str()),
                };
                match glob::Pattern::new(body) {
                    Ok(glob) => Ok(IgnoreGlob { negated, glob }),
                    Err(source) => Err(PatternError::Glob {
                        index,
                        glob: raw,
                        source,
                    }),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            regex,
            package,
            message,
            ignore,
        })
    }

    /// Source of the match regex.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Source of the package regex, if the pattern is package-scoped.
    #[must_use]
    pub fn package(&self) -> Option<&str> {
        self.package.as_ref().map(Regex::as_str)
    }

    /// Custom explanation, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Returns true if the pattern only applies to symbol-expanded text.
    #[must_use]
    pub fn is_package_scoped(&self) -> bool {
        self.package.is_some()
    }

    /// Matches literal source text.
    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Matches a symbol-expanded candidate: the defining package must match
    /// the package regex and one of the texts the match regex.
    #[must_use]
    pub fn matches_package(&self, package: &str, texts: &[&str]) -> bool {
        match &self.package {
            Some(re) => re.is_match(package) && texts.iter().any(|t| self.regex.is_match(t)),
            None => false,
        }
    }

    /// Decides whether the pattern is switched off for `path`.
    ///
    /// Globs are evaluated in order. A plain glob only matters while the file
    /// is not ignored yet, a `!` glob only while it is.
    #[must_use]
    pub fn ignores_file(&self, path: &str) -> bool {
        let options = glob::MatchOptions {
            case_sensitive: true,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };

        let mut ignored = false;
        for entry in &self.ignore {
            if entry.negated != ignored {
                continue;
            }
            if entry.glob.matches_with(path, options) {
                ignored = !entry.negated;
            }
        }
        ignored
    }
}

impl std::str::FromStr for Pattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn is_structured(spec: &str) -> bool {
    spec.trim_start().starts_with('{') || spec.contains('\n')
}

/// Finds the first group (depth-first) whose content starts with `#` and
/// returns the rest of that content, trimmed.
fn embedded_message(source: &str, tree: &Ast) -> Option<String> {
    match tree {
        Ast::Group(group) => {
            let span = group.ast.span();
            let content = source.get(span.start.offset..span.end.offset)?;
            match content.strip_prefix('#') {
                Some(rest) if !rest.trim().is_empty() => Some(rest.trim().to_string()),
                Some(_) => None,
                None => embedded_message(source, &group.ast),
            }
        }
        Ast::Repetition(rep) => embedded_message(source, &rep.ast),
        Ast::Concat(concat) => concat
            .asts
            .iter()
            .find_map(|a| embedded_message(source, a)),
        Ast::Alternation(alt) => alt.asts.iter().find_map(|a| embedded_message(source, a)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_patterns() {
        let cases: &[(&str, &str, Option<&str>)] = &[
            (r"fmt::format", r"fmt::format", None),
            (r"^fmt::format$", r"^fmt::format$", None),
            (r"(f)mt::format(# a comment)?", r"(f)mt::format(# a comment)?", Some("a comment")),
            (
                r"^println(# Please don't use this!)?$",
                r"^println(# Please don't use this!)?$",
                Some("Please don't use this!"),
            ),
            (
                r"println((((# Please don't use this!))))?",
                r"println((((# Please don't use this!))))?",
                Some("Please don't use this!"),
            ),
            (
                r#"{pattern: "^println$"}"#,
                r"^println$",
                None,
            ),
            (
                "{p: ^println$,\npkg: ^std$\n}",
                r"^println$",
                None,
            ),
            (r"{pattern: ^println$, package: ^std$}", r"^println$", None),
        ];

        for (input, expected_regex, expected_msg) in cases {
            let pattern = Pattern::parse(input)
                .unwrap_or_else(|e| panic!("{input} should parse: {e}"));
            assert_eq!(pattern.as_str(), *expected_regex, "regex of {input}");
            assert_eq!(pattern.message(), *expected_msg, "message of {input}");
        }
    }

    #[test]
    fn parses_json_document() {
        let pattern = Pattern::parse(
            r#"{"pattern": "^forbidden$", "package": "^some::pkg$", "msg": "nope", "ignore": ["tests/**"]}"#,
        )
        .unwrap();
        assert_eq!(pattern.as_str(), "^forbidden$");
        assert_eq!(pattern.package(), Some("^some::pkg$"));
        assert_eq!(pattern.message(), Some("nope"));
        assert!(pattern.ignores_file("tests/a.rs"));
    }

    #[test]
    fn parses_block_yaml_document() {
        let pattern = Pattern::parse("pattern: ^dbg$\nmsg: remove before merging\n").unwrap();
        assert_eq!(pattern.as_str(), "^dbg$");
        assert_eq!(pattern.message(), Some("remove before merging"));
        assert!(!pattern.is_package_scoped());
    }

    #[test]
    fn invalid_regex_is_an_error() {
        let err = Pattern::parse(r"fmt\").unwrap_err();
        assert!(matches!(err, PatternError::Regex { .. }));
        assert!(err
            .to_string()
            .starts_with(r"unable to compile source code pattern `fmt\`"));
    }

    #[test]
    fn invalid_package_regex_is_an_error() {
        let err = Pattern::parse(r"{pattern: x, package: '(unclosed'}").unwrap_err();
        assert!(matches!(err, PatternError::Package { .. }));
    }

    #[test]
    fn unknown_field_is_an_error() {
        let err = Pattern::parse(r"{pattern: x, mesage: typo}").unwrap_err();
        assert!(matches!(err, PatternError::Document { .. }));
        assert!(err.to_string().contains("mesage"));
    }

    #[test]
    fn missing_pattern_field_is_an_error() {
        let err = Pattern::parse(r"{msg: hello}").unwrap_err();
        assert!(matches!(err, PatternError::Document { .. }));
    }

    #[test]
    fn invalid_glob_names_its_index() {
        let err = Pattern::parse(r#"{pattern: x, ignore: ["src/**", "src/["]}"#).unwrap_err();
        match err {
            PatternError::Glob { index, glob, .. } => {
                assert_eq!(index, 1);
                assert_eq!(glob, "src/[");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn explicit_msg_wins_over_embedded_comment() {
        let pattern =
            Pattern::parse(r#"{pattern: "^dbg(# embedded)?$", msg: explicit}"#).unwrap();
        assert_eq!(pattern.message(), Some("explicit"));

        let pattern = Pattern::parse(r#"{pattern: "^dbg(# embedded)?$"}"#).unwrap();
        assert_eq!(pattern.message(), Some("embedded"));
    }

    #[test]
    fn custom_message_from_structured_pattern() {
        let pattern = Pattern::parse(r#"{pattern: 'fmt\.Printf(# custom msg)?'}"#).unwrap();
        assert_eq!(pattern.message(), Some("custom msg"));
        assert!(pattern.is_match("fmt.Printf"));
    }

    #[test]
    fn empty_comment_group_is_not_a_message() {
        let pattern = Pattern::parse(r"^dbg(#)?$").unwrap();
        assert_eq!(pattern.message(), None);
    }

    #[test]
    fn ignore_globs_last_effective_match_wins() {
        let pattern = Pattern::parse(r#"{pattern: x, ignore: ["a/**", "!a/b/**"]}"#).unwrap();
        assert!(!pattern.ignores_file("a/b/c.rs"));
        assert!(pattern.ignores_file("a/x/c.rs"));
        assert!(!pattern.ignores_file("z/c.rs"));
    }

    #[test]
    fn negation_without_prior_ignore_has_no_effect() {
        let pattern = Pattern::parse(r#"{pattern: x, ignore: ["!a/**", "a/b/*.rs"]}"#).unwrap();
        assert!(pattern.ignores_file("a/b/c.rs"));
        assert!(!pattern.ignores_file("a/c.rs"));
    }

    #[test]
    fn single_star_does_not_cross_separators() {
        let pattern = Pattern::parse(r#"{pattern: x, ignore: ["src/*.rs"]}"#).unwrap();
        assert!(pattern.ignores_file("src/lib.rs"));
        assert!(!pattern.ignores_file("src/nested/lib.rs"));
    }

    #[test]
    fn package_scoped_matching_needs_both_regexes() {
        let pattern = Pattern::parse(r"{pattern: ^forbidden$, package: ^some::pkg$}").unwrap();
        assert!(pattern.matches_package("some::pkg", &["pkg::forbidden", "forbidden"]));
        assert!(!pattern.matches_package("other::pkg", &["forbidden"]));
        assert!(!pattern.matches_package("some::pkg", &["allowed"]));

        let plain = Pattern::parse("^forbidden$").unwrap();
        assert!(!plain.matches_package("some::pkg", &["forbidden"]));
    }

    #[test]
    fn default_patterns_compile_and_match_print_macros() {
        let patterns: Vec<Pattern> = default_patterns()
            .iter()
            .map(|p| Pattern::parse(p).unwrap())
            .collect();
        let hits = |text: &str| patterns.iter().any(|p| p.is_match(text));

        assert!(hits("println"));
        assert!(hits("dbg"));
        assert!(hits("std::eprintln"));
        assert!(!hits("format"));
        assert!(!hits("my_println"));
    }
}

//! The tree walker: finds candidate expressions and matches them against
//! forbid patterns.

use crate::context::FileContext;
use crate::directive::Comments;
use crate::examples::{is_example_fn, is_whole_file_example};
use crate::pattern::{default_patterns, Pattern, PatternError};
use crate::symbols::{expand_ident, expand_member, BasePath, Expansion, MemberAccess, Site, SymbolTable};
use crate::types::{Issue, Location};
use proc_macro2::{LineColumn, Span};
use std::path::PathBuf;
use syn::parse::ParseStream;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::visit::{self, Visit};
use syn::{Expr, Token};
use tracing::debug;

/// Switches of the [`Linter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinterOptions {
    /// Skip example functions in test files, and test files that are a
    /// single whole-file example.
    pub exclude_examples: bool,
    /// Report occurrences even when a `permit:` comment names them.
    pub ignore_permit_directives: bool,
}

impl Default for LinterOptions {
    fn default() -> Self {
        Self {
            exclude_examples: true,
            ignore_permit_directives: false,
        }
    }
}

/// Internal failure while walking a file.
#[derive(Debug, thiserror::Error)]
pub enum LintError {
    /// A node's span could not be mapped back to the source text.
    #[error("unable to render node at {}:{line}:{column}", file.display())]
    Render {
        /// File being walked.
        file: PathBuf,
        /// Line of the node.
        line: usize,
        /// Column of the node.
        column: usize,
    },
}

/// A parsed file handed to the [`Linter`].
#[derive(Debug, Clone, Copy)]
pub struct SourceFile<'a> {
    /// Path, source text and conventions of the file.
    pub ctx: &'a FileContext<'a>,
    /// Syntax tree parsed from `ctx.content`.
    pub ast: &'a syn::File,
}

impl<'a> SourceFile<'a> {
    /// Pairs a context with its syntax tree.
    #[must_use]
    pub fn new(ctx: &'a FileContext<'a>, ast: &'a syn::File) -> Self {
        Self { ctx, ast }
    }
}

/// Optional collaborators for one run.
#[derive(Clone, Copy, Default)]
pub struct RunConfig<'a> {
    /// Enables symbol expansion for package-scoped patterns.
    pub symbols: Option<&'a dyn SymbolTable>,
    /// Receives expansion decisions, in addition to `tracing`.
    pub debug_log: Option<&'a (dyn Fn(&str) + Sync)>,
}

impl std::fmt::Debug for RunConfig<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunConfig")
            .field("symbols", &self.symbols.is_some())
            .field("debug_log", &self.debug_log.is_some())
            .finish()
    }
}

/// Forbids identifiers and member accesses matching a set of patterns.
///
/// A `Linter` is immutable once built and can be shared between threads.
/// Each call to [`Linter::run`] keeps its own traversal state.
#[derive(Debug, Clone)]
pub struct Linter {
    patterns: Vec<Pattern>,
    options: LinterOptions,
}

impl Linter {
    /// Parses `patterns` (see [`Pattern::parse`]). An empty list selects
    /// [`default_patterns`].
    ///
    /// # Errors
    ///
    /// Returns the first pattern that fails to parse.
    pub fn new<S: AsRef<str>>(patterns: &[S], options: LinterOptions) -> Result<Self, PatternError> {
        let patterns = if patterns.is_empty() {
            default_patterns()
                .iter()
                .map(|p| Pattern::parse(p))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            patterns
                .iter()
                .map(|p| Pattern::parse(p.as_ref()))
                .collect::<Result<Vec<_>, _>>()?
        };
        Ok(Self::from_patterns(patterns, options))
    }

    /// Builds a linter from already validated patterns.
    #[must_use]
    pub fn from_patterns(patterns: Vec<Pattern>, options: LinterOptions) -> Self {
        Self { patterns, options }
    }

    /// The patterns in configured order.
    #[must_use]
    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    /// The options this linter was built with.
    #[must_use]
    pub fn options(&self) -> LinterOptions {
        self.options
    }

    /// Checks all `files`, returning issues in file order and, within a file,
    /// in traversal order.
    ///
    /// # Errors
    ///
    /// Returns [`LintError::Render`] if a node does not map to source text,
    /// which means the syntax tree was not parsed from the given content.
    pub fn run(&self, files: &[SourceFile<'_>], config: &RunConfig<'_>) -> Result<Vec<Issue>, LintError> {
        let mut issues = Vec::new();
        for file in files {
            issues.extend(self.check_file(*file, config)?);
        }
        Ok(issues)
    }

    /// Checks a single file.
    ///
    /// # Errors
    ///
    /// See [`Linter::run`].
    pub fn check_file(&self, file: SourceFile<'_>, config: &RunConfig<'_>) -> Result<Vec<Issue>, LintError> {
        let ctx = file.ctx;
        if self.options.exclude_examples && ctx.is_test && is_whole_file_example(file.ast) {
            debug!(file = %ctx.relative_path.display(), "Skipping whole-file example");
            return Ok(Vec::new());
        }

        let match_path = ctx.match_path();
        let patterns: Vec<&Pattern> = self
            .patterns
            .iter()
            .filter(|p| !p.ignores_file(&match_path))
            .collect();
        if patterns.is_empty() {
            debug!(file = %match_path, "All patterns ignore this file");
            return Ok(Vec::new());
        }

        let comments = if self.options.ignore_permit_directives {
            Comments::default()
        } else {
            Comments::scan(ctx.content)
        };

        let mut walker = Walker {
            ctx,
            options: self.options,
            expand: config.symbols.is_some() && patterns.iter().any(|p| p.is_package_scoped()),
            patterns,
            comments,
            config,
            issues: Vec::new(),
            error: None,
        };
        walker.visit_file(file.ast);

        match walker.error {
            Some(err) => Err(err),
            None => Ok(walker.issues),
        }
    }
}

/// Parses the body of a macro invocation as comma-separated expressions,
/// which covers `println!`, `vec!`, `assert!` and friends, or as the
/// `value; count` form of `vec!` and array-like macros.
pub(crate) fn macro_args(mac: &syn::Macro) -> Option<Vec<Expr>> {
    if let Ok(args) = mac.parse_body_with(Punctuated::<Expr, Token![,]>::parse_terminated) {
        return Some(args.into_iter().collect());
    }
    mac.parse_body_with(|input: ParseStream<'_>| {
        let value: Expr = input.parse()?;
        input.parse::<Token![;]>()?;
        let count: Expr = input.parse()?;
        Ok(vec![value, count])
    })
    .ok()
}

enum Candidate {
    Ident(Site),
    Member(MemberAccess),
}

struct Walker<'a> {
    ctx: &'a FileContext<'a>,
    options: LinterOptions,
    expand: bool,
    patterns: Vec<&'a Pattern>,
    comments: Comments,
    config: &'a RunConfig<'a>,
    issues: Vec<Issue>,
    error: Option<LintError>,
}

impl Walker<'_> {
    fn check(&mut self, start: LineColumn, end: LineColumn, candidate: &Candidate) {
        if self.error.is_some() {
            return;
        }
        let (Some(offset), Some(raw)) = (self.ctx.offset_of(start), self.ctx.slice(start, end)) else {
            self.error = Some(LintError::Render {
                file: self.ctx.relative_path.clone(),
                line: start.line,
                column: start.column + 1,
            });
            return;
        };
        let literal = compact(raw);

        let mut expansion: Option<Option<Expansion>> = None;
        for pattern in self.patterns.clone() {
            let matched = if pattern.is_package_scoped() {
                let expanded = expansion.get_or_insert_with(|| self.expansion(start, &literal, candidate));
                expanded.as_ref().is_some_and(|e| {
                    e.package
                        .as_deref()
                        .is_some_and(|package| pattern.matches_package(package, &[&e.text, &e.name]))
                })
            } else {
                pattern.is_match(&literal)
            };

            if matched && !self.permitted(start.line, &literal) {
                self.issues.push(Issue {
                    identifier: literal.clone(),
                    pattern: pattern.as_str().to_string(),
                    message: pattern.message().map(String::from),
                    location: Location::new(
                        self.ctx.relative_path.clone(),
                        start.line,
                        start.column + 1,
                    )
                    .with_span(offset, raw.len()),
                });
            }
        }
    }

    fn permitted(&self, line: usize, literal: &str) -> bool {
        !self.options.ignore_permit_directives && self.comments.permits(line, literal)
    }

    fn expansion(&self, start: LineColumn, literal: &str, candidate: &Candidate) -> Option<Expansion> {
        if !self.expand {
            return None;
        }
        let table = self.config.symbols?;
        let file = self.ctx.path;
        let at = format!(
            "{}:{}:{}",
            self.ctx.relative_path.display(),
            start.line,
            start.column + 1
        );

        match candidate {
            Candidate::Ident(site) => {
                let expansion = expand_ident(*site, table, file);
                match &expansion {
                    Some(Expansion {
                        text,
                        package: Some(package),
                        ..
                    }) => self.log(&format!(
                        "{at}: identifier `{literal}` -> `{text}` in package `{package}`"
                    )),
                    Some(e) => self.log(&format!(
                        "{at}: identifier `{literal}` -> `{}` without package",
                        e.text
                    )),
                    None => self.log(&format!("{at}: unknown identifier `{literal}`")),
                }
                expansion
            }
            Candidate::Member(access) => match expand_member(access, table, file) {
                Some((strategy, expansion)) => {
                    self.log(&format!(
                        "{at}: member access `{literal}` resolved by {strategy}: `{}`, package `{}`",
                        expansion.text,
                        expansion.package.as_deref().unwrap_or_default()
                    ));
                    Some(expansion)
                }
                None => {
                    self.log(&format!("{at}: member access `{literal}` could not be resolved"));
                    None
                }
            },
        }
    }

    fn log(&self, message: &str) {
        debug!("{message}");
        if let Some(sink) = self.config.debug_log {
            sink(message);
        }
    }

    fn check_path(&mut self, path: &syn::Path) {
        let Some(last) = path.segments.last() else {
            return;
        };
        let span = path.span();
        // Generic arguments of the last segment are not part of the name.
        let end = last.ident.span().end();

        if path.segments.len() == 1 && path.leading_colon.is_none() {
            let candidate = Candidate::Ident(Site::of(last.ident.span()));
            self.check(span.start(), end, &candidate);
            return;
        }

        let Some(first) = path.segments.first() else {
            return;
        };
        let base_end = path
            .segments
            .iter()
            .nth_back(1)
            .map_or_else(|| first.span().end(), |s| s.span().end());
        let base = Site {
            start_line: span.start().line,
            start_column: span.start().column,
            end_line: base_end.line,
            end_column: base_end.column,
        };
        let segments: Vec<String> = path
            .segments
            .iter()
            .take(path.segments.len() - 1)
            .map(|s| s.ident.to_string())
            .collect();
        let base_path = (!segments.is_empty()).then(|| BasePath {
            head: Site::of(first.ident.span()),
            segments,
        });

        let candidate = Candidate::Member(MemberAccess {
            base,
            base_path,
            member: last.ident.to_string(),
            separator: "::",
        });
        self.check(span.start(), end, &candidate);
    }

    fn check_member(&mut self, base: &Expr, member: String, member_span: Span) {
        let base_span = base.span();
        let base_path = match base {
            Expr::Path(p) if p.qself.is_none() => p.path.segments.first().map(|first| BasePath {
                head: Site::of(first.ident.span()),
                segments: p.path.segments.iter().map(|s| s.ident.to_string()).collect(),
            }),
            _ => None,
        };
        let candidate = Candidate::Member(MemberAccess {
            base: Site::of(base_span),
            base_path,
            member,
            separator: ".",
        });
        self.check(base_span.start(), member_span.end(), &candidate);
    }

    /// Macro arguments are parsed on the fly, so they do not live as long
    /// as the file's syntax tree.
    fn walk_macro_args(&mut self, mac: &syn::Macro) {
        if let Some(args) = macro_args(mac) {
            for arg in &args {
                self.visit_expr(arg);
            }
        }
    }

    /// Walks the base of a member access that was already checked. A base
    /// that is itself a path, field or method call is part of the same
    /// occurrence, so only its arguments are visited.
    fn walk_base<'ast>(&mut self, base: &'ast Expr) {
        match base {
            Expr::Path(p) if p.qself.is_none() => {
                for segment in &p.path.segments {
                    self.visit_path_arguments(&segment.arguments);
                }
            }
            Expr::Field(field) => self.walk_base(&field.base),
            Expr::MethodCall(call) => self.walk_call_parts(call),
            other => self.visit_expr(other),
        }
    }

    fn walk_call_parts<'ast>(&mut self, call: &'ast syn::ExprMethodCall) {
        self.walk_base(&call.receiver);
        if let Some(turbofish) = &call.turbofish {
            self.visit_angle_bracketed_generic_arguments(turbofish);
        }
        for arg in &call.args {
            self.visit_expr(arg);
        }
    }
}

/// Joins the lines of a multi-line rendering, dropping indentation.
fn compact(text: &str) -> String {
    if text.contains('\n') {
        text.lines().map(str::trim).collect()
    } else {
        text.to_string()
    }
}

impl<'ast> Visit<'ast> for Walker<'_> {
    fn visit_item_fn(&mut self, node: &'ast syn::ItemFn) {
        if self.options.exclude_examples && self.ctx.is_test && is_example_fn(node) {
            debug!(function = %node.sig.ident, "Skipping example function");
            return;
        }
        visit::visit_item_fn(self, node);
    }

    fn visit_expr_path(&mut self, node: &'ast syn::ExprPath) {
        if node.qself.is_none() {
            self.check_path(&node.path);
        }
        visit::visit_expr_path(self, node);
    }

    fn visit_expr_struct(&mut self, node: &'ast syn::ExprStruct) {
        if node.qself.is_none() {
            self.check_path(&node.path);
        }
        visit::visit_expr_struct(self, node);
    }

    fn visit_expr_field(&mut self, node: &'ast syn::ExprField) {
        let member = match &node.member {
            syn::Member::Named(ident) => ident.to_string(),
            syn::Member::Unnamed(index) => index.index.to_string(),
        };
        self.check_member(&node.base, member, node.member.span());
        self.walk_base(&node.base);
    }

    fn visit_expr_method_call(&mut self, node: &'ast syn::ExprMethodCall) {
        self.check_member(&node.receiver, node.method.to_string(), node.method.span());
        self.walk_call_parts(node);
    }

    fn visit_type_path(&mut self, node: &'ast syn::TypePath) {
        if node.qself.is_none() {
            self.check_path(&node.path);
        }
        visit::visit_type_path(self, node);
    }

    fn visit_macro(&mut self, node: &'ast syn::Macro) {
        self.check_path(&node.path);
        self.walk_macro_args(node);
    }
}

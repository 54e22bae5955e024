//! Symbol expansion.
//!
//! When a [`SymbolTable`] is available, a candidate expression can be
//! rewritten into a form that names the module that defines it. A call to
//! `renamed::forbidden()` after `use some::pkg as renamed;` expands to
//! `pkg::forbidden` in package `some::pkg`, which package-scoped patterns
//! match against.
//!
//! Member accesses are expanded by an ordered list of strategies. The first
//! one that succeeds wins.

use proc_macro2::Span;
use std::path::Path;

/// Source range of a node, used as lookup key into a [`SymbolTable`].
///
/// Lines are 1-indexed, columns are 0-indexed character offsets, as produced
/// by `proc_macro2` span locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Site {
    /// First line.
    pub start_line: usize,
    /// First column.
    pub start_column: usize,
    /// Last line.
    pub end_line: usize,
    /// Column just past the node.
    pub end_column: usize,
}

impl Site {
    /// Creates the site covered by `span`.
    #[must_use]
    pub fn of(span: Span) -> Self {
        let (start, end) = (span.start(), span.end());
        Self {
            start_line: start.line,
            start_column: start.column,
            end_line: end.line,
            end_column: end.column,
        }
    }
}

/// What a resolved name refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolKind {
    /// A module, with its full path.
    Module {
        /// Full module path, e.g. `std::fs`.
        path: String,
    },
    /// A local binding or parameter.
    Variable {
        /// Declared or inferred type, rendered as a path.
        ty: Option<String>,
    },
    /// Any other named item: function, type, constant, macro.
    Item,
}

/// A resolved name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    /// Simple name of the symbol.
    pub name: String,
    /// Path of the module defining the symbol. `None` for locals.
    pub package: Option<String>,
    /// What the symbol is.
    pub kind: SymbolKind,
}

impl Symbol {
    /// A module symbol named `name` for `path`.
    #[must_use]
    pub fn module(name: impl Into<String>, path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            name: name.into(),
            package: parent_path(&path).map(String::from),
            kind: SymbolKind::Module { path },
        }
    }

    /// An item `name` defined in `package`.
    #[must_use]
    pub fn item(name: impl Into<String>, package: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            package: Some(package.into()),
            kind: SymbolKind::Item,
        }
    }

    /// A local variable with an optional type.
    #[must_use]
    pub fn variable(name: impl Into<String>, ty: Option<String>) -> Self {
        Self {
            name: name.into(),
            package: None,
            kind: SymbolKind::Variable { ty },
        }
    }
}

/// Symbol-resolution information for the analyzed files.
///
/// Implementations map identifier sites to the symbol they denote and
/// expression sites to their static type. Lookups that fail simply return
/// `None`.
pub trait SymbolTable: Send + Sync {
    /// Returns the symbol referenced by the identifier at `site`.
    fn symbol(&self, file: &Path, site: Site) -> Option<&Symbol>;

    /// Returns the static type of the expression at `site`.
    fn type_of(&self, file: &Path, site: Site) -> Option<&str>;
}

/// Result of expanding a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    /// Expanded text, e.g. `fs::File.metadata`.
    pub text: String,
    /// Defining module, if one could be derived.
    pub package: Option<String>,
    /// Bare name of the symbol or member.
    pub name: String,
}

/// The base of a member access when it is written as a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasePath {
    /// Site of the first segment.
    pub head: Site,
    /// All segments, e.g. `["self", "inner"]`.
    pub segments: Vec<String>,
}

/// A member access `base.member` or `base::member`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberAccess {
    /// Site of the whole base expression.
    pub base: Site,
    /// Set when the base is a plain path.
    pub base_path: Option<BasePath>,
    /// Name after the separator.
    pub member: String,
    /// `.` for fields and methods, `::` for paths.
    pub separator: &'static str,
}

/// A resolution strategy for member accesses.
pub type MemberStrategy = fn(&MemberAccess, &dyn SymbolTable, &Path) -> Option<Expansion>;

/// Member strategies in the order they are tried.
pub const MEMBER_STRATEGIES: &[(&str, MemberStrategy)] = &[
    ("known type", known_type),
    ("module base", module_base),
    ("variable base", variable_base),
    ("absolute path", absolute_base),
];

/// Roots that name a module without any import.
const ABSOLUTE_ROOTS: &[&str] = &["crate", "std", "core", "alloc"];

/// Expands a bare identifier.
#[must_use]
pub fn expand_ident(
    site: Site,
    table: &dyn SymbolTable,
    file: &Path,
) -> Option<Expansion> {
    let symbol = table.symbol(file, site)?;
    let text = match &symbol.package {
        Some(package) => format!("{}::{}", last_segment(package), symbol.name),
        None => symbol.name.clone(),
    };
    Some(Expansion {
        text,
        package: symbol.package.clone(),
        name: symbol.name.clone(),
    })
}

/// Expands a member access with the first successful strategy, returning
/// its name along with the expansion.
#[must_use]
pub fn expand_member(
    access: &MemberAccess,
    table: &dyn SymbolTable,
    file: &Path,
) -> Option<(&'static str, Expansion)> {
    MEMBER_STRATEGIES
        .iter()
        .find_map(|(name, strategy)| strategy(access, table, file).map(|e| (*name, e)))
}

/// The base expression has a known static type.
pub fn known_type(access: &MemberAccess, table: &dyn SymbolTable, file: &Path) -> Option<Expansion> {
    let ty = table.type_of(file, access.base)?;
    Some(typed(ty, access))
}

/// The first base segment resolves to a module.
pub fn module_base(access: &MemberAccess, table: &dyn SymbolTable, file: &Path) -> Option<Expansion> {
    let base = access.base_path.as_ref()?;
    let SymbolKind::Module { path } = &table.symbol(file, base.head)?.kind else {
        return None;
    };
    let package = std::iter::once(path.as_str())
        .chain(base.segments.iter().skip(1).map(String::as_str))
        .collect::<Vec<_>>()
        .join("::");
    Some(scoped(package, access))
}

/// The base is a single identifier bound to a variable with a known type.
pub fn variable_base(access: &MemberAccess, table: &dyn SymbolTable, file: &Path) -> Option<Expansion> {
    let base = access.base_path.as_ref().filter(|b| b.segments.len() == 1)?;
    let SymbolKind::Variable { ty: Some(ty) } = &table.symbol(file, base.head)?.kind else {
        return None;
    };
    Some(typed(ty, access))
}

/// The base is an absolute path such as `std::process`.
pub fn absolute_base(access: &MemberAccess, _table: &dyn SymbolTable, _file: &Path) -> Option<Expansion> {
    let base = access.base_path.as_ref()?;
    let root = base.segments.first()?;
    if !ABSOLUTE_ROOTS.contains(&root.as_str()) {
        return None;
    }
    Some(scoped(base.segments.join("::"), access))
}

fn typed(ty: &str, access: &MemberAccess) -> Expansion {
    Expansion {
        text: format!(
            "{}{}{}",
            simplify_type(strip_pointers(ty)),
            access.separator,
            access.member
        ),
        package: package_of_type(ty),
        name: access.member.clone(),
    }
}

/// A base path ending in a type (`std::fs::File`) is expanded like a typed
/// receiver, so the package is the type's module.
fn scoped(base: String, access: &MemberAccess) -> Expansion {
    if is_type_name(last_segment(&base)) {
        typed(&base, access)
    } else {
        in_package(base, access)
    }
}

fn is_type_name(segment: &str) -> bool {
    segment.chars().next().is_some_and(char::is_uppercase)
}

fn in_package(package: String, access: &MemberAccess) -> Expansion {
    Expansion {
        text: format!(
            "{}{}{}",
            last_segment(&package),
            access.separator,
            access.member
        ),
        package: Some(package),
        name: access.member.clone(),
    }
}

/// Removes leading reference and raw pointer markers, including lifetimes
/// and `mut`: `&'a mut std::fs::File` becomes `std::fs::File`.
#[must_use]
pub fn strip_pointers(ty: &str) -> &str {
    let mut rest = ty.trim_start();
    loop {
        let before = rest;
        if let Some(r) = rest.strip_prefix('&') {
            rest = r.trim_start();
            if let Some(r) = rest.strip_prefix('\'') {
                let end = r
                    .find(|c: char| !(c.is_alphanumeric() || c == '_'))
                    .unwrap_or(r.len());
                rest = r[end..].trim_start();
            }
            if let Some(r) = strip_keyword(rest, "mut") {
                rest = r;
            }
        } else if let Some(r) = rest.strip_prefix('*') {
            let r = r.trim_start();
            rest = strip_keyword(r, "const")
                .or_else(|| strip_keyword(r, "mut"))
                .unwrap_or(r);
        }
        if rest == before {
            return rest;
        }
    }
}

fn strip_keyword<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = text.strip_prefix(keyword)?;
    rest.starts_with(char::is_whitespace)
        .then(|| rest.trim_start())
}

/// Returns true if `path` is a `::`-separated list of identifiers.
#[must_use]
pub fn is_module_path(path: &str) -> bool {
    !path.is_empty() && path.split("::").all(is_ident)
}

fn is_ident(segment: &str) -> bool {
    let segment = segment.strip_prefix("r#").unwrap_or(segment);
    let mut chars = segment.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
        && segment != "_"
}

/// Derives the defining module from a type string: `&std::fs::File` gives
/// `std::fs`. Generic arguments are ignored. Returns `None` for types
/// without a module part or with a prefix that is not a module path.
#[must_use]
pub fn package_of_type(ty: &str) -> Option<String> {
    let path = strip_generics(strip_pointers(ty));
    let package = parent_path(path)?;
    let package = strip_pointers(package);
    is_module_path(package).then(|| package.to_string())
}

/// Shortens a type path to its last two segments (`std::fs::File` becomes
/// `fs::File`). Anything that is not a plain path is returned unchanged.
#[must_use]
pub fn simplify_type(ty: &str) -> &str {
    let path = strip_generics(ty);
    if !is_module_path(path) {
        return ty;
    }
    match path.rmatch_indices("::").nth(1) {
        Some((i, _)) => &ty[i + 2..],
        None => ty,
    }
}

fn strip_generics(ty: &str) -> &str {
    ty.find('<').map_or(ty, |i| &ty[..i])
}

fn parent_path(path: &str) -> Option<&str> {
    path.rfind("::").map(|i| &path[..i])
}

fn last_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Table {
        symbols: HashMap<Site, Symbol>,
        types: HashMap<Site, String>,
    }

    impl SymbolTable for Table {
        fn symbol(&self, _file: &Path, site: Site) -> Option<&Symbol> {
            self.symbols.get(&site)
        }

        fn type_of(&self, _file: &Path, site: Site) -> Option<&str> {
            self.types.get(&site).map(String::as_str)
        }
    }

    fn site(line: usize, start: usize, end: usize) -> Site {
        Site {
            start_line: line,
            start_column: start,
            end_line: line,
            end_column: end,
        }
    }

    fn access(segments: &[&str], member: &str, separator: &'static str) -> MemberAccess {
        MemberAccess {
            base: site(1, 0, 10),
            base_path: Some(BasePath {
                head: site(1, 0, 3),
                segments: segments.iter().map(|s| (*s).to_string()).collect(),
            }),
            member: member.to_string(),
            separator,
        }
    }

    #[test]
    fn strips_pointer_markers() {
        assert_eq!(strip_pointers("&std::fs::File"), "std::fs::File");
        assert_eq!(strip_pointers("&'a mut Foo"), "Foo");
        assert_eq!(strip_pointers("&&mut Foo"), "Foo");
        assert_eq!(strip_pointers("*const u8"), "u8");
        assert_eq!(strip_pointers("*mut *const T"), "T");
        assert_eq!(strip_pointers("mutex::Guard"), "mutex::Guard");
    }

    #[test]
    fn derives_package_from_type() {
        assert_eq!(package_of_type("std::fs::File").as_deref(), Some("std::fs"));
        assert_eq!(package_of_type("&mut std::fs::File").as_deref(), Some("std::fs"));
        assert_eq!(package_of_type("std::vec::Vec<u8>").as_deref(), Some("std::vec"));
        assert_eq!(package_of_type("File"), None);
        assert_eq!(package_of_type("(u8, u8)"), None);
        assert_eq!(package_of_type("<T as Trait>::Output"), None);
    }

    #[test]
    fn simplifies_type_paths() {
        assert_eq!(simplify_type("std::fs::File"), "fs::File");
        assert_eq!(simplify_type("fs::File"), "fs::File");
        assert_eq!(simplify_type("File"), "File");
        assert_eq!(simplify_type("std::vec::Vec<u8>"), "vec::Vec<u8>");
        assert_eq!(simplify_type("[u8; 4]"), "[u8; 4]");
    }

    #[test]
    fn module_path_validation() {
        assert!(is_module_path("some::pkg"));
        assert!(is_module_path("r#type::x"));
        assert!(!is_module_path(""));
        assert!(!is_module_path("some::"));
        assert!(!is_module_path("1pkg"));
        assert!(!is_module_path("Vec<u8>"));
    }

    #[test]
    fn ident_with_package() {
        let mut table = Table::default();
        table
            .symbols
            .insert(site(1, 0, 4), Symbol::item("exit", "std::process"));

        let expansion = expand_ident(site(1, 0, 4), &table, Path::new("a.rs")).unwrap();
        assert_eq!(expansion.text, "process::exit");
        assert_eq!(expansion.package.as_deref(), Some("std::process"));
        assert_eq!(expansion.name, "exit");
    }

    #[test]
    fn local_ident_has_no_package() {
        let mut table = Table::default();
        table
            .symbols
            .insert(site(1, 0, 1), Symbol::variable("x", None));

        let expansion = expand_ident(site(1, 0, 1), &table, Path::new("a.rs")).unwrap();
        assert_eq!(expansion.text, "x");
        assert_eq!(expansion.package, None);
        assert!(expand_ident(site(2, 0, 1), &table, Path::new("a.rs")).is_none());
    }

    #[test]
    fn known_type_wins_over_other_strategies() {
        let access = access(&["file"], "sync_all", ".");
        let mut table = Table::default();
        table.types.insert(access.base, "&std::fs::File".to_string());
        table.symbols.insert(
            access.base_path.as_ref().unwrap().head,
            Symbol::variable("file", Some("other::Thing".to_string())),
        );

        let (strategy, expansion) = expand_member(&access, &table, Path::new("a.rs")).unwrap();
        assert_eq!(strategy, "known type");
        assert_eq!(expansion.text, "fs::File.sync_all");
        assert_eq!(expansion.package.as_deref(), Some("std::fs"));
    }

    #[test]
    fn renamed_module_resolves_to_its_path() {
        let access = access(&["renamed"], "forbidden", "::");
        let mut table = Table::default();
        table.symbols.insert(
            access.base_path.as_ref().unwrap().head,
            Symbol::module("renamed", "some::pkg"),
        );

        let (strategy, expansion) = expand_member(&access, &table, Path::new("a.rs")).unwrap();
        assert_eq!(strategy, "module base");
        assert_eq!(expansion.text, "pkg::forbidden");
        assert_eq!(expansion.package.as_deref(), Some("some::pkg"));
    }

    #[test]
    fn module_base_appends_remaining_segments() {
        let access = access(&["io", "stdio"], "stdout", "::");
        let mut table = Table::default();
        table.symbols.insert(
            access.base_path.as_ref().unwrap().head,
            Symbol::module("io", "std::io"),
        );

        let expansion = module_base(&access, &table, Path::new("a.rs")).unwrap();
        assert_eq!(expansion.text, "stdio::stdout");
        assert_eq!(expansion.package.as_deref(), Some("std::io::stdio"));
    }

    #[test]
    fn type_heads_use_the_type_module() {
        let imported = access(&["File"], "open", "::");
        let mut table = Table::default();
        table.symbols.insert(
            imported.base_path.as_ref().unwrap().head,
            Symbol::module("File", "std::fs::File"),
        );

        let (strategy, expansion) = expand_member(&imported, &table, Path::new("a.rs")).unwrap();
        assert_eq!(strategy, "module base");
        assert_eq!(expansion.text, "fs::File::open");
        assert_eq!(expansion.package.as_deref(), Some("std::fs"));

        let absolute = access(&["std", "fs", "File"], "create", "::");
        let expansion = absolute_base(&absolute, &Table::default(), Path::new("a.rs")).unwrap();
        assert_eq!(expansion.text, "fs::File::create");
        assert_eq!(expansion.package.as_deref(), Some("std::fs"));
    }

    #[test]
    fn variable_with_declared_type() {
        let access = access(&["conn"], "close", ".");
        let mut table = Table::default();
        table.symbols.insert(
            access.base_path.as_ref().unwrap().head,
            Symbol::variable("conn", Some("db::pool::Conn".to_string())),
        );

        let (strategy, expansion) = expand_member(&access, &table, Path::new("a.rs")).unwrap();
        assert_eq!(strategy, "variable base");
        assert_eq!(expansion.text, "pool::Conn.close");
        assert_eq!(expansion.package.as_deref(), Some("db::pool"));
    }

    #[test]
    fn absolute_paths_need_no_table() {
        let access = access(&["std", "process"], "exit", "::");
        let (strategy, expansion) =
            expand_member(&access, &Table::default(), Path::new("a.rs")).unwrap();
        assert_eq!(strategy, "absolute path");
        assert_eq!(expansion.text, "process::exit");
        assert_eq!(expansion.package.as_deref(), Some("std::process"));
    }

    #[test]
    fn unresolved_access_yields_nothing() {
        let access = access(&["thing"], "go", ".");
        assert!(expand_member(&access, &Table::default(), Path::new("a.rs")).is_none());

        let mut no_path = access.clone();
        no_path.base_path = None;
        assert!(expand_member(&no_path, &Table::default(), Path::new("a.rs")).is_none());
    }
}

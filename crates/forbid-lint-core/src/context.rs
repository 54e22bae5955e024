//! Per-file context for rule execution.

use proc_macro2::LineColumn;
use std::path::{Component, Path, PathBuf};

/// Context provided to per-file rules.
///
/// Contains metadata about the file being analyzed plus the raw source, which
/// is needed to render the exact text of an expression.
#[derive(Debug, Clone)]
pub struct FileContext<'a> {
    /// Absolute path to the file.
    pub path: &'a Path,
    /// File contents as a string.
    pub content: &'a str,
    /// Whether this file is detected as a test file.
    pub is_test: bool,
    /// Module path from crate root (e.g., `["crate", "module", "submodule"]`).
    pub module_path: Vec<String>,
    /// Path relative to the project root.
    pub relative_path: PathBuf,
    line_starts: Vec<usize>,
}

impl<'a> FileContext<'a> {
    /// Creates a new file context.
    #[must_use]
    pub fn new(path: &'a Path, content: &'a str, root: &Path) -> Self {
        let relative_path = path
            .strip_prefix(root)
            .map_or_else(|_| path.to_path_buf(), Path::to_path_buf);
        let is_test = Self::detect_test_file(&relative_path);
        let module_path = Self::compute_module_path(&relative_path);

        Self {
            path,
            content,
            is_test,
            module_path,
            relative_path,
            line_starts: line_starts(content),
        }
    }

    /// Detects if a file is a test file based on path conventions.
    fn detect_test_file(path: &Path) -> bool {
        for component in path.components() {
            if let Component::Normal(s) = component {
                let s = s.to_string_lossy();
                if s == "tests" || s == "test" || s == "benches" {
                    return true;
                }
            }
        }

        if let Some(file_name) = path.file_name().and_then(|n| n.to_str()) {
            if file_name.ends_with("_test.rs")
                || file_name.ends_with("_tests.rs")
                || file_name.starts_with("test_")
                || file_name == "tests.rs"
            {
                return true;
            }
        }

        false
    }

    /// Computes the module path from a relative file path.
    ///
    /// Everything up to and including a `src` directory is dropped, so
    /// `crates/foo/src/bar/mod.rs` becomes `["crate", "bar"]`.
    fn compute_module_path(relative_path: &Path) -> Vec<String> {
        let mut parts: Vec<String> = relative_path
            .with_extension("")
            .components()
            .filter_map(|c| {
                if let Component::Normal(s) = c {
                    s.to_str().map(String::from)
                } else {
                    None
                }
            })
            .collect();

        if let Some(src) = parts.iter().rposition(|p| p == "src") {
            parts.drain(..=src);
        }

        if let Some(last) = parts.last() {
            if last == "mod" || last == "lib" || last == "main" {
                parts.pop();
            }
        }

        parts.insert(0, "crate".to_string());
        parts
    }

    /// Returns the path that ignore globs are matched against: the
    /// project-relative path with `/` separators.
    #[must_use]
    pub fn match_path(&self) -> String {
        self.relative_path
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Returns the module path joined with `::`.
    #[must_use]
    pub fn module(&self) -> String {
        self.module_path.join("::")
    }

    /// Converts a span position (1-indexed line, 0-indexed char column) to a
    /// byte offset.
    #[must_use]
    pub fn offset_of(&self, position: LineColumn) -> Option<usize> {
        let line_start = *self.line_starts.get(position.line.checked_sub(1)?)?;
        let line_end = self
            .line_starts
            .get(position.line)
            .copied()
            .unwrap_or(self.content.len());
        let line = &self.content[line_start..line_end];

        match line.char_indices().nth(position.column) {
            Some((i, _)) => Some(line_start + i),
            None if line.chars().count() == position.column => Some(line_end),
            None => None,
        }
    }

    /// Returns the source text between two span positions.
    #[must_use]
    pub fn slice(&self, start: LineColumn, end: LineColumn) -> Option<&'a str> {
        let from = self.offset_of(start)?;
        let to = self.offset_of(end)?;
        self.content.get(from..to)
    }
}

fn line_starts(content: &str) -> Vec<usize> {
    std::iter::once(0)
        .chain(content.match_indices('\n').map(|(i, _)| i + 1))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_test_file() {
        assert!(FileContext::detect_test_file(Path::new("src/tests/foo.rs")));
        assert!(FileContext::detect_test_file(Path::new(
            "tests/integration.rs"
        )));
        assert!(FileContext::detect_test_file(Path::new("src/foo_test.rs")));
        assert!(FileContext::detect_test_file(Path::new("src/test_foo.rs")));
        assert!(FileContext::detect_test_file(Path::new("benches/speed.rs")));
        assert!(!FileContext::detect_test_file(Path::new("src/foo.rs")));
        assert!(!FileContext::detect_test_file(Path::new("src/lib.rs")));
    }

    #[test]
    fn test_module_path() {
        assert_eq!(
            FileContext::compute_module_path(Path::new("src/foo/bar.rs")),
            vec!["crate", "foo", "bar"]
        );
        assert_eq!(
            FileContext::compute_module_path(Path::new("crates/x/src/foo/mod.rs")),
            vec!["crate", "foo"]
        );
        assert_eq!(
            FileContext::compute_module_path(Path::new("src/lib.rs")),
            vec!["crate"]
        );
    }

    #[test]
    fn test_match_path_uses_forward_slashes() {
        let ctx = FileContext::new(
            Path::new("/project/src/a/b.rs"),
            "",
            Path::new("/project"),
        );
        assert_eq!(ctx.match_path(), "src/a/b.rs");
        assert_eq!(ctx.module(), "crate::a::b");
    }

    #[test]
    fn test_offset_and_slice() {
        let content = "line1\nlet é = x.y;\nline3";
        let ctx = FileContext::new(Path::new("test.rs"), content, Path::new(""));

        assert_eq!(ctx.offset_of(LineColumn { line: 1, column: 0 }), Some(0));
        assert_eq!(ctx.offset_of(LineColumn { line: 2, column: 0 }), Some(6));
        // `x` comes after a two-byte character
        let start = LineColumn { line: 2, column: 8 };
        let end = LineColumn { line: 2, column: 11 };
        assert_eq!(ctx.slice(start, end), Some("x.y"));
        assert_eq!(ctx.offset_of(LineColumn { line: 9, column: 0 }), None);
    }
}

//! Inline `permit:` directives.
//!
//! A forbidden expression is accepted when a line comment on the same line
//! names it exactly:
//! ```text
//! std::process::exit(1); // permit:std::process::exit
//! std::process::exit(1); //permit:std::process::exit
//! ```

use regex::Regex;
use std::collections::BTreeMap;

/// A `//` comment found in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    /// Line number (1-indexed).
    pub line: usize,
    /// Column number (1-indexed).
    pub column: usize,
    /// Comment text including the leading `//`.
    pub text: String,
}

/// Line comments of one file, indexed by line.
#[derive(Debug, Clone, Default)]
pub struct Comments {
    by_line: BTreeMap<usize, Vec<Comment>>,
}

impl Comments {
    /// Extracts all line comments from `content`.
    #[must_use]
    pub fn scan(content: &str) -> Self {
        let mut by_line: BTreeMap<usize, Vec<Comment>> = BTreeMap::new();
        for comment in scan_line_comments(content) {
            by_line.entry(comment.line).or_default().push(comment);
        }
        Self { by_line }
    }

    /// Returns the comments that start on `line`.
    pub fn on_line(&self, line: usize) -> impl Iterator<Item = &Comment> {
        self.by_line.get(&line).into_iter().flatten()
    }

    /// Checks whether a comment on `line` permits exactly `literal`.
    #[must_use]
    pub fn permits(&self, line: usize, literal: &str) -> bool {
        let mut comments = self.on_line(line).peekable();
        if comments.peek().is_none() {
            return false;
        }
        let Ok(directive) = permit_regex(literal) else {
            return false;
        };
        comments.any(|c| directive.is_match(&c.text))
    }
}

fn permit_regex(literal: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(r"^//\s?permit:{}\b", regex::escape(literal)))
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Code,
    Block(usize),
    Str,
    RawStr(usize),
}

/// Walks the source once and collects `//` comments, skipping string,
/// raw string and char literals as well as (nested) block comments.
fn scan_line_comments(content: &str) -> Vec<Comment> {
    let chars: Vec<char> = content.chars().collect();
    let mut comments = Vec::new();
    let mut state = State::Code;
    let (mut line, mut column) = (1, 1);
    let mut i = 0;

    // Advances over `n` chars, keeping line and column in sync.
    let advance = |i: &mut usize, line: &mut usize, column: &mut usize, n: usize| {
        for _ in 0..n {
            if chars.get(*i) == Some(&'\n') {
                *line += 1;
                *column = 1;
            } else {
                *column += 1;
            }
            *i += 1;
        }
    };

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        match state {
            State::Code => match (c, next) {
                ('/', Some('/')) => {
                    let end = chars[i..]
                        .iter()
                        .position(|&ch| ch == '\n')
                        .map_or(chars.len(), |p| i + p);
                    comments.push(Comment {
                        line,
                        column,
                        text: chars[i..end].iter().collect::<String>().trim_end().to_string(),
                    });
                    let n = end - i;
                    advance(&mut i, &mut line, &mut column, n);
                }
                ('/', Some('*')) => {
                    state = State::Block(1);
                    advance(&mut i, &mut line, &mut column, 2);
                }
                ('"', _) => {
                    state = State::Str;
                    advance(&mut i, &mut line, &mut column, 1);
                }
                ('r', Some('"' | '#')) if opens_raw_prefix(&chars, i) => {
                    let hashes = chars[i + 1..].iter().take_while(|&&ch| ch == '#').count();
                    if chars.get(i + 1 + hashes) == Some(&'"') {
                        state = State::RawStr(hashes);
                        advance(&mut i, &mut line, &mut column, hashes + 2);
                    } else {
                        // raw identifier such as `r#type`
                        advance(&mut i, &mut line, &mut column, 1);
                    }
                }
                ('\'', Some('\\')) => {
                    let close = chars[i + 2..]
                        .iter()
                        .position(|&ch| ch == '\'')
                        .map_or(chars.len() - i, |p| p + 3);
                    advance(&mut i, &mut line, &mut column, close);
                }
                ('\'', Some(_)) if chars.get(i + 2) == Some(&'\'') => {
                    advance(&mut i, &mut line, &mut column, 3);
                }
                _ => advance(&mut i, &mut line, &mut column, 1),
            },
            State::Block(depth) => match (c, next) {
                ('*', Some('/')) => {
                    state = if depth == 1 {
                        State::Code
                    } else {
                        State::Block(depth - 1)
                    };
                    advance(&mut i, &mut line, &mut column, 2);
                }
                ('/', Some('*')) => {
                    state = State::Block(depth + 1);
                    advance(&mut i, &mut line, &mut column, 2);
                }
                _ => advance(&mut i, &mut line, &mut column, 1),
            },
            State::Str => match c {
                '\\' => advance(&mut i, &mut line, &mut column, 2),
                '"' => {
                    state = State::Code;
                    advance(&mut i, &mut line, &mut column, 1);
                }
                _ => advance(&mut i, &mut line, &mut column, 1),
            },
            State::RawStr(hashes) => {
                let closes = c == '"'
                    && chars[i + 1..].iter().take(hashes).filter(|&&ch| ch == '#').count()
                        == hashes;
                if closes {
                    state = State::Code;
                    advance(&mut i, &mut line, &mut column, hashes + 1);
                } else {
                    advance(&mut i, &mut line, &mut column, 1);
                }
            }
        }
    }

    comments
}

fn is_ident_char(c: Option<char>) -> bool {
    c.is_some_and(|c| c.is_alphanumeric() || c == '_')
}

/// Whether the `r` at `at` starts a raw literal prefix: `r`, `br` or `cr`
/// at a token start.
fn opens_raw_prefix(chars: &[char], at: usize) -> bool {
    let before = |n: usize| at.checked_sub(n).map(|p| chars[p]);
    match before(1) {
        Some('b' | 'c') => !is_ident_char(before(2)),
        prev => !is_ident_char(prev),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(content: &str) -> Vec<(usize, String)> {
        scan_line_comments(content)
            .into_iter()
            .map(|c| (c.line, c.text))
            .collect()
    }

    #[test]
    fn finds_trailing_and_full_line_comments() {
        let content = "// header\nfn foo() {\n    bar(); // trailing\n}\n";
        assert_eq!(
            texts(content),
            vec![(1, "// header".to_string()), (3, "// trailing".to_string())]
        );
    }

    #[test]
    fn records_column_of_comment() {
        let comments = scan_line_comments("x(); //c");
        assert_eq!(comments[0].column, 6);
    }

    #[test]
    fn ignores_slashes_inside_literals() {
        let content = r##"let a = "http://x"; let b = r#"a // b"#; let c = '/'; // real
let d = b"//"; let e = '\''; // second"##;
        assert_eq!(
            texts(content),
            vec![(1, "// real".to_string()), (2, "// second".to_string())]
        );
    }

    #[test]
    fn lifetimes_are_not_char_literals() {
        let content = "fn f<'a>(x: &'a str) {} // after lifetime";
        assert_eq!(texts(content), vec![(1, "// after lifetime".to_string())]);
    }

    #[test]
    fn skips_nested_block_comments() {
        let content = "/* outer /* inner // no */ still // no */ x(); // yes";
        assert_eq!(texts(content), vec![(1, "// yes".to_string())]);
    }

    #[test]
    fn raw_identifiers_do_not_open_raw_strings() {
        let content = "let r#type = 1; // kept";
        assert_eq!(texts(content), vec![(1, "// kept".to_string())]);
    }

    #[test]
    fn permits_both_directive_styles() {
        let comments = Comments::scan("a();\nfoo::bar(); //permit:foo::bar\nfoo::bar(); // permit:foo::bar\n");
        assert!(!comments.permits(1, "foo::bar"));
        assert!(comments.permits(2, "foo::bar"));
        assert!(comments.permits(3, "foo::bar"));
    }

    #[test]
    fn permit_requires_exact_text() {
        let comments = Comments::scan("x.unwrap_or(); // permit:x.unwrap\n");
        assert!(!comments.permits(1, "x.unwrap_or"));
        assert!(comments.permits(1, "x.unwrap"));
        // `\b` holds between `x` and `.`, so a prefix ending at a word
        // boundary is accepted.
        assert!(comments.permits(1, "x"));
        assert!(!comments.permits(1, "x.unwrap_"));
    }

    #[test]
    fn permit_rejects_extra_spacing_and_other_prefixes() {
        let comments = Comments::scan("a(); //  permit:a\nb(); /// permit:b\nc(); // note permit:c\n");
        assert!(!comments.permits(1, "a"));
        assert!(!comments.permits(2, "b"));
        assert!(!comments.permits(3, "c"));
    }

    #[test]
    fn permit_text_is_regex_escaped() {
        let comments = Comments::scan("x.y(); // permit:x.y\n");
        assert!(comments.permits(1, "x.y"));
        let comments = Comments::scan("xzy(); // permit:xzy\n");
        assert!(!comments.permits(1, "x.y"));
    }

    #[test]
    fn groups_comments_by_line() {
        let comments = Comments::scan("// a\n// b\nfn f() {} /* c */ // d\n");
        assert_eq!(comments.on_line(1).count(), 1);
        assert_eq!(comments.on_line(3).map(|c| c.text.as_str()).collect::<Vec<_>>(), ["// d"]);
        assert_eq!(comments.on_line(4).count(), 0);
    }

    #[test]
    fn byte_and_c_raw_strings_are_skipped() {
        let content = "let p = br\"c:\\\"; dbg(); // permit:dbg\nlet q = cr#\"//\"#; // after\nlet sub = bar\"x\"; // quoted\n";
        assert_eq!(
            texts(content),
            vec![
                (1, "// permit:dbg".to_string()),
                (2, "// after".to_string()),
                (3, "// quoted".to_string()),
            ]
        );
        assert!(Comments::scan(content).permits(1, "dbg"));
    }
}

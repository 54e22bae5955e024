//! Recognition of documentation-example functions.
//!
//! In test files, free functions whose name starts with `example` are treated
//! as runnable documentation. Such functions are skipped when examples are
//! excluded, and a file that consists of exactly one example plus supporting
//! items is skipped as a whole.

use syn::{Attribute, Item, ItemFn};

/// Classification of a free function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FnShape {
    /// Name starts with `example`.
    Example,
    /// Name starts with `test`, or the function carries a `#[test]`-like attribute.
    Test,
    /// Name starts with `bench`, or the function carries `#[bench]`.
    Bench,
    /// Anything else.
    Plain,
}

impl FnShape {
    /// Classifies a free function by name and attributes.
    #[must_use]
    pub fn of(item: &ItemFn) -> Self {
        let name = item.sig.ident.to_string();
        if name.starts_with("example") {
            Self::Example
        } else if name.starts_with("test") || has_attr_ending_in(&item.attrs, "test") {
            Self::Test
        } else if name.starts_with("bench") || has_attr_ending_in(&item.attrs, "bench") {
            Self::Bench
        } else {
            Self::Plain
        }
    }
}

/// Returns true for attributes like `#[test]`, `#[tokio::test]` or
/// `#[rstest::test]` when `name` is `"test"`.
fn has_attr_ending_in(attrs: &[Attribute], name: &str) -> bool {
    attrs
        .iter()
        .any(|attr| attr.path().segments.last().is_some_and(|s| s.ident == name))
}

/// Returns true if `item` is an example-shaped free function.
#[must_use]
pub fn is_example_fn(item: &ItemFn) -> bool {
    FnShape::of(item) == FnShape::Example
}

/// Decides whether a whole test file is a single documentation example.
///
/// The file must have more than one top-level item, exactly one of them an
/// example function and none of them a test or benchmark.
#[must_use]
pub fn is_whole_file_example(file: &syn::File) -> bool {
    if file.items.len() <= 1 {
        return false;
    }

    let mut examples = 0;
    for item in &file.items {
        let Item::Fn(func) = item else {
            continue;
        };
        match FnShape::of(func) {
            FnShape::Example => examples += 1,
            FnShape::Test | FnShape::Bench => return false,
            FnShape::Plain => {}
        }
    }
    examples == 1
}

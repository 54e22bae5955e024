//! List patterns command implementation.

use anyhow::{Context, Result};
use forbid_lint_core::{ForbidRule, Pattern, Rule};

use crate::config_resolver::ConfigSource;

/// Runs the list-patterns command.
pub fn run(source: &ConfigSource) -> Result<()> {
    let config = source.load()?;
    let rule = ForbidRule::from_config(&config.forbid).context("Invalid forbid pattern")?;

    match source.path() {
        Some(path) => println!("Patterns from {}:\n", path.display()),
        None => println!("Builtin patterns:\n"),
    }
    for line in rule.linter().patterns().iter().map(describe) {
        println!("  {line}");
    }

    println!("\nRule {} ({}): {}", rule.code(), rule.name(), rule.description());
    println!("Add `// permit:<identifier>` on a line to allow a single use.");
    Ok(())
}

fn describe(pattern: &Pattern) -> String {
    let mut line = pattern.as_str().to_string();
    if let Some(package) = pattern.package() {
        line.push_str(&format!("  [package {package}]"));
    }
    if let Some(message) = pattern.message() {
        line.push_str(&format!("  ({message})"));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describes_package_and_message() {
        let pattern =
            Pattern::parse("{pattern: ^forbidden$, package: ^some::pkg$, msg: not here}").unwrap();
        assert_eq!(
            describe(&pattern),
            "^forbidden$  [package ^some::pkg$]  (not here)"
        );
        assert_eq!(describe(&Pattern::parse("^dbg$").unwrap()), "^dbg$");
    }
}

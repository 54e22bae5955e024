//! Init command implementation.

use anyhow::{bail, Result};
use std::path::Path;

const DEFAULT_CONFIG: &str = r#"# forbid-lint configuration

[analyzer]
# Root directory to analyze (default: current directory)
# root = "./src"

# Glob patterns to exclude from analysis
exclude = [
    "**/target/**",
    "**/vendor/**",
]

# Respect .gitignore files
respect_gitignore = true

[forbid]
# Plain regexes or tables with pattern/package/msg/ignore.
# Empty selects the builtin set: print, println, eprint, eprintln and dbg.
patterns = [
    '^((std|core)::)?(print|println|eprint|eprintln|dbg)$',
    # '^std::process::exit(# return an error from main instead)?$',
    # { pattern = '^unwrap$', msg = "propagate the error", ignore = ["tests/**"] },
    # { pattern = '^forbidden$', package = '^some::pkg$' },
]

# Check example functions in test files too
include_examples = false

# Honor `// permit:<identifier>` comments
use_permit_directives = true

# Resolve imports and bindings so that `package` patterns can match
analyze_types = false

# [rules.forbidden-identifier]
# severity = "warning"
"#;

/// Runs the init command.
pub fn run(force: bool) -> Result<()> {
    write_config(Path::new("forbid-lint.toml"), force)?;

    println!("Created forbid-lint.toml");
    println!("\nNext steps:");
    println!("  1. Edit the [forbid] patterns in forbid-lint.toml");
    println!("  2. Run: forbid-lint check");

    Ok(())
}

fn write_config(config_path: &Path, force: bool) -> Result<()> {
    if config_path.exists() && !force {
        bail!(
            "Configuration file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    std::fs::write(config_path, DEFAULT_CONFIG)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use forbid_lint_core::Config;

    #[test]
    fn template_parses_and_compiles() {
        let config = Config::parse(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.forbid.compile_patterns().unwrap().len(), 1);
        assert!(config.forbid.use_permit_directives);
    }

    #[test]
    fn existing_config_needs_force() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("forbid-lint.toml");
        std::fs::write(&path, "# mine\n").unwrap();

        assert!(write_config(&path, false).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# mine\n");

        write_config(&path, true).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), DEFAULT_CONFIG);
    }
}

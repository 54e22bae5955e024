//! Check command implementation.

use anyhow::{Context, Result};
use forbid_lint_core::{Analyzer, ForbidConfig, ForbidRule, PatternEntry};
use std::path::Path;

use crate::config_resolver::ConfigSource;
use crate::OutputFormat;

/// Command-line values layered over the `[forbid]` section.
#[derive(Debug, Default)]
pub struct Overrides {
    /// Extra patterns appended to the configured ones.
    pub patterns: Vec<String>,
    /// Forces example functions to be checked.
    pub include_examples: bool,
    /// Replaces `use_permit_directives` when given.
    pub use_permit_directives: Option<bool>,
    /// Forces symbol resolution.
    pub analyze_types: bool,
}

impl Overrides {
    fn apply(&self, forbid: &mut ForbidConfig) {
        forbid
            .patterns
            .extend(self.patterns.iter().cloned().map(PatternEntry::Regex));
        forbid.include_examples |= self.include_examples;
        forbid.analyze_types |= self.analyze_types;
        if let Some(permit) = self.use_permit_directives {
            forbid.use_permit_directives = permit;
        }
    }
}

/// Runs the check command. Returns `true` when error-severity violations
/// were found.
pub fn run(
    path: &Path,
    format: OutputFormat,
    overrides: &Overrides,
    exclude: Vec<String>,
    source: &ConfigSource,
) -> Result<bool> {
    let mut config = source.load()?;
    overrides.apply(&mut config.forbid);

    let rule = ForbidRule::from_config(&config.forbid).context("Invalid forbid pattern")?;
    tracing::debug!("Using {} pattern(s)", rule.linter().patterns().len());

    let analyzer = Analyzer::builder()
        .root(path)
        .config(config)
        .excludes(exclude)
        .rule(rule)
        .build()
        .context("Failed to build analyzer")?;

    tracing::info!("Analyzing {:?} with {} rules", path, analyzer.rule_count());

    let result = analyzer.analyze().context("Analysis failed")?;

    super::output::print(&result, format, analyzer.root())?;

    Ok(result.has_errors())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_extend_patterns_and_force_flags() {
        let mut forbid = ForbidConfig {
            patterns: vec![PatternEntry::Regex("^dbg$".to_string())],
            ..ForbidConfig::default()
        };
        let overrides = Overrides {
            patterns: vec!["^todo$".to_string()],
            include_examples: true,
            use_permit_directives: Some(false),
            analyze_types: false,
        };
        overrides.apply(&mut forbid);

        assert_eq!(forbid.patterns.len(), 2);
        assert!(forbid.include_examples);
        assert!(!forbid.use_permit_directives);
        assert!(!forbid.analyze_types);
    }

    #[test]
    fn unset_overrides_keep_config() {
        let mut forbid = ForbidConfig {
            analyze_types: true,
            ..ForbidConfig::default()
        };
        Overrides::default().apply(&mut forbid);

        assert!(forbid.patterns.is_empty());
        assert!(forbid.use_permit_directives);
        assert!(forbid.analyze_types);
    }

    #[test]
    fn run_reports_errors() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("src")).unwrap();
        std::fs::write(tmp.path().join("src/lib.rs"), "pub fn f() {\n    dbg!(1);\n}\n").unwrap();

        let failed = run(
            tmp.path(),
            OutputFormat::Compact,
            &Overrides::default(),
            Vec::new(),
            &ConfigSource::Default,
        )
        .unwrap();
        assert!(failed);

        let clean = Overrides {
            patterns: vec!["^never$".to_string()],
            ..Overrides::default()
        };
        let config = tmp.path().join("forbid-lint.toml");
        std::fs::write(&config, "[forbid]\npatterns = ['^unused$']\n").unwrap();
        let failed = run(
            tmp.path(),
            OutputFormat::Compact,
            &clean,
            Vec::new(),
            &ConfigSource::Project(config),
        )
        .unwrap();
        assert!(!failed);
    }
}

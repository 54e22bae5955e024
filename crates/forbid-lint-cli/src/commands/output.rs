//! Shared output formatting for lint results.

use anyhow::Result;
use forbid_lint_core::{LintResult, Severity, ViolationDiagnostic};
use miette::{NamedSource, Report};
use std::path::Path;

use crate::OutputFormat;

/// Print lint results in the specified format. `root` is the directory
/// violation paths are relative to.
pub fn print(result: &LintResult, format: OutputFormat, root: &Path) -> Result<()> {
    match format {
        OutputFormat::Text => print_text(result),
        OutputFormat::Json => return print_json(result),
        OutputFormat::Compact => print_compact(result),
        OutputFormat::Plain => print_plain(result),
        OutputFormat::Pretty => print_pretty(result, root),
    }
    Ok(())
}

fn print_text(result: &LintResult) {
    let (errors, warnings, infos) = result.count_by_severity();

    for violation in &result.violations {
        let severity_indicator = match violation.severity {
            Severity::Error => "\x1b[31merror\x1b[0m",
            Severity::Warning => "\x1b[33mwarning\x1b[0m",
            Severity::Info => "\x1b[34minfo\x1b[0m",
        };

        println!("{} {} at {}", violation.code, violation.rule, violation.location);
        println!("  {}: {}", severity_indicator, violation.message);
        println!();
    }

    print_summary(result, errors, warnings, infos);
}

fn print_summary(result: &LintResult, errors: usize, warnings: usize, infos: usize) {
    let summary_color = if errors > 0 {
        "\x1b[31m"
    } else if warnings > 0 {
        "\x1b[33m"
    } else {
        "\x1b[32m"
    };

    println!(
        "{}Found {} error(s), {} warning(s), {} info(s) in {} file(s)\x1b[0m",
        summary_color, errors, warnings, infos, result.files_checked
    );
}

fn print_json(result: &LintResult) -> Result<()> {
    let json = serde_json::to_string_pretty(result)?;
    println!("{json}");
    Ok(())
}

fn print_compact(result: &LintResult) {
    for violation in &result.violations {
        println!("{violation}");
    }
}

fn print_plain(result: &LintResult) {
    for violation in &result.violations {
        println!("{} at {}", violation.message, violation.location);
    }
}

fn print_pretty(result: &LintResult, root: &Path) {
    for violation in &result.violations {
        let file = &violation.location.file;
        let report = Report::new(ViolationDiagnostic::from(violation));
        match std::fs::read_to_string(root.join(file)) {
            Ok(content) => {
                let source = NamedSource::new(file.display().to_string(), content);
                println!("{:?}", report.with_source_code(source));
            }
            Err(e) => {
                tracing::warn!("Cannot read {} for display: {e}", file.display());
                println!("{violation}");
            }
        }
    }

    let (errors, warnings, infos) = result.count_by_severity();
    print_summary(result, errors, warnings, infos);
}

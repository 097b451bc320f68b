//! Shared output formatting for lint results.

use anyhow::Result;
use seam_lint_core::{LintResult, Severity, Violation};

use crate::OutputFormat;

/// Print lint results in the specified format.
pub fn print(result: &LintResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print_text(result),
        OutputFormat::Json => return print_json(result),
        OutputFormat::Compact => print_compact(result),
    }
    Ok(())
}

fn print_text(result: &LintResult) {
    for violation in &result.violations {
        print!("{}", render_text(violation));
        println!();
    }
    println!("{}", summary(result));
}

fn render_text(violation: &Violation) -> String {
    let severity_indicator = match violation.severity {
        Severity::Error => "\x1b[31merror\x1b[0m",
        Severity::Warning => "\x1b[33mwarning\x1b[0m",
        Severity::Info => "\x1b[34minfo\x1b[0m",
    };
    violation.format().replacen(
        &format!("  {}:", violation.severity),
        &format!("  {severity_indicator}:"),
        1,
    )
}

fn summary(result: &LintResult) -> String {
    let (errors, warnings, infos) = result.count_by_severity();
    let summary_color = if errors > 0 {
        "\x1b[31m"
    } else if warnings > 0 {
        "\x1b[33m"
    } else {
        "\x1b[32m"
    };

    format!(
        "{}Found {} error(s), {} warning(s), {} info(s) in {} unit(s)\x1b[0m",
        summary_color, errors, warnings, infos, result.units_checked
    )
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

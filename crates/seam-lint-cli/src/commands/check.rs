//! Check command implementation.

use anyhow::{Context, Result};
use seam_lint_core::{Analyzer, Config, Severity};
use seam_lint_rules::{configured_rules, foreign_impl_dispatch};
use std::path::Path;

use crate::config_resolver::ConfigSource;
use crate::OutputFormat;

/// Interface selection given on the command line.
#[derive(Debug, Default)]
pub struct Target {
    /// Overrides `interface_package`.
    pub interface_package: Option<String>,
    /// Overrides `interface_name`.
    pub interface_name: Option<String>,
}

impl Target {
    /// Writes the overrides into the rule's configuration section.
    fn apply(self, config: &mut Config) {
        let section = config
            .rules
            .entry(foreign_impl_dispatch::NAME.to_string())
            .or_default();
        for (key, value) in [
            ("interface_package", self.interface_package),
            ("interface_name", self.interface_name),
        ] {
            if let Some(value) = value {
                section
                    .options
                    .insert(key.to_string(), toml::Value::String(value));
            }
        }
    }
}

/// Runs the check command. Returns true when the run should fail.
pub fn run(
    path: &Path,
    format: OutputFormat,
    exclude: Vec<String>,
    target: Target,
    source: &ConfigSource,
) -> Result<bool> {
    let mut config = source.load()?;
    target.apply(&mut config);
    let fail_on = config.fail_on.unwrap_or(Severity::Error);

    let rules = configured_rules(&config).context(
        "Set interface_package and interface_name in seam-lint.toml or pass --interface-package/--interface-name",
    )?;

    let mut builder = Analyzer::builder().root(path).config(config);

    for pattern in exclude {
        builder = builder.exclude(pattern);
    }

    for rule in rules {
        builder = builder.rule_box(rule);
    }

    let analyzer = builder.build().context("Failed to build analyzer")?;

    tracing::info!("Analyzing {:?} with {} rules", path, analyzer.rule_count());

    let result = analyzer.analyze().context("Analysis failed")?;

    super::output::print(&result, format)?;

    Ok(result.has_violations_at(fail_on))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_overrides_config_options() {
        let mut config = Config::parse(
            "[rules.foreign-impl-dispatch]\ninterface_package = \"fakefmt\"\ninterface_name = \"Printer\"\n",
        )
        .unwrap();
        Target {
            interface_package: None,
            interface_name: Some("NotAPrinter".into()),
        }
        .apply(&mut config);

        let rule = config.rule(foreign_impl_dispatch::NAME).unwrap();
        assert_eq!(
            rule.get_option::<String>("interface_package").as_deref(),
            Some("fakefmt")
        );
        assert_eq!(
            rule.get_option::<String>("interface_name").as_deref(),
            Some("NotAPrinter")
        );
    }

    #[test]
    fn target_creates_missing_section() {
        let mut config = Config::default();
        Target {
            interface_package: Some("fakefmt".into()),
            interface_name: Some("Printer".into()),
        }
        .apply(&mut config);

        assert_eq!(configured_rules(&config).unwrap().len(), 1);
    }
}

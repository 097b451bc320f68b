//! Built-in rule catalogue and construction from configuration.

use crate::foreign_impl_dispatch::{self, ForeignImplDispatch, SettingsError};
use seam_lint_core::{Config, RuleBox};

/// Static description of a built-in rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleInfo {
    /// Rule code.
    pub code: &'static str,
    /// Rule name.
    pub name: &'static str,
    /// One-line description.
    pub description: &'static str,
    /// Rule-specific options.
    pub options: &'static [&'static str],
}

/// Every built-in rule.
pub const RULES: &[RuleInfo] = &[RuleInfo {
    code: foreign_impl_dispatch::CODE,
    name: foreign_impl_dispatch::NAME,
    description: "Flags interface calls whose concrete receiver is declared in another package",
    options: foreign_impl_dispatch::OPTIONS,
}];

/// Builds every enabled rule from its configuration section.
///
/// # Errors
///
/// Returns an error if an enabled rule's options are missing or malformed.
pub fn configured_rules(config: &Config) -> Result<Vec<RuleBox>, SettingsError> {
    let mut rules: Vec<RuleBox> = Vec::new();

    if config.is_rule_enabled(foreign_impl_dispatch::NAME) {
        let section = config
            .rule(foreign_impl_dispatch::NAME)
            .cloned()
            .unwrap_or_default();
        rules.push(Box::new(ForeignImplDispatch::from_config(&section)?));
    }

    Ok(rules)
}

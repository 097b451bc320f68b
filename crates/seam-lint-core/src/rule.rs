//! Rule traits for defining lint rules.

use crate::context::{ProgramContext, UnitContext};
use crate::types::{Severity, Violation};

/// Error raised by [`Rule::prepare`]. Aborts the whole run.
#[derive(Debug, thiserror::Error)]
#[error("rule {rule} cannot run: {source}")]
pub struct RuleError {
    /// Name of the failing rule.
    pub rule: String,
    /// What went wrong.
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync>,
}

impl RuleError {
    /// Creates a new rule error.
    #[must_use]
    pub fn new(
        rule: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            rule: rule.into(),
            source: source.into(),
        }
    }
}

/// A lint rule over SSA compilation units.
///
/// Rules run in two phases. [`Rule::prepare`] sees every loaded unit once and
/// builds whatever immutable state the rule needs for the run; the returned
/// [`UnitCheck`] is then applied to each unit, possibly from several threads.
///
/// # Example
///
/// ```ignore
/// use seam_lint_core::{ProgramContext, Rule, RuleError, UnitCheck, UnitContext, Violation};
///
/// pub struct NoGlobals;
///
/// impl Rule for NoGlobals {
///     fn name(&self) -> &'static str { "no-globals" }
///     fn code(&self) -> &'static str { "SL100" }
///
///     fn prepare(&self, _ctx: &ProgramContext) -> Result<Box<dyn UnitCheck>, RuleError> {
///         Ok(Box::new(GlobalCheck))
///     }
/// }
/// ```
pub trait Rule: Send + Sync {
    /// Returns the kebab-case name of this rule (e.g., "foreign-impl-dispatch").
    fn name(&self) -> &'static str;

    /// Returns the rule code (e.g., "SL001").
    fn code(&self) -> &'static str;

    /// Returns a brief description of what this rule checks.
    fn description(&self) -> &'static str {
        ""
    }

    /// Returns the default severity for violations from this rule.
    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    /// Builds the per-run checker.
    ///
    /// # Errors
    ///
    /// Returns an error when the rule cannot run against this program at all.
    fn prepare(&self, ctx: &ProgramContext) -> Result<Box<dyn UnitCheck>, RuleError>;
}

/// Per-run state of a prepared rule.
pub trait UnitCheck: Send + Sync {
    /// Checks a single unit and returns any violations found.
    fn check(&self, ctx: &UnitContext) -> Vec<Violation>;
}

/// Type alias for boxed Rule trait objects.
pub type RuleBox = Box<dyn Rule>;

//! # seam-lint-core
//!
//! Core framework for linting programs in SSA form.
//!
//! This crate provides the foundational types for building whole-program
//! lint rules over serialized compilation units. It includes:
//!
//! - [`program`], the SSA program model produced by a language front-end
//! - [`Rule`] and [`UnitCheck`] traits for two-phase rules
//! - [`Analyzer`] for orchestrating lint execution
//! - [`Violation`] for representing lint findings
//!
//! ## Example
//!
//! ```ignore
//! use seam_lint_core::Analyzer;
//!
//! let analyzer = Analyzer::builder()
//!     .root("./ssa")
//!     .rule(MyRule::new())
//!     .build()?;
//!
//! let result = analyzer.analyze()?;
//! for v in &result.violations {
//!     println!("{v}");
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod analyzer;
mod config;
mod context;
mod rule;
mod types;

/// SSA program model.
pub mod program;

pub use analyzer::{Analyzer, AnalyzerBuilder, AnalyzerError, UNIT_FILE_SUFFIX};
pub use config::{AnalyzerConfig, Config, ConfigError, RuleConfig};
pub use context::{ProgramContext, UnitContext};
pub use rule::{Rule, RuleBox, RuleError, UnitCheck};
pub use types::{
    Label, LintResult, Location, Severity, Suggestion, Violation, ViolationDiagnostic,
};

//! # seam-lint-rules
//!
//! Built-in lint rules for seam-lint.
//!
//! ## Available Rules
//!
//! | Code | Name | Description |
//! |------|------|-------------|
//! | SL001 | `foreign-impl-dispatch` | Flags interface calls whose concrete receiver is declared in another package |
//!
//! ## Usage
//!
//! ```ignore
//! use seam_lint_core::Analyzer;
//! use seam_lint_rules::ForeignImplDispatch;
//!
//! let analyzer = Analyzer::builder()
//!     .root("./ssa")
//!     .rule(ForeignImplDispatch::new("fakefmt", "Printer"))
//!     .build()?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod foreign_impl_dispatch;
mod registry;

pub use foreign_impl_dispatch::{
    ForeignImplDispatch, ForeignImplSettings, InterfaceSpec, LocateError, SettingsError,
};
pub use registry::{configured_rules, RuleInfo, RULES};

/// Re-export core types for convenience.
pub use seam_lint_core::{Rule, Severity, Violation};

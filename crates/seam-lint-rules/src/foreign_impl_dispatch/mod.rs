//! Rule to flag dispatch through an interface backed by a foreign type.
//!
//! # Rationale
//!
//! Some interfaces are seams meant to be implemented only next to their
//! declaration. When a value of a type from another package flows into such
//! an interface and is called through it, the contract has leaked.
//!
//! # Detected Patterns
//!
//! ```go
//! var p fakefmt.Printer = &library.FakefmtPrinter{}
//! p.Print("Hello, world!") // FakefmtPrinter is declared in library, not fakefmt
//! ```
//!
//! Receivers whose concrete type cannot be determined are skipped.
//!
//! # Configuration
//!
//! - `interface_package`: short name, path suffix, or import path of the declaring package
//! - `interface_name`: name of the interface

mod locator;
mod resolver;
mod scanner;

pub use locator::{locate, locate_in_unit, InterfaceSpec, LocateError, MethodSetIndex};
pub use resolver::{Origin, Resolver, MAX_PHI_DEPTH};
pub use scanner::{scan, CallSite};

use seam_lint_core::program::Function;
use seam_lint_core::{
    Label, ProgramContext, Rule, RuleConfig, RuleError, Severity, Suggestion, UnitCheck,
    UnitContext, Violation,
};
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Rule code for foreign-impl-dispatch.
pub const CODE: &str = "SL001";

/// Rule name for foreign-impl-dispatch.
pub const NAME: &str = "foreign-impl-dispatch";

/// Rule-specific option keys.
pub const OPTIONS: &[&str] = &["interface_package", "interface_name"];

/// Errors in the rule settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Settings could not be decoded.
    #[error("invalid foreign-impl-dispatch settings: {0}")]
    Decode(String),

    /// A required option is empty.
    #[error("foreign-impl-dispatch requires a non-empty `{0}`")]
    Empty(&'static str),
}

/// Settings of the rule.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ForeignImplSettings {
    /// Package identifier: short name, path suffix, or full import path.
    pub interface_package: String,
    /// Interface name.
    pub interface_name: String,
}

impl ForeignImplSettings {
    /// Creates settings for `interface_package.interface_name`.
    #[must_use]
    pub fn new(interface_package: impl Into<String>, interface_name: impl Into<String>) -> Self {
        Self {
            interface_package: interface_package.into(),
            interface_name: interface_name.into(),
        }
    }

    /// Decodes settings handed over by an embedding host.
    ///
    /// # Errors
    ///
    /// Returns an error if a key is missing, has the wrong type, or is empty.
    pub fn decode(value: serde_json::Value) -> Result<Self, SettingsError> {
        let settings: Self =
            serde_json::from_value(value).map_err(|e| SettingsError::Decode(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reads settings from a `[rules.foreign-impl-dispatch]` section.
    ///
    /// Unknown keys are logged and ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if a key is missing, has the wrong type, or is empty.
    pub fn from_rule_config(config: &RuleConfig) -> Result<Self, SettingsError> {
        for key in config.option_keys() {
            if !OPTIONS.contains(&key) {
                warn!("Ignoring unknown option `{}` for rule {}", key, NAME);
            }
        }
        let settings: Self = config
            .decode_options()
            .map_err(|e| SettingsError::Decode(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks that both options are set.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Empty`] naming the first empty option.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.interface_package.is_empty() {
            return Err(SettingsError::Empty("interface_package"));
        }
        if self.interface_name.is_empty() {
            return Err(SettingsError::Empty("interface_name"));
        }
        Ok(())
    }
}

/// Flags interface dispatch whose concrete receiver type lives outside the interface's package.
#[derive(Debug, Clone)]
pub struct ForeignImplDispatch {
    settings: ForeignImplSettings,
    severity: Severity,
}

impl ForeignImplDispatch {
    /// Creates the rule for `interface_package.interface_name`.
    #[must_use]
    pub fn new(interface_package: impl Into<String>, interface_name: impl Into<String>) -> Self {
        Self::with_settings(ForeignImplSettings::new(interface_package, interface_name))
    }

    /// Creates the rule from decoded settings.
    #[must_use]
    pub fn with_settings(settings: ForeignImplSettings) -> Self {
        Self {
            settings,
            severity: Severity::Warning,
        }
    }

    /// Creates the rule from its configuration section.
    ///
    /// # Errors
    ///
    /// Returns an error if the options are missing or malformed.
    pub fn from_config(config: &RuleConfig) -> Result<Self, SettingsError> {
        ForeignImplSettings::from_rule_config(config).map(Self::with_settings)
    }

    /// Sets the severity level.
    #[must_use]
    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Returns the settings.
    #[must_use]
    pub fn settings(&self) -> &ForeignImplSettings {
        &self.settings
    }
}

impl Rule for ForeignImplDispatch {
    fn name(&self) -> &'static str {
        NAME
    }

    fn code(&self) -> &'static str {
        CODE
    }

    fn description(&self) -> &'static str {
        "Flags interface calls whose concrete receiver is declared in another package"
    }

    fn default_severity(&self) -> Severity {
        self.severity
    }

    fn prepare(&self, ctx: &ProgramContext) -> Result<Box<dyn UnitCheck>, RuleError> {
        self.settings
            .validate()
            .map_err(|e| RuleError::new(NAME, e))?;
        let package = &self.settings.interface_package;
        let interface = &self.settings.interface_name;

        let fallback =
            locate(ctx.units, package, interface).map_err(|e| RuleError::new(NAME, e))?;
        let mut per_unit = HashMap::new();
        for unit in ctx.units {
            if let Some(spec) = locate_in_unit(unit, package, interface) {
                per_unit.entry(unit.path.clone()).or_insert(spec);
            }
        }

        info!(
            "Checking dispatch of {}.{} ({} methods, located in {} of {} units)",
            fallback.package_path,
            fallback.name,
            fallback.index.len(),
            per_unit.len(),
            ctx.units.len()
        );

        Ok(Box::new(InterfaceCheck {
            per_unit,
            fallback,
            severity: self.severity,
        }))
    }
}

/// The prepared rule: the interface as each unit sees it.
#[derive(Debug)]
struct InterfaceCheck {
    /// Keyed by unit import path.
    per_unit: HashMap<String, InterfaceSpec>,
    /// Used by units that neither import nor declare the interface.
    fallback: InterfaceSpec,
    severity: Severity,
}

impl UnitCheck for InterfaceCheck {
    fn check(&self, ctx: &UnitContext) -> Vec<Violation> {
        let spec = self.per_unit.get(&ctx.unit.path).unwrap_or(&self.fallback);
        ctx.unit
            .functions
            .iter()
            .flat_map(|function| self.check_function(ctx, spec, function))
            .collect()
    }
}

impl InterfaceCheck {
    fn check_function(
        &self,
        ctx: &UnitContext,
        spec: &InterfaceSpec,
        function: &Function,
    ) -> Vec<Violation> {
        let types = &ctx.unit.types;
        let mut resolver = Resolver::new(function, types, &spec.methods);
        let mut violations = Vec::new();

        for site in scan(function, &spec.index) {
            let Origin::Concrete { ty, site: origin } = resolver.resolve(site.receiver) else {
                debug!("{}: receiver of {} unresolved", function.name, site.method);
                continue;
            };
            let Some(named) = types.deref_named(ty) else {
                debug!("{}: {} has no declared name", function.name, types.display(ty));
                continue;
            };
            let Some(package) = named.package else {
                continue;
            };
            if package == spec.package_path {
                continue;
            }

            let location = site
                .pos
                .or(function.pos.as_ref())
                .map_or_else(|| ctx.unit_location(), |pos| ctx.location(pos));
            let mut violation = Violation::new(
                CODE,
                NAME,
                self.severity,
                location,
                format!(
                    "call to a provided interface found (method {:?} on type {} from pkg {:?})",
                    site.method, named.name, package
                ),
            )
            .with_suggestion(Suggestion::new(format!(
                "implement {} inside {:?} or call {} directly",
                spec.name, spec.package_path, named.name
            )));
            if let Some(pos) = function.value(origin).and_then(|v| v.pos.as_ref()) {
                violation = violation.with_label(Label::new(
                    ctx.location(pos),
                    format!("{} from {:?} originates here", named.name, package),
                ));
            }
            violations.push(violation);
        }

        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seam_lint_core::program::{FunctionBuilder, Method, ObjectKind, TypeId, Unit, UnitBuilder};
    use std::path::{Path, PathBuf};

    const FAKEFMT: &str = "example.com/fakefmt";
    const LIBRARY: &str = "example.com/library";

    /// Types shared by the scenarios: `fakefmt.{Printer,NotAPrinter}` and `library.FakefmtPrinter`.
    struct World {
        ub: UnitBuilder,
        string: TypeId,
        printer: TypeId,
        not_a_printer: TypeId,
        impl_ptr: TypeId,
    }

    fn world(path: &str) -> World {
        let mut ub = UnitBuilder::new(path, "app");
        let string = ub.basic("string");
        let print = ub.interface(&[("Print", "func(string)")]);
        let printer = ub.named(FAKEFMT, "Printer", print, Vec::new());
        let not_print = ub.interface(&[("NotAPrint", "func(string)")]);
        let not_a_printer = ub.named(FAKEFMT, "NotAPrinter", not_print, Vec::new());
        let body = ub.structure(&[]);
        let impl_named = ub.named(
            LIBRARY,
            "FakefmtPrinter",
            body,
            vec![
                Method::new("Print", "func(string)").on_pointer(),
                Method::new("NotAPrint", "func(string)").on_pointer(),
            ],
        );
        let impl_ptr = ub.pointer(impl_named);

        let fakefmt = ub.import(FAKEFMT, "fakefmt");
        ub.export(fakefmt, "Printer", ObjectKind::TypeName, printer);
        ub.export(fakefmt, "NotAPrinter", ObjectKind::TypeName, not_a_printer);
        ub.import(LIBRARY, "library");

        World {
            ub,
            string,
            printer,
            not_a_printer,
            impl_ptr,
        }
    }

    /// `var p <iface> = &library.FakefmtPrinter{}; p.<method>("Hello, world!")`
    fn dispatch(w: &World, name: &str, iface: TypeId, method: &str) -> Function {
        let mut fb = FunctionBuilder::new(name, "testdata/a.go");
        let msg = fb.constant("\"Hello, world!\"", w.string);
        fb.at(9, 26);
        let obj = fb.alloc(w.impl_ptr);
        fb.at(9, 6);
        let p = fb.make_interface(iface, obj);
        fb.at(10, 9);
        fb.invoke(None, p, method, &[msg]);
        fb.ret(&[]);
        fb.finish()
    }

    fn run(rule: &ForeignImplDispatch, units: &[Unit]) -> Result<Vec<Violation>, RuleError> {
        let root = Path::new(".");
        let check = rule.prepare(&ProgramContext::new(root, units))?;
        Ok(units
            .iter()
            .flat_map(|unit| check.check(&UnitContext::new(unit, root)))
            .collect())
    }

    #[test]
    fn foreign_implementation_is_reported() {
        let mut w = world("example.com/testdata");
        let a = dispatch(&w, "testdata.a", w.printer, "Print");
        w.ub.function(a);
        let unit = w.ub.build().unwrap();

        let violations = run(&ForeignImplDispatch::new("fakefmt", "Printer"), &[unit]).unwrap();
        assert_eq!(violations.len(), 1);
        let v = &violations[0];
        assert_eq!(v.code, CODE);
        assert_eq!(v.severity, Severity::Warning);
        assert_eq!(
            v.message,
            r#"call to a provided interface found (method "Print" on type FakefmtPrinter from pkg "example.com/library")"#
        );
        assert_eq!(v.location.file, PathBuf::from("testdata/a.go"));
        assert_eq!((v.location.line, v.location.column), (10, 9));
        assert_eq!(v.labels.len(), 1);
        assert_eq!(v.labels[0].location.column, 26);
    }

    #[test]
    fn method_outside_interface_is_ignored() {
        let mut w = world("example.com/testdata");
        let b = dispatch(&w, "testdata.b", w.not_a_printer, "NotAPrint");
        w.ub.function(b);
        let unit = w.ub.build().unwrap();

        let violations = run(&ForeignImplDispatch::new("fakefmt", "Printer"), &[unit]).unwrap();
        assert!(violations.is_empty());
    }

    #[test]
    fn same_package_implementation_is_allowed() {
        let mut ub = UnitBuilder::new(FAKEFMT, "fakefmt");
        let string = ub.basic("string");
        let print = ub.interface(&[("Print", "func(string)")]);
        let printer = ub.named(FAKEFMT, "Printer", print, Vec::new());
        ub.declare("Printer", ObjectKind::TypeName, printer);
        let body = ub.structure(&[]);
        let local = ub.named(
            FAKEFMT,
            "stdout",
            body,
            vec![Method::new("Print", "func(string)")],
        );

        let mut fb = FunctionBuilder::new("fakefmt.Hello", "fakefmt/hello.go");
        let msg = fb.constant("\"hi\"", string);
        let value = fb.param("s", local);
        let p = fb.make_interface(printer, value);
        fb.at(4, 2);
        fb.invoke(None, p, "Print", &[msg]);
        ub.function(fb.finish());
        let unit = ub.build().unwrap();

        let violations = run(&ForeignImplDispatch::new("fakefmt", "Printer"), &[unit]).unwrap();
        assert!(violations.is_empty());
    }

    /// Unit `path` importing `{fmt_path}` as `fakefmt` and printing through
    /// `fakefmt.Printer` on `fakefmt.Std`.
    fn unit_using_own_fakefmt(path: &str, fmt_path: &str) -> Unit {
        let mut ub = UnitBuilder::new(path, "app");
        let string = ub.basic("string");
        let print = ub.interface(&[("Print", "func(string)")]);
        let printer = ub.named(fmt_path, "Printer", print, Vec::new());
        let body = ub.structure(&[]);
        let std_impl = ub.named(
            fmt_path,
            "Std",
            body,
            vec![Method::new("Print", "func(string)")],
        );
        let fakefmt = ub.import(fmt_path, "fakefmt");
        ub.export(fakefmt, "Printer", ObjectKind::TypeName, printer);

        let mut fb = FunctionBuilder::new("app.main", "app/main.go");
        let msg = fb.constant("\"hi\"", string);
        let value = fb.param("s", std_impl);
        let p = fb.make_interface(printer, value);
        fb.at(6, 2);
        fb.invoke(None, p, "Print", &[msg]);
        ub.function(fb.finish());
        ub.build().unwrap()
    }

    #[test]
    fn each_unit_uses_its_own_import() {
        let units = [
            unit_using_own_fakefmt("example.com/a", "github.com/a/fakefmt"),
            unit_using_own_fakefmt("example.com/b", "github.com/b/fakefmt"),
        ];

        let violations = run(&ForeignImplDispatch::new("fakefmt", "Printer"), &units).unwrap();
        assert!(violations.is_empty(), "{violations:?}");
    }

    #[test]
    fn unit_without_match_falls_back_to_run_level_interface() {
        let mut w = world("example.com/library");
        let a = dispatch(&w, "library.use", w.printer, "Print");
        w.ub.function(a);
        let declaring = w.ub.build().unwrap();

        let mut plain = UnitBuilder::new("example.com/plain", "plain");
        let string = plain.basic("string");
        let print = plain.interface(&[("Print", "func(string)")]);
        let printer = plain.named(FAKEFMT, "Printer", print, Vec::new());
        let body = plain.structure(&[]);
        let foreign = plain.named(
            LIBRARY,
            "Loud",
            body,
            vec![Method::new("Print", "func(string)")],
        );
        let mut fb = FunctionBuilder::new("plain.run", "plain/run.go");
        let msg = fb.constant("\"x\"", string);
        let value = fb.param("l", foreign);
        let p = fb.make_interface(printer, value);
        fb.at(4, 2);
        fb.invoke(None, p, "Print", &[msg]);
        plain.function(fb.finish());
        let plain = plain.build().unwrap();

        let violations =
            run(&ForeignImplDispatch::new("fakefmt", "Printer"), &[declaring, plain]).unwrap();
        let files: Vec<_> = violations.iter().map(|v| v.location.file.clone()).collect();
        assert_eq!(
            files,
            vec![PathBuf::from("testdata/a.go"), PathBuf::from("plain/run.go")]
        );
    }

    #[test]
    fn unrelated_interface_with_same_method_name_matches() {
        let mut w = world("example.com/testdata");
        let sink = w.ub.interface(&[("Print", "func(string)")]);
        let logger = w.ub.named("example.com/logging", "Sink", sink, Vec::new());
        let a = dispatch(&w, "testdata.log", logger, "Print");
        w.ub.function(a);
        let unit = w.ub.build().unwrap();

        let violations = run(&ForeignImplDispatch::new("fakefmt", "Printer"), &[unit]).unwrap();
        assert_eq!(violations.len(), 1);
    }

    #[test]
    fn unresolved_receiver_is_skipped() {
        let mut w = world("example.com/testdata");
        let mut fb = FunctionBuilder::new("testdata.use", "testdata/use.go");
        let p = fb.param("p", w.printer);
        fb.at(3, 2);
        fb.invoke(None, p, "Print", &[]);
        w.ub.function(fb.finish());
        let unit = w.ub.build().unwrap();

        let violations = run(&ForeignImplDispatch::new("fakefmt", "Printer"), &[unit]).unwrap();
        assert!(violations.is_empty());
    }

    #[test]
    fn origin_without_package_is_skipped() {
        let mut w = world("example.com/testdata");
        let basic = w.ub.basic("int");
        let mut fb = FunctionBuilder::new("testdata.num", "testdata/num.go");
        let n = fb.param("n", basic);
        let p = fb.make_interface(w.printer, n);
        fb.invoke(None, p, "Print", &[]);
        w.ub.function(fb.finish());
        let unit = w.ub.build().unwrap();

        let violations = run(&ForeignImplDispatch::new("fakefmt", "Printer"), &[unit]).unwrap();
        assert!(violations.is_empty());
    }

    #[test]
    fn missing_interface_fails_prepare() {
        let w = world("example.com/testdata");
        let unit = w.ub.build().unwrap();

        let Err(err) = run(&ForeignImplDispatch::new("fakefmt", "Scanner"), &[unit]) else {
            panic!("expected a prepare failure");
        };
        assert_eq!(err.rule, NAME);
        assert!(err.to_string().contains("could not find interface Scanner"));
    }

    #[test]
    fn empty_settings_fail_prepare() {
        let Err(err) = run(&ForeignImplDispatch::new("", "Printer"), &[]) else {
            panic!("expected a prepare failure");
        };
        assert!(err.to_string().contains("interface_package"));
    }

    #[test]
    fn repeated_runs_are_identical() {
        let mut w = world("example.com/testdata");
        for name in ["testdata.a", "testdata.a2"] {
            let f = dispatch(&w, name, w.printer, "Print");
            w.ub.function(f);
        }
        let unit = w.ub.build().unwrap();
        let rule = ForeignImplDispatch::new("fakefmt", "Printer");

        let first = run(&rule, std::slice::from_ref(&unit)).unwrap();
        let second = run(&rule, std::slice::from_ref(&unit)).unwrap();
        assert_eq!(first.len(), 2);
        let render = |vs: &[Violation]| vs.iter().map(ToString::to_string).collect::<Vec<_>>();
        assert_eq!(render(&first), render(&second));
    }

    #[test]
    fn settings_decode_from_json() {
        let settings = ForeignImplSettings::decode(serde_json::json!({
            "interface_package": "fakefmt",
            "interface_name": "Printer",
        }))
        .unwrap();
        assert_eq!(settings, ForeignImplSettings::new("fakefmt", "Printer"));

        let missing = ForeignImplSettings::decode(serde_json::json!({"interface_name": "Printer"}));
        assert!(matches!(missing, Err(SettingsError::Decode(_))));

        let empty = ForeignImplSettings::decode(serde_json::json!({
            "interface_package": "fakefmt",
            "interface_name": "",
        }));
        assert!(matches!(empty, Err(SettingsError::Empty("interface_name"))));
    }

    #[test]
    fn settings_from_rule_config() {
        let config = seam_lint_core::Config::parse(
            "[rules.foreign-impl-dispatch]\ninterface_package = \"fakefmt\"\ninterface_name = \"Printer\"\nstrict = true\n",
        )
        .unwrap();
        let rule = ForeignImplDispatch::from_config(config.rule(NAME).unwrap()).unwrap();
        assert_eq!(rule.settings().interface_name, "Printer");
        assert_eq!(rule.default_severity(), Severity::Warning);
    }
}

//! Core analyzer for orchestrating lint execution.

use crate::config::Config;
use crate::context::{ProgramContext, UnitContext};
use crate::program::{LoadError, Unit};
use crate::rule::{Rule, RuleBox, RuleError, UnitCheck};
use crate::types::{LintResult, Violation};

use rayon::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// File suffix of serialized units.
pub const UNIT_FILE_SUFFIX: &str = ".unit.json";

/// Errors that can occur during analysis.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// IO error reading files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A unit file could not be loaded.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Glob pattern error.
    #[error("Invalid glob pattern: {0}")]
    Glob(#[from] glob::PatternError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// A rule could not be prepared; no unit was checked.
    #[error(transparent)]
    Rule(#[from] RuleError),

    /// The worker pool could not be created.
    #[error("Failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Builder for configuring an [`Analyzer`].
#[derive(Default)]
pub struct AnalyzerBuilder {
    root: Option<PathBuf>,
    rules: Vec<RuleBox>,
    exclude_patterns: Vec<String>,
    config: Option<Config>,
    fail_on_parse_error: Option<bool>,
    parallelism: Option<usize>,
}

impl AnalyzerBuilder {
    /// Creates a new builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the root directory searched for unit files.
    #[must_use]
    pub fn root(mut self, path: impl Into<PathBuf>) -> Self {
        self.root = Some(path.into());
        self
    }

    /// Adds a rule to the analyzer.
    #[must_use]
    pub fn rule<R: Rule + 'static>(mut self, rule: R) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Adds a boxed rule to the analyzer.
    #[must_use]
    pub fn rule_box(mut self, rule: RuleBox) -> Self {
        self.rules.push(rule);
        self
    }

    /// Adds an exclude glob pattern.
    #[must_use]
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude_patterns.push(pattern.into());
        self
    }

    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets whether to fail on unit files that cannot be loaded (default: from config, else false).
    #[must_use]
    pub fn fail_on_parse_error(mut self, fail: bool) -> Self {
        self.fail_on_parse_error = Some(fail);
        self
    }

    /// Limits the number of units checked concurrently.
    #[must_use]
    pub fn parallelism(mut self, workers: usize) -> Self {
        self.parallelism = Some(workers);
        self
    }

    /// Builds the analyzer.
    ///
    /// # Errors
    ///
    /// Returns an error if the current directory cannot be determined.
    pub fn build(self) -> Result<Analyzer, AnalyzerError> {
        let config = self.config.unwrap_or_default();
        let root = self.root.unwrap_or_else(|| config.analyzer.root.clone());

        let root = if root.is_absolute() {
            root
        } else {
            std::env::current_dir()?.join(&root)
        };

        // Merge exclude patterns from config
        let mut exclude_patterns = self.exclude_patterns;
        exclude_patterns.extend(config.analyzer.exclude.clone());

        Ok(Analyzer {
            root,
            rules: self.rules,
            exclude_patterns,
            fail_on_parse_error: self
                .fail_on_parse_error
                .unwrap_or(config.analyzer.fail_on_parse_error),
            parallelism: self.parallelism.or(config.analyzer.parallelism),
            config,
        })
    }
}

/// The main analyzer that orchestrates lint execution.
///
/// Use [`Analyzer::builder()`] to construct an instance.
pub struct Analyzer {
    root: PathBuf,
    rules: Vec<RuleBox>,
    exclude_patterns: Vec<String>,
    config: Config,
    fail_on_parse_error: bool,
    parallelism: Option<usize>,
}

impl Analyzer {
    /// Creates a new builder for configuring an analyzer.
    #[must_use]
    pub fn builder() -> AnalyzerBuilder {
        AnalyzerBuilder::new()
    }

    /// Returns the root directory being analyzed.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the number of registered rules.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Loads every unit file under the root and analyzes them.
    ///
    /// # Errors
    ///
    /// Returns an error if file discovery fails, a unit fails to load while
    /// `fail_on_parse_error` is set, or a rule cannot be prepared.
    pub fn analyze(&self) -> Result<LintResult, AnalyzerError> {
        info!("Starting analysis at {:?}", self.root);

        let files = self.discover_files()?;
        info!("Found {} unit files to analyze", files.len());

        let mut units = Vec::with_capacity(files.len());
        for path in &files {
            match Unit::from_file(path) {
                Ok(unit) => units.push(unit),
                Err(e @ (LoadError::Parse { .. } | LoadError::Dangling { .. })) => {
                    warn!("Failed to load {}: {}", path.display(), e);
                    if self.fail_on_parse_error {
                        return Err(e.into());
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }

        self.analyze_units(&units)
    }

    /// Analyzes already loaded units.
    ///
    /// Every enabled rule is prepared against the whole program first; a
    /// preparation failure aborts the run before any unit is checked.
    ///
    /// # Errors
    ///
    /// Returns an error if a rule cannot be prepared or the worker pool fails to start.
    pub fn analyze_units(&self, units: &[Unit]) -> Result<LintResult, AnalyzerError> {
        let program = ProgramContext::new(&self.root, units);

        let mut checks: Vec<(&dyn Rule, Box<dyn UnitCheck>)> = Vec::new();
        for rule in &self.rules {
            if !self.config.is_rule_enabled(rule.name()) {
                debug!("Skipping disabled rule: {}", rule.name());
                continue;
            }
            checks.push((rule.as_ref(), rule.prepare(&program)?));
        }

        let run = || -> Vec<Violation> {
            units
                .par_iter()
                .flat_map_iter(|unit| self.check_unit(unit, &checks))
                .collect()
        };
        let violations = match self.parallelism {
            Some(workers) => rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .build()?
                .install(run),
            None => run(),
        };

        let mut result = LintResult::new();
        result.violations = violations;
        result.units_checked = units.len();
        result.sort();

        info!(
            "Analysis complete: {} violations in {} units",
            result.violations.len(),
            result.units_checked
        );

        Ok(result)
    }

    /// Runs every prepared check against a single unit.
    fn check_unit(&self, unit: &Unit, checks: &[(&dyn Rule, Box<dyn UnitCheck>)]) -> Vec<Violation> {
        debug!("Analyzing unit: {}", unit.path);

        let ctx = UnitContext::new(unit, &self.root);
        let mut violations = Vec::new();
        for (rule, check) in checks {
            let found = check.check(&ctx);
            violations.extend(self.apply_severity_override(rule.name(), found));
        }
        violations
    }

    /// Applies severity overrides from configuration.
    fn apply_severity_override(
        &self,
        rule_name: &str,
        mut violations: Vec<Violation>,
    ) -> Vec<Violation> {
        if let Some(severity) = self.config.rule_severity(rule_name) {
            for v in &mut violations {
                v.severity = severity;
            }
        }
        violations
    }

    /// Discovers all unit files to analyze, sorted by path.
    fn discover_files(&self) -> Result<Vec<PathBuf>, AnalyzerError> {
        let pattern = format!("{}/**/*{UNIT_FILE_SUFFIX}", self.root.display());
        let mut files = Vec::new();

        for entry in glob::glob(&pattern)? {
            let path = entry.map_err(|e| AnalyzerError::Io(e.into()))?;

            if self.should_exclude(&path) {
                debug!("Excluding: {}", path.display());
                continue;
            }

            files.push(path);
        }

        files.sort();
        Ok(files)
    }

    /// Checks if a path should be excluded.
    fn should_exclude(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();

        for pattern in &self.exclude_patterns {
            if let Ok(glob_pattern) = glob::Pattern::new(pattern) {
                if glob_pattern.matches(&path_str) {
                    return true;
                }
            }

            // Also check as substring for patterns like "**/vendor/**"
            let normalized_pattern = pattern.replace("**", "");
            if !normalized_pattern.is_empty() && path_str.contains(&normalized_pattern) {
                return true;
            }
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Location, Severity};
    use std::fs;
    use tempfile::TempDir;

    struct PerUnit;

    struct PerUnitCheck;

    impl Rule for PerUnit {
        fn name(&self) -> &'static str {
            "per-unit"
        }
        fn code(&self) -> &'static str {
            "T001"
        }
        fn prepare(&self, _ctx: &ProgramContext) -> Result<Box<dyn UnitCheck>, RuleError> {
            Ok(Box::new(PerUnitCheck))
        }
    }

    impl UnitCheck for PerUnitCheck {
        fn check(&self, ctx: &UnitContext) -> Vec<Violation> {
            vec![Violation::new(
                "T001",
                "per-unit",
                Severity::Warning,
                Location::new(PathBuf::from(&ctx.unit.path), 1, 1),
                "seen",
            )]
        }
    }

    struct NeverReady;

    impl Rule for NeverReady {
        fn name(&self) -> &'static str {
            "never-ready"
        }
        fn code(&self) -> &'static str {
            "T002"
        }
        fn prepare(&self, _ctx: &ProgramContext) -> Result<Box<dyn UnitCheck>, RuleError> {
            Err(RuleError::new("never-ready", "nothing to check against"))
        }
    }

    fn write_unit(dir: &Path, file: &str, path: &str) {
        let json = format!(r#"{{"path": "{path}", "name": "x"}}"#);
        fs::write(dir.join(file), json).unwrap();
    }

    #[test]
    fn test_exclude_patterns() {
        let analyzer = Analyzer::builder()
            .root(".")
            .exclude("**/vendor/**")
            .exclude("**/testdata/**")
            .build()
            .expect("Failed to build analyzer");

        assert!(analyzer.should_exclude(Path::new("/foo/vendor/a.unit.json")));
        assert!(analyzer.should_exclude(Path::new("/foo/testdata/b.unit.json")));
        assert!(!analyzer.should_exclude(Path::new("/foo/ssa/c.unit.json")));
    }

    #[test]
    fn test_analyze_discovers_unit_files() {
        let tmp = TempDir::new().unwrap();
        write_unit(tmp.path(), "b.unit.json", "example.com/b");
        write_unit(tmp.path(), "a.unit.json", "example.com/a");
        fs::write(tmp.path().join("notes.json"), "{}").unwrap();

        let result = Analyzer::builder()
            .root(tmp.path())
            .rule(PerUnit)
            .build()
            .unwrap()
            .analyze()
            .unwrap();

        assert_eq!(result.units_checked, 2);
        let files: Vec<_> = result.violations.iter().map(|v| v.location.file.clone()).collect();
        assert_eq!(
            files,
            vec![PathBuf::from("example.com/a"), PathBuf::from("example.com/b")]
        );
    }

    #[test]
    fn test_broken_unit_skipped_unless_strict() {
        let tmp = TempDir::new().unwrap();
        write_unit(tmp.path(), "ok.unit.json", "example.com/ok");
        fs::write(tmp.path().join("bad.unit.json"), "[").unwrap();

        let lenient = Analyzer::builder()
            .root(tmp.path())
            .rule(PerUnit)
            .build()
            .unwrap()
            .analyze()
            .unwrap();
        assert_eq!(lenient.units_checked, 1);

        let strict = Analyzer::builder()
            .root(tmp.path())
            .rule(PerUnit)
            .fail_on_parse_error(true)
            .build()
            .unwrap()
            .analyze();
        assert!(matches!(strict, Err(AnalyzerError::Load(_))));
    }

    #[test]
    fn test_prepare_failure_aborts_run() {
        let units = vec![Unit::new("example.com/a", "a")];
        let analyzer = Analyzer::builder()
            .rule(PerUnit)
            .rule(NeverReady)
            .build()
            .unwrap();

        let err = analyzer.analyze_units(&units).unwrap_err();
        assert!(matches!(err, AnalyzerError::Rule(_)));
        assert!(err.to_string().contains("nothing to check against"));
    }

    #[test]
    fn test_severity_override_and_disable() {
        let config = Config::parse(
            "[rules.per-unit]\nseverity = \"error\"\n\n[rules.never-ready]\nenabled = false\n",
        )
        .unwrap();
        let units = vec![Unit::new("example.com/a", "a")];
        let result = Analyzer::builder()
            .config(config)
            .rule(PerUnit)
            .rule(NeverReady)
            .parallelism(2)
            .build()
            .unwrap()
            .analyze_units(&units)
            .unwrap();

        assert_eq!(result.violations.len(), 1);
        assert_eq!(result.violations[0].severity, Severity::Error);
        assert!(result.has_errors());
    }
}

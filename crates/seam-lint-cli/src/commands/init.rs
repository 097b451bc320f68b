//! Init command implementation.

use anyhow::{bail, Result};
use std::path::Path;

const DEFAULT_CONFIG: &str = r#"# seam-lint configuration

# Severity that makes `seam-lint check` exit with status 1
# fail_on = "error"

[analyzer]
# Directory searched for *.unit.json files (default: current directory)
# root = "./ssa"

# Glob patterns to exclude from analysis
exclude = [
    "**/vendor/**",
]

# Number of units checked in parallel (default: one per core)
# parallelism = 4

# Abort instead of skipping unit files that fail to load
fail_on_parse_error = false

[rules.foreign-impl-dispatch]
enabled = true
# severity = "error"  # Override default severity
interface_package = "fakefmt"
interface_name = "Printer"
"#;

/// Runs the init command.
pub fn run(force: bool) -> Result<()> {
    write_default(Path::new("seam-lint.toml"), force)?;

    println!("Created seam-lint.toml");
    println!("\nNext steps:");
    println!("  1. Set interface_package and interface_name in seam-lint.toml");
    println!("  2. Run: seam-lint check <dir with *.unit.json>");

    Ok(())
}

fn write_default(config_path: &Path, force: bool) -> Result<()> {
    if config_path.exists() && !force {
        bail!(
            "Configuration file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    std::fs::write(config_path, DEFAULT_CONFIG)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use seam_lint_core::Config;
    use tempfile::TempDir;

    #[test]
    fn default_config_parses() {
        let config = Config::parse(DEFAULT_CONFIG).unwrap();
        assert!(config.is_rule_enabled("foreign-impl-dispatch"));
        assert_eq!(config.analyzer.exclude, vec!["**/vendor/**"]);
        assert_eq!(seam_lint_rules::configured_rules(&config).unwrap().len(), 1);
    }

    #[test]
    fn refuses_to_overwrite_without_force() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("seam-lint.toml");
        std::fs::write(&path, "# mine").unwrap();

        assert!(write_default(&path, false).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# mine");

        write_default(&path, true).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), DEFAULT_CONFIG);
    }
}

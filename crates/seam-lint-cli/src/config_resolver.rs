//! Configuration file lookup.
//!
//! Order:
//!
//! 1. `--config`
//! 2. `seam-lint.toml` or `.seam-lint.toml` in the unit directory or the nearest ancestor holding one
//! 3. `config.toml` in the global directory (`$SEAM_LINT_CONFIG_DIR`, else `~/.seam-lint/`)
//! 4. built-in defaults

use anyhow::{Context, Result};
use seam_lint_core::Config;
use std::path::{Path, PathBuf};

/// Project-level config file names, checked in order within each directory.
const PROJECT_CONFIG_NAMES: &[&str] = &["seam-lint.toml", ".seam-lint.toml"];

/// Config file name within the global config directory.
const GLOBAL_CONFIG_NAME: &str = "config.toml";

/// Where the configuration comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Given with `--config`; not checked for existence.
    Explicit(PathBuf),
    /// Found next to the units or above them.
    Project(PathBuf),
    /// Found in the global config directory.
    Global(PathBuf),
    /// Nothing found.
    Default,
}

impl ConfigSource {
    /// Returns the config file path, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Explicit(p) | Self::Project(p) | Self::Global(p) => Some(p),
            Self::Default => None,
        }
    }

    /// Loads the configuration, or the defaults when nothing was found.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(&self) -> Result<Config> {
        let Some(path) = self.path() else {
            tracing::debug!("No config file found, using defaults");
            return Ok(Config::default());
        };
        if matches!(self, Self::Global(_)) {
            tracing::info!("Using global config: {}", path.display());
        }
        Config::from_file(path).with_context(|| format!("Failed to load config: {}", path.display()))
    }
}

/// Resolves the configuration for units under `unit_dir`.
#[must_use]
pub fn resolve(unit_dir: &Path, explicit: Option<&Path>) -> ConfigSource {
    let start = match std::env::current_dir() {
        Ok(cwd) if unit_dir.is_relative() => cwd.join(unit_dir),
        _ => unit_dir.to_path_buf(),
    };
    resolve_from(&start, explicit, global_config_dir().as_deref())
}

fn resolve_from(start: &Path, explicit: Option<&Path>, global_dir: Option<&Path>) -> ConfigSource {
    if let Some(p) = explicit {
        return ConfigSource::Explicit(p.to_path_buf());
    }

    if let Some(found) = find_project_config(start) {
        tracing::debug!("Found project config: {}", found.display());
        return ConfigSource::Project(found);
    }

    global_dir
        .map(|dir| dir.join(GLOBAL_CONFIG_NAME))
        .filter(|candidate| candidate.is_file())
        .map_or(ConfigSource::Default, ConfigSource::Global)
}

/// Walks from `start` towards the filesystem root.
fn find_project_config(start: &Path) -> Option<PathBuf> {
    start.ancestors().find_map(|dir| {
        PROJECT_CONFIG_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|candidate| candidate.is_file())
    })
}

/// Global config directory: `$SEAM_LINT_CONFIG_DIR`, else `~/.seam-lint/`.
#[must_use]
pub fn global_config_dir() -> Option<PathBuf> {
    match std::env::var_os("SEAM_LINT_CONFIG_DIR") {
        Some(dir) => Some(PathBuf::from(dir)),
        None => home::home_dir().map(|h| h.join(".seam-lint")),
    }
}

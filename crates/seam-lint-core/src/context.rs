//! Context types for rule execution.

use std::path::{Path, PathBuf};

use crate::program::{Position, Unit};
use crate::types::Location;

/// Context provided to per-unit checks.
#[derive(Debug, Clone)]
pub struct UnitContext<'a> {
    /// The unit being checked.
    pub unit: &'a Unit,
    /// Root directory of the analysis; locations are reported relative to it.
    pub root: &'a Path,
}

impl<'a> UnitContext<'a> {
    /// Creates a new unit context.
    #[must_use]
    pub fn new(unit: &'a Unit, root: &'a Path) -> Self {
        Self { unit, root }
    }

    /// Converts a front-end position into a report location.
    ///
    /// Absolute paths under the analysis root are made relative to it.
    #[must_use]
    pub fn location(&self, pos: &Position) -> Location {
        let mut location = Location::from_position(pos);
        location.file = relative_to(&pos.file, self.root);
        location
    }

    /// Location used when a finding has no recorded position: the unit file itself.
    #[must_use]
    pub fn unit_location(&self) -> Location {
        let file = self
            .unit
            .source()
            .map_or_else(|| PathBuf::from(&self.unit.path), |p| relative_to(p, self.root));
        Location::new(file, 0, 0)
    }
}

fn relative_to(path: &Path, root: &Path) -> PathBuf {
    path.strip_prefix(root)
        .map_or_else(|_| path.to_path_buf(), Path::to_path_buf)
}

/// Context provided to rules before any unit is checked.
#[derive(Debug, Clone)]
pub struct ProgramContext<'a> {
    /// Root directory of the analysis.
    pub root: &'a Path,
    /// Every loaded unit, sorted by source path.
    pub units: &'a [Unit],
}

impl<'a> ProgramContext<'a> {
    /// Creates a new program context.
    #[must_use]
    pub fn new(root: &'a Path, units: &'a [Unit]) -> Self {
        Self { root, units }
    }
}

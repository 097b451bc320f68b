//! Finds the configured interface and indexes its method names.

use seam_lint_core::program::{Method, ObjectKind, Package, Scope, TypeTable, Unit};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::debug;

/// Errors raised while locating the configured interface.
#[derive(Debug, Error)]
pub enum LocateError {
    /// No scope declares the interface.
    #[error("could not find interface {interface} in {package:?}")]
    NotFound {
        /// Interface name that was searched for.
        interface: String,
        /// Package identifier that was searched for.
        package: String,
    },
}

/// Method names of the located interface.
///
/// Only names are indexed. A dispatch of an unrelated interface method that
/// happens to share a name is matched as well.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodSetIndex {
    names: BTreeSet<String>,
}

impl MethodSetIndex {
    /// Indexes the names of `methods`.
    #[must_use]
    pub fn from_methods(methods: &[Method]) -> Self {
        Self {
            names: methods.iter().map(|m| m.name.clone()).collect(),
        }
    }

    /// Returns true if `method` is declared by the interface.
    #[must_use]
    pub fn contains(&self, method: &str) -> bool {
        self.names.contains(method)
    }

    /// Number of indexed names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if the interface declares no methods.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Indexed names in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

/// The located interface, as seen from one unit. Shared read-only across workers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceSpec {
    /// Interface name.
    pub name: String,
    /// Import path of the declaring package.
    pub package_path: String,
    /// Full method set, used to test whether call arguments satisfy the interface.
    pub methods: Vec<Method>,
    /// Method names for call-site matching.
    pub index: MethodSetIndex,
}

impl InterfaceSpec {
    fn new(name: &str, package_path: &str, methods: &[Method]) -> Self {
        Self {
            name: name.to_string(),
            package_path: package_path.to_string(),
            methods: methods.to_vec(),
            index: MethodSetIndex::from_methods(methods),
        }
    }
}

/// Locates `interface` for a single unit: first in its imports, then in its own scope.
#[must_use]
pub fn locate_in_unit(unit: &Unit, package: &str, interface: &str) -> Option<InterfaceSpec> {
    locate_in_imports(unit, package, interface)
        .or_else(|| locate_in_own_scope(unit, interface))
}

/// Locates `interface` across every unit of a run.
///
/// Imports of all units are searched before any unit's own scope. The result
/// stands in for units where [`locate_in_unit`] finds nothing.
///
/// # Errors
///
/// Returns [`LocateError::NotFound`] if no scope declares the interface.
pub fn locate(units: &[Unit], package: &str, interface: &str) -> Result<InterfaceSpec, LocateError> {
    units
        .iter()
        .find_map(|unit| locate_in_imports(unit, package, interface))
        .or_else(|| {
            units
                .iter()
                .find_map(|unit| locate_in_own_scope(unit, interface))
        })
        .ok_or_else(|| LocateError::NotFound {
            interface: interface.to_string(),
            package: package.to_string(),
        })
}

fn locate_in_imports(unit: &Unit, package: &str, interface: &str) -> Option<InterfaceSpec> {
    unit.imports
        .iter()
        .filter(|import| import_matches(import, package))
        .find_map(|import| {
            let methods = lookup_interface(&import.scope, &unit.types, interface)?;
            debug!("Located {}.{} via import in {}", import.path, interface, unit.path);
            Some(InterfaceSpec::new(interface, &import.path, methods))
        })
}

fn locate_in_own_scope(unit: &Unit, interface: &str) -> Option<InterfaceSpec> {
    let methods = lookup_interface(&unit.scope, &unit.types, interface)?;
    debug!("Located {}.{} in its own unit", unit.path, interface);
    Some(InterfaceSpec::new(interface, &unit.path, methods))
}

/// Short name, `/`-suffix, or exact import path.
fn import_matches(import: &Package, package: &str) -> bool {
    import.name == package
        || import
            .path
            .strip_suffix(package)
            .is_some_and(|head| head.ends_with('/'))
        || import.path == package
}

fn lookup_interface<'t>(scope: &Scope, types: &'t TypeTable, name: &str) -> Option<&'t [Method]> {
    if !is_exported(name) {
        return None;
    }
    let object = scope.lookup(name)?;
    if object.kind != ObjectKind::TypeName {
        return None;
    }
    types.interface_methods(object.ty)
}

fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

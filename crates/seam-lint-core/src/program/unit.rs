//! Compilation units, packages and their declaration scopes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::function::Function;
use super::types::{TypeId, TypeTable};

/// A position in a source file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Source file path as reported by the front-end.
    pub file: PathBuf,
    /// Line number (1-indexed).
    pub line: usize,
    /// Column number (1-indexed).
    pub column: usize,
    /// Byte offset in the file, if known.
    #[serde(default)]
    pub offset: usize,
}

impl Position {
    /// Creates a position without a byte offset.
    #[must_use]
    pub fn new(file: impl Into<PathBuf>, line: usize, column: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
            offset: 0,
        }
    }
}

/// Kind of a package-level declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    /// `type X ...`
    TypeName,
    /// `var x ...`
    Var,
    /// `func f(...)`
    Func,
    /// `const c = ...`
    Const,
}

/// A package-level declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Object {
    /// Declaration kind.
    pub kind: ObjectKind,
    /// Declared type; for type names, the named type itself.
    pub ty: TypeId,
}

/// Package-level declarations by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scope(BTreeMap<String, Object>);

impl Scope {
    /// Creates an empty scope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a declaration.
    pub fn insert(&mut self, name: impl Into<String>, object: Object) {
        self.0.insert(name.into(), object);
    }

    /// Looks up a declaration.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&Object> {
        self.0.get(name)
    }

    /// Iterates over declarations in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Object)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// An imported package as seen from a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    /// Import path.
    pub path: String,
    /// Package name (the identifier used to qualify its members).
    pub name: String,
    /// Exported declarations.
    #[serde(default)]
    pub scope: Scope,
}

/// One compilation unit (package) in SSA form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Import path of the unit.
    pub path: String,
    /// Package name.
    pub name: String,
    /// Source files the unit was built from.
    #[serde(default)]
    pub files: Vec<PathBuf>,
    /// Every type referenced by the unit and its imports.
    #[serde(default)]
    pub types: TypeTable,
    /// Package-level declarations of the unit itself.
    #[serde(default)]
    pub scope: Scope,
    /// Directly imported packages, in declaration order.
    #[serde(default)]
    pub imports: Vec<Package>,
    /// Source functions.
    #[serde(default)]
    pub functions: Vec<Function>,
    /// File the unit was loaded from.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// Errors raised while loading a unit.
#[derive(Debug, Error)]
pub enum LoadError {
    /// IO error reading a unit file.
    #[error("Failed to read unit file {path}: {source}")]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// Malformed JSON.
    #[error("Failed to parse unit{}: {message}", in_file(.path))]
    Parse {
        /// File being parsed, if any.
        path: Option<PathBuf>,
        /// Parse error message.
        message: String,
    },

    /// A type or value id points outside its arena.
    #[error("Unit {unit} references undefined {what}")]
    Dangling {
        /// Unit import path.
        unit: String,
        /// Description of the dangling reference.
        what: String,
    },
}

fn in_file(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" {}", p.display()))
        .unwrap_or_default()
}

impl Unit {
    /// Creates an empty unit.
    #[must_use]
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            files: Vec::new(),
            types: TypeTable::new(),
            scope: Scope::new(),
            imports: Vec::new(),
            functions: Vec::new(),
            source: None,
        }
    }

    /// Parses and validates a unit from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or references undefined ids.
    pub fn from_json(content: &str) -> Result<Self, LoadError> {
        let unit: Self = serde_json::from_str(content).map_err(|e| LoadError::Parse {
            path: None,
            message: e.to_string(),
        })?;
        unit.validate()?;
        Ok(unit)
    }

    /// Loads a unit from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: &Path) -> Result<Self, LoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| LoadError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut unit = Self::from_json(&content).map_err(|e| match e {
            LoadError::Parse { message, .. } => LoadError::Parse {
                path: Some(path.to_path_buf()),
                message,
            },
            other => other,
        })?;
        unit.source = Some(path.to_path_buf());
        Ok(unit)
    }

    /// Checks that every type and value reference stays inside its arena.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Dangling`] for the first bad reference.
    pub fn validate(&self) -> Result<(), LoadError> {
        let dangling = |what: String| LoadError::Dangling {
            unit: self.path.clone(),
            what,
        };
        let check_type = |id: TypeId, at: &str| {
            if self.types.get(id).is_some() {
                Ok(())
            } else {
                Err(dangling(format!("type {id} ({at})")))
            }
        };

        for (id, ty) in self.types.iter() {
            for r in ty.references() {
                check_type(r, &format!("from {id}"))?;
            }
        }

        let scopes = std::iter::once((self.path.as_str(), &self.scope))
            .chain(self.imports.iter().map(|p| (p.path.as_str(), &p.scope)));
        for (pkg, scope) in scopes {
            for (name, obj) in scope.iter() {
                check_type(obj.ty, &format!("{pkg}.{name}"))?;
            }
        }

        for func in &self.functions {
            for (index, value) in func.values.iter().enumerate() {
                if let Some(ty) = value.ty {
                    check_type(ty, &format!("{} value {index}", func.name))?;
                }
                for operand in value.op.operands() {
                    if func.value(operand).is_none() {
                        return Err(dangling(format!(
                            "value {operand} (operand of {} value {index})",
                            func.name
                        )));
                    }
                }
            }
            for block in &func.blocks {
                for id in &block.instrs {
                    if func.value(*id).is_none() {
                        return Err(dangling(format!("value {id} (block of {})", func.name)));
                    }
                }
            }
        }

        Ok(())
    }

    /// Returns the source file the unit was loaded from, if any.
    #[must_use]
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

//! Program representation consumed by rules.
//!
//! An external front-end (for example a Go SSA dumper) produces one [`Unit`]
//! per compilation unit: its static types, package scopes, imports, and the
//! SSA instruction stream of every source function. Units are read-only once
//! loaded.

mod builder;
mod function;
mod types;
mod unit;

pub use builder::{FunctionBuilder, UnitBuilder};
pub use function::{Block, Call, Callee, Function, Op, UnOpKind, Value, ValueId};
pub use types::{Field, Method, NamedRef, Type, TypeId, TypeTable};
pub use unit::{LoadError, Object, ObjectKind, Package, Position, Scope, Unit};

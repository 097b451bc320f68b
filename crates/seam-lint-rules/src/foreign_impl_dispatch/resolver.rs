//! Backward tracing of an interface value to the concrete type behind it.
//!
//! Each value is reduced by the operation that produced it:
//!
//! | Operation | Reduction |
//! |---|---|
//! | `make_interface` | type of the boxed operand |
//! | `un_op`, `field`, `field_addr`, `convert`, `extract` | the operand |
//! | `call` | non-interface result type, else the first argument satisfying the interface, if concrete |
//! | `phi` | the first edge that resolves |
//! | `alloc` | the pointee type |
//! | anything else | the value's own type |
//!
//! Field accesses follow the base object rather than the field, so the origin
//! of `h.printer` is whatever produced `h`.

use seam_lint_core::program::{Call, Function, Method, Op, TypeId, TypeTable, ValueId};
use std::collections::HashSet;
use tracing::debug;

/// Deepest chain of nested `phi` edges followed before giving up.
pub const MAX_PHI_DEPTH: usize = 256;

/// Outcome of tracing one receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// A non-interface type.
    Concrete {
        /// The concrete type.
        ty: TypeId,
        /// Value that carried the type.
        site: ValueId,
    },
    /// No confident answer.
    Unresolved,
}

impl Origin {
    /// Returns true if tracing produced no answer.
    #[must_use]
    pub fn is_unresolved(self) -> bool {
        self == Self::Unresolved
    }
}

/// Traces values of one function against one interface.
///
/// Every [`Resolver::resolve`] call starts with a fresh visited set; a value
/// reached twice while tracing one receiver is [`Origin::Unresolved`].
#[derive(Debug)]
pub struct Resolver<'a> {
    function: &'a Function,
    types: &'a TypeTable,
    required: &'a [Method],
    visited: HashSet<ValueId>,
}

impl<'a> Resolver<'a> {
    /// Creates a resolver over `function` whose types live in `types`.
    #[must_use]
    pub fn new(function: &'a Function, types: &'a TypeTable, required: &'a [Method]) -> Self {
        Self {
            function,
            types,
            required,
            visited: HashSet::new(),
        }
    }

    /// Traces `value` back to its concrete origin.
    pub fn resolve(&mut self, value: ValueId) -> Origin {
        self.visited.clear();
        self.trace(value, 0)
    }

    /// Pass-through operands are followed in a loop; only `phi` edges recurse,
    /// at most [`MAX_PHI_DEPTH`] deep.
    fn trace(&mut self, mut id: ValueId, depth: usize) -> Origin {
        if depth > MAX_PHI_DEPTH {
            debug!("{}: phi nesting deeper than {}", self.function.name, MAX_PHI_DEPTH);
            return Origin::Unresolved;
        }
        let function = self.function;

        loop {
            if !self.visited.insert(id) {
                return Origin::Unresolved;
            }
            let Some(value) = function.value(id) else {
                return Origin::Unresolved;
            };

            id = match &value.op {
                Op::UnOp { x, .. }
                | Op::Field { x, .. }
                | Op::FieldAddr { x, .. }
                | Op::Convert { x } => *x,
                Op::Extract { tuple, .. } => *tuple,
                Op::MakeInterface { x } => {
                    let ty = function.value(*x).and_then(|operand| operand.ty);
                    return self.concrete(ty, *x);
                }
                Op::Call(call) => return self.call_result(id, value.ty, call),
                Op::Phi { edges } => {
                    return edges
                        .iter()
                        .map(|edge| self.trace(*edge, depth + 1))
                        .find(|origin| !origin.is_unresolved())
                        .unwrap_or(Origin::Unresolved);
                }
                Op::Alloc { .. } => {
                    let ty = value
                        .ty
                        .map(|ptr| self.types.pointer_elem(ptr).unwrap_or(ptr));
                    return self.concrete(ty, id);
                }
                Op::Store { .. }
                | Op::Return { .. }
                | Op::Parameter { .. }
                | Op::Global { .. }
                | Op::Const { .. }
                | Op::Function { .. }
                | Op::Opaque => return self.concrete(value.ty, id),
            };
        }
    }

    /// A call with an interface result is assumed to pass through the first
    /// argument satisfying the interface. That argument being an interface
    /// itself ends the trace.
    fn call_result(&self, id: ValueId, result: Option<TypeId>, call: &Call) -> Origin {
        match result {
            Some(ty) if !self.types.is_interface(ty) => self.concrete(Some(ty), id),
            Some(_) => call
                .args
                .iter()
                .find_map(|arg| {
                    let ty = self.function.value(*arg)?.ty?;
                    let satisfies = self.types.implements(ty, self.required)
                        || self.types.implements_by_pointer(ty, self.required);
                    satisfies.then_some((ty, *arg))
                })
                .map_or(Origin::Unresolved, |(ty, site)| self.concrete(Some(ty), site)),
            None => Origin::Unresolved,
        }
    }

    fn concrete(&self, ty: Option<TypeId>, site: ValueId) -> Origin {
        match ty {
            Some(ty) if !self.types.is_interface(ty) => Origin::Concrete { ty, site },
            _ => Origin::Unresolved,
        }
    }
}

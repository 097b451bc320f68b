//! SSA functions: a value arena plus basic blocks listing instructions in order.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::types::TypeId;
use super::unit::Position;

/// Index of a value inside a [`Function`]'s value arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueId(pub u32);

impl ValueId {
    /// Returns the arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Unary operator kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnOpKind {
    /// `*x`
    Deref,
    /// `&x`
    Addr,
    /// `<-ch`
    Recv,
    /// `-x`
    Neg,
    /// `!x`
    Not,
    /// `^x`
    Xor,
}

/// How a call selects its target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Callee {
    /// Dynamic dispatch of `method` through the interface value `receiver`.
    Invoke {
        /// Interface-typed receiver.
        receiver: ValueId,
        /// Name of the interface method invoked.
        method: String,
    },
    /// Call of a function value (static function, closure, or bound method).
    Direct {
        /// The function value.
        func: ValueId,
    },
}

/// Operands of a call instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    /// Call target.
    pub callee: Callee,
    /// Argument values, not including an invoke receiver.
    #[serde(default)]
    pub args: Vec<ValueId>,
}

impl Call {
    /// Returns true for calls made through an interface value.
    #[must_use]
    pub fn is_invoke(&self) -> bool {
        matches!(self.callee, Callee::Invoke { .. })
    }

    /// Receiver and method name of an invoke-mode call.
    #[must_use]
    pub fn invoked(&self) -> Option<(ValueId, &str)> {
        match &self.callee {
            Callee::Invoke { receiver, method } => Some((*receiver, method)),
            Callee::Direct { .. } => None,
        }
    }
}

/// The instruction or source that produced a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    /// Boxes concrete value `x` into an interface.
    MakeInterface {
        /// Concrete operand.
        x: ValueId,
    },
    /// Unary operation, including pointer dereference.
    UnOp {
        /// Operator.
        kind: UnOpKind,
        /// Operand.
        x: ValueId,
    },
    /// Reads field `field` of struct value `x`.
    Field {
        /// Struct value.
        x: ValueId,
        /// Field index.
        field: usize,
    },
    /// Address of field `field` of the struct pointed to by `x`.
    FieldAddr {
        /// Struct pointer.
        x: ValueId,
        /// Field index.
        field: usize,
    },
    /// Type conversion `T(x)`.
    Convert {
        /// Operand.
        x: ValueId,
    },
    /// Function or method call.
    Call(Call),
    /// Control-flow merge.
    Phi {
        /// Incoming values, one per predecessor block.
        edges: Vec<ValueId>,
    },
    /// Selects one result of a multi-value call.
    Extract {
        /// Tuple-typed producer.
        tuple: ValueId,
        /// Result index.
        index: usize,
    },
    /// Allocation of a fresh variable; its type is a pointer to the variable.
    Alloc {
        /// Whether the variable escapes to the heap.
        #[serde(default)]
        heap: bool,
    },
    /// Writes `val` through pointer `addr`.
    Store {
        /// Destination pointer.
        addr: ValueId,
        /// Stored value.
        val: ValueId,
    },
    /// Returns from the function.
    Return {
        /// Returned values.
        #[serde(default)]
        results: Vec<ValueId>,
    },
    /// Function parameter.
    Parameter {
        /// Parameter name.
        name: String,
    },
    /// Package-level variable.
    Global {
        /// Qualified variable name.
        name: String,
    },
    /// Constant.
    Const {
        /// Printed constant value.
        #[serde(default)]
        value: String,
    },
    /// Reference to a declared function.
    Function {
        /// Qualified function name.
        name: String,
    },
    /// Any instruction the front-end does not classify further.
    #[serde(other)]
    Opaque,
}

impl Op {
    /// Values read by this operation.
    #[must_use]
    pub fn operands(&self) -> Vec<ValueId> {
        match self {
            Self::MakeInterface { x }
            | Self::UnOp { x, .. }
            | Self::Field { x, .. }
            | Self::FieldAddr { x, .. }
            | Self::Convert { x } => vec![*x],
            Self::Call(call) => {
                let head = match &call.callee {
                    Callee::Invoke { receiver, .. } => *receiver,
                    Callee::Direct { func } => *func,
                };
                std::iter::once(head).chain(call.args.iter().copied()).collect()
            }
            Self::Phi { edges } => edges.clone(),
            Self::Extract { tuple, .. } => vec![*tuple],
            Self::Store { addr, val } => vec![*addr, *val],
            Self::Return { results } => results.clone(),
            Self::Alloc { .. }
            | Self::Parameter { .. }
            | Self::Global { .. }
            | Self::Const { .. }
            | Self::Function { .. }
            | Self::Opaque => Vec::new(),
        }
    }
}

/// An SSA value together with its static type and source position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Value {
    /// Static type; absent for instructions that produce no value.
    #[serde(default)]
    pub ty: Option<TypeId>,
    /// Source position, when the front-end recorded one.
    #[serde(default)]
    pub pos: Option<Position>,
    /// Producing operation.
    #[serde(flatten)]
    pub op: Op,
}

/// A basic block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Instructions in execution order.
    #[serde(default)]
    pub instrs: Vec<ValueId>,
}

/// A function in SSA form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    /// Qualified function name.
    pub name: String,
    /// Declaration position.
    #[serde(default)]
    pub pos: Option<Position>,
    /// Every value defined or referenced by the function.
    #[serde(default)]
    pub values: Vec<Value>,
    /// Basic blocks in layout order.
    #[serde(default)]
    pub blocks: Vec<Block>,
}

impl Function {
    /// Looks up a value.
    #[must_use]
    pub fn value(&self, id: ValueId) -> Option<&Value> {
        self.values.get(id.index())
    }

    /// Iterates over instructions in block order.
    pub fn instructions(&self) -> impl Iterator<Item = (ValueId, &Value)> {
        self.blocks
            .iter()
            .flat_map(|b| b.instrs.iter())
            .filter_map(|id| self.value(*id).map(|v| (*id, v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_flattened_ops() {
        let json = r#"{
            "name": "a",
            "values": [
                {"op": "alloc", "ty": 3, "heap": true},
                {"op": "make_interface", "ty": 1, "x": 0},
                {"op": "const", "ty": 4, "value": "\"Hello\""},
                {"op": "call", "callee": {"mode": "invoke", "receiver": 1, "method": "Print"}, "args": [2]},
                {"op": "select", "ty": 4}
            ],
            "blocks": [{"instrs": [0, 1, 3]}]
        }"#;
        let func: Function = serde_json::from_str(json).unwrap();
        assert_eq!(func.values[0].op, Op::Alloc { heap: true });
        assert_eq!(func.values[4].op, Op::Opaque);

        let Op::Call(call) = &func.values[3].op else {
            panic!("expected call");
        };
        assert!(call.is_invoke());
        assert_eq!(call.invoked(), Some((ValueId(1), "Print")));
        assert_eq!(func.values[3].ty, None);
    }

    #[test]
    fn instructions_follow_block_order() {
        let func = Function {
            name: "f".into(),
            pos: None,
            values: vec![
                Value {
                    ty: None,
                    pos: None,
                    op: Op::Parameter { name: "p".into() },
                },
                Value {
                    ty: None,
                    pos: None,
                    op: Op::Return { results: vec![] },
                },
                Value {
                    ty: None,
                    pos: None,
                    op: Op::Opaque,
                },
            ],
            blocks: vec![
                Block {
                    instrs: vec![ValueId(2)],
                },
                Block {
                    instrs: vec![ValueId(1), ValueId(7)],
                },
            ],
        };
        let order: Vec<ValueId> = func.instructions().map(|(id, _)| id).collect();
        assert_eq!(order, vec![ValueId(2), ValueId(1)]);
    }

    #[test]
    fn call_operands_include_receiver_first() {
        let op = Op::Call(Call {
            callee: Callee::Invoke {
                receiver: ValueId(4),
                method: "Print".into(),
            },
            args: vec![ValueId(1), ValueId(2)],
        });
        assert_eq!(op.operands(), vec![ValueId(4), ValueId(1), ValueId(2)]);
    }
}

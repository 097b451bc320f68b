//! Programmatic construction of units.
//!
//! Front-ends that link against this crate can build units directly instead
//! of going through JSON; the rule tests use the same API.

use std::path::PathBuf;

use super::function::{Block, Call, Callee, Function, Op, UnOpKind, Value, ValueId};
use super::types::{Field, Method, Type, TypeId};
use super::unit::{LoadError, Object, ObjectKind, Package, Position, Unit};

/// Builder for a [`Unit`].
#[derive(Debug)]
pub struct UnitBuilder {
    unit: Unit,
}

impl UnitBuilder {
    /// Starts a unit with the given import path and package name.
    #[must_use]
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            unit: Unit::new(path, name),
        }
    }

    /// Import path of the unit being built.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.unit.path
    }

    /// Adds an arbitrary type.
    pub fn ty(&mut self, ty: Type) -> TypeId {
        self.unit.types.push(ty)
    }

    /// Adds a predeclared type.
    pub fn basic(&mut self, name: &str) -> TypeId {
        self.ty(Type::Basic { name: name.into() })
    }

    /// Adds an interface literal from `(name, signature)` pairs.
    pub fn interface(&mut self, methods: &[(&str, &str)]) -> TypeId {
        let methods = methods
            .iter()
            .map(|(name, sig)| Method::new(*name, *sig))
            .collect();
        self.ty(Type::Interface { methods })
    }

    /// Adds a struct literal.
    pub fn structure(&mut self, fields: &[(&str, TypeId)]) -> TypeId {
        let fields = fields
            .iter()
            .map(|(name, ty)| Field {
                name: (*name).to_string(),
                ty: *ty,
                embedded: false,
            })
            .collect();
        self.ty(Type::Struct { fields })
    }

    /// Adds a named type declared in `package`.
    pub fn named(
        &mut self,
        package: &str,
        name: &str,
        underlying: TypeId,
        methods: Vec<Method>,
    ) -> TypeId {
        self.ty(Type::Named {
            name: name.into(),
            package: Some(package.into()),
            underlying,
            methods,
        })
    }

    /// Adds `*elem`.
    pub fn pointer(&mut self, elem: TypeId) -> TypeId {
        self.ty(Type::Pointer { elem })
    }

    /// Adds a result tuple.
    pub fn tuple(&mut self, elems: &[TypeId]) -> TypeId {
        self.ty(Type::Tuple {
            elems: elems.to_vec(),
        })
    }

    /// Adds a function signature.
    pub fn signature(&mut self, params: &[TypeId], results: &[TypeId]) -> TypeId {
        self.ty(Type::Signature {
            params: params.to_vec(),
            results: results.to_vec(),
        })
    }

    /// Declares a name in the unit's own scope.
    pub fn declare(&mut self, name: &str, kind: ObjectKind, ty: TypeId) -> &mut Self {
        self.unit.scope.insert(name, Object { kind, ty });
        self
    }

    /// Adds an import and returns its index.
    pub fn import(&mut self, path: &str, name: &str) -> usize {
        self.unit.imports.push(Package {
            path: path.into(),
            name: name.into(),
            scope: super::unit::Scope::new(),
        });
        self.unit.imports.len() - 1
    }

    /// Declares a name in the scope of import `index`.
    pub fn export(&mut self, index: usize, name: &str, kind: ObjectKind, ty: TypeId) -> &mut Self {
        if let Some(pkg) = self.unit.imports.get_mut(index) {
            pkg.scope.insert(name, Object { kind, ty });
        }
        self
    }

    /// Adds a finished function.
    pub fn function(&mut self, function: Function) -> &mut Self {
        self.unit.functions.push(function);
        self
    }

    /// Validates and returns the unit.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Dangling`] if an id was used before being defined.
    pub fn build(self) -> Result<Unit, LoadError> {
        self.unit.validate()?;
        Ok(self.unit)
    }
}

/// Builder for a [`Function`].
///
/// Instructions are appended to the current block at the current position
/// (see [`FunctionBuilder::at`]); operands that are not instructions, such as
/// parameters and constants, are only added to the value arena.
#[derive(Debug)]
pub struct FunctionBuilder {
    function: Function,
    file: PathBuf,
    cursor: Option<Position>,
}

impl FunctionBuilder {
    /// Starts a function whose instructions live in `file`.
    #[must_use]
    pub fn new(name: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        Self {
            function: Function {
                name: name.into(),
                pos: None,
                values: Vec::new(),
                blocks: vec![Block::default()],
            },
            file: file.into(),
            cursor: None,
        }
    }

    /// Sets the position recorded on subsequent instructions.
    pub fn at(&mut self, line: usize, column: usize) -> &mut Self {
        self.cursor = Some(Position::new(self.file.clone(), line, column));
        self
    }

    /// Starts a new basic block.
    pub fn block(&mut self) -> &mut Self {
        self.function.blocks.push(Block::default());
        self
    }

    fn push(&mut self, ty: Option<TypeId>, op: Op, pos: Option<Position>) -> ValueId {
        let id = ValueId(u32::try_from(self.function.values.len()).unwrap_or(u32::MAX));
        self.function.values.push(Value { ty, pos, op });
        id
    }

    /// Adds a value that is not an instruction.
    pub fn value(&mut self, ty: Option<TypeId>, op: Op) -> ValueId {
        self.push(ty, op, None)
    }

    /// Appends an instruction to the current block.
    pub fn instr(&mut self, ty: Option<TypeId>, op: Op) -> ValueId {
        let pos = self.cursor.clone();
        let id = self.push(ty, op, pos);
        if let Some(block) = self.function.blocks.last_mut() {
            block.instrs.push(id);
        }
        id
    }

    /// Adds a parameter.
    pub fn param(&mut self, name: &str, ty: TypeId) -> ValueId {
        self.value(Some(ty), Op::Parameter { name: name.into() })
    }

    /// Adds a package-level variable reference.
    pub fn global(&mut self, name: &str, ty: TypeId) -> ValueId {
        self.value(Some(ty), Op::Global { name: name.into() })
    }

    /// Adds a constant.
    pub fn constant(&mut self, value: &str, ty: TypeId) -> ValueId {
        self.value(
            Some(ty),
            Op::Const {
                value: value.into(),
            },
        )
    }

    /// Adds a reference to a declared function.
    pub fn func_ref(&mut self, name: &str, ty: TypeId) -> ValueId {
        self.value(Some(ty), Op::Function { name: name.into() })
    }

    /// `new(T)` / `&T{}`; `ty` is the pointer type.
    pub fn alloc(&mut self, ty: TypeId) -> ValueId {
        self.instr(Some(ty), Op::Alloc { heap: true })
    }

    /// Boxes `x` into interface type `ty`.
    pub fn make_interface(&mut self, ty: TypeId, x: ValueId) -> ValueId {
        self.instr(Some(ty), Op::MakeInterface { x })
    }

    /// `*x`
    pub fn deref(&mut self, ty: TypeId, x: ValueId) -> ValueId {
        self.instr(
            Some(ty),
            Op::UnOp {
                kind: UnOpKind::Deref,
                x,
            },
        )
    }

    /// `x.f` on a struct value.
    pub fn field(&mut self, ty: TypeId, x: ValueId, field: usize) -> ValueId {
        self.instr(Some(ty), Op::Field { x, field })
    }

    /// `&x.f` through a struct pointer.
    pub fn field_addr(&mut self, ty: TypeId, x: ValueId, field: usize) -> ValueId {
        self.instr(Some(ty), Op::FieldAddr { x, field })
    }

    /// `T(x)`
    pub fn convert(&mut self, ty: TypeId, x: ValueId) -> ValueId {
        self.instr(Some(ty), Op::Convert { x })
    }

    /// `*addr = val`
    pub fn store(&mut self, addr: ValueId, val: ValueId) -> ValueId {
        self.instr(None, Op::Store { addr, val })
    }

    /// Static call of `func`; `ty` is the result type, if any.
    pub fn call(&mut self, ty: Option<TypeId>, func: ValueId, args: &[ValueId]) -> ValueId {
        self.instr(
            ty,
            Op::Call(Call {
                callee: Callee::Direct { func },
                args: args.to_vec(),
            }),
        )
    }

    /// Dynamic dispatch of `method` on interface value `receiver`.
    pub fn invoke(
        &mut self,
        ty: Option<TypeId>,
        receiver: ValueId,
        method: &str,
        args: &[ValueId],
    ) -> ValueId {
        self.instr(
            ty,
            Op::Call(Call {
                callee: Callee::Invoke {
                    receiver,
                    method: method.into(),
                },
                args: args.to_vec(),
            }),
        )
    }

    /// Selects result `index` of a tuple-valued call.
    pub fn extract(&mut self, ty: TypeId, tuple: ValueId, index: usize) -> ValueId {
        self.instr(Some(ty), Op::Extract { tuple, index })
    }

    /// Control-flow merge. Edges may be patched later with [`FunctionBuilder::set_edges`].
    pub fn phi(&mut self, ty: TypeId, edges: &[ValueId]) -> ValueId {
        self.instr(
            Some(ty),
            Op::Phi {
                edges: edges.to_vec(),
            },
        )
    }

    /// Replaces the incoming edges of phi `id`.
    pub fn set_edges(&mut self, id: ValueId, edges: &[ValueId]) -> &mut Self {
        if let Some(Value {
            op: Op::Phi { edges: current },
            ..
        }) = self.function.values.get_mut(id.index())
        {
            *current = edges.to_vec();
        }
        self
    }

    /// `return results...`
    pub fn ret(&mut self, results: &[ValueId]) -> ValueId {
        self.instr(
            None,
            Op::Return {
                results: results.to_vec(),
            },
        )
    }

    /// Returns the finished function.
    #[must_use]
    pub fn finish(self) -> Function {
        self.function
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_valid_unit() {
        let mut ub = UnitBuilder::new("example.com/app", "app");
        let string = ub.basic("string");
        let iface = ub.interface(&[("Print", "func(string)")]);
        let printer = ub.named("example.com/fakefmt", "Printer", iface, Vec::new());
        let fakefmt = ub.import("example.com/fakefmt", "fakefmt");
        ub.export(fakefmt, "Printer", ObjectKind::TypeName, printer);

        let mut fb = FunctionBuilder::new("app.run", "app.go");
        let p = fb.param("p", printer);
        let msg = fb.constant("\"hi\"", string);
        fb.at(3, 2);
        let call = fb.invoke(None, p, "Print", &[msg]);
        ub.function(fb.finish());

        let unit = ub.build().unwrap();
        let func = &unit.functions[0];
        let instrs: Vec<_> = func.instructions().collect();
        assert_eq!(instrs.len(), 1);
        assert_eq!(instrs[0].0, call);
        assert_eq!(instrs[0].1.pos, Some(Position::new("app.go", 3, 2)));
        assert_eq!(unit.imports[0].scope.lookup("Printer").map(|o| o.ty), Some(printer));
    }

    #[test]
    fn set_edges_patches_phi() {
        let mut ub = UnitBuilder::new("p", "p");
        let int = ub.basic("int");
        let mut fb = FunctionBuilder::new("p.loop", "p.go");
        let phi = fb.phi(int, &[]);
        let conv = fb.convert(int, phi);
        fb.set_edges(phi, &[conv]);
        let func = fb.finish();
        assert_eq!(func.values[phi.index()].op, Op::Phi { edges: vec![conv] });
    }

    #[test]
    fn build_rejects_foreign_ids() {
        let mut ub = UnitBuilder::new("p", "p");
        ub.declare("X", ObjectKind::TypeName, TypeId(42));
        assert!(ub.build().is_err());
    }
}

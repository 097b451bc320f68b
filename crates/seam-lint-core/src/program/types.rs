//! Static type information for a compilation unit.
//!
//! Types live in a per-unit arena ([`TypeTable`]) and refer to each other by
//! [`TypeId`], so recursive named types need no special handling.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a type inside a [`TypeTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeId(pub u32);

impl TypeId {
    /// Returns the arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// A method declared on a named type or an interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Method {
    /// Method name.
    pub name: String,
    /// Printed signature, e.g. `func(string)`. Compared verbatim.
    #[serde(default)]
    pub signature: String,
    /// Whether the receiver is a pointer (`func (t *T) M()`).
    ///
    /// Ignored for interface methods.
    #[serde(default)]
    pub pointer_receiver: bool,
}

impl Method {
    /// Creates a value-receiver method.
    #[must_use]
    pub fn new(name: impl Into<String>, signature: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            signature: signature.into(),
            pointer_receiver: false,
        }
    }

    /// Marks the method as declared on a pointer receiver.
    #[must_use]
    pub fn on_pointer(mut self) -> Self {
        self.pointer_receiver = true;
        self
    }

    fn matches(&self, other: &Self) -> bool {
        self.name == other.name && self.signature == other.signature
    }
}

/// A struct field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Field name.
    pub name: String,
    /// Field type.
    pub ty: TypeId,
    /// Whether the field is embedded.
    #[serde(default)]
    pub embedded: bool,
}

/// A type as seen by the front-end's type checker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Type {
    /// Predeclared type such as `int`, `string` or `error`'s underlying form.
    Basic {
        /// Type name.
        name: String,
    },
    /// A declared type `type Name Underlying`.
    Named {
        /// Declared name.
        name: String,
        /// Import path of the declaring package; `None` for universe types.
        #[serde(default)]
        package: Option<String>,
        /// Underlying type.
        underlying: TypeId,
        /// Methods declared on this type.
        #[serde(default)]
        methods: Vec<Method>,
    },
    /// `*Elem`
    Pointer {
        /// Pointee type.
        elem: TypeId,
    },
    /// An interface type with its full method set.
    Interface {
        /// Methods of the interface.
        #[serde(default)]
        methods: Vec<Method>,
    },
    /// A struct literal type.
    Struct {
        /// Fields in declaration order.
        #[serde(default)]
        fields: Vec<Field>,
    },
    /// Result list of a multi-value call.
    Tuple {
        /// Element types.
        #[serde(default)]
        elems: Vec<TypeId>,
    },
    /// `[]Elem`
    Slice {
        /// Element type.
        elem: TypeId,
    },
    /// `map[Key]Value`
    Map {
        /// Key type.
        key: TypeId,
        /// Value type.
        value: TypeId,
    },
    /// A function signature.
    Signature {
        /// Parameter types.
        #[serde(default)]
        params: Vec<TypeId>,
        /// Result types.
        #[serde(default)]
        results: Vec<TypeId>,
    },
}

impl Type {
    /// Type ids this type refers to directly.
    #[must_use]
    pub fn references(&self) -> Vec<TypeId> {
        match self {
            Self::Basic { .. } | Self::Interface { .. } => Vec::new(),
            Self::Named { underlying, .. } => vec![*underlying],
            Self::Pointer { elem } | Self::Slice { elem } => vec![*elem],
            Self::Struct { fields } => fields.iter().map(|f| f.ty).collect(),
            Self::Tuple { elems } => elems.clone(),
            Self::Map { key, value } => vec![*key, *value],
            Self::Signature { params, results } => {
                params.iter().chain(results.iter()).copied().collect()
            }
        }
    }
}

/// A named type reached through at most one pointer indirection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamedRef<'a> {
    /// Declared name.
    pub name: &'a str,
    /// Declaring package path, if any.
    pub package: Option<&'a str>,
}

/// Arena of all types referenced by a unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeTable {
    types: Vec<Type>,
}

impl TypeTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a type and returns its id.
    pub fn push(&mut self, ty: Type) -> TypeId {
        let id = TypeId(u32::try_from(self.types.len()).unwrap_or(u32::MAX));
        self.types.push(ty);
        id
    }

    /// Replaces the type stored at `id`. Used to tie recursive named types.
    pub fn set(&mut self, id: TypeId, ty: Type) {
        if let Some(slot) = self.types.get_mut(id.index()) {
            *slot = ty;
        }
    }

    /// Looks up a type.
    #[must_use]
    pub fn get(&self, id: TypeId) -> Option<&Type> {
        self.types.get(id.index())
    }

    /// Number of types in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns true if the table holds no types.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Iterates over `(id, type)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &Type)> {
        self.types
            .iter()
            .enumerate()
            .map(|(i, ty)| (TypeId(u32::try_from(i).unwrap_or(u32::MAX)), ty))
    }

    /// Follows named types down to their underlying representation.
    ///
    /// Chains longer than the table (only possible in malformed input) yield `None`.
    #[must_use]
    pub fn underlying(&self, id: TypeId) -> Option<&Type> {
        let mut current = id;
        for _ in 0..=self.types.len() {
            match self.get(current)? {
                Type::Named { underlying, .. } => current = *underlying,
                other => return Some(other),
            }
        }
        None
    }

    /// Returns true if the underlying type of `id` is an interface.
    #[must_use]
    pub fn is_interface(&self, id: TypeId) -> bool {
        matches!(self.underlying(id), Some(Type::Interface { .. }))
    }

    /// Returns the methods of `id` if its underlying type is an interface.
    #[must_use]
    pub fn interface_methods(&self, id: TypeId) -> Option<&[Method]> {
        match self.underlying(id)? {
            Type::Interface { methods } => Some(methods),
            _ => None,
        }
    }

    /// Returns the pointee if `id` is a pointer type.
    #[must_use]
    pub fn pointer_elem(&self, id: TypeId) -> Option<TypeId> {
        match self.get(id)? {
            Type::Pointer { elem } => Some(*elem),
            _ => None,
        }
    }

    /// Returns the named type behind `T` or `*T`.
    #[must_use]
    pub fn deref_named(&self, id: TypeId) -> Option<NamedRef<'_>> {
        let target = self.pointer_elem(id).unwrap_or(id);
        match self.get(target)? {
            Type::Named { name, package, .. } => Some(NamedRef {
                name,
                package: package.as_deref(),
            }),
            _ => None,
        }
    }

    /// Method set of a value of type `id`.
    ///
    /// - named concrete `T`: value-receiver methods
    /// - `*T` for named concrete `T`: all methods of `T`
    /// - interfaces (named or literal): the interface methods
    #[must_use]
    pub fn method_set(&self, id: TypeId) -> Vec<&Method> {
        if let Some(methods) = self.interface_methods(id) {
            return methods.iter().collect();
        }
        match self.get(id) {
            Some(Type::Named { methods, .. }) => {
                methods.iter().filter(|m| !m.pointer_receiver).collect()
            }
            Some(Type::Pointer { elem }) => self.pointer_method_set(*elem),
            _ => Vec::new(),
        }
    }

    /// Method set of a hypothetical `*id`.
    fn pointer_method_set(&self, id: TypeId) -> Vec<&Method> {
        if self.is_interface(id) {
            return Vec::new();
        }
        match self.get(id) {
            Some(Type::Named { methods, .. }) => methods.iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Reports whether a value of type `id` satisfies an interface with `required` methods.
    #[must_use]
    pub fn implements(&self, id: TypeId, required: &[Method]) -> bool {
        let available = self.method_set(id);
        required
            .iter()
            .all(|req| available.iter().any(|m| m.matches(req)))
    }

    /// Reports whether `*id` satisfies an interface with `required` methods.
    #[must_use]
    pub fn implements_by_pointer(&self, id: TypeId, required: &[Method]) -> bool {
        let available = self.pointer_method_set(id);
        required
            .iter()
            .all(|req| available.iter().any(|m| m.matches(req)))
    }

    /// Renders a type the way Go prints it, for log messages.
    #[must_use]
    pub fn display(&self, id: TypeId) -> String {
        self.display_bounded(id, 8)
    }

    fn display_bounded(&self, id: TypeId, depth: usize) -> String {
        if depth == 0 {
            return "...".to_string();
        }
        let Some(ty) = self.get(id) else {
            return format!("<invalid {id}>");
        };
        let list = |ids: &[TypeId]| {
            ids.iter()
                .map(|t| self.display_bounded(*t, depth - 1))
                .collect::<Vec<_>>()
                .join(", ")
        };
        match ty {
            Type::Basic { name } => name.clone(),
            Type::Named {
                name,
                package: Some(pkg),
                ..
            } => format!("{pkg}.{name}"),
            Type::Named { name, .. } => name.clone(),
            Type::Pointer { elem } => format!("*{}", self.display_bounded(*elem, depth - 1)),
            Type::Interface { methods } if methods.is_empty() => "interface{}".to_string(),
            Type::Interface { methods } => {
                let names: Vec<&str> = methods.iter().map(|m| m.name.as_str()).collect();
                format!("interface{{{}}}", names.join("; "))
            }
            Type::Struct { fields } => {
                let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
                format!("struct{{{}}}", names.join("; "))
            }
            Type::Tuple { elems } => format!("({})", list(elems)),
            Type::Slice { elem } => format!("[]{}", self.display_bounded(*elem, depth - 1)),
            Type::Map { key, value } => format!(
                "map[{}]{}",
                self.display_bounded(*key, depth - 1),
                self.display_bounded(*value, depth - 1)
            ),
            Type::Signature { params, results } => {
                format!("func({}) ({})", list(params), list(results))
            }
        }
    }
}

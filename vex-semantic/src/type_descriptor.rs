//! The semantic type model.
//!
//! `vex_ast::Type` is what the parser wrote down; `TypeDescriptor` is what the
//! analyzer reasons about. The two overlap for primitives but diverge once a
//! name has been resolved against the Symbol Table (a `Named("Point")` syntax
//! type becomes a fully laid-out `TypeDescriptor::Struct` with its field list)
//! or synthesized from something the AST doesn't encode as a type at all, like
//! a closure's captures or a `spawn_with_handle` call.

use std::sync::Arc;

/// Primitive scalar kinds, shared between `vex_ast::Type`'s flat primitive
/// variants and `TypeDescriptor::Primitive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    I8,
    I16,
    I32,
    I64,
    I128,
    U8,
    U16,
    U32,
    U64,
    U128,
    F32,
    F64,
    F128,
    Bool,
    String,
    Byte,
}

impl PrimitiveType {
    /// Best-effort mapping from a parsed `vex_ast::Type`. Returns `None` for
    /// anything that isn't a bare primitive (structs, generics, pointers...).
    pub fn from_ast(ty: &vex_ast::Type) -> Option<Self> {
        use vex_ast::Type as T;
        Some(match ty {
            T::I8 => PrimitiveType::I8,
            T::I16 => PrimitiveType::I16,
            T::I32 => PrimitiveType::I32,
            T::I64 => PrimitiveType::I64,
            T::I128 => PrimitiveType::I128,
            T::U8 => PrimitiveType::U8,
            T::U16 => PrimitiveType::U16,
            T::U32 => PrimitiveType::U32,
            T::U64 => PrimitiveType::U64,
            T::U128 => PrimitiveType::U128,
            T::F32 => PrimitiveType::F32,
            T::F64 => PrimitiveType::F64,
            T::F128 => PrimitiveType::F128,
            T::Bool => PrimitiveType::Bool,
            T::String => PrimitiveType::String,
            T::Byte => PrimitiveType::Byte,
            _ => return None,
        })
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            PrimitiveType::I8
                | PrimitiveType::I16
                | PrimitiveType::I32
                | PrimitiveType::I64
                | PrimitiveType::I128
                | PrimitiveType::U8
                | PrimitiveType::U16
                | PrimitiveType::U32
                | PrimitiveType::U64
                | PrimitiveType::U128
        )
    }

    pub fn is_float(self) -> bool {
        matches!(
            self,
            PrimitiveType::F32 | PrimitiveType::F64 | PrimitiveType::F128
        )
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            PrimitiveType::I8
                | PrimitiveType::I16
                | PrimitiveType::I32
                | PrimitiveType::I64
                | PrimitiveType::I128
        )
    }
}

impl std::fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PrimitiveType::I8 => "i8",
            PrimitiveType::I16 => "i16",
            PrimitiveType::I32 => "i32",
            PrimitiveType::I64 => "i64",
            PrimitiveType::I128 => "i128",
            PrimitiveType::U8 => "u8",
            PrimitiveType::U16 => "u16",
            PrimitiveType::U32 => "u32",
            PrimitiveType::U64 => "u64",
            PrimitiveType::U128 => "u128",
            PrimitiveType::F32 => "f32",
            PrimitiveType::F64 => "f64",
            PrimitiveType::F128 => "f128",
            PrimitiveType::Bool => "bool",
            PrimitiveType::String => "string",
            PrimitiveType::Byte => "byte",
        };
        write!(f, "{s}")
    }
}

/// A single field of a resolved struct type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldDescriptor {
    pub name: String,
    pub ty: Arc<TypeDescriptor>,
}

/// A single variant of a resolved enum type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariantDescriptor {
    pub name: String,
    pub data: Vec<Arc<TypeDescriptor>>,
}

/// The fully resolved, structurally comparable semantic type.
///
/// Every descriptor handed out by the registry is behind an `Arc`: two
/// descriptors that are structurally equal are also pointer-equal, since the
/// registry interns by value before wrapping in `Arc` (Invariant: one
/// `Arc<TypeDescriptor>` per distinct structural type, for the lifetime of the
/// registry).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
    Primitive(PrimitiveType),
    Struct {
        name: String,
        fields: Vec<FieldDescriptor>,
    },
    Enum {
        name: String,
        variants: Vec<VariantDescriptor>,
    },
    Slice(Arc<TypeDescriptor>),
    Array(Arc<TypeDescriptor>, usize),
    Pointer {
        inner: Arc<TypeDescriptor>,
        is_mutable: bool,
    },
    Function {
        params: Vec<Arc<TypeDescriptor>>,
        return_type: Arc<TypeDescriptor>,
    },
    GenericInstance {
        name: String,
        args: Vec<Arc<TypeDescriptor>>,
    },
    Tuple(Vec<Arc<TypeDescriptor>>),
    Result {
        ok: Arc<TypeDescriptor>,
        err: Arc<TypeDescriptor>,
    },
    /// The type of a handle returned by `spawn_with_handle`; only `await`
    /// unwraps it, back down to `T`.
    TaskHandle(Arc<TypeDescriptor>),
    /// Diverging expressions (`panic`, `return`, infinite `loop`), compatible
    /// with any type on both sides of an assignment or branch merge.
    Never,
    /// Unit / no value.
    Void,
}

impl TypeDescriptor {
    pub fn name_hint(&self) -> String {
        match self {
            TypeDescriptor::Primitive(p) => p.to_string(),
            TypeDescriptor::Struct { name, .. } => name.clone(),
            TypeDescriptor::Enum { name, .. } => name.clone(),
            TypeDescriptor::Slice(inner) => format!("[{}]", inner.name_hint()),
            TypeDescriptor::Array(inner, n) => format!("[{}; {}]", inner.name_hint(), n),
            TypeDescriptor::Pointer { inner, is_mutable } => {
                if *is_mutable {
                    format!("*mut {}", inner.name_hint())
                } else {
                    format!("*{}", inner.name_hint())
                }
            }
            TypeDescriptor::Function {
                params,
                return_type,
            } => format!(
                "fn({}) -> {}",
                params
                    .iter()
                    .map(|p| p.name_hint())
                    .collect::<Vec<_>>()
                    .join(", "),
                return_type.name_hint()
            ),
            TypeDescriptor::GenericInstance { name, args } => format!(
                "{}<{}>",
                name,
                args.iter()
                    .map(|a| a.name_hint())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            TypeDescriptor::Tuple(items) => format!(
                "({})",
                items
                    .iter()
                    .map(|i| i.name_hint())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            TypeDescriptor::Result { ok, err } => {
                format!("Result<{}, {}>", ok.name_hint(), err.name_hint())
            }
            TypeDescriptor::TaskHandle(inner) => format!("TaskHandle<{}>", inner.name_hint()),
            TypeDescriptor::Never => "!".to_string(),
            TypeDescriptor::Void => "void".to_string(),
        }
    }

    pub fn is_never(&self) -> bool {
        matches!(self, TypeDescriptor::Never)
    }
}

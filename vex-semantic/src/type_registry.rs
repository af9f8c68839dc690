//! The Type Registry: interns `TypeDescriptor`s behind `Arc`, so that two
//! structurally equal types are also the same allocation for the lifetime of
//! an analysis run, and exposes the construction operations the rest of the
//! analyzer builds descriptors with.

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;

use crate::type_descriptor::{
    FieldDescriptor, PrimitiveType, TypeDescriptor, VariantDescriptor,
};
use crate::type_system::coercion_rules::{self, CoercionKind};

/// Names of generic container types the language provides without an import:
/// `Vec<T>`, `Box<T>`, `Map<K, V>`, and so on. Used to recognize
/// `vex_ast::Type::Generic { name, .. }` nodes that name a builtin rather than
/// a user-defined generic struct.
static BUILTIN_TYPE_NAMES: OnceLock<HashSet<&'static str>> = OnceLock::new();

fn builtin_type_names() -> &'static HashSet<&'static str> {
    BUILTIN_TYPE_NAMES.get_or_init(|| {
        [
            "Vec",
            "Box",
            "Map",
            "Set",
            "String",
            "Range",
            "RangeInclusive",
            "Channel",
            "Slice",
            "Option",
            "Result",
        ]
        .into_iter()
        .collect()
    })
}

/// `true` if `name` is one of the predeclared generic container types.
pub fn is_builtin_type(name: &str) -> bool {
    builtin_type_names().contains(name)
}

/// Interning cache + construction operations for `TypeDescriptor`.
///
/// One registry is created per `SemanticAnalyzer` and lives for the whole
/// analysis run (Invariant: one `Arc<TypeDescriptor>` per distinct structural
/// type for the life of the registry, two calls that build the same
/// descriptor return the same `Arc`).
pub struct TypeRegistry {
    cache: DashMap<TypeDescriptor, Arc<TypeDescriptor>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self {
            cache: DashMap::new(),
        }
    }

    /// Intern a fully-built descriptor, returning the canonical `Arc` for it.
    pub fn intern(&self, descriptor: TypeDescriptor) -> Arc<TypeDescriptor> {
        if let Some(existing) = self.cache.get(&descriptor) {
            return existing.clone();
        }
        self.cache
            .entry(descriptor.clone())
            .or_insert_with(|| Arc::new(descriptor))
            .clone()
    }

    pub fn primitive(&self, kind: PrimitiveType) -> Arc<TypeDescriptor> {
        self.intern(TypeDescriptor::Primitive(kind))
    }

    pub fn void(&self) -> Arc<TypeDescriptor> {
        self.intern(TypeDescriptor::Void)
    }

    pub fn never(&self) -> Arc<TypeDescriptor> {
        self.intern(TypeDescriptor::Never)
    }

    pub fn struct_new(&self, name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Arc<TypeDescriptor> {
        self.intern(TypeDescriptor::Struct {
            name: name.into(),
            fields,
        })
    }

    pub fn enum_new(&self, name: impl Into<String>, variants: Vec<VariantDescriptor>) -> Arc<TypeDescriptor> {
        self.intern(TypeDescriptor::Enum {
            name: name.into(),
            variants,
        })
    }

    pub fn slice(&self, element: Arc<TypeDescriptor>) -> Arc<TypeDescriptor> {
        self.intern(TypeDescriptor::Slice(element))
    }

    pub fn array(&self, element: Arc<TypeDescriptor>, len: usize) -> Arc<TypeDescriptor> {
        self.intern(TypeDescriptor::Array(element, len))
    }

    pub fn pointer(&self, inner: Arc<TypeDescriptor>, is_mutable: bool) -> Arc<TypeDescriptor> {
        self.intern(TypeDescriptor::Pointer { inner, is_mutable })
    }

    pub fn function(
        &self,
        params: Vec<Arc<TypeDescriptor>>,
        return_type: Arc<TypeDescriptor>,
    ) -> Arc<TypeDescriptor> {
        self.intern(TypeDescriptor::Function {
            params,
            return_type,
        })
    }

    pub fn generic_instance(
        &self,
        name: impl Into<String>,
        args: Vec<Arc<TypeDescriptor>>,
    ) -> Arc<TypeDescriptor> {
        self.intern(TypeDescriptor::GenericInstance {
            name: name.into(),
            args,
        })
    }

    pub fn tuple(&self, items: Vec<Arc<TypeDescriptor>>) -> Arc<TypeDescriptor> {
        self.intern(TypeDescriptor::Tuple(items))
    }

    pub fn result(&self, ok: Arc<TypeDescriptor>, err: Arc<TypeDescriptor>) -> Arc<TypeDescriptor> {
        self.intern(TypeDescriptor::Result { ok, err })
    }

    pub fn task_handle(&self, inner: Arc<TypeDescriptor>) -> Arc<TypeDescriptor> {
        self.intern(TypeDescriptor::TaskHandle(inner))
    }

    /// Structural compatibility between two descriptors: can a value of type
    /// `b` stand in where `a` is expected? `Never` is compatible with
    /// anything (a diverging branch never produces a value to mismatch);
    /// equal descriptors are always compatible; everything else dispatches on
    /// shape: numeric pairs go through the coercion rules (only a safe widen
    /// from `b` to `a`, never the reverse), pointers compare pointee only,
    /// and the nested-type constructors (`GenericInstance`, `Result`,
    /// `Tuple`, `Function`) recurse member-wise.
    pub fn compatible(&self, a: &TypeDescriptor, b: &TypeDescriptor) -> bool {
        use TypeDescriptor::*;

        if a.is_never() || b.is_never() {
            return true;
        }
        if a == b {
            return true;
        }
        match (a, b) {
            (Primitive(target), Primitive(actual)) => {
                coercion_rules::classify_coercion(*actual, *target) == CoercionKind::Safe
            }
            (Pointer { inner: ia, .. }, Pointer { inner: ib, .. }) => ia == ib,
            (GenericInstance { name: na, args: aa }, GenericInstance { name: nb, args: ab }) => {
                na == nb
                    && aa.len() == ab.len()
                    && aa.iter().zip(ab.iter()).all(|(x, y)| self.compatible(x, y))
            }
            (Result { ok: oa, err: ea }, Result { ok: ob, err: eb }) => {
                self.compatible(oa, ob) && self.compatible(ea, eb)
            }
            (Tuple(ta), Tuple(tb)) => {
                ta.len() == tb.len() && ta.iter().zip(tb.iter()).all(|(x, y)| self.compatible(x, y))
            }
            (
                Function {
                    params: pa,
                    return_type: ra,
                },
                Function {
                    params: pb,
                    return_type: rb,
                },
            ) => {
                pa.len() == pb.len()
                    && pa.iter().zip(pb.iter()).all(|(x, y)| self.compatible(x, y))
                    && self.compatible(ra, rb)
            }
            _ => false,
        }
    }

    /// The result type of a binary arithmetic/comparison op between two
    /// primitive operands, or `None` if the combination needs an explicit
    /// cast (per the coercion rules) and the analyzer should emit a
    /// diagnostic instead of guessing.
    ///
    /// Unlike `compatible`, this has no "target" side: `a + b` is symmetric,
    /// so both orderings of `classify_coercion` are tried before giving up.
    pub fn promote_numeric(
        &self,
        left: PrimitiveType,
        right: PrimitiveType,
        in_unsafe_block: bool,
    ) -> Option<(Arc<TypeDescriptor>, Option<String>)> {
        if left == right {
            return Some((self.primitive(left), None));
        }

        let forward = coercion_rules::classify_coercion(left, right);
        if forward == CoercionKind::Safe {
            return Some((self.primitive(right), None));
        }
        let backward = coercion_rules::classify_coercion(right, left);
        if backward == CoercionKind::Safe {
            return Some((self.primitive(left), None));
        }

        if !in_unsafe_block {
            return None;
        }
        match (forward, backward) {
            (CoercionKind::Unsafe, _) => {
                let warning = coercion_rules::format_coercion_warning(left, right);
                Some((self.primitive(right), Some(warning)))
            }
            (_, CoercionKind::Unsafe) => {
                let warning = coercion_rules::format_coercion_warning(right, left);
                Some((self.primitive(left), Some(warning)))
            }
            _ => None,
        }
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_type_names_recognized() {
        assert!(is_builtin_type("Vec"));
        assert!(is_builtin_type("Box"));
        assert!(is_builtin_type("Map"));
        assert!(!is_builtin_type("MyStruct"));
        assert!(!is_builtin_type("Point"));
    }

    #[test]
    fn interning_returns_the_same_arc_for_equal_descriptors() {
        let reg = TypeRegistry::new();
        let a = reg.primitive(PrimitiveType::I32);
        let b = reg.primitive(PrimitiveType::I32);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn distinct_structs_intern_separately() {
        let reg = TypeRegistry::new();
        let a = reg.struct_new("Point", vec![]);
        let b = reg.struct_new(
            "Point",
            vec![FieldDescriptor {
                name: "x".into(),
                ty: reg.primitive(PrimitiveType::I32),
            }],
        );
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn compatible_treats_never_as_universal() {
        let reg = TypeRegistry::new();
        let never = reg.never();
        let i32_ty = reg.primitive(PrimitiveType::I32);
        assert!(reg.compatible(&never, &i32_ty));
        assert!(reg.compatible(&i32_ty, &never));
        assert!(!reg.compatible(&i32_ty, &reg.primitive(PrimitiveType::I64)));
    }

    #[test]
    fn promote_numeric_allows_safe_upcast() {
        let reg = TypeRegistry::new();
        let (ty, warning) = reg
            .promote_numeric(PrimitiveType::I8, PrimitiveType::I32, false)
            .expect("safe upcast should promote");
        assert_eq!(*ty, TypeDescriptor::Primitive(PrimitiveType::I32));
        assert!(warning.is_none());
    }

    #[test]
    fn promote_numeric_rejects_forbidden_outside_unsafe() {
        let reg = TypeRegistry::new();
        assert!(reg
            .promote_numeric(PrimitiveType::I32, PrimitiveType::U32, false)
            .is_none());
    }

    #[test]
    fn promote_numeric_is_symmetric_regardless_of_operand_order() {
        let reg = TypeRegistry::new();
        let (ty, _) = reg
            .promote_numeric(PrimitiveType::I64, PrimitiveType::I32, false)
            .expect("i64 + i32 should widen to i64 even with the wider operand first");
        assert_eq!(*ty, TypeDescriptor::Primitive(PrimitiveType::I64));

        let (ty, _) = reg
            .promote_numeric(PrimitiveType::I32, PrimitiveType::I64, false)
            .expect("i32 + i64 should widen to i64");
        assert_eq!(*ty, TypeDescriptor::Primitive(PrimitiveType::I64));
    }

    #[test]
    fn compatible_allows_safe_widening_into_a_wider_declared_type() {
        let reg = TypeRegistry::new();
        let i32_ty = reg.primitive(PrimitiveType::I32);
        let i64_ty = reg.primitive(PrimitiveType::I64);
        // `let b: i64 = a;` where `a: i32` widens; the reverse narrows.
        assert!(reg.compatible(&i64_ty, &i32_ty));
        assert!(!reg.compatible(&i32_ty, &i64_ty));
    }

    #[test]
    fn compatible_recurses_into_generic_instance_args() {
        let reg = TypeRegistry::new();
        let ok_i64 = reg.generic_instance("Option", vec![reg.primitive(PrimitiveType::I64)]);
        let ok_i32 = reg.generic_instance("Option", vec![reg.primitive(PrimitiveType::I32)]);
        assert!(reg.compatible(&ok_i64, &ok_i32));
        assert!(!reg.compatible(&ok_i32, &ok_i64));
    }

    #[test]
    fn compatible_compares_pointer_pointee_only() {
        let reg = TypeRegistry::new();
        let p_const = reg.pointer(reg.primitive(PrimitiveType::I32), false);
        let p_mut = reg.pointer(reg.primitive(PrimitiveType::I32), true);
        let p_other = reg.pointer(reg.primitive(PrimitiveType::I64), false);
        assert!(reg.compatible(&p_const, &p_mut));
        assert!(!reg.compatible(&p_const, &p_other));
    }
}

//! Bridges `vex_ast::Type` (what the parser wrote down) into
//! `TypeDescriptor` (what the analyzer reasons about), consulting the
//! declaration tables built during the Declaration Analyzer's first pass.

use std::sync::Arc;

use vex_ast::Type as AstType;
use vex_diagnostics::{error_codes, Diagnostic, Span};

use crate::analyzer::SemanticAnalyzer;
use crate::type_descriptor::{PrimitiveType, TypeDescriptor};
use crate::type_registry::is_builtin_type;

impl SemanticAnalyzer {
    /// Resolve a syntax type into its semantic descriptor. Unknown named
    /// types emit `UNDEFINED_TYPE` and resolve to `Never` so callers can keep
    /// analyzing instead of aborting (spec.md §7 propagation rule).
    pub fn resolve_type(&mut self, ty: &AstType, span: Span) -> Arc<TypeDescriptor> {
        if let Some(prim) = PrimitiveType::from_ast(ty) {
            return self.registry.primitive(prim);
        }

        match ty {
            AstType::Named(name) => self.resolve_named(name, span),

            AstType::Generic { name, type_args } => self.resolve_generic(name, type_args, span),

            AstType::Array(inner, len) => {
                let elem = self.resolve_type(inner, span);
                self.registry.array(elem, *len)
            }

            // References are transparent borrows in Vex's surface syntax (a
            // method receiver `self: &Vector2` type-checks as `Vector2`);
            // only `*T` raw pointers carry the separate Pointer category that
            // unsafe-context rules apply to.
            AstType::Reference(inner, _) => self.resolve_type(inner, span),

            AstType::Slice(inner, _) => {
                let elem = self.resolve_type(inner, span);
                self.registry.slice(elem)
            }

            AstType::RawPtr { inner, is_const } => {
                let pointee = self.resolve_type(inner, span);
                self.registry.pointer(pointee, !is_const)
            }

            AstType::Function {
                params,
                return_type,
            } => {
                let params = params.iter().map(|p| self.resolve_type(p, span.clone())).collect();
                let ret = self.resolve_type(return_type, span);
                self.registry.function(params, ret)
            }

            AstType::Tuple(items) => {
                let items = items.iter().map(|t| self.resolve_type(t, span.clone())).collect();
                self.registry.tuple(items)
            }

            AstType::Option(inner) => {
                let elem = self.resolve_type(inner, span);
                self.registry.generic_instance("Option", vec![elem])
            }

            AstType::Result(ok, err) => {
                let ok = self.resolve_type(ok, span.clone());
                let err = self.resolve_type(err, span);
                self.registry.result(ok, err)
            }

            AstType::Vec(inner) => {
                let elem = self.resolve_type(inner, span);
                self.registry.generic_instance("Vec", vec![elem])
            }

            AstType::Box(inner) => {
                let elem = self.resolve_type(inner, span);
                self.registry.generic_instance("Box", vec![elem])
            }

            AstType::Channel(inner) => {
                let elem = self.resolve_type(inner, span);
                self.registry.generic_instance("Channel", vec![elem])
            }

            AstType::Unit => self.registry.void(),
            AstType::Never => self.registry.never(),

            // `error` is surfaced to the rest of the analyzer as a `string`
            // (its only operation, `error.new("...")`, already produces one);
            // `nil` types the absence of a value the same as `void`.
            AstType::Error => self.registry.primitive(PrimitiveType::String),
            AstType::Nil => self.registry.void(),

            // Typeof reduces to the analyzed type of the embedded expression.
            AstType::Typeof(expr) => self.analyze_expression(expr, None),

            // Best-effort for the conditional-type / union-type surface:
            // these aren't part of the core type category list (spec.md §3)
            // and full evaluation of a conditional type is cross-function
            // inference, which is explicitly out of scope (spec.md §1). Pick
            // a representative branch so the rest of the program still
            // type-checks against *something* plausible.
            AstType::Union(members) | AstType::Intersection(members) => members
                .first()
                .map(|t| self.resolve_type(t, span))
                .unwrap_or_else(|| self.registry.never()),
            AstType::Conditional { true_type, .. } => self.resolve_type(true_type, span),
            AstType::Infer(_) => self.registry.never(),

            // Primitive variants are handled by `PrimitiveType::from_ast` above.
            _ => unreachable!("primitive Type variants are handled by from_ast"),
        }
    }

    fn resolve_named(&mut self, name: &str, span: Span) -> Arc<TypeDescriptor> {
        if let Some(ty) = self.named_types.get(name) {
            return ty.clone();
        }
        // Forward reference to a struct/enum declared later in the file
        // (declarations.rs lays these out lazily rather than strictly in
        // source order).
        if self.pending_structs.contains_key(name) {
            return self.resolve_struct(name, span);
        }
        if self.pending_enums.contains_key(name) {
            return self.resolve_enum(name, span);
        }
        self.emit(
            Diagnostic::error(
                error_codes::UNDEFINED_TYPE,
                format!("cannot find type `{name}` in this scope"),
                span,
            )
            .with_metadata(vex_diagnostics::DiagnosticMetadata {
                error_category: Some("UndefinedType".to_string()),
                similar_symbols: crate::suggest::similar_names(name, self.named_types.keys()),
                ..Default::default()
            }),
        );
        self.registry.never()
    }

    fn resolve_generic(&mut self, name: &str, type_args: &[AstType], span: Span) -> Arc<TypeDescriptor> {
        let args: Vec<Arc<TypeDescriptor>> = type_args
            .iter()
            .map(|t| self.resolve_type(t, span.clone()))
            .collect();

        if name == "Result" && args.len() == 2 {
            return self.registry.result(args[0].clone(), args[1].clone());
        }

        if self.pending_structs.contains_key(name) {
            self.resolve_struct(name, span.clone());
        } else if self.pending_enums.contains_key(name) {
            self.resolve_enum(name, span.clone());
        }

        if is_builtin_type(name) || self.named_types.contains_key(name) {
            return self.registry.generic_instance(name, args);
        }

        self.emit(Diagnostic::error(
            error_codes::UNDEFINED_TYPE,
            format!("cannot find generic type `{name}` in this scope"),
            span,
        ));
        self.registry.never()
    }
}

//! Declaration Analyzer (C5): the pass that turns top-level syntax items
//! into the tables the resolver and walker consult, struct and enum
//! layouts, function signatures, method tables, and the extern/trait/policy/
//! export surface around them (spec.md §4.5).
//!
//! Struct and enum layouts are resolved lazily rather than strictly in
//! source order: a field naming a type that hasn't been visited yet pulls
//! that declaration forward through `resolve_named` and lays it out first,
//! so `struct A { b: B }` type-checks regardless of whether `B` appears
//! before or after `A` in the file. A type that genuinely contains itself by
//! value (not through a pointer, slice, or generic) can't be laid out;
//! reentering the same name while it's already being resolved is reported as
//! that error instead of recursing forever.

use std::sync::Arc;

use vex_ast::{Enum as AstEnum, Item, Struct as AstStruct};
use vex_diagnostics::{error_codes, Diagnostic, Span};

use crate::analyzer::{FunctionSig, SemanticAnalyzer};
use crate::annotations::{self, AnnotationContext, TargetInfo};
use crate::symbol::{SymbolEntry, SymbolKind};
use crate::type_descriptor::{FieldDescriptor, TypeDescriptor, VariantDescriptor};

impl SemanticAnalyzer {
    /// Declaration-analysis pass 1: lay out every struct/enum, then register
    /// every item's signature. Bodies are left for pass 2 (`analyze_item`).
    pub(crate) fn register_all(&mut self, items: &[Item]) {
        for item in items {
            match item {
                Item::Struct(s) => {
                    self.pending_structs.insert(s.name.clone(), s.clone());
                }
                Item::Enum(e) => {
                    self.pending_enums.insert(e.name.clone(), e.clone());
                }
                _ => {}
            }
        }

        for name in self.pending_structs.keys().cloned().collect::<Vec<_>>() {
            self.resolve_struct(&name, Span::unknown());
        }
        for name in self.pending_enums.keys().cloned().collect::<Vec<_>>() {
            self.resolve_enum(&name, Span::unknown());
        }

        let mut exports = Vec::new();
        for item in items {
            if let Item::Export(export) = item {
                exports.extend(export.items.iter().cloned());
                continue;
            }
            self.register_item(item);
        }
        for name in exports {
            if let Some(entry) = self.symbols.lookup_recursive_mut(&name) {
                entry.exported = true;
            }
        }
    }

    /// Resolve (and memoize) the struct named `name`, recursively resolving
    /// any struct/enum its fields directly depend on first.
    pub(crate) fn resolve_struct(&mut self, name: &str, span: Span) -> Arc<TypeDescriptor> {
        if let Some(ty) = self.struct_types.get(name) {
            return ty.clone();
        }
        if !self.resolving_types.insert(name.to_string()) {
            self.report_cycle(name, span);
            return self.registry.never();
        }

        let Some(def) = self.pending_structs.get(name).cloned() else {
            self.resolving_types.remove(name);
            return self.registry.never();
        };

        let fields = def
            .fields
            .iter()
            .map(|field| FieldDescriptor {
                name: field.name.clone(),
                ty: self.resolve_type(&field.ty, span.clone()),
            })
            .collect();

        let descriptor = self.registry.struct_new(def.name.clone(), fields);
        self.struct_types.insert(def.name.clone(), descriptor.clone());
        self.named_types.insert(def.name.clone(), descriptor.clone());
        self.resolving_types.remove(name);
        descriptor
    }

    pub(crate) fn resolve_enum(&mut self, name: &str, span: Span) -> Arc<TypeDescriptor> {
        if let Some(ty) = self.enum_types.get(name) {
            return ty.clone();
        }
        if !self.resolving_types.insert(name.to_string()) {
            self.report_cycle(name, span);
            return self.registry.never();
        }

        let Some(def) = self.pending_enums.get(name).cloned() else {
            self.resolving_types.remove(name);
            return self.registry.never();
        };

        let variants = def
            .variants
            .iter()
            .map(|variant| VariantDescriptor {
                name: variant.name.clone(),
                data: variant
                    .data
                    .iter()
                    .map(|t| self.resolve_type(t, span.clone()))
                    .collect(),
            })
            .collect();

        let descriptor = self.registry.enum_new(def.name.clone(), variants);
        self.enum_types.insert(def.name.clone(), descriptor.clone());
        self.named_types.insert(def.name.clone(), descriptor.clone());
        self.resolving_types.remove(name);
        descriptor
    }

    fn insert_global_checked(&mut self, entry: SymbolEntry, span: Span) {
        let name = entry.name.clone();
        if self.symbols.insert_global(entry).is_err() {
            self.emit(Diagnostic::error(
                error_codes::DUPLICATE_DEFINITION,
                format!("`{name}` is already declared at the top level"),
                span,
            ));
        }
    }

    fn report_cycle(&mut self, name: &str, span: Span) {
        self.emit(Diagnostic::error(
            error_codes::CIRCULAR_DEPENDENCY,
            format!("`{name}` contains itself by value; wrap one field in a pointer or box"),
            span,
        ));
        let never = self.registry.never();
        self.struct_types.insert(name.to_string(), never.clone());
        self.enum_types.insert(name.to_string(), never.clone());
        self.named_types.insert(name.to_string(), never);
    }

    pub(crate) fn register_item(&mut self, item: &Item) {
        match item {
            Item::Function(f) => self.register_function(f),
            Item::Struct(s) => self.register_struct(s),
            Item::Enum(e) => self.register_enum(e),
            Item::Trait(t) => self.register_trait(t),
            Item::TraitImpl(i) => self.register_trait_impl(i),
            Item::TypeAlias(a) => self.register_type_alias(a),
            Item::Const(c) => self.register_const(c),
            Item::Policy(p) => self.register_policy(p),
            Item::ExternBlock(b) => self.register_extern_block(b),
            Item::Export(_) => {
                // handled in `register_all` once every other name is in place
            }
        }
    }

    /// Build and validate a function's signature without registering it
    /// anywhere, callers decide whether it belongs in the global function
    /// table (free functions) or a struct's method table (everything
    /// declared inside a `struct`/`impl`, receiver or not, since a struct's
    /// own associated functions shouldn't collide with another struct's
    /// function of the same name).
    fn build_function_sig(&mut self, f: &vex_ast::Function, is_extern: bool) -> FunctionSig {
        let span = Span::unknown();
        let target = TargetInfo {
            context: AnnotationContext::FUNCTION,
            is_extern,
        };
        for diag in annotations::validate_all(&f.annotations, target, span.clone()) {
            self.emit(diag);
        }
        for diag in annotations::validate_all(
            &f.return_annotations,
            TargetInfo {
                context: AnnotationContext::RETURN_TYPE,
                is_extern,
            },
            span.clone(),
        ) {
            self.emit(diag);
        }
        for param in &f.params {
            for diag in annotations::validate_all(
                &param.annotations,
                TargetInfo {
                    context: AnnotationContext::PARAMETER,
                    is_extern,
                },
                span.clone(),
            ) {
                self.emit(diag);
            }
        }

        let mut params = Vec::with_capacity(f.params.len() + 1);
        let has_receiver = f.receiver.is_some();
        if let Some(receiver) = &f.receiver {
            params.push(self.resolve_type(&receiver.ty, span.clone()));
        }
        for param in &f.params {
            params.push(self.resolve_type(&param.ty, span.clone()));
        }
        let return_type = match &f.return_type {
            Some(ty) => self.resolve_type(ty, span.clone()),
            None => self.registry.void(),
        };

        FunctionSig {
            params,
            return_type,
            has_receiver,
            is_extern,
            is_async: f.is_async,
            variadic: f.is_variadic,
        }
    }

    /// Register a free (top-level, non-method) function's signature into
    /// both the global function table and the global scope.
    fn register_function(&mut self, f: &vex_ast::Function) {
        let sig = self.build_function_sig(f, false);
        self.functions.insert(f.name.clone(), sig.clone());
        let fn_ty = self
            .registry
            .function(sig.callable_params().to_vec(), sig.return_type.clone());
        let entry = SymbolEntry::new(f.name.clone(), SymbolKind::Function, fn_ty, Span::unknown());
        self.insert_global_checked(entry, Span::unknown());
    }

    fn register_struct(&mut self, s: &AstStruct) {
        let span = Span::unknown();
        for diag in annotations::validate_all(
            &s.annotations,
            TargetInfo {
                context: AnnotationContext::STRUCT,
                is_extern: false,
            },
            span.clone(),
        ) {
            self.emit(diag);
        }

        let descriptor = self.resolve_struct(&s.name, span.clone());
        let mut table = self.method_tables.remove(&s.name).unwrap_or_default();
        for method in &s.methods {
            let sig = self.build_function_sig(method, false);
            table.insert(method.name.clone(), sig);
        }
        self.method_tables.insert(s.name.clone(), table);

        let entry = SymbolEntry::new(s.name.clone(), SymbolKind::Struct, descriptor, span);
        self.insert_global_checked(entry, Span::unknown());
    }

    fn register_enum(&mut self, e: &AstEnum) {
        let span = Span::unknown();
        for diag in annotations::validate_all(
            &e.annotations,
            TargetInfo {
                context: AnnotationContext::ENUM,
                is_extern: false,
            },
            span.clone(),
        ) {
            self.emit(diag);
        }

        let descriptor = self.resolve_enum(&e.name, span.clone());
        let entry = SymbolEntry::new(e.name.clone(), SymbolKind::Enum, descriptor, span);
        self.insert_global_checked(entry, Span::unknown());
    }

    /// Traits aren't laid out as a `TypeDescriptor` of their own, Vex has no
    /// trait-object type, only concrete types that implement one, so this
    /// only records the name for duplicate-declaration and existence checks;
    /// method signatures are taken from whichever struct implements them.
    fn register_trait(&mut self, t: &vex_ast::Trait) {
        let span = Span::unknown();
        let marker = self.registry.void();
        let entry = SymbolEntry::new(t.name.clone(), SymbolKind::Trait, marker, span);
        self.insert_global_checked(entry, Span::unknown());
    }

    fn register_trait_impl(&mut self, i: &vex_ast::TraitImpl) {
        let span = Span::unknown();
        let for_ty = self.resolve_type(&i.for_type, span.clone());
        let type_name = for_ty.name_hint();
        let mut table = self.method_tables.remove(&type_name).unwrap_or_default();
        for method in &i.methods {
            let sig = self.build_function_sig(method, false);
            table.insert(method.name.clone(), sig);
        }
        self.method_tables.insert(type_name, table);
    }

    fn register_type_alias(&mut self, a: &vex_ast::TypeAlias) {
        let span = Span::unknown();
        let resolved = self.resolve_type(&a.ty, span);
        self.type_aliases.insert(a.name.clone(), resolved.clone());
        self.named_types.insert(a.name.clone(), resolved);
    }

    fn register_const(&mut self, c: &vex_ast::Const) {
        let span = Span::unknown();
        for diag in annotations::validate_all(
            &c.annotations,
            TargetInfo {
                context: AnnotationContext::CONST,
                is_extern: false,
            },
            span.clone(),
        ) {
            self.emit(diag);
        }

        let declared_ty = c.ty.as_ref().map(|ty| self.resolve_type(ty, span.clone()));

        let ty = match crate::const_eval::evaluate(&c.value, &self.const_env, span.clone()) {
            Ok(value) => {
                let inferred = self.const_value_type(&value);
                self.const_env.define(c.name.clone(), value);
                declared_ty.unwrap_or(inferred)
            }
            Err(_) => declared_ty.unwrap_or_else(|| self.analyze_expression(&c.value, None)),
        };

        let entry = SymbolEntry::new(c.name.clone(), SymbolKind::Const, ty, span);
        self.insert_global_checked(entry, Span::unknown());
    }

    fn const_value_type(&self, value: &crate::const_eval::ConstValue) -> Arc<TypeDescriptor> {
        use crate::const_eval::ConstValue;
        use crate::type_descriptor::PrimitiveType;
        match value {
            ConstValue::Int(_) => self.registry.primitive(PrimitiveType::I32),
            ConstValue::Float(_) => self.registry.primitive(PrimitiveType::F64),
            ConstValue::Bool(_) => self.registry.primitive(PrimitiveType::Bool),
            ConstValue::Str(_) => self.registry.primitive(PrimitiveType::String),
        }
    }

    /// A policy is a schema of metadata tags, not a typed value, it has no
    /// `TypeDescriptor` of its own, so only its name is tracked (duplicate
    /// detection, `@policy(...)`-style references).
    fn register_policy(&mut self, p: &vex_ast::Policy) {
        let span = Span::unknown();
        let marker = self.registry.void();
        let entry = SymbolEntry::new(p.name.clone(), SymbolKind::Policy, marker, span);
        self.insert_global_checked(entry, Span::unknown());
    }

    fn register_extern_block(&mut self, b: &vex_ast::ExternBlock) {
        let span = Span::unknown();
        for ty in &b.types {
            let descriptor = match &ty.alias {
                Some(aliased) => self.resolve_type(aliased, span.clone()),
                None => self.registry.struct_new(ty.name.clone(), vec![]),
            };
            self.named_types.insert(ty.name.clone(), descriptor.clone());
            let entry = SymbolEntry::new(ty.name.clone(), SymbolKind::TypeAlias, descriptor, span.clone());
            self.insert_global_checked(entry, span.clone());
        }

        for f in &b.functions {
            for diag in annotations::validate_all(
                &f.return_annotations,
                TargetInfo {
                    context: AnnotationContext::RETURN_TYPE,
                    is_extern: true,
                },
                span.clone(),
            ) {
                self.emit(diag);
            }
            for param in &f.params {
                for diag in annotations::validate_all(
                    &param.annotations,
                    TargetInfo {
                        context: AnnotationContext::PARAMETER,
                        is_extern: true,
                    },
                    span.clone(),
                ) {
                    self.emit(diag);
                }
            }

            let params = f.params.iter().map(|p| self.resolve_type(&p.ty, span.clone())).collect();
            let return_type = match &f.return_type {
                Some(ty) => self.resolve_type(ty, span.clone()),
                None => self.registry.void(),
            };
            let sig = FunctionSig {
                params,
                return_type: return_type.clone(),
                has_receiver: false,
                is_extern: true,
                is_async: false,
                variadic: f.is_variadic,
            };
            let fn_ty = self.registry.function(sig.callable_params().to_vec(), return_type);
            self.functions.insert(f.name.clone(), sig);
            let entry = SymbolEntry::new(f.name.clone(), SymbolKind::ExternFunction, fn_ty, span.clone());
            self.insert_global_checked(entry, span.clone());
        }
    }

    /// Declaration-analysis pass 2: walk every function/method body now that
    /// every name a body could reference has been registered.
    pub(crate) fn analyze_item(&mut self, item: &Item) {
        match item {
            Item::Function(f) => self.analyze_function_body(f),
            Item::Struct(s) => {
                for method in &s.methods {
                    self.analyze_function_body(method);
                }
            }
            Item::TraitImpl(i) => {
                for method in &i.methods {
                    self.analyze_function_body(method);
                }
            }
            Item::Trait(t) => {
                for method in &t.methods {
                    if let Some(body) = &method.body {
                        self.analyze_trait_default_body(method, body);
                    }
                }
            }
            Item::ExternBlock(_) | Item::TypeAlias(_) | Item::Enum(_) | Item::Const(_) | Item::Policy(_) | Item::Export(_) => {}
        }
    }

    fn analyze_function_body(&mut self, f: &vex_ast::Function) {
        self.analyze_body_common(&f.params, &f.receiver, &f.return_type, &f.body);
    }

    fn analyze_trait_default_body(&mut self, m: &vex_ast::TraitMethod, body: &vex_ast::Block) {
        self.analyze_body_common(&m.params, &m.receiver, &m.return_type, body);
    }

    fn analyze_body_common(
        &mut self,
        params: &[vex_ast::Param],
        receiver: &Option<vex_ast::Receiver>,
        return_type: &Option<vex_ast::Type>,
        body: &vex_ast::Block,
    ) {
        let span = Span::unknown();
        let return_ty = match return_type {
            Some(ty) => self.resolve_type(ty, span.clone()),
            None => self.registry.void(),
        };

        self.symbols.enter_scope();
        self.unsafe_depth = 0;
        self.loop_depth = 0;
        let previous_return = self.current_return_type.replace(return_ty);

        if let Some(receiver) = receiver {
            let ty = self.resolve_type(&receiver.ty, span.clone());
            let entry = SymbolEntry::new("self", SymbolKind::Parameter, ty, span.clone());
            let entry = if receiver.is_mutable { entry.mutable() } else { entry };
            let _ = self.symbols.insert(entry);
        }
        for param in params {
            let ty = self.resolve_type(&param.ty, span.clone());
            let entry = SymbolEntry::new(param.name.clone(), SymbolKind::Parameter, ty, span.clone())
                .mutable();
            let _ = self.symbols.insert(entry);
        }

        self.analyze_block(body);

        self.current_return_type = previous_return;
        let _ = self.symbols.exit_scope();
    }
}

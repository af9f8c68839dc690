//! Expression analysis (C4, spec.md §4.4's per-category contracts).
//!
//! `analyze_expression` always returns a type: on success the type the
//! expression actually carries, on failure `TypeDescriptor::Never` after at
//! least one diagnostic has been recorded, `Never` is compatible with
//! everything (§4.1), so a failed subexpression doesn't cascade spurious
//! mismatches into its parent.

use std::sync::Arc;

use vex_ast::{BinaryOp, Expression, UnaryOp};
use vex_diagnostics::{error_codes, Diagnostic, DiagnosticMetadata, Span};

use crate::analyzer::SemanticAnalyzer;
use crate::symbol::SymbolKind;
use crate::type_descriptor::{PrimitiveType, TypeDescriptor};

impl SemanticAnalyzer {
    /// `expected` is the type context a caller already knows about (the
    /// declared type of a `let`, the other side of a binary op, ...), used
    /// for literal defaulting and generic inference (spec.md §4.4).
    pub fn analyze_expression(
        &mut self,
        expr: &Expression,
        expected: Option<Arc<TypeDescriptor>>,
    ) -> Arc<TypeDescriptor> {
        match expr {
            Expression::IntLiteral(_) => match &expected {
                Some(ty) if matches!(ty.as_ref(), TypeDescriptor::Primitive(p) if p.is_integer()) => {
                    ty.clone()
                }
                _ => self.registry.primitive(PrimitiveType::I32),
            },
            Expression::FloatLiteral(_) => match &expected {
                Some(ty) if matches!(ty.as_ref(), TypeDescriptor::Primitive(p) if p.is_float()) => {
                    ty.clone()
                }
                _ => self.registry.primitive(PrimitiveType::F64),
            },
            Expression::StringLiteral(_) | Expression::FStringLiteral(_) => {
                self.registry.primitive(PrimitiveType::String)
            }
            Expression::BoolLiteral(_) => self.registry.primitive(PrimitiveType::Bool),
            Expression::Nil => self.registry.void(),

            Expression::Ident(name) => self.analyze_ident(name, Span::unknown()),

            Expression::Binary {
                span_id,
                left,
                op,
                right,
            } => {
                let span = self.resolve_span(span_id);
                self.analyze_binary(left, op.clone(), right, span)
            }

            Expression::Unary { span_id, op, expr } => {
                let span = self.resolve_span(span_id);
                self.analyze_unary(op.clone(), expr, span)
            }

            Expression::Call {
                span_id,
                func,
                type_args: _,
                args,
            } => {
                let span = self.resolve_span(span_id);
                self.analyze_call(func, args, expected, span)
            }

            Expression::MethodCall {
                receiver,
                method,
                args,
                is_mutable_call: _,
            } => self.analyze_method_call(receiver, method, args, Span::unknown()),

            Expression::FieldAccess { object, field } => {
                self.analyze_field_access(object, field, Span::unknown())
            }

            Expression::Index { object, index } => self.analyze_index(object, index, Span::unknown()),

            Expression::Array(elements) => self.analyze_array_literal(elements, expected, Span::unknown()),

            Expression::ArrayRepeat(value, count) => {
                self.analyze_array_repeat(value, count, expected, Span::unknown())
            }

            Expression::MapLiteral(entries) => {
                let span = Span::unknown();
                let mut key_ty = self.registry.never();
                let mut val_ty = self.registry.never();
                for (i, (k, v)) in entries.iter().enumerate() {
                    let kt = self.analyze_expression(k, None);
                    let vt = self.analyze_expression(v, None);
                    if i == 0 {
                        key_ty = kt;
                        val_ty = vt;
                    }
                }
                self.registry.generic_instance("Map", vec![key_ty, val_ty])
            }

            Expression::TupleLiteral(items) => {
                if items.len() < 2 {
                    self.emit(Diagnostic::error(
                        error_codes::TYPE_MISMATCH,
                        "a tuple literal needs at least two elements".to_string(),
                        Span::unknown(),
                    ));
                }
                let types = items.iter().map(|i| self.analyze_expression(i, None)).collect();
                self.registry.tuple(types)
            }

            Expression::StructLiteral {
                name,
                type_args: _,
                fields,
            } => self.analyze_struct_literal(name, fields, Span::unknown()),

            Expression::EnumLiteral {
                enum_name,
                variant,
                data,
            } => self.analyze_enum_literal(enum_name, variant, data, expected, Span::unknown()),

            Expression::Range { start, end } | Expression::RangeInclusive { start, end } => {
                let elem = match start.as_deref().or(end.as_deref()) {
                    Some(e) => self.analyze_expression(e, None),
                    None => self.registry.primitive(PrimitiveType::I32),
                };
                if let Some(s) = start {
                    self.analyze_expression(s, Some(elem.clone()));
                }
                if let Some(e) = end {
                    self.analyze_expression(e, Some(elem.clone()));
                }
                self.registry.generic_instance("Range", vec![elem])
            }

            Expression::Reference { is_mutable, expr } => {
                let inner = self.analyze_expression(expr, None);
                self.registry.pointer(inner, *is_mutable)
            }

            Expression::Deref(inner) => self.analyze_deref(inner, Span::unknown()),

            Expression::Await(inner) => self.analyze_await(inner, Span::unknown()),

            Expression::Match { value, arms } => self.analyze_match(value, arms, Span::unknown()),

            Expression::Block {
                statements,
                return_expr,
            } => {
                self.symbols.enter_scope();
                for stmt in statements {
                    self.analyze_statement(stmt);
                }
                let ty = match return_expr {
                    Some(expr) => self.analyze_expression(expr, expected),
                    None => self.registry.void(),
                };
                if self.symbols.exit_scope().is_err() {
                    log::error!("scope underflow exiting a block expression");
                }
                ty
            }

            Expression::Launch { grid, args, .. } => {
                for g in grid {
                    self.analyze_expression(g, None);
                }
                for a in args {
                    self.analyze_expression(a, None);
                }
                self.registry.void()
            }

            Expression::New(inner) => self.analyze_expression(inner, expected),

            Expression::Make { element_type, size } => {
                let span = Span::unknown();
                let elem = self.resolve_type(element_type, span.clone());
                self.require_const_positive_int(size, span);
                self.registry.slice(elem)
            }

            Expression::Cast { expr, target_type } => self.analyze_cast(expr, target_type, Span::unknown()),

            Expression::QuestionMark(inner) => self.analyze_question_mark(inner, Span::unknown()),

            Expression::Typeof(inner) => self.analyze_expression(inner, None),

            Expression::PostfixOp { expr, .. } => self.analyze_expression(expr, None),

            Expression::ErrorNew(inner) => {
                self.analyze_expression(inner, None);
                self.registry.primitive(PrimitiveType::String)
            }

            Expression::Closure {
                params,
                return_type,
                body,
                capture_mode: _,
            } => self.analyze_closure(params, return_type, body, Span::unknown()),

            Expression::Annotated(annotations, inner) => {
                let diags = crate::annotations::validate_all(
                    annotations,
                    crate::annotations::TargetInfo {
                        context: crate::annotations::AnnotationContext::EXPRESSION,
                        is_extern: false,
                    },
                    Span::unknown(),
                );
                for d in diags {
                    self.emit(d);
                }
                self.analyze_expression(inner, expected)
            }
        }
    }

    fn analyze_ident(&mut self, name: &str, span: Span) -> Arc<TypeDescriptor> {
        if let Some(target) = self.symbols.resolve_module_alias(name) {
            let target = target.to_string();
            return self.registry.generic_instance(format!("module:{target}"), vec![]);
        }

        match self.symbols.lookup_recursive_mut(name) {
            Some(entry) => {
                entry.used = true;
                entry.ty.clone()
            }
            None => {
                let candidates = self.symbols.names_in_scope_chain();
                let similar = crate::suggest::similar_names(name, candidates);
                let mut diag = Diagnostic::error(
                    error_codes::UNDEFINED_VARIABLE,
                    format!("cannot find value `{name}` in this scope"),
                    span.clone(),
                );
                // Closest match only: a pile of low-confidence guesses is
                // noise, not help.
                if let Some(best) = similar.first() {
                    diag = diag.with_suggestion_confidence(
                        format!("replace `{name}` with `{best}`"),
                        best.clone(),
                        span,
                        vex_diagnostics::Confidence::High,
                        None,
                    );
                }
                self.emit(diag);
                self.registry.never()
            }
        }
    }

    fn analyze_binary(
        &mut self,
        left: &Expression,
        op: BinaryOp,
        right: &Expression,
        span: Span,
    ) -> Arc<TypeDescriptor> {
        let left_ty = self.analyze_expression(left, None);
        let right_ty = self.analyze_expression(right, Some(left_ty.clone()));

        if left_ty.is_never() || right_ty.is_never() {
            return self.registry.never();
        }

        use BinaryOp::*;
        let is_comparison = matches!(op, Eq | NotEq | Lt | LtEq | Gt | GtEq);
        let is_logical = matches!(op, And | Or);

        if is_logical {
            let bool_ty = self.registry.primitive(PrimitiveType::Bool);
            if *left_ty != *bool_ty || *right_ty != *bool_ty {
                self.type_mismatch_binary(&left_ty, &right_ty, op, span);
                return self.registry.never();
            }
            return bool_ty;
        }

        if is_comparison {
            if !self.registry.compatible(&left_ty, &right_ty)
                && self.numeric_result(&left_ty, &right_ty).is_none()
            {
                self.type_mismatch_binary(&left_ty, &right_ty, op, span);
                return self.registry.never();
            }
            return self.registry.primitive(PrimitiveType::Bool);
        }

        // String concatenation is the sole non-numeric arithmetic operator.
        if op == Add {
            let string_ty = self.registry.primitive(PrimitiveType::String);
            if *left_ty == *string_ty && *right_ty == *string_ty {
                return string_ty;
            }
        }

        match self.numeric_result(&left_ty, &right_ty) {
            Some((ty, warning)) => {
                if let Some(message) = warning {
                    self.emit(Diagnostic::warning(error_codes::INVALID_CAST, message, span));
                }
                ty
            }
            None => {
                self.type_mismatch_binary(&left_ty, &right_ty, op, span);
                self.registry.never()
            }
        }
    }

    fn numeric_result(
        &self,
        left: &Arc<TypeDescriptor>,
        right: &Arc<TypeDescriptor>,
    ) -> Option<(Arc<TypeDescriptor>, Option<String>)> {
        let (TypeDescriptor::Primitive(l), TypeDescriptor::Primitive(r)) = (left.as_ref(), right.as_ref())
        else {
            return None;
        };
        self.registry.promote_numeric(*l, *r, self.in_unsafe_context())
    }

    fn type_mismatch_binary(&mut self, left: &Arc<TypeDescriptor>, right: &Arc<TypeDescriptor>, op: BinaryOp, span: Span) {
        self.emit(Diagnostic::error(
            error_codes::TYPE_MISMATCH,
            format!(
                "cannot apply `{op:?}` between `{}` and `{}`",
                left.name_hint(),
                right.name_hint()
            ),
            span,
        ));
    }

    fn analyze_unary(&mut self, op: UnaryOp, expr: &Expression, span: Span) -> Arc<TypeDescriptor> {
        let ty = self.analyze_expression(expr, None);
        if ty.is_never() {
            return ty;
        }
        match op {
            UnaryOp::Neg => {
                if matches!(ty.as_ref(), TypeDescriptor::Primitive(p) if p.is_integer() || p.is_float()) {
                    ty
                } else {
                    self.emit(Diagnostic::error(
                        error_codes::TYPE_MISMATCH,
                        format!("cannot negate a `{}`", ty.name_hint()),
                        span,
                    ));
                    self.registry.never()
                }
            }
            UnaryOp::Not => {
                let bool_ty = self.registry.primitive(PrimitiveType::Bool);
                if *ty == *bool_ty {
                    bool_ty
                } else {
                    self.emit(Diagnostic::error(
                        error_codes::TYPE_MISMATCH,
                        format!("cannot apply `!` to a `{}`", ty.name_hint()),
                        span,
                    ));
                    self.registry.never()
                }
            }
            UnaryOp::Ref => self.registry.pointer(ty, false),
            UnaryOp::Deref => self.deref_pointer(ty, span),
        }
    }

    fn deref_pointer(&mut self, ty: Arc<TypeDescriptor>, span: Span) -> Arc<TypeDescriptor> {
        let TypeDescriptor::Pointer { inner, .. } = ty.as_ref() else {
            self.emit(Diagnostic::error(
                error_codes::INVALID_CAST,
                format!("cannot dereference a `{}`", ty.name_hint()),
                span,
            ));
            return self.registry.never();
        };
        if !self.in_unsafe_context() {
            self.emit(
                Diagnostic::error(
                    error_codes::UNSAFE_OPERATION,
                    "dereferencing a raw pointer requires an `unsafe` block".to_string(),
                    span,
                )
                .with_help("wrap this expression in `unsafe { ... }`".to_string()),
            );
            return self.registry.never();
        }
        inner.clone()
    }

    fn analyze_deref(&mut self, inner: &Expression, span: Span) -> Arc<TypeDescriptor> {
        let ty = self.analyze_expression(inner, None);
        if ty.is_never() {
            return ty;
        }
        self.deref_pointer(ty, span)
    }

    fn analyze_call(
        &mut self,
        func: &Expression,
        args: &[Expression],
        expected: Option<Arc<TypeDescriptor>>,
        span: Span,
    ) -> Arc<TypeDescriptor> {
        // `spawn_with_handle(f(...))`: the sole predeclared identifier that
        // synthesizes a `TaskHandle<T>` (SPEC_FULL.md §3, spec.md Invariant 4).
        if let Expression::Ident(name) = func {
            if name == "spawn_with_handle" {
                return self.analyze_spawn_with_handle(args, span);
            }
        }

        if let Expression::FieldAccess { object, field } = func {
            return self.analyze_method_call(object, field, args, span);
        }

        let Expression::Ident(name) = func else {
            self.emit(Diagnostic::error(
                error_codes::NO_SUCH_METHOD,
                "expression is not callable".to_string(),
                span,
            ));
            for a in args {
                self.analyze_expression(a, None);
            }
            return self.registry.never();
        };

        // `EnumName.Variant(...)` reaches here only when the parser didn't
        // already produce an `EnumLiteral`; fall through to a plain function
        // lookup, which is the common case.
        let Some(sig) = self.functions.get(name).cloned() else {
            let candidates: Vec<String> = self.functions.keys().cloned().collect();
            self.engine
                .undefined_variable(name, span, crate::suggest::similar_names(name, &candidates));
            for a in args {
                self.analyze_expression(a, None);
            }
            return self.registry.never();
        };

        self.check_call_args(&sig, args, span);
        let _ = expected;
        sig.return_type.clone()
    }

    fn check_call_args(&mut self, sig: &crate::analyzer::FunctionSig, args: &[Expression], span: Span) {
        let params = sig.callable_params();
        if !sig.variadic && params.len() != args.len() {
            self.emit(Diagnostic::error(
                error_codes::ARGUMENT_COUNT,
                format!("expected {} argument(s), found {}", params.len(), args.len()),
                span,
            ));
            for a in args {
                self.analyze_expression(a, None);
            }
            return;
        }
        for (i, arg) in args.iter().enumerate() {
            let expected = params.get(i).cloned();
            let arg_ty = self.analyze_expression(arg, expected.clone());
            if let Some(expected) = expected {
                if !arg_ty.is_never() && !self.registry.compatible(&expected, &arg_ty) {
                    self.emit(Diagnostic::error(
                        error_codes::WRONG_ARG_TYPE,
                        format!(
                            "argument {} has type `{}`, expected `{}`",
                            i + 1,
                            arg_ty.name_hint(),
                            expected.name_hint()
                        ),
                        span.clone(),
                    ));
                }
            }
        }
    }

    fn analyze_spawn_with_handle(&mut self, args: &[Expression], span: Span) -> Arc<TypeDescriptor> {
        if args.len() != 1 {
            self.emit(Diagnostic::error(
                error_codes::ARGUMENT_COUNT,
                "`spawn_with_handle` takes exactly one call expression".to_string(),
                span,
            ));
            return self.registry.never();
        }
        let result_ty = self.analyze_expression(&args[0], None);
        self.registry.task_handle(result_ty)
    }

    fn analyze_method_call(
        &mut self,
        receiver: &Expression,
        method: &str,
        args: &[Expression],
        span: Span,
    ) -> Arc<TypeDescriptor> {
        let receiver_ty = self.analyze_expression(receiver, None);
        if receiver_ty.is_never() {
            for a in args {
                self.analyze_expression(a, None);
            }
            return self.registry.never();
        }

        let struct_name = match receiver_ty.as_ref() {
            TypeDescriptor::Struct { name, .. } => name.clone(),
            _ => {
                self.emit(Diagnostic::error(
                    error_codes::NO_SUCH_METHOD,
                    format!("`{}` has no method `{method}`", receiver_ty.name_hint()),
                    span,
                ));
                for a in args {
                    self.analyze_expression(a, None);
                }
                return self.registry.never();
            }
        };

        let Some(sig) = self
            .method_tables
            .get(&struct_name)
            .and_then(|table| table.get(method))
            .cloned()
        else {
            let candidates: Vec<String> = self
                .method_tables
                .get(&struct_name)
                .map(|t| t.keys().cloned().collect())
                .unwrap_or_default();
            self.emit(
                Diagnostic::error(
                    error_codes::NO_SUCH_METHOD,
                    format!("no method `{method}` on `{struct_name}`"),
                    span,
                )
                .with_metadata(DiagnosticMetadata {
                    error_category: Some("NoSuchMethod".to_string()),
                    similar_symbols: crate::suggest::similar_names(method, &candidates),
                    available_methods: candidates,
                    ..Default::default()
                }),
            );
            for a in args {
                self.analyze_expression(a, None);
            }
            return self.registry.never();
        };

        self.check_call_args(&sig, args, span);
        sig.return_type.clone()
    }

    fn analyze_field_access(&mut self, object: &Expression, field: &str, span: Span) -> Arc<TypeDescriptor> {
        // Open question resolved per SPEC_FULL.md §3: `X.Y` is field access
        // when `X` is a variable of struct type; a variant constructor when
        // `X` names an enum type instead.
        if let Expression::Ident(name) = object {
            if self.symbols.lookup_recursive(name).is_none() && self.enum_types.contains_key(name) {
                return self.analyze_enum_literal(name, field, &[], None, span);
            }
        }

        let object_ty = self.analyze_expression(object, None);
        if object_ty.is_never() {
            return object_ty;
        }
        let TypeDescriptor::Struct { fields, name } = object_ty.as_ref() else {
            self.emit(Diagnostic::error(
                error_codes::NO_SUCH_FIELD,
                format!("`{}` has no field `{field}`", object_ty.name_hint()),
                span,
            ));
            return self.registry.never();
        };
        match fields.iter().find(|f| f.name == field) {
            Some(f) => f.ty.clone(),
            None => {
                let candidates: Vec<String> = fields.iter().map(|f| f.name.clone()).collect();
                self.emit(
                    Diagnostic::error(
                        error_codes::NO_SUCH_FIELD,
                        format!("no field `{field}` on `{name}`"),
                        span,
                    )
                    .with_metadata(DiagnosticMetadata {
                        error_category: Some("NoSuchField".to_string()),
                        similar_symbols: crate::suggest::similar_names(field, &candidates),
                        ..Default::default()
                    }),
                );
                self.registry.never()
            }
        }
    }

    fn analyze_index(&mut self, object: &Expression, index: &Expression, span: Span) -> Arc<TypeDescriptor> {
        let object_ty = self.analyze_expression(object, None);
        let index_ty = self.analyze_expression(index, None);
        if object_ty.is_never() {
            return object_ty;
        }

        let is_range_index =
            matches!(index_ty.as_ref(), TypeDescriptor::GenericInstance { name, .. } if name == "Range");

        if !is_range_index
            && !matches!(index_ty.as_ref(), TypeDescriptor::Primitive(p) if p.is_integer())
            && !index_ty.is_never()
        {
            self.emit(Diagnostic::error(
                error_codes::TYPE_MISMATCH,
                format!("index must be an integer, found `{}`", index_ty.name_hint()),
                span.clone(),
            ));
        }
        match object_ty.as_ref() {
            TypeDescriptor::Slice(elem) | TypeDescriptor::Array(elem, _) if is_range_index => {
                self.registry.slice(elem.clone())
            }
            TypeDescriptor::Slice(elem) | TypeDescriptor::Array(elem, _) => elem.clone(),
            TypeDescriptor::Pointer { inner, .. } => {
                if !self.in_unsafe_context() {
                    self.emit(
                        Diagnostic::error(
                            error_codes::UNSAFE_OPERATION,
                            "pointer-indexed access requires an `unsafe` block".to_string(),
                            span,
                        )
                        .with_help("wrap this expression in `unsafe { ... }`".to_string()),
                    );
                    return self.registry.never();
                }
                inner.clone()
            }
            _ => {
                self.emit(Diagnostic::error(
                    error_codes::TYPE_MISMATCH,
                    format!("cannot index into `{}`", object_ty.name_hint()),
                    span,
                ));
                self.registry.never()
            }
        }
    }

    fn analyze_array_literal(
        &mut self,
        elements: &[Expression],
        expected: Option<Arc<TypeDescriptor>>,
        span: Span,
    ) -> Arc<TypeDescriptor> {
        let expected_elem = match &expected {
            Some(ty) => match ty.as_ref() {
                TypeDescriptor::Array(elem, _) | TypeDescriptor::Slice(elem) => Some(elem.clone()),
                _ => None,
            },
            None => None,
        };

        if elements.is_empty() {
            let elem = expected_elem.unwrap_or_else(|| self.registry.never());
            return self.registry.array(elem, 0);
        }

        let first_ty = self.analyze_expression(&elements[0], expected_elem.clone());
        let elem_ty = expected_elem.unwrap_or(first_ty);

        for element in &elements[1..] {
            let ty = self.analyze_expression(element, Some(elem_ty.clone()));
            if !ty.is_never() && !self.registry.compatible(&elem_ty, &ty) {
                self.emit(Diagnostic::error(
                    error_codes::TYPE_MISMATCH,
                    format!(
                        "array element has type `{}`, expected `{}`",
                        ty.name_hint(),
                        elem_ty.name_hint()
                    ),
                    span.clone(),
                ));
            }
        }

        self.registry.array(elem_ty, elements.len())
    }

    fn analyze_array_repeat(
        &mut self,
        value: &Expression,
        count: &Expression,
        expected: Option<Arc<TypeDescriptor>>,
        span: Span,
    ) -> Arc<TypeDescriptor> {
        let expected_elem = expected.and_then(|ty| match ty.as_ref() {
            TypeDescriptor::Array(elem, _) => Some(elem.clone()),
            _ => None,
        });
        let value_ty = self.analyze_expression(value, expected_elem);
        let len = self.require_const_positive_int(count, span);
        self.registry.array(value_ty, len.unwrap_or(0))
    }

    /// Evaluates `expr` as a compile-time constant and requires it to be a
    /// strictly positive integer (spec.md Invariant 5). Returns the length on
    /// success.
    fn require_const_positive_int(&mut self, expr: &Expression, span: Span) -> Option<usize> {
        match crate::const_eval::evaluate(expr, &self.const_env, span.clone()) {
            Ok(crate::const_eval::ConstValue::Int(n)) if n > 0 => Some(n as usize),
            Ok(crate::const_eval::ConstValue::Int(_)) => {
                self.emit(Diagnostic::error(
                    error_codes::NON_EXHAUSTIVE,
                    "array size must be a strictly positive integer".to_string(),
                    span,
                ));
                None
            }
            Ok(_) => {
                self.emit(Diagnostic::error(
                    error_codes::TYPE_MISMATCH,
                    "array size must be an integer constant".to_string(),
                    span,
                ));
                None
            }
            Err(diag) => {
                self.emit(Diagnostic::error(
                    error_codes::NON_EXHAUSTIVE,
                    "array size must be a compile-time constant".to_string(),
                    span,
                ).with_note(diag.message));
                None
            }
        }
    }

    fn analyze_struct_literal(
        &mut self,
        name: &str,
        fields: &[(String, Expression)],
        span: Span,
    ) -> Arc<TypeDescriptor> {
        let Some(struct_ty) = self.struct_types.get(name).cloned() else {
            self.emit(Diagnostic::error(
                error_codes::UNDEFINED_TYPE,
                format!("cannot find struct `{name}` in this scope"),
                span,
            ));
            for (_, v) in fields {
                self.analyze_expression(v, None);
            }
            return self.registry.never();
        };
        let TypeDescriptor::Struct { fields: declared, .. } = struct_ty.as_ref() else {
            unreachable!("struct_types only ever holds Struct descriptors");
        };
        let declared = declared.clone();

        let mut seen = std::collections::HashSet::new();
        for (field_name, value) in fields {
            let expected = declared.iter().find(|f| &f.name == field_name).map(|f| f.ty.clone());
            let value_ty = self.analyze_expression(value, expected.clone());
            match expected {
                Some(expected_ty) => {
                    if !value_ty.is_never() && !self.registry.compatible(&expected_ty, &value_ty) {
                        self.emit(Diagnostic::error(
                            error_codes::TYPE_MISMATCH,
                            format!(
                                "field `{field_name}` has type `{}`, expected `{}`",
                                value_ty.name_hint(),
                                expected_ty.name_hint()
                            ),
                            span.clone(),
                        ));
                    }
                }
                None => {
                    self.emit(Diagnostic::error(
                        error_codes::NO_SUCH_FIELD,
                        format!("struct `{name}` has no field `{field_name}`"),
                        span.clone(),
                    ));
                }
            }
            seen.insert(field_name.clone());
        }
        for field in &declared {
            if !seen.contains(&field.name) {
                self.emit(Diagnostic::error(
                    error_codes::ARGUMENT_COUNT,
                    format!("field `{}` of struct `{name}` is never initialized", field.name),
                    span.clone(),
                ));
            }
        }

        struct_ty
    }

    fn analyze_enum_literal(
        &mut self,
        enum_name: &str,
        variant: &str,
        data: &[Expression],
        expected: Option<Arc<TypeDescriptor>>,
        span: Span,
    ) -> Arc<TypeDescriptor> {
        if enum_name == "Option" {
            let expected_inner = expected.and_then(|ty| match ty.as_ref() {
                TypeDescriptor::GenericInstance { name, args } if name == "Option" => args.first().cloned(),
                _ => None,
            });
            return match variant {
                "Some" => {
                    let inner = data
                        .first()
                        .map(|e| self.analyze_expression(e, expected_inner))
                        .unwrap_or_else(|| self.registry.never());
                    self.registry.generic_instance("Option", vec![inner])
                }
                "None" => {
                    let inner = expected_inner.unwrap_or_else(|| self.registry.never());
                    self.registry.generic_instance("Option", vec![inner])
                }
                other => {
                    self.emit(Diagnostic::error(
                        error_codes::NO_SUCH_FIELD,
                        format!("`Option` has no variant `{other}`"),
                        span,
                    ));
                    self.registry.never()
                }
            };
        }

        if enum_name == "Result" {
            let expected_pair = expected.and_then(|ty| match ty.as_ref() {
                TypeDescriptor::Result { ok, err } => Some((ok.clone(), err.clone())),
                _ => None,
            });
            return match variant {
                "Ok" => {
                    let expected_ok = expected_pair.as_ref().map(|(ok, _)| ok.clone());
                    let ok = data
                        .first()
                        .map(|e| self.analyze_expression(e, expected_ok))
                        .unwrap_or_else(|| self.registry.void());
                    let err = expected_pair.map(|(_, err)| err).unwrap_or_else(|| self.registry.never());
                    self.registry.result(ok, err)
                }
                "Err" => {
                    let expected_err = expected_pair.as_ref().map(|(_, err)| err.clone());
                    let err = data
                        .first()
                        .map(|e| self.analyze_expression(e, expected_err))
                        .unwrap_or_else(|| self.registry.void());
                    let ok = expected_pair.map(|(ok, _)| ok).unwrap_or_else(|| self.registry.never());
                    self.registry.result(ok, err)
                }
                other => {
                    self.emit(Diagnostic::error(
                        error_codes::NO_SUCH_FIELD,
                        format!("`Result` has no variant `{other}`"),
                        span,
                    ));
                    self.registry.never()
                }
            };
        }

        let Some(enum_ty) = self.enum_types.get(enum_name).cloned() else {
            self.emit(Diagnostic::error(
                error_codes::UNDEFINED_TYPE,
                format!("cannot find enum `{enum_name}` in this scope"),
                span,
            ));
            for d in data {
                self.analyze_expression(d, None);
            }
            return self.registry.never();
        };
        let TypeDescriptor::Enum { variants, .. } = enum_ty.as_ref() else {
            unreachable!("enum_types only ever holds Enum descriptors");
        };
        let Some(variant_def) = variants.iter().find(|v| v.name == variant) else {
            let candidates: Vec<String> = variants.iter().map(|v| v.name.clone()).collect();
            self.emit(
                Diagnostic::error(
                    error_codes::NO_SUCH_FIELD,
                    format!("`{enum_name}` has no variant `{variant}`"),
                    span,
                )
                .with_metadata(DiagnosticMetadata {
                    similar_symbols: crate::suggest::similar_names(variant, &candidates),
                    ..Default::default()
                }),
            );
            for d in data {
                self.analyze_expression(d, None);
            }
            return self.registry.never();
        };
        let payload = variant_def.data.clone();
        if payload.len() != data.len() {
            self.emit(Diagnostic::error(
                error_codes::ARGUMENT_COUNT,
                format!(
                    "variant `{enum_name}.{variant}` expects {} value(s), found {}",
                    payload.len(),
                    data.len()
                ),
                span.clone(),
            ));
        }
        for (i, expr) in data.iter().enumerate() {
            let expected = payload.get(i).cloned();
            let ty = self.analyze_expression(expr, expected.clone());
            if let Some(expected) = expected {
                if !ty.is_never() && !self.registry.compatible(&expected, &ty) {
                    self.emit(Diagnostic::error(
                        error_codes::TYPE_MISMATCH,
                        format!(
                            "variant payload {} has type `{}`, expected `{}`",
                            i + 1,
                            ty.name_hint(),
                            expected.name_hint()
                        ),
                        span.clone(),
                    ));
                }
            }
        }
        enum_ty
    }

    fn analyze_await(&mut self, inner: &Expression, span: Span) -> Arc<TypeDescriptor> {
        let ty = self.analyze_expression(inner, None);
        match ty.as_ref() {
            TypeDescriptor::TaskHandle(result) => result.clone(),
            _ if ty.is_never() => ty,
            _ => {
                self.emit(Diagnostic::error(
                    error_codes::TYPE_MISMATCH,
                    format!(
                        "cannot `await` a `{}`; expected a `TaskHandle<T>`",
                        ty.name_hint()
                    ),
                    span,
                ));
                self.registry.never()
            }
        }
    }

    fn analyze_cast(&mut self, expr: &Expression, target_type: &vex_ast::Type, span: Span) -> Arc<TypeDescriptor> {
        let source_ty = self.analyze_expression(expr, None);
        let target_ty = self.resolve_type(target_type, span.clone());
        if source_ty.is_never() {
            return target_ty;
        }

        let numeric_to_numeric = matches!(
            (source_ty.as_ref(), target_ty.as_ref()),
            (TypeDescriptor::Primitive(a), TypeDescriptor::Primitive(b))
                if (a.is_integer() || a.is_float()) && (b.is_integer() || b.is_float())
        );
        let pointer_int_cast = matches!(
            (source_ty.as_ref(), target_ty.as_ref()),
            (TypeDescriptor::Pointer { .. }, TypeDescriptor::Primitive(p)) if p.is_integer()
        ) || matches!(
            (source_ty.as_ref(), target_ty.as_ref()),
            (TypeDescriptor::Primitive(p), TypeDescriptor::Pointer { .. }) if p.is_integer()
        );
        let pointer_to_pointer = matches!(
            (source_ty.as_ref(), target_ty.as_ref()),
            (TypeDescriptor::Pointer { .. }, TypeDescriptor::Pointer { .. })
        );

        if numeric_to_numeric {
            return target_ty;
        }
        if pointer_int_cast || pointer_to_pointer {
            if !self.in_unsafe_context() {
                self.emit(
                    Diagnostic::error(
                        error_codes::UNSAFE_OPERATION,
                        "pointer casts require an `unsafe` block".to_string(),
                        span,
                    )
                    .with_help("wrap this expression in `unsafe { ... }`".to_string()),
                );
                return self.registry.never();
            }
            return target_ty;
        }

        self.emit(Diagnostic::error(
            error_codes::INVALID_CAST,
            format!(
                "cannot cast `{}` as `{}`",
                source_ty.name_hint(),
                target_ty.name_hint()
            ),
            span,
        ));
        self.registry.never()
    }

    fn analyze_question_mark(&mut self, inner: &Expression, span: Span) -> Arc<TypeDescriptor> {
        let ty = self.analyze_expression(inner, None);
        match ty.as_ref() {
            TypeDescriptor::Result { ok, .. } => ok.clone(),
            _ if ty.is_never() => ty,
            _ => {
                self.emit(Diagnostic::error(
                    error_codes::TYPE_MISMATCH,
                    format!("`?` requires a `Result<T, E>`, found `{}`", ty.name_hint()),
                    span,
                ));
                self.registry.never()
            }
        }
    }

    fn analyze_closure(
        &mut self,
        params: &[vex_ast::Param],
        return_type: &Option<vex_ast::Type>,
        body: &Expression,
        span: Span,
    ) -> Arc<TypeDescriptor> {
        self.symbols.enter_scope();
        let mut param_types = Vec::with_capacity(params.len());
        for param in params {
            let ty = self.resolve_type(&param.ty, span.clone());
            param_types.push(ty.clone());
            let entry = crate::symbol::SymbolEntry::new(
                param.name.clone(),
                SymbolKind::Parameter,
                ty,
                span.clone(),
            );
            if self.symbols.insert(entry).is_err() {
                self.emit(Diagnostic::error(
                    error_codes::DUPLICATE_DEFINITION,
                    format!("parameter `{}` is bound more than once", param.name),
                    span.clone(),
                ));
            }
        }
        let declared_return = return_type.as_ref().map(|t| self.resolve_type(t, span.clone()));
        let body_ty = self.analyze_expression(body, declared_return.clone());
        if self.symbols.exit_scope().is_err() {
            log::error!("scope underflow exiting a closure body");
        }
        let return_ty = declared_return.unwrap_or(body_ty);
        self.registry.function(param_types, return_ty)
    }

    fn analyze_match(&mut self, value: &Expression, arms: &[vex_ast::MatchArm], span: Span) -> Arc<TypeDescriptor> {
        let scrutinee_ty = self.analyze_expression(value, None);

        let mut result_ty: Option<Arc<TypeDescriptor>> = None;
        let mut covered_variants = std::collections::HashSet::new();
        let mut has_wildcard = false;

        for arm in arms {
            self.symbols.enter_scope();
            self.bind_pattern(&arm.pattern, &scrutinee_ty, span.clone());
            if let vex_ast::Pattern::Wildcard | vex_ast::Pattern::Ident(_) = &arm.pattern {
                has_wildcard = true;
            }
            if let vex_ast::Pattern::Enum { variant, .. } = &arm.pattern {
                covered_variants.insert(variant.clone());
            }
            if let Some(guard) = &arm.guard {
                self.analyze_expression(guard, Some(self.registry.primitive(PrimitiveType::Bool)));
            }
            let arm_ty = self.analyze_expression(&arm.body, result_ty.clone());
            if self.symbols.exit_scope().is_err() {
                log::error!("scope underflow exiting a match arm");
            }
            result_ty = match result_ty {
                None => Some(arm_ty),
                Some(existing) if existing.is_never() => Some(arm_ty),
                Some(existing) => {
                    if !arm_ty.is_never() && !self.registry.compatible(&existing, &arm_ty) {
                        self.emit(Diagnostic::error(
                            error_codes::TYPE_MISMATCH,
                            format!(
                                "match arms have incompatible types: `{}` and `{}`",
                                existing.name_hint(),
                                arm_ty.name_hint()
                            ),
                            span.clone(),
                        ));
                    }
                    Some(existing)
                }
            };
        }

        if let TypeDescriptor::Enum { variants, name } = scrutinee_ty.as_ref() {
            if !has_wildcard && covered_variants.len() < variants.len() {
                self.emit(Diagnostic::error(
                    error_codes::NON_EXHAUSTIVE,
                    format!("match over `{name}` is not exhaustive"),
                    span,
                ));
            }
        }

        result_ty.unwrap_or_else(|| self.registry.void())
    }

    fn bind_pattern(&mut self, pattern: &vex_ast::Pattern, scrutinee_ty: &Arc<TypeDescriptor>, span: Span) {
        match pattern {
            vex_ast::Pattern::Ident(name) => {
                let entry = crate::symbol::SymbolEntry::new(
                    name.clone(),
                    SymbolKind::Variable,
                    scrutinee_ty.clone(),
                    span,
                );
                let _ = self.symbols.insert(entry);
            }
            vex_ast::Pattern::Tuple(items) => {
                if let TypeDescriptor::Tuple(elems) = scrutinee_ty.as_ref() {
                    for (pat, ty) in items.iter().zip(elems.iter()) {
                        self.bind_pattern(pat, ty, span.clone());
                    }
                } else {
                    for pat in items {
                        self.bind_pattern(pat, scrutinee_ty, span.clone());
                    }
                }
            }
            vex_ast::Pattern::Enum { variant, data, .. } => {
                if let TypeDescriptor::Enum { variants, .. } = scrutinee_ty.as_ref() {
                    if let Some(def) = variants.iter().find(|v| v.name == *variant) {
                        for (pat, ty) in data.iter().zip(def.data.iter()) {
                            self.bind_pattern(pat, ty, span.clone());
                        }
                    }
                }
            }
            vex_ast::Pattern::Struct { fields, .. } => {
                if let TypeDescriptor::Struct { fields: declared, .. } = scrutinee_ty.as_ref() {
                    for (fname, pat) in fields {
                        if let Some(f) = declared.iter().find(|d| &d.name == fname) {
                            self.bind_pattern(pat, &f.ty, span.clone());
                        }
                    }
                }
            }
            vex_ast::Pattern::Array { elements, rest } => {
                if let TypeDescriptor::Array(elem, _) | TypeDescriptor::Slice(elem) = scrutinee_ty.as_ref() {
                    for pat in elements {
                        self.bind_pattern(pat, elem, span.clone());
                    }
                    if let Some(rest_name) = rest {
                        let slice_ty = self.registry.slice(elem.clone());
                        let entry = crate::symbol::SymbolEntry::new(
                            rest_name.clone(),
                            SymbolKind::Variable,
                            slice_ty,
                            span,
                        );
                        let _ = self.symbols.insert(entry);
                    }
                }
            }
            vex_ast::Pattern::Or(alts) => {
                for pat in alts {
                    self.bind_pattern(pat, scrutinee_ty, span.clone());
                }
            }
            vex_ast::Pattern::Wildcard | vex_ast::Pattern::Literal(_) => {}
        }
    }
}

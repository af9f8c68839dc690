//! Statement analysis (C4's other half): control flow, bindings, and the
//! `unsafe`/loop-depth bookkeeping the expression walker consults.

use vex_ast::{CompoundOp, Statement};
use vex_diagnostics::{error_codes, Diagnostic, Span};

use crate::analyzer::SemanticAnalyzer;
use crate::symbol::{SymbolEntry, SymbolKind};
use crate::type_descriptor::{PrimitiveType, TypeDescriptor};

impl SemanticAnalyzer {
    /// Returns `true` if the statement is a guaranteed-diverging path (a bare
    /// `return`, `break`, `continue`, or a call to something typed `Never`),
    /// used by the Declaration Analyzer's unreachable-code check, not
    /// required for typing on its own.
    pub fn analyze_statement(&mut self, stmt: &Statement) -> bool {
        match stmt {
            Statement::Let {
                is_mutable,
                name,
                ty,
                value,
            } => {
                let span = Span::unknown();
                let declared = ty.as_ref().map(|t| self.resolve_type(t, span.clone()));
                let value_ty = self.analyze_expression(value, declared.clone());
                let binding_ty = declared.unwrap_or_else(|| value_ty.clone());
                if !value_ty.is_never() && !self.registry.compatible(&binding_ty, &value_ty) {
                    self.emit(Diagnostic::error(
                        error_codes::TYPE_MISMATCH,
                        format!(
                            "cannot assign a `{}` to `{name}` of type `{}`",
                            value_ty.name_hint(),
                            binding_ty.name_hint()
                        ),
                        span.clone(),
                    ));
                }
                let mut entry = SymbolEntry::new(name.clone(), SymbolKind::Variable, binding_ty, span.clone());
                if *is_mutable {
                    entry = entry.mutable();
                }
                if self.symbols.insert(entry).is_err() {
                    self.emit(Diagnostic::error(
                        error_codes::DUPLICATE_DEFINITION,
                        format!("`{name}` is already declared in this scope"),
                        span,
                    ));
                }
                false
            }

            Statement::Assign { target, value } => {
                let span = Span::unknown();
                let target_ty = self.analyze_lvalue(target, span.clone());
                let value_ty = self.analyze_expression(value, Some(target_ty.clone()));
                if !value_ty.is_never() && !target_ty.is_never() && !self.registry.compatible(&target_ty, &value_ty) {
                    self.emit(Diagnostic::error(
                        error_codes::TYPE_MISMATCH,
                        format!(
                            "cannot assign a `{}` to a `{}`",
                            value_ty.name_hint(),
                            target_ty.name_hint()
                        ),
                        span,
                    ));
                }
                false
            }

            Statement::CompoundAssign { target, op, value } => {
                let span = Span::unknown();
                let target_ty = self.analyze_lvalue(target, span.clone());
                let value_ty = self.analyze_expression(value, Some(target_ty.clone()));
                if !target_ty.is_never() && !value_ty.is_never() {
                    let result = self.compound_assign_result(&target_ty, op, &value_ty);
                    if result.is_none() {
                        self.emit(Diagnostic::error(
                            error_codes::TYPE_MISMATCH,
                            format!(
                                "cannot apply `{op:?}` to a `{}` with a `{}`",
                                target_ty.name_hint(),
                                value_ty.name_hint()
                            ),
                            span,
                        ));
                    }
                }
                false
            }

            Statement::Return(expr) => {
                let span = Span::unknown();
                let returned = match expr {
                    Some(e) => self.analyze_expression(e, self.current_return_type.clone()),
                    None => self.registry.void(),
                };
                if let Some(expected) = self.current_return_type.clone() {
                    if !returned.is_never() && !self.registry.compatible(&expected, &returned) {
                        self.emit(Diagnostic::error(
                            error_codes::RETURN_TYPE,
                            format!(
                                "returns a `{}`, expected `{}`",
                                returned.name_hint(),
                                expected.name_hint()
                            ),
                            span,
                        ));
                    }
                }
                true
            }

            Statement::Break => {
                if !self.in_loop() {
                    self.emit(Diagnostic::error(
                        error_codes::SYNTAX_ERROR,
                        "`break` used outside of a loop".to_string(),
                        Span::unknown(),
                    ));
                }
                true
            }

            Statement::Continue => {
                if !self.in_loop() {
                    self.emit(Diagnostic::error(
                        error_codes::SYNTAX_ERROR,
                        "`continue` used outside of a loop".to_string(),
                        Span::unknown(),
                    ));
                }
                true
            }

            Statement::Defer(inner) => {
                self.analyze_statement(inner);
                false
            }

            Statement::If {
                span_id,
                condition,
                then_block,
                elif_branches,
                else_block,
            } => {
                let span = self.resolve_span(span_id);
                let bool_ty = self.registry.primitive(PrimitiveType::Bool);
                let cond_ty = self.analyze_expression(condition, Some(bool_ty.clone()));
                if !cond_ty.is_never() && !self.registry.compatible(&bool_ty, &cond_ty) {
                    self.emit(Diagnostic::error(
                        error_codes::TYPE_MISMATCH,
                        format!("`if` condition must be `bool`, found `{}`", cond_ty.name_hint()),
                        span,
                    ));
                }
                let mut all_diverge = self.analyze_block(then_block);
                for (elif_cond, elif_block) in elif_branches {
                    self.analyze_expression(elif_cond, Some(bool_ty.clone()));
                    all_diverge &= self.analyze_block(elif_block);
                }
                match else_block {
                    Some(block) => all_diverge &= self.analyze_block(block),
                    None => all_diverge = false,
                }
                all_diverge
            }

            Statement::For {
                span_id: _,
                init,
                condition,
                post,
                body,
            } => {
                self.symbols.enter_scope();
                self.loop_depth += 1;
                if let Some(init) = init {
                    self.analyze_statement(init);
                }
                if let Some(cond) = condition {
                    let bool_ty = self.registry.primitive(PrimitiveType::Bool);
                    self.analyze_expression(cond, Some(bool_ty));
                }
                self.analyze_block(body);
                if let Some(post) = post {
                    self.analyze_statement(post);
                }
                self.loop_depth -= 1;
                if self.symbols.exit_scope().is_err() {
                    log::error!("scope underflow exiting a for loop");
                }
                false
            }

            Statement::While {
                span_id,
                condition,
                body,
            } => {
                let span = self.resolve_span(span_id);
                let bool_ty = self.registry.primitive(PrimitiveType::Bool);
                let cond_ty = self.analyze_expression(condition, Some(bool_ty.clone()));
                if !cond_ty.is_never() && !self.registry.compatible(&bool_ty, &cond_ty) {
                    self.emit(Diagnostic::error(
                        error_codes::TYPE_MISMATCH,
                        format!("`while` condition must be `bool`, found `{}`", cond_ty.name_hint()),
                        span,
                    ));
                }
                self.loop_depth += 1;
                self.analyze_block(body);
                self.loop_depth -= 1;
                false
            }

            Statement::ForIn {
                variable,
                iterable,
                body,
            } => {
                let span = Span::unknown();
                let iterable_ty = self.analyze_expression(iterable, None);
                let element_ty = match iterable_ty.as_ref() {
                    TypeDescriptor::Slice(elem) | TypeDescriptor::Array(elem, _) => elem.clone(),
                    TypeDescriptor::GenericInstance { name, args } if name == "Range" || name == "Vec" => {
                        args.first().cloned().unwrap_or_else(|| self.registry.never())
                    }
                    _ if iterable_ty.is_never() => iterable_ty.clone(),
                    _ => {
                        self.emit(Diagnostic::error(
                            error_codes::TYPE_MISMATCH,
                            format!("cannot iterate over a `{}`", iterable_ty.name_hint()),
                            span.clone(),
                        ));
                        self.registry.never()
                    }
                };

                self.symbols.enter_scope();
                self.loop_depth += 1;
                let entry = SymbolEntry::new(variable.clone(), SymbolKind::Variable, element_ty, span);
                let _ = self.symbols.insert(entry);
                self.analyze_block(body);
                self.loop_depth -= 1;
                if self.symbols.exit_scope().is_err() {
                    log::error!("scope underflow exiting a for-in loop");
                }
                false
            }

            Statement::Switch {
                value,
                cases,
                default_case,
            } => {
                let scrutinee_ty = value.as_ref().map(|v| self.analyze_expression(v, None));
                for case in cases {
                    for pattern in &case.patterns {
                        let pattern_ty = self.analyze_expression(pattern, scrutinee_ty.clone());
                        if let Some(scrutinee) = &scrutinee_ty {
                            if !pattern_ty.is_never()
                                && !scrutinee.is_never()
                                && !self.registry.compatible(scrutinee, &pattern_ty)
                            {
                                self.emit(Diagnostic::error(
                                    error_codes::TYPE_MISMATCH,
                                    format!(
                                        "case value has type `{}`, expected `{}`",
                                        pattern_ty.name_hint(),
                                        scrutinee.name_hint()
                                    ),
                                    Span::unknown(),
                                ));
                            }
                        }
                    }
                    self.analyze_block(&case.body);
                }
                if let Some(default) = default_case {
                    self.analyze_block(default);
                }
                false
            }

            Statement::Select { cases } => {
                for case in cases {
                    self.symbols.enter_scope();
                    let awaited_ty = self.analyze_expression(&case.expr, None);
                    if let Some(var) = &case.var {
                        let entry = SymbolEntry::new(var.clone(), SymbolKind::Variable, awaited_ty, Span::unknown());
                        let _ = self.symbols.insert(entry);
                    }
                    self.analyze_block(&case.body);
                    if self.symbols.exit_scope().is_err() {
                        log::error!("scope underflow exiting a select case");
                    }
                }
                false
            }

            Statement::Go(expr) => {
                let span = Span::unknown();
                match expr {
                    vex_ast::Expression::Call { func, .. } => {
                        if let vex_ast::Expression::Ident(name) = func.as_ref() {
                            let is_async = self.functions.get(name).map(|s| s.is_async).unwrap_or(true);
                            if !is_async {
                                self.emit(Diagnostic::error(
                                    error_codes::TYPE_MISMATCH,
                                    format!("`go` requires an async function; `{name}` is not async"),
                                    span.clone(),
                                ));
                            }
                        }
                        self.analyze_expression(expr, None);
                    }
                    _ => {
                        self.emit(Diagnostic::error(
                            error_codes::TYPE_MISMATCH,
                            "`go` requires a call expression".to_string(),
                            span,
                        ));
                        self.analyze_expression(expr, None);
                    }
                }
                false
            }

            Statement::Unsafe(block) => {
                self.unsafe_depth += 1;
                self.analyze_block(block);
                self.unsafe_depth -= 1;
                false
            }

            Statement::Expression(expr) => {
                self.analyze_expression(expr, None);
                matches!(expr, vex_ast::Expression::Ident(n) if self.functions.get(n).map(|s| s.return_type.is_never()).unwrap_or(false))
            }

            Statement::Annotated(annotations, inner) => {
                let diags = crate::annotations::validate_all(
                    annotations,
                    crate::annotations::TargetInfo {
                        context: crate::annotations::AnnotationContext::STATEMENT,
                        is_extern: false,
                    },
                    Span::unknown(),
                );
                for d in diags {
                    self.emit(d);
                }
                self.analyze_statement(inner)
            }
        }
    }

    pub(crate) fn analyze_block(&mut self, block: &vex_ast::Block) -> bool {
        self.symbols.enter_scope();
        let mut diverged = false;
        for stmt in &block.statements {
            if diverged {
                log::debug!("statement after a diverging path is unreachable");
            }
            diverged |= self.analyze_statement(stmt);
        }
        if self.symbols.exit_scope().is_err() {
            log::error!("scope underflow exiting a block");
        }
        diverged
    }

    /// An lvalue is either a plain identifier (the mutability check lives
    /// here) or a field/index projection off one, which defers mutability to
    /// whatever the base variable allows (spec.md doesn't model ownership
    /// tracking, just the immutable-assignment diagnostic off `let` vs `let!`).
    fn analyze_lvalue(&mut self, target: &vex_ast::Expression, span: Span) -> std::sync::Arc<TypeDescriptor> {
        if let vex_ast::Expression::Ident(name) = target {
            match self.symbols.lookup_recursive(name) {
                Some(entry) if !entry.is_mutable => {
                    self.emit(
                        Diagnostic::error(
                            error_codes::IMMUTABLE_ASSIGN,
                            format!("cannot assign to `{name}`, it is declared immutable"),
                            span,
                        )
                        .with_help(format!("declare it with `let! {name}` to allow reassignment")),
                    );
                }
                Some(_) => {}
                None => {}
            }
        }
        self.analyze_expression(target, None)
    }

    fn compound_assign_result(
        &self,
        target: &TypeDescriptor,
        op: &CompoundOp,
        value: &TypeDescriptor,
    ) -> Option<()> {
        let _ = op;
        if self.registry.compatible(target, value) {
            Some(())
        } else {
            None
        }
    }
}

//! Compile-time constant folding for `const` declarations and array lengths.
//!
//! Only a restricted subexpression grammar is evaluable at compile time:
//! literals, unary negation, and arithmetic/comparison/logical binary ops over
//! other const-evaluable expressions. Anything else (a function call, a field
//! access, an identifier that isn't itself a previously-evaluated const)
//! simply isn't const, the caller falls back to ordinary type checking
//! without a folded value.

use std::collections::HashMap;

use vex_ast::{BinaryOp, Expression, UnaryOp};
use vex_diagnostics::{error_codes, Diagnostic, Span};

use crate::utils::safe_arithmetic::CheckedArithmetic;

#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

impl ConstValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            ConstValue::Int(_) => "int",
            ConstValue::Float(_) => "float",
            ConstValue::Bool(_) => "bool",
            ConstValue::Str(_) => "string",
        }
    }
}

/// Previously evaluated `const` bindings, consulted when a const expression
/// references another const by name.
#[derive(Debug, Default)]
pub struct ConstEnv {
    values: HashMap<String, ConstValue>,
}

impl ConstEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, name: impl Into<String>, value: ConstValue) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ConstValue> {
        self.values.get(name)
    }
}

/// Evaluate a const expression, returning a ready-to-emit diagnostic (not a
/// Rust error) on overflow, division by zero, or a non-const subexpression:
/// const evaluation failure is an ordinary semantic problem, not an analyzer
/// bug.
pub fn evaluate(expr: &Expression, env: &ConstEnv, span: Span) -> Result<ConstValue, Diagnostic> {
    match expr {
        Expression::IntLiteral(v) => Ok(ConstValue::Int(*v)),
        Expression::FloatLiteral(v) => Ok(ConstValue::Float(*v)),
        Expression::BoolLiteral(v) => Ok(ConstValue::Bool(*v)),
        Expression::StringLiteral(v) | Expression::FStringLiteral(v) => {
            Ok(ConstValue::Str(v.clone()))
        }

        Expression::Ident(name) => env.get(name).cloned().ok_or_else(|| {
            Diagnostic::error(
                error_codes::NOT_IMPLEMENTED,
                format!("`{name}` is not a compile-time constant"),
                span.clone(),
            )
            .with_help("only literals and const-evaluable expressions can appear here".to_string())
        }),

        Expression::Unary {
            op: UnaryOp::Neg,
            expr,
            ..
        } => match evaluate(expr, env, span.clone())? {
            ConstValue::Int(v) => Ok(ConstValue::Int(-v)),
            ConstValue::Float(v) => Ok(ConstValue::Float(-v)),
            other => Err(type_error_for_unary(&other, span)),
        },

        Expression::Unary {
            op: UnaryOp::Not,
            expr,
            ..
        } => match evaluate(expr, env, span.clone())? {
            ConstValue::Bool(v) => Ok(ConstValue::Bool(!v)),
            other => Err(type_error_for_unary(&other, span)),
        },

        Expression::Binary {
            left, op, right, ..
        } => {
            let lhs = evaluate(left, env, span.clone())?;
            let rhs = evaluate(right, env, span.clone())?;
            evaluate_binary(op.clone(), lhs, rhs, span)
        }

        _ => Err(Diagnostic::error(
            error_codes::NOT_IMPLEMENTED,
            "expression is not evaluable at compile time".to_string(),
            span,
        )),
    }
}

fn type_error_for_unary(value: &ConstValue, span: Span) -> Diagnostic {
    Diagnostic::error(
        error_codes::TYPE_MISMATCH,
        format!(
            "cannot apply this unary operator to a `{}` constant",
            value.type_name()
        ),
        span,
    )
}

fn evaluate_binary(
    op: BinaryOp,
    lhs: ConstValue,
    rhs: ConstValue,
    span: Span,
) -> Result<ConstValue, Diagnostic> {
    use ConstValue::*;

    match (op, lhs, rhs) {
        (BinaryOp::Add, Int(a), Int(b)) => a
            .safe_add(b)
            .map(Int)
            .map_err(|e| overflow_diagnostic(&e.message, span)),
        (BinaryOp::Sub, Int(a), Int(b)) => a
            .safe_sub(b)
            .map(Int)
            .map_err(|e| overflow_diagnostic(&e.message, span)),
        (BinaryOp::Mul, Int(a), Int(b)) => a
            .safe_mul(b)
            .map(Int)
            .map_err(|e| overflow_diagnostic(&e.message, span)),
        (BinaryOp::Div, Int(a), Int(b)) => {
            if b == 0 {
                Err(division_by_zero(span))
            } else {
                Ok(Int(a / b))
            }
        }
        (BinaryOp::Mod, Int(a), Int(b)) => {
            if b == 0 {
                Err(division_by_zero(span))
            } else {
                Ok(Int(a % b))
            }
        }

        (BinaryOp::Add, Float(a), Float(b)) => Ok(Float(a + b)),
        (BinaryOp::Sub, Float(a), Float(b)) => Ok(Float(a - b)),
        (BinaryOp::Mul, Float(a), Float(b)) => Ok(Float(a * b)),
        (BinaryOp::Div, Float(a), Float(b)) => {
            if b == 0.0 {
                Err(division_by_zero(span))
            } else {
                Ok(Float(a / b))
            }
        }

        (BinaryOp::Eq, a, b) => Ok(Bool(a == b)),
        (BinaryOp::NotEq, a, b) => Ok(Bool(a != b)),
        (BinaryOp::Lt, Int(a), Int(b)) => Ok(Bool(a < b)),
        (BinaryOp::LtEq, Int(a), Int(b)) => Ok(Bool(a <= b)),
        (BinaryOp::Gt, Int(a), Int(b)) => Ok(Bool(a > b)),
        (BinaryOp::GtEq, Int(a), Int(b)) => Ok(Bool(a >= b)),

        (BinaryOp::And, Bool(a), Bool(b)) => Ok(Bool(a && b)),
        (BinaryOp::Or, Bool(a), Bool(b)) => Ok(Bool(a || b)),

        (_, a, b) => Err(Diagnostic::error(
            error_codes::TYPE_MISMATCH,
            format!(
                "cannot apply this operator between a `{}` and a `{}` constant",
                a.type_name(),
                b.type_name()
            ),
            span,
        )),
    }
}

fn overflow_diagnostic(message: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        error_codes::NOT_IMPLEMENTED,
        format!("constant expression overflows: {message}"),
        span,
    )
}

fn division_by_zero(span: Span) -> Diagnostic {
    Diagnostic::error(
        error_codes::NOT_IMPLEMENTED,
        "division by zero in constant expression".to_string(),
        span,
    )
    .with_help("this expression is evaluated at compile time and always divides by zero".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_integer_arithmetic() {
        let env = ConstEnv::new();
        let expr = Expression::Binary {
            span_id: None,
            left: Box::new(Expression::IntLiteral(2)),
            op: BinaryOp::Add,
            right: Box::new(Expression::IntLiteral(3)),
        };
        assert_eq!(
            evaluate(&expr, &env, Span::unknown()).unwrap(),
            ConstValue::Int(5)
        );
    }

    #[test]
    fn division_by_zero_is_a_diagnostic_not_a_panic() {
        let env = ConstEnv::new();
        let expr = Expression::Binary {
            span_id: None,
            left: Box::new(Expression::IntLiteral(1)),
            op: BinaryOp::Div,
            right: Box::new(Expression::IntLiteral(0)),
        };
        assert!(evaluate(&expr, &env, Span::unknown()).is_err());
    }

    #[test]
    fn overflow_is_a_diagnostic_not_a_panic() {
        let env = ConstEnv::new();
        let expr = Expression::Binary {
            span_id: None,
            left: Box::new(Expression::IntLiteral(i64::MAX)),
            op: BinaryOp::Add,
            right: Box::new(Expression::IntLiteral(1)),
        };
        assert!(evaluate(&expr, &env, Span::unknown()).is_err());
    }

    #[test]
    fn references_a_previously_defined_const() {
        let mut env = ConstEnv::new();
        env.define("SIZE", ConstValue::Int(4));
        let expr = Expression::Ident("SIZE".to_string());
        assert_eq!(
            evaluate(&expr, &env, Span::unknown()).unwrap(),
            ConstValue::Int(4)
        );
    }
}

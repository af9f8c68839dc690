// Utility modules for the analyzer

pub mod safe_arithmetic;

pub use safe_arithmetic::{ArithmeticError, CheckedArithmetic, SafeCast};

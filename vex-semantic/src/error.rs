//! Internal, programmer-facing analyzer failures.
//!
//! Ordinary semantic problems (undefined symbol, type mismatch, non-exhaustive
//! match) are never `Result::Err`, they're recorded as diagnostics and the
//! walker keeps going, so one bad expression doesn't abort analysis of the
//! rest of the file. `AnalyzerError` is reserved for invariants that should be
//! impossible to violate: a scope popped past the root, a type the registry
//! never interned being looked up by handle, and the like. These always
//! bridge into a single `Internal`-coded diagnostic.

use thiserror::Error;
use vex_diagnostics::{error_codes, Diagnostic, Span};

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("scope stack underflow: attempted to exit the root scope")]
    ScopeUnderflow,

    #[error("internal type registry lookup failed for `{0}`")]
    UnresolvedTypeHandle(String),

    #[error("declaration pass invariant violated: `{0}` registered twice in the same scope")]
    DuplicateRegistration(String),

    #[error("const evaluator invariant violated: {0}")]
    ConstEvalInvariant(String),
}

impl AnalyzerError {
    /// Bridge into the `Internal` diagnostic code (spec error taxonomy §7).
    pub fn to_diagnostic(&self, span: Span) -> Diagnostic {
        Diagnostic::error(error_codes::INTERNAL, self.to_string(), span)
            .with_note("this is an analyzer bug, not a problem with your program".to_string())
    }
}

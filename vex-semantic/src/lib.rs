//! Semantic analysis for Vex: the Type Registry, Symbol Table, Const
//! Evaluator, AST Walker, Declaration Analyzer, Annotation Validator, and the
//! `SemanticAnalyzer` that wires them into one `analyze_program` call.

pub mod analyzer;
pub mod annotations;
pub mod const_eval;
mod declarations;
pub mod error;
mod resolve;
pub mod scope;
mod suggest;
pub mod symbol;
pub mod type_descriptor;
pub mod type_registry;
pub mod type_system;
pub mod utils;
mod walker;

pub use vex_diagnostics as diagnostics;

pub use analyzer::{AnalyzerConfig, FunctionSig, SemanticAnalyzer};
pub use diagnostics::{error_codes, Diagnostic, DiagnosticEngine, ErrorLevel, Span};
pub use error::AnalyzerError;
pub use scope::SymbolTable;
pub use symbol::{SymbolEntry, SymbolKind};
pub use type_descriptor::{FieldDescriptor, PrimitiveType, TypeDescriptor, VariantDescriptor};
pub use type_registry::TypeRegistry;

//! `SemanticAnalyzer`: the entry point wiring the Type Registry, Symbol
//! Table, Const Evaluator, AST Walker, Declaration Analyzer, and Annotation
//! Validator together behind a single synchronous `analyze_program` call.
//!
//! One instance is built per analysis request; it is not shared across
//! threads and does not suspend (spec.md §5, single-threaded cooperative).

use std::collections::HashMap;
use std::sync::Arc;

use vex_ast::Program;
use vex_diagnostics::{Diagnostic, DiagnosticEngine, Span, SpanMap};

use crate::const_eval::ConstEnv;
use crate::scope::SymbolTable;
use crate::symbol::{SymbolEntry, SymbolKind};
use crate::type_descriptor::{PrimitiveType, TypeDescriptor};
use crate::type_registry::TypeRegistry;

/// A resolved function or method signature, independent of the symbol table
/// entry that names it, looked up by the walker when analyzing a call.
#[derive(Debug, Clone)]
pub struct FunctionSig {
    pub params: Vec<Arc<TypeDescriptor>>,
    pub return_type: Arc<TypeDescriptor>,
    /// `true` if the first parameter is the method receiver and should be
    /// skipped when counting arguments at a call site (spec.md §4.4 "Call
    /// expression").
    pub has_receiver: bool,
    pub is_extern: bool,
    pub is_async: bool,
    /// Predeclared functions like `log` accept any argument list; ordinary
    /// functions don't.
    pub variadic: bool,
}

impl FunctionSig {
    pub fn callable_params(&self) -> &[Arc<TypeDescriptor>] {
        if self.has_receiver && !self.params.is_empty() {
            &self.params[1..]
        } else {
            &self.params
        }
    }
}

/// Runtime-facing toggles (spec.md §6 "Environment", §4.7's configurable cap).
#[derive(Debug, Clone, Copy)]
pub struct AnalyzerConfig {
    /// Relaxes strict-typing requirements so fixtures don't need every
    /// annotation a production program would carry.
    pub test_mode: bool,
    /// Promotes warnings to errors for the purpose of overall success.
    pub strict_mode: bool,
    pub diagnostic_cap: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            test_mode: false,
            strict_mode: false,
            diagnostic_cap: vex_diagnostics::DEFAULT_DIAGNOSTIC_CAP,
        }
    }
}

pub struct SemanticAnalyzer {
    pub registry: TypeRegistry,
    pub symbols: SymbolTable,
    pub engine: DiagnosticEngine,
    pub config: AnalyzerConfig,
    pub(crate) const_env: ConstEnv,
    pub(crate) unsafe_depth: usize,
    pub(crate) loop_depth: usize,
    pub(crate) current_return_type: Option<Arc<TypeDescriptor>>,
    pub(crate) struct_types: HashMap<String, Arc<TypeDescriptor>>,
    pub(crate) enum_types: HashMap<String, Arc<TypeDescriptor>>,
    pub(crate) method_tables: HashMap<String, HashMap<String, FunctionSig>>,
    pub(crate) functions: HashMap<String, FunctionSig>,
    pub(crate) type_aliases: HashMap<String, Arc<TypeDescriptor>>,
    /// Union of every name `resolve_type` can answer a `Named`/`Generic`
    /// lookup with: structs, enums, type aliases, traits, and policies.
    pub(crate) named_types: HashMap<String, Arc<TypeDescriptor>>,
    pub(crate) span_map: SpanMap,
    /// Raw struct/enum declarations not yet laid out, consulted by
    /// `resolve_named` so a field or variant naming a type declared later in
    /// the file still resolves (declarations.rs).
    pub(crate) pending_structs: HashMap<String, vex_ast::Struct>,
    pub(crate) pending_enums: HashMap<String, vex_ast::Enum>,
    /// Names currently being laid out, to turn a genuine by-value cycle into
    /// a diagnostic instead of infinite recursion.
    pub(crate) resolving_types: std::collections::HashSet<String>,
}

impl SemanticAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        let mut analyzer = Self {
            registry: TypeRegistry::new(),
            symbols: SymbolTable::new(),
            engine: DiagnosticEngine::with_cap(config.diagnostic_cap),
            config,
            const_env: ConstEnv::new(),
            unsafe_depth: 0,
            loop_depth: 0,
            current_return_type: None,
            struct_types: HashMap::new(),
            enum_types: HashMap::new(),
            method_tables: HashMap::new(),
            functions: HashMap::new(),
            type_aliases: HashMap::new(),
            named_types: HashMap::new(),
            span_map: SpanMap::new(),
            pending_structs: HashMap::new(),
            pending_enums: HashMap::new(),
            resolving_types: std::collections::HashSet::new(),
        };
        analyzer.register_predeclared();
        analyzer
    }

    /// Predeclared identifiers visible in the global scope before any
    /// declaration is analyzed (spec.md §4.2). `spawn_with_handle` and `go`
    /// are handled structurally by the walker rather than through a fixed
    /// signature here (SPEC_FULL.md §3) since their result type depends on
    /// the callee they're given.
    fn register_predeclared(&mut self) {
        log::debug!("registering predeclared identifiers");

        let string_ty = self.registry.primitive(PrimitiveType::String);
        let void_ty = self.registry.void();
        let never_ty = self.registry.never();
        let i32_ty = self.registry.primitive(PrimitiveType::I32);
        let range_ty = self.registry.generic_instance("Range", vec![i32_ty.clone()]);

        self.functions.insert(
            "log".to_string(),
            FunctionSig {
                params: vec![string_ty.clone()],
                return_type: void_ty.clone(),
                has_receiver: false,
                is_extern: false,
                is_async: false,
                variadic: true,
            },
        );
        self.functions.insert(
            "panic".to_string(),
            FunctionSig {
                params: vec![string_ty],
                return_type: never_ty,
                has_receiver: false,
                is_extern: false,
                is_async: false,
                variadic: false,
            },
        );
        self.functions.insert(
            "range".to_string(),
            FunctionSig {
                params: vec![i32_ty.clone(), i32_ty],
                return_type: range_ty,
                has_receiver: false,
                is_extern: false,
                is_async: false,
                variadic: true,
            },
        );

        for name in ["log", "panic", "range"] {
            let sig = &self.functions[name];
            let entry = SymbolEntry::new(
                name,
                SymbolKind::Function,
                self.registry.function(sig.params.clone(), sig.return_type.clone()),
                vex_diagnostics::Span::unknown(),
            );
            let _ = self.symbols.insert_global(entry);
        }
    }

    /// Entry point: register every top-level declaration (pass 1, resolving
    /// structs/enums lazily so forward references between them type-check
    /// regardless of source order), then analyze every body (pass 2), per
    /// spec.md §4.5. Returns `true` iff the diagnostic list contains no
    /// `Error`-level entries (spec.md §2, §7).
    pub fn analyze_program(&mut self, program: &Program) -> bool {
        log::debug!("declaration pass 1: registering {} item(s)", program.items.len());
        self.register_all(&program.items);

        log::debug!("declaration pass 2: analyzing bodies");
        for item in &program.items {
            self.analyze_item(item);
        }

        let has_warnings_as_errors = self.config.strict_mode && self.engine.warning_count() > 0;

        !self.engine.has_errors() && !has_warnings_as_errors
    }

    pub fn emit(&mut self, diagnostic: Diagnostic) {
        self.engine.emit(diagnostic);
    }

    /// Parsers that stamp `span_id`s onto AST nodes hand the matching
    /// `SpanMap` here; without it, spans resolve to `Span::unknown()`
    /// (still safe, just less precise in diagnostics).
    pub fn set_span_map(&mut self, span_map: SpanMap) {
        self.span_map = span_map;
    }

    pub(crate) fn resolve_span(&self, span_id: &Option<String>) -> Span {
        span_id
            .as_ref()
            .map(|id| self.span_map.get_or_unknown(id))
            .unwrap_or_else(Span::unknown)
    }

    pub fn in_unsafe_context(&self) -> bool {
        self.unsafe_depth > 0
    }

    pub fn in_loop(&self) -> bool {
        self.loop_depth > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predeclared_identifiers_resolve_from_the_global_scope() {
        let analyzer = SemanticAnalyzer::new(AnalyzerConfig::default());
        assert!(analyzer.symbols.lookup_recursive("log").is_some());
        assert!(analyzer.symbols.lookup_recursive("panic").is_some());
        assert!(analyzer.symbols.lookup_recursive("range").is_some());
    }

    #[test]
    fn empty_program_analyzes_successfully() {
        let mut analyzer = SemanticAnalyzer::new(AnalyzerConfig::default());
        let program = Program {
            imports: vec![],
            items: vec![],
        };
        assert!(analyzer.analyze_program(&program));
    }
}

//! The Symbol Table: a tree of nested scopes, walked from the innermost scope
//! outward on every lookup.
//!
//! Scopes are stored in an arena (`Vec<Scope>`) rather than as a literal tree
//! of owned nodes, so that `enter_scope`/`exit_scope` are pointer-stable and
//! cheap, the analyzer just moves a cursor, it never reallocates a subtree.

use std::collections::HashMap;

use crate::error::AnalyzerError;
use crate::symbol::SymbolEntry;

#[derive(Debug)]
struct Scope {
    parent: Option<usize>,
    symbols: HashMap<String, SymbolEntry>,
}

/// A scope-nested symbol table.
///
/// Construction starts with a single root (global) scope already current;
/// `enter_scope`/`exit_scope` bracket function bodies, blocks, and `for`/`while`
/// loops the way the declaration analyzer and AST walker need them to.
pub struct SymbolTable {
    scopes: Vec<Scope>,
    current: usize,
    /// Import aliases (`import foo as bar`), resolved independently of the
    /// scope chain, a module alias is visible everywhere after the import,
    /// not just in the scope it was declared in.
    module_aliases: HashMap<String, String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope {
                parent: None,
                symbols: HashMap::new(),
            }],
            current: 0,
            module_aliases: HashMap::new(),
        }
    }

    pub fn global_scope_id(&self) -> usize {
        0
    }

    pub fn current_scope_id(&self) -> usize {
        self.current
    }

    /// Push a new child scope and make it current. Returns the new scope's id
    /// so callers can assert they're back where they started after a matching
    /// `exit_scope`.
    pub fn enter_scope(&mut self) -> usize {
        let id = self.scopes.len();
        self.scopes.push(Scope {
            parent: Some(self.current),
            symbols: HashMap::new(),
        });
        self.current = id;
        id
    }

    /// Pop back to the parent of the current scope.
    pub fn exit_scope(&mut self) -> Result<(), AnalyzerError> {
        match self.scopes[self.current].parent {
            Some(parent) => {
                self.current = parent;
                Ok(())
            }
            None => Err(AnalyzerError::ScopeUnderflow),
        }
    }

    /// Insert a symbol into the current scope. Returns an error if a symbol
    /// with the same name is already bound in THIS scope, shadowing a name
    /// from an outer scope is fine, redeclaring one in the same scope is not.
    pub fn insert(&mut self, entry: SymbolEntry) -> Result<(), AnalyzerError> {
        let scope = &mut self.scopes[self.current];
        if scope.symbols.contains_key(&entry.name) {
            return Err(AnalyzerError::DuplicateRegistration(entry.name));
        }
        scope.symbols.insert(entry.name.clone(), entry);
        Ok(())
    }

    /// Insert into the global scope regardless of what's current, used to
    /// register predeclared identifiers and top-level declarations during
    /// declaration-analysis pass 1.
    pub fn insert_global(&mut self, entry: SymbolEntry) -> Result<(), AnalyzerError> {
        let global = &mut self.scopes[0];
        if global.symbols.contains_key(&entry.name) {
            return Err(AnalyzerError::DuplicateRegistration(entry.name));
        }
        global.symbols.insert(entry.name.clone(), entry);
        Ok(())
    }

    /// Look up a name in the current scope only, without walking parents.
    pub fn lookup_local(&self, name: &str) -> Option<&SymbolEntry> {
        self.scopes[self.current].symbols.get(name)
    }

    /// Look up a name, walking from the current scope out to the global scope.
    pub fn lookup_recursive(&self, name: &str) -> Option<&SymbolEntry> {
        let mut scope_id = Some(self.current);
        while let Some(id) = scope_id {
            if let Some(entry) = self.scopes[id].symbols.get(name) {
                return Some(entry);
            }
            scope_id = self.scopes[id].parent;
        }
        None
    }

    /// Mutable variant of `lookup_recursive`, used to mark a symbol as used.
    pub fn lookup_recursive_mut(&mut self, name: &str) -> Option<&mut SymbolEntry> {
        let mut scope_id = Some(self.current);
        while let Some(id) = scope_id {
            if self.scopes[id].symbols.contains_key(name) {
                return self.scopes[id].symbols.get_mut(name);
            }
            scope_id = self.scopes[id].parent;
        }
        None
    }

    /// Non-panicking lookup that never crashes regardless of scope-stack
    /// corruption, used by diagnostic-producing code paths that must not
    /// themselves be a new source of panics while reporting an unrelated error.
    pub fn lookup_safe(&self, name: &str) -> Option<&SymbolEntry> {
        if self.current >= self.scopes.len() {
            return None;
        }
        self.lookup_recursive(name)
    }

    pub fn record_module_alias(&mut self, alias: impl Into<String>, target: impl Into<String>) {
        self.module_aliases.insert(alias.into(), target.into());
    }

    pub fn resolve_module_alias(&self, alias: &str) -> Option<&str> {
        self.module_aliases.get(alias).map(String::as_str)
    }

    /// All names bound anywhere on the current scope chain, used for fuzzy
    /// "did you mean" suggestions.
    pub fn names_in_scope_chain(&self) -> Vec<String> {
        let mut names = Vec::new();
        let mut scope_id = Some(self.current);
        while let Some(id) = scope_id {
            names.extend(self.scopes[id].symbols.keys().cloned());
            scope_id = self.scopes[id].parent;
        }
        names
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::SymbolKind;
    use crate::type_descriptor::{PrimitiveType, TypeDescriptor};
    use std::sync::Arc;
    use vex_diagnostics::Span;

    fn entry(name: &str) -> SymbolEntry {
        SymbolEntry::new(
            name,
            SymbolKind::Variable,
            Arc::new(TypeDescriptor::Primitive(PrimitiveType::I32)),
            Span::unknown(),
        )
    }

    #[test]
    fn lookup_recursive_walks_out_to_global() {
        let mut table = SymbolTable::new();
        table.insert(entry("x")).unwrap();
        table.enter_scope();
        assert!(table.lookup_local("x").is_none());
        assert!(table.lookup_recursive("x").is_some());
    }

    #[test]
    fn shadowing_in_a_child_scope_is_allowed() {
        let mut table = SymbolTable::new();
        table.insert(entry("x")).unwrap();
        table.enter_scope();
        assert!(table.insert(entry("x")).is_ok());
    }

    #[test]
    fn redeclaration_in_the_same_scope_errors() {
        let mut table = SymbolTable::new();
        table.insert(entry("x")).unwrap();
        assert!(matches!(
            table.insert(entry("x")),
            Err(AnalyzerError::DuplicateRegistration(_))
        ));
    }

    #[test]
    fn exit_scope_past_the_root_errors() {
        let mut table = SymbolTable::new();
        assert!(matches!(
            table.exit_scope(),
            Err(AnalyzerError::ScopeUnderflow)
        ));
    }

    #[test]
    fn exiting_returns_lookups_to_the_parent_view() {
        let mut table = SymbolTable::new();
        table.enter_scope();
        table.insert(entry("y")).unwrap();
        table.exit_scope().unwrap();
        assert!(table.lookup_local("y").is_none());
    }
}

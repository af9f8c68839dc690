//! The AST Walker (C4): recursive type-checking over expressions and
//! statements, implemented as two more `impl SemanticAnalyzer` blocks.

mod expressions;
mod statements;

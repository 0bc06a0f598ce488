//! # TaylorLang semantic analysis core
//!
//! The subsystem that takes a parsed AST for TaylorLang — a statically-typed,
//! expression-oriented language with algebraic data types — and transforms it
//! into a fully annotated typed AST, rejecting ill-typed programs with
//! precise diagnostics.
//!
//! ## Architecture
//!
//! The pipeline runs in four tightly coupled stages:
//! 1. **Constraint collection**: a bidirectional (synthesis + checking) walk
//!    of the AST gathers equality, subtype, and instance constraints.
//! 2. **Unification**: Robinson's algorithm with occurs check solves the
//!    constraint set into a most general substitution.
//! 3. **Pattern analysis**: patterns are checked against scrutinee types,
//!    bind variables, and must cover their unions exhaustively.
//! 4. **Orchestration**: the driver walks top-level items, aggregates
//!    diagnostics, and applies the solved substitution to the typed AST.
//!
//! ## Example
//!
//! ```
//! use taylorlang::ast::{Expr, Literal, Program, Statement};
//! use taylorlang::diagnostics::{spanned, Span};
//! use taylorlang::{type_check, Type, TypedStatement};
//!
//! let program = Program::new(vec![spanned(
//!     Statement::VariableDecl {
//!         name: "x".to_string(),
//!         mutable: false,
//!         type_annotation: None,
//!         value: spanned(Expr::Literal(Literal::Integer(42)), Span::default()),
//!     },
//!     Span::default(),
//! )]);
//!
//! let typed = type_check(&program).unwrap();
//! match &typed.statements[0] {
//!     TypedStatement::VariableDecl { ty, .. } => assert_eq!(ty, &Type::int()),
//!     _ => unreachable!(),
//! }
//! ```

#![warn(missing_docs, rust_2018_idioms)]

/// Abstract Syntax Tree definitions consumed by the checker.
pub mod ast;
/// Error handling, diagnostics, and source location tracking.
pub mod diagnostics;
/// The type system: model, constraints, unification, inference, checking.
pub mod types;

// Re-exports for convenience
pub use diagnostics::{DiagnosticCollector, Error, Result, Span, Spanned};
pub use types::{
    clear_type_caches, collect_constraints, solve, type_check, unify, validate, CheckStrategy,
    Constraint, ConstraintCollector, ConstraintSet, FunctionSignature, Substitutable,
    Substitution, Type, TypeChecker, TypeDefinition, TypeScheme, TypeVar, TypedExpression,
    TypedProgram, TypedStatement, TypingEnvironment, ValidationResult, VariantDef,
};

//! Programs, statements, and surface type syntax.

use serde::{Deserialize, Serialize};

use super::Expr;
use crate::diagnostics::{Span, Spanned};

/// An unresolved type annotation as written in source.
///
/// The typing environment resolves these to semantic types, mapping in-scope
/// type parameters to named references and validating generic arity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeExpr {
    /// `Int`, `Color`, `T`
    Named(String),
    /// `List<Int>`, `Result<Int, Throwable>`
    Generic {
        name: String,
        args: Vec<Spanned<TypeExpr>>,
    },
    /// `(Int, String) -> Boolean`
    Function {
        params: Vec<Spanned<TypeExpr>>,
        return_type: Box<Spanned<TypeExpr>>,
    },
    /// `(Int, String)`
    Tuple(Vec<Spanned<TypeExpr>>),
    /// `Int?`
    Nullable(Box<Spanned<TypeExpr>>),
}

/// A function parameter with its required type annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name
    pub name: String,
    /// Declared type
    pub type_annotation: Spanned<TypeExpr>,
}

/// One variant of a union type declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantDecl {
    /// Variant name, unique within its union
    pub name: String,
    /// Field types; empty for a nullary constructor
    pub fields: Vec<Spanned<TypeExpr>>,
    /// Declaration site
    pub span: Span,
}

/// A statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    /// `val x = e` / `var x: T = e`
    VariableDecl {
        name: String,
        /// `var` declares mutable, `val` immutable
        mutable: bool,
        type_annotation: Option<Spanned<TypeExpr>>,
        value: Spanned<Expr>,
    },
    /// `x = e`
    Assignment { name: String, value: Spanned<Expr> },
    /// `type Option<T> = Some(T) | None`
    TypeDecl {
        name: String,
        type_params: Vec<String>,
        variants: Vec<VariantDecl>,
    },
    /// `fn add(x: Int, y: Int): Int => x + y`
    FunctionDecl {
        name: String,
        type_params: Vec<String>,
        params: Vec<Parameter>,
        return_type: Option<Spanned<TypeExpr>>,
        body: Spanned<Expr>,
    },
    /// A bare expression evaluated for its value or effects
    Expression(Spanned<Expr>),
}

/// A whole parsed program: top-level statements in source order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Program {
    /// Top-level statements
    pub statements: Vec<Spanned<Statement>>,
}

impl Program {
    /// Creates a program from its statements.
    pub fn new(statements: Vec<Spanned<Statement>>) -> Self {
        Self { statements }
    }
}

//! The typed AST: checker output where every node carries its resolved type.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{FunctionSignature, Substitutable, Substitution, Type, TypeDefinition};
use crate::ast::{BinaryOperator, Literal, Pattern, UnaryOperator};
use crate::diagnostics::{Span, Spanned};

/// An expression annotated with its resolved type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedExpression {
    /// The expression shape with typed children
    pub kind: TypedExpressionKind,
    /// The expression's type
    pub ty: Type,
    /// Source location
    pub span: Span,
}

/// Expression shapes, mirroring the input AST with typed children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypedExpressionKind {
    /// Literal value
    Literal(Literal),
    /// Identifier reference
    Identifier(String),
    /// Tuple literal
    Tuple(Vec<TypedExpression>),
    /// Binary operation
    Binary {
        op: BinaryOperator,
        left: Box<TypedExpression>,
        right: Box<TypedExpression>,
    },
    /// Unary operation
    Unary {
        op: UnaryOperator,
        operand: Box<TypedExpression>,
    },
    /// Conditional
    If {
        condition: Box<TypedExpression>,
        then_branch: Box<TypedExpression>,
        else_branch: Option<Box<TypedExpression>>,
    },
    /// Pattern match
    Match {
        scrutinee: Box<TypedExpression>,
        cases: Vec<TypedMatchCase>,
    },
    /// Block
    Block {
        statements: Vec<TypedStatement>,
        value: Option<Box<TypedExpression>>,
    },
    /// Function call
    Call {
        function: String,
        args: Vec<TypedExpression>,
    },
    /// Union variant construction
    ConstructorCall {
        name: String,
        args: Vec<TypedExpression>,
    },
    /// Anonymous function
    Lambda {
        params: Vec<TypedParameter>,
        body: Box<TypedExpression>,
    },
    /// Result-propagating try
    Try {
        body: Box<TypedExpression>,
        catch_clauses: Vec<TypedMatchCase>,
    },
}

/// A lambda parameter with its (inferred) type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedParameter {
    /// Parameter name
    pub name: String,
    /// Parameter type
    pub ty: Type,
}

/// A typed match arm (or catch clause).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedMatchCase {
    /// The arm's pattern
    pub pattern: Spanned<Pattern>,
    /// Variables the pattern binds, with their types
    pub bindings: IndexMap<String, Type>,
    /// Typed guard, if present
    pub guard: Option<TypedExpression>,
    /// Typed arm body
    pub body: TypedExpression,
}

/// A statement annotated with resolved types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypedStatement {
    /// Variable declaration
    VariableDecl {
        name: String,
        mutable: bool,
        ty: Type,
        value: TypedExpression,
        span: Span,
    },
    /// Assignment to a mutable variable
    Assignment {
        name: String,
        value: TypedExpression,
        span: Span,
    },
    /// Union type declaration
    TypeDecl {
        definition: TypeDefinition,
        span: Span,
    },
    /// Function declaration
    FunctionDecl {
        signature: FunctionSignature,
        body: TypedExpression,
        span: Span,
    },
    /// Bare expression statement
    Expression(TypedExpression),
}

/// A fully checked program.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TypedProgram {
    /// Typed top-level statements in source order
    pub statements: Vec<TypedStatement>,
}

impl TypedExpression {
    /// Creates a typed expression.
    pub fn new(kind: TypedExpressionKind, ty: Type, span: Span) -> Self {
        Self { kind, ty, span }
    }
}

impl Substitutable for TypedExpression {
    fn apply_substitution(&self, subst: &Substitution) -> Self {
        TypedExpression {
            kind: self.kind.apply_substitution(subst),
            ty: subst.apply(&self.ty),
            span: self.span.clone(),
        }
    }
}

impl Substitutable for TypedExpressionKind {
    fn apply_substitution(&self, subst: &Substitution) -> Self {
        use TypedExpressionKind::*;
        match self {
            Literal(lit) => Literal(lit.clone()),
            Identifier(name) => Identifier(name.clone()),
            Tuple(elements) => Tuple(elements.apply_substitution(subst)),
            Binary { op, left, right } => Binary {
                op: *op,
                left: Box::new(left.apply_substitution(subst)),
                right: Box::new(right.apply_substitution(subst)),
            },
            Unary { op, operand } => Unary {
                op: *op,
                operand: Box::new(operand.apply_substitution(subst)),
            },
            If {
                condition,
                then_branch,
                else_branch,
            } => If {
                condition: Box::new(condition.apply_substitution(subst)),
                then_branch: Box::new(then_branch.apply_substitution(subst)),
                else_branch: else_branch
                    .as_ref()
                    .map(|e| Box::new(e.apply_substitution(subst))),
            },
            Match { scrutinee, cases } => Match {
                scrutinee: Box::new(scrutinee.apply_substitution(subst)),
                cases: cases.iter().map(|c| c.apply_substitution(subst)).collect(),
            },
            Block { statements, value } => Block {
                statements: statements
                    .iter()
                    .map(|s| s.apply_substitution(subst))
                    .collect(),
                value: value.as_ref().map(|v| Box::new(v.apply_substitution(subst))),
            },
            Call { function, args } => Call {
                function: function.clone(),
                args: args.apply_substitution(subst),
            },
            ConstructorCall { name, args } => ConstructorCall {
                name: name.clone(),
                args: args.apply_substitution(subst),
            },
            Lambda { params, body } => Lambda {
                params: params
                    .iter()
                    .map(|p| TypedParameter {
                        name: p.name.clone(),
                        ty: subst.apply(&p.ty),
                    })
                    .collect(),
                body: Box::new(body.apply_substitution(subst)),
            },
            Try {
                body,
                catch_clauses,
            } => Try {
                body: Box::new(body.apply_substitution(subst)),
                catch_clauses: catch_clauses
                    .iter()
                    .map(|c| c.apply_substitution(subst))
                    .collect(),
            },
        }
    }
}

impl Substitutable for TypedMatchCase {
    fn apply_substitution(&self, subst: &Substitution) -> Self {
        TypedMatchCase {
            pattern: self.pattern.clone(),
            bindings: self
                .bindings
                .iter()
                .map(|(name, ty)| (name.clone(), subst.apply(ty)))
                .collect(),
            guard: self.guard.as_ref().map(|g| g.apply_substitution(subst)),
            body: self.body.apply_substitution(subst),
        }
    }
}

impl Substitutable for TypedStatement {
    fn apply_substitution(&self, subst: &Substitution) -> Self {
        match self {
            TypedStatement::VariableDecl {
                name,
                mutable,
                ty,
                value,
                span,
            } => TypedStatement::VariableDecl {
                name: name.clone(),
                mutable: *mutable,
                ty: subst.apply(ty),
                value: value.apply_substitution(subst),
                span: span.clone(),
            },
            TypedStatement::Assignment { name, value, span } => TypedStatement::Assignment {
                name: name.clone(),
                value: value.apply_substitution(subst),
                span: span.clone(),
            },
            TypedStatement::TypeDecl { definition, span } => TypedStatement::TypeDecl {
                definition: definition.clone(),
                span: span.clone(),
            },
            TypedStatement::FunctionDecl {
                signature,
                body,
                span,
            } => TypedStatement::FunctionDecl {
                signature: FunctionSignature {
                    name: signature.name.clone(),
                    type_params: signature.type_params.clone(),
                    params: signature.params.apply_substitution(subst),
                    return_type: subst.apply(&signature.return_type),
                    span: signature.span.clone(),
                },
                body: body.apply_substitution(subst),
                span: span.clone(),
            },
            TypedStatement::Expression(expr) => {
                TypedStatement::Expression(expr.apply_substitution(subst))
            }
        }
    }
}

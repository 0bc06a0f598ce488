//! Error handling and diagnostics for the TaylorLang semantic core.
//!
//! Every failure the checker can report is a variant of [`Error`], carrying
//! the best source location available. Expression-level failures are gathered
//! in a [`DiagnosticCollector`] so that one bad sub-expression does not hide
//! the rest of an item's problems.

pub mod reporter;
pub mod span;

pub use reporter::render;
pub use span::{spanned, Span, Spanned};

use crate::types::{Type, TypeVar};

/// Result type used throughout the semantic core.
pub type Result<T> = std::result::Result<T, Box<Error>>;

/// Error taxonomy of the type checker.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Two types failed to unify at a concrete leaf.
    TypeMismatch {
        expected: Type,
        actual: Type,
        span: Option<Span>,
    },

    /// Function, constructor, tuple, or pattern had the wrong number of elements.
    ArityMismatch {
        expected: usize,
        actual: usize,
        span: Option<Span>,
    },

    /// Identifier not bound in scope.
    UnresolvedSymbol { name: String, span: Option<Span> },

    /// Same name declared twice in a namespace.
    DuplicateDefinition { name: String, span: Option<Span> },

    /// Operator applied to operand types it does not support.
    InvalidOperation { message: String, span: Option<Span> },

    /// A `match` does not cover all variants of its scrutinee's union.
    NonExhaustiveMatch {
        missing_patterns: Vec<String>,
        span: Option<Span>,
    },

    /// Occurs-check failure during unification.
    InfiniteType {
        var: TypeVar,
        ty: Type,
        span: Option<Span>,
    },

    /// `Result<T, E>` instantiated with an `E` incompatible with `Throwable`.
    ResultErrorTypeViolation { error_type: Type, span: Option<Span> },

    /// Validation found a primitive name outside the built-in set.
    UnknownPrimitiveType { name: String, span: Option<Span> },

    /// Aggregate carrying a non-empty ordered list of diagnostics.
    MultipleErrors { errors: Vec<Error> },

    /// Misuse of the checker's own API (never produced by user programs).
    Internal { message: String },
}

impl Error {
    /// Creates a type mismatch error.
    pub fn type_mismatch(expected: Type, actual: Type, span: Option<Span>) -> Self {
        Self::TypeMismatch {
            expected,
            actual,
            span,
        }
    }

    /// Creates an arity mismatch error.
    pub fn arity_mismatch(expected: usize, actual: usize, span: Option<Span>) -> Self {
        Self::ArityMismatch {
            expected,
            actual,
            span,
        }
    }

    /// Creates an unresolved symbol error.
    pub fn unresolved_symbol(name: impl Into<String>, span: Option<Span>) -> Self {
        Self::UnresolvedSymbol {
            name: name.into(),
            span,
        }
    }

    /// Creates a duplicate definition error.
    pub fn duplicate_definition(name: impl Into<String>, span: Option<Span>) -> Self {
        Self::DuplicateDefinition {
            name: name.into(),
            span,
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>, span: Option<Span>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
            span,
        }
    }

    /// Creates a non-exhaustive match error.
    pub fn non_exhaustive_match(missing_patterns: Vec<String>, span: Option<Span>) -> Self {
        Self::NonExhaustiveMatch {
            missing_patterns,
            span,
        }
    }

    /// Creates an infinite type (occurs check) error.
    pub fn infinite_type(var: TypeVar, ty: Type, span: Option<Span>) -> Self {
        Self::InfiniteType { var, ty, span }
    }

    /// Creates a Result error-slot violation.
    pub fn result_error_type_violation(error_type: Type, span: Option<Span>) -> Self {
        Self::ResultErrorTypeViolation { error_type, span }
    }

    /// Creates an unknown primitive type error.
    pub fn unknown_primitive_type(name: impl Into<String>, span: Option<Span>) -> Self {
        Self::UnknownPrimitiveType {
            name: name.into(),
            span,
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Wraps a list of errors, preserving discovery order.
    ///
    /// A single error stays bare; two or more are wrapped in `MultipleErrors`.
    pub fn aggregate(mut errors: Vec<Error>) -> Option<Error> {
        match errors.len() {
            0 => None,
            1 => Some(errors.remove(0)),
            _ => Some(Self::MultipleErrors { errors }),
        }
    }

    /// The stable kind name of this diagnostic.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TypeMismatch { .. } => "TypeMismatch",
            Self::ArityMismatch { .. } => "ArityMismatch",
            Self::UnresolvedSymbol { .. } => "UnresolvedSymbol",
            Self::DuplicateDefinition { .. } => "DuplicateDefinition",
            Self::InvalidOperation { .. } => "InvalidOperation",
            Self::NonExhaustiveMatch { .. } => "NonExhaustiveMatch",
            Self::InfiniteType { .. } => "InfiniteType",
            Self::ResultErrorTypeViolation { .. } => "ResultErrorTypeViolation",
            Self::UnknownPrimitiveType { .. } => "UnknownPrimitiveType",
            Self::MultipleErrors { .. } => "MultipleErrors",
            Self::Internal { .. } => "Internal",
        }
    }

    /// The source location attached to this diagnostic, if any.
    pub fn span(&self) -> Option<&Span> {
        match self {
            Self::TypeMismatch { span, .. }
            | Self::ArityMismatch { span, .. }
            | Self::UnresolvedSymbol { span, .. }
            | Self::DuplicateDefinition { span, .. }
            | Self::InvalidOperation { span, .. }
            | Self::NonExhaustiveMatch { span, .. }
            | Self::InfiniteType { span, .. }
            | Self::ResultErrorTypeViolation { span, .. }
            | Self::UnknownPrimitiveType { span, .. } => span.as_ref(),
            Self::MultipleErrors { errors } => errors.first().and_then(|e| e.span()),
            Self::Internal { .. } => None,
        }
    }

    /// Converts this error into a `Box<Error>` for use with the Result type.
    pub fn boxed(self) -> Box<Error> {
        Box::new(self)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TypeMismatch {
                expected, actual, ..
            } => {
                write!(f, "Type mismatch: expected {expected}, got {actual}")
            }
            Self::ArityMismatch {
                expected, actual, ..
            } => {
                write!(f, "Arity mismatch: expected {expected} elements, got {actual}")
            }
            Self::UnresolvedSymbol { name, .. } => write!(f, "Unresolved symbol: {name}"),
            Self::DuplicateDefinition { name, .. } => {
                write!(f, "Duplicate definition: {name}")
            }
            Self::InvalidOperation { message, .. } => write!(f, "Invalid operation: {message}"),
            Self::NonExhaustiveMatch {
                missing_patterns, ..
            } => {
                write!(
                    f,
                    "Non-exhaustive match: missing {}",
                    missing_patterns.join(", ")
                )
            }
            Self::InfiniteType { var, ty, .. } => {
                write!(f, "Infinite type: {var} occurs in {ty}")
            }
            Self::ResultErrorTypeViolation { error_type, .. } => {
                write!(
                    f,
                    "Result error type {error_type} is not compatible with Throwable"
                )
            }
            Self::UnknownPrimitiveType { name, .. } => {
                write!(f, "Unknown primitive type: {name}")
            }
            Self::MultipleErrors { errors } => {
                write!(f, "{} errors:", errors.len())?;
                for error in errors {
                    write!(f, "\n  {error}")?;
                }
                Ok(())
            }
            Self::Internal { message } => write!(f, "Internal error: {message}"),
        }
    }
}

impl std::error::Error for Error {}

/// Accumulates diagnostics for one top-level item.
///
/// Collection continues past expression-level failures; the item's final
/// verdict is produced by [`DiagnosticCollector::into_result`].
#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Error>,
}

impl DiagnosticCollector {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a diagnostic.
    pub fn report(&mut self, error: Error) {
        self.diagnostics.push(error);
    }

    /// Records every diagnostic from another collector, preserving order.
    pub fn absorb(&mut self, other: DiagnosticCollector) {
        self.diagnostics.extend(other.diagnostics);
    }

    /// Returns true if nothing was reported.
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Number of diagnostics reported so far.
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    /// The diagnostics reported so far, in discovery order.
    pub fn diagnostics(&self) -> &[Error] {
        &self.diagnostics
    }

    /// Consumes the collector, returning its diagnostics.
    pub fn into_diagnostics(self) -> Vec<Error> {
        self.diagnostics
    }

    /// Produces the item verdict: `Ok` if clean, a bare error for a single
    /// diagnostic, `MultipleErrors` for two or more.
    pub fn into_result(self) -> Result<()> {
        match Error::aggregate(self.diagnostics) {
            None => Ok(()),
            Some(error) => Err(error.boxed()),
        }
    }
}

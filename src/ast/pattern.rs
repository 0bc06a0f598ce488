//! Patterns for `match` expressions and `catch` clauses.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Literal;
use crate::diagnostics::Spanned;

/// A pattern, dispatched on by tag in the pattern checker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Pattern {
    /// `_` — matches anything, binds nothing
    Wildcard,
    /// `name` — matches anything, binds the scrutinee
    Identifier(String),
    /// A literal — matches exactly that value
    Literal(Literal),
    /// `Variant(p1, ..., pn)` — matches one union variant
    Constructor {
        name: String,
        args: Vec<Spanned<Pattern>>,
    },
    /// `(p1, ..., pn)` — matches a tuple element-wise
    Tuple(Vec<Spanned<Pattern>>),
    /// `[p1, ..., pn]` or `[p1, ..., pn, ...rest]` — matches a list prefix,
    /// optionally binding the remainder
    List {
        elements: Vec<Spanned<Pattern>>,
        rest: Option<String>,
    },
}

impl Pattern {
    /// Returns true if this pattern matches every value of its type.
    ///
    /// Only wildcard and identifier patterns are irrefutable on their own;
    /// composite irrefutability is decided by the pattern checker.
    pub fn is_irrefutable(&self) -> bool {
        matches!(self, Pattern::Wildcard | Pattern::Identifier(_))
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Wildcard => write!(f, "_"),
            Pattern::Identifier(name) => write!(f, "{name}"),
            Pattern::Literal(literal) => write!(f, "{literal}"),
            Pattern::Constructor { name, args } => {
                if args.is_empty() {
                    write!(f, "{name}")
                } else {
                    write!(f, "{name}(")?;
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}", arg.inner)?;
                    }
                    write!(f, ")")
                }
            }
            Pattern::Tuple(elements) => {
                write!(f, "(")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", element.inner)?;
                }
                write!(f, ")")
            }
            Pattern::List { elements, rest } => {
                write!(f, "[")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", element.inner)?;
                }
                if let Some(rest) = rest {
                    if !elements.is_empty() {
                        write!(f, ", ")?;
                    }
                    write!(f, "...{rest}")?;
                }
                write!(f, "]")
            }
        }
    }
}

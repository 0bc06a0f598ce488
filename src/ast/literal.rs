//! Literal values.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A literal value in source code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    /// Integer literal (`42`)
    Integer(i64),
    /// Floating-point literal (`3.14`)
    Float(f64),
    /// String literal (`"hello"`)
    String(String),
    /// Boolean literal (`true` / `false`)
    Boolean(bool),
    /// The null literal
    Null,
}

impl Literal {
    /// Returns true for the two numeric literal forms.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Literal::Integer(_) | Literal::Float(_))
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Integer(value) => write!(f, "{value}"),
            Literal::Float(value) => write!(f, "{value}"),
            Literal::String(value) => write!(f, "{value:?}"),
            Literal::Boolean(value) => write!(f, "{value}"),
            Literal::Null => write!(f, "null"),
        }
    }
}

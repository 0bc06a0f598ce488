//! The type model and the semantic analysis core built on it.
//!
//! Types are immutable value objects compared by structural equality; none of
//! them carries a source location. The submodules implement substitution,
//! constraints, unification, the typing environment, constraint collection,
//! pattern checking, and the top-level checker driver.

use std::collections::HashSet;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Mutex;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

pub mod algebraic;
pub mod constraint;
pub mod inference;
pub mod patterns;
pub mod substitution;
pub mod type_checker;
pub mod type_env;
pub mod type_scheme;
pub mod type_var;
pub mod typed_ast;
pub mod unification;
pub mod validation;

pub use algebraic::*;
pub use constraint::*;
pub use inference::*;
pub use patterns::*;
pub use substitution::*;
pub use type_checker::*;
pub use type_env::*;
pub use type_scheme::*;
pub use type_var::*;
pub use typed_ast::*;
pub use unification::*;
pub use validation::*;

/// The built-in primitive type names.
pub const BUILTIN_PRIMITIVES: [&str; 9] = [
    "Byte", "Short", "Int", "Long", "Float", "Double", "Boolean", "String", "Unit",
];

/// The numeric widening lattice, narrowest first.
pub const NUMERIC_LATTICE: [&str; 6] = ["Byte", "Short", "Int", "Long", "Float", "Double"];

/// The sentinel all `Result` error types must be compatible with.
pub const THROWABLE: &str = "Throwable";

/// Returns true if `name` is one of the built-in primitive types.
pub fn is_builtin_primitive(name: &str) -> bool {
    BUILTIN_PRIMITIVES.contains(&name)
}

/// A type in the TaylorLang type system.
///
/// Nested types inside a composite are themselves valid types; validity of a
/// whole tree is checked by [`validation::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    /// Built-in primitive type, identified by name
    Primitive(String),
    /// Named type reference: a type parameter in scope or the `Throwable`
    /// sentinel. Resolved by name, never expanded structurally.
    Named(String),
    /// Type variable for inference
    Variable(TypeVar),
    /// Library-defined generic type application (e.g. `List<Int>`)
    Generic { name: String, args: Vec<Type> },
    /// Function type
    Function {
        params: Vec<Type>,
        return_type: Box<Type>,
    },
    /// Tuple type
    Tuple(Vec<Type>),
    /// Nullable type (`T?`)
    Nullable(Box<Type>),
    /// Union (algebraic data) type application. Variant bodies live in the
    /// typing environment's type table and are resolved lazily by name.
    Union { name: String, type_args: Vec<Type> },
}

impl Type {
    // ============= CONSTRUCTORS =============

    /// `Byte`
    pub fn byte() -> Self {
        Type::Primitive("Byte".to_string())
    }

    /// `Short`
    pub fn short() -> Self {
        Type::Primitive("Short".to_string())
    }

    /// `Int`
    pub fn int() -> Self {
        Type::Primitive("Int".to_string())
    }

    /// `Long`
    pub fn long() -> Self {
        Type::Primitive("Long".to_string())
    }

    /// `Float`
    pub fn float() -> Self {
        Type::Primitive("Float".to_string())
    }

    /// `Double`
    pub fn double() -> Self {
        Type::Primitive("Double".to_string())
    }

    /// `Boolean`
    pub fn boolean() -> Self {
        Type::Primitive("Boolean".to_string())
    }

    /// `String`
    pub fn string() -> Self {
        Type::Primitive("String".to_string())
    }

    /// `Unit`
    pub fn unit() -> Self {
        Type::Primitive("Unit".to_string())
    }

    /// The `Throwable` sentinel.
    pub fn throwable() -> Self {
        Type::Named(THROWABLE.to_string())
    }

    /// Creates a fresh type variable.
    pub fn fresh_var() -> Self {
        Type::Variable(TypeVar::fresh())
    }

    /// Creates a named type variable.
    pub fn named_var(name: impl Into<String>) -> Self {
        Type::Variable(TypeVar::with_name(name))
    }

    /// Creates a function type from parameter types and return type.
    pub fn function(params: Vec<Type>, return_type: Type) -> Self {
        Type::Function {
            params,
            return_type: Box::new(return_type),
        }
    }

    /// Creates a generic type application.
    pub fn generic(name: impl Into<String>, args: Vec<Type>) -> Self {
        Type::Generic {
            name: name.into(),
            args,
        }
    }

    /// Creates the library `List<T>` type.
    pub fn list(element: Type) -> Self {
        Type::generic("List", vec![element])
    }

    /// Creates a tuple type.
    pub fn tuple(elements: Vec<Type>) -> Self {
        Type::Tuple(elements)
    }

    /// Creates a nullable type. Nesting collapses: `(T?)?` is `T?`.
    pub fn nullable(base: Type) -> Self {
        match base {
            Type::Nullable(_) => base,
            other => Type::Nullable(Box::new(other)),
        }
    }

    /// Creates a union type application.
    pub fn union(name: impl Into<String>, type_args: Vec<Type>) -> Self {
        Type::Union {
            name: name.into(),
            type_args,
        }
    }

    /// Creates `Result<T, E>`.
    pub fn result(ok: Type, err: Type) -> Self {
        Type::union("Result", vec![ok, err])
    }

    // ============= PREDICATES =============

    /// Returns true if this type is a type variable.
    pub fn is_variable(&self) -> bool {
        matches!(self, Type::Variable(_))
    }

    /// Returns true if this type is a function type.
    pub fn is_function(&self) -> bool {
        matches!(self, Type::Function { .. })
    }

    /// Returns true if this type is nullable.
    pub fn is_nullable(&self) -> bool {
        matches!(self, Type::Nullable(_))
    }

    /// The rank of this type in the numeric widening lattice, if numeric.
    pub fn numeric_rank(&self) -> Option<usize> {
        match self {
            Type::Primitive(name) => NUMERIC_LATTICE.iter().position(|n| n == name),
            _ => None,
        }
    }

    /// Returns true if this type is a numeric primitive.
    pub fn is_numeric(&self) -> bool {
        self.numeric_rank().is_some()
    }

    /// Returns the wider of two numeric primitives, or `None` if either side
    /// is not numeric.
    pub fn widen(a: &Type, b: &Type) -> Option<Type> {
        let ra = a.numeric_rank()?;
        let rb = b.numeric_rank()?;
        Some(if ra >= rb { a.clone() } else { b.clone() })
    }

    /// Returns true if this type may sit in the error slot of `Result<T, E>`.
    ///
    /// Only the `Throwable` sentinel is concrete-compatible; named references
    /// (type parameters) and inference variables are tolerated until they
    /// resolve.
    pub fn is_throwable_compatible(&self) -> bool {
        matches!(self, Type::Named(_) | Type::Variable(_))
    }

    // ============= VARIABLE QUERIES =============

    /// Returns true if this type contains the given type variable.
    pub fn contains_var(&self, var: &TypeVar) -> bool {
        match self {
            Type::Variable(v) => v == var,
            Type::Primitive(_) | Type::Named(_) => false,
            Type::Generic { args, .. } => args.iter().any(|a| a.contains_var(var)),
            Type::Function {
                params,
                return_type,
            } => params.iter().any(|p| p.contains_var(var)) || return_type.contains_var(var),
            Type::Tuple(elements) => elements.iter().any(|e| e.contains_var(var)),
            Type::Nullable(base) => base.contains_var(var),
            // Unions contribute only their type arguments; variant bodies are
            // resolved by name and never inspected here (occurs check included)
            Type::Union { type_args, .. } => type_args.iter().any(|a| a.contains_var(var)),
        }
    }

    /// Gets all free type variables in this type.
    ///
    /// Results are memoized in a process-wide LRU cache; correctness does not
    /// depend on the cache and [`clear_type_caches`] drops it wholesale.
    pub fn free_vars(&self) -> HashSet<TypeVar> {
        if let Ok(mut cache) = FREE_VARS_CACHE.lock() {
            if let Some(hit) = cache.get(self) {
                return hit.clone();
            }
        }

        let mut vars = HashSet::new();
        self.collect_free_vars(&mut vars);

        if let Ok(mut cache) = FREE_VARS_CACHE.lock() {
            cache.put(self.clone(), vars.clone());
        }
        vars
    }

    fn collect_free_vars(&self, vars: &mut HashSet<TypeVar>) {
        match self {
            Type::Variable(v) => {
                vars.insert(v.clone());
            }
            Type::Primitive(_) | Type::Named(_) => {}
            Type::Generic { args, .. } | Type::Union {
                type_args: args, ..
            } => {
                for arg in args {
                    arg.collect_free_vars(vars);
                }
            }
            Type::Function {
                params,
                return_type,
            } => {
                for param in params {
                    param.collect_free_vars(vars);
                }
                return_type.collect_free_vars(vars);
            }
            Type::Tuple(elements) => {
                for element in elements {
                    element.collect_free_vars(vars);
                }
            }
            Type::Nullable(base) => base.collect_free_vars(vars),
        }
    }
}

static FREE_VARS_CACHE: Lazy<Mutex<lru::LruCache<Type, HashSet<TypeVar>>>> = Lazy::new(|| {
    Mutex::new(lru::LruCache::new(
        NonZeroUsize::new(1024).expect("cache capacity is non-zero"),
    ))
});

/// Clears the free-variable memo cache. Safe at any point; typically called
/// between checker invocations.
pub fn clear_type_caches() {
    if let Ok(mut cache) = FREE_VARS_CACHE.lock() {
        cache.clear();
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Primitive(name) | Type::Named(name) => write!(f, "{name}"),
            Type::Variable(var) => write!(f, "{var}"),
            Type::Generic { name, args } | Type::Union {
                name,
                type_args: args,
            } => {
                if args.is_empty() {
                    write!(f, "{name}")
                } else {
                    write!(f, "{name}<")?;
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{arg}")?;
                    }
                    write!(f, ">")
                }
            }
            Type::Function {
                params,
                return_type,
            } => {
                write!(f, "(")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{param}")?;
                }
                write!(f, ") -> {return_type}")
            }
            Type::Tuple(elements) => {
                write!(f, "(")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{element}")?;
                }
                write!(f, ")")
            }
            Type::Nullable(base) => write!(f, "{base}?"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_equality() {
        assert_eq!(Type::int(), Type::int());
        assert_eq!(
            Type::function(vec![Type::int()], Type::string()),
            Type::function(vec![Type::int()], Type::string()),
        );
        assert_ne!(Type::int(), Type::long());
    }

    #[test]
    fn test_numeric_lattice_order() {
        assert!(Type::byte().numeric_rank() < Type::short().numeric_rank());
        assert!(Type::int().numeric_rank() < Type::long().numeric_rank());
        assert!(Type::long().numeric_rank() < Type::float().numeric_rank());
        assert!(Type::float().numeric_rank() < Type::double().numeric_rank());
        assert_eq!(Type::boolean().numeric_rank(), None);
    }

    #[test]
    fn test_widen() {
        assert_eq!(Type::widen(&Type::int(), &Type::long()), Some(Type::long()));
        assert_eq!(
            Type::widen(&Type::double(), &Type::byte()),
            Some(Type::double())
        );
        assert_eq!(Type::widen(&Type::int(), &Type::string()), None);
    }

    #[test]
    fn test_free_vars() {
        let var = TypeVar::fresh();
        let ty = Type::function(
            vec![Type::Variable(var.clone()), Type::int()],
            Type::list(Type::Variable(var.clone())),
        );
        let free = ty.free_vars();
        assert_eq!(free.len(), 1);
        assert!(free.contains(&var));
    }

    #[test]
    fn test_union_free_vars_are_argument_only() {
        // A recursive union mentions itself by name; only type arguments
        // contribute free variables.
        let var = TypeVar::fresh();
        let ty = Type::union("List", vec![Type::Variable(var.clone())]);
        assert!(ty.contains_var(&var));
        assert_eq!(ty.free_vars().len(), 1);
    }

    #[test]
    fn test_nullable_collapses() {
        let ty = Type::nullable(Type::nullable(Type::int()));
        assert_eq!(ty, Type::nullable(Type::int()));
    }

    #[test]
    fn test_display() {
        assert_eq!(Type::int().to_string(), "Int");
        assert_eq!(Type::list(Type::int()).to_string(), "List<Int>");
        assert_eq!(
            Type::function(vec![Type::int(), Type::int()], Type::int()).to_string(),
            "(Int, Int) -> Int"
        );
        assert_eq!(Type::nullable(Type::string()).to_string(), "String?");
        assert_eq!(
            Type::result(Type::int(), Type::throwable()).to_string(),
            "Result<Int, Throwable>"
        );
    }
}

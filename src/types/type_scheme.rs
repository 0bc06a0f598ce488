//! Polymorphic type schemes (`∀ vars . body`).

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Substitution, Type, TypeVar};

/// A type scheme: a type with universally quantified variables, instantiated
/// freshly at each use. A type is monomorphic iff the quantifier is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeScheme {
    /// Quantified type variables
    pub vars: Vec<TypeVar>,
    /// The scheme body
    pub ty: Type,
}

impl TypeScheme {
    /// Creates a monomorphic type scheme.
    pub fn monomorphic(ty: Type) -> Self {
        Self {
            vars: Vec::new(),
            ty,
        }
    }

    /// Creates a polymorphic type scheme.
    pub fn polymorphic(vars: Vec<TypeVar>, ty: Type) -> Self {
        Self { vars, ty }
    }

    /// Returns true if the quantifier is empty.
    pub fn is_monomorphic(&self) -> bool {
        self.vars.is_empty()
    }

    /// Instantiates this scheme, replacing each quantified variable with a
    /// fresh one. Quantified variables that carry a source name are also
    /// replaced where they appear as named references.
    pub fn instantiate(&self) -> Type {
        if self.vars.is_empty() {
            return self.ty.clone();
        }

        // Fresh variables are unnamed: a name would let the substitution's
        // Named-reference resolution capture unrelated references later
        let mappings = self
            .vars
            .iter()
            .map(|var| (var.clone(), Type::fresh_var()))
            .collect();

        Substitution::from_mappings(mappings).apply(&self.ty)
    }

    /// Free variables of the scheme: free variables of the body minus the
    /// quantified ones.
    pub fn free_vars(&self) -> HashSet<TypeVar> {
        let mut vars = self.ty.free_vars();
        for quantified in &self.vars {
            vars.remove(quantified);
        }
        vars
    }

    /// Generalizes a type over everything not free in the environment.
    ///
    /// `env_vars` is the set of variables free in the enclosing environment;
    /// the result quantifies the type's remaining free variables. Quantified
    /// variables are sorted by ID so instantiation order is deterministic.
    pub fn generalize(ty: &Type, env_vars: &HashSet<TypeVar>) -> TypeScheme {
        let mut quantified: Vec<_> = ty.free_vars().difference(env_vars).cloned().collect();
        quantified.sort_by_key(|var| var.id);
        TypeScheme::polymorphic(quantified, ty.clone())
    }
}

impl fmt::Display for TypeScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.vars.is_empty() {
            return write!(f, "{}", self.ty);
        }
        write!(f, "∀")?;
        for var in &self.vars {
            write!(f, " {var}")?;
        }
        write!(f, ". {}", self.ty)
    }
}

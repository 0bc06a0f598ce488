//! Type constraints and constraint sets.
//!
//! Constraints are generated by the collector and satisfied by the unifier.
//! A constraint carries an optional source location used solely for
//! diagnostics; it plays no part in solving.

use std::collections::HashSet;
use std::fmt;

use super::{Substitution, Type, TypeScheme, TypeVar};
use crate::diagnostics::Span;

/// An assertion about types that the unifier must satisfy.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// The two types must unify.
    Equality {
        left: Type,
        right: Type,
        span: Option<Span>,
    },

    /// `sub` must be assignable to `sup`. This reduces to equality modulo the
    /// numeric widening lattice; it is not a general subtyping relation.
    Subtype {
        sub: Type,
        sup: Type,
        span: Option<Span>,
    },

    /// The variable must be a fresh instantiation of the scheme.
    Instance {
        var: TypeVar,
        scheme: TypeScheme,
        span: Option<Span>,
    },
}

impl Constraint {
    /// Creates an equality constraint.
    pub fn equality(left: Type, right: Type, span: Option<Span>) -> Self {
        Constraint::Equality { left, right, span }
    }

    /// Creates a subtype constraint.
    pub fn subtype(sub: Type, sup: Type, span: Option<Span>) -> Self {
        Constraint::Subtype { sub, sup, span }
    }

    /// Creates an instance constraint.
    pub fn instance(var: TypeVar, scheme: TypeScheme, span: Option<Span>) -> Self {
        Constraint::Instance { var, scheme, span }
    }

    /// The source location attached to this constraint, if any.
    pub fn span(&self) -> Option<&Span> {
        match self {
            Constraint::Equality { span, .. }
            | Constraint::Subtype { span, .. }
            | Constraint::Instance { span, .. } => span.as_ref(),
        }
    }

    /// All type variables mentioned in this constraint.
    pub fn free_vars(&self) -> HashSet<TypeVar> {
        match self {
            Constraint::Equality { left, right, .. } => {
                let mut vars = left.free_vars();
                vars.extend(right.free_vars());
                vars
            }
            Constraint::Subtype { sub, sup, .. } => {
                let mut vars = sub.free_vars();
                vars.extend(sup.free_vars());
                vars
            }
            Constraint::Instance { var, scheme, .. } => {
                let mut vars = scheme.free_vars();
                vars.insert(var.clone());
                vars
            }
        }
    }

    /// Applies a substitution to both sides of this constraint.
    pub fn apply_substitution(&self, subst: &Substitution) -> Constraint {
        match self {
            Constraint::Equality { left, right, span } => Constraint::Equality {
                left: subst.apply(left),
                right: subst.apply(right),
                span: span.clone(),
            },
            Constraint::Subtype { sub, sup, span } => Constraint::Subtype {
                sub: subst.apply(sub),
                sup: subst.apply(sup),
                span: span.clone(),
            },
            Constraint::Instance { var, scheme, span } => Constraint::Instance {
                var: var.clone(),
                scheme: subst.apply_to_scheme(scheme),
                span: span.clone(),
            },
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Equality { left, right, .. } => write!(f, "{left} = {right}"),
            Constraint::Subtype { sub, sup, .. } => write!(f, "{sub} <: {sup}"),
            Constraint::Instance { var, scheme, .. } => write!(f, "{var} ⊑ {scheme}"),
        }
    }
}

/// An unordered multiset of constraints.
///
/// The set is immutable: every operation returns a new set. Insertion order
/// is preserved so solving and failure reporting are deterministic.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConstraintSet {
    constraints: Vec<Constraint>,
}

impl ConstraintSet {
    /// Creates an empty constraint set.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a set from a list of constraints.
    pub fn from_vec(constraints: Vec<Constraint>) -> Self {
        Self { constraints }
    }

    /// Creates a set with a single constraint.
    pub fn singleton(constraint: Constraint) -> Self {
        Self {
            constraints: vec![constraint],
        }
    }

    /// Returns a new set with the constraint appended.
    pub fn add(&self, constraint: Constraint) -> Self {
        let mut constraints = self.constraints.clone();
        constraints.push(constraint);
        Self { constraints }
    }

    /// Returns the union of two sets (multiset semantics: duplicates kept).
    pub fn union(&self, other: &ConstraintSet) -> Self {
        let mut constraints = self.constraints.clone();
        constraints.extend(other.constraints.iter().cloned());
        Self { constraints }
    }

    /// Returns the subset of constraints matching the predicate.
    pub fn filter(&self, pred: impl Fn(&Constraint) -> bool) -> Self {
        Self {
            constraints: self
                .constraints
                .iter()
                .filter(|c| pred(c))
                .cloned()
                .collect(),
        }
    }

    /// Splits the set into (matching, non-matching).
    pub fn partition(&self, pred: impl Fn(&Constraint) -> bool) -> (Self, Self) {
        let (yes, no) = self.constraints.iter().cloned().partition(|c| pred(c));
        (Self { constraints: yes }, Self { constraints: no })
    }

    /// Returns true if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Number of constraints in the set.
    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    /// Iterates over the constraints in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter()
    }

    /// Consumes the set, returning its constraints.
    pub fn into_vec(self) -> Vec<Constraint> {
        self.constraints
    }
}

impl FromIterator<Constraint> for ConstraintSet {
    fn from_iter<I: IntoIterator<Item = Constraint>>(iter: I) -> Self {
        Self {
            constraints: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for ConstraintSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, constraint) in self.constraints.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{constraint}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_operations_return_new_sets() {
        let set = ConstraintSet::empty();
        let grown = set.add(Constraint::equality(Type::int(), Type::int(), None));

        assert!(set.is_empty());
        assert_eq!(grown.len(), 1);
    }

    #[test]
    fn test_union_keeps_duplicates() {
        let c = Constraint::equality(Type::int(), Type::int(), None);
        let a = ConstraintSet::singleton(c.clone());
        let b = ConstraintSet::singleton(c);
        assert_eq!(a.union(&b).len(), 2);
    }

    #[test]
    fn test_partition() {
        let set = ConstraintSet::from_vec(vec![
            Constraint::equality(Type::int(), Type::int(), None),
            Constraint::subtype(Type::int(), Type::long(), None),
        ]);

        let (subtypes, rest) = set.partition(|c| matches!(c, Constraint::Subtype { .. }));
        assert_eq!(subtypes.len(), 1);
        assert_eq!(rest.len(), 1);
    }

    #[test]
    fn test_constraint_free_vars() {
        let var = TypeVar::fresh();
        let c = Constraint::equality(Type::Variable(var.clone()), Type::int(), None);
        assert!(c.free_vars().contains(&var));
    }
}

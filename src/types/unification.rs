//! Unification: solving constraint sets into most general substitutions.
//!
//! Robinson's algorithm in worklist form. The worklist is a FIFO queue and
//! every composite case pushes element-wise constraints back onto it, so
//! solving order (and therefore failure reporting) never depends on hash
//! order. Same-named unions unify by their type arguments alone; variant
//! bodies are never expanded.

use std::collections::VecDeque;

use log::trace;

use super::{Constraint, ConstraintSet, Substitution, Type};
use crate::diagnostics::{Error, Result, Span};

/// Whether a primitive pair may widen symmetrically or only narrow-to-wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Widening {
    /// Equality: either side may be the wider one
    Symmetric,
    /// Subtype: the left side's rank must not exceed the right's
    Directed,
}

/// The unification engine.
///
/// Accumulates a substitution as constraints are consumed; the final
/// substitution is normalized so no domain variable appears in its range.
#[derive(Debug, Default)]
pub struct Unifier {
    substitution: Substitution,
}

impl Unifier {
    /// Creates a new unifier with an empty substitution.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a unifier seeded with an initial substitution.
    pub fn with_substitution(substitution: Substitution) -> Self {
        Self { substitution }
    }

    /// The substitution accumulated so far.
    pub fn substitution(&self) -> &Substitution {
        &self.substitution
    }

    /// Solves a whole constraint set, returning the most general substitution.
    ///
    /// Failures carry the source location of the user-visible constraint that
    /// triggered them.
    pub fn solve(mut self, constraints: &ConstraintSet) -> Result<Substitution> {
        let mut worklist: VecDeque<Constraint> = constraints.iter().cloned().collect();

        while let Some(constraint) = worklist.pop_front() {
            let constraint = constraint.apply_substitution(&self.substitution);
            trace!("solving constraint: {constraint}");

            match constraint {
                Constraint::Equality { left, right, span } => {
                    self.unify_step(left, right, span, Widening::Symmetric, &mut worklist)?;
                }
                Constraint::Subtype { sub, sup, span } => {
                    self.unify_step(sub, sup, span, Widening::Directed, &mut worklist)?;
                }
                Constraint::Instance { var, scheme, span } => {
                    let instantiated = scheme.instantiate();
                    worklist.push_back(Constraint::equality(
                        Type::Variable(var),
                        instantiated,
                        span,
                    ));
                }
            }
        }

        Ok(self.substitution.normalize())
    }

    /// Unifies two already-substituted types, extending the substitution or
    /// pushing element-wise sub-constraints.
    fn unify_step(
        &mut self,
        left: Type,
        right: Type,
        span: Option<Span>,
        widening: Widening,
        worklist: &mut VecDeque<Constraint>,
    ) -> Result<()> {
        match (left, right) {
            // Identical types unify trivially
            (l, r) if l == r => Ok(()),

            // Variable binding with occurs check
            (Type::Variable(var), ty) | (ty, Type::Variable(var)) => {
                if ty.contains_var(&var) {
                    return Err(Error::infinite_type(var, ty, span).boxed());
                }
                self.substitution = Substitution::single(var, ty).compose(&self.substitution);
                Ok(())
            }

            // Numeric widening between distinct primitives; anything else
            // concrete is a mismatch
            (Type::Primitive(a), Type::Primitive(b)) => {
                let left = Type::Primitive(a);
                let right = Type::Primitive(b);
                match (left.numeric_rank(), right.numeric_rank()) {
                    (Some(ra), Some(rb)) => match widening {
                        Widening::Symmetric => Ok(()),
                        Widening::Directed if ra <= rb => Ok(()),
                        Widening::Directed => Err(mismatch(left, right, widening, span)),
                    },
                    _ => Err(mismatch(left, right, widening, span)),
                }
            }

            // Same-named generics unify argument-wise
            (
                Type::Generic { name: n1, args: a1 },
                Type::Generic { name: n2, args: a2 },
            ) if n1 == n2 => {
                if a1.len() != a2.len() {
                    return Err(Error::arity_mismatch(a1.len(), a2.len(), span).boxed());
                }
                for (l, r) in a1.into_iter().zip(a2) {
                    worklist.push_back(Constraint::equality(l, r, span.clone()));
                }
                Ok(())
            }

            // Function types: parameter-wise plus return
            (
                Type::Function {
                    params: p1,
                    return_type: r1,
                },
                Type::Function {
                    params: p2,
                    return_type: r2,
                },
            ) => {
                if p1.len() != p2.len() {
                    return Err(Error::arity_mismatch(p1.len(), p2.len(), span).boxed());
                }
                for (l, r) in p1.into_iter().zip(p2) {
                    worklist.push_back(Constraint::equality(l, r, span.clone()));
                }
                worklist.push_back(Constraint::equality(*r1, *r2, span));
                Ok(())
            }

            // Tuples: element-wise, arity must match
            (Type::Tuple(e1), Type::Tuple(e2)) => {
                if e1.len() != e2.len() {
                    return Err(Error::arity_mismatch(e1.len(), e2.len(), span).boxed());
                }
                for (l, r) in e1.into_iter().zip(e2) {
                    worklist.push_back(Constraint::equality(l, r, span.clone()));
                }
                Ok(())
            }

            // Nullable pairs unify by their bases
            (Type::Nullable(b1), Type::Nullable(b2)) => {
                worklist.push_back(Constraint::equality(*b1, *b2, span));
                Ok(())
            }

            // Nullability is absorbed against a non-nullable side
            (Type::Nullable(base), other) | (other, Type::Nullable(base)) => {
                worklist.push_back(Constraint::equality(*base, other, span));
                Ok(())
            }

            // Same-named unions unify by their type arguments, never by
            // expanding variant bodies
            (
                Type::Union {
                    name: n1,
                    type_args: a1,
                },
                Type::Union {
                    name: n2,
                    type_args: a2,
                },
            ) if n1 == n2 => {
                if a1.len() != a2.len() {
                    return Err(Error::arity_mismatch(a1.len(), a2.len(), span).boxed());
                }
                for (l, r) in a1.into_iter().zip(a2) {
                    worklist.push_back(Constraint::equality(l, r, span.clone()));
                }
                Ok(())
            }

            // Any other shape is a mismatch
            (left, right) => Err(mismatch(left, right, widening, span)),
        }
    }
}

/// A mismatch's expected/actual roles depend on the constraint kind: an
/// equality reports its left side as expected; a subtype constraint's
/// expectation is the supertype.
fn mismatch(left: Type, right: Type, widening: Widening, span: Option<Span>) -> Box<Error> {
    match widening {
        Widening::Symmetric => Error::type_mismatch(left, right, span).boxed(),
        Widening::Directed => Error::type_mismatch(right, left, span).boxed(),
    }
}

/// Unifies two types, returning the most general unifier.
pub fn unify(left: &Type, right: &Type) -> Result<Substitution> {
    Unifier::new().solve(&ConstraintSet::singleton(Constraint::equality(
        left.clone(),
        right.clone(),
        None,
    )))
}

/// Solves a constraint set, returning the most general substitution.
pub fn solve(constraints: &ConstraintSet) -> Result<Substitution> {
    Unifier::new().solve(constraints)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TypeScheme, TypeVar};

    #[test]
    fn test_unify_identical_types() {
        let subst = unify(&Type::int(), &Type::int()).unwrap();
        assert!(subst.is_empty());
    }

    #[test]
    fn test_structurally_equal_types_give_empty_substitution() {
        let ty = Type::function(vec![Type::list(Type::int())], Type::string());
        let subst = unify(&ty, &ty.clone()).unwrap();
        assert!(subst.is_empty());
    }

    #[test]
    fn test_unify_variable_with_type() {
        let var = TypeVar::fresh();
        let subst = unify(&Type::Variable(var.clone()), &Type::int()).unwrap();
        assert_eq!(subst.apply(&Type::Variable(var)), Type::int());
    }

    #[test]
    fn test_unifier_makes_sides_equal() {
        let var1 = TypeVar::fresh();
        let var2 = TypeVar::fresh();

        let f1 = Type::function(
            vec![Type::Variable(var1.clone())],
            Type::Variable(var2.clone()),
        );
        let f2 = Type::function(vec![Type::int()], Type::string());

        let subst = unify(&f1, &f2).unwrap();
        assert_eq!(subst.apply(&f1), subst.apply(&f2));
        assert_eq!(subst.apply(&Type::Variable(var1)), Type::int());
        assert_eq!(subst.apply(&Type::Variable(var2)), Type::string());
    }

    #[test]
    fn test_occurs_check() {
        let var = TypeVar::fresh();
        let recursive = Type::list(Type::Variable(var.clone()));

        let err = unify(&Type::Variable(var), &recursive).unwrap_err();
        assert_eq!(err.kind(), "InfiniteType");
    }

    #[test]
    fn test_recursive_union_passes_occurs_check() {
        // Union("List", [t]) does not contain t's container structurally;
        // the self-reference is by name, so no InfiniteType is raised.
        let var = TypeVar::fresh();
        let list_of_int = Type::union("List", vec![Type::int()]);
        let subst = unify(&Type::Variable(var.clone()), &list_of_int).unwrap();
        assert_eq!(subst.apply(&Type::Variable(var)), list_of_int);
    }

    #[test]
    fn test_same_named_unions_unify_by_arguments() {
        let var = TypeVar::fresh();
        let open = Type::union("Option", vec![Type::Variable(var.clone())]);
        let closed = Type::union("Option", vec![Type::int()]);

        let subst = unify(&open, &closed).unwrap();
        assert_eq!(subst.apply(&Type::Variable(var)), Type::int());
    }

    #[test]
    fn test_distinct_unions_mismatch() {
        let a = Type::union("Option", vec![Type::int()]);
        let b = Type::union("Either", vec![Type::int()]);
        let err = unify(&a, &b).unwrap_err();
        assert_eq!(err.kind(), "TypeMismatch");
    }

    #[test]
    fn test_tuple_arity_mismatch() {
        let a = Type::tuple(vec![Type::int(), Type::int()]);
        let b = Type::tuple(vec![Type::int()]);
        let err = unify(&a, &b).unwrap_err();
        assert_eq!(err.kind(), "ArityMismatch");
    }

    #[test]
    fn test_function_arity_mismatch() {
        let a = Type::function(vec![Type::int()], Type::int());
        let b = Type::function(vec![Type::int(), Type::int()], Type::int());
        let err = unify(&a, &b).unwrap_err();
        assert_eq!(err.kind(), "ArityMismatch");
    }

    #[test]
    fn test_numeric_widening_is_symmetric_for_equality() {
        assert!(unify(&Type::int(), &Type::long()).is_ok());
        assert!(unify(&Type::double(), &Type::byte()).is_ok());
        let err = unify(&Type::int(), &Type::string()).unwrap_err();
        assert_eq!(err.kind(), "TypeMismatch");
    }

    #[test]
    fn test_subtype_widening_is_directed() {
        let widening_ok = ConstraintSet::singleton(Constraint::subtype(
            Type::int(),
            Type::long(),
            None,
        ));
        assert!(solve(&widening_ok).is_ok());

        let narrowing = ConstraintSet::singleton(Constraint::subtype(
            Type::long(),
            Type::int(),
            None,
        ));
        let err = solve(&narrowing).unwrap_err();
        assert_eq!(err.kind(), "TypeMismatch");
    }

    #[test]
    fn test_nullable_absorption() {
        // Nullable vs Nullable unifies bases
        let var = TypeVar::fresh();
        let subst = unify(
            &Type::nullable(Type::Variable(var.clone())),
            &Type::nullable(Type::int()),
        )
        .unwrap();
        assert_eq!(subst.apply(&Type::Variable(var)), Type::int());

        // Nullable vs bare type absorbs the nullability
        assert!(unify(&Type::nullable(Type::int()), &Type::int()).is_ok());
    }

    #[test]
    fn test_instance_constraint_instantiates_scheme() {
        let scheme_var = TypeVar::fresh();
        let scheme = TypeScheme::polymorphic(
            vec![scheme_var.clone()],
            Type::function(
                vec![Type::Variable(scheme_var.clone())],
                Type::Variable(scheme_var),
            ),
        );

        let target = TypeVar::fresh();
        let cs = ConstraintSet::from_vec(vec![
            Constraint::instance(target.clone(), scheme, None),
            Constraint::equality(
                Type::Variable(target.clone()),
                Type::function(vec![Type::int()], Type::int()),
                None,
            ),
        ]);

        let subst = solve(&cs).unwrap();
        assert_eq!(
            subst.apply(&Type::Variable(target)),
            Type::function(vec![Type::int()], Type::int())
        );
    }

    #[test]
    fn test_solve_satisfies_every_equality() {
        let a = TypeVar::fresh();
        let b = TypeVar::fresh();
        let cs = ConstraintSet::from_vec(vec![
            Constraint::equality(Type::Variable(a.clone()), Type::Variable(b.clone()), None),
            Constraint::equality(Type::Variable(b.clone()), Type::boolean(), None),
        ]);

        let subst = solve(&cs).unwrap();
        for constraint in cs.iter() {
            if let Constraint::Equality { left, right, .. } = constraint {
                assert_eq!(subst.apply(left), subst.apply(right));
            }
        }
        assert_eq!(subst.apply(&Type::Variable(a)), Type::boolean());
    }

    #[test]
    fn test_failure_carries_span() {
        let span = Span::with_position(4, 6, 2, 5);
        let cs = ConstraintSet::singleton(Constraint::equality(
            Type::int(),
            Type::string(),
            Some(span.clone()),
        ));
        let err = solve(&cs).unwrap_err();
        assert_eq!(err.span(), Some(&span));
    }
}

//! Type variable substitution.
//!
//! A substitution is a finite map from type variables to types, composed
//! during unification into the most general unifier. Composition is
//! associative but not commutative.

use std::collections::{HashMap, HashSet};
use std::fmt;

use super::{Type, TypeScheme, TypeVar};

/// A substitution maps type variables to types.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Substitution {
    mapping: HashMap<TypeVar, Type>,
}

impl Substitution {
    /// Creates an empty substitution (identity).
    pub fn empty() -> Self {
        Self {
            mapping: HashMap::new(),
        }
    }

    /// Creates a substitution with a single mapping. No occurs check is done
    /// here; that is the unifier's job.
    pub fn single(var: TypeVar, ty: Type) -> Self {
        let mut mapping = HashMap::new();
        mapping.insert(var, ty);
        Self { mapping }
    }

    /// Creates a substitution from a list of mappings.
    pub fn from_mappings(mappings: Vec<(TypeVar, Type)>) -> Self {
        Self {
            mapping: mappings.into_iter().collect(),
        }
    }

    /// Returns true if this is the identity substitution.
    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    /// Number of mappings.
    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    /// Gets the mapping for a type variable, if any.
    pub fn get(&self, var: &TypeVar) -> Option<&Type> {
        self.mapping.get(var)
    }

    /// Returns true if the substitution maps the given variable.
    pub fn contains_var(&self, var: &TypeVar) -> bool {
        self.mapping.contains_key(var)
    }

    /// Finds the mapping whose variable carries the given source name.
    ///
    /// Named types act as references to type variables when their name equals
    /// a mapped variable's name; ties break toward the lowest ID so behavior
    /// never depends on hash order.
    fn get_by_name(&self, name: &str) -> Option<&Type> {
        self.mapping
            .iter()
            .filter(|(var, _)| var.name.as_deref() == Some(name))
            .min_by_key(|(var, _)| var.id)
            .map(|(_, ty)| ty)
    }

    /// Applies this substitution to a type.
    pub fn apply(&self, ty: &Type) -> Type {
        match ty {
            Type::Variable(var) => {
                if let Some(mapped) = self.mapping.get(var) {
                    // Chains resolve recursively; composition keeps them short
                    self.apply(mapped)
                } else {
                    ty.clone()
                }
            }
            Type::Named(name) => {
                if let Some(mapped) = self.get_by_name(name) {
                    self.apply(&mapped.clone())
                } else {
                    ty.clone()
                }
            }
            Type::Primitive(_) => ty.clone(),
            Type::Generic { name, args } => Type::Generic {
                name: name.clone(),
                args: args.iter().map(|a| self.apply(a)).collect(),
            },
            Type::Function {
                params,
                return_type,
            } => Type::function(
                params.iter().map(|p| self.apply(p)).collect(),
                self.apply(return_type),
            ),
            Type::Tuple(elements) => {
                Type::Tuple(elements.iter().map(|e| self.apply(e)).collect())
            }
            Type::Nullable(base) => Type::nullable(self.apply(base)),
            Type::Union { name, type_args } => Type::Union {
                name: name.clone(),
                type_args: type_args.iter().map(|a| self.apply(a)).collect(),
            },
        }
    }

    /// Applies this substitution to a type scheme, respecting quantifiers.
    pub fn apply_to_scheme(&self, scheme: &TypeScheme) -> TypeScheme {
        let filtered = self.remove_vars(&scheme.vars);
        TypeScheme {
            vars: scheme.vars.clone(),
            ty: filtered.apply(&scheme.ty),
        }
    }

    /// Composes this substitution with another (`self ∘ other`).
    ///
    /// The result applies `other` first, then `self`:
    /// `compose(other).apply(t) == self.apply(&other.apply(t))`.
    pub fn compose(&self, other: &Substitution) -> Substitution {
        let mut mapping = HashMap::new();

        // Apply self to all types in other's range
        for (var, ty) in &other.mapping {
            mapping.insert(var.clone(), self.apply(ty));
        }

        // Add mappings from self whose domain is not already present
        for (var, ty) in &self.mapping {
            if !other.mapping.contains_key(var) {
                mapping.insert(var.clone(), ty.clone());
            }
        }

        Substitution { mapping }
    }

    /// Extends the substitution with a new mapping.
    ///
    /// Fails if the variable is already bound to a different type.
    pub fn extend(&self, var: TypeVar, ty: Type) -> Result<Substitution, String> {
        if let Some(existing) = self.mapping.get(&var) {
            if existing != &ty {
                return Err(format!(
                    "variable {var} is already bound to {existing}, cannot bind to {ty}"
                ));
            }
        }

        let mut mapping = self.mapping.clone();
        mapping.insert(var, ty);
        Ok(Substitution { mapping })
    }

    /// Removes a variable from the substitution domain.
    pub fn remove_var(&self, var: &TypeVar) -> Substitution {
        let mut mapping = self.mapping.clone();
        mapping.remove(var);
        Substitution { mapping }
    }

    /// Removes multiple variables from the substitution domain.
    pub fn remove_vars(&self, vars: &[TypeVar]) -> Substitution {
        let mut mapping = self.mapping.clone();
        for var in vars {
            mapping.remove(var);
        }
        Substitution { mapping }
    }

    /// Restricts the substitution to only the given variables.
    pub fn restrict_to(&self, vars: &[TypeVar]) -> Substitution {
        let keep: HashSet<_> = vars.iter().collect();
        let mapping = self
            .mapping
            .iter()
            .filter(|(var, _)| keep.contains(var))
            .map(|(var, ty)| (var.clone(), ty.clone()))
            .collect();
        Substitution { mapping }
    }

    /// All variables in the domain of this substitution.
    pub fn domain(&self) -> Vec<TypeVar> {
        self.mapping.keys().cloned().collect()
    }

    /// All free variables appearing in the range of this substitution.
    pub fn range_vars(&self) -> HashSet<TypeVar> {
        let mut vars = HashSet::new();
        for ty in self.mapping.values() {
            vars.extend(ty.free_vars());
        }
        vars
    }

    /// Applies the substitution to its own range until a fixed point, so no
    /// domain variable appears in the range.
    pub fn normalize(&self) -> Substitution {
        let mut current = self.clone();
        let mut changed = true;

        while changed {
            changed = false;
            let mut mapping = HashMap::new();
            for (var, ty) in &current.mapping {
                let applied = current.apply(ty);
                if &applied != ty {
                    changed = true;
                }
                mapping.insert(var.clone(), applied);
            }
            current.mapping = mapping;
        }

        current
    }

    /// Returns true if applying the substitution twice gives the same result
    /// as applying it once.
    pub fn is_idempotent(&self) -> bool {
        self.mapping.values().all(|ty| &self.apply(ty) == ty)
    }
}

impl fmt::Display for Substitution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.mapping.is_empty() {
            return write!(f, "∅");
        }

        // Sorted by ID so output is stable
        let mut entries: Vec<_> = self.mapping.iter().collect();
        entries.sort_by_key(|(var, _)| var.id);

        write!(f, "[")?;
        for (i, (var, ty)) in entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{var} ↦ {ty}")?;
        }
        write!(f, "]")
    }
}

/// Extension trait for applying substitutions to compound values.
pub trait Substitutable {
    /// Applies a substitution to this value.
    fn apply_substitution(&self, subst: &Substitution) -> Self;
}

impl Substitutable for Type {
    fn apply_substitution(&self, subst: &Substitution) -> Self {
        subst.apply(self)
    }
}

impl Substitutable for TypeScheme {
    fn apply_substitution(&self, subst: &Substitution) -> Self {
        subst.apply_to_scheme(self)
    }
}

impl<T: Substitutable> Substitutable for Vec<T> {
    fn apply_substitution(&self, subst: &Substitution) -> Self {
        self.iter().map(|x| x.apply_substitution(subst)).collect()
    }
}

impl<T: Substitutable> Substitutable for Option<T> {
    fn apply_substitution(&self, subst: &Substitution) -> Self {
        self.as_ref().map(|x| x.apply_substitution(subst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_substitution_is_identity() {
        let subst = Substitution::empty();
        assert!(subst.is_empty());
        assert!(subst.is_idempotent());
        assert_eq!(subst.apply(&Type::int()), Type::int());
    }

    #[test]
    fn test_single_substitution() {
        let var = TypeVar::with_id(1);
        let subst = Substitution::single(var.clone(), Type::int());

        assert!(subst.contains_var(&var));
        assert_eq!(subst.apply(&Type::Variable(var)), Type::int());
    }

    #[test]
    fn test_composition_chains() {
        let var1 = TypeVar::with_id(1);
        let var2 = TypeVar::with_id(2);
        let var3 = TypeVar::with_id(3);

        let s1 = Substitution::single(var1.clone(), Type::Variable(var2.clone()));
        let s2 = Substitution::single(var2.clone(), Type::int());

        let composed = s2.compose(&s1);
        assert_eq!(composed.apply(&Type::Variable(var1)), Type::int());
        assert_eq!(composed.apply(&Type::Variable(var2)), Type::int());
        assert_eq!(
            composed.apply(&Type::Variable(var3.clone())),
            Type::Variable(var3)
        );
    }

    #[test]
    fn test_compose_identity_laws() {
        let var = TypeVar::with_id(1);
        let s = Substitution::single(var.clone(), Type::string());
        let empty = Substitution::empty();

        let probe = Type::function(vec![Type::Variable(var)], Type::int());
        assert_eq!(empty.compose(&s).apply(&probe), s.apply(&probe));
        assert_eq!(s.compose(&empty).apply(&probe), s.apply(&probe));
    }

    #[test]
    fn test_idempotence_after_composition() {
        let var1 = TypeVar::with_id(1);
        let var2 = TypeVar::with_id(2);

        let s1 = Substitution::single(var1.clone(), Type::Variable(var2.clone()));
        let s2 = Substitution::single(var2, Type::boolean());
        let composed = s2.compose(&s1).normalize();

        let probe = Type::tuple(vec![Type::Variable(var1), Type::int()]);
        assert_eq!(
            composed.apply(&composed.apply(&probe)),
            composed.apply(&probe)
        );
        assert!(composed.is_idempotent());
    }

    #[test]
    fn test_named_reference_resolution() {
        // Identifier-level type variables are spelled as names in source;
        // a Named type matching a mapped variable's name is replaced.
        let var = TypeVar::with_name("T");
        let subst = Substitution::single(var, Type::int());

        assert_eq!(subst.apply(&Type::Named("T".to_string())), Type::int());
        assert_eq!(
            subst.apply(&Type::Named("U".to_string())),
            Type::Named("U".to_string())
        );
    }

    #[test]
    fn test_function_type_substitution() {
        let var = TypeVar::with_id(1);
        let func = Type::function(
            vec![Type::Variable(var.clone())],
            Type::Variable(var.clone()),
        );
        let subst = Substitution::single(var, Type::int());

        assert_eq!(
            subst.apply(&func),
            Type::function(vec![Type::int()], Type::int())
        );
    }

    #[test]
    fn test_restrict_and_remove() {
        let var1 = TypeVar::with_id(1);
        let var2 = TypeVar::with_id(2);
        let subst = Substitution::from_mappings(vec![
            (var1.clone(), Type::int()),
            (var2.clone(), Type::string()),
        ]);

        let restricted = subst.restrict_to(&[var1.clone()]);
        assert!(restricted.contains_var(&var1));
        assert!(!restricted.contains_var(&var2));

        let removed = subst.remove_var(&var1);
        assert!(!removed.contains_var(&var1));
        assert!(removed.contains_var(&var2));
    }
}

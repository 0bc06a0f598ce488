//! Algebraic (union) type definitions and function signatures.
//!
//! A union definition stores its variant field types structurally but is
//! referenced everywhere else by name: the self-reference inside a recursive
//! union is a `Union` node over the type parameters, never the expanded type
//! graph.

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{Type, TypeVar};
use crate::diagnostics::{Error, Result, Span};

/// One constructor of a union type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantDef {
    /// Variant name, unique within the union
    pub name: String,
    /// Field types; type parameters appear as named references
    pub field_types: Vec<Type>,
    /// Declaration site
    pub span: Option<Span>,
}

impl VariantDef {
    /// Creates a variant definition.
    pub fn new(name: impl Into<String>, field_types: Vec<Type>, span: Option<Span>) -> Self {
        Self {
            name: name.into(),
            field_types,
            span,
        }
    }

    /// Number of fields this constructor takes.
    pub fn arity(&self) -> usize {
        self.field_types.len()
    }

    /// Returns true if this constructor takes no fields.
    pub fn is_nullary(&self) -> bool {
        self.field_types.is_empty()
    }
}

/// A union type definition: type parameters plus named variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDefinition {
    /// Union name
    pub name: String,
    /// Type parameter names, in declaration order
    pub type_params: Vec<String>,
    /// Variants keyed by name, in declaration order
    pub variants: IndexMap<String, VariantDef>,
    /// Declaration site
    pub span: Option<Span>,
}

impl TypeDefinition {
    /// Creates a union definition, rejecting duplicate variant names.
    pub fn union(
        name: impl Into<String>,
        type_params: Vec<String>,
        variants: Vec<VariantDef>,
        span: Option<Span>,
    ) -> Result<Self> {
        let name = name.into();
        let mut table = IndexMap::new();
        for variant in variants {
            if table.contains_key(&variant.name) {
                return Err(Error::duplicate_definition(variant.name, variant.span).boxed());
            }
            table.insert(variant.name.clone(), variant);
        }
        Ok(Self {
            name,
            type_params,
            variants: table,
            span,
        })
    }

    /// Looks up a variant by name.
    pub fn variant(&self, name: &str) -> Option<&VariantDef> {
        self.variants.get(name)
    }

    /// Variant names in declaration order.
    pub fn variant_names(&self) -> impl Iterator<Item = &str> {
        self.variants.keys().map(String::as_str)
    }

    /// Number of type parameters.
    pub fn param_count(&self) -> usize {
        self.type_params.len()
    }

    /// Applies the definition to type arguments, producing the union type.
    pub fn apply(&self, args: Vec<Type>) -> Result<Type> {
        if args.len() != self.type_params.len() {
            return Err(
                Error::arity_mismatch(self.type_params.len(), args.len(), self.span.clone())
                    .boxed(),
            );
        }
        Ok(Type::union(self.name.clone(), args))
    }

    /// Instantiates the definition with fresh type variables, returning the
    /// resulting union type and the per-parameter mapping.
    pub fn instantiate(&self) -> (Type, HashMap<String, Type>) {
        let mapping: HashMap<String, Type> = self
            .type_params
            .iter()
            .map(|param| (param.clone(), Type::fresh_var()))
            .collect();
        let args = self
            .type_params
            .iter()
            .map(|param| mapping[param].clone())
            .collect();
        (Type::union(self.name.clone(), args), mapping)
    }

    /// Concrete field types of a variant, with the union's type parameters
    /// substituted by the given arguments.
    pub fn field_types_for(&self, variant: &str, args: &[Type]) -> Result<Vec<Type>> {
        if args.len() != self.type_params.len() {
            return Err(
                Error::arity_mismatch(self.type_params.len(), args.len(), self.span.clone())
                    .boxed(),
            );
        }
        let variant = self
            .variant(variant)
            .ok_or_else(|| Error::unresolved_symbol(variant, self.span.clone()).boxed())?;

        let mapping: HashMap<&str, &Type> = self
            .type_params
            .iter()
            .map(String::as_str)
            .zip(args.iter())
            .collect();

        Ok(variant
            .field_types
            .iter()
            .map(|ty| substitute_params(ty, &mapping))
            .collect())
    }

    /// Returns true if any variant field references this union by name.
    pub fn is_recursive(&self) -> bool {
        self.variants
            .values()
            .any(|v| v.field_types.iter().any(|t| references_union(t, &self.name)))
    }
}

/// Replaces named type-parameter references with concrete types.
pub(crate) fn substitute_params(ty: &Type, mapping: &HashMap<&str, &Type>) -> Type {
    match ty {
        Type::Named(name) => match mapping.get(name.as_str()) {
            Some(replacement) => (*replacement).clone(),
            None => ty.clone(),
        },
        Type::Primitive(_) | Type::Variable(_) => ty.clone(),
        Type::Generic { name, args } => Type::Generic {
            name: name.clone(),
            args: args.iter().map(|a| substitute_params(a, mapping)).collect(),
        },
        Type::Function {
            params,
            return_type,
        } => Type::function(
            params.iter().map(|p| substitute_params(p, mapping)).collect(),
            substitute_params(return_type, mapping),
        ),
        Type::Tuple(elements) => Type::Tuple(
            elements
                .iter()
                .map(|e| substitute_params(e, mapping))
                .collect(),
        ),
        Type::Nullable(base) => Type::nullable(substitute_params(base, mapping)),
        Type::Union { name, type_args } => Type::Union {
            name: name.clone(),
            type_args: type_args
                .iter()
                .map(|a| substitute_params(a, mapping))
                .collect(),
        },
    }
}

fn references_union(ty: &Type, name: &str) -> bool {
    match ty {
        Type::Union {
            name: union_name,
            type_args,
        } => union_name == name || type_args.iter().any(|a| references_union(a, name)),
        Type::Generic { args, .. } => args.iter().any(|a| references_union(a, name)),
        Type::Function {
            params,
            return_type,
        } => {
            params.iter().any(|p| references_union(p, name)) || references_union(return_type, name)
        }
        Type::Tuple(elements) => elements.iter().any(|e| references_union(e, name)),
        Type::Nullable(base) => references_union(base, name),
        _ => false,
    }
}

/// A declared function's signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSignature {
    /// Function name
    pub name: String,
    /// Type parameter names (let-polymorphism is offered at this granularity)
    pub type_params: Vec<String>,
    /// Parameter types; type parameters appear as named references
    pub params: Vec<Type>,
    /// Declared (or inferred-variable) return type
    pub return_type: Type,
    /// Declaration site
    pub span: Option<Span>,
}

impl FunctionSignature {
    /// Creates a function signature.
    pub fn new(
        name: impl Into<String>,
        type_params: Vec<String>,
        params: Vec<Type>,
        return_type: Type,
        span: Option<Span>,
    ) -> Self {
        Self {
            name: name.into(),
            type_params,
            params,
            return_type,
            span,
        }
    }

    /// Number of value parameters.
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Instantiates the signature, replacing each type parameter with a fresh
    /// variable. Returns the instantiated parameter and return types.
    pub fn instantiate(&self) -> (Vec<Type>, Type) {
        if self.type_params.is_empty() {
            return (self.params.clone(), self.return_type.clone());
        }

        let fresh: Vec<Type> = self
            .type_params
            .iter()
            .map(|_| Type::Variable(TypeVar::fresh()))
            .collect();
        let mapping: HashMap<&str, &Type> = self
            .type_params
            .iter()
            .map(String::as_str)
            .zip(fresh.iter())
            .collect();

        let params = self
            .params
            .iter()
            .map(|p| substitute_params(p, &mapping))
            .collect();
        let return_type = substitute_params(&self.return_type, &mapping);
        (params, return_type)
    }

    /// The signature as a bare function type (type parameters unresolved).
    pub fn to_function_type(&self) -> Type {
        Type::function(self.params.clone(), self.return_type.clone())
    }
}

impl fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn {}", self.name)?;
        if !self.type_params.is_empty() {
            write!(f, "<{}>", self.type_params.join(", "))?;
        }
        write!(f, "(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{param}")?;
        }
        write!(f, "): {}", self.return_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option_def() -> TypeDefinition {
        TypeDefinition::union(
            "Option",
            vec!["T".to_string()],
            vec![
                VariantDef::new("Some", vec![Type::Named("T".to_string())], None),
                VariantDef::new("None", vec![], None),
            ],
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_duplicate_variant_rejected() {
        let result = TypeDefinition::union(
            "Bad",
            vec![],
            vec![
                VariantDef::new("A", vec![], None),
                VariantDef::new("B", vec![], None),
                VariantDef::new("A", vec![], None),
            ],
            None,
        );
        match result {
            Err(err) => assert_eq!(err.kind(), "DuplicateDefinition"),
            Ok(_) => panic!("expected duplicate variant rejection"),
        }
    }

    #[test]
    fn test_field_types_substitute_params() {
        let def = option_def();
        let fields = def.field_types_for("Some", &[Type::int()]).unwrap();
        assert_eq!(fields, vec![Type::int()]);

        let fields = def.field_types_for("None", &[Type::string()]).unwrap();
        assert!(fields.is_empty());
    }

    #[test]
    fn test_apply_checks_arity() {
        let def = option_def();
        assert!(def.apply(vec![Type::int()]).is_ok());
        let err = def.apply(vec![]).unwrap_err();
        assert_eq!(err.kind(), "ArityMismatch");
    }

    #[test]
    fn test_recursive_definition_detected() {
        let def = TypeDefinition::union(
            "List",
            vec!["T".to_string()],
            vec![
                VariantDef::new("Nil", vec![], None),
                VariantDef::new(
                    "Cons",
                    vec![
                        Type::Named("T".to_string()),
                        Type::union("List", vec![Type::Named("T".to_string())]),
                    ],
                    None,
                ),
            ],
            None,
        )
        .unwrap();

        assert!(def.is_recursive());
        assert!(!option_def().is_recursive());
    }

    #[test]
    fn test_signature_instantiation_is_fresh() {
        let sig = FunctionSignature::new(
            "identity",
            vec!["T".to_string()],
            vec![Type::Named("T".to_string())],
            Type::Named("T".to_string()),
            None,
        );

        let (params1, ret1) = sig.instantiate();
        let (params2, _) = sig.instantiate();

        assert_eq!(params1[0], ret1);
        assert_ne!(params1[0], params2[0]);
    }
}

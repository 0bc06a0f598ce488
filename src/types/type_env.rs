//! The typing environment: lexical scopes, global namespaces, builtins.
//!
//! Variables live in a stack of scopes; type definitions and function
//! signatures live in flat global namespaces populated before expression
//! checking begins, so forward references and self-recursion work.

use std::collections::HashSet;

use indexmap::IndexMap;
use once_cell::sync::Lazy;

use super::{
    is_builtin_primitive, FunctionSignature, Type, TypeDefinition, TypeScheme, TypeVar,
    VariantDef, THROWABLE,
};
use crate::ast::TypeExpr;
use crate::diagnostics::{Error, Result, Span, Spanned};

/// A variable binding: its type and whether it may be reassigned.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableBinding {
    /// The declared or inferred type
    pub ty: Type,
    /// `var` bindings are mutable, `val` bindings are not
    pub mutable: bool,
}

/// One lexical scope frame.
///
/// Frames use persistent maps so cloning an environment around a lambda or
/// match arm is cheap.
#[derive(Debug, Clone, Default)]
struct Scope {
    bindings: im::HashMap<String, VariableBinding>,
    schemes: im::HashMap<String, TypeScheme>,
}

/// Built-in generic type arities, for types provided by the runtime library
/// and referenced only by name.
static LIBRARY_GENERICS: Lazy<IndexMap<&'static str, usize>> =
    Lazy::new(|| IndexMap::from([("List", 1)]));

/// The built-in `Result<T, E>` union definition.
static RESULT_DEFINITION: Lazy<TypeDefinition> = Lazy::new(|| {
    TypeDefinition::union(
        "Result",
        vec!["T".to_string(), "E".to_string()],
        vec![
            VariantDef::new("Ok", vec![Type::Named("T".to_string())], None),
            VariantDef::new("Error", vec![Type::Named("E".to_string())], None),
        ],
        None,
    )
    .expect("built-in Result definition is well-formed")
});

/// The typing environment for one checker invocation.
#[derive(Debug, Clone)]
pub struct TypingEnvironment {
    /// Scope stack; the global frame at index 0 is always present
    scopes: Vec<Scope>,
    /// Type name -> union definition
    types: IndexMap<String, TypeDefinition>,
    /// Function name -> signature
    functions: IndexMap<String, FunctionSignature>,
    /// Declared return type of the enclosing function, for `try` validation
    enclosing_return: Option<Type>,
}

impl TypingEnvironment {
    /// Creates an environment populated with the built-in bindings:
    /// `Result<T, E>` and its constructors, `println`, and `assert`.
    pub fn new() -> Self {
        let mut env = Self {
            scopes: vec![Scope::default()],
            types: IndexMap::new(),
            functions: IndexMap::new(),
            enclosing_return: None,
        };

        env.types
            .insert("Result".to_string(), RESULT_DEFINITION.clone());
        env.functions.insert(
            "println".to_string(),
            FunctionSignature::new("println", vec![], vec![Type::string()], Type::unit(), None),
        );
        env.functions.insert(
            "assert".to_string(),
            FunctionSignature::new("assert", vec![], vec![Type::boolean()], Type::unit(), None),
        );

        env
    }

    // ============= SCOPES =============

    /// Pushes a fresh empty scope frame.
    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    /// Pops the innermost scope frame.
    ///
    /// The global frame is always present; popping it is checker misuse.
    pub fn pop_scope(&mut self) -> Result<()> {
        if self.scopes.len() <= 1 {
            return Err(Error::internal("attempted to pop the global scope").boxed());
        }
        self.scopes.pop();
        Ok(())
    }

    /// Current scope depth (1 = only the global frame).
    pub fn scope_depth(&self) -> usize {
        self.scopes.len()
    }

    // ============= VARIABLES =============

    /// Declares a variable in the innermost scope.
    ///
    /// Only the innermost frame is checked for duplicates; shadowing an outer
    /// frame is legal.
    pub fn declare_variable(
        &mut self,
        name: impl Into<String>,
        ty: Type,
        mutable: bool,
        span: Option<Span>,
    ) -> Result<()> {
        let name = name.into();
        let scope = self.scopes.last_mut().expect("global scope is present");
        if scope.bindings.contains_key(&name) || scope.schemes.contains_key(&name) {
            return Err(Error::duplicate_definition(name, span).boxed());
        }
        scope.bindings.insert(name, VariableBinding { ty, mutable });
        Ok(())
    }

    /// Looks up a variable, innermost scope first.
    pub fn lookup_variable(&self, name: &str) -> Option<&VariableBinding> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.bindings.get(name))
    }

    /// Declares a polymorphic binding in the innermost scope.
    pub fn declare_scheme(
        &mut self,
        name: impl Into<String>,
        scheme: TypeScheme,
        span: Option<Span>,
    ) -> Result<()> {
        let name = name.into();
        let scope = self.scopes.last_mut().expect("global scope is present");
        if scope.bindings.contains_key(&name) || scope.schemes.contains_key(&name) {
            return Err(Error::duplicate_definition(name, span).boxed());
        }
        scope.schemes.insert(name, scheme);
        Ok(())
    }

    /// Looks up a polymorphic binding, innermost scope first.
    pub fn lookup_scheme(&self, name: &str) -> Option<&TypeScheme> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.schemes.get(name))
    }

    /// Validates an assignment target and returns the declared type the
    /// right-hand side must be assignable to.
    pub fn assignment_target(&self, name: &str, span: Option<Span>) -> Result<Type> {
        let binding = self
            .lookup_variable(name)
            .ok_or_else(|| Error::unresolved_symbol(name, span.clone()).boxed())?;
        if !binding.mutable {
            return Err(Error::invalid_operation(
                format!("cannot assign to immutable variable `{name}`"),
                span,
            )
            .boxed());
        }
        Ok(binding.ty.clone())
    }

    /// Replaces a variable's type in the innermost scope that binds it.
    ///
    /// Used after solving to refine tentative types.
    pub fn refine_variable(&mut self, name: &str, ty: Type) {
        for scope in self.scopes.iter_mut().rev() {
            if let Some(binding) = scope.bindings.get(name) {
                let mutable = binding.mutable;
                scope
                    .bindings
                    .insert(name.to_string(), VariableBinding { ty, mutable });
                return;
            }
        }
    }

    /// Applies a substitution to every variable binding in every scope.
    pub fn apply_substitution(&mut self, subst: &super::Substitution) {
        for scope in &mut self.scopes {
            let refined: im::HashMap<String, VariableBinding> = scope
                .bindings
                .iter()
                .map(|(name, binding)| {
                    (
                        name.clone(),
                        VariableBinding {
                            ty: subst.apply(&binding.ty),
                            mutable: binding.mutable,
                        },
                    )
                })
                .collect();
            scope.bindings = refined;
        }
    }

    /// All type variables free in the environment's bindings and schemes.
    pub fn free_type_vars(&self) -> HashSet<TypeVar> {
        let mut vars = HashSet::new();
        for scope in &self.scopes {
            for binding in scope.bindings.values() {
                vars.extend(binding.ty.free_vars());
            }
            for scheme in scope.schemes.values() {
                vars.extend(scheme.free_vars());
            }
        }
        vars
    }

    // ============= GLOBAL NAMESPACES =============

    /// Declares a union type in the global type namespace.
    pub fn declare_type(&mut self, definition: TypeDefinition, span: Option<Span>) -> Result<()> {
        if self.types.contains_key(&definition.name) || is_builtin_primitive(&definition.name) {
            return Err(Error::duplicate_definition(definition.name, span).boxed());
        }
        self.types.insert(definition.name.clone(), definition);
        Ok(())
    }

    /// Looks up a union type definition.
    pub fn lookup_type(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.get(name)
    }

    /// Replaces an already-declared type definition in place.
    ///
    /// Used by two-phase type declaration: headers are declared first so
    /// recursive and forward references resolve, then variant bodies fill in.
    pub fn update_type(&mut self, definition: TypeDefinition) {
        self.types.insert(definition.name.clone(), definition);
    }

    /// Declares a function signature in the global function namespace.
    pub fn declare_function(
        &mut self,
        signature: FunctionSignature,
        span: Option<Span>,
    ) -> Result<()> {
        if self.functions.contains_key(&signature.name) {
            return Err(Error::duplicate_definition(signature.name, span).boxed());
        }
        self.functions.insert(signature.name.clone(), signature);
        Ok(())
    }

    /// Looks up a function signature.
    pub fn lookup_function(&self, name: &str) -> Option<&FunctionSignature> {
        self.functions.get(name)
    }

    /// Finds the union that declares a variant with the given name.
    ///
    /// Variant names are unique within a union but not across unions; lookup
    /// walks declarations in order and returns the first match, so resolution
    /// never depends on hash order.
    pub fn lookup_variant(&self, name: &str) -> Option<(&TypeDefinition, &VariantDef)> {
        self.types
            .values()
            .find_map(|def| def.variant(name).map(|variant| (def, variant)))
    }

    // ============= ENCLOSING FUNCTION =============

    /// The declared return type of the enclosing function, if any.
    pub fn enclosing_return_type(&self) -> Option<&Type> {
        self.enclosing_return.as_ref()
    }

    /// Replaces the enclosing return type, returning the previous value so
    /// callers can restore it.
    pub fn set_enclosing_return(&mut self, ty: Option<Type>) -> Option<Type> {
        std::mem::replace(&mut self.enclosing_return, ty)
    }

    // ============= SURFACE TYPE RESOLUTION =============

    /// Resolves a surface type annotation to a semantic type.
    ///
    /// `type_params` are the parameter names in scope (from an enclosing
    /// function or type declaration); they resolve to named references.
    pub fn resolve_type_expr(
        &self,
        expr: &Spanned<TypeExpr>,
        type_params: &[String],
    ) -> Result<Type> {
        let span = expr.span.clone();
        match &expr.inner {
            TypeExpr::Named(name) => {
                if is_builtin_primitive(name) {
                    Ok(Type::Primitive(name.clone()))
                } else if name == THROWABLE || type_params.contains(name) {
                    Ok(Type::Named(name.clone()))
                } else if let Some(def) = self.types.get(name) {
                    if def.param_count() != 0 {
                        return Err(
                            Error::arity_mismatch(def.param_count(), 0, Some(span)).boxed()
                        );
                    }
                    Ok(Type::union(name.clone(), vec![]))
                } else if LIBRARY_GENERICS.contains_key(name.as_str()) {
                    Err(Error::arity_mismatch(LIBRARY_GENERICS[name.as_str()], 0, Some(span))
                        .boxed())
                } else {
                    Err(Error::unresolved_symbol(name, Some(span)).boxed())
                }
            }
            TypeExpr::Generic { name, args } => {
                let resolved: Vec<Type> = args
                    .iter()
                    .map(|arg| self.resolve_type_expr(arg, type_params))
                    .collect::<Result<_>>()?;

                if let Some(def) = self.types.get(name) {
                    if def.param_count() != resolved.len() {
                        return Err(Error::arity_mismatch(
                            def.param_count(),
                            resolved.len(),
                            Some(span),
                        )
                        .boxed());
                    }
                    let ty = Type::union(name.clone(), resolved);
                    if name == "Result" {
                        if let Type::Union { type_args, .. } = &ty {
                            if !type_args[1].is_throwable_compatible() {
                                return Err(Error::result_error_type_violation(
                                    type_args[1].clone(),
                                    Some(span),
                                )
                                .boxed());
                            }
                        }
                    }
                    Ok(ty)
                } else if let Some(&arity) = LIBRARY_GENERICS.get(name.as_str()) {
                    if arity != resolved.len() {
                        return Err(
                            Error::arity_mismatch(arity, resolved.len(), Some(span)).boxed()
                        );
                    }
                    Ok(Type::generic(name.clone(), resolved))
                } else {
                    Err(Error::unresolved_symbol(name, Some(span)).boxed())
                }
            }
            TypeExpr::Function {
                params,
                return_type,
            } => {
                let params = params
                    .iter()
                    .map(|p| self.resolve_type_expr(p, type_params))
                    .collect::<Result<_>>()?;
                let return_type = self.resolve_type_expr(return_type, type_params)?;
                Ok(Type::function(params, return_type))
            }
            TypeExpr::Tuple(elements) => {
                let elements = elements
                    .iter()
                    .map(|e| self.resolve_type_expr(e, type_params))
                    .collect::<Result<_>>()?;
                Ok(Type::Tuple(elements))
            }
            TypeExpr::Nullable(base) => {
                Ok(Type::nullable(self.resolve_type_expr(base, type_params)?))
            }
        }
    }
}

impl Default for TypingEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

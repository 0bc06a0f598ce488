//! Structural validity checking for types.
//!
//! Validation is independent of inference: it walks a type bottom-up against
//! the environment's tables, flagging unknown primitives, generic arity
//! violations, and `Result` error-slot misuse.

use super::{is_builtin_primitive, Type, TypingEnvironment};
use crate::diagnostics::Error;

/// The outcome of validating a type.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    errors: Vec<Error>,
}

impl ValidationResult {
    /// A valid (empty) result.
    pub fn valid() -> Self {
        Self::default()
    }

    /// True if no problems were found.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// The problems found, in discovery order.
    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    /// Consumes the result, returning its problems.
    pub fn into_errors(self) -> Vec<Error> {
        self.errors
    }

    fn push(&mut self, error: Error) {
        self.errors.push(error);
    }
}

/// Validates a type against the environment's type tables.
pub fn validate(ty: &Type, env: &TypingEnvironment) -> ValidationResult {
    let mut result = ValidationResult::valid();
    validate_into(ty, env, &mut result);
    result
}

fn validate_into(ty: &Type, env: &TypingEnvironment, result: &mut ValidationResult) {
    match ty {
        Type::Primitive(name) => {
            if !is_builtin_primitive(name) {
                result.push(Error::unknown_primitive_type(name.clone(), None));
            }
        }

        // Named references are type parameters or the Throwable sentinel;
        // they validate in whatever context binds them
        Type::Named(_) | Type::Variable(_) => {}

        Type::Generic { name, args } => {
            // Library generics referenced only by name; List is the one with
            // a known arity
            if name == "List" && args.len() != 1 {
                result.push(Error::arity_mismatch(1, args.len(), None));
            }
            for arg in args {
                validate_into(arg, env, result);
            }
        }

        Type::Function {
            params,
            return_type,
        } => {
            for param in params {
                validate_into(param, env, result);
            }
            validate_into(return_type, env, result);
        }

        Type::Tuple(elements) => {
            for element in elements {
                validate_into(element, env, result);
            }
        }

        Type::Nullable(base) => validate_into(base, env, result),

        Type::Union { name, type_args } => {
            match env.lookup_type(name) {
                Some(definition) => {
                    if definition.param_count() != type_args.len() {
                        result.push(Error::arity_mismatch(
                            definition.param_count(),
                            type_args.len(),
                            None,
                        ));
                    }
                }
                None => result.push(Error::unresolved_symbol(name.clone(), None)),
            }

            if name == "Result" && type_args.len() == 2 && !type_args[1].is_throwable_compatible()
            {
                result.push(Error::result_error_type_violation(
                    type_args[1].clone(),
                    None,
                ));
            }

            for arg in type_args {
                validate_into(arg, env, result);
            }
        }
    }
}

//! Pattern checking: bindings, constraints, and exhaustiveness.
//!
//! Patterns are tagged variants; the checker dispatches on the tag. Adding a
//! pattern kind is a localized change here plus an AST node addition.

use indexmap::{IndexMap, IndexSet};

use super::{Constraint, Type, TypingEnvironment};
use crate::ast::{Literal, Pattern};
use crate::diagnostics::{Error, Result, Span, Spanned};

/// What the pattern checker learned about one pattern.
#[derive(Debug, Clone, Default)]
pub struct PatternInfo {
    /// Variables the pattern binds, with their types, in binding order
    pub bindings: IndexMap<String, Type>,
    /// Union variants this pattern covers
    pub covered_variants: IndexSet<String>,
    /// True if the pattern matches every value of the scrutinee type
    pub covers_all: bool,
    /// Constraints the pattern imposes on the scrutinee type
    pub constraints: Vec<Constraint>,
    /// The union the pattern forced the scrutinee to be, when the scrutinee
    /// type was still a variable
    pub resolved_union: Option<String>,
}

impl PatternInfo {
    fn merge_child(&mut self, child: PatternInfo, span: &Span) -> Result<()> {
        for (name, ty) in child.bindings {
            if self.bindings.contains_key(&name) {
                return Err(Error::duplicate_definition(name, Some(span.clone())).boxed());
            }
            self.bindings.insert(name, ty);
        }
        self.constraints.extend(child.constraints);
        if self.resolved_union.is_none() {
            self.resolved_union = child.resolved_union;
        }
        Ok(())
    }
}

/// Checks a pattern against a scrutinee type.
///
/// Returns the pattern's bindings, covered variants, and the constraints it
/// imposes; fails on structural impossibilities (wrong arity, unknown
/// variant, non-matching scrutinee shape, duplicate bindings).
pub fn check_pattern(
    pattern: &Spanned<Pattern>,
    scrutinee: &Type,
    env: &TypingEnvironment,
) -> Result<PatternInfo> {
    let span = &pattern.span;
    match &pattern.inner {
        Pattern::Wildcard => Ok(PatternInfo {
            covers_all: true,
            ..PatternInfo::default()
        }),

        Pattern::Identifier(name) => {
            let mut info = PatternInfo {
                covers_all: true,
                ..PatternInfo::default()
            };
            info.bindings.insert(name.clone(), scrutinee.clone());
            Ok(info)
        }

        Pattern::Literal(literal) => {
            let literal_ty = literal_type(literal);
            Ok(PatternInfo {
                constraints: vec![Constraint::equality(
                    literal_ty,
                    scrutinee.clone(),
                    Some(span.clone()),
                )],
                ..PatternInfo::default()
            })
        }

        Pattern::Constructor { name, args } => {
            check_constructor_pattern(name, args, scrutinee, env, span)
        }

        Pattern::Tuple(elements) => {
            let (element_types, constraint) = match scrutinee {
                Type::Tuple(element_types) => {
                    if element_types.len() != elements.len() {
                        return Err(Error::arity_mismatch(
                            element_types.len(),
                            elements.len(),
                            Some(span.clone()),
                        )
                        .boxed());
                    }
                    (element_types.clone(), None)
                }
                Type::Variable(_) => {
                    // Unknown scrutinee: invent element variables and constrain
                    let element_types: Vec<Type> =
                        elements.iter().map(|_| Type::fresh_var()).collect();
                    let constraint = Constraint::equality(
                        scrutinee.clone(),
                        Type::Tuple(element_types.clone()),
                        Some(span.clone()),
                    );
                    (element_types, Some(constraint))
                }
                other => {
                    let shape = (0..elements.len()).map(|_| Type::fresh_var()).collect();
                    return Err(Error::type_mismatch(
                        Type::Tuple(shape),
                        other.clone(),
                        Some(span.clone()),
                    )
                    .boxed());
                }
            };

            let mut info = PatternInfo::default();
            info.constraints.extend(constraint);
            let mut all_cover = true;
            for (element, element_ty) in elements.iter().zip(&element_types) {
                let child = check_pattern(element, element_ty, env)?;
                all_cover &= child.covers_all;
                info.merge_child(child, span)?;
            }
            info.covers_all = all_cover;
            Ok(info)
        }

        Pattern::List { elements, rest } => {
            let (element_ty, constraint) = match scrutinee {
                Type::Generic { name, args } if name == "List" && args.len() == 1 => {
                    (args[0].clone(), None)
                }
                Type::Variable(_) => {
                    let element_ty = Type::fresh_var();
                    let constraint = Constraint::equality(
                        scrutinee.clone(),
                        Type::list(element_ty.clone()),
                        Some(span.clone()),
                    );
                    (element_ty, Some(constraint))
                }
                other => {
                    return Err(Error::type_mismatch(
                        Type::list(Type::fresh_var()),
                        other.clone(),
                        Some(span.clone()),
                    )
                    .boxed());
                }
            };

            let mut info = PatternInfo::default();
            info.constraints.extend(constraint);
            for element in elements {
                let child = check_pattern(element, &element_ty, env)?;
                info.merge_child(child, span)?;
            }
            if let Some(rest_name) = rest {
                if info.bindings.contains_key(rest_name) {
                    return Err(
                        Error::duplicate_definition(rest_name, Some(span.clone())).boxed()
                    );
                }
                info.bindings
                    .insert(rest_name.clone(), Type::list(element_ty));
            }
            // A list pattern is always refutable: it fixes a minimum length
            Ok(info)
        }
    }
}

fn check_constructor_pattern(
    name: &str,
    args: &[Spanned<Pattern>],
    scrutinee: &Type,
    env: &TypingEnvironment,
    span: &Span,
) -> Result<PatternInfo> {
    let (def, type_args, mut info) = match scrutinee {
        // A known union: the variant must belong to that union
        Type::Union {
            name: union_name,
            type_args,
        } => {
            let def = env
                .lookup_type(union_name)
                .ok_or_else(|| Error::unresolved_symbol(union_name, Some(span.clone())).boxed())?;
            if def.variant(name).is_none() {
                // A same-named variant in another union is a scrutinee
                // mismatch; a variant nowhere at all is unresolved
                if let Some((other, _)) = env.lookup_variant(name) {
                    let (expected, _) = other.instantiate();
                    return Err(Error::type_mismatch(
                        expected,
                        scrutinee.clone(),
                        Some(span.clone()),
                    )
                    .boxed());
                }
                return Err(Error::unresolved_symbol(name, Some(span.clone())).boxed());
            }
            (def, type_args.clone(), PatternInfo::default())
        }

        // Unknown scrutinee: the variant picks its union, instantiated fresh
        // and constrained against the scrutinee
        Type::Variable(_) => {
            let (def, _) = env
                .lookup_variant(name)
                .ok_or_else(|| Error::unresolved_symbol(name, Some(span.clone())).boxed())?;
            let (union_ty, _) = def.instantiate();
            let type_args = match &union_ty {
                Type::Union { type_args, .. } => type_args.clone(),
                _ => Vec::new(),
            };
            let info = PatternInfo {
                constraints: vec![Constraint::equality(
                    scrutinee.clone(),
                    union_ty,
                    Some(span.clone()),
                )],
                resolved_union: Some(def.name.clone()),
                ..PatternInfo::default()
            };
            (def, type_args, info)
        }

        other => {
            let def = env
                .lookup_variant(name)
                .map(|(def, _)| def)
                .ok_or_else(|| Error::unresolved_symbol(name, Some(span.clone())).boxed())?;
            let (expected, _) = def.instantiate();
            return Err(
                Error::type_mismatch(expected, other.clone(), Some(span.clone())).boxed(),
            );
        }
    };

    let field_types = def.field_types_for(name, &type_args)?;
    if field_types.len() != args.len() {
        return Err(
            Error::arity_mismatch(field_types.len(), args.len(), Some(span.clone())).boxed(),
        );
    }

    for (arg, field_ty) in args.iter().zip(&field_types) {
        let child = check_pattern(arg, field_ty, env)?;
        info.merge_child(child, span)?;
    }
    info.covered_variants.insert(name.to_string());
    Ok(info)
}

/// The type a literal pattern requires of its scrutinee.
fn literal_type(literal: &Literal) -> Type {
    match literal {
        Literal::Integer(_) => Type::int(),
        Literal::Float(_) => Type::double(),
        Literal::String(_) => Type::string(),
        Literal::Boolean(_) => Type::boolean(),
        Literal::Null => Type::nullable(Type::fresh_var()),
    }
}

/// Checks that a set of match arms covers the scrutinee type.
///
/// A match is exhaustive iff some non-guarded arm is irrefutable, or the
/// scrutinee is a union whose variants are all covered by non-guarded arms.
/// `case_coverage` pairs each arm's [`PatternInfo`] with whether the arm is
/// guarded; guarded arms never contribute coverage.
pub fn check_exhaustiveness(
    scrutinee: &Type,
    case_coverage: &[(PatternInfo, bool)],
    env: &TypingEnvironment,
    span: Option<Span>,
) -> Result<()> {
    let unguarded = case_coverage.iter().filter(|(_, guarded)| !guarded);
    if unguarded.clone().any(|(info, _)| info.covers_all) {
        return Ok(());
    }

    // Find the union under scrutiny: either directly from the scrutinee type
    // or from the union a pattern resolved an unknown scrutinee to.
    let union_name = match scrutinee {
        Type::Union { name, .. } => Some(name.clone()),
        _ => case_coverage
            .iter()
            .find_map(|(info, _)| info.resolved_union.clone()),
    };

    let Some(union_name) = union_name else {
        return Err(Error::non_exhaustive_match(vec!["_".to_string()], span).boxed());
    };
    let Some(def) = env.lookup_type(&union_name) else {
        return Err(Error::non_exhaustive_match(vec!["_".to_string()], span).boxed());
    };

    let mut covered: IndexSet<&str> = IndexSet::new();
    for (info, _) in unguarded {
        covered.extend(info.covered_variants.iter().map(String::as_str));
    }

    let missing: Vec<String> = def
        .variant_names()
        .filter(|name| !covered.contains(name))
        .map(str::to_string)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::non_exhaustive_match(missing, span).boxed())
    }
}

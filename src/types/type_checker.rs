//! The type-checker orchestrator: the top-level driver over a program.
//!
//! Walks top-level items in order — type declarations, then function
//! signatures, then function bodies and value declarations — invoking the
//! collector per item, solving the resulting constraint set, and applying the
//! substitution to every tentative type in the item's typed statement. Errors
//! aggregate per item and across items; a failing item never halts the
//! program walk.

use std::collections::HashMap;

use log::debug;

use super::{
    clear_type_caches, ConstraintCollector, FunctionSignature, Substitutable, TypeDefinition,
    TypedProgram, TypedStatement, TypingEnvironment, Unifier,
};
use crate::ast::{Program, Statement};
use crate::diagnostics::{Error, Result};

/// Selects how eagerly constraints are solved.
///
/// Both strategies produce identical results for programs whose annotations
/// make every statement locally determinable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckStrategy {
    /// Solve pending constraints at every statement boundary. Faster feedback,
    /// limited cross-statement inference; suited to annotation-heavy code.
    Algorithmic,
    /// Collect constraints for a whole item, then solve once. The default.
    #[default]
    ConstraintBased,
}

/// Type checker state for one program.
#[derive(Debug, Default)]
pub struct TypeChecker {
    strategy: CheckStrategy,
    env: TypingEnvironment,
}

impl TypeChecker {
    /// Creates a checker with the default (constraint-based) strategy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a checker with an explicit strategy.
    pub fn with_strategy(strategy: CheckStrategy) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }

    /// The current strategy.
    pub fn strategy(&self) -> CheckStrategy {
        self.strategy
    }

    /// The typing environment (builtins plus everything declared so far).
    pub fn env(&self) -> &TypingEnvironment {
        &self.env
    }

    fn collector(&self) -> ConstraintCollector {
        match self.strategy {
            CheckStrategy::Algorithmic => ConstraintCollector::eager(self.env.clone()),
            CheckStrategy::ConstraintBased => ConstraintCollector::new(self.env.clone()),
        }
    }

    /// Checks a whole program, producing a typed program or aggregated
    /// diagnostics.
    pub fn check_program(&mut self, program: &Program) -> Result<TypedProgram> {
        clear_type_caches();

        let count = program.statements.len();
        let mut typed_slots: Vec<Option<TypedStatement>> = (0..count).map(|_| None).collect();
        let mut item_failures: Vec<Error> = Vec::new();
        // Diagnostics produced for an item before its body pass runs
        let mut pending: HashMap<usize, Vec<Error>> = HashMap::new();
        let mut header_declared: HashMap<usize, bool> = HashMap::new();
        let mut signatures: HashMap<usize, FunctionSignature> = HashMap::new();

        // Pass 1a: type declaration headers, so recursive and forward
        // references resolve when bodies are checked
        for (index, stmt) in program.statements.iter().enumerate() {
            if let Statement::TypeDecl {
                name, type_params, ..
            } = &stmt.inner
            {
                debug!("declaring type header `{name}`");
                let header = TypeDefinition::union(
                    name.as_str(),
                    type_params.clone(),
                    vec![],
                    Some(stmt.span.clone()),
                )
                .expect("empty variant list cannot collide");
                match self.env.declare_type(header, Some(stmt.span.clone())) {
                    Ok(()) => {
                        header_declared.insert(index, true);
                    }
                    Err(err) => {
                        header_declared.insert(index, false);
                        pending.entry(index).or_default().push(*err);
                    }
                }
            }
        }

        // Pass 1b: type declaration bodies
        for (index, stmt) in program.statements.iter().enumerate() {
            if let Statement::TypeDecl {
                name,
                type_params,
                variants,
            } = &stmt.inner
            {
                let mut collector = self.collector();
                let definition =
                    collector.resolve_type_decl_body(name, type_params, variants, &stmt.span);
                let (env, _, diagnostics, _) = collector.into_parts();
                self.env = env;
                if header_declared.get(&index).copied().unwrap_or(false) {
                    self.env.update_type(definition.clone());
                }

                let mut errors = pending.remove(&index).unwrap_or_default();
                errors.extend(diagnostics.into_diagnostics());
                match Error::aggregate(errors) {
                    None => {
                        typed_slots[index] = Some(TypedStatement::TypeDecl {
                            definition,
                            span: stmt.span.clone(),
                        });
                    }
                    Some(error) => item_failures.push(error),
                }
            }
        }

        // Pass 2: function signatures, so calls and recursion resolve before
        // any body is checked
        for (index, stmt) in program.statements.iter().enumerate() {
            if let Statement::FunctionDecl {
                name,
                type_params,
                params,
                return_type,
                ..
            } = &stmt.inner
            {
                debug!("declaring function signature `{name}`");
                let mut collector = self.collector();
                let signature = collector.resolve_function_signature(
                    name,
                    type_params,
                    params,
                    return_type.as_ref(),
                    &stmt.span,
                );
                let (env, _, diagnostics, _) = collector.into_parts();
                self.env = env;

                let mut errors: Vec<Error> = diagnostics.into_diagnostics();
                if let Err(err) = self
                    .env
                    .declare_function(signature.clone(), Some(stmt.span.clone()))
                {
                    errors.push(*err);
                }
                if !errors.is_empty() {
                    pending.insert(index, errors);
                }
                signatures.insert(index, signature);
            }
        }

        // Pass 3: function bodies and value declarations, in order
        for (index, stmt) in program.statements.iter().enumerate() {
            match &stmt.inner {
                Statement::TypeDecl { .. } => {}

                Statement::FunctionDecl { params, body, .. } => {
                    let signature = signatures
                        .get(&index)
                        .expect("signature was resolved in pass 2")
                        .clone();
                    debug!("checking function body `{}`", signature.name);

                    let mut collector = self.collector();
                    let typed_body = collector.check_function_body(&signature, params, body);
                    let raw = TypedStatement::FunctionDecl {
                        signature,
                        body: typed_body,
                        span: stmt.span.clone(),
                    };
                    self.finish_item(
                        index,
                        collector,
                        raw,
                        pending.remove(&index).unwrap_or_default(),
                        &mut typed_slots,
                        &mut item_failures,
                    );
                }

                Statement::VariableDecl { .. }
                | Statement::Assignment { .. }
                | Statement::Expression(_) => {
                    let mut collector = self.collector();
                    let raw = collector.collect_statement(stmt);
                    self.finish_item(
                        index,
                        collector,
                        raw,
                        Vec::new(),
                        &mut typed_slots,
                        &mut item_failures,
                    );
                }
            }
        }

        match Error::aggregate(item_failures) {
            None => Ok(TypedProgram {
                statements: typed_slots.into_iter().flatten().collect(),
            }),
            Some(error) => Err(error.boxed()),
        }
    }

    /// Completes one item: takes the collector apart, solves what remains,
    /// applies the substitution to the typed statement and the environment,
    /// and settles the item's verdict.
    fn finish_item(
        &mut self,
        index: usize,
        collector: ConstraintCollector,
        raw: TypedStatement,
        mut errors: Vec<Error>,
        typed_slots: &mut [Option<TypedStatement>],
        item_failures: &mut Vec<Error>,
    ) {
        let (env, constraints, diagnostics, eager_subst) = collector.into_parts();
        self.env = env;
        errors.extend(diagnostics.into_diagnostics());

        match Unifier::with_substitution(eager_subst).solve(&constraints) {
            Ok(subst) => {
                // Refine every tentative type, even when the item failed, so
                // later items see the best-known bindings
                self.env.apply_substitution(&subst);
                if errors.is_empty() {
                    typed_slots[index] = Some(raw.apply_substitution(&subst));
                    return;
                }
            }
            Err(err) => errors.push(*err),
        }

        if let Some(error) = Error::aggregate(errors) {
            item_failures.push(error);
        }
    }
}

/// Type-checks a program with the default strategy.
///
/// The top-level entry point of the semantic core.
pub fn type_check(program: &Program) -> Result<TypedProgram> {
    TypeChecker::new().check_program(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expr, Literal, TypeExpr};
    use crate::diagnostics::{spanned, Span, Spanned};
    use crate::types::Type;

    fn stmt(statement: Statement) -> Spanned<Statement> {
        spanned(statement, Span::default())
    }

    fn expr(e: Expr) -> Spanned<Expr> {
        spanned(e, Span::default())
    }

    fn val(name: &str, value: Expr) -> Spanned<Statement> {
        stmt(Statement::VariableDecl {
            name: name.to_string(),
            mutable: false,
            type_annotation: None,
            value: expr(value),
        })
    }

    #[test]
    fn test_simple_value_declaration() {
        let program = Program::new(vec![val("x", Expr::Literal(Literal::Integer(42)))]);
        let typed = type_check(&program).unwrap();

        assert_eq!(typed.statements.len(), 1);
        match &typed.statements[0] {
            TypedStatement::VariableDecl { name, ty, .. } => {
                assert_eq!(name, "x");
                assert_eq!(ty, &Type::int());
            }
            other => panic!("expected a variable declaration, got {other:?}"),
        }
    }

    #[test]
    fn test_branch_mismatch_is_reported() {
        let program = Program::new(vec![val(
            "r",
            Expr::If {
                condition: Box::new(expr(Expr::Literal(Literal::Boolean(true)))),
                then_branch: Box::new(expr(Expr::Literal(Literal::Integer(42)))),
                else_branch: Some(Box::new(expr(Expr::Literal(Literal::String(
                    "hello".to_string(),
                ))))),
            },
        )]);

        let err = type_check(&program).unwrap_err();
        assert_eq!(err.kind(), "TypeMismatch");
    }

    #[test]
    fn test_duplicate_function_is_reported() {
        let f = |ret: &str, body: Expr| {
            stmt(Statement::FunctionDecl {
                name: "f".to_string(),
                type_params: vec![],
                params: vec![],
                return_type: Some(spanned(
                    TypeExpr::Named(ret.to_string()),
                    Span::default(),
                )),
                body: expr(body),
            })
        };
        let program = Program::new(vec![
            f("Int", Expr::Literal(Literal::Integer(1))),
            f("String", Expr::Literal(Literal::String("x".to_string()))),
        ]);

        let err = type_check(&program).unwrap_err();
        assert_eq!(err.kind(), "DuplicateDefinition");
    }

    #[test]
    fn test_errors_aggregate_across_items() {
        let program = Program::new(vec![
            val("a", Expr::Identifier("ghost".to_string())),
            val("b", Expr::Identifier("phantom".to_string())),
        ]);

        let err = type_check(&program).unwrap_err();
        match *err {
            Error::MultipleErrors { ref errors } => {
                assert_eq!(errors.len(), 2);
                assert!(errors
                    .iter()
                    .all(|e| e.kind() == "UnresolvedSymbol"));
            }
            ref other => panic!("expected MultipleErrors, got {other:?}"),
        }
    }

    #[test]
    fn test_strategies_agree_on_annotated_code() {
        let program = Program::new(vec![
            val("x", Expr::Literal(Literal::Integer(1))),
            val(
                "y",
                Expr::Binary {
                    op: crate::ast::BinaryOperator::Add,
                    left: Box::new(expr(Expr::Identifier("x".to_string()))),
                    right: Box::new(expr(Expr::Literal(Literal::Integer(2)))),
                },
            ),
        ]);

        let constraint_based = TypeChecker::new().check_program(&program).unwrap();
        let algorithmic = TypeChecker::with_strategy(CheckStrategy::Algorithmic)
            .check_program(&program)
            .unwrap();
        assert_eq!(constraint_based, algorithmic);
    }
}

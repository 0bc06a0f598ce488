//! Constraint collection: a bidirectional walk over expressions.
//!
//! Every node is visited in synthesis mode (no expected type) or checking
//! mode (expected type supplied). Checking propagates the expected type into
//! sub-nodes where it helps (literals, if branches, lambda bodies, match
//! arms); synthesis is used elsewhere.
//!
//! The collector never aborts on a user error: unresolved identifiers and
//! ill-typed sub-expressions are recorded in the diagnostic collector and
//! replaced by fresh type variables so the rest of the item keeps producing
//! diagnostics.

use log::trace;

use super::patterns::{check_exhaustiveness, check_pattern, PatternInfo};
use super::{
    Constraint, ConstraintSet, FunctionSignature, Substitution, Type, TypeDefinition,
    TypedExpression, TypedExpressionKind, TypedMatchCase, TypedParameter, TypedStatement,
    TypingEnvironment, Unifier, VariantDef,
};
use crate::ast::{
    BinaryOperator, Expr, Literal, MatchCase, Parameter, Statement, TypeExpr, UnaryOperator,
    VariantDecl,
};
use crate::diagnostics::{DiagnosticCollector, Span, Spanned};

/// Collects typing constraints for one top-level item.
pub struct ConstraintCollector {
    env: TypingEnvironment,
    constraints: Vec<Constraint>,
    diagnostics: DiagnosticCollector,
    /// When set, pending constraints are solved at every statement boundary
    /// (the algorithmic strategy); otherwise they accumulate for one solve
    /// per item (the constraint-based strategy).
    eager: bool,
    substitution: Substitution,
}

impl ConstraintCollector {
    /// Creates a collector over the given environment.
    pub fn new(env: TypingEnvironment) -> Self {
        Self {
            env,
            constraints: Vec::new(),
            diagnostics: DiagnosticCollector::new(),
            eager: false,
            substitution: Substitution::empty(),
        }
    }

    /// Creates a collector that solves eagerly at statement boundaries.
    pub fn eager(env: TypingEnvironment) -> Self {
        Self {
            eager: true,
            ..Self::new(env)
        }
    }

    /// The environment as the walk has extended it.
    pub fn env(&self) -> &TypingEnvironment {
        &self.env
    }

    /// Consumes the collector, returning the extended environment, the
    /// gathered constraint set, the diagnostics, and any substitution from
    /// eager solving.
    pub fn into_parts(
        self,
    ) -> (
        TypingEnvironment,
        ConstraintSet,
        DiagnosticCollector,
        Substitution,
    ) {
        (
            self.env,
            ConstraintSet::from_vec(self.constraints),
            self.diagnostics,
            self.substitution,
        )
    }

    fn emit(&mut self, constraint: Constraint) {
        trace!("emitting constraint: {constraint}");
        self.constraints.push(constraint);
    }

    fn report(&mut self, error: crate::diagnostics::Error) {
        self.diagnostics.report(error);
    }

    /// Solves all pending constraints and refines the environment.
    ///
    /// Called at statement boundaries by the eager (algorithmic) strategy;
    /// solve failures become diagnostics of the current item.
    fn solve_pending(&mut self) {
        if !self.eager || self.constraints.is_empty() {
            return;
        }
        let constraints = ConstraintSet::from_vec(std::mem::take(&mut self.constraints));
        match Unifier::with_substitution(self.substitution.clone()).solve(&constraints) {
            Ok(subst) => {
                self.env.apply_substitution(&subst);
                self.substitution = subst;
            }
            Err(err) => self.report(*err),
        }
    }

    // ============= EXPRESSIONS: SYNTHESIS =============

    /// Infers a type for an expression (synthesis mode).
    pub fn infer_expr(&mut self, expr: &Spanned<Expr>) -> TypedExpression {
        let span = expr.span.clone();
        match &expr.inner {
            Expr::Literal(literal) => TypedExpression::new(
                TypedExpressionKind::Literal(literal.clone()),
                synth_literal_type(literal),
                span,
            ),

            Expr::Identifier(name) => self.infer_identifier(name, span),

            Expr::Tuple(elements) => {
                let typed: Vec<TypedExpression> =
                    elements.iter().map(|e| self.infer_expr(e)).collect();
                let ty = Type::Tuple(typed.iter().map(|t| t.ty.clone()).collect());
                TypedExpression::new(TypedExpressionKind::Tuple(typed), ty, span)
            }

            Expr::Binary { op, left, right } => self.infer_binary(*op, left, right, span),

            Expr::Unary { op, operand } => self.infer_unary(*op, operand, span),

            Expr::If {
                condition,
                then_branch,
                else_branch,
            } => self.infer_if(condition, then_branch, else_branch.as_deref(), span, None),

            Expr::Match { scrutinee, cases } => self.infer_match(scrutinee, cases, span, None),

            Expr::Block { statements, value } => {
                self.infer_block(statements, value.as_deref(), span, None)
            }

            Expr::Call { function, args } => self.infer_call(function, args, span),

            Expr::ConstructorCall { name, args } => self.infer_constructor(name, args, span),

            Expr::Lambda { params, body } => {
                let param_types: Vec<Type> = params.iter().map(|_| Type::fresh_var()).collect();
                self.infer_lambda(params, &param_types, body, None, span)
            }

            Expr::Try {
                body,
                catch_clauses,
            } => self.infer_try(body, catch_clauses, span),
        }
    }

    /// Checks an expression against an expected type (checking mode).
    pub fn check_expr(&mut self, expr: &Spanned<Expr>, expected: &Type) -> TypedExpression {
        let span = expr.span.clone();
        match (&expr.inner, expected) {
            // Integer literals take on any expected numeric type
            (Expr::Literal(Literal::Integer(value)), ty) if ty.is_numeric() => {
                TypedExpression::new(
                    TypedExpressionKind::Literal(Literal::Integer(*value)),
                    ty.clone(),
                    span,
                )
            }

            // Float literals take on Float or Double
            (Expr::Literal(Literal::Float(value)), ty)
                if matches!(ty.numeric_rank(), Some(rank) if rank >= 4) =>
            {
                TypedExpression::new(
                    TypedExpressionKind::Literal(Literal::Float(*value)),
                    ty.clone(),
                    span,
                )
            }

            (
                Expr::If {
                    condition,
                    then_branch,
                    else_branch,
                },
                _,
            ) => self.infer_if(
                condition,
                then_branch,
                else_branch.as_deref(),
                span,
                Some(expected),
            ),

            (Expr::Match { scrutinee, cases }, _) => {
                self.infer_match(scrutinee, cases, span, Some(expected))
            }

            (Expr::Block { statements, value }, _) => {
                self.infer_block(statements, value.as_deref(), span, Some(expected))
            }

            // Lambdas borrow the expected parameter and return types
            (
                Expr::Lambda { params, body },
                Type::Function {
                    params: expected_params,
                    return_type,
                },
            ) if params.len() == expected_params.len() => {
                self.infer_lambda(params, expected_params, body, Some(return_type.as_ref()), span)
            }

            // Everywhere else: synthesize and constrain assignability
            _ => {
                let typed = self.infer_expr(expr);
                self.emit(Constraint::subtype(
                    typed.ty.clone(),
                    expected.clone(),
                    Some(typed.span.clone()),
                ));
                typed
            }
        }
    }

    // ============= EXPRESSION RULES =============

    fn infer_identifier(&mut self, name: &str, span: Span) -> TypedExpression {
        if let Some(binding) = self.env.lookup_variable(name) {
            let ty = binding.ty.clone();
            return TypedExpression::new(
                TypedExpressionKind::Identifier(name.to_string()),
                ty,
                span,
            );
        }

        if let Some(scheme) = self.env.lookup_scheme(name).cloned() {
            let var = super::TypeVar::fresh();
            self.emit(Constraint::instance(
                var.clone(),
                scheme,
                Some(span.clone()),
            ));
            return TypedExpression::new(
                TypedExpressionKind::Identifier(name.to_string()),
                Type::Variable(var),
                span,
            );
        }

        if let Some(signature) = self.env.lookup_function(name) {
            let (params, return_type) = signature.instantiate();
            return TypedExpression::new(
                TypedExpressionKind::Identifier(name.to_string()),
                Type::function(params, return_type),
                span,
            );
        }

        // Unbound: record the error and keep checking with a fresh variable
        self.report(crate::diagnostics::Error::unresolved_symbol(
            name,
            Some(span.clone()),
        ));
        TypedExpression::new(
            TypedExpressionKind::Identifier(name.to_string()),
            Type::fresh_var(),
            span,
        )
    }

    fn infer_binary(
        &mut self,
        op: BinaryOperator,
        left: &Spanned<Expr>,
        right: &Spanned<Expr>,
        span: Span,
    ) -> TypedExpression {
        let typed_left = self.infer_expr(left);
        let typed_right = self.infer_expr(right);
        let lt = typed_left.ty.clone();
        let rt = typed_right.ty.clone();

        let ty = if op.is_arithmetic() {
            self.arithmetic_result(op, &lt, &rt, &typed_left.span, &typed_right.span)
        } else if op.is_comparison() {
            self.comparison_operand(&lt, &typed_left.span);
            self.comparison_operand(&rt, &typed_right.span);
            Type::boolean()
        } else if op.is_equality() {
            self.emit(Constraint::equality(
                lt.clone(),
                rt.clone(),
                Some(span.clone()),
            ));
            Type::boolean()
        } else {
            // Logical operators require Boolean on both sides
            self.emit(Constraint::equality(
                lt,
                Type::boolean(),
                Some(typed_left.span.clone()),
            ));
            self.emit(Constraint::equality(
                rt,
                Type::boolean(),
                Some(typed_right.span.clone()),
            ));
            Type::boolean()
        };

        TypedExpression::new(
            TypedExpressionKind::Binary {
                op,
                left: Box::new(typed_left),
                right: Box::new(typed_right),
            },
            ty,
            span,
        )
    }

    /// Result type of an arithmetic operator: the wider operand type, with a
    /// widening subtype constraint per operand.
    fn arithmetic_result(
        &mut self,
        op: BinaryOperator,
        lt: &Type,
        rt: &Type,
        left_span: &Span,
        right_span: &Span,
    ) -> Type {
        // String concatenation: the String side coerces the other
        if op == BinaryOperator::Add && (lt == &Type::string() || rt == &Type::string()) {
            return Type::string();
        }

        if let Some(wider) = Type::widen(lt, rt) {
            self.emit(Constraint::subtype(
                lt.clone(),
                wider.clone(),
                Some(left_span.clone()),
            ));
            self.emit(Constraint::subtype(
                rt.clone(),
                wider.clone(),
                Some(right_span.clone()),
            ));
            return wider;
        }

        // A concrete non-numeric operand can never become numeric
        for (ty, operand_span) in [(lt, left_span), (rt, right_span)] {
            if matches!(ty, Type::Primitive(_)) && !ty.is_numeric() {
                self.report(crate::diagnostics::Error::invalid_operation(
                    format!("operator `{op}` cannot be applied to operand of type {ty}"),
                    Some(operand_span.clone()),
                ));
                return Type::fresh_var();
            }
        }

        // Undetermined operands: a fresh result variable absorbs both sides
        let result = Type::fresh_var();
        self.emit(Constraint::subtype(
            lt.clone(),
            result.clone(),
            Some(left_span.clone()),
        ));
        self.emit(Constraint::subtype(
            rt.clone(),
            result.clone(),
            Some(right_span.clone()),
        ));
        result
    }

    fn comparison_operand(&mut self, ty: &Type, span: &Span) {
        if ty.is_numeric() {
            return;
        }
        if matches!(ty, Type::Primitive(_)) {
            self.report(crate::diagnostics::Error::invalid_operation(
                format!("comparison requires numeric operands, found {ty}"),
                Some(span.clone()),
            ));
            return;
        }
        // Undetermined: any numeric type widens into Double
        self.emit(Constraint::subtype(
            ty.clone(),
            Type::double(),
            Some(span.clone()),
        ));
    }

    fn infer_unary(
        &mut self,
        op: UnaryOperator,
        operand: &Spanned<Expr>,
        span: Span,
    ) -> TypedExpression {
        let typed_operand = self.infer_expr(operand);
        let ot = typed_operand.ty.clone();

        let ty = match op {
            UnaryOperator::Negate => {
                if ot.is_numeric() {
                    ot
                } else if matches!(ot, Type::Primitive(_)) {
                    self.report(crate::diagnostics::Error::invalid_operation(
                        format!("unary `-` requires a numeric operand, found {ot}"),
                        Some(typed_operand.span.clone()),
                    ));
                    Type::fresh_var()
                } else {
                    self.emit(Constraint::subtype(
                        ot.clone(),
                        Type::double(),
                        Some(typed_operand.span.clone()),
                    ));
                    ot
                }
            }
            UnaryOperator::Not => {
                self.emit(Constraint::equality(
                    ot,
                    Type::boolean(),
                    Some(typed_operand.span.clone()),
                ));
                Type::boolean()
            }
        };

        TypedExpression::new(
            TypedExpressionKind::Unary {
                op,
                operand: Box::new(typed_operand),
            },
            ty,
            span,
        )
    }

    fn infer_if(
        &mut self,
        condition: &Spanned<Expr>,
        then_branch: &Spanned<Expr>,
        else_branch: Option<&Spanned<Expr>>,
        span: Span,
        expected: Option<&Type>,
    ) -> TypedExpression {
        let typed_condition = self.infer_expr(condition);
        self.emit(Constraint::equality(
            typed_condition.ty.clone(),
            Type::boolean(),
            Some(typed_condition.span.clone()),
        ));

        match else_branch {
            Some(else_branch) => {
                let (typed_then, typed_else, ty) = match expected {
                    Some(expected) => {
                        let typed_then = self.check_expr(then_branch, expected);
                        let typed_else = self.check_expr(else_branch, expected);
                        (typed_then, typed_else, expected.clone())
                    }
                    None => {
                        let typed_then = self.infer_expr(then_branch);
                        let typed_else = self.infer_expr(else_branch);
                        // Both branches must agree; two numerics agree at the
                        // wider type
                        let ty = Type::widen(&typed_then.ty, &typed_else.ty)
                            .unwrap_or_else(|| typed_then.ty.clone());
                        self.emit(Constraint::equality(
                            typed_then.ty.clone(),
                            typed_else.ty.clone(),
                            Some(typed_else.span.clone()),
                        ));
                        (typed_then, typed_else, ty)
                    }
                };
                TypedExpression::new(
                    TypedExpressionKind::If {
                        condition: Box::new(typed_condition),
                        then_branch: Box::new(typed_then),
                        else_branch: Some(Box::new(typed_else)),
                    },
                    ty,
                    span,
                )
            }
            None => {
                // A missing else makes the whole expression nullable
                let typed_then = self.infer_expr(then_branch);
                let ty = Type::nullable(typed_then.ty.clone());
                if let Some(expected) = expected {
                    self.emit(Constraint::equality(
                        ty.clone(),
                        expected.clone(),
                        Some(span.clone()),
                    ));
                }
                TypedExpression::new(
                    TypedExpressionKind::If {
                        condition: Box::new(typed_condition),
                        then_branch: Box::new(typed_then),
                        else_branch: None,
                    },
                    ty,
                    span,
                )
            }
        }
    }

    fn infer_match(
        &mut self,
        scrutinee: &Spanned<Expr>,
        cases: &[MatchCase],
        span: Span,
        expected: Option<&Type>,
    ) -> TypedExpression {
        let typed_scrutinee = self.infer_expr(scrutinee);
        let scrutinee_ty = typed_scrutinee.ty.clone();

        let mut typed_cases = Vec::new();
        let mut coverage: Vec<(PatternInfo, bool)> = Vec::new();
        let mut result_ty: Option<Type> = expected.cloned();

        for case in cases {
            let info = match check_pattern(&case.pattern, &scrutinee_ty, &self.env) {
                Ok(info) => info,
                Err(err) => {
                    self.report(*err);
                    PatternInfo::default()
                }
            };
            for constraint in &info.constraints {
                self.emit(constraint.clone());
            }

            self.env.push_scope();
            for (name, ty) in &info.bindings {
                if let Err(err) = self.env.declare_variable(
                    name.clone(),
                    ty.clone(),
                    false,
                    Some(case.pattern.span.clone()),
                ) {
                    self.report(*err);
                }
            }

            let typed_guard = case.guard.as_ref().map(|guard| {
                let typed = self.infer_expr(guard);
                self.emit(Constraint::equality(
                    typed.ty.clone(),
                    Type::boolean(),
                    Some(typed.span.clone()),
                ));
                typed
            });

            let typed_body = match expected {
                Some(expected) => self.check_expr(&case.body, expected),
                None => {
                    let typed_body = self.infer_expr(&case.body);
                    match &result_ty {
                        Some(first) => {
                            // Every arm must agree with the first
                            self.emit(Constraint::equality(
                                first.clone(),
                                typed_body.ty.clone(),
                                Some(typed_body.span.clone()),
                            ));
                            if let Some(wider) = Type::widen(first, &typed_body.ty) {
                                result_ty = Some(wider);
                            }
                        }
                        None => result_ty = Some(typed_body.ty.clone()),
                    }
                    typed_body
                }
            };

            if let Err(err) = self.env.pop_scope() {
                self.report(*err);
            }

            coverage.push((info.clone(), case.guard.is_some()));
            typed_cases.push(TypedMatchCase {
                pattern: case.pattern.clone(),
                bindings: info.bindings,
                guard: typed_guard,
                body: typed_body,
            });
        }

        if let Err(err) =
            check_exhaustiveness(&scrutinee_ty, &coverage, &self.env, Some(span.clone()))
        {
            self.report(*err);
        }

        let ty = result_ty.unwrap_or_else(Type::fresh_var);
        TypedExpression::new(
            TypedExpressionKind::Match {
                scrutinee: Box::new(typed_scrutinee),
                cases: typed_cases,
            },
            ty,
            span,
        )
    }

    fn infer_block(
        &mut self,
        statements: &[Spanned<Statement>],
        value: Option<&Spanned<Expr>>,
        span: Span,
        expected: Option<&Type>,
    ) -> TypedExpression {
        self.env.push_scope();

        let typed_statements: Vec<TypedStatement> = statements
            .iter()
            .map(|stmt| self.collect_statement(stmt))
            .collect();

        let (typed_value, ty) = match (value, expected) {
            (Some(value), Some(expected)) => {
                let typed = self.check_expr(value, expected);
                (Some(Box::new(typed)), expected.clone())
            }
            (Some(value), None) => {
                let typed = self.infer_expr(value);
                let ty = typed.ty.clone();
                (Some(Box::new(typed)), ty)
            }
            (None, Some(expected)) => {
                self.emit(Constraint::equality(
                    Type::unit(),
                    expected.clone(),
                    Some(span.clone()),
                ));
                (None, Type::unit())
            }
            (None, None) => (None, Type::unit()),
        };

        if let Err(err) = self.env.pop_scope() {
            self.report(*err);
        }

        TypedExpression::new(
            TypedExpressionKind::Block {
                statements: typed_statements,
                value: typed_value,
            },
            ty,
            span,
        )
    }

    fn infer_call(
        &mut self,
        function: &str,
        args: &[Spanned<Expr>],
        span: Span,
    ) -> TypedExpression {
        if let Some(signature) = self.env.lookup_function(function).cloned() {
            if signature.arity() != args.len() {
                self.report(crate::diagnostics::Error::arity_mismatch(
                    signature.arity(),
                    args.len(),
                    Some(span.clone()),
                ));
                let typed_args = args.iter().map(|a| self.infer_expr(a)).collect();
                return TypedExpression::new(
                    TypedExpressionKind::Call {
                        function: function.to_string(),
                        args: typed_args,
                    },
                    Type::fresh_var(),
                    span,
                );
            }

            let (params, return_type) = signature.instantiate();
            let mut typed_args = Vec::new();
            for (arg, param) in args.iter().zip(&params) {
                let typed = self.infer_expr(arg);
                self.emit(Constraint::subtype(
                    typed.ty.clone(),
                    param.clone(),
                    Some(typed.span.clone()),
                ));
                typed_args.push(typed);
            }
            return TypedExpression::new(
                TypedExpressionKind::Call {
                    function: function.to_string(),
                    args: typed_args,
                },
                return_type,
                span,
            );
        }

        // Not a declared function; maybe a function-valued binding
        if self.env.lookup_variable(function).is_some()
            || self.env.lookup_scheme(function).is_some()
        {
            let callee = self.infer_identifier(function, span.clone());
            let typed_args: Vec<TypedExpression> =
                args.iter().map(|a| self.infer_expr(a)).collect();
            let result = Type::fresh_var();
            self.emit(Constraint::equality(
                callee.ty.clone(),
                Type::function(
                    typed_args.iter().map(|a| a.ty.clone()).collect(),
                    result.clone(),
                ),
                Some(span.clone()),
            ));
            return TypedExpression::new(
                TypedExpressionKind::Call {
                    function: function.to_string(),
                    args: typed_args,
                },
                result,
                span,
            );
        }

        self.report(crate::diagnostics::Error::unresolved_symbol(
            function,
            Some(span.clone()),
        ));
        let typed_args = args.iter().map(|a| self.infer_expr(a)).collect();
        TypedExpression::new(
            TypedExpressionKind::Call {
                function: function.to_string(),
                args: typed_args,
            },
            Type::fresh_var(),
            span,
        )
    }

    fn infer_constructor(
        &mut self,
        name: &str,
        args: &[Spanned<Expr>],
        span: Span,
    ) -> TypedExpression {
        let Some((def, variant)) = self
            .env
            .lookup_variant(name)
            .map(|(d, v)| (d.clone(), v.clone()))
        else {
            self.report(crate::diagnostics::Error::unresolved_symbol(
                name,
                Some(span.clone()),
            ));
            let typed_args = args.iter().map(|a| self.infer_expr(a)).collect();
            return TypedExpression::new(
                TypedExpressionKind::ConstructorCall {
                    name: name.to_string(),
                    args: typed_args,
                },
                Type::fresh_var(),
                span,
            );
        };

        let (union_ty, _) = def.instantiate();
        let type_args = match &union_ty {
            Type::Union { type_args, .. } => type_args.clone(),
            _ => Vec::new(),
        };

        if variant.arity() != args.len() {
            self.report(crate::diagnostics::Error::arity_mismatch(
                variant.arity(),
                args.len(),
                Some(span.clone()),
            ));
            let typed_args = args.iter().map(|a| self.infer_expr(a)).collect();
            return TypedExpression::new(
                TypedExpressionKind::ConstructorCall {
                    name: name.to_string(),
                    args: typed_args,
                },
                union_ty,
                span,
            );
        }

        let field_types = def
            .field_types_for(name, &type_args)
            .expect("variant and arity were just validated");

        let mut typed_args = Vec::new();
        for (arg, field_ty) in args.iter().zip(&field_types) {
            let typed = self.infer_expr(arg);
            self.emit(Constraint::subtype(
                typed.ty.clone(),
                field_ty.clone(),
                Some(typed.span.clone()),
            ));
            typed_args.push(typed);
        }

        TypedExpression::new(
            TypedExpressionKind::ConstructorCall {
                name: name.to_string(),
                args: typed_args,
            },
            union_ty,
            span,
        )
    }

    fn infer_lambda(
        &mut self,
        params: &[String],
        param_types: &[Type],
        body: &Spanned<Expr>,
        expected_return: Option<&Type>,
        span: Span,
    ) -> TypedExpression {
        self.env.push_scope();
        for (name, ty) in params.iter().zip(param_types) {
            if let Err(err) =
                self.env
                    .declare_variable(name.clone(), ty.clone(), false, Some(span.clone()))
            {
                self.report(*err);
            }
        }

        // No generalization here: let-polymorphism is restricted to declared
        // functions
        let typed_body = match expected_return {
            Some(expected) => self.check_expr(body, expected),
            None => self.infer_expr(body),
        };

        if let Err(err) = self.env.pop_scope() {
            self.report(*err);
        }

        let ty = Type::function(
            param_types.to_vec(),
            expected_return
                .cloned()
                .unwrap_or_else(|| typed_body.ty.clone()),
        );
        let typed_params = params
            .iter()
            .zip(param_types)
            .map(|(name, ty)| TypedParameter {
                name: name.clone(),
                ty: ty.clone(),
            })
            .collect();

        TypedExpression::new(
            TypedExpressionKind::Lambda {
                params: typed_params,
                body: Box::new(typed_body),
            },
            ty,
            span,
        )
    }

    fn infer_try(
        &mut self,
        body: &Spanned<Expr>,
        catch_clauses: &[MatchCase],
        span: Span,
    ) -> TypedExpression {
        // Try is only legal where the enclosing function returns Result
        match self.env.enclosing_return_type() {
            Some(Type::Union { name, .. }) if name == "Result" => {}
            _ => {
                self.report(crate::diagnostics::Error::invalid_operation(
                    "`try` requires the enclosing function to return Result",
                    Some(span.clone()),
                ));
            }
        }

        let typed_body = self.infer_expr(body);
        let ok_ty = Type::fresh_var();
        let err_ty = Type::fresh_var();
        self.emit(Constraint::equality(
            typed_body.ty.clone(),
            Type::result(ok_ty.clone(), err_ty.clone()),
            Some(typed_body.span.clone()),
        ));

        let mut typed_clauses = Vec::new();
        for clause in catch_clauses {
            let info = match check_pattern(&clause.pattern, &err_ty, &self.env) {
                Ok(info) => info,
                Err(err) => {
                    self.report(*err);
                    PatternInfo::default()
                }
            };
            for constraint in &info.constraints {
                self.emit(constraint.clone());
            }

            self.env.push_scope();
            for (name, ty) in &info.bindings {
                if let Err(err) = self.env.declare_variable(
                    name.clone(),
                    ty.clone(),
                    false,
                    Some(clause.pattern.span.clone()),
                ) {
                    self.report(*err);
                }
            }

            let typed_guard = clause.guard.as_ref().map(|guard| {
                let typed = self.infer_expr(guard);
                self.emit(Constraint::equality(
                    typed.ty.clone(),
                    Type::boolean(),
                    Some(typed.span.clone()),
                ));
                typed
            });

            // Every catch body produces the try's success type
            let typed_clause_body = self.infer_expr(&clause.body);
            self.emit(Constraint::equality(
                typed_clause_body.ty.clone(),
                ok_ty.clone(),
                Some(typed_clause_body.span.clone()),
            ));

            if let Err(err) = self.env.pop_scope() {
                self.report(*err);
            }

            typed_clauses.push(TypedMatchCase {
                pattern: clause.pattern.clone(),
                bindings: info.bindings,
                guard: typed_guard,
                body: typed_clause_body,
            });
        }

        TypedExpression::new(
            TypedExpressionKind::Try {
                body: Box::new(typed_body),
                catch_clauses: typed_clauses,
            },
            ok_ty,
            span,
        )
    }

    // ============= STATEMENTS =============

    /// Collects constraints for one statement, extending the environment.
    pub fn collect_statement(&mut self, stmt: &Spanned<Statement>) -> TypedStatement {
        let span = stmt.span.clone();
        let typed = match &stmt.inner {
            Statement::VariableDecl {
                name,
                mutable,
                type_annotation,
                value,
            } => {
                let declared = type_annotation.as_ref().and_then(|annotation| {
                    match self.env.resolve_type_expr(annotation, &[]) {
                        Ok(ty) => Some(ty),
                        Err(err) => {
                            self.report(*err);
                            None
                        }
                    }
                });

                let (typed_value, ty) = match declared {
                    Some(declared) => {
                        let typed = self.check_expr(value, &declared);
                        (typed, declared)
                    }
                    None => {
                        // Local bindings stay monomorphic: the inferred type is
                        // used as-is, with no generalization
                        let typed = self.infer_expr(value);
                        let ty = typed.ty.clone();
                        (typed, ty)
                    }
                };

                if let Err(err) =
                    self.env
                        .declare_variable(name.clone(), ty.clone(), *mutable, Some(span.clone()))
                {
                    self.report(*err);
                }

                TypedStatement::VariableDecl {
                    name: name.clone(),
                    mutable: *mutable,
                    ty,
                    value: typed_value,
                    span,
                }
            }

            Statement::Assignment { name, value } => {
                let typed_value = match self.env.assignment_target(name, Some(span.clone())) {
                    Ok(target_ty) => self.check_expr(value, &target_ty),
                    Err(err) => {
                        self.report(*err);
                        self.infer_expr(value)
                    }
                };
                TypedStatement::Assignment {
                    name: name.clone(),
                    value: typed_value,
                    span,
                }
            }

            Statement::TypeDecl {
                name,
                type_params,
                variants,
            } => {
                let definition = self.declare_type_decl(name, type_params, variants, &span);
                TypedStatement::TypeDecl { definition, span }
            }

            Statement::FunctionDecl {
                name,
                type_params,
                params,
                return_type,
                body,
            } => {
                let signature = self.resolve_function_signature(
                    name,
                    type_params,
                    params,
                    return_type.as_ref(),
                    &span,
                );
                if let Err(err) = self
                    .env
                    .declare_function(signature.clone(), Some(span.clone()))
                {
                    self.report(*err);
                }
                let typed_body = self.check_function_body(&signature, params, body);
                TypedStatement::FunctionDecl {
                    signature,
                    body: typed_body,
                    span,
                }
            }

            Statement::Expression(expr) => TypedStatement::Expression(self.infer_expr(expr)),
        };

        self.solve_pending();
        typed
    }

    /// Resolves and declares a union type declaration, reporting failures.
    ///
    /// Declaration is two-phase: the header (name and parameters) lands in
    /// the type table before variant bodies resolve, so self-references work.
    /// Returns the definition even when declaration failed, so callers can
    /// still produce a typed statement.
    pub fn declare_type_decl(
        &mut self,
        name: &str,
        type_params: &[String],
        variants: &[VariantDecl],
        span: &Span,
    ) -> TypeDefinition {
        let header = TypeDefinition::union(name, type_params.to_vec(), vec![], Some(span.clone()))
            .expect("empty variant list cannot collide");
        let declared = match self.env.declare_type(header, Some(span.clone())) {
            Ok(()) => true,
            Err(err) => {
                self.report(*err);
                false
            }
        };

        let definition = self.resolve_type_decl_body(name, type_params, variants, span);
        if declared {
            self.env.update_type(definition.clone());
        }
        definition
    }

    /// Resolves a union declaration's variant bodies against the current
    /// type table. The caller decides whether the result replaces a declared
    /// header; a failed header declaration must leave the original intact.
    pub fn resolve_type_decl_body(
        &mut self,
        name: &str,
        type_params: &[String],
        variants: &[VariantDecl],
        span: &Span,
    ) -> TypeDefinition {
        let variant_defs: Vec<VariantDef> = variants
            .iter()
            .map(|variant| {
                let field_types = variant
                    .fields
                    .iter()
                    .map(
                        |field| match self.env.resolve_type_expr(field, type_params) {
                            Ok(ty) => ty,
                            Err(err) => {
                                self.report(*err);
                                Type::fresh_var()
                            }
                        },
                    )
                    .collect();
                VariantDef::new(variant.name.clone(), field_types, Some(variant.span.clone()))
            })
            .collect();

        let definition = match TypeDefinition::union(
            name,
            type_params.to_vec(),
            variant_defs,
            Some(span.clone()),
        ) {
            Ok(definition) => definition,
            Err(err) => {
                self.report(*err);
                TypeDefinition::union(name, type_params.to_vec(), vec![], Some(span.clone()))
                    .expect("empty variant list cannot collide")
            }
        };

        definition
    }

    /// Resolves a function declaration's signature. Unresolvable annotations
    /// are reported and replaced by fresh variables; a missing return
    /// annotation becomes a fresh variable constrained by the body.
    pub fn resolve_function_signature(
        &mut self,
        name: &str,
        type_params: &[String],
        params: &[Parameter],
        return_type: Option<&Spanned<TypeExpr>>,
        span: &Span,
    ) -> FunctionSignature {
        let param_types: Vec<Type> = params
            .iter()
            .map(|param| {
                match self
                    .env
                    .resolve_type_expr(&param.type_annotation, type_params)
                {
                    Ok(ty) => ty,
                    Err(err) => {
                        self.report(*err);
                        Type::fresh_var()
                    }
                }
            })
            .collect();

        let return_ty = match return_type {
            Some(annotation) => match self.env.resolve_type_expr(annotation, type_params) {
                Ok(ty) => ty,
                Err(err) => {
                    self.report(*err);
                    Type::fresh_var()
                }
            },
            None => Type::fresh_var(),
        };

        FunctionSignature::new(
            name,
            type_params.to_vec(),
            param_types,
            return_ty,
            Some(span.clone()),
        )
    }

    /// Checks a function body against its signature.
    pub fn check_function_body(
        &mut self,
        signature: &FunctionSignature,
        params: &[Parameter],
        body: &Spanned<Expr>,
    ) -> TypedExpression {
        let saved_return = self
            .env
            .set_enclosing_return(Some(signature.return_type.clone()));

        self.env.push_scope();
        for (param, ty) in params.iter().zip(&signature.params) {
            if let Err(err) = self.env.declare_variable(
                param.name.clone(),
                ty.clone(),
                false,
                Some(param.type_annotation.span.clone()),
            ) {
                self.report(*err);
            }
        }

        let typed_body = self.check_expr(body, &signature.return_type);

        if let Err(err) = self.env.pop_scope() {
            self.report(*err);
        }
        self.env.set_enclosing_return(saved_return);

        typed_body
    }
}

/// The type an expression literal synthesizes without context.
fn synth_literal_type(literal: &Literal) -> Type {
    match literal {
        Literal::Integer(_) => Type::int(),
        Literal::Float(_) => Type::double(),
        Literal::String(_) => Type::string(),
        Literal::Boolean(_) => Type::boolean(),
        Literal::Null => Type::nullable(Type::fresh_var()),
    }
}

/// Collects constraints for a standalone expression against an environment.
///
/// Exposed for constraint-level tooling; the full pipeline is
/// [`super::type_check`].
pub fn collect_constraints(
    expr: &Spanned<Expr>,
    env: &TypingEnvironment,
) -> (Type, ConstraintSet) {
    let mut collector = ConstraintCollector::new(env.clone());
    let typed = collector.infer_expr(expr);
    let (_, constraints, _, _) = collector.into_parts();
    (typed.ty, constraints)
}

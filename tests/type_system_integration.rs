//! End-to-end type checking scenarios through the public surface.
//!
//! Each test builds a small program AST by hand (the checker never sees
//! source text) and drives it through `type_check`.

use pretty_assertions::assert_eq;

use taylorlang::ast::{
    BinaryOperator, Expr, Literal, MatchCase, Parameter, Pattern, Program, Statement, TypeExpr,
    VariantDecl,
};
use taylorlang::diagnostics::{spanned, Span, Spanned};
use taylorlang::{type_check, Error, Type, TypedStatement};

fn stmt(statement: Statement) -> Spanned<Statement> {
    spanned(statement, Span::default())
}

fn expr(e: Expr) -> Spanned<Expr> {
    spanned(e, Span::default())
}

fn int_lit(value: i64) -> Spanned<Expr> {
    expr(Expr::Literal(Literal::Integer(value)))
}

fn val(name: &str, value: Spanned<Expr>) -> Spanned<Statement> {
    stmt(Statement::VariableDecl {
        name: name.to_string(),
        mutable: false,
        type_annotation: None,
        value,
    })
}

fn named_type(name: &str) -> Spanned<TypeExpr> {
    spanned(TypeExpr::Named(name.to_string()), Span::default())
}

fn variant(name: &str, fields: Vec<Spanned<TypeExpr>>) -> VariantDecl {
    VariantDecl {
        name: name.to_string(),
        fields,
        span: Span::default(),
    }
}

fn fn_decl(
    name: &str,
    params: Vec<(&str, &str)>,
    return_type: &str,
    body: Spanned<Expr>,
) -> Spanned<Statement> {
    stmt(Statement::FunctionDecl {
        name: name.to_string(),
        type_params: vec![],
        params: params
            .into_iter()
            .map(|(param, ty)| Parameter {
                name: param.to_string(),
                type_annotation: named_type(ty),
            })
            .collect(),
        return_type: Some(named_type(return_type)),
        body,
    })
}

fn variable_type(typed: &taylorlang::TypedProgram, name: &str) -> Type {
    typed
        .statements
        .iter()
        .find_map(|statement| match statement {
            TypedStatement::VariableDecl {
                name: decl_name,
                ty,
                ..
            } if decl_name == name => Some(ty.clone()),
            _ => None,
        })
        .unwrap_or_else(|| panic!("no typed declaration for `{name}`"))
}

#[test]
fn simple_val_declaration_types_as_int() {
    let program = Program::new(vec![val("x", int_lit(42))]);
    let typed = type_check(&program).unwrap();
    assert_eq!(variable_type(&typed, "x"), Type::int());
}

#[test]
fn option_constructor_call_infers_type_argument() {
    // type Option<T> = Some(T) | None; val x = Some(42)
    let program = Program::new(vec![
        stmt(Statement::TypeDecl {
            name: "Option".to_string(),
            type_params: vec!["T".to_string()],
            variants: vec![
                variant("Some", vec![named_type("T")]),
                variant("None", vec![]),
            ],
        }),
        val(
            "x",
            expr(Expr::ConstructorCall {
                name: "Some".to_string(),
                args: vec![int_lit(42)],
            }),
        ),
    ]);

    let typed = type_check(&program).unwrap();
    assert_eq!(
        variable_type(&typed, "x"),
        Type::union("Option", vec![Type::int()])
    );
}

#[test]
fn function_declaration_and_call() {
    // fn add(x: Int, y: Int): Int => x + y; val r = add(1, 2)
    let program = Program::new(vec![
        fn_decl(
            "add",
            vec![("x", "Int"), ("y", "Int")],
            "Int",
            expr(Expr::Binary {
                op: BinaryOperator::Add,
                left: Box::new(expr(Expr::Identifier("x".to_string()))),
                right: Box::new(expr(Expr::Identifier("y".to_string()))),
            }),
        ),
        val(
            "r",
            expr(Expr::Call {
                function: "add".to_string(),
                args: vec![int_lit(1), int_lit(2)],
            }),
        ),
    ]);

    let typed = type_check(&program).unwrap();
    assert_eq!(variable_type(&typed, "r"), Type::int());
}

#[test]
fn call_with_wrong_argument_type_fails() {
    // add("a", 1) fails with TypeMismatch on the first argument
    let program = Program::new(vec![
        fn_decl(
            "add",
            vec![("x", "Int"), ("y", "Int")],
            "Int",
            expr(Expr::Binary {
                op: BinaryOperator::Add,
                left: Box::new(expr(Expr::Identifier("x".to_string()))),
                right: Box::new(expr(Expr::Identifier("y".to_string()))),
            }),
        ),
        val(
            "r",
            expr(Expr::Call {
                function: "add".to_string(),
                args: vec![
                    expr(Expr::Literal(Literal::String("a".to_string()))),
                    int_lit(1),
                ],
            }),
        ),
    ]);

    let err = type_check(&program).unwrap_err();
    assert_eq!(err.kind(), "TypeMismatch");
}

#[test]
fn if_branches_must_agree() {
    // val r = if (true) 42 else "hello"
    let program = Program::new(vec![val(
        "r",
        expr(Expr::If {
            condition: Box::new(expr(Expr::Literal(Literal::Boolean(true)))),
            then_branch: Box::new(int_lit(42)),
            else_branch: Some(Box::new(expr(Expr::Literal(Literal::String(
                "hello".to_string(),
            ))))),
        }),
    )]);

    let err = type_check(&program).unwrap_err();
    match *err {
        Error::TypeMismatch {
            ref expected,
            ref actual,
            ..
        } => {
            assert_eq!(expected, &Type::int());
            assert_eq!(actual, &Type::string());
        }
        ref other => panic!("expected TypeMismatch, got {other:?}"),
    }
}

fn color_program(case_names: &[&str]) -> Program {
    // type Color = Red | Green | Blue; val c = Red; val m = match c { ... }
    let cases = case_names
        .iter()
        .enumerate()
        .map(|(index, name)| MatchCase {
            pattern: spanned(
                Pattern::Constructor {
                    name: name.to_string(),
                    args: vec![],
                },
                Span::default(),
            ),
            guard: None,
            body: int_lit(index as i64),
        })
        .collect();

    Program::new(vec![
        stmt(Statement::TypeDecl {
            name: "Color".to_string(),
            type_params: vec![],
            variants: vec![
                variant("Red", vec![]),
                variant("Green", vec![]),
                variant("Blue", vec![]),
            ],
        }),
        val(
            "c",
            expr(Expr::ConstructorCall {
                name: "Red".to_string(),
                args: vec![],
            }),
        ),
        val(
            "m",
            expr(Expr::Match {
                scrutinee: Box::new(expr(Expr::Identifier("c".to_string()))),
                cases,
            }),
        ),
    ])
}

#[test]
fn non_exhaustive_match_lists_missing_variants() {
    let err = type_check(&color_program(&["Red", "Green"])).unwrap_err();
    match *err {
        Error::NonExhaustiveMatch {
            ref missing_patterns,
            ..
        } => assert_eq!(missing_patterns, &vec!["Blue".to_string()]),
        ref other => panic!("expected NonExhaustiveMatch, got {other:?}"),
    }
}

#[test]
fn exhaustive_match_type_checks() {
    let typed = type_check(&color_program(&["Red", "Green", "Blue"])).unwrap();
    assert_eq!(variable_type(&typed, "m"), Type::int());
}

#[test]
fn recursive_union_declaration_is_accepted() {
    // type List<T> = Nil | Cons(T, List<T>); val l = Cons(1, Cons(2, Nil))
    let list_of_t = spanned(
        TypeExpr::Generic {
            name: "List".to_string(),
            args: vec![named_type("T")],
        },
        Span::default(),
    );

    let cons = |head: Spanned<Expr>, tail: Spanned<Expr>| {
        expr(Expr::ConstructorCall {
            name: "Cons".to_string(),
            args: vec![head, tail],
        })
    };
    let nil = expr(Expr::ConstructorCall {
        name: "Nil".to_string(),
        args: vec![],
    });

    let program = Program::new(vec![
        stmt(Statement::TypeDecl {
            name: "List".to_string(),
            type_params: vec!["T".to_string()],
            variants: vec![
                variant("Nil", vec![]),
                variant("Cons", vec![named_type("T"), list_of_t]),
            ],
        }),
        val("l", cons(int_lit(1), cons(int_lit(2), nil))),
    ]);

    let typed = type_check(&program).unwrap();
    assert_eq!(
        variable_type(&typed, "l"),
        Type::union("List", vec![Type::int()])
    );
}

#[test]
fn duplicate_variant_name_is_rejected() {
    // type Bad = A | B | A
    let program = Program::new(vec![stmt(Statement::TypeDecl {
        name: "Bad".to_string(),
        type_params: vec![],
        variants: vec![variant("A", vec![]), variant("B", vec![]), variant("A", vec![])],
    })]);

    let err = type_check(&program).unwrap_err();
    match *err {
        Error::DuplicateDefinition { ref name, .. } => assert_eq!(name, "A"),
        ref other => panic!("expected DuplicateDefinition, got {other:?}"),
    }
}

#[test]
fn duplicate_function_name_is_rejected() {
    // fn f(): Int => 1; fn f(): String => "x"
    let program = Program::new(vec![
        fn_decl("f", vec![], "Int", int_lit(1)),
        fn_decl(
            "f",
            vec![],
            "String",
            expr(Expr::Literal(Literal::String("x".to_string()))),
        ),
    ]);

    let err = type_check(&program).unwrap_err();
    match *err {
        Error::DuplicateDefinition { ref name, .. } => assert_eq!(name, "f"),
        ref other => panic!("expected DuplicateDefinition, got {other:?}"),
    }
}

#[test]
fn match_binds_constructor_fields() {
    // type Option<T> = Some(T) | None; val o = Some(42);
    // val r = match o { Some(v) => v; None => 0 }
    let program = Program::new(vec![
        stmt(Statement::TypeDecl {
            name: "Option".to_string(),
            type_params: vec!["T".to_string()],
            variants: vec![
                variant("Some", vec![named_type("T")]),
                variant("None", vec![]),
            ],
        }),
        val(
            "o",
            expr(Expr::ConstructorCall {
                name: "Some".to_string(),
                args: vec![int_lit(42)],
            }),
        ),
        val(
            "r",
            expr(Expr::Match {
                scrutinee: Box::new(expr(Expr::Identifier("o".to_string()))),
                cases: vec![
                    MatchCase {
                        pattern: spanned(
                            Pattern::Constructor {
                                name: "Some".to_string(),
                                args: vec![spanned(
                                    Pattern::Identifier("v".to_string()),
                                    Span::default(),
                                )],
                            },
                            Span::default(),
                        ),
                        guard: None,
                        body: expr(Expr::Identifier("v".to_string())),
                    },
                    MatchCase {
                        pattern: spanned(
                            Pattern::Constructor {
                                name: "None".to_string(),
                                args: vec![],
                            },
                            Span::default(),
                        ),
                        guard: None,
                        body: int_lit(0),
                    },
                ],
            }),
        ),
    ]);

    let typed = type_check(&program).unwrap();
    assert_eq!(variable_type(&typed, "r"), Type::int());
}

#[test]
fn guarded_arm_does_not_make_match_exhaustive() {
    // A guard on the final covering arm leaves the match non-exhaustive
    let mut program = color_program(&["Red", "Green", "Blue"]);
    if let Statement::VariableDecl { value, .. } = &mut program.statements[2].inner {
        if let Expr::Match { cases, .. } = &mut value.inner {
            cases[2].guard = Some(expr(Expr::Literal(Literal::Boolean(true))));
        }
    }

    let err = type_check(&program).unwrap_err();
    assert_eq!(err.kind(), "NonExhaustiveMatch");
}

#[test]
fn assignment_respects_mutability() {
    // var a = 1; a = 2 is fine; val b = 1; b = 2 is not
    let ok = Program::new(vec![
        stmt(Statement::VariableDecl {
            name: "a".to_string(),
            mutable: true,
            type_annotation: None,
            value: int_lit(1),
        }),
        stmt(Statement::Assignment {
            name: "a".to_string(),
            value: int_lit(2),
        }),
    ]);
    assert!(type_check(&ok).is_ok());

    let bad = Program::new(vec![
        val("b", int_lit(1)),
        stmt(Statement::Assignment {
            name: "b".to_string(),
            value: int_lit(2),
        }),
    ]);
    let err = type_check(&bad).unwrap_err();
    assert_eq!(err.kind(), "InvalidOperation");
}

#[test]
fn assignment_checks_value_type() {
    let program = Program::new(vec![
        stmt(Statement::VariableDecl {
            name: "a".to_string(),
            mutable: true,
            type_annotation: None,
            value: int_lit(1),
        }),
        stmt(Statement::Assignment {
            name: "a".to_string(),
            value: expr(Expr::Literal(Literal::String("nope".to_string()))),
        }),
    ]);

    let err = type_check(&program).unwrap_err();
    assert_eq!(err.kind(), "TypeMismatch");
}

#[test]
fn annotated_declaration_allows_widening() {
    // val x: Long = 42
    let program = Program::new(vec![stmt(Statement::VariableDecl {
        name: "x".to_string(),
        mutable: false,
        type_annotation: Some(named_type("Long")),
        value: int_lit(42),
    })]);

    let typed = type_check(&program).unwrap();
    assert_eq!(variable_type(&typed, "x"), Type::long());
}

fn result_type_expr() -> Spanned<TypeExpr> {
    spanned(
        TypeExpr::Generic {
            name: "Result".to_string(),
            args: vec![named_type("Int"), named_type("Throwable")],
        },
        Span::default(),
    )
}

#[test]
fn try_expression_unwraps_result() {
    // fn g(): Result<Int, Throwable> => Ok(42)
    // fn f(): Result<Int, Throwable> => Ok(try g() catch { _ => 0 })
    let g = stmt(Statement::FunctionDecl {
        name: "g".to_string(),
        type_params: vec![],
        params: vec![],
        return_type: Some(result_type_expr()),
        body: expr(Expr::ConstructorCall {
            name: "Ok".to_string(),
            args: vec![int_lit(42)],
        }),
    });

    let try_call = expr(Expr::Try {
        body: Box::new(expr(Expr::Call {
            function: "g".to_string(),
            args: vec![],
        })),
        catch_clauses: vec![MatchCase {
            pattern: spanned(Pattern::Wildcard, Span::default()),
            guard: None,
            body: int_lit(0),
        }],
    });

    let f = stmt(Statement::FunctionDecl {
        name: "f".to_string(),
        type_params: vec![],
        params: vec![],
        return_type: Some(result_type_expr()),
        body: expr(Expr::ConstructorCall {
            name: "Ok".to_string(),
            args: vec![try_call],
        }),
    });

    assert!(type_check(&Program::new(vec![g, f])).is_ok());
}

#[test]
fn try_outside_result_function_is_rejected() {
    // fn f(): Int => try g()
    let g = stmt(Statement::FunctionDecl {
        name: "g".to_string(),
        type_params: vec![],
        params: vec![],
        return_type: Some(result_type_expr()),
        body: expr(Expr::ConstructorCall {
            name: "Ok".to_string(),
            args: vec![int_lit(42)],
        }),
    });
    let f = fn_decl(
        "f",
        vec![],
        "Int",
        expr(Expr::Try {
            body: Box::new(expr(Expr::Call {
                function: "g".to_string(),
                args: vec![],
            })),
            catch_clauses: vec![],
        }),
    );

    let err = type_check(&Program::new(vec![g, f])).unwrap_err();
    assert_eq!(err.kind(), "InvalidOperation");
}

#[test]
fn result_with_bad_error_slot_is_rejected() {
    // fn f(): Result<Int, Int> => ...
    let program = Program::new(vec![stmt(Statement::FunctionDecl {
        name: "f".to_string(),
        type_params: vec![],
        params: vec![],
        return_type: Some(spanned(
            TypeExpr::Generic {
                name: "Result".to_string(),
                args: vec![named_type("Int"), named_type("Int")],
            },
            Span::default(),
        )),
        body: expr(Expr::ConstructorCall {
            name: "Ok".to_string(),
            args: vec![int_lit(1)],
        }),
    })]);

    let err = type_check(&program).unwrap_err();
    assert_eq!(err.kind(), "ResultErrorTypeViolation");
}

#[test]
fn multiple_errors_in_one_item_are_all_reported() {
    // val x = ghost + phantom — two unresolved symbols in a single item
    let program = Program::new(vec![val(
        "x",
        expr(Expr::Binary {
            op: BinaryOperator::Add,
            left: Box::new(expr(Expr::Identifier("ghost".to_string()))),
            right: Box::new(expr(Expr::Identifier("phantom".to_string()))),
        }),
    )]);

    let err = type_check(&program).unwrap_err();
    match *err {
        Error::MultipleErrors { ref errors } => {
            assert_eq!(errors.len(), 2);
            assert!(errors.iter().all(|e| e.kind() == "UnresolvedSymbol"));
        }
        ref other => panic!("expected MultipleErrors, got {other:?}"),
    }
}

#[test]
fn typed_program_serializes() {
    let program = Program::new(vec![val("x", int_lit(42))]);
    let typed = type_check(&program).unwrap();

    let json = serde_json::to_string(&typed).unwrap();
    let round_tripped: taylorlang::TypedProgram = serde_json::from_str(&json).unwrap();
    assert_eq!(typed, round_tripped);
}

#[test]
fn block_scopes_shadow_and_pop() {
    // val x = 1; val y = { val x = "inner"; x } — block type is String,
    // outer x stays Int
    let program = Program::new(vec![
        val("x", int_lit(1)),
        val(
            "y",
            expr(Expr::Block {
                statements: vec![val(
                    "x",
                    expr(Expr::Literal(Literal::String("inner".to_string()))),
                )],
                value: Some(Box::new(expr(Expr::Identifier("x".to_string())))),
            }),
        ),
        val(
            "z",
            expr(Expr::Binary {
                op: BinaryOperator::Add,
                left: Box::new(expr(Expr::Identifier("x".to_string()))),
                right: Box::new(int_lit(1)),
            }),
        ),
    ]);

    let typed = type_check(&program).unwrap();
    assert_eq!(variable_type(&typed, "y"), Type::string());
    assert_eq!(variable_type(&typed, "z"), Type::int());
}

#[test]
fn lambda_applied_through_binding() {
    // val f = (x) => x + 1; val r = f(41)
    let program = Program::new(vec![
        val(
            "f",
            expr(Expr::Lambda {
                params: vec!["x".to_string()],
                body: Box::new(expr(Expr::Binary {
                    op: BinaryOperator::Add,
                    left: Box::new(expr(Expr::Identifier("x".to_string()))),
                    right: Box::new(int_lit(1)),
                })),
            }),
        ),
        val(
            "r",
            expr(Expr::Call {
                function: "f".to_string(),
                args: vec![int_lit(41)],
            }),
        ),
    ]);

    let typed = type_check(&program).unwrap();
    assert_eq!(variable_type(&typed, "r"), Type::int());
}

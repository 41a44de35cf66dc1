use lode::parser::ast::{
    BinaryOp, BooleanOp, Expr, LValue, PrefixOp, Stmt, Toplevel, TypeExpr, VarsDecl,
};
use lode::parser::parse;

fn main_body(source: &str) -> Vec<Stmt> {
    let src = format!("pub fn main() I32 {{\n{}\n}}\n", source);
    let program = parse(&src).expect("parse should succeed");
    match program.into_iter().next() {
        Some(Toplevel::Function { body, .. }) => body,
        other => panic!("expected function, got {:?}", other),
    }
}

fn main_expr(source: &str) -> Expr {
    match main_body(source).into_iter().next() {
        Some(Stmt::Expr(expr)) => expr,
        other => panic!("expected expression statement, got {:?}", other),
    }
}

fn var(name: &str) -> Expr {
    Expr::LValue(LValue::Var(name.into()))
}

fn int(text: &str) -> Expr {
    Expr::IntLit(text.into())
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    assert_eq!(
        main_expr("_ = a + b * c"),
        Expr::Assign {
            target: LValue::Var("_".into()),
            value: Box::new(binary(
                BinaryOp::Add,
                var("a"),
                binary(BinaryOp::Mul, var("b"), var("c")),
            )),
        }
    );
}

#[test]
fn addition_is_left_associative() {
    assert_eq!(
        main_expr("_ = a + b + c"),
        Expr::Assign {
            target: LValue::Var("_".into()),
            value: Box::new(binary(
                BinaryOp::Add,
                binary(BinaryOp::Add, var("a"), var("b")),
                var("c"),
            )),
        }
    );
}

#[test]
fn comparison_is_left_associative() {
    assert_eq!(
        main_expr("_ = a < b < c"),
        Expr::Assign {
            target: LValue::Var("_".into()),
            value: Box::new(binary(
                BinaryOp::Lt,
                binary(BinaryOp::Lt, var("a"), var("b")),
                var("c"),
            )),
        }
    );
}

#[test]
fn assignment_is_right_associative() {
    assert_eq!(
        main_expr("a = b = c"),
        Expr::Assign {
            target: LValue::Var("a".into()),
            value: Box::new(Expr::Assign {
                target: LValue::Var("b".into()),
                value: Box::new(var("c")),
            }),
        }
    );
}

#[test]
fn boolean_or_binds_looser_than_and() {
    assert_eq!(
        main_expr("_ = a || b && c"),
        Expr::Assign {
            target: LValue::Var("_".into()),
            value: Box::new(Expr::Boolean {
                op: BooleanOp::Or,
                lhs: Box::new(var("a")),
                rhs: Box::new(Expr::Boolean {
                    op: BooleanOp::And,
                    lhs: Box::new(var("b")),
                    rhs: Box::new(var("c")),
                }),
            }),
        }
    );
}

#[test]
fn shift_binds_between_bitwise_and_additive() {
    // a | b << c + d parses as a | (b << (c + d)).
    assert_eq!(
        main_expr("_ = a | b << c + d"),
        Expr::Assign {
            target: LValue::Var("_".into()),
            value: Box::new(binary(
                BinaryOp::Or,
                var("a"),
                binary(
                    BinaryOp::Shl,
                    var("b"),
                    binary(BinaryOp::Add, var("c"), var("d")),
                ),
            )),
        }
    );
}

#[test]
fn parses_prefix_operators_and_deref() {
    assert_eq!(
        main_expr("_ = -x"),
        Expr::Assign {
            target: LValue::Var("_".into()),
            value: Box::new(Expr::Prefix {
                op: PrefixOp::Neg,
                value: Box::new(var("x")),
            }),
        }
    );
    assert_eq!(
        main_expr("_ = [p]"),
        Expr::Assign {
            target: LValue::Var("_".into()),
            value: Box::new(Expr::LValue(LValue::Deref(Box::new(var("p"))))),
        }
    );
    assert_eq!(
        main_expr("_ = &s.f"),
        Expr::Assign {
            target: LValue::Var("_".into()),
            value: Box::new(Expr::Ref(LValue::Access {
                base: Box::new(LValue::Var("s".into())),
                field: "f".into(),
            })),
        }
    );
}

#[test]
fn parses_calls_and_cast() {
    assert_eq!(
        main_expr("f(1, x)"),
        Expr::Call {
            func: Box::new(var("f")),
            args: vec![int("1"), var("x")],
        }
    );
    assert_eq!(
        main_expr("_ = cast(x, U8)"),
        Expr::Assign {
            target: LValue::Var("_".into()),
            value: Box::new(Expr::Cast {
                value: Box::new(var("x")),
                ty: TypeExpr::Named("U8".into()),
            }),
        }
    );
}

#[test]
fn mutate_and_increment_desugar() {
    assert_eq!(
        main_expr("a += 1"),
        Expr::Mutate {
            op: BinaryOp::Add,
            target: LValue::Var("a".into()),
            value: Box::new(int("1")),
        }
    );
    // x++ is x += 1.
    assert_eq!(
        main_expr("x++"),
        Expr::Mutate {
            op: BinaryOp::Add,
            target: LValue::Var("x".into()),
            value: Box::new(int("1")),
        }
    );
    assert_eq!(
        main_expr("x--"),
        Expr::Mutate {
            op: BinaryOp::Sub,
            target: LValue::Var("x".into()),
            value: Box::new(int("1")),
        }
    );
}

#[test]
fn parses_statements() {
    let body = main_body("var a, b I32\nif a { return 0 } else if b { return 1 } else { return 2 }");
    assert_eq!(
        body[0],
        Stmt::Vars(VarsDecl {
            external: false,
            names: vec!["a".into(), "b".into()],
            ty: TypeExpr::Named("I32".into()),
        })
    );
    match &body[1] {
        Stmt::If { els, .. } => match els.as_slice() {
            [Stmt::If { els, .. }] => assert_eq!(els.len(), 1),
            other => panic!("expected chained if, got {:?}", other),
        },
        other => panic!("expected if, got {:?}", other),
    }
}

#[test]
fn parses_all_for_shapes() {
    match &main_body("for { break }")[0] {
        Stmt::For {
            init: None,
            cond: None,
            step: None,
            body,
        } => assert_eq!(body[0], Stmt::Break),
        other => panic!("expected infinite for, got {:?}", other),
    }

    match &main_body("for x { continue }")[0] {
        Stmt::For {
            init: None,
            cond: Some(_),
            step: None,
            ..
        } => {}
        other => panic!("expected while-style for, got {:?}", other),
    }

    match &main_body("for a = 0; a < 10; a += 1 { }")[0] {
        Stmt::For {
            init: Some(init),
            cond: Some(_),
            step: Some(_),
            ..
        } => assert!(matches!(**init, Stmt::Expr(Expr::Assign { .. }))),
        other => panic!("expected three-clause for, got {:?}", other),
    }

    match &main_body("for ;; { }")[0] {
        Stmt::For {
            init: None,
            cond: None,
            step: None,
            ..
        } => {}
        other => panic!("expected empty-clause for, got {:?}", other),
    }
}

#[test]
fn return_value_is_optional() {
    assert_eq!(main_body("return")[0], Stmt::Return(None));
    assert_eq!(main_body("return 0")[0], Stmt::Return(Some(int("0"))));
}

#[test]
fn function_without_body_declares_a_callable() {
    let program = parse("fn puts(s [I8]) I32\n").expect("parse should succeed");
    assert_eq!(
        program[0],
        Toplevel::Vars(VarsDecl {
            external: false,
            names: vec!["puts".into()],
            ty: TypeExpr::Func {
                variadic: false,
                params: vec![TypeExpr::Pointer(Some(Box::new(TypeExpr::Named(
                    "I8".into()
                ))))],
                ret: Some(Box::new(TypeExpr::Named("I32".into()))),
            },
        })
    );
}

#[test]
fn variadic_marks_function_declarations() {
    let program = parse("variadic fn printf(fmt [I8]) I32\n").expect("parse should succeed");
    match &program[0] {
        Toplevel::Vars(VarsDecl { ty, .. }) => {
            assert!(matches!(ty, TypeExpr::Func { variadic: true, .. }));
        }
        other => panic!("expected declaration, got {:?}", other),
    }

    let err = parse("variadic fn f() {\n}\n").expect_err("definitions cannot be variadic");
    assert_eq!(err.message, "Expected function declaration");
}

#[test]
fn parses_extern_and_grouped_variable_declarations() {
    let program = parse("extern var errno I32\nvar a, b, c U64\n").expect("parse should succeed");
    assert_eq!(
        program[0],
        Toplevel::Vars(VarsDecl {
            external: true,
            names: vec!["errno".into()],
            ty: TypeExpr::Named("I32".into()),
        })
    );
    match &program[1] {
        Toplevel::Vars(decl) => assert_eq!(decl.names, vec!["a", "b", "c"]),
        other => panic!("expected declaration, got {:?}", other),
    }
}

#[test]
fn parses_type_definitions_and_aliases() {
    let program =
        parse("type Handle I64\ntype Bytes = [U8]\n").expect("parse should succeed");
    assert_eq!(
        program[0],
        Toplevel::TypeDef {
            name: "Handle".into(),
            ty: TypeExpr::Named("I64".into()),
        }
    );
    assert_eq!(
        program[1],
        Toplevel::TypeAlias {
            name: "Bytes".into(),
            ty: TypeExpr::Pointer(Some(Box::new(TypeExpr::Named("U8".into())))),
        }
    );
}

#[test]
fn parses_type_expressions() {
    let program = parse(concat!(
        "type A [I32]\n",
        "type B []\n",
        "type C [I32 8]\n",
        "type D fn(I32, [I8]) I64\n",
        "type E struct { x, y I32; z I64 }\n",
        "type F union { w I32; q [U8] }\n",
    ))
    .expect("parse should succeed");

    let ty = |i: usize| match &program[i] {
        Toplevel::TypeDef { ty, .. } => ty.clone(),
        other => panic!("expected type definition, got {:?}", other),
    };

    assert_eq!(
        ty(0),
        TypeExpr::Pointer(Some(Box::new(TypeExpr::Named("I32".into()))))
    );
    assert_eq!(ty(1), TypeExpr::Pointer(None));
    assert_eq!(
        ty(2),
        TypeExpr::Array {
            elem: Box::new(TypeExpr::Named("I32".into())),
            len: 8,
        }
    );
    // A function type is a pointer to a function.
    match ty(3) {
        TypeExpr::Pointer(Some(inner)) => match *inner {
            TypeExpr::Func { ref params, .. } => assert_eq!(params.len(), 2),
            other => panic!("expected function type, got {:?}", other),
        },
        other => panic!("expected pointer type, got {:?}", other),
    }
    match ty(4) {
        TypeExpr::Struct(fields) => {
            assert_eq!(fields.len(), 3);
            assert_eq!(fields[0].name, "x");
            assert_eq!(fields[1].name, "y");
            assert_eq!(fields[1].ty, TypeExpr::Named("I32".into()));
        }
        other => panic!("expected struct type, got {:?}", other),
    }
    assert!(matches!(ty(5), TypeExpr::Union(fields) if fields.len() == 2));
}

#[test]
fn parses_namespaces_and_namespaced_types() {
    let program = parse(concat!(
        "ns inner {\n",
        "  type Handle I64\n",
        "  var h I64\n",
        "}\n",
        "var g inner.Handle\n",
    ))
    .expect("parse should succeed");

    match &program[0] {
        Toplevel::Namespace { name, body } => {
            assert_eq!(name, "inner");
            assert_eq!(body.len(), 2);
        }
        other => panic!("expected namespace, got {:?}", other),
    }
    match &program[1] {
        Toplevel::Vars(decl) => assert_eq!(
            decl.ty,
            TypeExpr::Namespaced(vec!["inner".into(), "Handle".into()])
        ),
        other => panic!("expected declaration, got {:?}", other),
    }
}

#[test]
fn parses_grouped_parameters() {
    let program = parse("fn add(a, b I32, c I64) I64 {\nreturn 0\n}\n")
        .expect("parse should succeed");
    match &program[0] {
        Toplevel::Function { params, .. } => {
            let names: Vec<_> = params.iter().map(|p| p.name.as_str()).collect();
            assert_eq!(names, vec!["a", "b", "c"]);
            assert_eq!(params[0].ty, TypeExpr::Named("I32".into()));
            assert_eq!(params[1].ty, TypeExpr::Named("I32".into()));
            assert_eq!(params[2].ty, TypeExpr::Named("I64".into()));
        }
        other => panic!("expected function, got {:?}", other),
    }
}

#[test]
fn lists_accept_trailing_separators() {
    parse("fn f(a I32,) {\n}\n").expect("trailing comma should parse");
    parse("pub fn main() I32 {\nreturn 0;\n}\n").expect("trailing semicolon should parse");
}

#[test]
fn reports_expected_token_errors() {
    let err = parse("pub fn main() I32 {\nreturn +\n}\n").expect_err("should fail");
    assert_eq!(err.message, "Expected expression; got '}'");

    let err = parse("pub var x I32\n").expect_err("pub only applies to functions");
    assert_eq!(err.message, "Expected function");

    let err = parse("fn f( {\n}\n").expect_err("should fail");
    assert!(err.message.starts_with("Expected"));
}

#[test]
fn rejects_non_lvalue_targets() {
    let err = parse("pub fn main() I32 {\n1 = 2\n}\n").expect_err("should fail");
    assert_eq!(err.message, "Assign to non-lvalue");

    let err = parse("pub fn main() I32 {\n_ = &3\n}\n").expect_err("should fail");
    assert_eq!(err.message, "Reference of non-lvalue");
}

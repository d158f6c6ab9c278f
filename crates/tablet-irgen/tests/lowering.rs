use std::sync::Arc;

use tablet_irgen::{
    compile_module, BinOp, CodegenError, ConstValue, Expr, FnDef, IfStmt, InterpSink, IrType, JitSink, Param,
    RtValue, Stmt,
};

fn no_externals(_: &str) -> Option<(Vec<IrType>, IrType)> {
    None
}

#[test]
fn embedded_udf_test_a_b_returns_65() {
    // def test(a: i32, b: i32) -> i32: c = a + b; d = c + 1; return d
    let def = FnDef {
        name: "test".to_string(),
        params: vec![Param { name: "a".into(), ty: IrType::I32 }, Param { name: "b".into(), ty: IrType::I32 }],
        ret: IrType::I32,
        body: vec![
            Stmt::Assign {
                name: "c".into(),
                expr: Expr::Binary {
                    op: BinOp::Add,
                    lhs: Box::new(Expr::Ident("a".into())),
                    rhs: Box::new(Expr::Ident("b".into())),
                },
            },
            Stmt::Assign {
                name: "d".into(),
                expr: Expr::Binary {
                    op: BinOp::Add,
                    lhs: Box::new(Expr::Ident("c".into())),
                    rhs: Box::new(Expr::Const(ConstValue::I32(1))),
                },
            },
            Stmt::Return(Expr::Ident("d".into())),
        ],
    };

    let module = compile_module(&[def], &no_externals).unwrap();
    let mut sink = InterpSink::default();
    let func = sink.materialize(&module, "test").unwrap();
    let out = sink.call(&func, &[RtValue::I32(32), RtValue::I32(32)]);
    assert_eq!(out, RtValue::I32(65));
}

#[test]
fn if_elif_else_all_branches_return() {
    // def sign(x: i32) -> i32:
    //   if x > 0: return 1
    //   elif x < 0: return -1
    //   else: return 0
    let body = vec![Stmt::If(IfStmt {
        cond: Expr::Binary {
            op: BinOp::Gt,
            lhs: Box::new(Expr::Ident("x".into())),
            rhs: Box::new(Expr::Const(ConstValue::I32(0))),
        },
        body: vec![Stmt::Return(Expr::Const(ConstValue::I32(1)))],
        elifs: vec![(
            Expr::Binary {
                op: BinOp::Lt,
                lhs: Box::new(Expr::Ident("x".into())),
                rhs: Box::new(Expr::Const(ConstValue::I32(0))),
            },
            vec![Stmt::Return(Expr::Unary { op: tablet_irgen::UnaryOp::Neg, expr: Box::new(Expr::Const(ConstValue::I32(1))) })],
        )],
        else_body: Some(vec![Stmt::Return(Expr::Const(ConstValue::I32(0)))]),
    })];
    let def = FnDef { name: "sign".into(), params: vec![Param { name: "x".into(), ty: IrType::I32 }], ret: IrType::I32, body };

    let module = compile_module(&[def], &no_externals).unwrap();
    let mut sink = InterpSink::default();
    let func = sink.materialize(&module, "sign").unwrap();
    assert_eq!(sink.call(&func, &[RtValue::I32(5)]), RtValue::I32(1));
    assert_eq!(sink.call(&func, &[RtValue::I32(-5)]), RtValue::I32(-1));
    assert_eq!(sink.call(&func, &[RtValue::I32(0)]), RtValue::I32(0));
}

#[test]
fn windowed_aggregate_sums_a_list_via_for_in() {
    // def wsum(w: list<i32>) -> i64:
    //   total = 0
    //   for x in w: total = total + x
    //   return total
    let def = FnDef {
        name: "wsum".into(),
        params: vec![Param { name: "w".into(), ty: IrType::List(Box::new(IrType::I32)) }],
        ret: IrType::I64,
        body: vec![
            Stmt::Assign { name: "total".into(), expr: Expr::Const(ConstValue::I64(0)) },
            Stmt::ForIn {
                var: "x".into(),
                iterable: Expr::Ident("w".into()),
                body: vec![Stmt::Assign {
                    name: "total".into(),
                    expr: Expr::Binary {
                        op: BinOp::Add,
                        lhs: Box::new(Expr::Ident("total".into())),
                        rhs: Box::new(Expr::Ident("x".into())),
                    },
                }],
            },
            Stmt::Return(Expr::Ident("total".into())),
        ],
    };

    let module = compile_module(&[def], &no_externals).unwrap();
    let mut sink = InterpSink::default();
    let func = sink.materialize(&module, "wsum").unwrap();
    let window = RtValue::List(Arc::new(vec![RtValue::I32(1), RtValue::I32(2), RtValue::I32(3)]));
    assert_eq!(sink.call(&func, &[window]), RtValue::I64(6));
}

#[test]
fn calling_an_external_symbol_round_trips_its_result() {
    // def double(a: i32) -> i32: return twice(a)
    let def = FnDef {
        name: "double".into(),
        params: vec![Param { name: "a".into(), ty: IrType::I32 }],
        ret: IrType::I32,
        body: vec![Stmt::Return(Expr::Call { name: "twice".into(), args: vec![Expr::Ident("a".into())] })],
    };
    let externals = |name: &str| -> Option<(Vec<IrType>, IrType)> {
        (name == "twice").then(|| (vec![IrType::I32], IrType::I32))
    };
    let module = compile_module(&[def], &externals).unwrap();
    let mut sink = InterpSink::default();
    sink.register_external(
        "twice",
        (vec![IrType::I32], IrType::I32),
        Arc::new(|args| match args[0] {
            RtValue::I32(v) => RtValue::I32(v * 2),
            _ => unreachable!(),
        }),
    );
    let func = sink.materialize(&module, "double").unwrap();
    assert_eq!(sink.call(&func, &[RtValue::I32(21)]), RtValue::I32(42));
}

#[test]
fn implicit_unsafe_cast_is_rejected() {
    // def bad(a: i64) -> f64: return a + 1.0  -- i64/f64 has no safe path.
    let def = FnDef {
        name: "bad".into(),
        params: vec![Param { name: "a".into(), ty: IrType::I64 }],
        ret: IrType::F64,
        body: vec![Stmt::Return(Expr::Binary {
            op: BinOp::Add,
            lhs: Box::new(Expr::Ident("a".into())),
            rhs: Box::new(Expr::Const(ConstValue::F64(1.0))),
        })],
    };
    let err = compile_module(&[def], &no_externals).unwrap_err();
    assert!(matches!(err, CodegenError::TypeMismatch { .. }));
}

#[test]
fn explicit_cast_permits_the_same_conversion() {
    // def widen(a: i64) -> f64: return cast(a as f64) + 1.0
    let def = FnDef {
        name: "widen".into(),
        params: vec![Param { name: "a".into(), ty: IrType::I64 }],
        ret: IrType::F64,
        body: vec![Stmt::Return(Expr::Binary {
            op: BinOp::Add,
            lhs: Box::new(Expr::Cast { expr: Box::new(Expr::Ident("a".into())), to: IrType::F64, explicit: true }),
            rhs: Box::new(Expr::Const(ConstValue::F64(1.0))),
        })],
    };
    let module = compile_module(&[def], &no_externals).unwrap();
    let mut sink = InterpSink::default();
    let func = sink.materialize(&module, "widen").unwrap();
    assert_eq!(sink.call(&func, &[RtValue::I64(41)]), RtValue::F64(42.0));
}

#[test]
fn missing_return_path_is_a_codegen_error() {
    let def = FnDef {
        name: "half_baked".into(),
        params: vec![Param { name: "x".into(), ty: IrType::Bool }],
        ret: IrType::I32,
        body: vec![Stmt::If(IfStmt {
            cond: Expr::Ident("x".into()),
            body: vec![Stmt::Return(Expr::Const(ConstValue::I32(1)))],
            elifs: vec![],
            else_body: None,
        })],
    };
    let err = compile_module(&[def], &no_externals).unwrap_err();
    assert!(matches!(err, CodegenError::MalformedAst(_)));
}

#[test]
fn unknown_identifier_is_reported() {
    let def = FnDef {
        name: "oops".into(),
        params: vec![],
        ret: IrType::I32,
        body: vec![Stmt::Return(Expr::Ident("nope".into()))],
    };
    let err = compile_module(&[def], &no_externals).unwrap_err();
    assert_eq!(err, CodegenError::UnknownName("nope".into()));
}

use std::{hint::black_box, sync::Arc};

use criterion::{criterion_group, criterion_main, Criterion};
use inkwell::context::Context;
use yttria::{
    ast::{BinaryOp, Expr, LogicOp, Program, Stmt},
    compiler::{self, CompileOptions},
    resolve,
    token::{Marker, Token, TokenKind},
    types::{FloatWidth, IntWidth},
};

fn mark(kind: TokenKind, image: &str, line: u32) -> Marker {
    Arc::new(Token::new(kind, image, Arc::from("bench.yt"), line, 1))
}

/// A program rendering `statements` mixed-type expressions.
fn program(statements: u32) -> Program {
    let body = (1..=statements)
        .map(|line| {
            let op = |symbol| mark(TokenKind::Operator, symbol, line);
            let digit = |image| mark(TokenKind::Digit, image, line);
            let masked = Expr::logic(
                LogicOp::BitAnd,
                Expr::int(101, IntWidth::W32, digit("101")),
                Expr::int(i128::from(line), IntWidth::W16, digit("1")),
                op("&"),
            );
            let scaled = Expr::binary(
                BinaryOp::Mul,
                masked,
                Expr::float(1.5, FloatWidth::W64, digit("1.5")),
                op("*"),
            );
            let text = Expr::string("value ", mark(TokenKind::String, "value ", line));
            let expr = Expr::binary(BinaryOp::Add, text, scaled, op("+"));
            Stmt::render(expr, mark(TokenKind::Keyword, "render", line))
        })
        .collect();
    Program {
        body: vec![Stmt::main(body, mark(TokenKind::Keyword, "main", 0))],
    }
}

fn criterion_benchmark(c: &mut Criterion) {
    let program = program(256);
    let options = CompileOptions::default();

    c.bench_function("resolve", |b| {
        b.iter(|| resolve::resolve_program(black_box(&program)))
    });
    c.bench_function("compile", |b| {
        b.iter(|| {
            let context = Context::create();
            compiler::compile(&context, black_box(&program), &options).map(|a| a.ir())
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);

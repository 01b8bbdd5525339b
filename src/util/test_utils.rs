//! Test-only reader of a prefix notation for trees, so that tests can build
//! programs with real markers without a full parser.
//!
//! Statements read as `main { .. }`, `render e;`, `return [e];`,
//! `defer stmt`, `{ .. }` and `unsafe { .. }`. Expressions are written in
//! prefix form: `+ 1 2`, `&& true false`, `neg 1`, `abs 1`, `~ 1`, `! true`,
//! and `( e )` for grouping. A bare integer is an `i32` and a bare float is
//! an `f64`; `i8 - 3` or `f32 1.5` give a typed literal.

use std::{iter::Peekable, sync::Arc, vec};

use inkwell::context::Context;

use crate::{
    ast::{BinaryOp, EqualityOp, Expr, LogicOp, Program, Stmt, UnaryOp},
    codegen::{generate, CodegenOptions, Target},
    diagnostic::Diagnostics,
    ir::{self, string_symbol},
    lexer::{self, extract},
    resolve::resolve_program,
    token::{Marker, Token, TokenKind},
    types::{DataType, FloatWidth, IntWidth},
    util::fmt::tree,
};

pub const TEST_FILENAME: &str = "test.yt";

#[track_caller]
pub fn read_program(src: &str) -> Program {
    let mut reader = Reader::new(src);
    let mut body = Vec::new();
    while reader.tokens.peek().is_some() {
        body.push(reader.stmt());
    }
    Program { body }
}

#[track_caller]
pub fn read_expr(src: &str) -> Expr {
    let mut reader = Reader::new(src);
    let expr = reader.expr();
    if let Some(extra) = reader.tokens.next() {
        panic!("trailing token after expression: {extra}");
    }
    expr
}

pub fn messages(diagnostics: &Diagnostics) -> Vec<String> {
    diagnostics.iter().map(ToString::to_string).collect()
}

/// Reads and resolves the program, returning its printed tree and the
/// formatted diagnostics.
#[track_caller]
pub fn run_pipeline(src: &str) -> (String, Vec<String>) {
    let program = read_program(src);
    let diagnostics = resolve_program(&program);
    (tree::print_program_string(&program), messages(&diagnostics))
}

#[track_caller]
pub fn run_assertion(
    formatted_actual_tree: &str,
    formatted_actual_diagnostics: &[String],
    expected_tree: &str,
    expected_diagnostics: &[&str],
) {
    ::pretty_assertions::assert_eq!(formatted_actual_tree.trim(), expected_tree.trim());
    ::pretty_assertions::assert_eq!(formatted_actual_diagnostics, expected_diagnostics);
}

/// Lowers the program for `target`, verifies it and returns the printed
/// module.
#[track_caller]
pub fn lower_to_ir(src: &str, target: Target) -> String {
    let context = Context::create();
    let options = CodegenOptions {
        target,
        ..CodegenOptions::default()
    };
    let module = generate(&context, "test", &read_program(src), &options).expect("lowering failed");
    ir::verify(&module).expect("invalid module");
    module.print_to_string().to_string()
}

/// Argument lists of every call to `callee`, in emission order.
pub fn call_args<'a>(ir: &'a str, callee: &str) -> Vec<&'a str> {
    let pattern = format!("@{callee}(");
    ir.lines()
        .filter(|line| line.contains("call "))
        .filter_map(|line| {
            let start = line.find(&pattern)? + pattern.len();
            line[start..].strip_suffix(')')
        })
        .collect()
}

/// Callees of every call, in emission order.
pub fn callees(ir: &str) -> Vec<&str> {
    ir.lines()
        .filter_map(|line| {
            let call = line.find("call ")?;
            let rest = &line[call..];
            let start = rest.find('@')? + 1;
            let end = rest[start..].find('(')? + start;
            Some(&rest[start..end])
        })
        .collect()
}

/// The value passed to each hosted `render`, as printed by LLVM.
#[track_caller]
pub fn rendered(src: &str) -> Vec<String> {
    let ir = lower_to_ir(src, Target::Hosted);
    call_args(&ir, "printf")
        .into_iter()
        .map(|args| match args.split_once(", ") {
            Some((_, value)) => value.to_string(),
            None => panic!("render without a value: {args}"),
        })
        .collect()
}

/// How a pointer to the string constant holding `content` is printed.
pub fn string_arg(content: &str) -> String {
    format!("ptr @{}", string_symbol(content))
}

macro_rules! tree_tests {
    (
        $(
            fn $test_name:ident() {
                let program = $source:literal;
                let tree = $tree:literal;
                let diagnostics = $diagnostics:expr;
            }
        )*
    ) => {
        $(
            #[test]
            fn $test_name() {
                let (formatted_actual_tree, formatted_actual_diagnostics) =
                    crate::util::test_utils::run_pipeline(::indoc::indoc! { $source });
                crate::util::test_utils::run_assertion(
                    &formatted_actual_tree,
                    &formatted_actual_diagnostics,
                    ::indoc::indoc! { $tree },
                    $diagnostics,
                );
            }
        )*
    };
}
pub(crate) use tree_tests;

struct Reader {
    tokens: Peekable<vec::IntoIter<Token>>,
}

impl Reader {
    #[track_caller]
    fn new(src: &str) -> Reader {
        let scanned = lexer::scan(TEST_FILENAME, src);
        assert!(scanned.errors.is_empty(), "{:?}", scanned.errors);
        Reader {
            tokens: scanned.tokens.into_iter().peekable(),
        }
    }

    #[track_caller]
    fn next(&mut self) -> Marker {
        Arc::new(self.tokens.next().expect("unexpected end of input"))
    }

    fn peek_is(&mut self, image: &str) -> bool {
        self.tokens.peek().is_some_and(|t| t.image == image)
    }

    #[track_caller]
    fn expect(&mut self, image: &str) -> Marker {
        let token = self.next();
        assert_eq!(token.image, image, "unexpected token {token}");
        token
    }

    #[track_caller]
    fn stmt(&mut self) -> Stmt {
        let mark = self.next();
        match mark.image.as_str() {
            "main" => Stmt::main(self.body(), mark),
            "render" => {
                let expr = self.expr();
                self.expect(";");
                Stmt::render(expr, mark)
            }
            "return" => {
                let value = (!self.peek_is(";")).then(|| self.expr());
                self.expect(";");
                Stmt::ret(value, mark)
            }
            "defer" => Stmt::defer(self.stmt(), mark),
            "unsafe" => Stmt::unsafe_block(self.body(), mark),
            "{" => Stmt::block(self.rest_of_body(), mark),
            other => panic!("unexpected statement start {other:?} at {}", mark.position()),
        }
    }

    #[track_caller]
    fn body(&mut self) -> Vec<Stmt> {
        self.expect("{");
        self.rest_of_body()
    }

    #[track_caller]
    fn rest_of_body(&mut self) -> Vec<Stmt> {
        let mut body = Vec::new();
        while !self.peek_is("}") {
            body.push(self.stmt());
        }
        self.expect("}");
        body
    }

    #[track_caller]
    fn expr(&mut self) -> Expr {
        let mark = self.next();
        let image = mark.image.as_str();
        match mark.kind {
            TokenKind::Digit => bare_literal(mark),
            TokenKind::String => Expr::string(mark.image.as_str(), Marker::clone(&mark)),
            TokenKind::Keyword if image == "true" || image == "false" => {
                Expr::bool(image == "true", Marker::clone(&mark))
            }
            TokenKind::Keyword => {
                let ty = DataType::from_keyword(image)
                    .unwrap_or_else(|| panic!("unexpected keyword {image:?}"));
                self.typed_literal(ty)
            }
            TokenKind::Identifier => {
                let op = match image {
                    "neg" => UnaryOp::Neg,
                    "abs" => UnaryOp::Abs,
                    other => panic!("unexpected identifier {other:?}"),
                };
                Expr::unary(op, self.expr(), mark)
            }
            TokenKind::Operator if image == "(" => {
                let inner = self.expr();
                self.expect(")");
                inner
            }
            TokenKind::Operator => {
                if let Some(op) = UnaryOp::from_symbol(image).filter(|op| {
                    matches!(op, UnaryOp::BitNot | UnaryOp::Not)
                }) {
                    return Expr::unary(op, self.expr(), mark);
                }
                let (lhs, rhs) = (self.expr(), self.expr());
                if let Some(op) = BinaryOp::from_symbol(image) {
                    Expr::binary(op, lhs, rhs, mark)
                } else if let Some(op) = LogicOp::from_symbol(image) {
                    Expr::logic(op, lhs, rhs, mark)
                } else if let Some(op) = EqualityOp::from_symbol(image) {
                    Expr::equality(op, lhs, rhs, mark)
                } else {
                    panic!("unexpected operator {image:?}")
                }
            }
        }
    }

    #[track_caller]
    fn typed_literal(&mut self, ty: DataType) -> Expr {
        let negative = self.peek_is("-");
        if negative {
            self.next();
        }
        let mark = self.next();
        assert_eq!(mark.kind, TokenKind::Digit, "expected digit after {ty}");
        let sign: i32 = if negative { -1 } else { 1 };
        if ty.is_float() {
            let value = extract::float(&mark).expect("float literal") * f64::from(sign);
            let width = FloatWidth::from_bits(ty.bits()).expect("float width");
            return Expr::float(value, width, mark);
        }
        let value = extract::int(&mark).expect("integer literal") * i128::from(sign);
        let width = IntWidth::from_bits(ty.bits()).expect("integer width");
        if ty.is_uint() {
            Expr::uint(value, width, mark)
        } else {
            Expr::int(value, width, mark)
        }
    }
}

fn bare_literal(mark: Marker) -> Expr {
    if extract::is_float(&mark) {
        let value = extract::float(&mark).expect("float literal");
        Expr::float(value, FloatWidth::W64, mark)
    } else {
        let value = extract::int(&mark).expect("integer literal");
        Expr::int(value, IntWidth::W32, mark)
    }
}

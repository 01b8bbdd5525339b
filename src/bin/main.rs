use std::{
    error::Error,
    io::{self, Write},
};

use inkwell::context::Context;
use tracing_subscriber::EnvFilter;
use yttria::{
    ast::{BinaryOp, Expr, LogicOp, Program, Stmt},
    compiler::{self, CompileOptions},
    lexer::extract,
    token::TokenKind,
    types::IntWidth,
    util::fmt::tree,
};

fn main() {
    init_logging();
    let demo = std::env::args().skip(1).any(|arg| arg == "--demo");
    let result = if demo { run_demo() } else { run() };
    if let Err(error) = result {
        println!("failed to run: {error}");
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("YTTRIA_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run() -> Result<(), Box<dyn Error>> {
    let mut input = String::new();
    loop {
        print!("> ");
        io::stdout().flush()?;

        input.clear();
        let n = io::stdin().read_line(&mut input)?;

        if n == 0 {
            println!("^D");
            return Ok(());
        }

        let scanned = compiler::tokenize("<stdin>", &input);
        for token in &scanned.tokens {
            println!("{:?} {token}", token.kind);
        }
        for error in &scanned.errors {
            println!("error: {error}");
        }
    }
}

/// Compiles `render "The output is " + (101 & 99)` and prints the tree and
/// the emitted module.
fn run_demo() -> Result<(), Box<dyn Error>> {
    let scanned = compiler::tokenize(
        "demo.yt",
        r#"main { render "The output is " + ( 101 & 99 ); }"#,
    );
    let mut tokens = scanned.tokens.into_iter().map(std::sync::Arc::new);
    let mut next = || tokens.next().ok_or("demo source ended early");

    let main = next()?;
    let _open = next()?;
    let render = next()?;
    let text = next()?;
    let plus = next()?;
    let _paren = next()?;
    let lhs = next()?;
    let and = next()?;
    let rhs = next()?;

    let int = |mark: yttria::token::Marker| -> Result<Expr, Box<dyn Error>> {
        debug_assert_eq!(mark.kind, TokenKind::Digit);
        Ok(Expr::int(extract::int(&mark)?, IntWidth::W32, mark))
    };
    let masked = Expr::logic(
        LogicOp::from_symbol(&and.image).ok_or("expected an and-or operator")?,
        int(lhs)?,
        int(rhs)?,
        and,
    );
    let message = Expr::string(text.image.as_str(), std::sync::Arc::clone(&text));
    let concat = Expr::binary(
        BinaryOp::from_symbol(&plus.image).ok_or("expected a binary operator")?,
        message,
        masked,
        plus,
    );
    let program = Program {
        body: vec![Stmt::main(vec![Stmt::render(concat, render)], main)],
    };

    print!("{}", tree::ProgramTree(&program));
    let options = CompileOptions {
        module_name: "demo".to_string(),
        ..CompileOptions::default()
    };
    let context = Context::create();
    let artifact = compiler::compile(&context, &program, &options)?;
    for diagnostic in &artifact.diagnostics {
        println!("{diagnostic:#}");
    }
    print!("{}", artifact.ir());
    Ok(())
}

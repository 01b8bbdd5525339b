use std::fmt::{self, Formatter};

use crate::ast::*;

const INDENT_WIDTH: usize = 2;

/// Displays a program as an indented tree. Each node shows its marker
/// position; expressions also show their static type.
pub struct ProgramTree<'a>(pub &'a Program);

pub struct ExprTree<'a>(pub &'a Expr);

impl fmt::Display for ProgramTree<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for stmt in &self.0.body {
            print_stmt(f, 0, stmt)?;
        }
        Ok(())
    }
}

impl fmt::Display for ExprTree<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        print_expr(f, 0, self.0)
    }
}

pub fn print_program_string(program: &Program) -> String {
    ProgramTree(program).to_string()
}

pub fn print_expr_string(expr: &Expr) -> String {
    ExprTree(expr).to_string()
}

fn print_stmt(f: &mut Formatter<'_>, i: usize, stmt: &Stmt) -> fmt::Result {
    sp(f, i)?;
    let at = At(stmt);
    match &stmt.kind {
        StmtKind::Main { body } => {
            writeln!(f, "main ({at})")?;
            print_body(f, i + 1, body)?;
        }
        StmtKind::Render { expr } => {
            writeln!(f, "render ({at})")?;
            print_expr(f, i + 1, expr)?;
        }
        StmtKind::Return { value } => {
            writeln!(f, "return ({at})")?;
            if let Some(value) = value {
                print_expr(f, i + 1, value)?;
            }
        }
        StmtKind::Defer { stmt } => {
            writeln!(f, "defer ({at})")?;
            print_stmt(f, i + 1, stmt)?;
        }
        StmtKind::Block { body } => {
            writeln!(f, "block ({at})")?;
            print_body(f, i + 1, body)?;
        }
        StmtKind::Unsafe { body } => {
            writeln!(f, "unsafe ({at})")?;
            print_body(f, i + 1, body)?;
        }
    }
    Ok(())
}

fn print_body(f: &mut Formatter<'_>, i: usize, body: &[Stmt]) -> fmt::Result {
    for stmt in body {
        print_stmt(f, i, stmt)?;
    }
    Ok(())
}

pub fn print_expr(f: &mut Formatter<'_>, i: usize, expr: &Expr) -> fmt::Result {
    sp(f, i)?;
    let line = expr.mark.line;
    let column = expr.mark.column;
    let ty = expr.static_type();
    let info = format_args!("{line}:{column}: {ty}");
    match &expr.kind {
        ExprKind::Bool(val) => writeln!(f, "bool {val} ({info})")?,
        ExprKind::Int { value, .. } | ExprKind::UInt { value, .. } => {
            writeln!(f, "int {value} ({info})")?;
        }
        ExprKind::Float { value, .. } => writeln!(f, "float {value} ({info})")?,
        ExprKind::String(val) => writeln!(f, "string {val:?} ({info})")?,
        ExprKind::Unary { op, expr: inner } => {
            writeln!(f, "unary {op} ({info})")?;
            print_expr(f, i + 1, inner)?;
        }
        ExprKind::Binary { op, lhs, rhs } => {
            writeln!(f, "binary {op} ({info})")?;
            print_expr(f, i + 1, lhs)?;
            print_expr(f, i + 1, rhs)?;
        }
        ExprKind::Logic { op, lhs, rhs } => {
            writeln!(f, "logic {op} ({info})")?;
            print_expr(f, i + 1, lhs)?;
            print_expr(f, i + 1, rhs)?;
        }
        ExprKind::Equality { op, lhs, rhs } => {
            writeln!(f, "equality {op} ({info})")?;
            print_expr(f, i + 1, lhs)?;
            print_expr(f, i + 1, rhs)?;
        }
    }
    Ok(())
}

struct At<'a>(&'a Stmt);

impl fmt::Display for At<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.0.mark.line, self.0.mark.column)
    }
}

fn sp(f: &mut Formatter<'_>, i: usize) -> fmt::Result {
    write!(f, "{:width$}", "", width = i * INDENT_WIDTH)
}

#[cfg(test)]
mod tests {
    use crate::util::test_utils::tree_tests;

    tree_tests! {
        fn end_to_end_sample() {
            let program = r#"main { render + "The output is " ( & 101 99 ); }"#;
            let tree = "
                main (1:1)
                  render (1:8)
                    binary + (1:15: string)
                      string \"The output is \" (1:17: string)
                      logic & (1:36: i32)
                        int 101 (1:38: i32)
                        int 99 (1:42: i32)
            ";
            let diagnostics = &[];
        }

        fn typed_literals_and_widening() {
            let program = "main { render * i8 3 f32 1.5; return i64 - 2; }";
            let tree = "
                main (1:1)
                  render (1:8)
                    binary * (1:15: f32)
                      int 3 (1:20: i8)
                      float 1.5 (1:26: f32)
                  return (1:31)
                    int -2 (1:44: i64)
            ";
            let diagnostics = &[
                "[line 1, column 15] warning: loose operation with '*' on type i8 and f32",
                "[line 1, column 31] error: invalid return type i64 for type i32",
            ];
        }

        fn statements() {
            let program = "
                main {
                  unsafe { render neg true; }
                  defer { render ! == 1 1; }
                }
            ";
            let tree = "
                main (1:1)
                  unsafe (2:3)
                    render (2:12)
                      unary - (2:19: i4)
                        bool true (2:23: bool)
                  defer (3:3)
                    block (3:9)
                      render (3:11)
                        unary ! (3:18: bool)
                          equality == (3:20: bool)
                            int 1 (3:23: i32)
                            int 1 (3:25: i32)
            ";
            let diagnostics = &[];
        }
    }
}

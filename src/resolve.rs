use std::fmt;

use thiserror::Error;

use crate::{
    ast::{self, BinaryOp, EqualityOp, Expr, ExprKind, LogicOp, Program, Stmt, StmtKind, UnaryOp},
    diagnostic::Diagnostics,
    token::Marker,
    types::DataType,
};

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("overflow value for {ty} type: {value}")]
    Overflow { ty: DataType, value: i128 },
    #[error("underflow value for {ty} type: {value}")]
    Underflow { ty: DataType, value: i128 },
    #[error("operator '{op}' cannot be used with type of {lhs} and type of {rhs}")]
    InvalidOperands {
        op: &'static str,
        lhs: DataType,
        rhs: DataType,
    },
    #[error("{0}-hand of binary operation is not of integer type")]
    NotInteger(Side),
    #[error("{0}-hand expression is not of bool type")]
    NotBool(Side),
    #[error("type {lhs} cannot be compared to type of {rhs}")]
    NotComparable { lhs: DataType, rhs: DataType },
    #[error("comparing string to {0} is not allowed")]
    StringComparison(DataType),
    #[error("comparing bool to {0} is not allowed")]
    BoolComparison(DataType),
    #[error("incompatible unary '~' operator for floating-point type")]
    FloatBitNot,
    #[error("unary operator '{op}' cannot be used with type of {ty}")]
    InvalidUnary { op: &'static str, ty: DataType },
    #[error("unary operator '{0}' cannot be used on non-number expressions")]
    NonNumberUnary(&'static str),
    #[error("unary '!' operator can be only used on boolean expressions")]
    NotOnNonBool,
    #[error("invalid no return value, must return {0}")]
    MissingReturnValue(DataType),
    #[error("invalid return type {actual} for type {expected}")]
    ReturnTypeMismatch {
        actual: DataType,
        expected: DataType,
    },
    #[error("unreachable code")]
    Unreachable,
    #[error("duplicate main entry point")]
    DuplicateEntry,
    #[error("{0} statement outside of main")]
    OutsideEntry(&'static str),
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ResolveWarning {
    #[error("loose integer binary '{op}' operation with {lhs} and {rhs}")]
    LooseInteger {
        op: &'static str,
        lhs: DataType,
        rhs: DataType,
    },
    #[error("loose floating-point binary '{op}' operation with {lhs} and {rhs}")]
    LooseFloat {
        op: &'static str,
        lhs: DataType,
        rhs: DataType,
    },
    #[error("loose operation with '{op}' on type {lhs} and {rhs}")]
    LooseMixed {
        op: &'static str,
        lhs: DataType,
        rhs: DataType,
    },
    #[error("lossy conversion from {from} to {to}")]
    LossyConversion { from: DataType, to: DataType },
    #[error("defer with return as inner statement")]
    DeferWithReturn,
    #[error("defer inside a defer statement would not take any effect")]
    NestedDefer,
    #[error("already inside an unsafe block")]
    AlreadyUnsafe,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Side::Left => "left",
            Side::Right => "right",
        })
    }
}

/// What the resolve pass knows about the enclosing scope of a node.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ResolveContext {
    /// Declared return type of the enclosing function.
    pub return_type: DataType,
    /// Whether the node is nested in an `unsafe` block.
    pub unsafe_mode: bool,
    /// Whether the node is inside the body of the entry point.
    pub in_entry: bool,
}

impl ResolveContext {
    pub const TOP_LEVEL: ResolveContext = ResolveContext {
        return_type: DataType::Void,
        unsafe_mode: false,
        in_entry: false,
    };

    /// Context of the body of the program entry point.
    pub const ENTRY: ResolveContext = ResolveContext {
        return_type: DataType::I32,
        unsafe_mode: false,
        in_entry: true,
    };

    #[must_use]
    pub fn with_unsafe(self) -> ResolveContext {
        ResolveContext {
            unsafe_mode: true,
            ..self
        }
    }
}

/// Walks the whole program once, collecting every error and warning.
///
/// Never touches the emitted program; diagnostics are returned in the order
/// they were found.
#[tracing::instrument(level = "debug", skip_all, fields(stmts = program.body.len()))]
pub fn resolve_program(program: &Program) -> Diagnostics {
    let mut resolver = Resolver::default();
    resolver.block(&program.body, ResolveContext::TOP_LEVEL);
    let diagnostics = resolver.diagnostics;
    tracing::debug!(
        errors = diagnostics.errors().count(),
        warnings = diagnostics.warnings().count(),
        "resolve finished"
    );
    diagnostics
}

pub fn resolve_stmt(stmt: &Stmt, ctx: ResolveContext) -> Diagnostics {
    let mut resolver = Resolver::default();
    resolver.stmt(stmt, ctx);
    resolver.diagnostics
}

pub fn resolve_expr(expr: &Expr, ctx: ResolveContext) -> Diagnostics {
    let mut resolver = Resolver::default();
    resolver.expr(expr, ctx);
    resolver.diagnostics
}

#[derive(Default)]
struct Resolver {
    diagnostics: Diagnostics,
    entry_seen: bool,
}

impl Resolver {
    fn stmt(&mut self, stmt: &Stmt, ctx: ResolveContext) {
        match &stmt.kind {
            StmtKind::Main { body } => {
                if self.entry_seen {
                    self.diagnostics
                        .error(&stmt.mark, ResolveError::DuplicateEntry);
                }
                self.entry_seen = true;
                let entry = ResolveContext {
                    unsafe_mode: ctx.unsafe_mode,
                    ..ResolveContext::ENTRY
                };
                self.block(body, entry);
            }
            StmtKind::Render { expr } => {
                if !ctx.in_entry {
                    self.diagnostics
                        .error(&stmt.mark, ResolveError::OutsideEntry("render"));
                }
                self.expr(expr, ctx);
            }
            StmtKind::Return { value } => {
                if ctx.in_entry {
                    self.return_stmt(stmt, value.as_ref(), ctx);
                } else {
                    self.diagnostics
                        .error(&stmt.mark, ResolveError::OutsideEntry("return"));
                    if let Some(value) = value {
                        self.expr(value, ctx);
                    }
                }
            }
            StmtKind::Defer { stmt: inner } => {
                if !ctx.unsafe_mode {
                    if inner.is_return() {
                        self.diagnostics
                            .warning(&stmt.mark, ResolveWarning::DeferWithReturn);
                    } else if inner.is_defer() {
                        self.diagnostics
                            .warning(&stmt.mark, ResolveWarning::NestedDefer);
                    }
                }
                self.stmt(inner, ctx);
            }
            StmtKind::Block { body } => self.block(body, ctx),
            StmtKind::Unsafe { body } => {
                if ctx.unsafe_mode {
                    self.diagnostics
                        .warning(&stmt.mark, ResolveWarning::AlreadyUnsafe);
                }
                self.block(body, ctx.with_unsafe());
            }
        }
    }

    fn return_stmt(&mut self, stmt: &Stmt, value: Option<&Expr>, ctx: ResolveContext) {
        let expected = ctx.return_type;
        match value {
            None if expected != DataType::Void => {
                self.diagnostics
                    .error(&stmt.mark, ResolveError::MissingReturnValue(expected));
            }
            None => {}
            Some(value) => {
                let actual = value.static_type();
                if actual != DataType::Unknown && actual != expected {
                    self.diagnostics.error(
                        &stmt.mark,
                        ResolveError::ReturnTypeMismatch { actual, expected },
                    );
                }
                self.expr(value, ctx);
            }
        }
    }

    /// Resolves the statements in order, then the deferred ones in reverse
    /// order. A statement following a `return` is unreachable; the error is
    /// reported on the `return`.
    fn block(&mut self, body: &[Stmt], ctx: ResolveContext) {
        let mut prev_return: Option<&Marker> = None;
        let mut deferrals = Vec::new();

        for stmt in body {
            if stmt.is_defer() {
                deferrals.push(stmt);
                continue;
            }
            self.stmt(stmt, ctx);
            if let Some(mark) = prev_return.take() {
                self.diagnostics.error(mark, ResolveError::Unreachable);
            }
            if stmt.is_return() {
                prev_return = Some(&stmt.mark);
            }
        }

        for stmt in deferrals.into_iter().rev() {
            if let Some(mark) = prev_return.take() {
                self.diagnostics.error(mark, ResolveError::Unreachable);
            }
            if let StmtKind::Defer { stmt: inner } = &stmt.kind {
                if inner.is_return() {
                    prev_return = Some(&inner.mark);
                }
            }
            self.stmt(stmt, ctx);
        }
    }

    fn expr(&mut self, expr: &Expr, ctx: ResolveContext) {
        match &expr.kind {
            ExprKind::Bool(_) | ExprKind::Float { .. } | ExprKind::String(_) => {}
            ExprKind::Int { value, width } => {
                if !ctx.unsafe_mode {
                    let (min, max) = width.signed_range();
                    self.check_range(expr, *value, min, max);
                }
            }
            ExprKind::UInt { value, width } => {
                if !ctx.unsafe_mode {
                    self.check_range(expr, *value, 0, width.unsigned_max());
                }
            }
            ExprKind::Unary { op, expr: operand } => {
                self.unary(expr, *op, operand.static_type(), ctx);
                self.expr(operand, ctx);
            }
            ExprKind::Binary { op, lhs, rhs } => {
                self.binary(expr, *op, lhs.static_type(), rhs.static_type(), ctx);
                self.expr(lhs, ctx);
                self.expr(rhs, ctx);
            }
            ExprKind::Logic { op, lhs, rhs } => {
                self.logic(*op, lhs, rhs, ctx);
                self.expr(lhs, ctx);
                self.expr(rhs, ctx);
            }
            ExprKind::Equality { op, lhs, rhs } => {
                self.equality(expr, *op, lhs.static_type(), rhs.static_type(), ctx);
                self.expr(lhs, ctx);
                self.expr(rhs, ctx);
            }
        }
    }

    fn check_range(&mut self, expr: &Expr, value: i128, min: i128, max: i128) {
        let ty = expr.static_type();
        if value < min {
            self.diagnostics
                .error(&expr.mark, ResolveError::Underflow { ty, value });
        } else if value > max {
            self.diagnostics
                .error(&expr.mark, ResolveError::Overflow { ty, value });
        }
    }

    fn binary(
        &mut self,
        expr: &Expr,
        op: BinaryOp,
        lhs: DataType,
        rhs: DataType,
        ctx: ResolveContext,
    ) {
        // Ill-typed operands were already reported.
        if lhs == DataType::Unknown || rhs == DataType::Unknown {
            return;
        }
        let op_symbol = op.symbol();
        if ast::binary_type(op, lhs, rhs) == DataType::Unknown {
            let error = ResolveError::InvalidOperands {
                op: op_symbol,
                lhs,
                rhs,
            };
            self.diagnostics.error(&expr.mark, error);
            return;
        }
        if ctx.unsafe_mode || op.is_shift() {
            return;
        }
        let warning = if lhs.is_integral() && rhs.is_integral() && lhs != rhs {
            ResolveWarning::LooseInteger {
                op: op_symbol,
                lhs,
                rhs,
            }
        } else if lhs.is_float() && rhs.is_float() && lhs != rhs {
            ResolveWarning::LooseFloat {
                op: op_symbol,
                lhs,
                rhs,
            }
        } else if (lhs.is_integral() && rhs.is_float()) || (lhs.is_float() && rhs.is_integral()) {
            ResolveWarning::LooseMixed {
                op: op_symbol,
                lhs,
                rhs,
            }
        } else {
            return;
        };
        self.diagnostics.warning(&expr.mark, warning);
    }

    fn logic(&mut self, op: LogicOp, lhs: &Expr, rhs: &Expr, ctx: ResolveContext) {
        let (l, r) = (lhs.static_type(), rhs.static_type());
        if op.is_bitwise() {
            if l != DataType::Unknown && !l.is_int() {
                self.diagnostics
                    .error(&lhs.mark, ResolveError::NotInteger(Side::Left));
            }
            if r != DataType::Unknown && !r.is_int() {
                self.diagnostics
                    .error(&rhs.mark, ResolveError::NotInteger(Side::Right));
            }
            return;
        }
        // Unsafe code may pair a boolean condition with a raw integer.
        if ctx.unsafe_mode && l.is_integral() != r.is_integral() {
            return;
        }
        if l != DataType::Unknown && l != DataType::Bool {
            self.diagnostics
                .error(&lhs.mark, ResolveError::NotBool(Side::Left));
        }
        if r != DataType::Unknown && r != DataType::Bool {
            self.diagnostics
                .error(&rhs.mark, ResolveError::NotBool(Side::Right));
        }
    }

    fn equality(
        &mut self,
        expr: &Expr,
        _op: EqualityOp,
        lhs: DataType,
        rhs: DataType,
        ctx: ResolveContext,
    ) {
        use DataType::{Bool, String, Unknown};

        if lhs == Unknown || rhs == Unknown {
            return;
        }
        let error = match (lhs, rhs) {
            (l, r) if l.is_integral() && r.is_float() => {
                if !ctx.unsafe_mode {
                    let warning = ResolveWarning::LossyConversion { from: l, to: r };
                    self.diagnostics.warning(&expr.mark, warning);
                }
                return;
            }
            (l, r) if l.is_float() && r.is_integral() => {
                if !ctx.unsafe_mode {
                    let warning = ResolveWarning::LossyConversion { from: r, to: l };
                    self.diagnostics.warning(&expr.mark, warning);
                }
                return;
            }
            (l, r) if l.is_numeric() && l.family() == r.family() => return,
            (String, String) | (Bool, Bool) => return,
            (String, r) => ResolveError::StringComparison(r),
            (Bool, r) => ResolveError::BoolComparison(r),
            (l, r) => ResolveError::NotComparable { lhs: l, rhs: r },
        };
        self.diagnostics.error(&expr.mark, error);
    }

    fn unary(&mut self, expr: &Expr, op: UnaryOp, ty: DataType, ctx: ResolveContext) {
        if ty == DataType::Unknown {
            return;
        }
        let error = match op {
            UnaryOp::BitNot if ty.is_float() => ResolveError::FloatBitNot,
            UnaryOp::BitNot if !ty.is_integral() && ty != DataType::Bool => {
                ResolveError::InvalidUnary {
                    op: op.symbol(),
                    ty,
                }
            }
            // Negating a bool yields an `i4`, which only unsafe code may
            // rely on.
            UnaryOp::Neg if ty == DataType::Bool && ctx.unsafe_mode => return,
            UnaryOp::Neg | UnaryOp::Abs if !ty.is_numeric() => {
                ResolveError::NonNumberUnary(op.symbol())
            }
            UnaryOp::Not if ty != DataType::Bool && !(ctx.unsafe_mode && ty.is_integral()) => {
                ResolveError::NotOnNonBool
            }
            _ => return,
        };
        self.diagnostics.error(&expr.mark, error);
    }
}

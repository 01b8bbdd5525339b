// program ::= stmt*
// stmt ::= main '{' stmt* '}'
//        | render expr
//        | return [expr]
//        | defer stmt
//        | '{' stmt* '}'
//        | unsafe '{' stmt* '}'
// expr ::= expr ('+' | '-' | '*' | '/' | '%' | '<<' | '>>' | '>>>') expr
//        | expr ('&' | '|' | '&&' | '||') expr
//        | expr ('==' | '!=') expr
//        | ('-' | '+' | '~' | '!') expr
//        | true | false
//        | integer | float | string
//
// Trees are built by an external parser. Every node keeps the token it
// reports diagnostics against.

use std::fmt;

use crate::{
    token::Marker,
    types::{self, DataType, FloatWidth, IntWidth},
};

#[derive(Debug, PartialEq, Default)]
pub struct Program {
    pub body: Vec<Stmt>,
}

#[derive(Debug, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub mark: Marker,
}

#[derive(Debug, PartialEq)]
pub enum ExprKind {
    Bool(bool),
    /// Signed integer literal. The value is kept unconstrained so that the
    /// resolve pass can report overflows.
    Int {
        value: i128,
        width: IntWidth,
    },
    UInt {
        value: i128,
        width: IntWidth,
    },
    Float {
        value: f64,
        width: FloatWidth,
    },
    String(Box<str>),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    /// Arithmetic and shifts.
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Bitwise and logical and-or.
    Logic {
        op: LogicOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Equality {
        op: EqualityOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

impl Expr {
    pub fn new(kind: ExprKind, mark: Marker) -> Expr {
        Expr { kind, mark }
    }

    pub fn bool(value: bool, mark: Marker) -> Expr {
        Expr::new(ExprKind::Bool(value), mark)
    }

    pub fn int(value: i128, width: IntWidth, mark: Marker) -> Expr {
        Expr::new(ExprKind::Int { value, width }, mark)
    }

    pub fn uint(value: i128, width: IntWidth, mark: Marker) -> Expr {
        Expr::new(ExprKind::UInt { value, width }, mark)
    }

    pub fn float(value: f64, width: FloatWidth, mark: Marker) -> Expr {
        Expr::new(ExprKind::Float { value, width }, mark)
    }

    pub fn string(value: impl Into<Box<str>>, mark: Marker) -> Expr {
        Expr::new(ExprKind::String(value.into()), mark)
    }

    pub fn unary(op: UnaryOp, expr: Expr, mark: Marker) -> Expr {
        let expr = Box::new(expr);
        Expr::new(ExprKind::Unary { op, expr }, mark)
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr, mark: Marker) -> Expr {
        let (lhs, rhs) = (Box::new(lhs), Box::new(rhs));
        Expr::new(ExprKind::Binary { op, lhs, rhs }, mark)
    }

    pub fn logic(op: LogicOp, lhs: Expr, rhs: Expr, mark: Marker) -> Expr {
        let (lhs, rhs) = (Box::new(lhs), Box::new(rhs));
        Expr::new(ExprKind::Logic { op, lhs, rhs }, mark)
    }

    pub fn equality(op: EqualityOp, lhs: Expr, rhs: Expr, mark: Marker) -> Expr {
        let (lhs, rhs) = (Box::new(lhs), Box::new(rhs));
        Expr::new(ExprKind::Equality { op, lhs, rhs }, mark)
    }

    /// The type of the value this expression evaluates to.
    ///
    /// Derived from the operand types alone; ill-typed combinations yield
    /// [`DataType::Unknown`], which the resolve pass reports.
    pub fn static_type(&self) -> DataType {
        match &self.kind {
            ExprKind::Bool(_) => DataType::Bool,
            ExprKind::Int { width, .. } => DataType::int(*width),
            ExprKind::UInt { width, .. } => DataType::uint(*width),
            ExprKind::Float { width, .. } => DataType::float(*width),
            ExprKind::String(_) => DataType::String,
            ExprKind::Unary { op, expr } => unary_type(*op, expr.static_type()),
            ExprKind::Binary { op, lhs, rhs } => {
                binary_type(*op, lhs.static_type(), rhs.static_type())
            }
            ExprKind::Logic { op, lhs, rhs } => {
                logic_type(*op, lhs.static_type(), rhs.static_type())
            }
            ExprKind::Equality { .. } => DataType::Bool,
        }
    }
}

/// Result type of an arithmetic or shift operation.
pub fn binary_type(op: BinaryOp, l: DataType, r: DataType) -> DataType {
    use DataType::{String, Unknown};

    if op.is_shift() {
        return if l.is_numeric() && l.family() == r.family() && !l.is_float() {
            types::greater_integral_type(l, r)
        } else {
            Unknown
        };
    }
    match (l, r) {
        (l, r) if l.is_integral() && l.family() == r.family() => {
            types::greater_integral_type(l, r)
        }
        (l, r) if l.is_float() && r.is_float() => types::greater_float_type(l, r),
        (l, r) if l.is_integral() && r.is_float() => r,
        (l, r) if l.is_float() && r.is_integral() => l,
        (String, String) if op == BinaryOp::Add => String,
        (String, other) | (other, String) if op == BinaryOp::Add && other.is_numeric() => String,
        _ => Unknown,
    }
}

/// Result type of an and-or operation.
pub fn logic_type(op: LogicOp, l: DataType, r: DataType) -> DataType {
    if op.is_bitwise() {
        if l.is_int() && r.is_int() {
            types::greater_integer_type(l, r)
        } else {
            DataType::Unknown
        }
    } else {
        DataType::Bool
    }
}

/// Result type of a unary operation.
pub fn unary_type(op: UnaryOp, operand: DataType) -> DataType {
    match (op, operand) {
        (UnaryOp::Neg, DataType::Bool) => DataType::I4,
        (UnaryOp::Neg | UnaryOp::Abs, ty) if ty.is_numeric() => ty,
        (UnaryOp::BitNot, ty) if ty.is_integral() || ty == DataType::Bool => ty,
        (UnaryOp::Not, ty) if ty == DataType::Bool || ty.is_integral() => ty,
        _ => DataType::Unknown,
    }
}

#[derive(Debug, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub mark: Marker,
}

#[derive(Debug, PartialEq)]
pub enum StmtKind {
    /// The program entry point.
    Main { body: Vec<Stmt> },
    Render { expr: Expr },
    Return { value: Option<Expr> },
    Defer { stmt: Box<Stmt> },
    Block { body: Vec<Stmt> },
    Unsafe { body: Vec<Stmt> },
}

impl Stmt {
    pub fn new(kind: StmtKind, mark: Marker) -> Stmt {
        Stmt { kind, mark }
    }

    pub fn main(body: Vec<Stmt>, mark: Marker) -> Stmt {
        Stmt::new(StmtKind::Main { body }, mark)
    }

    pub fn render(expr: Expr, mark: Marker) -> Stmt {
        Stmt::new(StmtKind::Render { expr }, mark)
    }

    pub fn ret(value: Option<Expr>, mark: Marker) -> Stmt {
        Stmt::new(StmtKind::Return { value }, mark)
    }

    pub fn defer(stmt: Stmt, mark: Marker) -> Stmt {
        let stmt = Box::new(stmt);
        Stmt::new(StmtKind::Defer { stmt }, mark)
    }

    pub fn block(body: Vec<Stmt>, mark: Marker) -> Stmt {
        Stmt::new(StmtKind::Block { body }, mark)
    }

    pub fn unsafe_block(body: Vec<Stmt>, mark: Marker) -> Stmt {
        Stmt::new(StmtKind::Unsafe { body }, mark)
    }

    pub fn is_defer(&self) -> bool {
        matches!(self.kind, StmtKind::Defer { .. })
    }

    pub fn is_return(&self) -> bool {
        matches!(self.kind, StmtKind::Return { .. })
    }
}

macro_rules! operators {
    (
        $(
            $(#[$meta:meta])*
            pub enum $name:ident {
                $($variant:ident => $symbol:literal,)*
            }
        )*
    ) => {
        $(
            $(#[$meta])*
            #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
            pub enum $name {
                $($variant,)*
            }

            impl $name {
                pub const ALL: &[$name] = &[$($name::$variant,)*];

                pub fn from_symbol(symbol: &str) -> Option<$name> {
                    match symbol {
                        $($symbol => Some($name::$variant),)*
                        _ => None,
                    }
                }

                pub const fn symbol(self) -> &'static str {
                    match self {
                        $($name::$variant => $symbol,)*
                    }
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.symbol())
                }
            }
        )*
    };
}

operators! {
    pub enum BinaryOp {
        Add => "+",
        Sub => "-",
        Mul => "*",
        Div => "/",
        Rem => "%",
        Shl => "<<",
        Shr => ">>",
        LShr => ">>>",
    }

    pub enum LogicOp {
        BitAnd => "&",
        BitOr => "|",
        And => "&&",
        Or => "||",
    }

    pub enum EqualityOp {
        Eq => "==",
        Ne => "!=",
    }

    /// Prefix operators. `+` denotes the absolute value, not the identity.
    pub enum UnaryOp {
        Neg => "-",
        Abs => "+",
        BitNot => "~",
        Not => "!",
    }
}

impl BinaryOp {
    pub fn is_shift(self) -> bool {
        matches!(self, BinaryOp::Shl | BinaryOp::Shr | BinaryOp::LShr)
    }
}

impl LogicOp {
    pub fn is_bitwise(self) -> bool {
        matches!(self, LogicOp::BitAnd | LogicOp::BitOr)
    }
}

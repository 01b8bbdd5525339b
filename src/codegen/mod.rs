use thiserror::Error;

use crate::{ir::IrError, types::DataType};

pub mod interface;
pub mod profile;
pub mod runtime;

mod expr;
mod generator;

pub use interface::{generate, CodegenOptions, Target};

/// A fault of the emit pass. Every variant means the resolve pass accepted a
/// program it should have rejected, or that the tree was lowered without
/// being resolved at all.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum InternalError {
    #[error("invalid binary operation '{op}' for types {lhs} and {rhs}")]
    InvalidBinary {
        op: &'static str,
        lhs: DataType,
        rhs: DataType,
    },
    #[error("invalid logical operation '{op}' for types {lhs} and {rhs}")]
    InvalidLogic {
        op: &'static str,
        lhs: DataType,
        rhs: DataType,
    },
    #[error("invalid equality operation '{op}' for types {lhs} and {rhs}")]
    InvalidEquality {
        op: &'static str,
        lhs: DataType,
        rhs: DataType,
    },
    #[error("invalid unary operation '{op}' for type {ty}")]
    InvalidUnary { op: &'static str, ty: DataType },
    #[error("operation on a value of unknown type")]
    UnknownType,
    #[error("`{0}` statement emitted outside of an entry point")]
    NoInsertionPoint(&'static str),
    #[error(transparent)]
    Ir(#[from] IrError),
}

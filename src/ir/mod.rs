//! Id-based instruction building on top of LLVM, through `inkwell`.
//!
//! The lowering engine never touches `inkwell` values directly: it works with
//! `Copy` ids handed out by [`IrBuilder`], which keeps the `'ctx` values in
//! its arena.

use std::{
    fmt,
    hash::{Hash, Hasher},
};

use inkwell::{builder::BuilderError, module::Module};
use rustc_hash::FxHasher;
use thiserror::Error;

mod arena;
mod builder;

pub use arena::{BlockId, FunctionId, ValueId};
pub use builder::IrBuilder;
pub use inkwell::{FloatPredicate, IntPredicate};

/// Shape of a lowered value, independent of any LLVM context.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    Void,
    Int(u32),
    F32,
    F64,
    Ptr,
}

impl Type {
    pub const I1: Type = Type::Int(1);
    pub const I32: Type = Type::Int(32);
    pub const I64: Type = Type::Int(64);

    pub fn is_int(self) -> bool {
        matches!(self, Type::Int(_))
    }

    pub fn is_float(self) -> bool {
        matches!(self, Type::F32 | Type::F64)
    }

    /// Bit width of integer and floating-point types, zero otherwise.
    pub fn bits(self) -> u32 {
        match self {
            Type::Int(bits) => bits,
            Type::F32 => 32,
            Type::F64 => 64,
            Type::Void | Type::Ptr => 0,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => f.write_str("void"),
            Type::Int(bits) => write!(f, "i{bits}"),
            Type::F32 => f.write_str("float"),
            Type::F64 => f.write_str("double"),
            Type::Ptr => f.write_str("ptr"),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    SDiv,
    UDiv,
    SRem,
    URem,
    Shl,
    AShr,
    LShr,
    And,
    Or,
    Xor,
    FAdd,
    FSub,
    FMul,
    FDiv,
    FRem,
}

impl BinOp {
    pub fn is_float(self) -> bool {
        matches!(
            self,
            BinOp::FAdd | BinOp::FSub | BinOp::FMul | BinOp::FDiv | BinOp::FRem
        )
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            BinOp::Add => "add",
            BinOp::Sub => "sub",
            BinOp::Mul => "mul",
            BinOp::SDiv => "sdiv",
            BinOp::UDiv => "udiv",
            BinOp::SRem => "srem",
            BinOp::URem => "urem",
            BinOp::Shl => "shl",
            BinOp::AShr => "ashr",
            BinOp::LShr => "lshr",
            BinOp::And => "and",
            BinOp::Or => "or",
            BinOp::Xor => "xor",
            BinOp::FAdd => "fadd",
            BinOp::FSub => "fsub",
            BinOp::FMul => "fmul",
            BinOp::FDiv => "fdiv",
            BinOp::FRem => "frem",
        }
    }
}

/// A failed instruction request.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum IrError {
    #[error("instruction builder failed: {0}")]
    Builder(String),
    #[error("`{op}` expects {expected} operands")]
    Operand {
        op: &'static str,
        expected: &'static str,
    },
}

impl From<BuilderError> for IrError {
    fn from(error: BuilderError) -> Self {
        IrError::Builder(error.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct VerifyError(pub String);

/// Runs the LLVM verifier over a finished module.
pub fn verify(module: &Module<'_>) -> Result<(), VerifyError> {
    module
        .verify()
        .map_err(|message| VerifyError(message.to_string()))
}

/// Content-addressed symbol name of a string constant.
pub fn string_symbol(content: &str) -> String {
    let mut hasher = FxHasher::default();
    content.hash(&mut hasher);
    format!("__str_{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use inkwell::context::Context;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn string_symbols_are_content_addressed() {
        let symbol = string_symbol("The output is ");
        assert_eq!(symbol, string_symbol("The output is "));
        assert_ne!(symbol, string_symbol("The output is"));
        assert!(symbol.starts_with("__str_"));
        assert_eq!(symbol.len(), "__str_".len() + 16);
    }

    #[test]
    fn types_print_as_llvm_types() {
        let printed: Vec<String> = [Type::Void, Type::Int(4), Type::F32, Type::F64, Type::Ptr]
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(printed, ["void", "i4", "float", "double", "ptr"]);
        assert_eq!(Type::I64.bits(), 64);
        assert_eq!(Type::Ptr.bits(), 0);
    }

    #[test]
    fn verifier_reports_missing_terminators() {
        let context = Context::create();
        let module = context.create_module("test");
        assert_eq!(verify(&module), Ok(()));

        let main = module.add_function("main", context.i32_type().fn_type(&[], false), None);
        context.append_basic_block(main, "entry");
        let error = verify(&module).unwrap_err();
        assert!(error.0.contains("does not have terminator"), "{error}");
    }
}

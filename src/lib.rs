//! Compiler core of the Yttria language: the tokenizer, the static type
//! lattice, the typed tree, the resolve pass and the lowering engine that
//! emits an SSA module in LLVM assembly syntax.

/// The lexer takes the source input, mapping it into a sequence of tokens and
/// a list of lexical errors.
pub mod lexer;

/// The resolve pass walks a tree once, collecting semantic errors and
/// warnings without emitting any code.
pub mod resolve;

/// The lowering engine maps a resolved tree into an IR module for a target
/// profile.
pub mod codegen;

/// Pipeline driver tying the passes together.
pub mod compiler;

pub mod ast;
pub mod diagnostic;
pub mod ir;
pub mod token;
pub mod types;

pub mod util {
    pub mod fmt;
    #[cfg(test)]
    pub(crate) mod test_utils;
}

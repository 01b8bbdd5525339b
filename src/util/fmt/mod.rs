/// Indented tree rendering of programs, annotated with static types.
pub mod tree;

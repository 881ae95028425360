//! Semantic analysis module.
//!
//! Resolves names against block scopes, checks function declarations and
//! calls, verifies that non-void functions return on every path, and lowers
//! the AST into the three-address IR in the same pass.

pub mod control_flow;
pub mod lowering;
pub mod symbol_table;

#[cfg(test)]
mod tests_lowering;

pub use lowering::{Lowerer, lower};
pub use symbol_table::{FunctionSignature, SymbolTable, VarInfo};

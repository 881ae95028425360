//! A small C compiler implemented in Rust, emitting x86-64 assembly.

/// Contains the AST produced by the parser.
pub mod ast;
/// Contains the code generation components.
pub mod codegen;
/// Contains diagnostics and the error types of every stage.
pub mod diagnostic;
/// Contains the compiler driver.
pub mod driver;
pub mod ir;
pub mod lexer;
pub mod parser;
/// Contains scope resolution, validation and lowering to IR.
pub mod semantic;
pub mod source_manager;

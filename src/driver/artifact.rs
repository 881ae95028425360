use std::path::PathBuf;

use crate::ast::Program;
use crate::ir::IrProgram;
use crate::lexer::Token;

/// How far the pipeline runs. Ordered from the earliest stage to the last.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum CompilePhase {
    Lex,
    Parse,
    Lower,
    Codegen,
    Assembly,
    #[default]
    Link,
}

/// outputs of the single compilation unit, filled up to the requested phase
#[derive(Default)]
pub struct CompileArtifact {
    pub tokens: Option<Vec<Token>>,
    pub ast: Option<Program>,
    pub ir: Option<IrProgram>,
    pub assembly: Option<String>,
    pub assembly_file: Option<PathBuf>,
    pub executable: Option<PathBuf>,
}

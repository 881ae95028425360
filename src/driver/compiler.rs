//! Core compilation pipeline orchestration module
//!
//! This module contains the main compiler driver that orchestrates
//! the compilation pipeline: external preprocessing, lexing, parsing,
//! lowering, code generation, and the external assembler and linker.

use log::{debug, info};
use std::fs;
use std::io;
use std::path::Path;

use crate::ast::Program;
use crate::codegen;
use crate::diagnostic::{DiagnosticEngine, ErrorFormatter};
use crate::ir::IrProgram;
use crate::lexer::{Token, tokenize};
use crate::parser::parse;
use crate::semantic::lower;
use crate::source_manager::{SourceId, SourceManager};

use super::artifact::{CompileArtifact, CompilePhase};
use super::cli::{CompileConfig, PathOrBuffer};
use super::output::{OutputPaths, ScopedFile};
use super::toolchain::{GccToolchain, Toolchain, ToolchainError};

/// Main compiler driver
pub struct CompilerDriver {
    config: CompileConfig,
    diagnostics: DiagnosticEngine,
    pub(crate) source_manager: SourceManager,
    toolchain: Box<dyn Toolchain>,
}

impl CompilerDriver {
    /// Create a new compiler driver from configuration, using `$CC` or gcc
    pub fn from_config(config: CompileConfig) -> Self {
        Self::with_toolchain(config, Box::new(GccToolchain::from_env()))
    }

    pub fn with_toolchain(config: CompileConfig, toolchain: Box<dyn Toolchain>) -> Self {
        CompilerDriver {
            config,
            diagnostics: DiagnosticEngine::new(),
            source_manager: SourceManager::new(),
            toolchain,
        }
    }

    /// Run the pipeline up to and including `stop_after`.
    ///
    /// Files created along the way are owned by scoped guards: intermediates
    /// are removed when this returns, and so is anything a failing step left.
    pub fn run_pipeline(&mut self, stop_after: CompilePhase) -> Result<CompileArtifact, PipelineError> {
        let mut out = CompileArtifact::default();
        let input = self.config.input.clone();
        let paths = OutputPaths::for_input(input.path()).map_err(PipelineError::IoError)?;

        // the .i guard lives until the end of the run
        let (source_id, _preprocessed) = match input {
            PathOrBuffer::Path(path) => {
                let preprocessed = self.run_preprocessor(&path, &paths.preprocessed)?;
                let id = self
                    .source_manager
                    .add_file_from_path(preprocessed.path())
                    .map_err(PipelineError::IoError)?;
                (id, Some(preprocessed))
            }
            PathOrBuffer::Buffer(path, text) => (self.source_manager.add_buffer(text, path), None),
        };

        // Lexing phase
        let tokens = self.run_lexer(source_id)?;
        if stop_after == CompilePhase::Lex {
            out.tokens = Some(tokens);
            return Ok(out);
        }

        // parsing phase
        let program = self.run_parser(&tokens)?;
        if stop_after == CompilePhase::Parse {
            out.ast = Some(program);
            return Ok(out);
        }

        // validation & IR generation phase
        let ir = self.run_lowering(&program)?;
        if stop_after == CompilePhase::Lower {
            out.ir = Some(ir);
            return Ok(out);
        }

        let assembly = self.run_codegen(&ir)?;
        if stop_after == CompilePhase::Codegen {
            out.assembly = Some(assembly);
            return Ok(out);
        }

        let assembly_file = ScopedFile::new(&paths.assembly);
        fs::write(assembly_file.path(), &assembly).map_err(PipelineError::IoError)?;
        debug!("wrote {}", assembly_file.path().display());
        if stop_after == CompilePhase::Assembly {
            out.assembly_file = Some(assembly_file.keep());
            out.assembly = Some(assembly);
            return Ok(out);
        }

        let object_file = ScopedFile::new(&paths.object);
        self.toolchain
            .assemble(assembly_file.path(), object_file.path())
            .map_err(PipelineError::Toolchain)?;

        let executable = ScopedFile::new(&paths.executable);
        self.toolchain
            .link(object_file.path(), executable.path())
            .map_err(PipelineError::Toolchain)?;

        out.assembly = Some(assembly);
        out.executable = Some(executable.keep());
        Ok(out)
    }

    fn run_preprocessor(&mut self, input: &Path, output: &Path) -> Result<ScopedFile, PipelineError> {
        let preprocessed = ScopedFile::new(output);
        self.toolchain
            .preprocess(input, preprocessed.path())
            .map_err(PipelineError::Toolchain)?;
        Ok(preprocessed)
    }

    fn run_lexer(&mut self, source_id: SourceId) -> Result<Vec<Token>, PipelineError> {
        let Some(text) = self.source_manager.get_text(source_id) else {
            return Err(PipelineError::IoError(io::Error::new(
                io::ErrorKind::NotFound,
                "translation unit is not loaded",
            )));
        };

        match tokenize(source_id, text) {
            Ok(tokens) => {
                debug!("lexer: {} token(s)", tokens.len());
                Ok(tokens)
            }
            Err(e) => {
                self.diagnostics.report(e);
                Err(PipelineError::Fatal)
            }
        }
    }

    fn run_parser(&mut self, tokens: &[Token]) -> Result<Program, PipelineError> {
        match parse(tokens) {
            Ok(program) => {
                debug!("parser: {} function(s)", program.functions.len());
                Ok(program)
            }
            Err(e) => {
                self.diagnostics.report(e);
                Err(PipelineError::Fatal)
            }
        }
    }

    fn run_lowering(&mut self, program: &Program) -> Result<IrProgram, PipelineError> {
        match lower(program) {
            Ok(ir) => Ok(ir),
            Err(e) => {
                self.diagnostics.report_semantic_error(e);
                Err(PipelineError::Fatal)
            }
        }
    }

    fn run_codegen(&mut self, ir: &IrProgram) -> Result<String, PipelineError> {
        match codegen::generate(ir, self.config.target) {
            Ok(asm) => Ok(codegen::emit(&asm)),
            Err(e) => {
                self.diagnostics.report(e);
                Err(PipelineError::Fatal)
            }
        }
    }

    /// Run the configured pipeline and print diagnostics if any error occurs
    pub fn run(&mut self) -> Result<(), DriverError> {
        match self.run_pipeline(self.config.stop_after) {
            Ok(artifact) => {
                self.print_diagnostics();
                if let Some(executable) = artifact.executable {
                    info!("wrote {}", executable.display());
                } else if let Some(assembly_file) = artifact.assembly_file {
                    info!("wrote {}", assembly_file.display());
                }
                Ok(())
            }
            Err(PipelineError::Fatal) => {
                self.print_diagnostics();
                Err(DriverError::CompilationFailed)
            }
            Err(PipelineError::IoError(e)) => Err(DriverError::Io(e.to_string())),
            Err(PipelineError::Toolchain(e)) => Err(e.into()),
        }
    }

    /// Get diagnostics for testing
    #[cfg(test)]
    pub(crate) fn get_diagnostics(&self) -> Vec<crate::diagnostic::Diagnostic> {
        self.diagnostics.diagnostics().to_vec()
    }

    /// Print accumulated diagnostics without returning an error
    pub fn print_diagnostics(&self) {
        let formatter = ErrorFormatter::default();
        formatter.print_diagnostics(self.diagnostics.diagnostics(), &self.source_manager);
    }
}

/// Error types for the compiler driver
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum DriverError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Compilation failed due to errors")]
    CompilationFailed,

    #[error("{tool} failed with exit code {code}")]
    ExternalTool { tool: String, code: i32 },
}

impl DriverError {
    /// Process exit status for this failure
    pub fn exit_code(&self) -> i32 {
        match self {
            DriverError::Io(_) | DriverError::CompilationFailed => 2,
            DriverError::ExternalTool { code, .. } => *code,
        }
    }
}

impl From<ToolchainError> for DriverError {
    fn from(error: ToolchainError) -> Self {
        match error {
            ToolchainError::Spawn { .. } => DriverError::Io(error.to_string()),
            ToolchainError::Failed { tool, code } => DriverError::ExternalTool {
                tool: tool.to_string(),
                code,
            },
        }
    }
}

/// Error that will stop the compilation pipeline
#[derive(Debug)]
pub enum PipelineError {
    /// reported into the diagnostics engine already
    Fatal,
    IoError(io::Error),
    Toolchain(ToolchainError),
}

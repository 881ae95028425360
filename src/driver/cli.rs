//! CLI parsing and configuration module
//!
//! This module handles command-line argument parsing using clap and
//! provides configuration structures for the compiler driver.

use clap::Parser as CliParser;
use clap::error::{ContextKind, ContextValue, ErrorKind};
use std::ffi::OsString;
use std::path::PathBuf;

use crate::codegen::Target;

use super::artifact::CompilePhase;

const DEFAULT_PROGRAM_NAME: &str = "pandi-cc";

/// CLI interface using clap
#[derive(CliParser, Debug)]
#[clap(
    name = "pandi-cc",
    about = "A small C compiler emitting x86-64 assembly",
    disable_help_flag = true,
    disable_version_flag = true,
    args_override_self = true
)]
pub struct Cli {
    /// Stop after lexing
    #[clap(long)]
    pub lex: bool,

    /// Stop after parsing
    #[clap(long)]
    pub parse: bool,

    /// Stop after code generation, without writing assembly
    #[clap(long)]
    pub codegen: bool,

    /// Write the assembly file and stop before assembling
    #[clap(short = 'S')]
    pub assembly: bool,

    /// Input C source file
    #[clap(value_parser)]
    pub input_files: Vec<PathBuf>,
}

/// Command line misuse; reported with a usage line and exit status 1
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum CliError {
    #[error("ERROR: Unrecognised cli flag '{flag}'\nUsage: {program} [--lex|--parse|--codegen|-S] <input.c>")]
    UnrecognisedFlag { program: String, flag: String },

    #[error("ERROR: No input file provided.\nUsage: {program} [--lex|--parse|--codegen|-S] <input.c>")]
    NoInputFile { program: String },

    #[error(
        "ERROR: Too many input file provided: {count}, when only 1 is supported.\nUsage: {program} [--lex|--parse|--codegen|-S] <input.c>"
    )]
    TooManyInputFiles { program: String, count: usize },

    #[error("ERROR: {message}\nUsage: {program} [--lex|--parse|--codegen|-S] <input.c>")]
    Invalid { program: String, message: String },
}

impl CliError {
    fn from_clap(error: clap::Error, program: &str) -> Self {
        let program = program.to_string();
        match error.kind() {
            ErrorKind::UnknownArgument => {
                let flag = match error.get(ContextKind::InvalidArg) {
                    Some(ContextValue::String(flag)) => flag.clone(),
                    _ => String::new(),
                };
                CliError::UnrecognisedFlag { program, flag }
            }
            kind => CliError::Invalid {
                program,
                message: kind.as_str().unwrap_or("invalid arguments").to_string(),
            },
        }
    }
}

/// Where the translation unit comes from
#[derive(Debug, Clone, PartialEq)]
pub enum PathOrBuffer {
    Path(PathBuf),
    /// display path and already preprocessed text
    Buffer(PathBuf, String),
}

impl PathOrBuffer {
    pub fn path(&self) -> &PathBuf {
        match self {
            PathOrBuffer::Path(path) | PathOrBuffer::Buffer(path, _) => path,
        }
    }
}

/// Configuration for compilation
#[derive(Debug, Clone)]
pub struct CompileConfig {
    pub input: PathOrBuffer,
    pub stop_after: CompilePhase,
    pub target: Target,
}

impl CompileConfig {
    /// Create a new CompileConfig from a string of source code
    pub fn from_virtual_file(source: impl Into<String>, stop_after: CompilePhase) -> Self {
        CompileConfig {
            input: PathOrBuffer::Buffer(PathBuf::from("test_input.c"), source.into()),
            stop_after,
            target: Target::default(),
        }
    }
}

impl Cli {
    /// Parse raw arguments (program name first) into a validated configuration
    pub fn parse_config<I, T>(args: I) -> Result<CompileConfig, CliError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
        let program = args
            .first()
            .map(|arg| arg.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_PROGRAM_NAME.to_string());

        let cli = Cli::try_parse_from(args).map_err(|e| CliError::from_clap(e, &program))?;
        cli.into_config(&program)
    }

    /// The earliest requested stop wins
    pub fn stop_after(&self) -> CompilePhase {
        if self.lex {
            CompilePhase::Lex
        } else if self.parse {
            CompilePhase::Parse
        } else if self.codegen {
            CompilePhase::Codegen
        } else if self.assembly {
            CompilePhase::Assembly
        } else {
            CompilePhase::Link
        }
    }

    /// Convert CLI arguments into compilation configuration
    pub fn into_config(self, program: &str) -> Result<CompileConfig, CliError> {
        let stop_after = self.stop_after();
        let count = self.input_files.len();
        let mut input_files = self.input_files.into_iter();
        match (input_files.next(), count) {
            (None, _) => Err(CliError::NoInputFile {
                program: program.to_string(),
            }),
            (Some(input), 1) => Ok(CompileConfig {
                input: PathOrBuffer::Path(input),
                stop_after,
                target: Target::default(),
            }),
            (Some(_), count) => Err(CliError::TooManyInputFiles {
                program: program.to_string(),
                count,
            }),
        }
    }
}

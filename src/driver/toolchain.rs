//! External preprocessor, assembler and linker

use itertools::Itertools;
use log::info;
use std::ffi::OsStr;
use std::io;
use std::path::Path;
use std::process::Command;

const DEFAULT_PROGRAM: &str = "gcc";

/// Error from an external tool invocation
#[derive(Debug, thiserror::Error)]
pub enum ToolchainError {
    #[error("failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{tool} exited with status {code}")]
    Failed { tool: &'static str, code: i32 },
}

/// The steps the driver delegates to an external C toolchain
pub trait Toolchain {
    fn preprocess(&mut self, input: &Path, output: &Path) -> Result<(), ToolchainError>;
    fn assemble(&mut self, input: &Path, output: &Path) -> Result<(), ToolchainError>;
    fn link(&mut self, object: &Path, output: &Path) -> Result<(), ToolchainError>;
}

/// Runs a gcc-compatible driver program
#[derive(Debug, Clone)]
pub struct GccToolchain {
    program: String,
}

impl GccToolchain {
    pub fn new(program: impl Into<String>) -> Self {
        GccToolchain { program: program.into() }
    }

    /// `$CC` when set and non-empty, `gcc` otherwise
    pub fn from_env() -> Self {
        let program = std::env::var("CC")
            .ok()
            .filter(|cc| !cc.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PROGRAM.to_string());
        GccToolchain::new(program)
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn run(&self, tool: &'static str, args: &[&OsStr]) -> Result<(), ToolchainError> {
        info!(
            "running {}: {} {}",
            tool,
            self.program,
            args.iter().map(|arg| arg.to_string_lossy()).join(" ")
        );
        let status = Command::new(&self.program)
            .args(args)
            .status()
            .map_err(|source| ToolchainError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            // killed by a signal
            let code = status.code().unwrap_or(1);
            Err(ToolchainError::Failed { tool, code })
        }
    }
}

impl Default for GccToolchain {
    fn default() -> Self {
        GccToolchain::from_env()
    }
}

impl Toolchain for GccToolchain {
    fn preprocess(&mut self, input: &Path, output: &Path) -> Result<(), ToolchainError> {
        self.run(
            "preprocessor",
            &[OsStr::new("-E"), OsStr::new("-P"), input.as_os_str(), OsStr::new("-o"), output.as_os_str()],
        )
    }

    fn assemble(&mut self, input: &Path, output: &Path) -> Result<(), ToolchainError> {
        self.run(
            "assembler",
            &[OsStr::new("-c"), input.as_os_str(), OsStr::new("-o"), output.as_os_str()],
        )
    }

    fn link(&mut self, object: &Path, output: &Path) -> Result<(), ToolchainError> {
        self.run("linker", &[object.as_os_str(), OsStr::new("-o"), output.as_os_str()])
    }
}

//! Compiler driver module
//!
//! Turns command line arguments into a [`CompileConfig`], runs the pipeline
//! up to the requested phase and delegates preprocessing, assembling and
//! linking to an external [`Toolchain`].

pub mod artifact;
pub mod cli;
pub mod compiler;
pub mod output;
pub mod toolchain;


pub use artifact::{CompileArtifact, CompilePhase};
pub use cli::{Cli, CliError, CompileConfig, PathOrBuffer};
pub use compiler::{CompilerDriver, DriverError, PipelineError};
pub use toolchain::{GccToolchain, Toolchain, ToolchainError};

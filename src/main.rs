use pandi_cc::driver::{Cli, CompilerDriver, DriverError};
use std::process::ExitCode;

/// Exit status for command line misuse
const USAGE_EXIT_CODE: u8 = 1;

/// The main entry point for the application.
///
/// Parses command-line arguments and runs the compiler.
fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let config = match Cli::parse_config(std::env::args_os()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(USAGE_EXIT_CODE);
        }
    };

    let mut driver = CompilerDriver::from_config(config);
    match driver.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // diagnostics were printed by the driver already
            if !matches!(e, DriverError::CompilationFailed) {
                eprintln!("error: {}", e);
            }
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
        }
    }
}

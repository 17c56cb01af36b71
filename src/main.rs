//! Spritelight - command-line renderer for lit sprite previews

use std::process::ExitCode;

use spritelight::cli;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    cli::run()
}

//! lanesnpeds - lane and pedestrian detection with keyboard mode switching

use std::process::ExitCode;

use lanesnpeds::cli::run_program;
use lanesnpeds::Program;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    run_program(Program::Merged, std::env::args_os())
}

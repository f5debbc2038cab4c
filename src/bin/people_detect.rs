//! people_detect - HOG pedestrian detection over tiled frames

use std::process::ExitCode;

use lanesnpeds::cli::run_program;
use lanesnpeds::Program;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    run_program(Program::Pedestrians, std::env::args_os())
}

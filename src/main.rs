use clap::Parser;
use tacore::cli::{Cli, run};
use tacore::logging::init_logging;

fn main() -> std::process::ExitCode {
    init_logging();
    run(Cli::parse())
}

use clap::Parser;
use samscreen::cli::{Cli, logger, run};

fn main() -> std::process::ExitCode {
    logger(std::env::var("RUST_LOG").ok().as_deref()).init();
    run(Cli::parse())
}

use clap::Parser;
use tradecast::cli::{Cli, run};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}

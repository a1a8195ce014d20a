mod benchmark;
mod catalog;
mod cli;
mod commands;
mod dataset;
mod error;
mod generator;
mod hybrid;
mod lexical;
mod metrics;
mod model;
mod optimizer;
mod results_log;
mod semantic;
mod similarity;
mod util;

use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};

fn main() {
    init_tracing();

    if let Err(err) = run() {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate(args) => commands::generate::run(args),
        Commands::Benchmark(args) => commands::benchmark::run(args),
        Commands::Optimize(args) => commands::optimize::run(args),
        Commands::Status(args) => commands::status::run(args),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::{diff, merge, query, split};
use tracing_subscriber::FmtSubscriber;

fn init_tracing(verbose: u8) -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(match verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        })
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

pub fn run() -> anyhow::Result<()> {
    use clap::Parser;

    let cli = Cli::parse();
    init_tracing(cli.verbose)?;
    match &cli.command {
        Commands::Diff(args) => diff::run(&cli, args),
        Commands::Merge(args) => merge::run(&cli, args),
        Commands::Split(args) => split::run(&cli, args),
        Commands::Query(args) => query::run(&cli, args),
    }
}

fn main() -> anyhow::Result<()> { run() }

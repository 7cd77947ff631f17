use clap::{Parser, Subcommand};
use tracing::Level;

mod commands;
mod config;
mod logging;
mod sim;

use commands::check::CheckConfigArgs;
use commands::stress::StressArgs;

/// Cistern Command Line Interface
///
/// Inspect pool configuration files and exercise a resource pool against
/// simulated connections.
#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[clap(long, global = true, default_value = "info", value_parser = logging::parse_level)]
    log_level: Level,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file and print the effective pool settings
    #[clap(name = "check-config")]
    CheckConfig(CheckConfigArgs),

    /// Print a sample configuration file
    #[clap(name = "print-config")]
    PrintConfig,

    /// Run a concurrent workload against simulated connections
    Stress(StressArgs),
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.log_level);

    let result = match &cli.command {
        Commands::CheckConfig(args) => commands::check::execute_check(args),
        Commands::PrintConfig => commands::check::execute_print(),
        Commands::Stress(args) => commands::stress::execute(args),
    };

    if let Err(err) = result {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}

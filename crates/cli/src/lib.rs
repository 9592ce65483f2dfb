pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use callcart_core::config::LoadOptions;

#[derive(Debug, Parser)]
#[command(
    name = "callcart",
    about = "Callcart operator CLI",
    long_about = "Prepare the catalog store, load demo fixtures and inspect runtime configuration.",
    after_help = "Examples:\n  callcart migrate\n  callcart seed\n  callcart doctor --json\n  callcart --config ./callcart.toml config"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a TOML config file (must exist when given)")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations")]
    Migrate,
    #[command(about = "Load the demo merchant and sneaker catalog")]
    Seed,
    #[command(about = "Print the effective configuration with secrets redacted")]
    Config,
    #[command(about = "Validate configuration, database connectivity and schema state")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

impl Cli {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            require_file: self.config.is_some(),
            config_path: self.config.clone(),
            ..LoadOptions::default()
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = cli.load_options();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(&options),
        Command::Seed => commands::seed::run(&options),
        Command::Config => commands::config::run(&options),
        Command::Doctor { json } => commands::doctor::run(&options, json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use otifly_core::config::{AppConfig, LoadOptions, LogFormat};

#[derive(Debug, Parser)]
#[command(
    name = "otifly",
    about = "Otifly OTIF alert assistant CLI",
    long_about = "Query OTIF delivery alerts, take actions on them, and generate reports \
                  through a conversational command line.",
    after_help = "Examples:\n  otifly chat\n  otifly summary --save\n  otifly doctor --json"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to the TOML config file (default: otifly.toml)")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Start the interactive assistant loop")]
    Chat,
    #[command(about = "Print the daily summary report for the current alert data")]
    Summary {
        #[arg(long, help = "Also write the report to the configured output directory")]
        save: bool,
    },
    #[command(about = "Validate config, data sources, and report directory readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = LoadOptions { config_path: cli.config.clone(), require_file: false };

    let result = match cli.command {
        // Doctor reports config failures itself instead of dying on them.
        Command::Doctor { json } => commands::doctor::run(&options, json),
        command => match AppConfig::load(options) {
            Ok(config) => {
                init_logging(&config);
                match command {
                    Command::Chat => commands::chat::run(&config),
                    Command::Summary { save } => commands::summary::run(&config, save),
                    Command::Doctor { .. } => unreachable!("handled above"),
                }
            }
            Err(error) => {
                commands::CommandResult::failure(format!("configuration error: {error}"), 2)
            }
        },
    };

    if !result.output.is_empty() {
        println!("{}", result.output);
    }
    ExitCode::from(result.exit_code)
}

fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        LogFormat::Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        LogFormat::Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "rapport",
    about = "Rapport operator CLI",
    long_about = "Inspect routing decisions, run zero-cost pattern analysis, and review effective configuration.",
    after_help = "Examples:\n  rapport quick \"We need to buy ASAP, pre-approved\"\n  rapport route entity-extraction \"Looking at 3 bedroom homes\"\n  rapport config"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Run the zero-cost pattern analysis over a message and print the signals")]
    Quick {
        #[arg(help = "Conversation text to analyze")]
        text: String,
    },
    #[command(about = "Show which cost tier the router picks for a task and text")]
    Route {
        #[arg(value_enum, help = "Task type to route")]
        task: commands::route::CliTask,
        #[arg(help = "Conversation text to assess")]
        text: String,
    },
    #[command(about = "Inspect effective configuration values with secret redaction")]
    Config,
}

pub fn run() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Quick { text } => commands::quick::run(&text),
        Command::Route { task, text } => commands::route::run(task, &text),
        Command::Config => commands::config::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

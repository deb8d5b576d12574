pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "appraisy",
    about = "Appraisy operator CLI",
    long_about = "Operate Appraisy migrations, demo seeds, config inspection, and approval-chain previews.",
    after_help = "Examples:\n  appraisy migrate\n  appraisy seed\n  appraisy chain --employee emp-worker-1"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo org and appraisal fixtures")]
    Seed,
    #[command(about = "Inspect effective configuration values with secrets redacted")]
    Config,
    #[command(about = "Preview the approval chain the builder would produce for an employee")]
    Chain {
        #[arg(long, help = "Subject employee id")]
        employee: String,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Chain { employee } => commands::chain::run(&employee),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

mod case;
mod cli;
mod config;
mod outcome;
mod report;
mod run;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "eval", version, about = "Evaluation harness for the divider protocol")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    List,
    Run {
        case_id: String,
        #[arg(long, default_value_t = 1)]
        runs: u32,
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    divider::logging::init("warn");
    let cli = Cli::parse();
    let repo_root = std::env::current_dir()?;
    match cli.command {
        Command::List => cli::list_cases(&repo_root),
        Command::Run {
            case_id,
            runs,
            json,
        } => cli::run_case_by_id(&repo_root, &case_id, runs, json),
    }
}

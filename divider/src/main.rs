//! Command-line front end for the four-agent envy-free divider.
//!
//! Loads a scenario file, runs the protocol, and reports each agent's share.
//! Exit codes are listed in [`divider::exit_codes`].

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use divider::core::error::ProtocolError;
use divider::exit_codes;
use divider::io::config::{ProtocolConfig, load_config, write_config};
use divider::io::scenario::load_scenario;
use divider::logging;
use divider::protocol::{ProtocolReport, run_protocol};

#[derive(Parser)]
#[command(
    name = "divider",
    version,
    about = "Envy-free division of a cake among four agents"
)]
struct Cli {
    /// Log protocol rounds and corrections to stderr (overridden by `RUST_LOG`).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the protocol on a scenario and print the allocation.
    Run {
        /// Scenario TOML file.
        scenario: PathBuf,
        /// Print the full report as JSON.
        #[arg(long)]
        json: bool,
        /// Protocol config TOML replacing the scenario's `[config]` table.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Parse and validate a scenario without running it.
    Check {
        /// Scenario TOML file.
        scenario: PathBuf,
    },
    /// Write the default protocol config to a TOML file.
    InitConfig {
        path: PathBuf,
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
}

/// A failure and the exit code it maps to.
struct Failure {
    code: i32,
    error: anyhow::Error,
}

impl Failure {
    fn invalid(error: anyhow::Error) -> Self {
        Self {
            code: exit_codes::INVALID,
            error,
        }
    }
}

impl From<ProtocolError> for Failure {
    fn from(err: ProtocolError) -> Self {
        Self {
            code: exit_codes::for_protocol_error(&err),
            error: err.into(),
        }
    }
}

fn main() {
    let cli = Cli::parse();
    logging::init(if cli.verbose { "divider=info" } else { "warn" });
    let result = match cli.command {
        Command::Run {
            scenario,
            json,
            config,
        } => cmd_run(&scenario, json, config.as_deref()),
        Command::Check { scenario } => cmd_check(&scenario),
        Command::InitConfig { path, force } => cmd_init_config(&path, force),
    };
    match result {
        Ok(()) => std::process::exit(exit_codes::OK),
        Err(failure) => {
            eprintln!("{:#}", failure.error);
            std::process::exit(failure.code);
        }
    }
}

fn cmd_run(path: &Path, json: bool, config_path: Option<&Path>) -> Result<(), Failure> {
    let scenario = load_scenario(path).map_err(Failure::invalid)?;
    let agents = scenario.build_agents().map_err(Failure::invalid)?;
    let config = match config_path {
        Some(config_path) => load_config(config_path).map_err(Failure::invalid)?,
        None => scenario.config.clone(),
    };
    let report = run_protocol(&agents, &config)?;
    if json {
        let payload = serde_json::to_string_pretty(&report)
            .context("serialize report json")
            .map_err(Failure::invalid)?;
        println!("{}", payload);
    } else {
        print!("{}", render_report(&report));
    }
    Ok(())
}

fn cmd_check(path: &Path) -> Result<(), Failure> {
    let scenario = load_scenario(path).map_err(Failure::invalid)?;
    scenario.build_agents().map_err(Failure::invalid)?;
    println!("ok: {} agents", scenario.agents.len());
    Ok(())
}

fn cmd_init_config(path: &Path, force: bool) -> Result<(), Failure> {
    if path.exists() && !force {
        return Err(Failure::invalid(anyhow::anyhow!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    write_config(path, &ProtocolConfig::default()).map_err(Failure::invalid)?;
    println!("wrote {}", path.display());
    Ok(())
}

/// Human-readable summary: shares, then the value matrix.
fn render_report(report: &ProtocolReport) -> String {
    let mut out = String::new();
    let width = report.agents.iter().map(String::len).max().unwrap_or(0);
    for (agent, name) in report.agents.iter().enumerate() {
        out.push_str(&format!(
            "{:width$}  {}\n",
            name,
            report.allocation.share(agent),
            width = width
        ));
    }
    out.push_str(&format!(
        "rounds: {}  corrections: {}  division: {}\n",
        report.rounds.len(),
        report.corrections.len(),
        report
            .division
            .as_ref()
            .map_or_else(|| "none".to_string(), |division| format!("{:?}", division))
    ));
    out.push_str("values (row values column's share):\n");
    for (name, row) in report.agents.iter().zip(&report.values) {
        let cells: Vec<String> = row.iter().map(|value| format!("{:>10.6}", value)).collect();
        out.push_str(&format!("{:width$}  {}\n", name, cells.join(" "), width = width));
    }
    out
}

//! CLI subcommand definitions and handlers.
//!
//! Uses clap derive to define the subcommand hierarchy:
//! - `run <scenario>` -- replay a scripted list of poll operations
//! - `config show|path` -- inspect configuration
//! - `version` -- print version info

pub mod scenario;

use crate::config;
use crate::logging;
use crate::polls::VotingService;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Scoped chat polls with timed expiry.
#[derive(Parser, Debug)]
#[command(
    name = "votebot",
    version = env!("CARGO_PKG_VERSION"),
    about = "votebot -- scoped chat polls with single votes and timed expiry"
)]
pub struct Cli {
    /// Config file to use instead of the default location.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay a JSON5 scenario of poll operations and print each reply.
    Run {
        /// Path to the scenario file.
        scenario: PathBuf,
    },

    /// Inspect configuration.
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Print version information.
    Version,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration as JSON.
    Show,

    /// Print the resolved configuration file path.
    Path,
}

// ---------------------------------------------------------------------------
// Subcommand handlers
// ---------------------------------------------------------------------------

fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(config::get_config_path)
}

/// Run the `run <scenario>` subcommand.
pub async fn handle_run(
    config_path: Option<&Path>,
    scenario_path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config::load_config_from(&resolve_config_path(config_path))?;
    logging::init_logging(&cfg.logging)?;

    let scenario = scenario::load_scenario(scenario_path)?;
    tracing::info!(
        scenario = %scenario_path.display(),
        scope = %scenario.scope,
        steps = scenario.steps.len(),
        "Running scenario"
    );

    let service = VotingService::new(cfg.voting.settings());
    let replies = scenario::run_scenario(&service, &scenario).await;

    for reply in &replies {
        let marker = if reply.ok { "ok" } else { "err" };
        println!("--- step {} [{}]", reply.step + 1, marker);
        println!("{}", reply.text);
    }

    let failed = replies.iter().filter(|r| !r.ok).count();
    println!();
    println!("{} steps, {} failed", replies.len(), failed);
    Ok(())
}

/// Run the `config show` subcommand.
pub fn handle_config_show(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config::load_config_from(&resolve_config_path(config_path))?;
    println!("{}", serde_json::to_string_pretty(&cfg)?);
    Ok(())
}

/// Run the `config path` subcommand.
pub fn handle_config_path(config_path: Option<&Path>) {
    println!("{}", resolve_config_path(config_path).display());
}

/// Run the `version` subcommand.
pub fn handle_version() {
    println!("votebot {}", env!("CARGO_PKG_VERSION"));
}

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

#[derive(Parser)]
#[command(name = "borehole-workflow")]
#[command(about = "Review and publication workflow engine for borehole records")]
#[command(long_about = "Drives borehole records through Draft, InReview, Reviewed and Published. \
                       Every change is gated by the caller's edit lock and workgroup role, and \
                       recorded in an append-only audit trail. Use 'borehole-workflow replay' to \
                       run a scenario file against an in-memory engine.")]
pub struct Cli {
    /// Configuration file (defaults to ./borehole-workflow.toml when present)
    #[arg(long, global = true, help = "Path to a borehole-workflow TOML configuration file")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replay a scenario of lock, change and checklist steps
    Replay {
        /// Scenario file describing workgroups, grants, boreholes and steps
        scenario: PathBuf,
        /// Print the report as JSON instead of text
        #[arg(long, help = "Emit the replay report as JSON")]
        json: bool,
        /// Exit with the first rejected step's error code
        #[arg(long, help = "Stop at the first rejected step and exit with its code")]
        strict: bool,
    },
    /// Show the role required for every gated action
    Thresholds,
    /// Write a configuration file populated with the defaults
    InitConfig {
        /// Where to write the file
        #[arg(long, default_value = "borehole-workflow.toml", help = "Output path for the configuration file")]
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long, help = "Overwrite the file if it already exists")]
        force: bool,
    },
}

use anyhow::Result;
use borehole_workflow::cli::commands::{InitConfigCommand, ReplayCommand, ThresholdsCommand};
use borehole_workflow::cli::{Cli, Commands};
use borehole_workflow::config::WorkflowConfig;
use borehole_workflow::telemetry::{init_telemetry, shutdown_telemetry};
use clap::{CommandFactory, Parser};

fn main() -> Result<()> {
    let cli = Cli::parse();

    WorkflowConfig::load_env_file()?;
    let config = WorkflowConfig::load_from(cli.config.as_deref())?;
    init_telemetry(&config.observability)?;

    let exit_code = tokio::runtime::Runtime::new()?.block_on(run(cli.command, config))?;

    shutdown_telemetry();
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}

/// Dispatch a subcommand; returns the process exit code
async fn run(command: Option<Commands>, config: WorkflowConfig) -> Result<i32> {
    match command {
        // Default behavior: no subcommand shows usage
        None => {
            Cli::command().print_help()?;
            println!();
            Ok(0)
        }
        Some(Commands::Replay {
            scenario,
            json,
            strict,
        }) => {
            let report = ReplayCommand::new(scenario, config.workflow)
                .with_json(json)
                .with_strict(strict)
                .execute()
                .await?;
            Ok(if strict { report.exit_code() } else { 0 })
        }
        Some(Commands::Thresholds) => {
            ThresholdsCommand::new(config.workflow).execute().await?;
            Ok(0)
        }
        Some(Commands::InitConfig { path, force }) => {
            InitConfigCommand::new(path).with_force(force).execute().await?;
            Ok(0)
        }
    }
}

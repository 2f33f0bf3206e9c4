use anyhow::Result;
use clap::Parser;

use life_cert_agent::cli::commands::{show_how_to_get_started, ConfigCommand, RunCommand};
use life_cert_agent::cli::{Cli, Commands};
use life_cert_agent::{config, init_config, init_telemetry, shutdown_telemetry};

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_config()?;
    let config = config()?;
    init_telemetry(&config.observability)?;

    let outcome = match cli.command {
        // Default behavior: no subcommand - explain how to start
        None => show_how_to_get_started(),
        Some(Commands::Run {
            mode,
            force_failure,
            answers,
            schedule_visit,
            seed,
            export_dir,
            instant,
            json,
        }) => {
            let command = RunCommand::new(mode.into())
                .with_force_failure(force_failure)
                .with_answers(answers)
                .with_schedule_visit(schedule_visit)
                .with_seed(seed)
                .with_export_dir(export_dir)
                .with_instant(instant)
                .with_json(json);
            tokio::runtime::Runtime::new()?.block_on(async { command.execute(config).await })
        }
        Some(Commands::Config { output }) => ConfigCommand::new(output).execute(config),
    };

    shutdown_telemetry();
    outcome
}

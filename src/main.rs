//! Vigil monitor binary
//!
//! Runs the monitoring loop by default; the other subcommands inspect or edit
//! the persisted status store and alert log.

use clap::Parser;
use vigil::cli::{self, Cli, Command};
use vigil::{config::Config, monitor, shutdown, telemetry};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Run) {
        Command::Config { output } => {
            let template = cli::generate_config_template();
            match output {
                Some(path) => {
                    std::fs::write(&path, template)?;
                    eprintln!("Wrote configuration template to {}", path);
                }
                None => print!("{}", template),
            }
        }
        Command::Run => {
            let config = Config::from_file(&cli.config)?;
            telemetry::init(&config.observability);
            let stop = shutdown::listen();

            tracing::info!(
                config = %cli.config,
                websites = config.websites.len(),
                databases = config.databases.len(),
                "Loaded configuration"
            );

            if let Err(e) = monitor::start(config, stop).await {
                tracing::error!(error = %e, "Monitor failed to start");
                return Err(e.into());
            }
        }
        Command::Status => {
            let config = Config::from_file(&cli.config)?;
            print!("{}", cli::render_status(&config).await?);
        }
        Command::Alerts { limit } => {
            let config = Config::from_file(&cli.config)?;
            print!("{}", cli::render_alerts(&config, limit).await?);
        }
        Command::ClearAlerts => {
            let config = Config::from_file(&cli.config)?;
            telemetry::init(&config.observability);
            cli::clear_alerts(&config).await?;
            println!("Alerts cleared");
        }
        Command::SimulateFailure { service, info } => {
            let config = Config::from_file(&cli.config)?;
            let total = cli::simulate_failure(&config, &service, &info).await?;
            println!("Simulated failure appended ({} alerts in log)", total);
        }
    }

    Ok(())
}

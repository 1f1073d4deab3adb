//! stepflow - command-line entry point
//!
//! Validates wizard definitions and replays navigation scripts against them.

use anyhow::Context;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use stepflow::StepperConfig;
use stepflow::cli::{Cli, Commands, WalkCommand, WalkSnapshot};

/// Initialize the logger; RUST_LOG overrides the default level
fn init_logger(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_args();
    init_logger(cli.debug);
    debug!("CLI arguments parsed");

    match cli.command {
        Commands::Validate { config } => {
            info!("Validating wizard definition: {:?}", config);
            let result = StepperConfig::load_from_file(&config)
                .and_then(|loaded| loaded.validate().map_err(anyhow::Error::from));
            match result {
                Ok(()) => {
                    info!("Wizard definition validation successful");
                    println!("✓ Wizard definition is valid: {:?}", config);
                }
                Err(e) => {
                    error!("Wizard definition validation failed: {:#}", e);
                    eprintln!("✗ Wizard definition validation failed: {:#}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Walk { config, commands } => {
            let mut definition = StepperConfig::load_from_file(&config)?;
            definition.debug |= cli.debug;

            let script = commands
                .iter()
                .map(|raw| raw.parse::<WalkCommand>())
                .collect::<Result<Vec<_>, _>>()
                .context("Invalid navigation script")?;

            let mut shell = definition.build_shell()?;
            info!(
                "Walking {} commands over {} steps",
                script.len(),
                shell.engine().step_count()
            );

            for (raw, command) in commands.iter().zip(&script) {
                let moved = command.apply(&mut shell).await;
                info!(
                    command = raw.as_str(),
                    ok = moved,
                    current = shell.engine().current_index(),
                    "Command applied"
                );
            }

            let snapshot = WalkSnapshot::capture(&shell);
            let json = serde_json::to_string_pretty(&snapshot)
                .context("Failed to serialize walk snapshot")?;
            println!("{}", json);
        }
    }

    Ok(())
}

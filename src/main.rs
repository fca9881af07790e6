// ABOUTME: Entry point for the lookout CLI application.
// ABOUTME: Loads configuration, connects to the runtime, and runs update cycles.

mod cli;

use clap::Parser;
use cli::Cli;
use lookout::config::Config;
use lookout::docker::DockerClient;
use lookout::error::{Error, Result};
use lookout::output::{Output, OutputMode};
use lookout::runtime::{self, RuntimeError, RuntimeInfoTrait};
use lookout::schedule;
use std::env;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins over the verbose flag.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };
    let mut output = Output::new(mode);

    match run(cli, &mut output).await {
        Ok(()) => {}
        // Already reported by the cycle runner.
        Err(Error::Update(_)) => std::process::exit(1),
        Err(e) => {
            output.error(&e.to_string());
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli, output: &mut Output) -> Result<()> {
    let cwd = env::current_dir()?;
    let config = cli.apply(Config::resolve(cli.config.as_deref(), &cwd)?);
    config.validate()?;

    let runtime = runtime::connect(&config.runtime)?;
    let metadata = runtime.info().await.map_err(RuntimeError::from)?;
    info!(
        runtime = %metadata.name,
        version = %metadata.version,
        os = %metadata.os,
        "Connected to container runtime"
    );

    let client = DockerClient::new(runtime, config.client_options());
    let params = config.update_params();

    if cli.run_once {
        schedule::run_once(&client, &params, output).await?;
        return Ok(());
    }

    schedule::watch(&client, &params, config.interval, output, schedule::ctrl_c()).await;
    Ok(())
}

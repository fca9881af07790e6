// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Flags override the configuration file and LOOKOUT_* environment variables.

use clap::Parser;
use lookout::config::{Config, parse_duration};
use lookout::runtime::RuntimeType;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "lookout")]
#[command(about = "Keep running containers on the latest version of their images")]
#[command(version)]
pub struct Cli {
    /// Containers never to update
    #[arg(value_name = "EXCLUDE")]
    pub exclude: Vec<String>,

    /// Configuration file (default: lookout.yml in the working directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Time between update cycles, e.g. 30s or 5m
    #[arg(short, long, value_parser = parse_duration)]
    pub interval: Option<Duration>,

    /// Grace period before a stopping container is killed
    #[arg(long, value_parser = parse_duration)]
    pub stop_timeout: Option<Duration>,

    /// Remove superseded images after restarting
    #[arg(long)]
    pub cleanup: bool,

    /// Compare against local images only, without pulling
    #[arg(long)]
    pub no_pull: bool,

    /// Run a single update cycle and exit
    #[arg(long)]
    pub run_once: bool,

    /// Container runtime socket path
    #[arg(long)]
    pub socket: Option<String>,

    /// Container runtime (docker or podman)
    #[arg(long)]
    pub runtime: Option<RuntimeType>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Only print cycles that restarted or failed something
    #[arg(short, long, conflicts_with = "json")]
    pub quiet: bool,

    /// Print cycle results as JSON lines
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Apply flags on top of file and environment settings.
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(interval) = self.interval {
            config.interval = interval;
        }
        if let Some(timeout) = self.stop_timeout {
            config.stop_timeout = timeout;
        }
        if self.cleanup {
            config.cleanup = true;
        }
        if self.no_pull {
            config.pull = false;
        }
        if !self.exclude.is_empty() {
            config.exclude = self.exclude.clone();
        }
        if let Some(socket) = &self.socket {
            config.runtime.socket = Some(socket.clone());
        }
        if let Some(runtime) = self.runtime {
            config.runtime.runtime = Some(runtime);
        }
        config
    }
}

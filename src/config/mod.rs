// ABOUTME: Configuration types and parsing for lookout.yml.
// ABOUTME: Handles YAML parsing, discovery, defaults, and environment overrides.

mod env;

pub use env::{
    ENV_CLEANUP, ENV_EXCLUDE, ENV_INTERVAL, ENV_SOCKET, ENV_STOP_TIMEOUT, parse_bool,
    parse_duration,
};

use crate::docker::ClientOptions;
use crate::error::{Error, Result};
use crate::runtime::RuntimeConfig;
use crate::update::{DEFAULT_STOP_TIMEOUT, UpdateParams};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "lookout.yml";
pub const CONFIG_FILENAME_ALT: &str = "lookout.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".lookout/config.yml";

/// Time between update cycles when nothing else is configured.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,

    #[serde(default = "default_stop_timeout", with = "humantime_serde")]
    pub stop_timeout: Duration,

    /// Remove superseded images after restarting.
    #[serde(default)]
    pub cleanup: bool,

    /// Pull images before checking them; off means only locally present
    /// images are compared.
    #[serde(default = "default_pull")]
    pub pull: bool,

    /// Container names never updated.
    #[serde(default)]
    pub exclude: Vec<String>,

    #[serde(default)]
    pub runtime: RuntimeConfig,
}

fn default_interval() -> Duration {
    DEFAULT_INTERVAL
}

fn default_stop_timeout() -> Duration {
    DEFAULT_STOP_TIMEOUT
}

fn default_pull() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            stop_timeout: default_stop_timeout(),
            cleanup: false,
            pull: default_pull(),
            exclude: Vec::new(),
            runtime: RuntimeConfig::default(),
        }
    }
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty file deserializes as null; treat it as all defaults.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::ConfigNotFound(path.to_path_buf()),
            _ => Error::Io(e),
        })?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                tracing::debug!(path = %path.display(), "loading configuration");
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Load `explicit` if given, otherwise discover in `dir`, falling back
    /// to defaults when nothing is found there. Environment overrides are
    /// applied on top.
    pub fn resolve(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        let config = match explicit {
            Some(path) => Self::load(path)?,
            None => match Self::discover(dir) {
                Err(Error::ConfigNotFound(_)) => Self::default(),
                other => other?,
            },
        };
        config.apply_env()
    }

    /// Override fields from `LOOKOUT_*` environment variables.
    pub fn apply_env(mut self) -> Result<Self> {
        if let Some(value) = env::var(ENV_INTERVAL) {
            self.interval = parse_duration(&value)
                .map_err(|e| Error::InvalidConfig(format!("{ENV_INTERVAL}: {e}")))?;
        }
        if let Some(value) = env::var(ENV_STOP_TIMEOUT) {
            self.stop_timeout = parse_duration(&value)
                .map_err(|e| Error::InvalidConfig(format!("{ENV_STOP_TIMEOUT}: {e}")))?;
        }
        if let Some(value) = env::var(ENV_CLEANUP) {
            self.cleanup = parse_bool(&value)
                .map_err(|e| Error::InvalidConfig(format!("{ENV_CLEANUP}: {e}")))?;
        }
        if let Some(value) = env::var(ENV_EXCLUDE) {
            self.exclude = env::split_list(&value);
        }
        if let Some(value) = env::var(ENV_SOCKET) {
            self.runtime.socket = Some(value);
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(Error::InvalidConfig("interval must be greater than zero".into()));
        }
        // The daemon takes the stop timeout as signed 32-bit seconds.
        if self.stop_timeout.as_secs() > i32::MAX as u64 {
            return Err(Error::InvalidConfig(format!(
                "stop_timeout must be at most {}s",
                i32::MAX
            )));
        }
        Ok(())
    }

    /// Settings for one update cycle.
    pub fn update_params(&self) -> UpdateParams {
        UpdateParams {
            excluded: self.exclude.clone(),
            cleanup: self.cleanup,
            stop_timeout: self.stop_timeout,
        }
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions { pull: self.pull }
    }
}

//! Configuration file.
//!
//! Looked up, in order, at the first command line argument, `$WDDL_CONFIG`
//! and `~/.config/wddl/wddl.toml`. A missing file is created with defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use wddl_model::EngineConfig;
use wddl_model::config::{DEFAULT_CONCURRENCY, DEFAULT_REPORT_EVERY, DEFAULT_SCAN_EVERY};

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "WDDL_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Local mount point of the remote store.
    #[serde(default = "default_remote_root")]
    pub remote_root: PathBuf,

    /// Remote directory to mirror, relative to the mount point.
    #[serde(default = "default_input")]
    pub input: String,

    /// Local directory receiving the mirrored tree.
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Partition working directory.
    #[serde(default = "default_temp")]
    pub temp: PathBuf,

    /// Queue database directory.
    #[serde(default = "default_queue_path")]
    pub queue_path: PathBuf,

    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_scan_interval")]
    pub scan_interval_secs: u64,

    #[serde(default = "default_report_interval")]
    pub report_interval_secs: u64,

    /// Delete the remote copy after a successful download.
    #[serde(default)]
    pub remove_remote: bool,

    /// Remove already downloaded remote files once at startup.
    #[serde(default)]
    pub sweep_remote: bool,
}

fn default_remote_root() -> PathBuf {
    PathBuf::from("/mnt/remote")
}

fn default_input() -> String {
    "/".into()
}

fn default_output() -> PathBuf {
    PathBuf::from("./wddl-out")
}

fn default_temp() -> PathBuf {
    PathBuf::from("./wddl-temp")
}

fn default_queue_path() -> PathBuf {
    PathBuf::from("./wddl-queue")
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_scan_interval() -> u64 {
    DEFAULT_SCAN_EVERY.as_secs()
}

fn default_report_interval() -> u64 {
    DEFAULT_REPORT_EVERY.as_secs()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            remote_root: default_remote_root(),
            input: default_input(),
            output: default_output(),
            temp: default_temp(),
            queue_path: default_queue_path(),
            concurrency: default_concurrency(),
            scan_interval_secs: default_scan_interval(),
            report_interval_secs: default_report_interval(),
            remove_remote: false,
            sweep_remote: false,
        }
    }
}

impl Config {
    /// Loads `path`, or writes and returns the defaults if it does not exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            let config = Config::default();
            config.save(path)?;
            tracing::info!(path = %path.display(), "wrote default configuration");
            Ok(config)
        }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    /// Engine view of this configuration.
    pub fn engine_config(&self) -> EngineConfig {
        let mut config = EngineConfig::new(&self.input, &self.output, &self.temp);
        config.concurrency = self.concurrency.max(1);
        config.scan_every = Duration::from_secs(self.scan_interval_secs.max(1));
        config.report_every = Duration::from_secs(self.report_interval_secs.max(1));
        config.remove_remote = self.remove_remote;
        config
    }
}

/// Resolves the config file location from the process environment.
pub fn config_path(arg: Option<String>) -> PathBuf {
    resolve_config_path(
        arg,
        std::env::var(CONFIG_ENV).ok(),
        std::env::var("HOME").ok(),
    )
}

fn resolve_config_path(arg: Option<String>, env: Option<String>, home: Option<String>) -> PathBuf {
    if let Some(path) = arg.or(env).filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    let home = home.unwrap_or_else(|| "/tmp".into());
    PathBuf::from(home).join(".config").join("wddl").join("wddl.toml")
}

//! Command line handling for the live monitor
//!
//! `live-monitor [--config <path>] [namespace/pod]`

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use streamsockets::LogTarget;

/// Environment variable overriding the config path
pub const CONFIG_PATH_VAR: &str = "LIVE_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/live_config.yaml";

#[derive(Debug, Clone, PartialEq)]
pub struct MonitorArgs {
    pub config_path: PathBuf,
    /// Pod to tail from startup
    pub log_target: Option<LogTarget>,
}

impl MonitorArgs {
    /// Parse the process arguments and `LIVE_CONFIG_PATH`
    pub fn from_env() -> Result<Self> {
        Self::parse(std::env::args().skip(1), std::env::var(CONFIG_PATH_VAR).ok())
    }

    /// `--config` beats `env_path`, which beats the default path
    pub fn parse(args: impl IntoIterator<Item = String>, env_path: Option<String>) -> Result<Self> {
        let mut config_path = None;
        let mut log_target = None;

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            if arg == "--config" {
                let path = args.next().context("--config needs a path")?;
                config_path = Some(PathBuf::from(path));
            } else if log_target.is_none() {
                log_target = Some(parse_target(&arg)?);
            } else {
                bail!("Unexpected argument '{}'", arg);
            }
        }

        Ok(Self {
            config_path: config_path
                .or_else(|| env_path.map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH)),
            log_target,
        })
    }
}

/// "namespace/pod"
fn parse_target(arg: &str) -> Result<LogTarget> {
    match arg.split_once('/') {
        Some((namespace, pod)) if !namespace.is_empty() && !pod.is_empty() => {
            Ok(LogTarget::new(namespace, pod))
        }
        _ => bail!("Expected a log target as namespace/pod, got '{}'", arg),
    }
}

// src/common/run_mode.rs
//! Selects which halves of the service this process runs: the HTTP API,
//! the queue workers, or both.

use std::env;
use std::str::FromStr;
use tracing::info;

use super::config::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    All,
    Api,
    Worker,
}

impl RunMode {
    pub fn runs_api(&self) -> bool {
        matches!(self, RunMode::All | RunMode::Api)
    }

    pub fn runs_workers(&self) -> bool {
        matches!(self, RunMode::All | RunMode::Worker)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::All => "all",
            RunMode::Api => "api",
            RunMode::Worker => "worker",
        }
    }
}

impl FromStr for RunMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(RunMode::All),
            "api" => Ok(RunMode::Api),
            "worker" | "workers" => Ok(RunMode::Worker),
            other => Err(ConfigError::InvalidChoice {
                name: "RUN_MODE",
                value: other.to_string(),
                expected: "all, api, worker",
            }),
        }
    }
}

/// Looks for `--mode=<value>` (or `--mode <value>`) among the arguments
fn parse_mode_arg<I>(args: I) -> Option<String>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if let Some(value) = arg.strip_prefix("--mode=") {
            return Some(value.to_string());
        }
        if arg == "--mode" {
            return args.next();
        }
    }
    None
}

/// Override the configured run mode from CLI args
pub fn apply_cli_override(mode: RunMode) -> Result<RunMode, ConfigError> {
    match parse_mode_arg(env::args().skip(1)) {
        Some(value) => {
            let overridden: RunMode = value.parse()?;
            info!(mode = overridden.as_str(), "CLI override: RUN_MODE");
            Ok(overridden)
        }
        None => Ok(mode),
    }
}

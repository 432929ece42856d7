//! OpenClaw gateway health probe (`openclaw health --json`).

use std::collections::BTreeMap;
use std::env;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use serde::Deserialize;

use super::command::run_with_timeout;
use crate::core::dashboard::{DataSource, GatewayStatus, MetricPayload};
use crate::error::{DashError, Result};

pub const GATEWAY_TIMEOUT: Duration = Duration::from_secs(5);

const OPENCLAW_BIN: &str = "openclaw";

#[derive(Debug, Deserialize)]
struct HealthReport {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    channels: BTreeMap<String, ChannelHealth>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChannelHealth {
    configured: bool,
    probe: Option<Probe>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Probe {
    ok: bool,
}

#[derive(Debug, Clone)]
pub struct GatewaySource {
    search_path: OsString,
    timeout: Duration,
}

impl GatewaySource {
    /// Probe using `PATH` plus `~/.npm-global/bin`, where npm installs the CLI
    /// for users without root.
    pub fn new(home: Option<PathBuf>) -> Self {
        let mut dirs: Vec<PathBuf> = env::var_os("PATH")
            .map(|p| env::split_paths(&p).collect())
            .unwrap_or_default();
        if let Some(npm_bin) = home.map(|h| h.join(".npm-global").join("bin")) {
            if !dirs.contains(&npm_bin) {
                dirs.insert(0, npm_bin);
            }
        }

        Self {
            search_path: env::join_paths(dirs).unwrap_or_default(),
            timeout: GATEWAY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn probe(&self) -> Result<GatewayStatus> {
        let cwd = env::current_dir()?;
        let binary = match which::which_in(OPENCLAW_BIN, Some(&self.search_path), cwd) {
            Ok(path) => path,
            Err(e) => {
                log::debug!("{} not found: {}", OPENCLAW_BIN, e);
                return Ok(GatewayStatus::Offline);
            }
        };

        let mut command = Command::new(binary);
        command.args(["health", "--json"]).env("PATH", &self.search_path);

        match run_with_timeout(&mut command, self.timeout) {
            Ok(output) if output.success => Ok(parse_health(&output.stdout)),
            Ok(output) => {
                log::debug!("Gateway health exited non-zero: {}", output.stderr.trim());
                Ok(GatewayStatus::Offline)
            }
            Err(DashError::Io(e)) => {
                log::debug!("Failed to run gateway health: {}", e);
                Ok(GatewayStatus::Offline)
            }
            Err(e) => Err(e),
        }
    }
}

impl DataSource for GatewaySource {
    fn fetch(&self) -> Result<MetricPayload> {
        self.probe().map(MetricPayload::Gateway)
    }
}

/// Interpret the JSON printed by `openclaw health --json`.
pub fn parse_health(stdout: &str) -> GatewayStatus {
    let report: HealthReport = match serde_json::from_str(stdout.trim()) {
        Ok(report) => report,
        Err(_) => return GatewayStatus::Unknown,
    };

    if !report.ok {
        return GatewayStatus::Degraded;
    }

    let channels = report
        .channels
        .into_iter()
        .filter(|(_, ch)| ch.configured && ch.probe.as_ref().is_some_and(|p| p.ok))
        .map(|(name, _)| name)
        .collect();

    GatewayStatus::Online { channels }
}

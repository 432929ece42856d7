//! The dashboard's built-in sources and their ids.

use std::sync::Arc;
use std::time::Duration;

use super::source::{DataSource, MetricSource};
use super::sources::{
    CostsSource, CronsSource, GatewaySource, GpuSource, LiveFeedSource, NetworkSource,
    ProcessesSource, SessionsSource, SystemHealthSource, UsageSource,
};
use crate::core::config::DashboardConfig;
use crate::error::{DashError, Result};

pub const SYSTEM: &str = "system";
pub const GPU: &str = "gpu";
pub const GATEWAY: &str = "gateway";
pub const USAGE: &str = "usage";
pub const COSTS: &str = "costs";
pub const SESSIONS: &str = "sessions";
pub const CRONS: &str = "crons";
pub const LIVE_FEED: &str = "live_feed";
pub const PROCESSES: &str = "processes";
pub const NETWORK: &str = "network";

/// Build every built-in source with the configured intervals, in display order.
pub fn default_sources(config: &DashboardConfig) -> Result<Vec<MetricSource>> {
    let sessions_dir = config.sessions_dir();

    let adapters: Vec<(&str, Arc<dyn DataSource>)> = vec![
        (SYSTEM, Arc::new(SystemHealthSource::new())),
        (GPU, Arc::new(GpuSource::new())),
        (GATEWAY, Arc::new(GatewaySource::new(dirs::home_dir()))),
        (USAGE, Arc::new(UsageSource::new(&sessions_dir))),
        (COSTS, Arc::new(CostsSource::new(&sessions_dir))),
        (SESSIONS, Arc::new(SessionsSource::new(config.sessions_file()))),
        (CRONS, Arc::new(CronsSource::new(config.cron_file()))),
        (LIVE_FEED, Arc::new(LiveFeedSource::new(&sessions_dir))),
        (PROCESSES, Arc::new(ProcessesSource::new())),
        (NETWORK, Arc::new(NetworkSource::new())),
    ];

    adapters
        .into_iter()
        .map(|(id, adapter)| {
            let interval = interval_for(config, id)?;
            Ok(MetricSource::new(id, interval, adapter))
        })
        .collect()
}

fn interval_for(config: &DashboardConfig, id: &str) -> Result<Duration> {
    config
        .intervals
        .get(id)
        .ok_or_else(|| DashError::config(format!("no refresh interval configured for '{}'", id)))
}

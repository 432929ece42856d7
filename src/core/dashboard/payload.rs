
/// Typed result of one successful fetch, one variant per source category.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricPayload {
    SystemHealth(SystemHealth),
    /// `None` when no supported GPU is present.
    Gpu(Option<GpuStats>),
    Gateway(GatewayStatus),
    Usage(UsageWindow),
    Costs(CostSummary),
    Sessions(Vec<SessionInfo>),
    Crons(Vec<CronJob>),
    LiveFeed(Vec<FeedMessage>),
    Processes(Vec<ProcessInfo>),
    Network(NetworkStats),
    /// Free-form value for ad-hoc sources and tests.
    Gauge(f64),
}

impl MetricPayload {
    /// Short category name, used in logs and the text snapshot.
    pub fn kind(&self) -> &'static str {
        match self {
            MetricPayload::SystemHealth(_) => "system-health",
            MetricPayload::Gpu(_) => "gpu",
            MetricPayload::Gateway(_) => "gateway",
            MetricPayload::Usage(_) => "usage",
            MetricPayload::Costs(_) => "costs",
            MetricPayload::Sessions(_) => "sessions",
            MetricPayload::Crons(_) => "crons",
            MetricPayload::LiveFeed(_) => "live-feed",
            MetricPayload::Processes(_) => "processes",
            MetricPayload::Network(_) => "network",
            MetricPayload::Gauge(_) => "gauge",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemHealth {
    pub cpu_percent: f32,
    pub ram_percent: f32,
    pub ram_used_bytes: u64,
    pub ram_total_bytes: u64,
    pub disk_percent: f32,
    pub disk_free_bytes: u64,
    pub load_average: (f64, f64, f64), // 1, 5, 15 min
    pub uptime_secs: u64,
    /// Oldest first, newest last.
    pub cpu_history: Vec<f32>,
    pub ram_history: Vec<f32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GpuStats {
    pub name: String,
    pub utilization_percent: u32,
    pub memory_used_bytes: u64,
    pub memory_total_bytes: u64,
    pub memory_percent: f32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayStatus {
    /// Healthy; lists channels that are configured and whose probe passed.
    Online { channels: Vec<String> },
    Degraded,
    /// The probe ran but its output could not be understood.
    Unknown,
    Offline,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelUsage {
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost: f64,
    pub calls: u64,
}

/// Rolling five-hour usage window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsageWindow {
    /// Sorted by output tokens, descending.
    pub per_model: Vec<ModelUsage>,
    pub total_cost: f64,
    pub total_calls: u64,
    pub burn_tokens_per_min: f64,
    pub burn_cost_per_min: f64,
    pub opus_output: u64,
    pub opus_percent: f64,
    pub sonnet_output: u64,
    pub sonnet_percent: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CostSummary {
    pub total: f64,
    pub today: f64,
    pub week: f64,
    /// Top five models by cost, descending.
    pub per_model: Vec<(String, f64)>,
    /// Seven most recent days (`YYYY-MM-DD`), newest first.
    pub per_day: Vec<(String, f64)>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionInfo {
    pub key: String,
    pub label: String,
    pub model: String,
    pub tokens: u64,
    pub context_tokens: u64,
    /// Unix milliseconds; 0 when unknown.
    pub updated_at_ms: i64,
    pub channel: String,
    pub session_id: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CronJob {
    pub id: String,
    pub name: String,
    pub schedule: String,
    pub enabled: bool,
    /// Unix milliseconds; 0 when never run.
    pub last_run_ms: i64,
    pub last_status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedMessage {
    pub timestamp_ms: i64,
    pub role: Role,
    pub content: String,
    pub session: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    pub cpu_percent: f32,
    pub memory_percent: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkStats {
    pub up_bytes_per_sec: f64,
    pub down_bytes_per_sec: f64,
    pub total_sent_bytes: u64,
    pub total_received_bytes: u64,
    pub peak_up: f64,
    pub peak_down: f64,
    pub up_history: Vec<f64>,
    pub down_history: Vec<f64>,
}

//! Data source adapters, one per dashboard category.
//!
//! Each adapter implements [`DataSource`](super::DataSource): a blocking
//! `fetch` that returns a typed payload or an error, within a bounded time.

mod command;
mod costs;
mod crons;
mod gateway;
mod gpu;
mod live_feed;
mod network;
mod processes;
mod sessions;
mod system;
pub mod transcripts;
mod usage;

pub use command::{run_with_timeout, CommandOutput};
pub use costs::{summarize_costs, CostsSource};
pub use crons::{load_crons, CronsSource};
pub use gateway::{parse_health, GatewaySource, GATEWAY_TIMEOUT};
pub use gpu::GpuSource;
pub use live_feed::{recent_messages, LiveFeedSource, FEED_LIMIT};
pub use network::{NetworkSource, RateTracker};
pub use processes::{top_processes, ProcessesSource, TOP_PROCESSES};
pub use sessions::{load_sessions, session_label, SessionsSource};
pub use system::SystemHealthSource;
pub use usage::{summarize_usage, UsageSource, OPUS_OUTPUT_LIMIT, SONNET_OUTPUT_LIMIT};

/// First `max` characters of `s`.
pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Last `/`-separated segment of a model id, e.g. `anthropic/claude-x` -> `claude-x`.
pub(crate) fn short_model_name(model: &str) -> String {
    model.rsplit('/').next().unwrap_or(model).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars_is_char_safe() {
        assert_eq!(truncate_chars("héllo wörld", 7), "héllo w");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn test_short_model_name() {
        assert_eq!(short_model_name("anthropic/claude-opus-4"), "claude-opus-4");
        assert_eq!(short_model_name("gpt"), "gpt");
        assert_eq!(short_model_name(""), "");
    }
}

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};

use super::transcripts::{list_transcripts, TranscriptMessage};
use crate::core::dashboard::{DataSource, MetricPayload, ModelUsage, UsageWindow};
use crate::error::Result;

/// Estimated output-token allowance per five-hour window.
pub const OPUS_OUTPUT_LIMIT: u64 = 88_000;
pub const SONNET_OUTPUT_LIMIT: u64 = 220_000;

const WINDOW: Duration = Duration::hours(5);
const BURN_WINDOW: Duration = Duration::minutes(30);
const MIN_BURN_SPAN_MS: i64 = 60_000;

/// Rolling five-hour usage from session transcripts.
#[derive(Debug, Clone)]
pub struct UsageSource {
    sessions_dir: PathBuf,
}

impl UsageSource {
    pub fn new(sessions_dir: impl Into<PathBuf>) -> Self {
        Self {
            sessions_dir: sessions_dir.into(),
        }
    }
}

impl DataSource for UsageSource {
    fn fetch(&self) -> Result<MetricPayload> {
        summarize_usage(&self.sessions_dir, Utc::now()).map(MetricPayload::Usage)
    }
}

/// Aggregate every message in the five hours before `now`.
pub fn summarize_usage(sessions_dir: &Path, now: DateTime<Utc>) -> Result<UsageWindow> {
    let window_start = now - WINDOW;
    let mut per_model: BTreeMap<String, ModelUsage> = BTreeMap::new();
    let mut recent: Vec<(DateTime<Utc>, u64, f64)> = Vec::new();
    let mut total_cost = 0.0;
    let mut total_calls = 0;

    for file in list_transcripts(sessions_dir)? {
        if file.modified_utc() < window_start {
            continue;
        }
        let messages = match file.messages() {
            Ok(messages) => messages,
            Err(e) => {
                log::debug!("Skipping transcript {}: {}", file.path.display(), e);
                continue;
            }
        };

        for msg in messages.iter().filter(|m| !m.is_mirror()) {
            let Some(ts) = msg.timestamp else { continue };
            if now - ts > WINDOW {
                continue;
            }
            accumulate(&mut per_model, msg);
            total_cost += msg.cost;
            total_calls += 1;
            recent.push((ts, msg.output_tokens, msg.cost));
        }
    }

    let (burn_tokens_per_min, burn_cost_per_min) = burn_rate(&recent, now);

    let family_output = |family: &str| -> u64 {
        per_model
            .values()
            .filter(|u| u.model.to_lowercase().contains(family))
            .map(|u| u.output_tokens)
            .sum()
    };
    let opus_output = family_output("opus");
    let sonnet_output = family_output("sonnet");

    let mut per_model: Vec<ModelUsage> = per_model.into_values().collect();
    per_model.sort_by(|a, b| b.output_tokens.cmp(&a.output_tokens));

    Ok(UsageWindow {
        per_model,
        total_cost,
        total_calls,
        burn_tokens_per_min,
        burn_cost_per_min,
        opus_output,
        opus_percent: percent_of(opus_output, OPUS_OUTPUT_LIMIT),
        sonnet_output,
        sonnet_percent: percent_of(sonnet_output, SONNET_OUTPUT_LIMIT),
    })
}

fn accumulate(per_model: &mut BTreeMap<String, ModelUsage>, msg: &TranscriptMessage) {
    let usage = per_model
        .entry(msg.model.clone())
        .or_insert_with(|| ModelUsage {
            model: msg.model.clone(),
            ..Default::default()
        });
    usage.input_tokens += msg.input_tokens;
    usage.output_tokens += msg.output_tokens;
    usage.cost += msg.cost;
    usage.calls += 1;
}

/// Output tokens and cost per minute over the last 30 minutes, measured from
/// the oldest message in that span (at least one minute).
fn burn_rate(recent: &[(DateTime<Utc>, u64, f64)], now: DateTime<Utc>) -> (f64, f64) {
    let cutoff = now - BURN_WINDOW;
    let in_window: Vec<_> = recent.iter().filter(|(ts, _, _)| *ts >= cutoff).collect();
    let Some(oldest) = in_window.iter().map(|(ts, _, _)| *ts).min() else {
        return (0.0, 0.0);
    };

    let output: u64 = in_window.iter().map(|(_, out, _)| out).sum();
    let cost: f64 = in_window.iter().map(|(_, _, cost)| cost).sum();
    let span_ms = (now - oldest).num_milliseconds().max(MIN_BURN_SPAN_MS);
    let minutes = span_ms as f64 / 60_000.0;

    (output as f64 / minutes, cost / minutes)
}

fn percent_of(value: u64, limit: u64) -> f64 {
    if limit == 0 {
        0.0
    } else {
        value as f64 / limit as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn line(ts: DateTime<Utc>, model: &str, output: u64, cost: f64) -> String {
        format!(
            r#"{{"type":"message","timestamp":"{}","message":{{"role":"assistant","model":"{}","usage":{{"input":10,"output":{},"cacheRead":5,"cost":{{"total":{}}}}}}}}}"#,
            ts.to_rfc3339(),
            model,
            output,
            cost
        )
    }

    #[test]
    fn test_window_aggregation() {
        let temp = tempfile::TempDir::new().unwrap();
        let now = Utc::now();
        let lines = [
            line(now - Duration::minutes(10), "anthropic/claude-opus-4", 8_800, 1.0),
            line(now - Duration::hours(2), "anthropic/claude-sonnet-4", 22_000, 0.5),
            line(now - Duration::hours(6), "anthropic/claude-opus-4", 99_999, 9.0),
            line(now - Duration::minutes(5), "openclaw/delivery-mirror", 1_000, 3.0),
        ];
        fs::write(temp.path().join("s1.jsonl"), lines.join("\n")).unwrap();

        let usage = summarize_usage(temp.path(), now).unwrap();
        assert_eq!(usage.total_calls, 2);
        assert!((usage.total_cost - 1.5).abs() < 1e-9);
        assert_eq!(usage.per_model.len(), 2);
        assert_eq!(usage.per_model[0].model, "claude-sonnet-4");
        assert_eq!(usage.per_model[0].input_tokens, 15);
        assert_eq!(usage.opus_output, 8_800);
        assert!((usage.opus_percent - 10.0).abs() < 1e-9);
        assert!((usage.sonnet_percent - 10.0).abs() < 1e-9);

        // Only the 10-minute-old message is in the burn window.
        assert!((usage.burn_tokens_per_min - 880.0).abs() < 1.0);
        assert!((usage.burn_cost_per_min - 0.1).abs() < 1e-3);
    }

    #[test]
    fn test_burn_span_has_one_minute_floor() {
        let now = Utc::now();
        let (tokens, cost) = burn_rate(&[(now - Duration::seconds(5), 600, 0.6)], now);
        assert!((tokens - 600.0).abs() < 1e-9);
        assert!((cost - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_missing_dir_is_empty_window() {
        let temp = tempfile::TempDir::new().unwrap();
        let usage = summarize_usage(&temp.path().join("absent"), Utc::now()).unwrap();
        assert_eq!(usage, UsageWindow::default());
    }
}

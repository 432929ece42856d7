//! Plain-text rendering of a cache snapshot, for `--once`.

use crate::core::dashboard::{CacheEntry, GatewayStatus, MetricPayload, Role};
use crate::ui::dashboard_tui::{sparkline, staleness_label};
use crate::ui::formatters::{
    fit_width, format_ago, format_bytes, format_cost, format_duration, format_rate,
    format_tokens,
};

const SPARK_WIDTH: usize = 30;

/// One source's block in the text snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotSection {
    pub source_id: String,
    /// `loading`, `unavailable` or `stale (N)`; `None` when fresh.
    pub status: Option<String>,
    pub error: Option<String>,
    pub lines: Vec<String>,
}

/// Describe every entry, in registration order.
pub fn snapshot_sections(entries: &[CacheEntry], now_ms: i64, ascii: bool) -> Vec<SnapshotSection> {
    entries
        .iter()
        .map(|entry| SnapshotSection {
            source_id: entry.source_id.to_string(),
            status: staleness_label(entry),
            error: entry.last_error.clone(),
            lines: entry
                .payload()
                .map(|p| describe_payload(p, now_ms, ascii))
                .unwrap_or_default(),
        })
        .collect()
}

fn describe_payload(payload: &MetricPayload, now_ms: i64, ascii: bool) -> Vec<String> {
    match payload {
        MetricPayload::SystemHealth(h) => {
            let cpu: Vec<f64> = h.cpu_history.iter().map(|v| f64::from(*v)).collect();
            vec![
                format!(
                    "CPU  {:5.1}%  {}",
                    h.cpu_percent,
                    sparkline(&cpu, SPARK_WIDTH, 100.0, ascii)
                ),
                format!(
                    "RAM  {:5.1}%  {} / {}",
                    h.ram_percent,
                    format_bytes(h.ram_used_bytes as f64),
                    format_bytes(h.ram_total_bytes as f64)
                ),
                format!(
                    "Disk {:5.1}%  {} free",
                    h.disk_percent,
                    format_bytes(h.disk_free_bytes as f64)
                ),
                format!(
                    "Load {:.2} {:.2} {:.2}  Up {}",
                    h.load_average.0,
                    h.load_average.1,
                    h.load_average.2,
                    format_duration(h.uptime_secs)
                ),
            ]
        }
        MetricPayload::Gpu(None) => vec!["no supported GPU".to_string()],
        MetricPayload::Gpu(Some(gpu)) => vec![format!(
            "{}: {}% util, {} / {} VRAM",
            gpu.name,
            gpu.utilization_percent,
            format_bytes(gpu.memory_used_bytes as f64),
            format_bytes(gpu.memory_total_bytes as f64)
        )],
        MetricPayload::Gateway(status) => vec![match status {
            GatewayStatus::Online { channels } if channels.is_empty() => "ONLINE".to_string(),
            GatewayStatus::Online { channels } => format!("ONLINE ({})", channels.join(", ")),
            GatewayStatus::Degraded => "DEGRADED".to_string(),
            GatewayStatus::Unknown => "UNKNOWN".to_string(),
            GatewayStatus::Offline => "OFFLINE".to_string(),
        }],
        MetricPayload::Usage(u) => {
            let mut lines = vec![
                format!(
                    "{} calls, {} in the last 5h",
                    u.total_calls,
                    format_cost(u.total_cost)
                ),
                format!(
                    "Burn {} tok/min, {}/min",
                    format_tokens(u.burn_tokens_per_min as u64),
                    format_cost(u.burn_cost_per_min)
                ),
                format!(
                    "Opus {:.0}% ({} out), Sonnet {:.0}% ({} out)",
                    u.opus_percent,
                    format_tokens(u.opus_output),
                    u.sonnet_percent,
                    format_tokens(u.sonnet_output)
                ),
            ];
            lines.extend(u.per_model.iter().map(|m| {
                format!(
                    "  {:<24} {:>7} in {:>7} out {:>8} ({} calls)",
                    m.model,
                    format_tokens(m.input_tokens),
                    format_tokens(m.output_tokens),
                    format_cost(m.cost),
                    m.calls
                )
            }));
            lines
        }
        MetricPayload::Costs(c) => {
            let mut lines = vec![format!(
                "Today {}  Week {}  All-time {}",
                format_cost(c.today),
                format_cost(c.week),
                format_cost(c.total)
            )];
            lines.extend(
                c.per_model
                    .iter()
                    .map(|(model, cost)| format!("  {:<24} {}", model, format_cost(*cost))),
            );
            lines.extend(
                c.per_day
                    .iter()
                    .map(|(day, cost)| format!("  {} {}", day, format_cost(*cost))),
            );
            lines
        }
        MetricPayload::Sessions(sessions) if sessions.is_empty() => vec!["no sessions".to_string()],
        MetricPayload::Sessions(sessions) => sessions
            .iter()
            .map(|s| {
                format!(
                    "{} {} {:>7} {} {}",
                    fit_width(&s.label, 16),
                    fit_width(&s.model, 20),
                    format_tokens(s.tokens),
                    fit_width(&s.channel, 10),
                    format_ago(s.updated_at_ms, now_ms)
                )
            })
            .collect(),
        MetricPayload::Crons(jobs) if jobs.is_empty() => vec!["no cron jobs".to_string()],
        MetricPayload::Crons(jobs) => jobs
            .iter()
            .map(|j| {
                format!(
                    "{} {} {} {:<8} {}",
                    if j.enabled { "+" } else { "-" },
                    fit_width(&j.name, 20),
                    fit_width(&j.schedule, 14),
                    j.last_status,
                    format_ago(j.last_run_ms, now_ms)
                )
            })
            .collect(),
        MetricPayload::LiveFeed(feed) if feed.is_empty() => {
            vec!["no messages in the last hour".to_string()]
        }
        MetricPayload::LiveFeed(feed) => feed
            .iter()
            .map(|m| {
                let role = match m.role {
                    Role::User => "user",
                    Role::Assistant => "asst",
                };
                format!(
                    "{} {} {:<4} {}",
                    format_ago(m.timestamp_ms, now_ms),
                    m.session,
                    role,
                    m.content
                )
            })
            .collect(),
        MetricPayload::Processes(procs) => procs
            .iter()
            .map(|p| {
                format!(
                    "{:>7} {} {:5.1}% cpu {:5.1}% mem",
                    p.pid,
                    fit_width(&p.name, 20),
                    p.cpu_percent,
                    p.memory_percent
                )
            })
            .collect(),
        MetricPayload::Network(n) => vec![
            format!(
                "Up {} (peak {})  Down {} (peak {})",
                format_rate(n.up_bytes_per_sec),
                format_rate(n.peak_up),
                format_rate(n.down_bytes_per_sec),
                format_rate(n.peak_down)
            ),
            format!(
                "Total sent {}  received {}",
                format_bytes(n.total_sent_bytes as f64),
                format_bytes(n.total_received_bytes as f64)
            ),
        ],
        MetricPayload::Gauge(v) => vec![format!("{:.2}", v)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dashboard::{CronJob, MetricValue, SnapshotCache, SourceId};
    use std::time::Instant;

    #[test]
    fn test_sections_follow_entry_state() {
        let cache = SnapshotCache::new(["gateway", "crons", "gpu"].map(SourceId::new)).unwrap();
        let t0 = Instant::now();
        cache.update(
            "gateway",
            MetricValue::success(
                MetricPayload::Gateway(GatewayStatus::Online {
                    channels: vec!["telegram".into()],
                }),
                t0,
            ),
        );
        cache.update("crons", MetricValue::failure_message("bad json", t0));

        let sections = snapshot_sections(&cache.get_all(), 0, true);
        assert_eq!(sections.len(), 3);

        assert_eq!(sections[0].source_id, "gateway");
        assert_eq!(sections[0].status, None);
        assert_eq!(sections[0].lines, vec!["ONLINE (telegram)".to_string()]);

        assert_eq!(sections[1].status.as_deref(), Some("unavailable"));
        assert_eq!(sections[1].error.as_deref(), Some("bad json"));
        assert!(sections[1].lines.is_empty());

        assert_eq!(sections[2].status.as_deref(), Some("loading"));
    }

    #[test]
    fn test_cron_lines() {
        let lines = describe_payload(
            &MetricPayload::Crons(vec![CronJob {
                id: "abc".into(),
                name: "digest".into(),
                schedule: "0 9 * * *".into(),
                enabled: false,
                last_run_ms: 0,
                last_status: "unknown".into(),
            }]),
            1_000,
            false,
        );
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("- digest"));
        assert!(lines[0].ends_with("never"));
    }
}

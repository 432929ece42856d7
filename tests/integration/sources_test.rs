use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use clawtop::core::dashboard::sources::{
    CostsSource, CronsSource, LiveFeedSource, SessionsSource, UsageSource,
};
use clawtop::core::dashboard::{
    collect_once, EntryState, MetricPayload, MetricSource, Role, SnapshotCache,
};
use clawtop::ui::snapshot_sections;
use clawtop::DashboardConfig;
use tempfile::TempDir;

fn config_for(root: &Path) -> DashboardConfig {
    let dir = root.to_string_lossy().into_owned();
    DashboardConfig::resolve(
        |key| (key == "OPENCLAW_DIR").then(|| dir.clone()),
        Some(root.to_path_buf()),
        Some(root.to_path_buf()),
    )
    .unwrap()
}

fn file_sources(config: &DashboardConfig) -> Vec<MetricSource> {
    let dir = config.sessions_dir();
    let every = Duration::from_secs(2);
    vec![
        MetricSource::new("usage", every, Arc::new(UsageSource::new(&dir))),
        MetricSource::new("costs", every, Arc::new(CostsSource::new(&dir))),
        MetricSource::new("sessions", every, Arc::new(SessionsSource::new(config.sessions_file()))),
        MetricSource::new("crons", every, Arc::new(CronsSource::new(config.cron_file()))),
        MetricSource::new("live_feed", every, Arc::new(LiveFeedSource::new(&dir))),
    ]
}

fn payload(cache: &SnapshotCache, id: &str) -> MetricPayload {
    cache.get(id).unwrap().payload().cloned().unwrap()
}

fn write_fixture(config: &DashboardConfig) {
    let sessions_dir = config.sessions_dir();
    fs::create_dir_all(&sessions_dir).unwrap();
    fs::create_dir_all(config.cron_file().parent().unwrap()).unwrap();

    let now = Utc::now();
    fs::write(
        config.sessions_file(),
        format!(
            r#"{{
                "agent:main:main": {{"model": "anthropic/claude-opus-4", "totalTokens": 12345, "updatedAt": {}, "channel": "telegram"}},
                "agent:main:cron:abcdef123456": {{"label": "digest", "updatedAt": 1}}
            }}"#,
            now.timestamp_millis()
        ),
    )
    .unwrap();

    fs::write(
        config.cron_file(),
        r#"{"jobs": [{"id": "0123456789", "name": "digest", "schedule": {"expr": "0 9 * * *"},
                      "state": {"lastRunAtMs": 5, "lastStatus": "ok"}}]}"#,
    )
    .unwrap();

    let ts = (now - chrono::Duration::minutes(10)).to_rfc3339_opts(SecondsFormat::Millis, true);
    let transcript = [
        format!(
            r#"{{"type":"message","timestamp":"{}","message":{{"role":"user","content":"status?"}}}}"#,
            ts
        ),
        format!(
            r#"{{"type":"message","timestamp":"{}","message":{{"role":"assistant","model":"anthropic/claude-opus-4","content":[{{"type":"text","text":"all good"}}],"usage":{{"input":100,"output":400,"cost":{{"total":0.25}}}}}}}}"#,
            ts
        ),
        "not json".to_string(),
    ];
    fs::write(sessions_dir.join("a1b2c3d4e5f6.jsonl"), transcript.join("\n")).unwrap();
}

#[test]
fn test_empty_openclaw_dir_gives_empty_panels() {
    let temp_dir = TempDir::new().unwrap();
    let config = config_for(temp_dir.path());

    let cache = collect_once(file_sources(&config)).unwrap();
    for entry in cache.get_all() {
        assert_eq!(entry.state(), EntryState::Fresh, "{}", entry.source_id);
    }
    assert_eq!(payload(&cache, "sessions"), MetricPayload::Sessions(Vec::new()));
    assert_eq!(payload(&cache, "crons"), MetricPayload::Crons(Vec::new()));
    assert_eq!(payload(&cache, "live_feed"), MetricPayload::LiveFeed(Vec::new()));
}

#[test]
fn test_fixture_collection() {
    let temp_dir = TempDir::new().unwrap();
    let config = config_for(temp_dir.path());
    write_fixture(&config);

    let cache = collect_once(file_sources(&config)).unwrap();

    let MetricPayload::Sessions(sessions) = payload(&cache, "sessions") else {
        panic!("expected sessions");
    };
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].label, "main");
    assert_eq!(sessions[0].model, "claude-opus-4");
    assert_eq!(sessions[1].label, "digest");

    let MetricPayload::Crons(jobs) = payload(&cache, "crons") else {
        panic!("expected crons");
    };
    assert_eq!(jobs[0].id, "01234567");
    assert_eq!(jobs[0].schedule, "0 9 * * *");
    assert!(jobs[0].enabled);

    let MetricPayload::Usage(usage) = payload(&cache, "usage") else {
        panic!("expected usage");
    };
    assert_eq!(usage.opus_output, 400);
    assert!((usage.total_cost - 0.25).abs() < 1e-9);

    let MetricPayload::Costs(costs) = payload(&cache, "costs") else {
        panic!("expected costs");
    };
    assert!((costs.total - 0.25).abs() < 1e-9);

    let MetricPayload::LiveFeed(feed) = payload(&cache, "live_feed") else {
        panic!("expected live feed");
    };
    assert_eq!(feed.len(), 2);
    assert!(feed.iter().any(|m| m.role == Role::Assistant && m.content == "all good"));
    assert!(feed.iter().all(|m| m.session == "a1b2c3d4"));
}

#[test]
fn test_corrupt_files_fail_without_touching_other_sources() {
    let temp_dir = TempDir::new().unwrap();
    let config = config_for(temp_dir.path());
    write_fixture(&config);
    fs::write(config.cron_file(), "{ not json").unwrap();

    let cache = collect_once(file_sources(&config)).unwrap();
    let crons = cache.get("crons").unwrap();
    assert_eq!(crons.state(), EntryState::Unavailable);
    assert!(crons.last_error.is_some());
    assert_eq!(cache.get("sessions").unwrap().state(), EntryState::Fresh);

    let sections = snapshot_sections(&cache.get_all(), Utc::now().timestamp_millis(), true);
    let crons = sections.iter().find(|s| s.source_id == "crons").unwrap();
    assert_eq!(crons.status.as_deref(), Some("unavailable"));
    let sessions = sections.iter().find(|s| s.source_id == "sessions").unwrap();
    assert!(sessions.lines[0].starts_with("main"));
    assert!(sessions.lines[0].contains("12.3K"));
}

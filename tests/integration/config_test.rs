use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clawtop::core::dashboard::default_sources;
use clawtop::core::dashboard::registry::{CRONS, GATEWAY, LIVE_FEED, NETWORK, SESSIONS, SYSTEM};
use clawtop::DashboardConfig;
use tempfile::TempDir;

fn resolve_with(vars: &[(&str, &str)], home: &Path) -> DashboardConfig {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    DashboardConfig::resolve(
        |key| vars.get(key).cloned(),
        Some(home.to_path_buf()),
        Some(PathBuf::from("/cwd")),
    )
    .unwrap()
}

#[test]
fn test_config_default_layout() {
    let temp_dir = TempDir::new().unwrap();
    let config = resolve_with(&[], temp_dir.path());

    assert_eq!(config.openclaw_dir, temp_dir.path().join(".openclaw"));
    assert_eq!(config.workspace_dir, PathBuf::from("/cwd"));
    assert_eq!(
        config.sessions_file(),
        temp_dir
            .path()
            .join(".openclaw/agents/main/sessions/sessions.json")
    );
    // Nothing on disk yet is fine
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_blank_variables_are_ignored() {
    let temp_dir = TempDir::new().unwrap();
    let config = resolve_with(&[("OPENCLAW_DIR", "  "), ("OPENCLAW_AGENT", "")], temp_dir.path());
    assert_eq!(config.openclaw_dir, temp_dir.path().join(".openclaw"));
    assert_eq!(config.agent_id, "main");
}

#[test]
fn test_overrides_reach_registered_sources() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = resolve_with(
        &[("OPENCLAW_DIR", temp_dir.path().to_str().unwrap())],
        temp_dir.path(),
    );
    config.intervals.apply_override("crons=60").unwrap();
    config.intervals.apply_override("network=0.5").unwrap();

    let sources = default_sources(&config).unwrap();
    let ids: Vec<&str> = sources.iter().map(|s| s.id().as_str()).collect();
    assert_eq!(ids.len(), 10);
    assert_eq!(ids[0], SYSTEM);
    assert!(ids.contains(&GATEWAY));
    assert!(ids.contains(&LIVE_FEED));

    let interval = |id: &str| {
        sources
            .iter()
            .find(|s| s.id() == id)
            .map(|s| s.interval())
            .unwrap()
    };
    assert_eq!(interval(CRONS), Duration::from_secs(60));
    assert_eq!(interval(NETWORK), Duration::from_millis(500));
    assert_eq!(interval(SESSIONS), Duration::from_secs(10));
}

#[test]
fn test_bad_override_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = resolve_with(&[], temp_dir.path());
    let err = config.intervals.apply_override("weather=5").unwrap_err();
    assert!(err.to_string().contains("weather"));
    assert!(err.is_fatal());
}

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};

use super::{short_model_name, truncate_chars};
use crate::core::dashboard::{DataSource, MetricPayload, SessionInfo};
use crate::error::Result;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSession {
    label: Option<String>,
    model_override: Option<String>,
    model: Option<String>,
    total_tokens: Option<u64>,
    context_tokens: Option<u64>,
    updated_at: Option<i64>,
    channel: Option<String>,
    session_id: Option<String>,
}

/// Session list from `sessions.json`, most recently updated first.
#[derive(Debug, Clone)]
pub struct SessionsSource {
    sessions_file: PathBuf,
}

impl SessionsSource {
    pub fn new(sessions_file: impl Into<PathBuf>) -> Self {
        Self {
            sessions_file: sessions_file.into(),
        }
    }
}

impl DataSource for SessionsSource {
    fn fetch(&self) -> Result<MetricPayload> {
        load_sessions(&self.sessions_file).map(MetricPayload::Sessions)
    }
}

/// Read and sort the session index. A missing file means no sessions yet.
pub fn load_sessions(path: &Path) -> Result<Vec<SessionInfo>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let index: Map<String, Value> = serde_json::from_str(&text)?;
    let mut sessions: Vec<SessionInfo> = index
        .into_iter()
        .filter_map(|(key, value)| match serde_json::from_value::<RawSession>(value) {
            Ok(raw) => Some(to_session(key, raw)),
            Err(e) => {
                log::debug!("Skipping malformed session '{}': {}", key, e);
                None
            }
        })
        .collect();

    sessions.sort_by(|a, b| b.updated_at_ms.cmp(&a.updated_at_ms));
    Ok(sessions)
}

fn to_session(key: String, raw: RawSession) -> SessionInfo {
    let label = session_label(&key, raw.label.as_deref());
    let model = raw
        .model_override
        .filter(|m| !m.is_empty())
        .or(raw.model.filter(|m| !m.is_empty()))
        .map(|m| short_model_name(&m))
        .unwrap_or_else(|| "-".to_string());

    SessionInfo {
        label,
        model,
        tokens: raw.total_tokens.unwrap_or(0),
        context_tokens: raw.context_tokens.unwrap_or(0),
        updated_at_ms: raw.updated_at.unwrap_or(0),
        channel: raw.channel.unwrap_or_else(|| "-".to_string()),
        session_id: raw.session_id.unwrap_or_else(|| key.clone()),
        key,
    }
}

/// Friendly name for a session key such as `agent:main:main` or
/// `agent:main:cron:1a2b3c4d5e`.
pub fn session_label(key: &str, label: Option<&str>) -> String {
    let last_segment = key.rsplit(':').next().unwrap_or(key);

    if key.contains(":main:main") {
        "main".to_string()
    } else if let Some((_, after)) = key.split_once("cron:") {
        label
            .map(str::to_string)
            .unwrap_or_else(|| format!("cron-{}", truncate_chars(after, 8)))
    } else if key.contains("subagent") {
        format!("sub-{}", truncate_chars(last_segment, 8))
    } else {
        label
            .map(str::to_string)
            .unwrap_or_else(|| truncate_chars(last_segment, 12))
    }
}

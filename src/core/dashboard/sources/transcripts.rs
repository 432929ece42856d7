//! Reader for OpenClaw session transcripts (`<sessions>/*.jsonl`).
//!
//! Each line is a JSON record; only `"type": "message"` records matter here.
//! Lines that fail to parse are skipped, as the agent may be appending to the
//! file while we read it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use super::short_model_name;
use crate::error::Result;

/// Messages produced by the delivery mirror are copies and are not counted.
const MIRROR_MODEL_MARKER: &str = "delivery-mirror";

#[derive(Debug, Deserialize)]
struct RawLine {
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    message: Option<RawMessage>,
}

#[derive(Debug, Default, Deserialize)]
struct RawMessage {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Option<RawUsage>,
    #[serde(default)]
    content: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawUsage {
    #[serde(default)]
    input: u64,
    #[serde(default)]
    output: u64,
    #[serde(default)]
    cache_read: u64,
    #[serde(default)]
    cache_write: u64,
    #[serde(default)]
    cost: Option<RawCost>,
}

#[derive(Debug, Default, Deserialize)]
struct RawCost {
    #[serde(default)]
    total: f64,
}

/// One `message` record from a transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptMessage {
    /// Timestamp string as written, e.g. `2026-10-18T09:15:00.000Z`.
    pub timestamp_raw: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub role: String,
    /// Short model name (last path segment), `unknown` when absent.
    pub model: String,
    /// Prompt tokens including cache reads and writes.
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost: f64,
    pub content: Option<Value>,
}

impl TranscriptMessage {
    pub fn is_mirror(&self) -> bool {
        self.model.contains(MIRROR_MODEL_MARKER)
    }

    /// `YYYY-MM-DD` prefix of the raw timestamp.
    pub fn day(&self) -> &str {
        self.timestamp_raw.get(..10).unwrap_or(&self.timestamp_raw)
    }
}

/// A transcript file and its modification time.
#[derive(Debug, Clone)]
pub struct TranscriptFile {
    pub path: PathBuf,
    pub modified: SystemTime,
}

impl TranscriptFile {
    pub fn modified_utc(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from(self.modified)
    }

    /// First eight characters of the file stem, used as a session tag.
    pub fn session_tag(&self) -> String {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        super::truncate_chars(&stem, 8)
    }

    /// All message records in the file; unreadable lines are skipped.
    pub fn messages(&self) -> io::Result<Vec<TranscriptMessage>> {
        let content = fs::read_to_string(&self.path)?;
        Ok(content.lines().filter_map(parse_line).collect())
    }

    /// Message records among the last `n` lines of the file.
    pub fn tail_messages(&self, n: usize) -> io::Result<Vec<TranscriptMessage>> {
        let content = fs::read_to_string(&self.path)?;
        let lines: Vec<&str> = content.lines().collect();
        let start = lines.len().saturating_sub(n);
        Ok(lines[start..].iter().copied().filter_map(parse_line).collect())
    }
}

/// List `*.jsonl` files in `dir`. A missing directory yields an empty list.
pub fn list_transcripts(dir: &Path) -> Result<Vec<TranscriptFile>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("jsonl") {
            continue;
        }
        // Files can vanish between listing and stat; skip them.
        match entry.metadata().and_then(|m| m.modified()) {
            Ok(modified) => files.push(TranscriptFile { path, modified }),
            Err(e) => log::debug!("Skipping transcript {}: {}", path.display(), e),
        }
    }

    Ok(files)
}

/// Parse one JSONL line, returning it only if it is a message record.
pub fn parse_line(line: &str) -> Option<TranscriptMessage> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let raw: RawLine = serde_json::from_str(line).ok()?;
    if raw.kind.as_deref() != Some("message") {
        return None;
    }

    let message = raw.message.unwrap_or_default();
    let usage = message.usage.unwrap_or_default();
    let timestamp_raw = raw.timestamp.unwrap_or_default();

    Some(TranscriptMessage {
        timestamp: parse_timestamp(&timestamp_raw),
        timestamp_raw,
        role: message.role.unwrap_or_default(),
        model: short_model_name(message.model.as_deref().unwrap_or("unknown")),
        input_tokens: usage.input + usage.cache_read + usage.cache_write,
        output_tokens: usage.output,
        cost: usage.cost.map(|c| c.total).unwrap_or(0.0),
        content: message.content,
    })
}

/// ISO-8601 with offset or `Z`; naive timestamps are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_message_line() {
        let line = r#"{"type":"message","timestamp":"2026-10-18T09:15:00.000Z","message":{"role":"assistant","model":"anthropic/claude-sonnet-4","usage":{"input":100,"output":50,"cacheRead":1000,"cacheWrite":10,"cost":{"total":0.25}}}}"#;
        let msg = parse_line(line).unwrap();
        assert_eq!(msg.role, "assistant");
        assert_eq!(msg.model, "claude-sonnet-4");
        assert_eq!(msg.input_tokens, 1110);
        assert_eq!(msg.output_tokens, 50);
        assert_eq!(msg.cost, 0.25);
        assert_eq!(msg.day(), "2026-10-18");
        assert_eq!(
            msg.timestamp.unwrap().to_rfc3339(),
            "2026-10-18T09:15:00+00:00"
        );
    }

    #[test]
    fn test_non_message_and_garbage_lines_skipped() {
        assert!(parse_line(r#"{"type":"session","id":"x"}"#).is_none());
        assert!(parse_line("not json").is_none());
        assert!(parse_line("   ").is_none());
    }

    #[test]
    fn test_missing_model_and_usage() {
        let msg = parse_line(r#"{"type":"message","timestamp":"2026-10-18T09:15:00Z","message":{"role":"user","content":"hi"}}"#).unwrap();
        assert_eq!(msg.model, "unknown");
        assert_eq!(msg.output_tokens, 0);
        assert_eq!(msg.cost, 0.0);
        assert_eq!(msg.content, Some(Value::String("hi".into())));
    }

    #[test]
    fn test_mirror_detection() {
        let msg = parse_line(r#"{"type":"message","message":{"model":"openclaw/delivery-mirror"}}"#).unwrap();
        assert!(msg.is_mirror());
        assert!(msg.timestamp.is_none());
    }

    #[test]
    fn test_parse_timestamp_variants() {
        assert!(parse_timestamp("2026-10-18T09:15:00+02:00").is_some());
        assert!(parse_timestamp("2026-10-18T09:15:00.123").is_some());
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn test_list_transcripts_filters_extension() {
        let temp = tempfile::TempDir::new().unwrap();
        fs::write(temp.path().join("a.jsonl"), "").unwrap();
        fs::write(temp.path().join("sessions.json"), "{}").unwrap();
        let files = list_transcripts(temp.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].session_tag(), "a");

        assert!(list_transcripts(&temp.path().join("missing")).unwrap().is_empty());
    }
}

use std::cmp::Reverse;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use super::transcripts::{list_transcripts, TranscriptMessage};
use super::truncate_chars;
use crate::core::dashboard::{DataSource, FeedMessage, MetricPayload, Role};
use crate::error::Result;

pub const FEED_LIMIT: usize = 15;

const RECENT_FILES: usize = 10;
const TAIL_LINES: usize = 50;
const MAX_CONTENT_CHARS: usize = 150;
const MAX_AGE: Duration = Duration::hours(1);

/// Latest user and assistant messages across recent sessions.
#[derive(Debug, Clone)]
pub struct LiveFeedSource {
    sessions_dir: PathBuf,
    limit: usize,
}

impl LiveFeedSource {
    pub fn new(sessions_dir: impl Into<PathBuf>) -> Self {
        Self {
            sessions_dir: sessions_dir.into(),
            limit: FEED_LIMIT,
        }
    }
}

impl DataSource for LiveFeedSource {
    fn fetch(&self) -> Result<MetricPayload> {
        recent_messages(&self.sessions_dir, Utc::now(), self.limit).map(MetricPayload::LiveFeed)
    }
}

/// Messages from the last hour, newest first, at most `limit`.
pub fn recent_messages(
    sessions_dir: &Path,
    now: DateTime<Utc>,
    limit: usize,
) -> Result<Vec<FeedMessage>> {
    let mut files = list_transcripts(sessions_dir)?;
    files.sort_by_key(|f| Reverse(f.modified));
    files.truncate(RECENT_FILES);

    let mut feed = Vec::new();
    for file in &files {
        let messages = match file.tail_messages(TAIL_LINES) {
            Ok(messages) => messages,
            Err(e) => {
                log::debug!("Skipping transcript {}: {}", file.path.display(), e);
                continue;
            }
        };
        let session = file.session_tag();

        for msg in messages {
            if let Some(entry) = to_feed_message(&msg, now, &session) {
                feed.push(entry);
            }
        }
    }

    feed.sort_by_key(|m| Reverse(m.timestamp_ms));
    feed.truncate(limit);
    Ok(feed)
}

fn to_feed_message(msg: &TranscriptMessage, now: DateTime<Utc>, session: &str) -> Option<FeedMessage> {
    let role = match msg.role.as_str() {
        "user" => Role::User,
        "assistant" => Role::Assistant,
        _ => return None,
    };
    let ts = msg.timestamp?;
    if now - ts > MAX_AGE {
        return None;
    }

    let text = msg.content.as_ref().map(content_text).unwrap_or_default();
    let flat = text.replace('\n', " ");

    Some(FeedMessage {
        timestamp_ms: ts.timestamp_millis(),
        role,
        content: truncate_chars(&flat, MAX_CONTENT_CHARS),
        session: session.to_string(),
    })
}

/// Plain string content, or the first `text` block of structured content.
fn content_text(content: &Value) -> String {
    match content {
        Value::String(s) => s.clone(),
        Value::Array(blocks) => blocks
            .iter()
            .find(|b| b.get("type").and_then(Value::as_str) == Some("text"))
            .and_then(|b| b.get("text").and_then(Value::as_str))
            .map(str::to_string)
            .or_else(|| blocks.first().map(Value::to_string))
            .unwrap_or_default(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    fn record(ts: DateTime<Utc>, role: &str, content: Value) -> String {
        json!({
            "type": "message",
            "timestamp": ts.to_rfc3339(),
            "message": {"role": role, "content": content}
        })
        .to_string()
    }

    #[test]
    fn test_feed_filters_and_orders() {
        let temp = tempfile::TempDir::new().unwrap();
        let now = Utc::now();
        let lines = [
            record(now - Duration::minutes(30), "user", json!("hello\nthere")),
            record(
                now - Duration::minutes(10),
                "assistant",
                json!([{"type": "tool_use", "id": "x"}, {"type": "text", "text": "done"}]),
            ),
            record(now - Duration::minutes(5), "toolResult", json!("ignored")),
            record(now - Duration::hours(2), "user", json!("too old")),
        ];
        fs::write(temp.path().join("abcdef0123456.jsonl"), lines.join("\n")).unwrap();

        let feed = recent_messages(temp.path(), now, FEED_LIMIT).unwrap();
        assert_eq!(feed.len(), 2);
        assert_eq!(feed[0].role, Role::Assistant);
        assert_eq!(feed[0].content, "done");
        assert_eq!(feed[0].session, "abcdef01");
        assert_eq!(feed[1].content, "hello there");
    }

    #[test]
    fn test_content_truncated_and_limit_applied() {
        let temp = tempfile::TempDir::new().unwrap();
        let now = Utc::now();
        let long = "x".repeat(400);
        let lines: Vec<String> = (0..20)
            .map(|i| record(now - Duration::seconds(i), "user", json!(long)))
            .collect();
        fs::write(temp.path().join("s.jsonl"), lines.join("\n")).unwrap();

        let feed = recent_messages(temp.path(), now, FEED_LIMIT).unwrap();
        assert_eq!(feed.len(), FEED_LIMIT);
        assert!(feed.iter().all(|m| m.content.chars().count() == 150));
        assert!(feed.windows(2).all(|w| w[0].timestamp_ms >= w[1].timestamp_ms));
    }

    #[test]
    fn test_only_tail_lines_are_read() {
        let temp = tempfile::TempDir::new().unwrap();
        let now = Utc::now();
        let mut lines = vec![record(now, "user", json!("early"))];
        lines.extend((0..TAIL_LINES).map(|_| r#"{"type":"custom"}"#.to_string()));
        fs::write(temp.path().join("s.jsonl"), lines.join("\n")).unwrap();

        assert!(recent_messages(temp.path(), now, FEED_LIMIT).unwrap().is_empty());
    }

    #[test]
    fn test_content_text_fallbacks() {
        assert_eq!(content_text(&json!([{"type": "image"}])), r#"{"type":"image"}"#);
        assert_eq!(content_text(&json!([])), "");
        assert_eq!(content_text(&Value::Null), "");
    }
}

//! Human-readable units shared by the TUI and the plain-text snapshot.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Format bytes with one decimal, 1024-based (`512.0B`, `1.5KB`, `2.0GB`).
pub fn format_bytes(bytes: f64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    let mut value = bytes;
    for unit in UNITS {
        if value.abs() < 1024.0 {
            return format!("{:.1}{}", value, unit);
        }
        value /= 1024.0;
    }
    format!("{:.1}PB", value)
}

/// Format a byte rate, e.g. `1.5KB/s`.
pub fn format_rate(bytes_per_sec: f64) -> String {
    format!("{}/s", format_bytes(bytes_per_sec))
}

/// Format a token count (`950`, `1.2K`, `3.4M`).
pub fn format_tokens(tokens: u64) -> String {
    if tokens >= 1_000_000 {
        format!("{:.1}M", tokens as f64 / 1_000_000.0)
    } else if tokens >= 1_000 {
        format!("{:.1}K", tokens as f64 / 1_000.0)
    } else {
        tokens.to_string()
    }
}

/// Dollars: two decimals from $1 up, three below.
pub fn format_cost(cost: f64) -> String {
    if cost >= 1.0 {
        format!("${:.2}", cost)
    } else {
        format!("${:.3}", cost)
    }
}

/// Relative age of a unix-millisecond timestamp; `0` means never.
pub fn format_ago(ts_ms: i64, now_ms: i64) -> String {
    if ts_ms == 0 {
        return "never".to_string();
    }

    let secs = (now_ms - ts_ms) / 1000;
    if secs < 60 {
        "just now".to_string()
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else if secs < 86_400 {
        format!("{}h ago", secs / 3600)
    } else {
        format!("{}d ago", secs / 86_400)
    }
}

/// Format duration in seconds to human-readable format
pub fn format_duration(secs: u64) -> String {
    let days = secs / 86400;
    let hours = (secs % 86400) / 3600;
    let minutes = (secs % 3600) / 60;

    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

/// Pad or cut `text` to exactly `width` terminal columns.
///
/// Cut text ends in `...`. Wide characters count as two columns.
pub fn fit_width(text: &str, width: usize) -> String {
    let text_width = text.width();
    if text_width <= width {
        return format!("{}{}", text, " ".repeat(width - text_width));
    }

    let budget = width.saturating_sub(3);
    let mut out = String::new();
    let mut used = 0usize;
    for ch in text.chars() {
        let cw = ch.width().unwrap_or(0);
        if used + cw > budget {
            break;
        }
        out.push(ch);
        used += cw;
    }
    out.push_str(&".".repeat(width.min(3)));
    used += width.min(3);
    out.push_str(&" ".repeat(width.saturating_sub(used)));
    out
}

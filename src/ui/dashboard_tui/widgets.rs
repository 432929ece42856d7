use ratatui::{prelude::*, widgets::Gauge};

use crate::core::dashboard::{CacheEntry, EntryState};

const SPARK_UNICODE: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const SPARK_ASCII: [char; 8] = ['_', '.', 'o', 'O', '0', '8', '@', '#'];

/// Green below 50%, yellow below 80%, red above.
pub fn usage_color(percent: f64) -> Color {
    match percent {
        p if p < 50.0 => Color::Green,
        p if p < 80.0 => Color::Yellow,
        _ => Color::Red,
    }
}

/// Create a gauge with color based on value thresholds
pub fn colored_gauge(percent: f64, label: String) -> Gauge<'static> {
    Gauge::default()
        .gauge_style(Style::default().fg(usage_color(percent)).bg(Color::Black))
        .ratio((percent / 100.0).clamp(0.0, 1.0))
        .label(label)
}

/// Fixed-width sparkline of the newest `width` values, scaled to `max_cap`.
///
/// Shorter histories are padded on the left so new samples enter on the
/// right.
pub fn sparkline(values: &[f64], width: usize, max_cap: f64, ascii: bool) -> String {
    let chars = if ascii { &SPARK_ASCII } else { &SPARK_UNICODE };
    let recent = &values[values.len().saturating_sub(width)..];

    let mut line = String::with_capacity(width * 3);
    for _ in recent.len()..width {
        line.push(chars[0]);
    }
    for value in recent {
        let normalized = if max_cap > 0.0 {
            (value / max_cap).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let idx = ((normalized * 7.99) as usize).min(7);
        line.push(chars[idx]);
    }
    line
}

/// `███░░░ 42%` style bar.
pub fn percent_bar(percent: f64, width: usize) -> Line<'static> {
    let filled = ((width as f64 * percent.clamp(0.0, 100.0) / 100.0) as usize).min(width);
    let color = usage_color(percent);

    Line::from(vec![
        Span::styled("█".repeat(filled), Style::default().fg(color)),
        Span::styled("░".repeat(width - filled), Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!(" {:.0}%", percent),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
    ])
}

/// Short suffix describing an entry's freshness, empty when fresh.
pub fn staleness_label(entry: &CacheEntry) -> Option<String> {
    match entry.state() {
        EntryState::Pending => Some("loading".to_string()),
        EntryState::Fresh => None,
        EntryState::Stale { failures } => Some(format!("stale ({})", failures)),
        EntryState::Unavailable => Some("unavailable".to_string()),
    }
}

/// Panel title with the freshness of every entry it shows.
pub fn panel_title(name: &str, entries: &[Option<&CacheEntry>]) -> Line<'static> {
    let mut spans = vec![Span::styled(
        format!(" {} ", name),
        Style::default().add_modifier(Modifier::BOLD),
    )];

    for entry in entries.iter().flatten() {
        if let Some(label) = staleness_label(entry) {
            let color = match entry.state() {
                EntryState::Pending => Color::DarkGray,
                EntryState::Stale { .. } => Color::Yellow,
                _ => Color::Red,
            };
            spans.push(Span::styled(
                format!("[{}: {}] ", entry.source_id, label),
                Style::default().fg(color),
            ));
        }
    }

    Line::from(spans)
}

/// Helper function to create a centered rect
pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dashboard::{MetricPayload, MetricValue, SnapshotCache, SourceId};
    use std::time::Instant;

    #[test]
    fn test_usage_color_thresholds() {
        assert_eq!(usage_color(49.9), Color::Green);
        assert_eq!(usage_color(50.0), Color::Yellow);
        assert_eq!(usage_color(80.0), Color::Red);
    }

    #[test]
    fn test_sparkline_pads_left_and_scales() {
        assert_eq!(sparkline(&[], 4, 100.0, true), "____");
        assert_eq!(sparkline(&[100.0, 50.0], 4, 100.0, true), "__#O");
        assert_eq!(sparkline(&[0.0, 250.0], 2, 100.0, false), "▁█");
    }

    #[test]
    fn test_sparkline_keeps_newest() {
        let values: Vec<f64> = (0..10).map(|v| v as f64).collect();
        let line = sparkline(&values, 3, 9.0, true);
        assert_eq!(line.chars().count(), 3);
        assert!(line.ends_with('#'));
    }

    #[test]
    fn test_percent_bar_width() {
        let line = percent_bar(150.0, 10);
        assert_eq!(line.spans[0].content.chars().count(), 10);
        assert_eq!(line.spans[1].content.chars().count(), 0);

        let line = percent_bar(30.0, 10);
        assert_eq!(line.spans[0].content.chars().count(), 3);
        assert_eq!(line.spans[2].content, " 30%");
    }

    #[test]
    fn test_staleness_labels() {
        let cache = SnapshotCache::new([SourceId::new("a")]).unwrap();
        let t0 = Instant::now();
        assert_eq!(staleness_label(&cache.get("a").unwrap()).as_deref(), Some("loading"));

        cache.update("a", MetricValue::failure_message("down", t0));
        assert_eq!(
            staleness_label(&cache.get("a").unwrap()).as_deref(),
            Some("unavailable")
        );

        cache.update("a", MetricValue::success(MetricPayload::Gauge(1.0), t0));
        assert_eq!(staleness_label(&cache.get("a").unwrap()), None);

        cache.update("a", MetricValue::failure_message("down", t0));
        cache.update("a", MetricValue::failure_message("down", t0));
        assert_eq!(
            staleness_label(&cache.get("a").unwrap()).as_deref(),
            Some("stale (2)")
        );
    }
}

use chrono::{DateTime, Local, Utc};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap},
};

use super::app::DashboardApp;
use super::widgets::{centered_rect, colored_gauge, panel_title, percent_bar, sparkline, usage_color};
use crate::core::dashboard::registry::{
    COSTS, CRONS, GATEWAY, GPU, LIVE_FEED, NETWORK, PROCESSES, SESSIONS, SYSTEM, USAGE,
};
use crate::core::dashboard::{
    CacheEntry, CostSummary, CronJob, FeedMessage, GatewayStatus, GpuStats, MetricPayload,
    NetworkStats, ProcessInfo, Role, SessionInfo, SystemHealth, UsageWindow,
};
use crate::ui::formatters::{
    format_ago, format_bytes, format_cost, format_duration, format_rate, format_tokens,
};

const SPARK_WIDTH: usize = 16;
const BAR_WIDTH: usize = 16;

/// Main render function
pub fn render_ui(frame: &mut Frame, app: &DashboardApp) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header
            Constraint::Min(10),   // Panels
            Constraint::Length(1), // Footer
        ])
        .split(area);

    render_header(frame, chunks[0], app);
    render_grid(frame, chunks[1], app);
    render_footer(frame, chunks[2]);

    if app.show_help {
        render_help_overlay(frame, area);
    }
}

fn render_header(frame: &mut Frame, area: Rect, app: &DashboardApp) {
    let degraded = app.entries.iter().filter(|e| e.is_stale()).count();
    let status = if degraded == 0 {
        Span::styled("all sources ok", Style::default().fg(Color::Green))
    } else {
        Span::styled(
            format!("{} source(s) failing", degraded),
            Style::default().fg(Color::Yellow),
        )
    };

    let line = Line::from(vec![
        Span::styled(
            " clawtop ",
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(" {} │ ", Local::now().format("%H:%M:%S"))),
        status,
        Span::styled(
            format!(" │ refresh {}ms", app.tick_ms),
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn render_footer(frame: &mut Frame, area: Rect) {
    let footer = Paragraph::new(" q quit │ r refresh all │ ? help ")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, area);
}

fn render_grid(frame: &mut Frame, area: Rect, app: &DashboardApp) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(36),
            Constraint::Percentage(32),
            Constraint::Percentage(32),
        ])
        .split(area);

    let thirds = [
        Constraint::Ratio(1, 3),
        Constraint::Ratio(1, 3),
        Constraint::Ratio(1, 3),
    ];
    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(thirds)
        .split(rows[0]);
    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(thirds)
        .split(rows[1]);
    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 3), Constraint::Ratio(2, 3)])
        .split(rows[2]);

    render_overview(frame, top[0], app);
    render_usage(frame, top[1], app);
    render_costs(frame, top[2], app);
    render_sessions(frame, middle[0], app);
    render_crons(frame, middle[1], app);
    render_processes(frame, middle[2], app);
    render_network(frame, bottom[0], app);
    render_live_feed(frame, bottom[1], app);
}

fn panel<'a>(name: &str, app: &DashboardApp, ids: &[&str]) -> Block<'a> {
    let entries: Vec<Option<&CacheEntry>> = ids.iter().map(|id| app.entry(id)).collect();
    Block::default()
        .title(panel_title(name, &entries))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
}

/// Text shown in place of a payload that has not arrived.
fn placeholder(entry: Option<&CacheEntry>) -> Line<'static> {
    let text = match entry {
        None => "not configured".to_string(),
        Some(e) => match &e.last_error {
            Some(err) => format!("unavailable: {}", err),
            None => "loading...".to_string(),
        },
    };
    Line::styled(text, Style::default().fg(Color::DarkGray))
}

fn render_lines(frame: &mut Frame, area: Rect, block: Block, lines: Vec<Line<'static>>) {
    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

// Overview

fn render_overview(frame: &mut Frame, area: Rect, app: &DashboardApp) {
    let block = panel("Overview", app, &[GATEWAY, SYSTEM, GPU]);

    let mut lines = match app.payload(GATEWAY) {
        Some(MetricPayload::Gateway(status)) => gateway_lines(status),
        _ => vec![placeholder(app.entry(GATEWAY))],
    };
    lines.push(Line::default());

    match app.payload(SYSTEM) {
        Some(MetricPayload::SystemHealth(health)) => {
            lines.extend(system_lines(health, app.ascii_sparklines))
        }
        _ => lines.push(placeholder(app.entry(SYSTEM))),
    }

    if let Some(MetricPayload::Gpu(Some(gpu))) = app.payload(GPU) {
        lines.extend(gpu_lines(gpu));
    }

    render_lines(frame, area, block, lines);
}

fn gateway_lines(status: &GatewayStatus) -> Vec<Line<'static>> {
    let (label, color) = match status {
        GatewayStatus::Online { .. } => ("ONLINE", Color::Green),
        GatewayStatus::Degraded => ("DEGRADED", Color::Yellow),
        GatewayStatus::Unknown => ("???", Color::DarkGray),
        GatewayStatus::Offline => ("OFFLINE", Color::Red),
    };

    let mut lines = vec![Line::from(vec![
        Span::styled("● OPENCLAW ", Style::default().fg(color).add_modifier(Modifier::BOLD)),
        Span::styled(label, Style::default().fg(color)),
    ])];

    if let GatewayStatus::Online { channels } = status {
        if !channels.is_empty() {
            lines.push(Line::styled(
                format!("  Channels: {}", channels.join(", ")),
                Style::default().fg(Color::Cyan),
            ));
        }
    }
    lines
}

fn system_lines(health: &SystemHealth, ascii: bool) -> Vec<Line<'static>> {
    let history_line = |label: &str, history: &[f32], value: f32| {
        let values: Vec<f64> = history.iter().map(|v| f64::from(*v)).collect();
        let color = usage_color(f64::from(value));
        Line::from(vec![
            Span::raw(format!("  {} ", label)),
            Span::styled(
                sparkline(&values, SPARK_WIDTH, 100.0, ascii),
                Style::default().fg(color),
            ),
            Span::styled(
                format!(" {:3.0}%", value),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
        ])
    };

    let mut disk = percent_bar(f64::from(health.disk_percent), BAR_WIDTH);
    disk.spans.insert(0, Span::raw("  Disk "));
    disk.spans.push(Span::styled(
        format!(" {} free", format_bytes(health.disk_free_bytes as f64)),
        Style::default().fg(Color::DarkGray),
    ));

    let (one, five, fifteen) = health.load_average;
    vec![
        Line::styled("SYSTEM", Style::default().add_modifier(Modifier::BOLD)),
        history_line("CPU ", &health.cpu_history, health.cpu_percent),
        history_line("RAM ", &health.ram_history, health.ram_percent),
        Line::styled(
            format!(
                "       {} / {}",
                format_bytes(health.ram_used_bytes as f64),
                format_bytes(health.ram_total_bytes as f64)
            ),
            Style::default().fg(Color::DarkGray),
        ),
        disk,
        Line::raw(format!(
            "  Load {:.2} {:.2} {:.2} │ Up {}",
            one,
            five,
            fifteen,
            format_duration(health.uptime_secs)
        )),
    ]
}

fn gpu_lines(gpu: &GpuStats) -> Vec<Line<'static>> {
    let mut util = percent_bar(f64::from(gpu.utilization_percent), BAR_WIDTH);
    util.spans.insert(0, Span::raw("  GPU  "));

    let mut vram = percent_bar(f64::from(gpu.memory_percent), BAR_WIDTH);
    vram.spans.insert(0, Span::raw("  VRAM "));
    vram.spans.push(Span::styled(
        format!(
            " {}/{}",
            format_bytes(gpu.memory_used_bytes as f64),
            format_bytes(gpu.memory_total_bytes as f64)
        ),
        Style::default().fg(Color::DarkGray),
    ));

    vec![
        Line::styled(gpu.name.clone(), Style::default().add_modifier(Modifier::BOLD)),
        util,
        vram,
    ]
}

// Usage and costs

fn render_usage(frame: &mut Frame, area: Rect, app: &DashboardApp) {
    let block = panel("Usage (5h)", app, &[USAGE]);
    let Some(MetricPayload::Usage(usage)) = app.payload(USAGE) else {
        render_lines(frame, area, block, vec![placeholder(app.entry(USAGE))]);
        return;
    };

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(1),
        ])
        .split(inner);

    frame.render_widget(
        colored_gauge(
            usage.opus_percent,
            format!("Opus {} out ({:.0}%)", format_tokens(usage.opus_output), usage.opus_percent),
        ),
        chunks[0],
    );
    frame.render_widget(
        colored_gauge(
            usage.sonnet_percent,
            format!(
                "Sonnet {} out ({:.0}%)",
                format_tokens(usage.sonnet_output),
                usage.sonnet_percent
            ),
        ),
        chunks[1],
    );
    frame.render_widget(
        Paragraph::new(usage_lines(usage)).wrap(Wrap { trim: true }),
        chunks[2],
    );
}

fn usage_lines(usage: &UsageWindow) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::raw(format!(
            "{} calls │ {}",
            usage.total_calls,
            format_cost(usage.total_cost)
        )),
        Line::styled(
            format!(
                "Burn {} tok/min │ {}/min",
                format_tokens(usage.burn_tokens_per_min as u64),
                format_cost(usage.burn_cost_per_min)
            ),
            Style::default().fg(Color::Magenta),
        ),
    ];

    for model in &usage.per_model {
        lines.push(Line::from(vec![
            Span::styled(format!("{:<18}", model.model), Style::default().fg(Color::Cyan)),
            Span::raw(format!(
                " {:>6} in {:>6} out {}",
                format_tokens(model.input_tokens),
                format_tokens(model.output_tokens),
                format_cost(model.cost)
            )),
        ]));
    }
    lines
}

fn render_costs(frame: &mut Frame, area: Rect, app: &DashboardApp) {
    let block = panel("Costs", app, &[COSTS]);
    let lines = match app.payload(COSTS) {
        Some(MetricPayload::Costs(costs)) => cost_lines(costs),
        _ => vec![placeholder(app.entry(COSTS))],
    };
    render_lines(frame, area, block, lines);
}

fn cost_lines(costs: &CostSummary) -> Vec<Line<'static>> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let mut lines = vec![Line::from(vec![
        Span::raw("Today "),
        Span::styled(format_cost(costs.today), bold.fg(Color::Green)),
        Span::raw("  Week "),
        Span::styled(format_cost(costs.week), bold.fg(Color::Yellow)),
        Span::raw("  All "),
        Span::styled(format_cost(costs.total), bold),
    ])];

    if !costs.per_model.is_empty() {
        lines.push(Line::styled("By model", Style::default().fg(Color::DarkGray)));
        for (model, cost) in &costs.per_model {
            lines.push(Line::raw(format!("  {:<18} {}", model, format_cost(*cost))));
        }
    }
    if !costs.per_day.is_empty() {
        lines.push(Line::styled("By day", Style::default().fg(Color::DarkGray)));
        for (day, cost) in &costs.per_day {
            lines.push(Line::raw(format!("  {} {}", day, format_cost(*cost))));
        }
    }
    lines
}

// Sessions, crons and processes

fn render_sessions(frame: &mut Frame, area: Rect, app: &DashboardApp) {
    let block = panel("Sessions", app, &[SESSIONS]);
    let Some(MetricPayload::Sessions(sessions)) = app.payload(SESSIONS) else {
        render_lines(frame, area, block, vec![placeholder(app.entry(SESSIONS))]);
        return;
    };

    let now = now_ms();
    let rows: Vec<Row> = sessions.iter().map(|s| session_row(s, now)).collect();
    let table = Table::new(
        rows,
        [
            Constraint::Min(12),
            Constraint::Length(16),
            Constraint::Length(7),
            Constraint::Length(9),
        ],
    )
    .header(
        Row::new(vec!["Session", "Model", "Tokens", "Updated"])
            .style(Style::default().fg(Color::DarkGray)),
    )
    .block(block);

    frame.render_widget(table, area);
}

fn session_row(session: &SessionInfo, now: i64) -> Row<'static> {
    let ago = format_ago(session.updated_at_ms, now);
    let recent = now - session.updated_at_ms < 3_600_000;
    let ago_style = if recent {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    Row::new(vec![
        Cell::from(session.label.clone()),
        Cell::from(session.model.clone()).style(Style::default().fg(Color::Cyan)),
        Cell::from(format_tokens(session.tokens)),
        Cell::from(ago).style(ago_style),
    ])
}

fn render_crons(frame: &mut Frame, area: Rect, app: &DashboardApp) {
    let block = panel("Crons", app, &[CRONS]);
    let lines = match app.payload(CRONS) {
        Some(MetricPayload::Crons(jobs)) if jobs.is_empty() => vec![Line::styled(
            "no cron jobs",
            Style::default().fg(Color::DarkGray),
        )],
        Some(MetricPayload::Crons(jobs)) => {
            let now = now_ms();
            jobs.iter().map(|job| cron_line(job, now)).collect()
        }
        _ => vec![placeholder(app.entry(CRONS))],
    };
    render_lines(frame, area, block, lines);
}

fn cron_line(job: &CronJob, now: i64) -> Line<'static> {
    let (icon, color) = match (job.enabled, job.last_status.as_str()) {
        (false, _) => ("○", Color::DarkGray),
        (true, "ok") => ("●", Color::Green),
        (true, "error") => ("●", Color::Red),
        _ => ("●", Color::Yellow),
    };

    Line::from(vec![
        Span::styled(format!("{} ", icon), Style::default().fg(color)),
        Span::raw(format!("{:<16} ", job.name)),
        Span::styled(format!("{:<12} ", job.schedule), Style::default().fg(Color::Cyan)),
        Span::styled(format_ago(job.last_run_ms, now), Style::default().fg(Color::DarkGray)),
    ])
}

fn render_processes(frame: &mut Frame, area: Rect, app: &DashboardApp) {
    let block = panel("Processes", app, &[PROCESSES]);
    let Some(MetricPayload::Processes(processes)) = app.payload(PROCESSES) else {
        render_lines(frame, area, block, vec![placeholder(app.entry(PROCESSES))]);
        return;
    };

    let rows: Vec<Row> = processes.iter().map(process_row).collect();
    let table = Table::new(
        rows,
        [
            Constraint::Length(7),
            Constraint::Min(10),
            Constraint::Length(7),
            Constraint::Length(7),
        ],
    )
    .header(
        Row::new(vec!["PID", "Name", "CPU%", "MEM%"]).style(Style::default().fg(Color::DarkGray)),
    )
    .block(block);

    frame.render_widget(table, area);
}

fn process_row(proc: &ProcessInfo) -> Row<'static> {
    Row::new(vec![
        Cell::from(proc.pid.to_string()),
        Cell::from(proc.name.clone()),
        Cell::from(format!("{:.1}", proc.cpu_percent))
            .style(Style::default().fg(usage_color(f64::from(proc.cpu_percent)))),
        Cell::from(format!("{:.1}", proc.memory_percent)),
    ])
}

// Network and live feed

fn render_network(frame: &mut Frame, area: Rect, app: &DashboardApp) {
    let block = panel("Network", app, &[NETWORK]);
    let width = (block.inner(area).width as usize).saturating_sub(2).max(8);
    let lines = match app.payload(NETWORK) {
        Some(MetricPayload::Network(net)) => network_lines(net, width, app.ascii_sparklines),
        _ => vec![placeholder(app.entry(NETWORK))],
    };
    render_lines(frame, area, block, lines);
}

fn network_lines(net: &NetworkStats, width: usize, ascii: bool) -> Vec<Line<'static>> {
    let direction = |label: &str, rate: f64, peak: f64, history: &[f64], color: Color| {
        vec![
            Line::from(vec![
                Span::styled(format!("{} ", label), Style::default().fg(color)),
                Span::styled(format_rate(rate), Style::default().add_modifier(Modifier::BOLD)),
                Span::styled(
                    format!("  peak {}", format_rate(peak)),
                    Style::default().fg(Color::DarkGray),
                ),
            ]),
            Line::styled(
                sparkline(history, width, peak, ascii),
                Style::default().fg(color),
            ),
        ]
    };

    let mut lines = direction("▲ Up  ", net.up_bytes_per_sec, net.peak_up, &net.up_history, Color::Magenta);
    lines.extend(direction(
        "▼ Down",
        net.down_bytes_per_sec,
        net.peak_down,
        &net.down_history,
        Color::Cyan,
    ));
    lines.push(Line::styled(
        format!(
            "Total sent {} │ recv {}",
            format_bytes(net.total_sent_bytes as f64),
            format_bytes(net.total_received_bytes as f64)
        ),
        Style::default().fg(Color::DarkGray),
    ));
    lines
}

fn render_live_feed(frame: &mut Frame, area: Rect, app: &DashboardApp) {
    let block = panel("Live Feed", app, &[LIVE_FEED]);
    let lines = match app.payload(LIVE_FEED) {
        Some(MetricPayload::LiveFeed(feed)) if feed.is_empty() => vec![Line::styled(
            "no messages in the last hour",
            Style::default().fg(Color::DarkGray),
        )],
        Some(MetricPayload::LiveFeed(feed)) => feed.iter().map(feed_line).collect(),
        _ => vec![placeholder(app.entry(LIVE_FEED))],
    };
    let paragraph = Paragraph::new(lines).block(block);
    frame.render_widget(paragraph, area);
}

fn feed_line(msg: &FeedMessage) -> Line<'static> {
    let time = DateTime::<Utc>::from_timestamp_millis(msg.timestamp_ms)
        .map(|ts| ts.with_timezone(&Local).format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".to_string());
    let (role, color) = match msg.role {
        Role::User => ("user", Color::Green),
        Role::Assistant => ("asst", Color::Cyan),
    };

    Line::from(vec![
        Span::styled(format!("{} ", time), Style::default().fg(Color::DarkGray)),
        Span::styled(format!("{} ", msg.session), Style::default().fg(Color::Magenta)),
        Span::styled(format!("{:<4} ", role), Style::default().fg(color)),
        Span::raw(msg.content.clone()),
    ])
}

// Help overlay

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let help_text = r#"
    clawtop - Help

    Keyboard Shortcuts:
    ─────────────────────────────────────
    q / Esc / Ctrl+C   Quit
    r                  Refresh every source now
    ?                  Toggle this help screen

    Panel titles flag sources that are still
    loading, unavailable, or stale (N failures).
    "#;

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    let paragraph = Paragraph::new(help_text)
        .block(block)
        .alignment(Alignment::Left);

    let popup_area = centered_rect(60, 50, area);
    frame.render_widget(Clear, popup_area);
    frame.render_widget(paragraph, popup_area);
}

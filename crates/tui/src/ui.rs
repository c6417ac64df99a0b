use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout},
    style::{Color, Style, Modifier},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use latency_core::types::{LatencyReport, OrchestratorState, RunRecord, TestKind};
use crate::App;

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = if app.log.visible {
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(f.area())
    } else {
        Layout::default()
            .constraints([Constraint::Percentage(100)])
            .split(f.area())
    };

    // -- Left panel: test list --

    let (banner_label, banner_bg) = match *app.orch_state.lock().unwrap() {
        OrchestratorState::Running => ("RUNNING", Color::Green),
        OrchestratorState::Idle => ("IDLE (space to run)", Color::Blue),
    };

    let mut lines: Vec<Line> = Vec::new();

    lines.push(Line::from(vec![
        Span::styled(" j", Style::default().fg(Color::Yellow)),
        Span::raw("/"),
        Span::styled("k", Style::default().fg(Color::Yellow)),
        Span::raw(" to select, "),
        Span::styled("space", Style::default().fg(Color::Yellow)),
        Span::raw(" to run, "),
        Span::styled("l", Style::default().fg(Color::Yellow)),
        Span::raw(" logs, "),
        Span::styled("q", Style::default().fg(Color::Yellow)),
        Span::raw(" quit:"),
    ]));
    lines.push(Line::from(""));

    for (i, kind) in TestKind::ALL.iter().enumerate() {
        let prefix = if i == app.selected { "> " } else { "  " };
        lines.push(Line::from(vec![
            Span::raw(prefix),
            Span::styled(
                kind.label(),
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            ),
        ]));

        match app.last_record(*kind) {
            Some(record) => lines.extend(record_lines(&record)),
            None => lines.push(Line::from(Span::styled(
                "    not run yet",
                Style::default().fg(Color::DarkGray),
            ))),
        }
        lines.push(Line::from(""));
    }

    let left_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(chunks[0]);

    let banner_width = left_chunks[0].width as usize;
    let pad_total = banner_width.saturating_sub(banner_label.len());
    let pad_left = pad_total / 2;
    let pad_right = pad_total - pad_left;
    let centered_banner = format!("{}{}{}", " ".repeat(pad_left), banner_label, " ".repeat(pad_right));
    let banner = Paragraph::new(Line::from(Span::styled(
        centered_banner,
        Style::default().fg(Color::Black).bg(banner_bg).add_modifier(Modifier::BOLD),
    )));
    f.render_widget(banner, left_chunks[0]);

    let test_list = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::LEFT | Borders::RIGHT | Borders::BOTTOM)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(test_list, left_chunks[1]);

    // -- Right panel: logs --
    if app.log.visible && chunks.len() > 1 {
        let height = chunks[1].height.saturating_sub(2) as usize;
        let log_lines: Vec<Line> = app.log.window(height).iter().map(|m| parse_log_line(m)).collect();
        let log_panel = Paragraph::new(log_lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Logs ")
                    .border_style(Style::default().fg(Color::Yellow)),
            )
            .wrap(Wrap { trim: false });
        f.render_widget(log_panel, chunks[1]);
    }

    if let Some(dialog) = &app.confirm {
        dialog.render(f);
    }
}

fn record_lines(record: &RunRecord) -> Vec<Line<'static>> {
    let header = Line::from(vec![
        Span::styled(format!("    {}", record.pattern_hex), Style::default().fg(Color::DarkGray)),
        Span::styled(format!("  {} ms", record.elapsed_ms), Style::default().fg(Color::DarkGray)),
    ]);
    match &record.outcome {
        Ok(report) => {
            let mut lines = vec![header];
            lines.extend(
                report_fields(record.kind, report)
                    .into_iter()
                    .map(|(name, value)| {
                        Line::from(vec![
                            Span::styled(format!("    {:<22}", name), Style::default().fg(Color::Cyan)),
                            Span::styled(format!("{:>8.2} ms", value), Style::default().fg(Color::White)),
                        ])
                    }),
            );
            lines
        }
        Err(e) => vec![
            header,
            Line::from(Span::styled(format!("    err: {}", e), Style::default().fg(Color::Red))),
        ],
    }
}

/// The report values worth showing for a test.
fn report_fields(kind: TestKind, report: &LatencyReport) -> Vec<(&'static str, f64)> {
    match kind {
        TestKind::KeyLatency | TestKind::NativeReference => {
            vec![("keydown latency", report.key_down_latency_ms)]
        }
        TestKind::ScrollLatency => vec![
            ("scroll latency", report.scroll_latency_ms),
            ("scroll latency (mid)", report.scroll_latency_midpoint_ms),
        ],
        TestKind::PauseTime => vec![
            ("max js pause", report.max_js_pause_ms),
            ("max css pause", report.max_css_pause_ms),
            ("max scroll pause", report.max_scroll_pause_ms),
        ],
    }
}

/// Parse a structured log line (level\x1fprefix\x1fcolor\x1ftimestamp\x1fmessage)
/// into a colored Line for TUI rendering.
fn parse_log_line(raw: &str) -> Line<'_> {
    let parts: Vec<&str> = raw.splitn(5, '\x1f').collect();
    if parts.len() < 5 {
        return Line::from(raw);
    }

    let level = parts[0];
    let prefix = parts[1];
    let color_idx: u8 = parts[2].parse().unwrap_or(0);
    let timestamp = parts[3];
    let message = parts[4];

    let line_color = match color_idx {
        1 => Color::DarkGray,  // COLOR_GRAY
        2 => Color::LightBlue, // COLOR_BLUE
        _ => Color::White,
    };

    let mut spans = vec![
        Span::styled(timestamp, Style::default().fg(Color::DarkGray)),
        Span::raw(" "),
    ];

    match level {
        "ERROR" => spans.push(Span::styled("error ", Style::default().fg(Color::Red))),
        "WARN" => spans.push(Span::styled("warn ", Style::default().fg(Color::Yellow))),
        _ => {}
    }

    if !prefix.is_empty() {
        spans.push(Span::styled(prefix, Style::default().fg(line_color).add_modifier(Modifier::BOLD)));
        spans.push(Span::raw(" "));
    }
    spans.push(Span::styled(message, Style::default().fg(line_color)));

    Line::from(spans)
}

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout},
    style::{Color, Style, Modifier},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use orca_core::progress::IDLE;
use orca_core::types::RunnerState;
use crate::App;

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = if app.log_visible {
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(f.area())
    } else {
        Layout::default()
            .constraints([Constraint::Percentage(100)])
            .split(f.area())
    };

    let snapshot = app.snapshot();
    let session = app.session.lock().unwrap();

    // -- Left panel: macro listing --

    let (banner_label, banner_bg) = match session.state {
        RunnerState::Running => ("RUNNING (Press S to stop)", Color::Green),
        RunnerState::Stopping => ("STOPPING...", Color::Yellow),
        RunnerState::Idle => ("IDLE (Press R to run)", Color::Red),
    };

    let mut lines: Vec<Line> = Vec::new();

    lines.push(Line::from(vec![
        Span::styled(" c", Style::default().fg(Color::Yellow)),
        Span::raw(" compile, "),
        Span::styled("r", Style::default().fg(Color::Yellow)),
        Span::raw("/"),
        Span::styled("l", Style::default().fg(Color::Yellow)),
        Span::raw(" run once/loop, "),
        Span::styled("s", Style::default().fg(Color::Yellow)),
        Span::raw(" stop, "),
        Span::styled("v", Style::default().fg(Color::Yellow)),
        Span::raw(" logs:"),
    ]));

    let title = session
        .macro_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(no macro)".to_string());
    lines.push(Line::from(Span::styled(
        format!(" {}", title),
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
    )));

    let status = status_line(snapshot.loop_index, session.loop_times, snapshot.remaining_frames);
    lines.push(Line::from(Span::styled(format!(" {}", status), Style::default().fg(Color::Cyan))));

    if let Some(err) = &session.error {
        lines.push(Line::from(Span::styled(format!(" err: {}", err), Style::default().fg(Color::Red))));
    }
    lines.push(Line::from(""));
    let header_len = lines.len();

    for (i, text) in session.source.iter().enumerate() {
        let current = snapshot.line >= 0 && i == snapshot.line as usize;
        let prefix = if current { "> " } else { "  " };
        let text_style = if current {
            Style::default().fg(Color::Black).bg(banner_bg).add_modifier(Modifier::BOLD)
        } else if text.trim_start().starts_with('#') {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default().fg(Color::White)
        };
        lines.push(Line::from(vec![
            Span::raw(prefix),
            Span::styled(format!("{:>3} ", i + 1), Style::default().fg(Color::DarkGray)),
            Span::styled(text.clone(), text_style),
        ]));
    }
    drop(session);

    let left_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(chunks[0]);

    // Full-width centered banner
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

    // Keep the current line in view
    let visible = left_chunks[1].height.saturating_sub(1) as usize;
    let scroll = if snapshot.line >= 0 {
        (header_len + snapshot.line as usize).saturating_sub(visible / 2)
    } else {
        0
    };
    let listing = Paragraph::new(lines)
        .scroll((scroll.min(u16::MAX as usize) as u16, 0))
        .block(
            Block::default()
                .borders(Borders::LEFT | Borders::RIGHT | Borders::BOTTOM)
                .border_style(Style::default().fg(Color::Cyan)),
        );
    f.render_widget(listing, left_chunks[1]);

    // -- Right panel: logs --
    if app.log_visible && chunks.len() > 1 {
        let visible_height = chunks[1].height.saturating_sub(2) as usize;
        let total = app.log_messages.len();
        let max_scroll = total.saturating_sub(visible_height);
        let scroll = app.log_scroll.min(max_scroll);
        let start = total.saturating_sub(visible_height + scroll);
        let end = total.saturating_sub(scroll);
        let log_lines: Vec<Line> = app.log_messages[start..end]
            .iter()
            .map(|m| parse_log_line(m))
            .collect();

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

/// Loop iteration and time left before the next planned hit.
fn status_line(loop_index: i32, loop_times: Option<i32>, remaining_frames: Option<i64>) -> String {
    let mut parts = Vec::new();
    match loop_times {
        Some(n) if n >= 0 && loop_index != IDLE => parts.push(format!("Loop {}/{}", loop_index + 1, n)),
        Some(n) if n < 0 => parts.push("Loop until stopped".to_string()),
        _ => {}
    }
    if let Some(text) = remaining_text(remaining_frames) {
        parts.push(text);
    }
    parts.join("  ")
}

/// Whole seconds left to the hit, or a warning once a full second has passed.
/// Division truncates toward zero, so the first 59 late frames still read 0.
fn remaining_text(remaining_frames: Option<i64>) -> Option<String> {
    match remaining_frames? / 60 {
        sec if sec < 0 => Some("Not in time!".to_string()),
        sec => Some(format!("{} [sec]", sec)),
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

    let prefix_color = match color_idx {
        1 => Color::DarkGray,   // COLOR_GRAY
        2 => Color::LightBlue,  // COLOR_BLUE
        3 => Color::LightGreen, // COLOR_GREEN
        _ => Color::White,
    };

    let mut spans = vec![
        Span::styled(timestamp, Style::default().fg(Color::DarkGray)),
        Span::raw(" "),
    ];

    // Only warn/error get a level tag
    match level {
        "ERROR" => spans.push(Span::styled("error ", Style::default().fg(Color::Red))),
        "WARN" => spans.push(Span::styled("warn ", Style::default().fg(Color::Yellow))),
        _ => {}
    }

    if !prefix.is_empty() {
        spans.push(Span::styled(prefix, Style::default().fg(prefix_color).add_modifier(Modifier::BOLD)));
        spans.push(Span::raw(" "));
    }
    spans.push(Span::styled(message, Style::default().fg(prefix_color)));

    Line::from(spans)
}

use crate::app::{App, AppView};
use crate::locator::ServerDescriptor;
use crate::phase::Phase;
use crate::results::{DetailLine, ResultsView, ScaledSpeed, Tone};
use crate::session::{Page, ResultsTab, TestRegion};
use crate::settings::SettingsField;
use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap},
    Frame,
};
use std::time::Instant;

use super::gauge::draw_gauge;

// Color Palette - Elegant & Minimal
const ACCENT: Color = Color::Rgb(100, 149, 237); // Cornflower blue
const SUCCESS: Color = Color::Rgb(134, 194, 156); // Soft green
const INFO: Color = Color::Rgb(147, 180, 220); // Soft blue
const WARN: Color = Color::Rgb(220, 180, 130); // Soft amber
const ERROR: Color = Color::Rgb(220, 110, 110);
pub(super) const TEXT_PRIMARY: Color = Color::Rgb(230, 230, 230);
pub(super) const TEXT_SECONDARY: Color = Color::Rgb(160, 160, 160);
pub(super) const TEXT_MUTED: Color = Color::Rgb(100, 100, 100);
pub(super) const BORDER: Color = Color::Rgb(60, 60, 65);

pub fn draw_ui(frame: &mut Frame, app: &App, now: Instant) {
    let area = frame.area();

    match app.view {
        AppView::Main => draw_main_view(frame, area, app, now),
        AppView::Settings => draw_settings_view(frame, area, app),
    }
}

fn draw_main_view(frame: &mut Frame, area: Rect, app: &App, now: Instant) {
    let chunks = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(8),
        Constraint::Length(1),
    ])
    .split(area);

    draw_header(frame, chunks[0], app);

    if app.session.phase() == Phase::Loading {
        draw_centered(frame, chunks[1], "Loading...", TEXT_MUTED);
    } else {
        let (page, fading) = app.session.visible_page(now);
        let style = if fading {
            Style::default().add_modifier(Modifier::DIM)
        } else {
            Style::default()
        };
        match page {
            Page::Welcome => draw_welcome_page(frame, chunks[1], app, style),
            Page::Test => draw_test_page(frame, chunks[1], app, style),
            Page::Results => draw_results_page(frame, chunks[1], app, style),
        }
    }

    draw_help(frame, chunks[2], app);
}

fn draw_header(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(Style::default().fg(BORDER));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::horizontal([
        Constraint::Length(12),
        Constraint::Min(10),
        Constraint::Length(24),
    ])
    .split(inner);

    // Title
    let title = Paragraph::new("ndtview")
        .style(Style::default().fg(TEXT_PRIMARY).add_modifier(Modifier::BOLD));
    frame.render_widget(title, chunks[0]);

    // Status
    let (status, color) = match app.session.phase() {
        Phase::Loading => ("Loading", TEXT_MUTED),
        Phase::Welcome => ("Ready", TEXT_MUTED),
        Phase::Preparing => ("Preparing test...", WARN),
        Phase::Upload => ("Testing upload...", INFO),
        Phase::Download => ("Testing download...", SUCCESS),
        Phase::Results => ("Complete", ACCENT),
    };
    let status = if app.session.is_simulated() {
        format!("{} (simulated)", status)
    } else {
        status.to_string()
    };

    let status_text = Paragraph::new(status)
        .style(Style::default().fg(color))
        .alignment(Alignment::Center);
    frame.render_widget(status_text, chunks[1]);

    // Phase indicator
    frame.render_widget(
        Paragraph::new(create_phase_text(app.session.phase())).alignment(Alignment::Right),
        chunks[2],
    );
}

fn create_phase_text(phase: Phase) -> Line<'static> {
    let phases = [
        (Phase::Preparing, "prep"),
        (Phase::Upload, "up"),
        (Phase::Download, "down"),
        (Phase::Results, "done"),
    ];

    let mut spans = Vec::new();

    for (i, (p, label)) in phases.iter().enumerate() {
        let style = if phase == *p {
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
        } else if phase > *p {
            Style::default().fg(TEXT_SECONDARY)
        } else {
            Style::default().fg(TEXT_MUTED)
        };

        spans.push(Span::styled(*label, style));

        if i < phases.len() - 1 {
            spans.push(Span::styled(" / ", Style::default().fg(TEXT_MUTED)));
        }
    }

    Line::from(spans)
}

fn draw_centered(frame: &mut Frame, area: Rect, text: &str, color: Color) {
    let rows = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(1),
        Constraint::Min(0),
    ])
    .split(area);
    frame.render_widget(
        Paragraph::new(text.to_string())
            .style(Style::default().fg(color))
            .alignment(Alignment::Center),
        rows[1],
    );
}

// Pages
fn draw_welcome_page(frame: &mut Frame, area: Rect, app: &App, style: Style) {
    let mut lines = vec![
        Line::from(Span::styled(
            "Network Diagnostic Tool",
            Style::default().fg(TEXT_PRIMARY).add_modifier(Modifier::BOLD),
        )),
        Line::default(),
    ];

    let server = if app.session.is_simulated() {
        Span::styled("simulated run, no server needed", Style::default().fg(TEXT_SECONDARY))
    } else {
        match app.server() {
            ServerDescriptor::Unresolved => {
                Span::styled("looking up server...", Style::default().fg(TEXT_MUTED))
            }
            ServerDescriptor::Resolved(host) => {
                Span::styled(host, Style::default().fg(TEXT_PRIMARY))
            }
            ServerDescriptor::Failed => {
                Span::styled("no server available", Style::default().fg(WARN))
            }
        }
    };
    lines.push(Line::from(vec![
        Span::styled("server  ", Style::default().fg(TEXT_MUTED)),
        server,
    ]));

    if app.session.plugin_warning {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            "The test cannot start: no NDT server is available for this client.",
            Style::default().fg(ERROR).add_modifier(Modifier::BOLD),
        )));
    }

    lines.push(Line::default());
    lines.push(Line::from(Span::styled(
        "press enter to start the test",
        Style::default().fg(TEXT_SECONDARY),
    )));

    let rows = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(lines.len() as u16),
        Constraint::Min(0),
    ])
    .split(area);

    frame.render_widget(
        Paragraph::new(lines).alignment(Alignment::Center).style(style),
        rows[1],
    );
}

fn draw_test_page(frame: &mut Frame, area: Rect, app: &App, style: Style) {
    let session = &app.session;

    if session.region == TestRegion::Loading {
        draw_centered(frame, area, "Connecting to the test server...", WARN);
        return;
    }

    let chunks = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(6),
    ])
    .split(area);

    let info = Line::from(vec![
        Span::styled("server ", Style::default().fg(TEXT_MUTED)),
        Span::styled(session.remote_host.clone(), Style::default().fg(TEXT_SECONDARY)),
        Span::styled("  ·  ", Style::default().fg(TEXT_MUTED)),
        Span::styled("rtt ", Style::default().fg(TEXT_MUTED)),
        Span::styled(session.rtt_label.clone(), Style::default().fg(TEXT_SECONDARY)),
    ]);
    frame.render_widget(
        Paragraph::new(info).alignment(Alignment::Center).style(style),
        chunks[0],
    );

    let panels = Layout::horizontal([Constraint::Ratio(1, 2), Constraint::Ratio(1, 2)])
        .split(chunks[1]);

    let upload_active = session.region == TestRegion::Upload;
    draw_gauge(frame, panels[0], &session.upload_gauge, upload_active, style);
    draw_gauge(frame, panels[1], &session.download_gauge, !upload_active, style);
}

fn draw_results_page(frame: &mut Frame, area: Rect, app: &App, style: Style) {
    let Some(results) = app.session.results.as_ref() else {
        draw_centered(frame, area, "No results", TEXT_MUTED);
        return;
    };

    let chunks = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(4),
    ])
    .split(area);

    frame.render_widget(
        Paragraph::new(create_tabs_line(app.session.results_tab)).style(style),
        chunks[0],
    );

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(BORDER))
        .style(style);
    let inner = block.inner(chunks[1]);
    frame.render_widget(block, chunks[1]);

    match app.session.results_tab {
        ResultsTab::Summary => draw_summary(frame, inner, results, style),
        ResultsTab::Details => draw_details(frame, inner, &results.details, style),
        ResultsTab::Advanced => draw_advanced(frame, inner, results, style),
    }
}

fn create_tabs_line(current: ResultsTab) -> Line<'static> {
    let mut spans = vec![Span::raw(" ")];
    for (i, tab) in ResultsTab::ALL.iter().enumerate() {
        let style = if *tab == current {
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(TEXT_MUTED)
        };
        spans.push(Span::styled(format!("{} {}", i + 1, tab.label()), style));
        if i < ResultsTab::ALL.len() - 1 {
            spans.push(Span::styled("  ·  ", Style::default().fg(TEXT_MUTED)));
        }
    }
    Line::from(spans)
}

fn draw_summary(frame: &mut Frame, area: Rect, results: &ResultsView, style: Style) {
    let panels = Layout::horizontal([
        Constraint::Ratio(1, 4),
        Constraint::Ratio(1, 4),
        Constraint::Ratio(1, 4),
        Constraint::Ratio(1, 4),
    ])
    .split(area);

    draw_stat(frame, panels[0], "Download", SUCCESS, speed_line(&results.download), style);
    draw_stat(frame, panels[1], "Upload", INFO, speed_line(&results.upload), style);
    draw_stat(
        frame,
        panels[2],
        "Latency",
        WARN,
        value_line(results.latency.clone(), "msec"),
        style,
    );
    draw_stat(
        frame,
        panels[3],
        "Jitter",
        ACCENT,
        value_line(results.jitter.clone(), ""),
        style,
    );
}

fn speed_line(speed: &ScaledSpeed) -> Line<'static> {
    value_line(speed.value_text(), speed.unit)
}

fn value_line(value: String, unit: &'static str) -> Line<'static> {
    let mut spans = vec![Span::styled(
        value,
        Style::default().fg(TEXT_PRIMARY).add_modifier(Modifier::BOLD),
    )];
    if !unit.is_empty() {
        spans.push(Span::styled(format!(" {}", unit), Style::default().fg(TEXT_MUTED)));
    }
    Line::from(spans)
}

fn draw_stat(frame: &mut Frame, area: Rect, title: &str, color: Color, value: Line, style: Style) {
    let rows = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Min(0),
    ])
    .split(area);

    frame.render_widget(
        Paragraph::new(title.to_string())
            .style(Style::default().fg(color).patch(style))
            .alignment(Alignment::Center),
        rows[1],
    );
    frame.render_widget(
        Paragraph::new(value).alignment(Alignment::Center).style(style),
        rows[2],
    );
}

fn tone_style(tone: Tone) -> Style {
    match tone {
        Tone::Plain => Style::default().fg(TEXT_SECONDARY),
        Tone::Bold => Style::default().fg(TEXT_PRIMARY).add_modifier(Modifier::BOLD),
        Tone::Good => Style::default().fg(SUCCESS),
        Tone::Bad => Style::default().fg(ERROR).add_modifier(Modifier::BOLD),
    }
}

fn draw_details(frame: &mut Frame, area: Rect, details: &[DetailLine], style: Style) {
    let lines: Vec<Line> = details
        .iter()
        .map(|line| {
            Line::from(
                line.iter()
                    .map(|fragment| Span::styled(fragment.text.clone(), tone_style(fragment.tone)))
                    .collect::<Vec<_>>(),
            )
        })
        .collect();

    frame.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: false }).style(style),
        area,
    );
}

fn draw_advanced(frame: &mut Frame, area: Rect, results: &ResultsView, style: Style) {
    let diagnosis = &results.diagnosis;
    let text_height = diagnosis.text.lines().count().max(1) as u16;

    let chunks = Layout::vertical([
        Constraint::Length(text_height),
        Constraint::Min(0),
    ])
    .split(area);

    frame.render_widget(
        Paragraph::new(diagnosis.text.clone())
            .style(Style::default().fg(TEXT_SECONDARY).patch(style))
            .wrap(Wrap { trim: false }),
        chunks[0],
    );

    if diagnosis.table.is_empty() {
        return;
    }

    let columns = diagnosis.table.iter().map(Vec::len).max().unwrap_or(0);
    let rows = diagnosis.table.iter().map(|fields| {
        Row::new(fields.iter().enumerate().map(|(i, field)| {
            let color = if i == 0 { TEXT_SECONDARY } else { TEXT_PRIMARY };
            Cell::from(field.clone()).style(Style::default().fg(color))
        }))
    });
    let widths = vec![Constraint::Ratio(1, columns.max(1) as u32); columns];

    frame.render_widget(Table::new(rows, widths).style(style), chunks[1]);
}

// Settings
fn draw_settings_view(frame: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(10),
        Constraint::Length(1),
    ])
    .split(area);

    // Header
    let header_block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(Style::default().fg(BORDER));
    let header_inner = header_block.inner(chunks[0]);
    frame.render_widget(header_block, chunks[0]);

    frame.render_widget(
        Paragraph::new("Settings")
            .style(Style::default().fg(TEXT_PRIMARY).add_modifier(Modifier::BOLD)),
        header_inner,
    );

    let content_area = Layout::horizontal([
        Constraint::Length(2),
        Constraint::Min(30),
        Constraint::Length(2),
    ])
    .split(chunks[1])[1];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(BORDER));
    let inner = block.inner(content_area);
    frame.render_widget(block, content_area);

    let rows = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Min(0),
    ])
    .split(inner);

    draw_setting_row(
        frame,
        rows[0],
        "Simulate",
        on_off(app.settings.simulate),
        app.selected_setting == SettingsField::Simulate,
    );

    draw_setting_row(
        frame,
        rows[1],
        "Secure lookup",
        on_off(app.settings.secure),
        app.selected_setting == SettingsField::Secure,
    );

    draw_setting_row(
        frame,
        rows[2],
        "Gauge scale",
        &format!("{} Mb/s", app.settings.gauge_max),
        app.selected_setting == SettingsField::GaugeMax,
    );

    let help = "↑↓ select · ←→ adjust · enter done";
    frame.render_widget(
        Paragraph::new(help)
            .style(Style::default().fg(TEXT_MUTED))
            .alignment(Alignment::Center),
        chunks[2],
    );
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

fn draw_setting_row(frame: &mut Frame, area: Rect, label: &str, value: &str, selected: bool) {
    let chunks = Layout::horizontal([
        Constraint::Length(16),
        Constraint::Min(10),
    ])
    .split(area);

    let label_style = if selected {
        Style::default().fg(ACCENT)
    } else {
        Style::default().fg(TEXT_SECONDARY)
    };

    frame.render_widget(
        Paragraph::new(format!(" {}", label)).style(label_style),
        chunks[0],
    );

    let value_text = if selected {
        format!("< {} >", value)
    } else {
        value.to_string()
    };

    let value_style = if selected {
        Style::default().fg(TEXT_PRIMARY)
    } else {
        Style::default().fg(TEXT_MUTED)
    };

    frame.render_widget(Paragraph::new(value_text).style(value_style), chunks[1]);
}

fn draw_help(frame: &mut Frame, area: Rect, app: &App) {
    let help = match app.session.page() {
        _ if app.session.is_running() => "esc cancel · q quit",
        Page::Results => "enter restart · tab/1-3 tabs · s settings · q quit",
        _ => "enter start · s settings · q quit",
    };

    frame.render_widget(
        Paragraph::new(help)
            .style(Style::default().fg(TEXT_MUTED))
            .alignment(Alignment::Center),
        area,
    );
}

use crate::gauge::{Band, Gauge};
use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::layout::{BORDER, TEXT_MUTED, TEXT_PRIMARY, TEXT_SECONDARY};

const BAND_GREEN: Color = Color::Rgb(134, 194, 156);
const BAND_GREEN_DIM: Color = Color::Rgb(60, 90, 70);
const BAND_RED: Color = Color::Rgb(220, 110, 110);
const BAND_RED_DIM: Color = Color::Rgb(100, 55, 55);

fn band_colors(band: Band) -> (Color, Color) {
    match band {
        Band::Green => (BAND_GREEN, BAND_GREEN_DIM),
        Band::Red => (BAND_RED, BAND_RED_DIM),
    }
}

pub fn draw_gauge(frame: &mut Frame, area: Rect, gauge: &Gauge, active: bool, style: Style) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(BORDER))
        .title(Span::styled(
            format!(" {} ", gauge.title),
            Style::default().fg(if active { TEXT_PRIMARY } else { TEXT_SECONDARY }),
        ));

    let inner = block.inner(area);
    frame.render_widget(block.style(style), area);

    let chunks = Layout::vertical([
        Constraint::Length(2),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Min(0),
    ])
    .split(inner);

    let value = Line::from(vec![
        Span::styled(
            format!("{:.2}", gauge.value),
            Style::default().fg(TEXT_PRIMARY).add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!(" {}", gauge.units), Style::default().fg(TEXT_MUTED)),
    ]);
    frame.render_widget(
        Paragraph::new(value).alignment(Alignment::Center).style(style),
        chunks[0],
    );

    draw_band_bar(frame, chunks[1], gauge, style);
    draw_ticks(frame, chunks[2], gauge, style);
}

/// Horizontal bar: each cell colored by the band it falls in, bright up to
/// the current value and dim after.
fn draw_band_bar(frame: &mut Frame, area: Rect, gauge: &Gauge, style: Style) {
    if area.width < 4 {
        return;
    }

    let width = (area.width - 2) as usize;
    let filled = ((gauge.ratio() * width as f64) as usize).min(width);

    let mut spans = vec![Span::raw(" ")];
    for cell in 0..width {
        let at = gauge.max * (cell as f64 + 0.5) / width as f64;
        let (bright, dim) = band_colors(gauge.band_at(at));
        let color = if cell < filled { bright } else { dim };
        spans.push(Span::styled("━", Style::default().fg(color)));
    }
    spans.push(Span::raw(" "));

    frame.render_widget(Paragraph::new(Line::from(spans)).style(style), area);
}

/// Labels for the first, middle and last major tick.
fn draw_ticks(frame: &mut Frame, area: Rect, gauge: &Gauge, style: Style) {
    let ticks = gauge.major_ticks();
    let (Some(first), Some(last)) = (ticks.first(), ticks.last()) else {
        return;
    };
    let middle = ticks[ticks.len() / 2];

    let columns = Layout::horizontal([
        Constraint::Ratio(1, 3),
        Constraint::Ratio(1, 3),
        Constraint::Ratio(1, 3),
    ])
    .split(area);

    let tick_style = Style::default().fg(TEXT_MUTED);
    for (label, rect, alignment) in [
        (*first, columns[0], Alignment::Left),
        (middle, columns[1], Alignment::Center),
        (*last, columns[2], Alignment::Right),
    ] {
        frame.render_widget(
            Paragraph::new(format!(" {} ", label))
                .style(tick_style.patch(style))
                .alignment(alignment),
            rect,
        );
    }
}

use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use pastelcal::{app::AppState, ui::theme::parse_hex_color};

pub fn render(f: &mut Frame, app: &AppState, area: ratatui::layout::Rect) {
    let theme = app.theme();
    let current = app.current_calendar_id();

    let mut lines = Vec::new();
    for calendar in app.calendars() {
        let is_current = current == Some(calendar.id.as_str());
        let swatch = if calendar.is_visible { "● " } else { "○ " };

        let mut name_style = Style::default().fg(if calendar.is_visible {
            theme.foreground
        } else {
            theme.inactive_day
        });
        if is_current {
            name_style = name_style.add_modifier(Modifier::BOLD);
        }

        let mut spans = vec![
            Span::raw(if is_current { ">" } else { " " }),
            Span::styled(swatch, Style::default().fg(parse_hex_color(&calendar.color))),
            Span::styled(calendar.name.as_str(), name_style),
        ];
        if calendar.is_default {
            spans.push(Span::styled(" (default)", Style::default().fg(theme.inactive_day)));
        }
        let count = app.events().iter().filter(|e| e.calendar_id == calendar.id).count();
        spans.push(Span::styled(format!(" {}", count), Style::default().fg(theme.inactive_day)));

        lines.push(Line::from(spans));
    }

    let content = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(Span::styled(" Calendars ", Style::default().fg(theme.title))),
    );
    f.render_widget(content, area);
}

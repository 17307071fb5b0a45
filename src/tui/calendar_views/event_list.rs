use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use pastelcal::{app::AppState, ui::theme::parse_hex_color};

pub fn render(f: &mut Frame, app: &AppState, area: ratatui::layout::Rect) {
    let theme = app.theme();
    let events = app.get_events_for_date(app.selected_date);

    let title = format!("Events on {}", app.selected_date.format("%B %d, %Y"));

    let mut lines = vec![
        Line::from(vec![
            Span::styled(title, Style::default().fg(theme.title).add_modifier(Modifier::BOLD)),
        ]),
        Line::from(""),
    ];

    if events.is_empty() {
        lines.push(Line::from(vec![
            Span::styled("No events", Style::default().fg(theme.inactive_day)),
        ]));
    } else {
        let selected_base = Style::default().bg(theme.selected_bg).add_modifier(Modifier::BOLD);

        for (idx, event) in events.iter().enumerate() {
            let is_selected = idx == app.selected_event_index;

            let (time_style, title_style) = if is_selected {
                (selected_base.fg(theme.selected_fg), selected_base.fg(theme.selected_fg))
            } else {
                (Style::default().fg(theme.today), Style::default().fg(theme.foreground))
            };

            let cursor = if is_selected { ">" } else { " " };

            let mut spans = vec![
                Span::styled(cursor, Style::default().fg(theme.title)),
                Span::styled("█ ", Style::default().fg(parse_hex_color(&event.color))),
                Span::styled(format!("{:<11}", event.time_label()), time_style),
                Span::raw(" "),
                Span::styled(event.title.as_str(), title_style),
            ];
            if event.is_multi_day {
                spans.push(Span::styled(
                    format!(" ({} days)", event.span_days()),
                    Style::default().fg(theme.inactive_day),
                ));
            }
            lines.push(Line::from(spans));

            let calendar_name = app.calendar(&event.calendar_id).map(|c| c.name.as_str()).unwrap_or("?");
            lines.push(Line::from(vec![
                Span::raw("    "),
                Span::styled(
                    format!("{} · {}", event.category, calendar_name),
                    Style::default().fg(theme.inactive_day),
                ),
            ]));

            if let Some(description) = &event.description {
                lines.push(Line::from(vec![
                    Span::raw("    "),
                    Span::styled(description.as_str(), Style::default().fg(Color::DarkGray)),
                ]));
            }

            lines.push(Line::from(""));
        }

        lines.push(Line::from(vec![
            Span::styled("J/K", Style::default().fg(Color::Cyan)),
            Span::raw(" = Select | "),
            Span::styled("E", Style::default().fg(Color::Green)),
            Span::raw(" = Edit | "),
            Span::styled("x", Style::default().fg(Color::Red)),
            Span::raw(" = Delete"),
        ]));
    }

    let content = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(content, area);
}

use ratatui::{
    layout::Alignment,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};
use pastelcal::app::AppState;

pub fn render(f: &mut Frame, app: &AppState) {
    let Some(event_id) = &app.delete_confirmation_event_id else {
        return;
    };

    let theme = app.theme();
    let event = app.event(event_id);
    let event_title = event.map(|e| e.title.as_str()).unwrap_or("this event");

    let area = f.size();
    let dialog_width = 60.min(area.width);
    let dialog_height = 10.min(area.height);
    let x = (area.width.saturating_sub(dialog_width)) / 2;
    let y = (area.height.saturating_sub(dialog_height)) / 2;

    let dialog_area = ratatui::layout::Rect {
        x,
        y,
        width: dialog_width,
        height: dialog_height,
    };

    f.render_widget(Clear, dialog_area);

    let mut dialog_text = vec![
        Line::from(vec![Span::styled("Delete Event?", Style::default().fg(theme.error).add_modifier(Modifier::BOLD))]),
        Line::from(""),
        Line::from(vec![
            Span::raw("Delete "),
            Span::styled(event_title, Style::default().fg(theme.help_section).add_modifier(Modifier::BOLD)),
            Span::raw("?"),
        ]),
    ];
    if let Some(event) = event
        && event.is_multi_day
    {
        dialog_text.push(Line::from(format!(
            "Spans {} to {}",
            event.date.format("%b %d"),
            event.last_day().format("%b %d")
        )));
    } else {
        dialog_text.push(Line::from(""));
    }
    dialog_text.extend([
        Line::from(""),
        Line::from(vec![
            Span::styled("Y", Style::default().fg(theme.success)),
            Span::raw(" = Yes, delete | "),
            Span::styled("N", Style::default().fg(theme.error)),
            Span::raw(" = No, cancel"),
        ]),
    ]);

    let dialog_paragraph = Paragraph::new(dialog_text)
        .block(Block::default()
            .borders(Borders::ALL)
            .title(" Confirm Delete ")
            .style(Style::default().bg(theme.background).fg(theme.foreground)))
        .alignment(Alignment::Center);

    f.render_widget(dialog_paragraph, dialog_area);
}

use ratatui::{
    layout::Alignment,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};
use pastelcal::app::{AppState, EventForm, FormField};

const FIELDS: [(FormField, &str, &str); 8] = [
    (FormField::Title, "Title", ""),
    (FormField::Date, "Date", " YYYY-MM-DD"),
    (FormField::EndDate, "End date", " optional, for multi-day"),
    (FormField::StartTime, "Start time", " HH:MM, empty = all day"),
    (FormField::EndTime, "End time", " HH:MM"),
    (FormField::Category, "Category", " space to change"),
    (FormField::Repeat, "Repeat", " space to change"),
    (FormField::Description, "Description", ""),
];

fn field_value(form: &EventForm, field: &FormField) -> String {
    match field {
        FormField::Title => form.title.clone(),
        FormField::Date => form.date.clone(),
        FormField::EndDate => form.end_date.clone(),
        FormField::StartTime => form.start_time.clone(),
        FormField::EndTime => form.end_time.clone(),
        FormField::Category => form.category.to_string(),
        FormField::Repeat => form
            .repeat
            .map(|r| r.to_string())
            .unwrap_or_else(|| "never".to_string()),
        FormField::Description => form.description.clone(),
    }
}

pub fn render(f: &mut Frame, app: &AppState) {
    let Some(form) = &app.event_form else {
        return;
    };

    let theme = app.theme();
    let area = f.size();
    let form_width = 70.min(area.width);
    let form_height = 24.min(area.height);
    let x = (area.width.saturating_sub(form_width)) / 2;
    let y = (area.height.saturating_sub(form_height)) / 2;

    let form_area = ratatui::layout::Rect {
        x,
        y,
        width: form_width,
        height: form_height,
    };

    f.render_widget(Clear, form_area);

    let active_color = theme.title;
    let inactive_color = theme.inactive_day;

    let form_title = if form.is_editing() { "Edit Event" } else { "Create New Event" };
    let calendar_name = app
        .calendar(&form.calendar_id)
        .map(|c| c.name.clone())
        .unwrap_or_default();

    let mut form_text = vec![
        Line::from(vec![
            Span::styled(form_title, Style::default().fg(theme.title).add_modifier(Modifier::BOLD)),
            Span::styled(format!("  in {}", calendar_name), Style::default().fg(inactive_color)),
        ]),
        Line::from(""),
    ];

    for (field, label, hint) in FIELDS.iter() {
        let is_active = form.active_field == *field;
        let label_color = if is_active { active_color } else { inactive_color };
        form_text.push(Line::from(vec![
            Span::styled(format!("{:<13}", format!("{}:", label)), Style::default().fg(label_color)),
            Span::styled(field_value(form, field), Style::default().fg(theme.foreground)),
            Span::styled(if is_active { *hint } else { "" }, Style::default().fg(Color::DarkGray)),
        ]));
        form_text.push(Line::from(""));
    }

    if let Some(message) = &app.status_message {
        form_text.push(Line::from(Span::styled(message.as_str(), Style::default().fg(theme.error))));
    }

    form_text.push(Line::from(vec![
        Span::styled("Tab", Style::default().fg(Color::Cyan)),
        Span::raw(" = Next field | "),
        Span::styled("Enter", Style::default().fg(theme.success)),
        Span::raw(" = Save | "),
        Span::styled("Esc", Style::default().fg(theme.error)),
        Span::raw(" = Cancel"),
    ]));

    let block_title = if form.is_editing() { " Edit Event " } else { " New Event " };

    let form_paragraph = Paragraph::new(form_text)
        .block(Block::default()
            .borders(Borders::ALL)
            .title(block_title)
            .style(Style::default().bg(theme.background)))
        .alignment(Alignment::Left);

    f.render_widget(form_paragraph, form_area);
}

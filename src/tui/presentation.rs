use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Modifier, Style},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use pastelcal::app::{AppState, Mode, SyncStatus};
use crate::tui::{calendar_views, dialogs};

pub fn ui(f: &mut Frame, app: &AppState) {
    let theme = app.theme();

    f.render_widget(
        Block::default().style(Style::default().bg(theme.background).fg(theme.foreground)),
        f.size(),
    );

    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(f.size());

    let content_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(68),
            Constraint::Percentage(32),
        ])
        .split(main_chunks[1]);

    let side_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(app.calendars().len() as u16 + 2),
            Constraint::Min(0),
        ])
        .split(content_chunks[1]);

    let calendar_label = app
        .current_calendar()
        .map(|c| c.name.as_str())
        .unwrap_or("no calendar");
    let mut title_text = format!("pastelcal - {} - {:?} Mode", calendar_label, app.mode);
    if let Some(query) = &app.search_query {
        title_text.push_str(&format!(" - search \"{}\"", query));
    }
    if let Some(category) = app.category_filter {
        title_text.push_str(&format!(" - {} only", category));
    }

    let title = Paragraph::new(title_text)
        .style(Style::default().fg(theme.title).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, main_chunks[0]);

    calendar_views::month::render(f, app, content_chunks[0]);
    calendar_views::calendar_list::render(f, app, side_chunks[0]);
    calendar_views::event_list::render(f, app, side_chunks[1]);

    let in_prompt = matches!(app.mode, Mode::Command);
    let status_text = if in_prompt {
        app.command_buffer.to_string()
    } else if let Some(message) = &app.status_message {
        message.clone()
    } else {
        let sync = match &app.sync_status {
            SyncStatus::Synced => "synced".to_string(),
            SyncStatus::Syncing => "syncing...".to_string(),
            SyncStatus::Offline => "offline".to_string(),
            SyncStatus::Error(e) => e.clone(),
        };
        format!(
            "Events: {} | Sync: {} | Press 'q' to quit, '?' for help",
            app.events().len(),
            sync
        )
    };

    let status_color = match (&app.sync_status, in_prompt) {
        (_, true) => theme.command_mode,
        (SyncStatus::Error(_), false) => theme.error,
        _ => theme.status_bar,
    };

    let status = Paragraph::new(status_text)
        .style(Style::default().fg(status_color))
        .alignment(if in_prompt { Alignment::Left } else { Alignment::Center })
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(status, main_chunks[2]);

    if app.show_help {
        dialogs::help::render(f, app);
    }

    if app.event_form.is_some() {
        dialogs::event_form::render(f, app);
    }

    if app.delete_confirmation_event_id.is_some() {
        dialogs::delete_confirmation::render(f, app);
    }
}

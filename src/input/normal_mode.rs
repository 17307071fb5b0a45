use chrono::{Days, NaiveDate};
use crossterm::event::KeyCode;

use crate::app::{AppState, EventForm, Mode, MonthDirection};

pub fn handle_key(key: KeyCode, state: &mut AppState) {
    match key {
        KeyCode::Char('h') | KeyCode::Left => move_days(state, -1),
        KeyCode::Char('l') | KeyCode::Right => move_days(state, 1),
        KeyCode::Char('j') | KeyCode::Down => move_days(state, 7),
        KeyCode::Char('k') | KeyCode::Up => move_days(state, -7),
        KeyCode::Char('J') => state.move_event_selection_down(),
        KeyCode::Char('K') => state.move_event_selection_up(),
        KeyCode::Char('{') => state.navigate_month(MonthDirection::Previous),
        KeyCode::Char('}') => state.navigate_month(MonthDirection::Next),
        KeyCode::Char('t') => state.jump_to_today(),
        KeyCode::Char('a') => enter_insert_mode(state),
        KeyCode::Char('E') | KeyCode::Enter => enter_edit_mode(state),
        KeyCode::Char('x') => delete_selected_event(state),
        KeyCode::Char('c') => toggle_current_calendar(state),
        KeyCode::Char('C') => cycle_calendar(state),
        KeyCode::Char('D') => toggle_dark_mode(state),
        KeyCode::Char('/') => enter_search_mode(state),
        KeyCode::Char(':') => enter_command_mode(state),
        KeyCode::Char('?') => show_help(state),
        KeyCode::Esc => clear_filters(state),
        _ => {}
    }
}

fn move_days(state: &mut AppState, offset: i64) {
    let days = Days::new(offset.unsigned_abs());
    let moved: Option<NaiveDate> = if offset < 0 {
        state.selected_date.checked_sub_days(days)
    } else {
        state.selected_date.checked_add_days(days)
    };
    if let Some(date) = moved {
        state.select_date(date);
    }
}

fn enter_insert_mode(state: &mut AppState) {
    let Some(calendar_id) = state.current_calendar_id().map(str::to_string) else {
        state.status_message = Some("Create a calendar first".to_string());
        return;
    };
    state.event_form = Some(EventForm::new(state.selected_date, &calendar_id));
    state.mode = Mode::Insert;
}

fn enter_edit_mode(state: &mut AppState) {
    if let Some(event) = state.get_selected_event() {
        state.event_form = Some(EventForm::for_event(event));
        state.mode = Mode::Insert;
    }
}

fn delete_selected_event(state: &mut AppState) {
    if let Some(event) = state.get_selected_event() {
        state.delete_confirmation_event_id = Some(event.id.clone());
    }
}

fn toggle_current_calendar(state: &mut AppState) {
    let Some(id) = state.current_calendar_id().map(str::to_string) else {
        return;
    };
    match state.toggle_calendar_visibility(&id) {
        Ok(visible) => {
            let name = state.calendar(&id).map(|c| c.name.clone()).unwrap_or_default();
            let verb = if visible { "Showing" } else { "Hiding" };
            state.status_message = Some(format!("{} {}", verb, name));
        }
        Err(e) => state.status_message = Some(e.to_string()),
    }
}

fn cycle_calendar(state: &mut AppState) {
    state.cycle_current_calendar();
    if let Some(calendar) = state.current_calendar() {
        state.status_message = Some(format!("Current calendar: {}", calendar.name));
    }
}

fn toggle_dark_mode(state: &mut AppState) {
    let dark = state.toggle_dark_mode();
    state.status_message = Some(if dark { "Dark mode" } else { "Light mode" }.to_string());
}

fn enter_search_mode(state: &mut AppState) {
    state.mode = Mode::Command;
    state.command_buffer = "/".to_string();
}

fn enter_command_mode(state: &mut AppState) {
    state.mode = Mode::Command;
    state.command_buffer = ":".to_string();
}

fn show_help(state: &mut AppState) {
    state.show_help = true;
    state.help_scroll = 0;
}

fn clear_filters(state: &mut AppState) {
    if state.search_query.is_some() || state.category_filter.is_some() {
        state.set_search(None);
        state.set_category_filter(None);
        state.status_message = Some("Filters cleared".to_string());
    }
}

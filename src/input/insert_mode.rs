use crossterm::event::KeyCode;
use crate::app::{AppState, FormField};
use crate::calendar::RepeatFrequency;

const DATE_LEN: usize = 10;
const TIME_LEN: usize = 5;

pub fn handle_key(key: KeyCode, state: &mut AppState) {
    let Some(form) = state.event_form.as_mut() else {
        return;
    };

    match key {
        KeyCode::Tab | KeyCode::Down => form.next_field(),
        KeyCode::BackTab | KeyCode::Up => form.prev_field(),
        KeyCode::Backspace => {
            if let Some(buffer) = form.active_buffer_mut() {
                buffer.pop();
            }
        }
        KeyCode::Char(c) => match form.active_field {
            FormField::Category => {
                if c == ' ' || c == 'l' || c == 'h' {
                    form.category = form.category.next();
                }
            }
            FormField::Repeat => {
                if c == ' ' || c == 'l' || c == 'h' {
                    form.repeat = RepeatFrequency::cycle(form.repeat);
                }
            }
            FormField::Date | FormField::EndDate => {
                if (c.is_ascii_digit() || c == '-')
                    && let Some(buffer) = form.active_buffer_mut()
                    && buffer.len() < DATE_LEN
                {
                    buffer.push(c);
                }
            }
            FormField::StartTime | FormField::EndTime => {
                if (c.is_ascii_digit() || c == ':')
                    && let Some(buffer) = form.active_buffer_mut()
                    && buffer.len() < TIME_LEN
                {
                    buffer.push(c);
                }
            }
            FormField::Title | FormField::Description => {
                if let Some(buffer) = form.active_buffer_mut() {
                    buffer.push(c);
                }
            }
        },
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{EventForm, StateError};
    use crate::calendar::{Category, ValidationError};
    use chrono::NaiveDate;

    fn setup_state_with_form() -> AppState {
        let day = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        let mut state = AppState::starting_on(day);
        let calendar_id = state.current_calendar_id().unwrap().to_string();
        state.event_form = Some(EventForm::new(day, &calendar_id));
        state
    }

    fn type_text(state: &mut AppState, text: &str) {
        for c in text.chars() {
            handle_key(KeyCode::Char(c), state);
        }
    }

    #[test]
    fn tab_moves_to_next_field() {
        let mut state = setup_state_with_form();
        assert_eq!(state.event_form.as_ref().unwrap().active_field, FormField::Title);

        handle_key(KeyCode::Tab, &mut state);

        assert_eq!(state.event_form.as_ref().unwrap().active_field, FormField::Date);
    }

    #[test]
    fn backtab_wraps_to_last_field() {
        let mut state = setup_state_with_form();

        handle_key(KeyCode::BackTab, &mut state);

        assert_eq!(state.event_form.as_ref().unwrap().active_field, FormField::Description);
    }

    #[test]
    fn char_appends_to_title_field() {
        let mut state = setup_state_with_form();

        type_text(&mut state, "Hi");

        assert_eq!(state.event_form.as_ref().unwrap().title, "Hi");
    }

    #[test]
    fn backspace_removes_from_title() {
        let mut state = setup_state_with_form();
        state.event_form.as_mut().unwrap().title = "Hello".to_string();

        handle_key(KeyCode::Backspace, &mut state);

        assert_eq!(state.event_form.as_ref().unwrap().title, "Hell");
    }

    #[test]
    fn time_fields_accept_only_clock_characters() {
        let mut state = setup_state_with_form();
        state.event_form.as_mut().unwrap().active_field = FormField::StartTime;

        type_text(&mut state, "1a4:30:00");

        assert_eq!(state.event_form.as_ref().unwrap().start_time, "14:30");
    }

    #[test]
    fn space_cycles_category() {
        let mut state = setup_state_with_form();
        state.event_form.as_mut().unwrap().active_field = FormField::Category;

        handle_key(KeyCode::Char(' '), &mut state);

        assert_eq!(state.event_form.as_ref().unwrap().category, Category::Work);
    }

    #[test]
    fn repeat_field_is_saved_with_the_event() {
        let mut state = setup_state_with_form();
        type_text(&mut state, "Retro");
        state.event_form.as_mut().unwrap().active_field = FormField::Repeat;
        handle_key(KeyCode::Char(' '), &mut state);
        handle_key(KeyCode::Char(' '), &mut state);

        let id = state.submit_event_form().unwrap();

        assert_eq!(state.event(&id).unwrap().repeat, Some(RepeatFrequency::Weekly));
    }

    #[test]
    fn typed_form_submits_as_timed_event() {
        let mut state = setup_state_with_form();
        type_text(&mut state, "Planning");
        let form = state.event_form.as_mut().unwrap();
        form.active_field = FormField::StartTime;
        type_text(&mut state, "09:00");
        handle_key(KeyCode::Tab, &mut state);
        type_text(&mut state, "10:30");

        let id = state.submit_event_form().unwrap();

        let event = state.event(&id).unwrap();
        assert_eq!(event.title, "Planning");
        assert_eq!(event.time_label(), "09:00-10:30");
        assert!(state.event_form.is_none());
    }

    #[test]
    fn invalid_form_stays_open() {
        let mut state = setup_state_with_form();

        let result = state.submit_event_form();

        assert_eq!(result, Err(StateError::Invalid(ValidationError::EmptyTitle)));
        assert!(state.event_form.is_some());
    }
}

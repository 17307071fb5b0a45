use tokio::sync::mpsc;

use crate::app::{AppState, StateError};
use crate::calendar::CalendarDraft;

/// Cross-screen notifications, applied to the state once per loop iteration.
#[derive(Debug, Clone, PartialEq)]
pub enum AppMessage {
    /// Show only this calendar and make it current.
    FocusCalendar(String),
    ShowAllCalendars,
    /// A community calendar was joined and becomes a local calendar.
    CalendarJoined { name: String, color: Option<String> },
    Notice(String),
}

pub struct MessageBus {
    tx: mpsc::UnboundedSender<AppMessage>,
    rx: mpsc::UnboundedReceiver<AppMessage>,
}

impl MessageBus {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    /// A handle other components can keep to post messages.
    pub fn sender(&self) -> mpsc::UnboundedSender<AppMessage> {
        self.tx.clone()
    }

    pub fn send(&self, message: AppMessage) {
        if self.tx.send(message).is_err() {
            tracing::warn!("Message bus closed, dropping message");
        }
    }

    /// Everything queued so far, in send order.
    pub fn drain(&mut self) -> Vec<AppMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = self.rx.try_recv() {
            messages.push(message);
        }
        messages
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

pub fn apply_message(state: &mut AppState, message: AppMessage) -> Result<(), StateError> {
    tracing::debug!("Applying message {:?}", message);
    match message {
        AppMessage::FocusCalendar(id) => {
            state.focus_calendar(&id)?;
            if let Some(calendar) = state.calendar(&id) {
                state.status_message = Some(format!("Showing only {}", calendar.name));
            }
        }
        AppMessage::ShowAllCalendars => {
            state.show_all_calendars();
            state.status_message = Some("Showing all calendars".to_string());
        }
        AppMessage::CalendarJoined { name, color } => {
            let draft = match color.as_deref() {
                Some(color) => CalendarDraft::new(name.clone()).with_color(color),
                None => CalendarDraft::new(name.clone()),
            };
            state.add_calendar(draft)?;
            state.status_message = Some(format!("Joined {}", name));
        }
        AppMessage::Notice(text) => {
            state.status_message = Some(text);
        }
    }
    Ok(())
}

/// Applies every queued message; failures end up in the status bar.
pub fn apply_pending(bus: &mut MessageBus, state: &mut AppState) {
    for message in bus.drain() {
        if let Err(e) = apply_message(state, message) {
            tracing::warn!("Message could not be applied: {}", e);
            state.status_message = Some(e.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn state() -> AppState {
        AppState::starting_on(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap())
    }

    #[test]
    fn drain_returns_messages_in_order() {
        let mut bus = MessageBus::new();
        bus.send(AppMessage::Notice("one".to_string()));
        bus.sender().send(AppMessage::ShowAllCalendars).unwrap();

        assert_eq!(
            bus.drain(),
            vec![AppMessage::Notice("one".to_string()), AppMessage::ShowAllCalendars]
        );
        assert!(bus.drain().is_empty());
    }

    #[test]
    fn joined_calendar_is_added() {
        let mut state = state();

        apply_message(
            &mut state,
            AppMessage::CalendarJoined { name: "Book Club".to_string(), color: Some("#FFDFBA".to_string()) },
        )
        .unwrap();

        let joined = state.calendar_by_name("book club").unwrap();
        assert_eq!(joined.color, "#FFDFBA");
        assert_eq!(state.status_message.as_deref(), Some("Joined Book Club"));
    }

    #[test]
    fn focus_then_show_all_restores_visibility() {
        let mut state = state();
        let work = state.add_calendar(CalendarDraft::new("Work")).unwrap();
        let mut bus = MessageBus::new();

        bus.send(AppMessage::FocusCalendar(work.clone()));
        apply_pending(&mut bus, &mut state);
        assert_eq!(state.calendars().iter().filter(|c| c.is_visible).count(), 1);
        assert_eq!(state.current_calendar_id(), Some(work.as_str()));

        bus.send(AppMessage::ShowAllCalendars);
        apply_pending(&mut bus, &mut state);
        assert!(state.calendars().iter().all(|c| c.is_visible));
    }

    #[test]
    fn unknown_calendar_is_reported_in_status_bar() {
        let mut state = state();
        let mut bus = MessageBus::new();

        bus.send(AppMessage::FocusCalendar("nope".to_string()));
        apply_pending(&mut bus, &mut state);

        assert_eq!(state.status_message.as_deref(), Some("Calendar not found: nope"));
    }
}

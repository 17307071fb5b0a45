use chrono::{Datelike, Local, Months, NaiveDate};
use thiserror::Error;
use uuid::Uuid;

use crate::calendar::{
    next_available_color, pick_event_color, Calendar, CalendarDraft, Category, Event, EventDraft,
    RepeatFrequency, ValidationError,
};
use crate::storage::Snapshot;
use crate::ui::month_view::{self, WeekStart};
use crate::ui::theme::Theme;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StateError {
    #[error("Event not found: {0}")]
    EventNotFound(String),
    #[error("Calendar not found: {0}")]
    CalendarNotFound(String),
    #[error("The default calendar cannot be deleted")]
    DefaultCalendarLocked,
    #[error("No event form is open")]
    NoOpenForm,
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Normal,
    Insert,
    Command,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncStatus {
    Synced,
    Syncing,
    Offline,
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthDirection {
    Previous,
    Next,
}

/// A deleted calendar together with the events that went with it.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedCalendar {
    pub calendar: Calendar,
    pub events: Vec<Event>,
}

pub struct AppState {
    pub mode: Mode,
    pub displayed_month: NaiveDate,
    pub selected_date: NaiveDate,
    pub week_start: WeekStart,
    pub search_query: Option<String>,
    pub category_filter: Option<Category>,
    pub sync_status: SyncStatus,
    pub status_message: Option<String>,
    pub command_buffer: String,
    pub show_help: bool,
    pub help_scroll: usize,
    pub event_form: Option<EventForm>,
    pub selected_event_index: usize,
    pub delete_confirmation_event_id: Option<String>,
    calendars: Vec<Calendar>,
    events: Vec<Event>,
    current_calendar_id: Option<String>,
    dark_mode: bool,
    deleted_calendar_ids: Vec<String>,
    pending_deletions: Vec<Event>,
    revision: u64,
}

impl AppState {
    pub fn new() -> Self {
        Self::starting_on(Local::now().date_naive())
    }

    /// Fresh state with the default calendar seeded.
    pub fn starting_on(today: NaiveDate) -> Self {
        let default = Calendar::default_calendar(Uuid::new_v4().to_string());
        let current = Some(default.id.clone());
        Self {
            mode: Mode::Normal,
            displayed_month: first_of_month(today),
            selected_date: today,
            week_start: WeekStart::default(),
            search_query: None,
            category_filter: None,
            sync_status: SyncStatus::Offline,
            status_message: None,
            command_buffer: String::new(),
            show_help: false,
            help_scroll: 0,
            event_form: None,
            selected_event_index: 0,
            delete_confirmation_event_id: None,
            calendars: vec![default],
            events: Vec::new(),
            current_calendar_id: current,
            dark_mode: false,
            deleted_calendar_ids: Vec::new(),
            pending_deletions: Vec::new(),
            revision: 0,
        }
    }

    pub fn from_snapshot(snapshot: Snapshot, today: NaiveDate) -> Self {
        let mut state = Self::starting_on(today);
        if snapshot.calendars.is_empty() {
            tracing::info!("No stored calendars, seeding the default calendar");
        } else {
            state.calendars = snapshot.calendars;
            let mut seen_default = false;
            for calendar in &mut state.calendars {
                if calendar.is_default && seen_default {
                    tracing::warn!("Dropping duplicate default flag on calendar {}", calendar.id);
                    calendar.is_default = false;
                }
                seen_default |= calendar.is_default;
            }
        }

        state.events = snapshot.events;
        for event in &mut state.events {
            event.normalize();
        }
        state.dark_mode = snapshot.dark_mode;
        state.deleted_calendar_ids = snapshot.deleted_calendar_ids;
        state.pending_deletions = snapshot.pending_deletions;
        state.current_calendar_id = snapshot
            .current_calendar_id
            .filter(|id| state.calendars.iter().any(|c| &c.id == id))
            .or_else(|| state.fallback_calendar_id());

        tracing::info!(
            "Loaded {} calendars and {} events",
            state.calendars.len(),
            state.events.len()
        );
        state
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            events: self.events.clone(),
            calendars: self.calendars.clone(),
            current_calendar_id: self.current_calendar_id.clone(),
            dark_mode: self.dark_mode,
            deleted_calendar_ids: self.deleted_calendar_ids.clone(),
            pending_deletions: self.pending_deletions.clone(),
        }
    }

    pub fn with_week_start(mut self, week_start: WeekStart) -> Self {
        self.week_start = week_start;
        self
    }

    pub fn with_dark_mode(mut self, dark_mode: bool) -> Self {
        self.dark_mode = dark_mode;
        self
    }

    /// Incremented by every change to persisted data.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn calendars(&self) -> &[Calendar] {
        &self.calendars
    }

    pub fn event(&self, id: &str) -> Option<&Event> {
        self.events.iter().find(|e| e.id == id)
    }

    pub fn calendar(&self, id: &str) -> Option<&Calendar> {
        self.calendars.iter().find(|c| c.id == id)
    }

    pub fn calendar_by_name(&self, name: &str) -> Option<&Calendar> {
        let wanted = name.trim().to_lowercase();
        self.calendars.iter().find(|c| c.name.to_lowercase() == wanted)
    }

    pub fn default_calendar(&self) -> Option<&Calendar> {
        self.calendars.iter().find(|c| c.is_default)
    }

    pub fn current_calendar(&self) -> Option<&Calendar> {
        self.current_calendar_id.as_deref().and_then(|id| self.calendar(id))
    }

    pub fn current_calendar_id(&self) -> Option<&str> {
        self.current_calendar_id.as_deref()
    }

    pub fn dark_mode(&self) -> bool {
        self.dark_mode
    }

    pub fn theme(&self) -> Theme {
        Theme::for_dark_mode(self.dark_mode)
    }

    fn fallback_calendar_id(&self) -> Option<String> {
        self.default_calendar()
            .or_else(|| self.calendars.first())
            .map(|c| c.id.clone())
    }

    fn require_calendar(&self, id: &str) -> Result<(), StateError> {
        if self.calendar(id).is_some() {
            Ok(())
        } else {
            Err(StateError::CalendarNotFound(id.to_string()))
        }
    }

    pub fn add_event(&mut self, draft: EventDraft) -> Result<String, StateError> {
        self.require_calendar(&draft.calendar_id)?;
        draft.validate()?;

        let id = Uuid::new_v4().to_string();
        let color = pick_event_color(&self.events);
        let event = draft.into_event(id.clone(), color)?;

        tracing::info!("Adding event {} '{}' on {}", event.id, event.title, event.date);
        self.events.push(event);
        self.touch();
        Ok(id)
    }

    pub fn update_event(&mut self, mut event: Event) -> Result<(), StateError> {
        event.normalize();
        event.validate()?;
        self.require_calendar(&event.calendar_id)?;

        let slot = self
            .events
            .iter_mut()
            .find(|e| e.id == event.id)
            .ok_or_else(|| StateError::EventNotFound(event.id.clone()))?;

        tracing::info!("Updating event {} '{}'", event.id, event.title);
        *slot = event;
        self.touch();
        Ok(())
    }

    pub fn delete_event(&mut self, id: &str) -> Result<Event, StateError> {
        let idx = self
            .events
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| StateError::EventNotFound(id.to_string()))?;

        let removed = self.events.remove(idx);
        tracing::info!("Deleted event {} '{}'", removed.id, removed.title);
        self.touch();
        Ok(removed)
    }

    /// Adopts the id the server assigned to a locally created event. A copy
    /// already holding that id came from a pull and is replaced by the local one.
    pub fn rekey_event(&mut self, old_id: &str, new_id: &str) -> Result<(), StateError> {
        if old_id == new_id {
            return self.require_event(old_id);
        }
        self.require_event(old_id)?;

        let before = self.events.len();
        self.events.retain(|e| e.id != new_id);
        if self.events.len() < before {
            tracing::debug!("Dropped pulled copy of {} while adopting it for {}", new_id, old_id);
        }

        if let Some(event) = self.events.iter_mut().find(|e| e.id == old_id) {
            event.id = new_id.to_string();
        }
        self.touch();
        Ok(())
    }

    fn require_event(&self, id: &str) -> Result<(), StateError> {
        if self.event(id).is_some() {
            Ok(())
        } else {
            Err(StateError::EventNotFound(id.to_string()))
        }
    }

    /// Events whose remote copies still have to be deleted.
    pub fn pending_deletions(&self) -> &[Event] {
        &self.pending_deletions
    }

    pub fn take_pending_deletions(&mut self) -> Vec<Event> {
        let taken = std::mem::take(&mut self.pending_deletions);
        if !taken.is_empty() {
            self.touch();
        }
        taken
    }

    /// Queues a remote delete that could not be sent yet.
    pub fn queue_remote_deletion(&mut self, event: Event) {
        if !self.pending_deletions.iter().any(|e| e.id == event.id) {
            self.pending_deletions.push(event);
            self.touch();
        }
    }

    /// Upserts events fetched from the server. Events pointing at calendars
    /// this registry does not know land in the default calendar, unless the
    /// calendar was deleted here or the event is waiting for its remote delete.
    pub fn merge_remote_events(&mut self, remote: Vec<Event>) -> usize {
        let fallback = self.fallback_calendar_id();
        let mut merged = 0;

        for mut event in remote {
            if self.deleted_calendar_ids.contains(&event.calendar_id)
                || self.pending_deletions.iter().any(|e| e.id == event.id)
            {
                tracing::debug!("Skipping remote event {}: deleted locally", event.id);
                continue;
            }
            if event.repeat.is_none()
                && let Some(local) = self.event(&event.id)
            {
                event.repeat = local.repeat;
            }
            if self.calendar(&event.calendar_id).is_none() {
                let Some(fallback) = &fallback else {
                    tracing::warn!("Skipping remote event {}: no calendar to hold it", event.id);
                    continue;
                };
                event.calendar_id = fallback.clone();
            }

            event.normalize();
            if let Err(e) = event.validate() {
                tracing::warn!("Skipping invalid remote event {}: {}", event.id, e);
                continue;
            }

            match self.events.iter_mut().find(|e| e.id == event.id) {
                Some(existing) => *existing = event,
                None => self.events.push(event),
            }
            merged += 1;
        }

        if merged > 0 {
            tracing::info!("Merged {} remote events", merged);
            self.touch();
        }
        merged
    }

    pub fn add_calendar(&mut self, draft: CalendarDraft) -> Result<String, StateError> {
        let id = Uuid::new_v4().to_string();
        let mut rng = rand::rng();
        let color = next_available_color(self.calendars.iter().map(|c| c.color.as_str()), &mut rng);
        let calendar = draft.into_calendar(id.clone(), color.to_string())?;

        tracing::info!("Adding calendar {} '{}'", calendar.id, calendar.name);
        self.calendars.push(calendar);
        if self.current_calendar_id.is_none() {
            self.current_calendar_id = Some(id.clone());
        }
        self.touch();
        Ok(id)
    }

    /// Replaces name, description, colour and visibility. The default flag and
    /// creation time are kept from the stored calendar.
    pub fn update_calendar(&mut self, calendar: Calendar) -> Result<(), StateError> {
        calendar.validate()?;
        let slot = self
            .calendars
            .iter_mut()
            .find(|c| c.id == calendar.id)
            .ok_or_else(|| StateError::CalendarNotFound(calendar.id.clone()))?;

        slot.name = calendar.name.trim().to_string();
        slot.description = calendar.description;
        slot.color = calendar.color;
        slot.is_visible = calendar.is_visible;
        self.touch();
        Ok(())
    }

    /// Removes the calendar and every event it owns. The removed events are
    /// queued for remote deletion.
    pub fn delete_calendar(&mut self, id: &str) -> Result<RemovedCalendar, StateError> {
        let idx = self
            .calendars
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| StateError::CalendarNotFound(id.to_string()))?;

        if self.calendars[idx].is_default {
            return Err(StateError::DefaultCalendarLocked);
        }

        let calendar = self.calendars.remove(idx);
        let (events, kept): (Vec<Event>, Vec<Event>) = std::mem::take(&mut self.events)
            .into_iter()
            .partition(|e| e.calendar_id == calendar.id);
        self.events = kept;
        tracing::info!(
            "Deleted calendar {} '{}' and {} of its events",
            calendar.id,
            calendar.name,
            events.len()
        );

        self.deleted_calendar_ids.push(calendar.id.clone());
        self.pending_deletions.extend(events.iter().cloned());

        if self.current_calendar_id.as_deref() == Some(calendar.id.as_str()) {
            self.current_calendar_id = self.fallback_calendar_id();
        }
        self.touch();
        Ok(RemovedCalendar { calendar, events })
    }

    pub fn set_default_calendar(&mut self, id: &str) -> Result<(), StateError> {
        self.require_calendar(id)?;
        for calendar in &mut self.calendars {
            calendar.is_default = calendar.id == id;
        }
        self.touch();
        Ok(())
    }

    /// Flips visibility and returns the new value.
    pub fn toggle_calendar_visibility(&mut self, id: &str) -> Result<bool, StateError> {
        let calendar = self
            .calendars
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| StateError::CalendarNotFound(id.to_string()))?;
        calendar.is_visible = !calendar.is_visible;
        let visible = calendar.is_visible;
        self.touch();
        Ok(visible)
    }

    pub fn set_current_calendar(&mut self, id: &str) -> Result<(), StateError> {
        self.require_calendar(id)?;
        self.current_calendar_id = Some(id.to_string());
        self.touch();
        Ok(())
    }

    /// Shows only the given calendar and makes it current.
    pub fn focus_calendar(&mut self, id: &str) -> Result<(), StateError> {
        self.require_calendar(id)?;
        for calendar in &mut self.calendars {
            calendar.is_visible = calendar.id == id;
        }
        self.current_calendar_id = Some(id.to_string());
        self.touch();
        Ok(())
    }

    pub fn show_all_calendars(&mut self) {
        for calendar in &mut self.calendars {
            calendar.is_visible = true;
        }
        self.touch();
    }

    pub fn cycle_current_calendar(&mut self) {
        if self.calendars.is_empty() {
            return;
        }
        let idx = self
            .current_calendar_id
            .as_deref()
            .and_then(|id| self.calendars.iter().position(|c| c.id == id))
            .map(|i| (i + 1) % self.calendars.len())
            .unwrap_or(0);
        self.current_calendar_id = Some(self.calendars[idx].id.clone());
        self.touch();
    }

    pub fn visible_events(&self) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| self.calendar(&e.calendar_id).is_some_and(|c| c.is_visible))
            .collect()
    }

    /// Visible events narrowed by the category filter and search text.
    pub fn filtered_events(&self) -> Vec<&Event> {
        self.visible_events()
            .into_iter()
            .filter(|e| self.category_filter.is_none_or(|c| e.category == c))
            .filter(|e| {
                self.search_query
                    .as_deref()
                    .is_none_or(|query| e.matches_search(query))
            })
            .collect()
    }

    pub fn get_events_for_date(&self, date: NaiveDate) -> Vec<&Event> {
        month_view::events_on(&self.filtered_events(), date)
    }

    pub fn navigate_month(&mut self, direction: MonthDirection) {
        let shifted = match direction {
            MonthDirection::Previous => self.displayed_month.checked_sub_months(Months::new(1)),
            MonthDirection::Next => self.displayed_month.checked_add_months(Months::new(1)),
        };
        let Some(month) = shifted else { return };
        self.displayed_month = month;

        if first_of_month(self.selected_date) != month {
            let last = last_day_of_month(month).unwrap_or(month);
            let day = self.selected_date.day().min(last.day());
            self.selected_date = month.with_day(day).unwrap_or(month);
            self.reset_event_selection();
        }
    }

    pub fn select_date(&mut self, date: NaiveDate) {
        self.selected_date = date;
        self.displayed_month = first_of_month(date);
        self.reset_event_selection();
    }

    pub fn jump_to_today(&mut self) {
        self.select_date(Local::now().date_naive());
    }

    pub fn set_search(&mut self, query: Option<String>) {
        self.search_query = query.filter(|q| !q.trim().is_empty());
        self.reset_event_selection();
    }

    pub fn set_category_filter(&mut self, category: Option<Category>) {
        self.category_filter = category;
        self.reset_event_selection();
    }

    pub fn toggle_dark_mode(&mut self) -> bool {
        self.dark_mode = !self.dark_mode;
        self.touch();
        self.dark_mode
    }

    pub fn get_selected_event(&self) -> Option<&Event> {
        let events = self.get_events_for_date(self.selected_date);
        events.get(self.selected_event_index).copied()
    }

    pub fn move_event_selection_down(&mut self) {
        let event_count = self.get_events_for_date(self.selected_date).len();
        if event_count > 0 && self.selected_event_index < event_count - 1 {
            self.selected_event_index += 1;
        }
    }

    pub fn move_event_selection_up(&mut self) {
        if self.selected_event_index > 0 {
            self.selected_event_index -= 1;
        }
    }

    pub fn reset_event_selection(&mut self) {
        self.selected_event_index = 0;
    }

    /// Saves the open form as a new event or as an edit of the event it was
    /// opened for. The form stays open when validation fails.
    pub fn submit_event_form(&mut self) -> Result<String, StateError> {
        let Some(form) = self.event_form.as_ref() else {
            return Err(StateError::NoOpenForm);
        };
        let draft = form.to_draft()?;
        let editing = form.event_id.clone();

        let id = match editing {
            Some(id) => {
                let existing = self
                    .event(&id)
                    .cloned()
                    .ok_or_else(|| StateError::EventNotFound(id.clone()))?;
                let updated = Event {
                    title: draft.title.trim().to_string(),
                    description: draft.description,
                    date: draft.date,
                    end_date: draft.end_date,
                    is_all_day: draft.start_time.is_none(),
                    start_time: draft.start_time,
                    end_time: draft.end_time,
                    category: draft.category,
                    calendar_id: draft.calendar_id,
                    repeat: draft.repeat,
                    ..existing
                };
                self.update_event(updated)?;
                id
            }
            None => self.add_event(draft)?,
        };

        self.event_form = None;
        self.mode = Mode::Normal;
        Ok(id)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn last_day_of_month(date: NaiveDate) -> Option<NaiveDate> {
    first_of_month(date)
        .checked_add_months(Months::new(1))
        .and_then(|d| d.pred_opt())
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormField {
    Title,
    Date,
    EndDate,
    StartTime,
    EndTime,
    Category,
    Repeat,
    Description,
}

impl FormField {
    const ORDER: [FormField; 8] = [
        FormField::Title,
        FormField::Date,
        FormField::EndDate,
        FormField::StartTime,
        FormField::EndTime,
        FormField::Category,
        FormField::Repeat,
        FormField::Description,
    ];
}

/// Text buffers behind the add/edit dialog. Parsing happens on submit.
#[derive(Debug, Clone)]
pub struct EventForm {
    pub title: String,
    pub date: String,
    pub end_date: String,
    pub start_time: String,
    pub end_time: String,
    pub category: Category,
    pub repeat: Option<RepeatFrequency>,
    pub description: String,
    pub calendar_id: String,
    pub active_field: FormField,
    pub event_id: Option<String>,
}

impl EventForm {
    pub fn new(date: NaiveDate, calendar_id: &str) -> Self {
        Self {
            title: String::new(),
            date: date.format("%Y-%m-%d").to_string(),
            end_date: String::new(),
            start_time: String::new(),
            end_time: String::new(),
            category: Category::default(),
            repeat: None,
            description: String::new(),
            calendar_id: calendar_id.to_string(),
            active_field: FormField::Title,
            event_id: None,
        }
    }

    pub fn for_event(event: &Event) -> Self {
        Self {
            title: event.title.clone(),
            date: event.date.format("%Y-%m-%d").to_string(),
            end_date: event
                .end_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            start_time: event.start_time.clone().unwrap_or_default(),
            end_time: event.end_time.clone().unwrap_or_default(),
            category: event.category,
            repeat: event.repeat,
            description: event.description.clone().unwrap_or_default(),
            calendar_id: event.calendar_id.clone(),
            active_field: FormField::Title,
            event_id: Some(event.id.clone()),
        }
    }

    pub fn from_draft(draft: &EventDraft) -> Self {
        let mut form = Self::new(draft.date, &draft.calendar_id);
        form.title = draft.title.clone();
        form.end_date = draft
            .end_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        form.start_time = draft.start_time.clone().unwrap_or_default();
        form.end_time = draft.end_time.clone().unwrap_or_default();
        form.category = draft.category;
        form.repeat = draft.repeat;
        form.description = draft.description.clone().unwrap_or_default();
        form
    }

    pub fn is_editing(&self) -> bool {
        self.event_id.is_some()
    }

    pub fn next_field(&mut self) {
        let idx = FormField::ORDER.iter().position(|f| *f == self.active_field).unwrap_or(0);
        self.active_field = FormField::ORDER[(idx + 1) % FormField::ORDER.len()].clone();
    }

    pub fn prev_field(&mut self) {
        let idx = FormField::ORDER.iter().position(|f| *f == self.active_field).unwrap_or(0);
        let len = FormField::ORDER.len();
        self.active_field = FormField::ORDER[(idx + len - 1) % len].clone();
    }

    /// Buffer behind the active field; the category and repeat fields have none.
    pub fn active_buffer_mut(&mut self) -> Option<&mut String> {
        match self.active_field {
            FormField::Title => Some(&mut self.title),
            FormField::Date => Some(&mut self.date),
            FormField::EndDate => Some(&mut self.end_date),
            FormField::StartTime => Some(&mut self.start_time),
            FormField::EndTime => Some(&mut self.end_time),
            FormField::Description => Some(&mut self.description),
            FormField::Category | FormField::Repeat => None,
        }
    }

    pub fn to_draft(&self) -> Result<EventDraft, ValidationError> {
        let date = parse_form_date(&self.date)?
            .ok_or_else(|| ValidationError::InvalidDate(self.date.clone()))?;
        let end_date = parse_form_date(&self.end_date)?;
        let start_time = non_empty(&self.start_time);
        let end_time = start_time.as_ref().and_then(|_| non_empty(&self.end_time));

        let draft = EventDraft {
            title: self.title.clone(),
            description: non_empty(&self.description),
            date,
            end_date,
            start_time,
            end_time,
            category: self.category,
            color: None,
            calendar_id: self.calendar_id.clone(),
            repeat: self.repeat,
        };
        draft.validate()?;
        Ok(draft)
    }
}

fn non_empty(input: &str) -> Option<String> {
    let trimmed = input.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn parse_form_date(input: &str) -> Result<Option<NaiveDate>, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| ValidationError::InvalidDate(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn state() -> AppState {
        AppState::starting_on(date(2024, 6, 3))
    }

    fn default_id(state: &AppState) -> String {
        state.default_calendar().unwrap().id.clone()
    }

    #[test]
    fn new_state_has_default_calendar_as_current() {
        let state = state();

        assert_eq!(state.calendars().len(), 1);
        assert_eq!(state.current_calendar().map(|c| c.is_default), Some(true));
        assert!(state.events().is_empty());
        assert_eq!(state.displayed_month, date(2024, 6, 1));
    }

    #[test]
    fn add_event_assigns_id_and_palette_color() {
        let mut state = state();
        let cal = default_id(&state);

        let first = state.add_event(EventDraft::new("One", date(2024, 6, 3), &cal)).unwrap();
        let second = state.add_event(EventDraft::new("Two", date(2024, 6, 3), &cal)).unwrap();

        assert_ne!(first, second);
        assert_eq!(state.event(&first).unwrap().color, crate::calendar::PALETTE[0]);
        assert_eq!(state.event(&second).unwrap().color, crate::calendar::PALETTE[1]);
        assert_eq!(state.revision(), 2);
    }

    #[test]
    fn add_event_keeps_explicit_color() {
        let mut state = state();
        let cal = default_id(&state);

        let id = state
            .add_event(EventDraft::new("One", date(2024, 6, 3), &cal).with_color("#123456"))
            .unwrap();

        assert_eq!(state.event(&id).unwrap().color, "#123456");
    }

    #[test]
    fn add_event_to_unknown_calendar_fails() {
        let mut state = state();

        let result = state.add_event(EventDraft::new("One", date(2024, 6, 3), "missing"));

        assert_eq!(result, Err(StateError::CalendarNotFound("missing".to_string())));
        assert_eq!(state.revision(), 0);
    }

    #[test]
    fn add_event_rejects_reversed_range() {
        let mut state = state();
        let cal = default_id(&state);

        let result = state.add_event(EventDraft::new("Trip", date(2024, 6, 5), &cal).until(date(2024, 6, 3)));

        assert!(matches!(result, Err(StateError::Invalid(ValidationError::EndBeforeStart { .. }))));
        assert!(state.events().is_empty());
    }

    #[test]
    fn update_and_delete_missing_event_are_explicit_errors() {
        let mut state = state();
        let cal = default_id(&state);
        let id = state.add_event(EventDraft::new("One", date(2024, 6, 3), &cal)).unwrap();
        let mut ghost = state.event(&id).unwrap().clone();
        ghost.id = "ghost".to_string();

        assert_eq!(state.update_event(ghost), Err(StateError::EventNotFound("ghost".to_string())));
        assert_eq!(state.delete_event("ghost").unwrap_err(), StateError::EventNotFound("ghost".to_string()));
    }

    #[test]
    fn update_event_recomputes_multi_day_flag() {
        let mut state = state();
        let cal = default_id(&state);
        let id = state.add_event(EventDraft::new("Trip", date(2024, 6, 3), &cal)).unwrap();

        let mut event = state.event(&id).unwrap().clone();
        event.end_date = Some(date(2024, 6, 6));
        state.update_event(event).unwrap();

        assert!(state.event(&id).unwrap().is_multi_day);
    }

    #[test]
    fn deleting_calendar_cascades_and_reassigns_current() {
        let mut state = state();
        let default = default_id(&state);
        let work = state.add_calendar(CalendarDraft::new("Work").with_color("#3B82F6")).unwrap();
        state.set_current_calendar(&work).unwrap();
        state.add_event(EventDraft::new("Standup", date(2024, 6, 3), &work)).unwrap();
        let keep = state.add_event(EventDraft::new("Gym", date(2024, 6, 3), &default)).unwrap();

        let removed = state.delete_calendar(&work).unwrap();

        assert_eq!(removed.calendar.name, "Work");
        assert_eq!(removed.events.len(), 1);
        assert_eq!(state.pending_deletions(), removed.events.as_slice());
        assert_eq!(state.events().len(), 1);
        assert_eq!(state.events()[0].id, keep);
        assert_eq!(state.current_calendar_id(), Some(default.as_str()));
    }

    #[test]
    fn deleting_non_current_calendar_keeps_current() {
        let mut state = state();
        let default = default_id(&state);
        let work = state.add_calendar(CalendarDraft::new("Work")).unwrap();

        state.delete_calendar(&work).unwrap();

        assert_eq!(state.current_calendar_id(), Some(default.as_str()));
    }

    #[test]
    fn default_calendar_cannot_be_deleted() {
        let mut state = state();
        let default = default_id(&state);

        assert_eq!(state.delete_calendar(&default), Err(StateError::DefaultCalendarLocked));
        assert_eq!(state.calendars().len(), 1);
    }

    #[test]
    fn current_follows_default_after_it_moves() {
        let mut state = state();
        let default = default_id(&state);
        let home = state.add_calendar(CalendarDraft::new("Home")).unwrap();
        let work = state.add_calendar(CalendarDraft::new("Work")).unwrap();
        state.set_default_calendar(&home).unwrap();
        state.set_current_calendar(&home).unwrap();

        state.set_default_calendar(&work).unwrap();
        state.delete_calendar(&home).unwrap();

        assert_eq!(state.current_calendar_id(), Some(work.as_str()));
        assert!(state.calendar(&default).is_some_and(|c| !c.is_default));
    }

    #[test]
    fn new_calendars_get_unused_palette_colors() {
        let mut state = state();
        let a = state.add_calendar(CalendarDraft::new("A")).unwrap();
        let b = state.add_calendar(CalendarDraft::new("B")).unwrap();

        assert_ne!(state.calendar(&a).unwrap().color, state.calendar(&b).unwrap().color);
    }

    #[test]
    fn update_calendar_preserves_default_flag() {
        let mut state = state();
        let mut calendar = state.default_calendar().unwrap().clone();
        calendar.name = "Personal".to_string();
        calendar.is_default = false;

        state.update_calendar(calendar).unwrap();

        let stored = state.default_calendar().unwrap();
        assert_eq!(stored.name, "Personal");
        assert!(stored.is_default);
    }

    #[test]
    fn hidden_calendar_events_are_not_visible() {
        let mut state = state();
        let cal = default_id(&state);
        state.add_event(EventDraft::new("One", date(2024, 6, 3), &cal)).unwrap();

        assert_eq!(state.toggle_calendar_visibility(&cal), Ok(false));
        assert!(state.visible_events().is_empty());
        assert_eq!(state.toggle_calendar_visibility(&cal), Ok(true));
        assert_eq!(state.visible_events().len(), 1);
    }

    #[test]
    fn toggle_unknown_calendar_fails() {
        let mut state = state();
        assert_eq!(
            state.toggle_calendar_visibility("nope"),
            Err(StateError::CalendarNotFound("nope".to_string()))
        );
    }

    #[test]
    fn filters_narrow_visible_events() {
        let mut state = state();
        let cal = default_id(&state);
        state
            .add_event(EventDraft::new("Standup", date(2024, 6, 3), &cal).with_category(Category::Work))
            .unwrap();
        state
            .add_event(EventDraft::new("Dentist", date(2024, 6, 3), &cal).with_category(Category::Health))
            .unwrap();

        state.set_category_filter(Some(Category::Work));
        assert_eq!(state.filtered_events().len(), 1);

        state.set_category_filter(None);
        state.set_search(Some("dent".to_string()));
        let titles: Vec<&str> = state.filtered_events().iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Dentist"]);

        state.set_search(Some("   ".to_string()));
        assert_eq!(state.search_query, None);
        assert_eq!(state.filtered_events().len(), 2);
    }

    #[test]
    fn focus_calendar_hides_the_others() {
        let mut state = state();
        let default = default_id(&state);
        let work = state.add_calendar(CalendarDraft::new("Work")).unwrap();

        state.focus_calendar(&work).unwrap();

        assert!(!state.calendar(&default).unwrap().is_visible);
        assert!(state.calendar(&work).unwrap().is_visible);
        assert_eq!(state.current_calendar_id(), Some(work.as_str()));

        state.show_all_calendars();
        assert!(state.calendars().iter().all(|c| c.is_visible));
    }

    #[test]
    fn navigate_month_moves_display_and_clamps_selection() {
        let mut state = AppState::starting_on(date(2024, 1, 31));

        state.navigate_month(MonthDirection::Next);
        assert_eq!(state.displayed_month, date(2024, 2, 1));
        assert_eq!(state.selected_date, date(2024, 2, 29));

        state.navigate_month(MonthDirection::Previous);
        state.navigate_month(MonthDirection::Previous);
        assert_eq!(state.displayed_month, date(2023, 12, 1));
        assert_eq!(state.selected_date, date(2023, 12, 29));
    }

    #[test]
    fn navigate_month_does_not_touch_persisted_revision() {
        let mut state = state();
        state.navigate_month(MonthDirection::Next);
        assert_eq!(state.revision(), 0);
    }

    #[test]
    fn merge_remote_events_upserts_and_reassigns_unknown_calendars() {
        let mut state = state();
        let cal = default_id(&state);
        let local = state.add_event(EventDraft::new("Local", date(2024, 6, 3), &cal)).unwrap();

        let mut updated = state.event(&local).unwrap().clone();
        updated.title = "From server".to_string();
        let mut foreign = updated.clone();
        foreign.id = "remote-1".to_string();
        foreign.calendar_id = "server-only".to_string();

        let merged = state.merge_remote_events(vec![updated, foreign]);

        assert_eq!(merged, 2);
        assert_eq!(state.event(&local).unwrap().title, "From server");
        assert_eq!(state.event("remote-1").unwrap().calendar_id, cal);
    }

    #[test]
    fn pull_after_calendar_delete_does_not_resurrect_events() {
        let mut state = state();
        let work = state.add_calendar(CalendarDraft::new("Work").with_color("#3B82F6")).unwrap();
        let id = state
            .add_event(EventDraft::new("Standup", date(2024, 6, 3), &work).with_times("09:00", "09:15"))
            .unwrap();
        let server_copy = state.event(&id).unwrap().clone();

        state.delete_calendar(&work).unwrap();
        let merged = state.merge_remote_events(vec![server_copy.clone()]);

        assert_eq!(merged, 0);
        assert!(state.event(&id).is_none());

        state.take_pending_deletions();
        let mut restored = AppState::from_snapshot(state.snapshot(), date(2024, 6, 3));
        assert_eq!(restored.merge_remote_events(vec![server_copy]), 0);
        assert!(restored.events().is_empty());
    }

    #[test]
    fn pending_deletions_are_taken_once() {
        let mut state = state();
        let work = state.add_calendar(CalendarDraft::new("Work")).unwrap();
        state.add_event(EventDraft::new("Standup", date(2024, 6, 3), &work)).unwrap();
        state.delete_calendar(&work).unwrap();

        let taken = state.take_pending_deletions();
        assert_eq!(taken.len(), 1);
        assert!(state.take_pending_deletions().is_empty());

        state.queue_remote_deletion(taken[0].clone());
        state.queue_remote_deletion(taken[0].clone());
        assert_eq!(state.pending_deletions().len(), 1);
    }

    #[test]
    fn merge_keeps_local_repeat_when_server_omits_it() {
        let mut state = state();
        let cal = default_id(&state);
        let id = state
            .add_event(EventDraft::new("Retro", date(2024, 6, 3), &cal).with_repeat(RepeatFrequency::Weekly))
            .unwrap();
        let mut pulled = state.event(&id).unwrap().clone();
        pulled.repeat = None;
        pulled.title = "Retro (moved)".to_string();

        state.merge_remote_events(vec![pulled]);

        let event = state.event(&id).unwrap();
        assert_eq!(event.title, "Retro (moved)");
        assert_eq!(event.repeat, Some(RepeatFrequency::Weekly));
    }

    #[test]
    fn rekey_replaces_pulled_copy_with_same_id() {
        let mut state = state();
        let cal = default_id(&state);
        let local = state.add_event(EventDraft::new("Dentist", date(2024, 6, 3), &cal)).unwrap();
        let mut pulled = state.event(&local).unwrap().clone();
        pulled.id = "srv-1".to_string();
        state.merge_remote_events(vec![pulled]);
        assert_eq!(state.events().len(), 2);

        state.rekey_event(&local, "srv-1").unwrap();

        assert_eq!(state.events().len(), 1);
        assert_eq!(state.events()[0].id, "srv-1");
        assert_eq!(state.rekey_event("missing", "srv-2"), Err(StateError::EventNotFound("missing".to_string())));
    }

    #[test]
    fn edit_form_keeps_and_changes_repeat() {
        let mut state = state();
        let cal = default_id(&state);
        let id = state
            .add_event(EventDraft::new("Retro", date(2024, 6, 3), &cal).with_repeat(RepeatFrequency::Monthly))
            .unwrap();

        let form = EventForm::for_event(state.event(&id).unwrap());
        assert_eq!(form.repeat, Some(RepeatFrequency::Monthly));
        let mut form = form;
        form.repeat = Some(RepeatFrequency::Yearly);
        state.event_form = Some(form);
        state.submit_event_form().unwrap();

        assert_eq!(state.event(&id).unwrap().repeat, Some(RepeatFrequency::Yearly));
    }

    #[test]
    fn snapshot_round_trip_restores_registry() {
        let mut state = state();
        let work = state.add_calendar(CalendarDraft::new("Work")).unwrap();
        state.set_current_calendar(&work).unwrap();
        state.add_event(EventDraft::new("Standup", date(2024, 6, 3), &work)).unwrap();
        state.toggle_dark_mode();

        let restored = AppState::from_snapshot(state.snapshot(), date(2024, 6, 3));

        assert_eq!(restored.calendars(), state.calendars());
        assert_eq!(restored.events(), state.events());
        assert_eq!(restored.current_calendar_id(), Some(work.as_str()));
        assert!(restored.dark_mode());
    }

    #[test]
    fn snapshot_with_stale_current_falls_back_to_default() {
        let state = state();
        let mut snapshot = state.snapshot();
        snapshot.current_calendar_id = Some("gone".to_string());

        let restored = AppState::from_snapshot(snapshot, date(2024, 6, 3));

        assert_eq!(restored.current_calendar_id(), Some(default_id(&state).as_str()));
    }

    #[test]
    fn submit_form_creates_then_edits() {
        let mut state = state();
        let cal = default_id(&state);
        let mut form = EventForm::new(date(2024, 6, 3), &cal);
        form.title = "Standup".to_string();
        form.start_time = "09:00".to_string();
        form.end_time = "09:15".to_string();
        state.event_form = Some(form);
        state.mode = Mode::Insert;

        let id = state.submit_event_form().unwrap();
        assert_eq!(state.mode, Mode::Normal);
        assert!(state.event_form.is_none());

        let mut edit = EventForm::for_event(state.event(&id).unwrap());
        edit.title = "Daily standup".to_string();
        edit.start_time.clear();
        state.event_form = Some(edit);
        state.submit_event_form().unwrap();

        let event = state.event(&id).unwrap();
        assert_eq!(event.title, "Daily standup");
        assert!(event.is_all_day);
        assert_eq!(event.end_time, None);
        assert_eq!(state.events().len(), 1);
    }

    #[test]
    fn submit_form_with_bad_date_keeps_form_open() {
        let mut state = state();
        let cal = default_id(&state);
        let mut form = EventForm::new(date(2024, 6, 3), &cal);
        form.title = "Trip".to_string();
        form.end_date = "2024-13-40".to_string();
        state.event_form = Some(form);

        let result = state.submit_event_form();

        assert_eq!(
            result,
            Err(StateError::Invalid(ValidationError::InvalidDate("2024-13-40".to_string())))
        );
        assert!(state.event_form.is_some());
    }

    #[test]
    fn form_fields_cycle_both_ways() {
        let mut form = EventForm::new(date(2024, 6, 3), "cal");
        form.prev_field();
        assert_eq!(form.active_field, FormField::Description);
        form.next_field();
        form.next_field();
        assert_eq!(form.active_field, FormField::Date);
    }

    #[test]
    fn selected_event_follows_day_order() {
        let mut state = state();
        let cal = default_id(&state);
        state
            .add_event(EventDraft::new("Late", date(2024, 6, 3), &cal).with_times("15:00", "16:00"))
            .unwrap();
        state
            .add_event(EventDraft::new("Early", date(2024, 6, 3), &cal).with_times("08:00", "09:00"))
            .unwrap();

        assert_eq!(state.get_selected_event().map(|e| e.title.as_str()), Some("Early"));
        state.move_event_selection_down();
        assert_eq!(state.get_selected_event().map(|e| e.title.as_str()), Some("Late"));
        state.move_event_selection_down();
        assert_eq!(state.selected_event_index, 1);
    }
}

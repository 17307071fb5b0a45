use chrono::NaiveDate;

use crate::app::{AppState, EventForm, Mode};
use crate::bus::{AppMessage, MessageBus};
use crate::calendar::{quick_add, CalendarDraft, Category};

#[derive(Debug, PartialEq)]
pub enum Command {
    Quit,
    Sync,
    Goto(NaiveDate),
    NewEvent(Option<String>),
    CreateCalendar { name: String, color: Option<String> },
    UseCalendar(String),
    HideCalendar(String),
    ShowCalendar(String),
    DeleteCalendar(String),
    DefaultCalendar(String),
    OpenCalendar(String),
    AllCalendars,
    JoinCalendar(String),
    Filter(Option<Category>),
    Search(Option<String>),
    ToggleDark,
    Help,
    Error(String),
}

/// What the session loop must do after a command has been applied.
#[derive(Debug, PartialEq)]
pub enum CommandEffect {
    None,
    Quit,
    Sync,
}

pub fn parse_date_argument(input: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(input, "%Y/%m/%d"))
        .ok()
}

pub fn parse_command(input: &str) -> Command {
    let trimmed = input.trim();

    if let Some(query) = trimmed.strip_prefix('/') {
        let query = query.trim();
        return Command::Search((!query.is_empty()).then(|| query.to_string()));
    }

    let Some(command_text) = trimmed.strip_prefix(':') else {
        return Command::Error("Commands must start with ':'".to_string());
    };

    let parts: Vec<&str> = command_text.split_whitespace().collect();

    if parts.is_empty() {
        return Command::Error("Empty command".to_string());
    }

    let rest = parts[1..].join(" ");
    let require_name = |make: fn(String) -> Command| {
        if rest.is_empty() {
            Command::Error(format!("{} requires a calendar name", parts[0]))
        } else {
            make(rest.clone())
        }
    };

    match parts[0] {
        "q" | "quit" => Command::Quit,
        "w" | "write" | "sync" => Command::Sync,
        "help" => Command::Help,
        "dark" => Command::ToggleDark,
        "all" => Command::AllCalendars,
        "goto" => {
            if parts.len() < 2 {
                Command::Error("goto requires a date argument".to_string())
            } else if let Some(date) = parse_date_argument(parts[1]) {
                Command::Goto(date)
            } else {
                Command::Error(format!("Invalid date format: {}", parts[1]))
            }
        }
        "new" => Command::NewEvent((!rest.is_empty()).then(|| rest.clone())),
        "cal" | "calendar" => {
            if parts.len() < 2 {
                return Command::Error("cal requires a calendar name".to_string());
            }
            let (name_parts, color) = match parts.last() {
                Some(last) if last.starts_with('#') && parts.len() > 2 => {
                    (&parts[1..parts.len() - 1], Some(last.to_string()))
                }
                _ => (&parts[1..], None),
            };
            Command::CreateCalendar { name: name_parts.join(" "), color }
        }
        "use" => require_name(Command::UseCalendar),
        "hide" => require_name(Command::HideCalendar),
        "show" => require_name(Command::ShowCalendar),
        "delcal" => require_name(Command::DeleteCalendar),
        "default" => require_name(Command::DefaultCalendar),
        "open" => require_name(Command::OpenCalendar),
        "join" => require_name(Command::JoinCalendar),
        "filter" => match parts.get(1) {
            None | Some(&"all") => Command::Filter(None),
            Some(name) => match Category::parse(name) {
                Some(category) => Command::Filter(Some(category)),
                None => Command::Error(format!("Unknown category: {}", name)),
            },
        },
        "search" => Command::Search((!rest.is_empty()).then(|| rest.clone())),
        _ => Command::Error(format!("Unknown command: {}", parts[0])),
    }
}

/// Applies everything that only touches local state. Cross-view requests go
/// through the bus; quitting and syncing are left to the caller.
pub fn apply_command(command: Command, state: &mut AppState, bus: &MessageBus) -> CommandEffect {
    state.command_buffer.clear();
    state.mode = Mode::Normal;

    let result: Result<Option<String>, String> = match command {
        Command::Quit => return CommandEffect::Quit,
        Command::Sync => return CommandEffect::Sync,
        Command::Help => {
            state.show_help = true;
            state.help_scroll = 0;
            Ok(None)
        }
        Command::Goto(date) => {
            state.select_date(date);
            Ok(None)
        }
        Command::NewEvent(text) => open_new_event(state, text),
        Command::CreateCalendar { name, color } => {
            let draft = match color.as_deref() {
                Some(color) => CalendarDraft::new(name.clone()).with_color(color),
                None => CalendarDraft::new(name.clone()),
            };
            state
                .add_calendar(draft)
                .map(|_| Some(format!("Created calendar {}", name.trim())))
                .map_err(|e| e.to_string())
        }
        Command::UseCalendar(name) => with_calendar(state, &name, |state, id| {
            state.set_current_calendar(id).map(|_| format!("Current calendar: {}", name))
        }),
        Command::HideCalendar(name) => set_visibility(state, &name, false),
        Command::ShowCalendar(name) => set_visibility(state, &name, true),
        Command::DeleteCalendar(name) => with_calendar(state, &name, |state, id| {
            state
                .delete_calendar(id)
                .map(|removed| {
                    format!(
                        "Deleted calendar {} and {} events",
                        removed.calendar.name,
                        removed.events.len()
                    )
                })
        }),
        Command::DefaultCalendar(name) => with_calendar(state, &name, |state, id| {
            state.set_default_calendar(id).map(|_| format!("Default calendar: {}", name))
        }),
        Command::OpenCalendar(name) => match state.calendar_by_name(&name) {
            Some(calendar) => {
                bus.send(AppMessage::FocusCalendar(calendar.id.clone()));
                Ok(None)
            }
            None => Err(format!("No calendar named {}", name)),
        },
        Command::AllCalendars => {
            bus.send(AppMessage::ShowAllCalendars);
            Ok(None)
        }
        Command::JoinCalendar(name) => {
            bus.send(AppMessage::CalendarJoined { name, color: None });
            Ok(None)
        }
        Command::Filter(category) => {
            state.set_category_filter(category);
            Ok(Some(match category {
                Some(category) => format!("Showing {} events", category),
                None => "Showing all categories".to_string(),
            }))
        }
        Command::Search(query) => {
            let message = query.as_ref().map(|q| format!("Search: {}", q));
            state.set_search(query);
            Ok(message)
        }
        Command::ToggleDark => {
            state.toggle_dark_mode();
            Ok(None)
        }
        Command::Error(message) => Err(message),
    };

    match result {
        Ok(Some(message)) => state.status_message = Some(message),
        Ok(None) => {}
        Err(message) => {
            tracing::debug!("Command failed: {}", message);
            state.status_message = Some(message);
        }
    }
    CommandEffect::None
}

fn open_new_event(state: &mut AppState, text: Option<String>) -> Result<Option<String>, String> {
    let calendar_id = state
        .current_calendar_id()
        .map(str::to_string)
        .ok_or_else(|| "Create a calendar first".to_string())?;

    let form = match text {
        Some(text) => {
            let today = chrono::Local::now().date_naive();
            let draft = quick_add::parse(&text, today, &calendar_id);
            EventForm::from_draft(&draft)
        }
        None => EventForm::new(state.selected_date, &calendar_id),
    };
    state.event_form = Some(form);
    state.mode = Mode::Insert;
    Ok(None)
}

fn with_calendar<F>(state: &mut AppState, name: &str, action: F) -> Result<Option<String>, String>
where
    F: FnOnce(&mut AppState, &str) -> Result<String, crate::app::StateError>,
{
    let id = state
        .calendar_by_name(name)
        .map(|c| c.id.clone())
        .ok_or_else(|| format!("No calendar named {}", name))?;
    action(state, &id).map(Some).map_err(|e| e.to_string())
}

fn set_visibility(state: &mut AppState, name: &str, visible: bool) -> Result<Option<String>, String> {
    with_calendar(state, name, |state, id| {
        let is_visible = state.calendar(id).is_some_and(|c| c.is_visible);
        if is_visible != visible {
            state.toggle_calendar_visibility(id)?;
        }
        Ok(format!("{} {}", if visible { "Showing" } else { "Hiding" }, name))
    })
}

pub mod event;
pub mod calendar_type;
pub mod color;
pub mod quick_add;

pub use event::{Category, Event, EventDraft, RepeatFrequency, ValidationError};
pub use calendar_type::{Calendar, CalendarDraft, DEFAULT_CALENDAR_COLOR, DEFAULT_CALENDAR_NAME};
pub use color::{next_available_color, pick_event_color, PALETTE};

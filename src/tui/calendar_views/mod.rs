pub mod calendar_list;
pub mod event_list;
pub mod month;

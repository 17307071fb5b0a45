pub mod app;
pub mod bus;
pub mod calendar;
pub mod input;
pub mod storage;
pub mod sync;
pub mod ui;

pub use app::{AppState, Mode, SyncStatus};
pub use bus::{AppMessage, MessageBus};
pub use calendar::{Calendar, Category, Event};

pub use input::{command_mode, insert_mode, normal_mode};

pub mod api;
pub mod sync_engine;

pub use api::{ApiClient, ApiError, CommunityPost, DateRange, Schedule, ScheduleApi};
pub use sync_engine::{SyncEngine, SyncError};

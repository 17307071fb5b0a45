use crate::app::{AppState, StateError};
use crate::calendar::Event;
use crate::storage::config::Config;
use crate::sync::api::{ApiClient, ApiError, DateRange, ScheduleApi};
use crate::ui::month_view;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("API error: {0}")]
    ApiError(#[from] ApiError),
    #[error("State error: {0}")]
    StateError(#[from] StateError),
    #[error("Displayed month has no representable grid")]
    OutOfRange,
}

/// Moves events between the state container and the schedule server.
pub struct SyncEngine<A: ScheduleApi> {
    api: A,
}

impl SyncEngine<ApiClient> {
    /// Only builds an engine when a token is stored and offline mode is off.
    pub fn from_config(config: &Config, token: Option<String>) -> Result<Option<Self>, SyncError> {
        if config.sync.offline_mode {
            tracing::info!("Offline mode enabled, sync disabled");
            return Ok(None);
        }
        let Some(token) = token else {
            tracing::info!("No auth token stored, sync disabled");
            return Ok(None);
        };
        let client = ApiClient::from_config(&config.api)?.with_token(Some(token));
        Ok(Some(Self::new(client)))
    }
}

impl<A: ScheduleApi> SyncEngine<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Range covered by the 42-cell grid of the displayed month.
    pub fn visible_range(state: &AppState) -> Result<DateRange, SyncError> {
        let (start, end) = month_view::grid_range(state.displayed_month, state.week_start)
            .ok_or(SyncError::OutOfRange)?;
        Ok(DateRange::new(start, end))
    }

    /// Sends queued deletes, then fetches the schedules for the visible grid
    /// and merges them into the state.
    pub async fn pull(&self, state: &mut AppState) -> Result<usize, SyncError> {
        self.push_pending_deletions(state).await?;
        let range = Self::visible_range(state)?;
        let remote = self.api.fetch_schedules(range).await?;
        let merged = state.merge_remote_events(remote);
        tracing::info!("Pulled {} events for {} to {}", merged, range.start, range.end);
        Ok(merged)
    }

    /// Creates the event remotely and adopts the server id. Returns the new id.
    pub async fn push_created(&self, state: &mut AppState, local_id: &str) -> Result<String, SyncError> {
        let event = state
            .event(local_id)
            .cloned()
            .ok_or_else(|| StateError::EventNotFound(local_id.to_string()))?;
        let remote_id = self.api.create_schedule(&event).await?;
        if remote_id != local_id {
            state.rekey_event(local_id, &remote_id)?;
        }
        Ok(remote_id)
    }

    pub async fn push_updated(&self, state: &AppState, id: &str) -> Result<(), SyncError> {
        let event = state
            .event(id)
            .ok_or_else(|| StateError::EventNotFound(id.to_string()))?;
        self.api.update_schedule(event).await?;
        Ok(())
    }

    /// The event is already gone from the state, so it is passed in.
    pub async fn push_deleted(&self, event: &Event) -> Result<(), SyncError> {
        match self.api.delete_schedule(&event.id).await {
            Ok(()) => Ok(()),
            Err(ApiError::NotFound(_)) => {
                tracing::debug!("Schedule {} was already gone remotely", event.id);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Deletes queued events remotely. On the first failure the unsent events
    /// go back on the queue.
    pub async fn push_pending_deletions(&self, state: &mut AppState) -> Result<usize, SyncError> {
        let mut queue = state.take_pending_deletions().into_iter();
        let mut sent = 0;

        while let Some(event) = queue.next() {
            if let Err(e) = self.push_deleted(&event).await {
                tracing::warn!("Remote delete of {} failed, keeping it queued: {}", event.id, e);
                state.queue_remote_deletion(event);
                for rest in queue {
                    state.queue_remote_deletion(rest);
                }
                return Err(e);
            }
            sent += 1;
        }

        if sent > 0 {
            tracing::info!("Sent {} queued remote deletes", sent);
        }
        Ok(sent)
    }
}

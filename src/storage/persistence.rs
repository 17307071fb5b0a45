use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

use crate::calendar::{Calendar, Event};

pub const SCHEMA_VERSION: u32 = 1;

pub const KEY_EVENTS: &str = "events";
pub const KEY_CALENDARS: &str = "calendars";
pub const KEY_CURRENT_CALENDAR: &str = "currentCalendarId";
pub const KEY_DARK_MODE: &str = "darkMode";
pub const KEY_AUTH_TOKEN: &str = "authToken";
pub const KEY_DELETED_CALENDARS: &str = "deletedCalendarIds";
pub const KEY_PENDING_DELETIONS: &str = "pendingDeletions";

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Key '{key}' was written by schema version {found}, which this build cannot read")]
    UnsupportedVersion { key: String, found: u64 },
    #[error("Key '{key}' holds a malformed envelope: {reason}")]
    MalformedEnvelope { key: String, reason: String },
}

/// Key/value medium the snapshot is written to.
#[cfg_attr(test, mockall::automock)]
pub trait StoragePort {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError>;
    fn remove(&mut self, key: &str) -> Result<(), PersistenceError>;
}

/// Everything the state container persists between sessions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub events: Vec<Event>,
    pub calendars: Vec<Calendar>,
    pub current_calendar_id: Option<String>,
    pub dark_mode: bool,
    /// Ids of calendars deleted locally; remote events still pointing at them
    /// are not merged back.
    pub deleted_calendar_ids: Vec<String>,
    /// Events removed locally whose remote delete has not gone through yet.
    pub pending_deletions: Vec<Event>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    version: u32,
    data: T,
}

fn encode<T: Serialize>(data: &T) -> Result<String, PersistenceError> {
    Ok(serde_json::to_string(&Envelope { version: SCHEMA_VERSION, data })?)
}

/// Accepts the current envelope, bare JSON written before versioning, and raw
/// unquoted strings.
fn decode<T: DeserializeOwned>(key: &str, raw: &str) -> Result<T, PersistenceError> {
    let value: Value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));

    let data = match value {
        Value::Object(mut map) if map.contains_key("version") => {
            let malformed = |reason: &str| PersistenceError::MalformedEnvelope {
                key: key.to_string(),
                reason: reason.to_string(),
            };
            let found = map
                .get("version")
                .and_then(Value::as_u64)
                .ok_or_else(|| malformed("version is not a non-negative integer"))?;
            if found > u64::from(SCHEMA_VERSION) {
                return Err(PersistenceError::UnsupportedVersion { key: key.to_string(), found });
            }
            map.remove("data").ok_or_else(|| malformed("data is missing"))?
        }
        other => {
            tracing::debug!("Key '{}' holds an unversioned value, reading as legacy", key);
            other
        }
    };

    Ok(serde_json::from_value(data)?)
}

pub struct Persistence<S: StoragePort> {
    store: S,
}

impl<S: StoragePort> Persistence<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, PersistenceError> {
        match self.store.get(key)? {
            Some(raw) => decode(key, &raw).map(Some),
            None => Ok(None),
        }
    }

    fn write<T: Serialize>(&mut self, key: &str, data: &T) -> Result<(), PersistenceError> {
        let encoded = encode(data)?;
        self.store.set(key, &encoded)
    }

    pub fn load(&self) -> Result<Snapshot, PersistenceError> {
        let snapshot = Snapshot {
            events: self.read(KEY_EVENTS)?.unwrap_or_default(),
            calendars: self.read(KEY_CALENDARS)?.unwrap_or_default(),
            current_calendar_id: self.read(KEY_CURRENT_CALENDAR)?,
            dark_mode: self.read(KEY_DARK_MODE)?.unwrap_or(false),
            deleted_calendar_ids: self.read(KEY_DELETED_CALENDARS)?.unwrap_or_default(),
            pending_deletions: self.read(KEY_PENDING_DELETIONS)?.unwrap_or_default(),
        };
        tracing::debug!(
            "Loaded snapshot with {} events and {} calendars",
            snapshot.events.len(),
            snapshot.calendars.len()
        );
        Ok(snapshot)
    }

    pub fn save(&mut self, snapshot: &Snapshot) -> Result<(), PersistenceError> {
        self.write(KEY_EVENTS, &snapshot.events)?;
        self.write(KEY_CALENDARS, &snapshot.calendars)?;
        match &snapshot.current_calendar_id {
            Some(id) => self.write(KEY_CURRENT_CALENDAR, id)?,
            None => self.store.remove(KEY_CURRENT_CALENDAR)?,
        }
        self.write(KEY_DARK_MODE, &snapshot.dark_mode)?;
        self.write(KEY_DELETED_CALENDARS, &snapshot.deleted_calendar_ids)?;
        self.write(KEY_PENDING_DELETIONS, &snapshot.pending_deletions)?;
        tracing::debug!("Saved snapshot with {} events", snapshot.events.len());
        Ok(())
    }

    /// The stored dark mode flag, or `None` when it was never saved.
    pub fn dark_mode_preference(&self) -> Result<Option<bool>, PersistenceError> {
        self.read(KEY_DARK_MODE)
    }

    pub fn auth_token(&self) -> Result<Option<String>, PersistenceError> {
        self.read(KEY_AUTH_TOKEN)
    }

    pub fn set_auth_token(&mut self, token: &str) -> Result<(), PersistenceError> {
        self.write(KEY_AUTH_TOKEN, &token)
    }

    pub fn clear_auth_token(&mut self) -> Result<(), PersistenceError> {
        self.store.remove(KEY_AUTH_TOKEN)
    }
}

impl<S: StoragePort + ?Sized> StoragePort for Box<S> {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), PersistenceError> {
        (**self).remove(key)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StoragePort for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), PersistenceError> {
        self.entries.remove(key);
        Ok(())
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::color::is_valid_hex_color;
use crate::calendar::event::ValidationError;

pub const DEFAULT_CALENDAR_NAME: &str = "My Calendar";
pub const DEFAULT_CALENDAR_COLOR: &str = "#3B82F6";

fn visible_by_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Calendar {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub color: String,
    #[serde(default = "visible_by_default")]
    pub is_visible: bool,
    #[serde(default)]
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

impl Calendar {
    pub fn default_calendar(id: String) -> Self {
        Self {
            id,
            name: DEFAULT_CALENDAR_NAME.to_string(),
            description: None,
            color: DEFAULT_CALENDAR_COLOR.to_string(),
            is_visible: true,
            is_default: true,
            created_at: Utc::now(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyCalendarName);
        }
        if !is_valid_hex_color(&self.color) {
            return Err(ValidationError::InvalidColor(self.color.clone()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalendarDraft {
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
}

impl CalendarDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            color: None,
        }
    }

    pub fn with_color(mut self, color: &str) -> Self {
        self.color = Some(color.to_string());
        self
    }

    pub fn into_calendar(self, id: String, assigned_color: String) -> Result<Calendar, ValidationError> {
        let calendar = Calendar {
            id,
            name: self.name.trim().to_string(),
            description: self.description.filter(|d| !d.trim().is_empty()),
            color: self.color.unwrap_or(assigned_color),
            is_visible: true,
            is_default: false,
            created_at: Utc::now(),
        };
        calendar.validate()?;
        Ok(calendar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_calendar_is_visible_and_default() {
        let calendar = Calendar::default_calendar("primary".to_string());

        assert!(calendar.is_default);
        assert!(calendar.is_visible);
        assert_eq!(calendar.name, DEFAULT_CALENDAR_NAME);
    }

    #[test]
    fn draft_uses_explicit_color() {
        let calendar = CalendarDraft::new("Work")
            .with_color("#3B82F6")
            .into_calendar("work".to_string(), "#FFB3BA".to_string())
            .unwrap();

        assert_eq!(calendar.color, "#3B82F6");
        assert!(!calendar.is_default);
    }

    #[test]
    fn draft_with_blank_name_is_rejected() {
        let result = CalendarDraft::new("  ").into_calendar("x".to_string(), "#FFB3BA".to_string());

        assert_eq!(result, Err(ValidationError::EmptyCalendarName));
    }

    #[test]
    fn missing_visibility_defaults_to_visible() {
        let json = r##"{"id":"a","name":"Team","color":"#E0BBE4","createdAt":"2024-01-01T00:00:00Z"}"##;

        let calendar: Calendar = serde_json::from_str(json).unwrap();

        assert!(calendar.is_visible);
        assert!(!calendar.is_default);
    }
}

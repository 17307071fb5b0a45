use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

use crate::calendar::color::is_valid_hex_color;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Title is required")]
    EmptyTitle,
    #[error("Calendar name is required")]
    EmptyCalendarName,
    #[error("End date {end} is before start date {start}")]
    EndBeforeStart { start: NaiveDate, end: NaiveDate },
    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("Invalid time '{0}', expected HH:MM")]
    InvalidTime(String),
    #[error("End time {end} is before start time {start}")]
    EndTimeBeforeStartTime { start: String, end: String },
    #[error("Invalid color '{0}', expected #RRGGBB")]
    InvalidColor(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Personal,
    Work,
    Important,
    Family,
    Health,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Personal,
        Category::Work,
        Category::Important,
        Category::Family,
        Category::Health,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Personal => "personal",
            Category::Work => "work",
            Category::Important => "important",
            Category::Family => "family",
            Category::Health => "health",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        let lowered = input.trim().to_lowercase();
        Self::ALL.into_iter().find(|c| c.as_str() == lowered)
    }

    /// Cycles through categories in declaration order, used by the event form.
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|c| *c == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Repeat setting captured by the event form. Stored and synced only;
/// occurrences are never generated from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatFrequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl RepeatFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepeatFrequency::Daily => "daily",
            RepeatFrequency::Weekly => "weekly",
            RepeatFrequency::Monthly => "monthly",
            RepeatFrequency::Yearly => "yearly",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "daily" => Some(RepeatFrequency::Daily),
            "weekly" => Some(RepeatFrequency::Weekly),
            "monthly" => Some(RepeatFrequency::Monthly),
            "yearly" => Some(RepeatFrequency::Yearly),
            _ => None,
        }
    }

    /// Steps through none, daily, weekly, monthly, yearly and back to none.
    pub fn cycle(current: Option<Self>) -> Option<Self> {
        match current {
            None => Some(RepeatFrequency::Daily),
            Some(RepeatFrequency::Daily) => Some(RepeatFrequency::Weekly),
            Some(RepeatFrequency::Weekly) => Some(RepeatFrequency::Monthly),
            Some(RepeatFrequency::Monthly) => Some(RepeatFrequency::Yearly),
            Some(RepeatFrequency::Yearly) => None,
        }
    }
}

impl fmt::Display for RepeatFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(deserialize_with = "calendar_day::deserialize")]
    pub date: NaiveDate,
    #[serde(
        default,
        deserialize_with = "calendar_day::deserialize_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default)]
    pub category: Category,
    pub color: String,
    #[serde(default)]
    pub is_all_day: bool,
    #[serde(default)]
    pub is_multi_day: bool,
    pub calendar_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat: Option<RepeatFrequency>,
}

impl Event {
    /// Last calendar day the event covers.
    pub fn last_day(&self) -> NaiveDate {
        self.end_date.unwrap_or(self.date)
    }

    pub fn occurs_on(&self, day: NaiveDate) -> bool {
        if self.is_multi_day {
            self.date <= day && day <= self.last_day()
        } else {
            self.date == day
        }
    }

    pub fn span_days(&self) -> i64 {
        (self.last_day() - self.date).num_days() + 1
    }

    /// Brings the derived flags in line with the fields they summarise.
    pub fn normalize(&mut self) {
        if self.end_date == Some(self.date) {
            self.end_date = None;
        }
        self.is_multi_day = self.end_date.is_some();

        if self.start_time.is_none() {
            self.is_all_day = true;
        }
        if self.is_all_day {
            self.start_time = None;
            self.end_time = None;
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_schedule(
            &self.title,
            self.date,
            self.end_date,
            self.start_time.as_deref(),
            self.end_time.as_deref(),
        )?;
        if !is_valid_hex_color(&self.color) {
            return Err(ValidationError::InvalidColor(self.color.clone()));
        }
        Ok(())
    }

    pub fn matches_search(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.title.to_lowercase().contains(&needle)
            || self.description
                .as_ref()
                .map(|d| d.to_lowercase().contains(&needle))
                .unwrap_or(false)
    }

    pub fn time_label(&self) -> String {
        match (&self.start_time, &self.end_time) {
            (Some(start), Some(end)) => format!("{}-{}", start, end),
            (Some(start), None) => start.clone(),
            _ => "All Day".to_string(),
        }
    }
}

/// Input for a new event. The id is generated and the colour auto-assigned
/// when absent.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDraft {
    pub title: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub category: Category,
    pub color: Option<String>,
    pub calendar_id: String,
    pub repeat: Option<RepeatFrequency>,
}

impl EventDraft {
    pub fn new(title: impl Into<String>, date: NaiveDate, calendar_id: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            date,
            end_date: None,
            start_time: None,
            end_time: None,
            category: Category::default(),
            color: None,
            calendar_id: calendar_id.into(),
            repeat: None,
        }
    }

    pub fn with_times(mut self, start: &str, end: &str) -> Self {
        self.start_time = Some(start.to_string());
        self.end_time = Some(end.to_string());
        self
    }

    pub fn until(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub fn with_color(mut self, color: &str) -> Self {
        self.color = Some(color.to_string());
        self
    }

    pub fn with_repeat(mut self, repeat: RepeatFrequency) -> Self {
        self.repeat = Some(repeat);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_schedule(
            &self.title,
            self.date,
            self.end_date,
            self.start_time.as_deref(),
            self.end_time.as_deref(),
        )?;
        if let Some(color) = &self.color
            && !is_valid_hex_color(color)
        {
            return Err(ValidationError::InvalidColor(color.clone()));
        }
        Ok(())
    }

    pub fn into_event(self, id: String, assigned_color: String) -> Result<Event, ValidationError> {
        self.validate()?;
        let mut event = Event {
            id,
            title: self.title.trim().to_string(),
            description: self.description.filter(|d| !d.trim().is_empty()),
            date: self.date,
            end_date: self.end_date,
            is_all_day: self.start_time.is_none(),
            start_time: self.start_time,
            end_time: self.end_time,
            category: self.category,
            color: self.color.unwrap_or(assigned_color),
            is_multi_day: false,
            calendar_id: self.calendar_id,
            repeat: self.repeat,
        };
        event.normalize();
        event.validate()?;
        Ok(event)
    }
}

pub fn is_valid_time(input: &str) -> bool {
    static TIME_RE: OnceLock<Regex> = OnceLock::new();
    TIME_RE
        .get_or_init(|| Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").expect("invalid time regex"))
        .is_match(input)
}

fn check_schedule(
    title: &str,
    date: NaiveDate,
    end_date: Option<NaiveDate>,
    start_time: Option<&str>,
    end_time: Option<&str>,
) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::EmptyTitle);
    }

    if let Some(end) = end_date
        && end < date
    {
        return Err(ValidationError::EndBeforeStart { start: date, end });
    }

    for time in [start_time, end_time].into_iter().flatten() {
        if !is_valid_time(time) {
            return Err(ValidationError::InvalidTime(time.to_string()));
        }
    }

    let single_day = end_date.is_none_or(|end| end == date);
    if single_day
        && let (Some(start), Some(end)) = (start_time, end_time)
        && end < start
    {
        return Err(ValidationError::EndTimeBeforeStartTime {
            start: start.to_string(),
            end: end.to_string(),
        });
    }

    Ok(())
}

/// Dates are stored as `YYYY-MM-DD`. Older blobs carry full ISO timestamps;
/// those are reduced to the local calendar day they were created on.
pub mod calendar_day {
    use chrono::{DateTime, Local, NaiveDate};
    use serde::{Deserialize, Deserializer};

    pub fn parse(raw: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.with_timezone(&Local).date_naive())
        })
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid date '{}'", raw)))
    }

    pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) if raw.is_empty() => Ok(None),
            Some(raw) => parse(&raw)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid date '{}'", raw))),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn build(draft: EventDraft) -> Result<Event, ValidationError> {
        draft.into_event("evt".to_string(), "#BAE1FF".to_string())
    }

    #[test]
    fn draft_without_times_becomes_all_day() {
        let event = build(EventDraft::new("Holiday", date(2024, 6, 3), "cal")).unwrap();

        assert!(event.is_all_day);
        assert!(!event.is_multi_day);
        assert_eq!(event.color, "#BAE1FF");
    }

    #[test]
    fn end_date_equal_to_start_is_not_multi_day() {
        let event = build(EventDraft::new("Trip", date(2024, 6, 3), "cal").until(date(2024, 6, 3))).unwrap();

        assert_eq!(event.end_date, None);
        assert!(!event.is_multi_day);
    }

    #[test]
    fn end_date_before_start_is_rejected() {
        let result = build(EventDraft::new("Trip", date(2024, 6, 5), "cal").until(date(2024, 6, 3)));

        assert_eq!(
            result,
            Err(ValidationError::EndBeforeStart { start: date(2024, 6, 5), end: date(2024, 6, 3) })
        );
    }

    #[test]
    fn blank_title_is_rejected() {
        let result = build(EventDraft::new("   ", date(2024, 6, 3), "cal"));
        assert_eq!(result, Err(ValidationError::EmptyTitle));
    }

    #[test]
    fn malformed_time_is_rejected() {
        let result = build(EventDraft::new("Standup", date(2024, 6, 3), "cal").with_times("9am", "09:15"));
        assert_eq!(result, Err(ValidationError::InvalidTime("9am".to_string())));
    }

    #[test]
    fn end_time_before_start_time_is_rejected_on_single_day() {
        let result = build(EventDraft::new("Standup", date(2024, 6, 3), "cal").with_times("10:00", "09:00"));
        assert!(matches!(result, Err(ValidationError::EndTimeBeforeStartTime { .. })));
    }

    #[test]
    fn overnight_times_are_allowed_across_days() {
        let result = build(
            EventDraft::new("Night shift", date(2024, 6, 3), "cal")
                .until(date(2024, 6, 4))
                .with_times("22:00", "06:00"),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn invalid_explicit_color_is_rejected() {
        let result = build(EventDraft::new("Standup", date(2024, 6, 3), "cal").with_color("blue"));
        assert_eq!(result, Err(ValidationError::InvalidColor("blue".to_string())));
    }

    #[test]
    fn membership_of_multi_day_event_is_inclusive() {
        let event = build(EventDraft::new("Trip", date(2024, 6, 3), "cal").until(date(2024, 6, 5))).unwrap();

        assert!(!event.occurs_on(date(2024, 6, 2)));
        assert!(event.occurs_on(date(2024, 6, 3)));
        assert!(event.occurs_on(date(2024, 6, 4)));
        assert!(event.occurs_on(date(2024, 6, 5)));
        assert!(!event.occurs_on(date(2024, 6, 6)));
        assert_eq!(event.span_days(), 3);
    }

    #[test]
    fn search_matches_title_and_description_case_insensitively() {
        let mut event = build(EventDraft::new("Dentist", date(2024, 6, 3), "cal")).unwrap();
        event.description = Some("Bring X-Ray results".to_string());

        assert!(event.matches_search("dent"));
        assert!(event.matches_search("x-ray"));
        assert!(!event.matches_search("gym"));
    }

    #[test]
    fn category_cycles_back_to_start() {
        assert_eq!(Category::Health.next(), Category::Personal);
        assert_eq!(Category::parse("WORK"), Some(Category::Work));
        assert_eq!(Category::parse("other"), None);
    }

    #[test]
    fn deserializes_camel_case_with_plain_dates() {
        let json = r##"{
            "id": "1", "title": "Standup", "date": "2024-06-03",
            "startTime": "09:00", "endTime": "09:15", "category": "work",
            "color": "#3B82F6", "isAllDay": false, "isMultiDay": false,
            "calendarId": "work"
        }"##;

        let event: Event = serde_json::from_str(json).unwrap();

        assert_eq!(event.date, date(2024, 6, 3));
        assert_eq!(event.start_time.as_deref(), Some("09:00"));
        assert_eq!(event.category, Category::Work);
    }

    #[test]
    fn deserializes_iso_timestamps_to_calendar_days() {
        let json = r##"{
            "id": "1", "title": "Trip", "date": "2024-06-03T12:00:00.000Z",
            "endDate": "2024-06-05T12:00:00.000Z", "color": "#3B82F6",
            "isAllDay": true, "isMultiDay": true, "calendarId": "work"
        }"##;

        let event: Event = serde_json::from_str(json).unwrap();

        assert_eq!(event.date, date(2024, 6, 3));
        assert_eq!(event.end_date, Some(date(2024, 6, 5)));
        assert_eq!(event.category, Category::Personal);
    }

    #[test]
    fn repeat_survives_json_and_cycles_back_to_none() {
        let event = build(
            EventDraft::new("Review", date(2024, 6, 3), "cal").with_repeat(RepeatFrequency::Weekly),
        )
        .unwrap();

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""repeat":"weekly""#));
        let restored: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.repeat, Some(RepeatFrequency::Weekly));

        let mut repeat = None;
        for _ in 0..5 {
            repeat = RepeatFrequency::cycle(repeat);
        }
        assert_eq!(repeat, None);
        assert_eq!(RepeatFrequency::cycle(None), Some(RepeatFrequency::Daily));
    }
}

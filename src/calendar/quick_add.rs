use chrono::{Datelike, Days, NaiveDate, Weekday};
use regex::Regex;
use std::sync::OnceLock;

use crate::calendar::{Category, EventDraft};

const CATEGORY_KEYWORDS: [(Category, &[&str]); 4] = [
    (Category::Important, &["urgent", "deadline", "important", "asap"]),
    (Category::Work, &["meeting", "work", "standup", "review", "client", "sprint"]),
    (Category::Family, &["family", "mom", "dad", "birthday", "kids", "anniversary"]),
    (Category::Health, &["doctor", "gym", "dentist", "hospital", "workout", "yoga"]),
];

/// Turns a one-line description like "Dentist tomorrow at 3pm" into a draft.
/// Without a recognised time the draft is all-day.
pub fn parse(text: &str, today: NaiveDate, calendar_id: &str) -> EventDraft {
    let mut remaining = text.to_string();

    let date = take_date(&mut remaining, today).unwrap_or(today);
    let start_time = take_time(&mut remaining);
    let category = detect_category(text);

    let title = collapse_whitespace(&remaining);
    let title = if title.is_empty() { text.trim().to_string() } else { title };

    let mut draft = EventDraft::new(title, date, calendar_id).with_category(category);
    if let Some((hour, minute)) = start_time {
        let end_hour = (hour + 1).min(23);
        let end_minute = if hour == 23 { 59 } else { minute };
        draft.start_time = Some(format!("{:02}:{:02}", hour, minute));
        draft.end_time = Some(format!("{:02}:{:02}", end_hour, end_minute));
    }
    draft
}

fn detect_category(text: &str) -> Category {
    let lowered = text.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| words.contains(k)))
        .map(|(category, _)| *category)
        .unwrap_or_default()
}

fn take_date(text: &mut String, today: NaiveDate) -> Option<NaiveDate> {
    static ISO_RE: OnceLock<Regex> = OnceLock::new();
    static RELATIVE_RE: OnceLock<Regex> = OnceLock::new();

    let iso = ISO_RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:on\s+)?(\d{4}-\d{2}-\d{2})\b").expect("invalid iso date regex")
    });
    let iso_match = iso.captures(text).and_then(|caps| {
        let date = NaiveDate::parse_from_str(caps.get(1)?.as_str(), "%Y-%m-%d").ok()?;
        Some((caps.get(0)?.range(), date))
    });
    if let Some((range, date)) = iso_match {
        text.replace_range(range, "");
        return Some(date);
    }

    let relative = RELATIVE_RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:on\s+|next\s+)?(today|tomorrow|monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b")
            .expect("invalid relative date regex")
    });
    let (range, word) = relative
        .captures(text)
        .and_then(|caps| Some((caps.get(0)?.range(), caps.get(1)?.as_str().to_lowercase())))?;

    let date = match word.as_str() {
        "today" => today,
        "tomorrow" => today.checked_add_days(Days::new(1))?,
        day_name => {
            let target: Weekday = day_name.parse().ok()?;
            next_weekday(today, target)?
        }
    };

    text.replace_range(range, "");
    Some(date)
}

/// Next occurrence of `target` strictly after `today`.
fn next_weekday(today: NaiveDate, target: Weekday) -> Option<NaiveDate> {
    let current = today.weekday().num_days_from_monday() as i64;
    let wanted = target.num_days_from_monday() as i64;
    let mut ahead = (wanted - current).rem_euclid(7);
    if ahead == 0 {
        ahead = 7;
    }
    today.checked_add_days(Days::new(ahead as u64))
}

fn take_time(text: &mut String) -> Option<(u32, u32)> {
    static TIME_RE: OnceLock<Regex> = OnceLock::new();
    let re = TIME_RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:at\s+)?(\d{1,2})(?::(\d{2}))?\s*(am|pm)?\b").expect("invalid time regex")
    });

    let found = re.captures_iter(text).find_map(|caps| {
        let whole = caps.get(0)?;
        let has_at = whole.as_str().to_lowercase().starts_with("at");
        let minutes = caps.get(2);
        let meridiem = caps.get(3).map(|m| m.as_str().to_lowercase());

        // A bare number is only a time when introduced by "at" or qualified.
        if !has_at && minutes.is_none() && meridiem.is_none() {
            return None;
        }

        let mut hour = caps.get(1)?.as_str().parse::<u32>().ok()?;
        let minute = minutes.and_then(|m| m.as_str().parse::<u32>().ok()).unwrap_or(0);

        match meridiem.as_deref() {
            Some("pm") if hour < 12 => hour += 12,
            Some("am") if hour == 12 => hour = 0,
            _ => {}
        }

        (hour <= 23 && minute <= 59).then(|| (whole.range(), hour, minute))
    });

    let (range, hour, minute) = found?;
    text.replace_range(range, "");
    Some((hour, minute))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

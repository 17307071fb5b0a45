use chrono::{Datelike, Days, NaiveDate, Weekday};
use std::cmp::Ordering;

use crate::app::AppState;
use crate::calendar::Event;

pub const GRID_CELLS: usize = 42;
pub const MAX_VISIBLE_PER_CELL: usize = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WeekStart {
    #[default]
    Sunday,
    Monday,
}

impl WeekStart {
    pub fn from_config(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "monday" | "mon" => WeekStart::Monday,
            _ => WeekStart::Sunday,
        }
    }

    fn offset_of(self, weekday: Weekday) -> u64 {
        match self {
            WeekStart::Sunday => weekday.num_days_from_sunday() as u64,
            WeekStart::Monday => weekday.num_days_from_monday() as u64,
        }
    }

    pub fn header(self) -> [&'static str; 7] {
        match self {
            WeekStart::Sunday => ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"],
            WeekStart::Monday => ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"],
        }
    }
}

/// Position of one day's occurrence within an event's span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Start,
    Middle,
    End,
    Single,
}

impl Segment {
    pub fn shows_title(self) -> bool {
        matches!(self, Segment::Start | Segment::Single)
    }
}

pub fn segment_for(event: &Event, day: NaiveDate) -> Option<Segment> {
    if !event.occurs_on(day) {
        return None;
    }
    if !event.is_multi_day {
        return Some(Segment::Single);
    }

    let first = event.date;
    let last = event.last_day();
    let segment = match (day == first, day == last) {
        (true, true) => Segment::Single,
        (true, false) => Segment::Start,
        (false, true) => Segment::End,
        (false, false) => Segment::Middle,
    };
    Some(segment)
}

/// Multi-day first, then all-day, then timed by start time.
pub fn compare_for_day(a: &Event, b: &Event) -> Ordering {
    fn rank(event: &Event) -> u8 {
        if event.is_multi_day {
            0
        } else if event.is_all_day {
            1
        } else {
            2
        }
    }

    rank(a).cmp(&rank(b)).then_with(|| {
        if a.is_multi_day || a.is_all_day {
            Ordering::Equal
        } else {
            a.start_time.cmp(&b.start_time)
        }
    })
}

pub fn events_on<'a>(events: &[&'a Event], day: NaiveDate) -> Vec<&'a Event> {
    let mut on_day: Vec<&Event> = events.iter().copied().filter(|e| e.occurs_on(day)).collect();
    on_day.sort_by(|a, b| compare_for_day(a, b));
    on_day
}

#[derive(Debug, Clone, PartialEq)]
pub struct CellEntry<'a> {
    pub event: &'a Event,
    pub segment: Segment,
}

impl CellEntry<'_> {
    pub fn shows_title(&self) -> bool {
        self.segment.shows_title()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayCell<'a> {
    pub date: NaiveDate,
    pub is_selected: bool,
    pub is_today: bool,
    pub is_current_month: bool,
    pub entries: Vec<CellEntry<'a>>,
}

impl<'a> DayCell<'a> {
    pub fn visible_entries(&self) -> &[CellEntry<'a>] {
        &self.entries[..self.entries.len().min(MAX_VISIBLE_PER_CELL)]
    }

    /// Number of entries hidden behind the "+N" badge.
    pub fn overflow(&self) -> usize {
        self.entries.len().saturating_sub(MAX_VISIBLE_PER_CELL)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthLayout<'a> {
    pub year: i32,
    pub month: u32,
    pub cells: Vec<DayCell<'a>>,
}

impl<'a> MonthLayout<'a> {
    pub fn weeks(&self) -> impl Iterator<Item = &[DayCell<'a>]> {
        self.cells.chunks(7)
    }

    pub fn cell(&self, date: NaiveDate) -> Option<&DayCell<'a>> {
        self.cells.iter().find(|c| c.date == date)
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.cells.first().map(|c| c.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.cells.last().map(|c| c.date)
    }
}

/// First date shown in the 42-cell grid of the month containing `month`.
pub fn grid_start(month: NaiveDate, week_start: WeekStart) -> Option<NaiveDate> {
    let first = month.with_day(1)?;
    first.checked_sub_days(Days::new(week_start.offset_of(first.weekday())))
}

pub fn grid_range(month: NaiveDate, week_start: WeekStart) -> Option<(NaiveDate, NaiveDate)> {
    let start = grid_start(month, week_start)?;
    let end = start.checked_add_days(Days::new(GRID_CELLS as u64 - 1))?;
    Some((start, end))
}

pub fn build_month_grid<'a>(
    month: NaiveDate,
    week_start: WeekStart,
    today: NaiveDate,
    selected: NaiveDate,
    events: &[&'a Event],
) -> MonthLayout<'a> {
    let year = month.year();
    let month_number = month.month();

    let Some(start) = grid_start(month, week_start) else {
        return MonthLayout { year, month: month_number, cells: Vec::new() };
    };

    let cells = start
        .iter_days()
        .take(GRID_CELLS)
        .map(|date| {
            let entries = events_on(events, date)
                .into_iter()
                .filter_map(|event| segment_for(event, date).map(|segment| CellEntry { event, segment }))
                .collect();

            DayCell {
                date,
                is_selected: date == selected,
                is_today: date == today,
                is_current_month: date.year() == year && date.month() == month_number,
                entries,
            }
        })
        .collect();

    MonthLayout { year, month: month_number, cells }
}

pub fn calculate_layout(state: &AppState, today: NaiveDate) -> MonthLayout<'_> {
    let events = state.filtered_events();
    build_month_grid(
        state.displayed_month,
        state.week_start,
        today,
        state.selected_date,
        &events,
    )
}

use chrono::{Days, Local};
use pastelcal::{
    app::AppState,
    calendar::{CalendarDraft, Category, EventDraft},
};

pub fn add_sample_events(app: &mut AppState) {
    let today = Local::now().date_naive();

    let Some(tomorrow) = today.succ_opt() else { return };
    let Some(yesterday) = today.pred_opt() else { return };
    let Some(trip_end) = today.checked_add_days(Days::new(3)) else { return };

    let Some(personal) = app.current_calendar_id().map(str::to_string) else { return };
    let work = match app.calendar_by_name("Work") {
        Some(calendar) => calendar.id.clone(),
        None => match app.add_calendar(CalendarDraft::new("Work")) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!("Could not create sample calendar: {}", e);
                personal.clone()
            }
        },
    };

    let drafts = vec![
        EventDraft::new("Morning Standup", today, &work)
            .with_times("09:00", "09:30")
            .with_category(Category::Work),
        EventDraft::new("Team Sync", today, &work)
            .with_times("14:00", "15:00")
            .with_category(Category::Work),
        EventDraft::new("Code Review", tomorrow, &work)
            .with_times("10:00", "11:00")
            .with_category(Category::Work),
        EventDraft::new("Dentist", yesterday, &personal)
            .with_times("11:00", "11:30")
            .with_category(Category::Health),
        EventDraft::new("Mom's Birthday", tomorrow, &personal).with_category(Category::Family),
        EventDraft::new("Beach Trip", today, &personal)
            .until(trip_end)
            .with_category(Category::Personal),
    ];

    for draft in drafts {
        if let Err(e) = app.add_event(draft) {
            tracing::warn!("Skipping sample event: {}", e);
        }
    }
}

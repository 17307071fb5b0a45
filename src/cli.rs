use std::{
    env,
    io::{self, Write},
    process::{Command, Stdio},
};

use chrono::{Local, NaiveDate};

use pastelcal::{
    app::AppState,
    calendar::Event as CalendarEvent,
    storage::{config::Config, open_or_fallback, Persistence},
    sync::{ApiClient, CommunityPost, ScheduleApi},
};

pub const USAGE: &str =
    "Usage: pastelcal [--sample] [--agenda [YYYY/MM/DD]] [--posts] [--login EMAIL] [--logout]";

#[derive(Debug, Clone, PartialEq)]
pub enum CliMode {
    Default { sample: bool },
    AgendaDate(NaiveDate),
    Login(String),
    Logout,
    Posts,
    Help,
}

pub fn parse_cli_mode() -> Result<CliMode, String> {
    parse_args(env::args().skip(1), Local::now().date_naive())
}

pub fn parse_args<I>(args: I, today: NaiveDate) -> Result<CliMode, String>
where
    I: IntoIterator<Item = String>,
{
    let mut sample = false;
    let mut mode = None;
    let mut args = args.into_iter().peekable();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--sample" => {
                sample = true;
            }
            "--agenda" => {
                let target_date = match args.next_if(|next| !next.starts_with("--")) {
                    Some(date_str) => NaiveDate::parse_from_str(&date_str, "%Y/%m/%d")
                        .map_err(|_| format!("Invalid date '{}'. Use YYYY/MM/DD.", date_str))?,
                    None => today,
                };
                mode = Some(CliMode::AgendaDate(target_date));
            }
            "--login" => {
                let email = args
                    .next_if(|next| !next.starts_with("--"))
                    .ok_or_else(|| "--login requires an email address".to_string())?;
                mode = Some(CliMode::Login(email));
            }
            "--logout" => mode = Some(CliMode::Logout),
            "--posts" => mode = Some(CliMode::Posts),
            "--help" | "-h" => return Ok(CliMode::Help),
            _ => return Err(format!("Unknown argument: {}", arg)),
        }
    }

    Ok(mode.unwrap_or(CliMode::Default { sample }))
}

/// Prints the day's visible events from local storage.
pub fn run_agenda_mode(date: NaiveDate) -> anyhow::Result<()> {
    let config = Config::load_or_create()?;
    let persistence = Persistence::new(open_or_fallback(&config.storage.database_path));
    let app = AppState::from_snapshot(persistence.load()?, Local::now().date_naive());

    let events = app.get_events_for_date(date);
    let agenda = format_agenda_text(date, &events, &app);
    display_with_pager(&agenda)?;
    Ok(())
}

pub async fn run_posts_mode() -> anyhow::Result<()> {
    let config = Config::load_or_create()?;
    let persistence = Persistence::new(open_or_fallback(&config.storage.database_path));
    let client = ApiClient::from_config(&config.api)?.with_token(persistence.auth_token()?);

    let posts = client.fetch_posts().await?;
    display_with_pager(&format_posts_text(&posts))?;
    Ok(())
}

fn format_agenda_text(date: NaiveDate, events: &[&CalendarEvent], app: &AppState) -> String {
    let mut lines = Vec::new();
    lines.push(format!("Agenda – {}", date.format("%A, %B %d, %Y")));
    lines.push(String::new());

    if events.is_empty() {
        lines.push("No events scheduled.".to_string());
    } else {
        for event in events {
            let calendar = app.calendar(&event.calendar_id).map(|c| c.name.as_str());
            lines.push(format!("- {}", build_agenda_line(event, calendar, usize::MAX)));
        }
    }

    lines.join("\n")
}

fn build_agenda_line(event: &CalendarEvent, calendar: Option<&str>, width: usize) -> String {
    let mut line = format!("{:<13} {}", event.time_label(), event.title);
    if event.is_multi_day {
        line.push_str(&format!(
            " ({} – {})",
            event.date.format("%b %d"),
            event.last_day().format("%b %d")
        ));
    }
    line.push_str(&format!(" [{}]", event.category));
    if let Some(calendar) = calendar
        && !calendar.is_empty()
    {
        line.push_str(&format!(" @ {}", calendar));
    }
    truncate_to_width(&line, width)
}

fn format_posts_text(posts: &[CommunityPost]) -> String {
    if posts.is_empty() {
        return "No community posts.".to_string();
    }

    posts
        .iter()
        .map(|post| {
            let mut block = format!("# {}", post.title);
            if let Some(author) = &post.author {
                block.push_str(&format!("  ({})", author));
            }
            if !post.content.is_empty() {
                block.push('\n');
                block.push_str(&post.content);
            }
            block
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn truncate_to_width(line: &str, width: usize) -> String {
    if width > 0 && line.chars().count() > width {
        let mut truncated = line.chars().take(width.saturating_sub(1)).collect::<String>();
        truncated.push('…');
        truncated
    } else {
        line.to_string()
    }
}

fn display_with_pager(text: &str) -> Result<(), io::Error> {
    let pager_value = env::var("PAGER").unwrap_or_else(|_| "less".to_string());
    let mut parts = pager_value.split_whitespace();
    let cmd = match parts.next() {
        Some(c) => c,
        None => {
            println!("{text}");
            return Ok(());
        }
    };
    let args: Vec<&str> = parts.collect();

    match Command::new(cmd)
        .args(&args)
        .stdin(Stdio::piped())
        .spawn()
    {
        Ok(mut child) => {
            if let Some(stdin) = child.stdin.as_mut() {
                stdin.write_all(text.as_bytes())?;
            }
            let _ = child.wait();
        }
        Err(_) => {
            println!("{text}");
        }
    }

    Ok(())
}

use std::io;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event as TermEvent, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use chrono::Local;
use ratatui::{
    backend::CrosstermBackend,
    Terminal,
};
use pastelcal::{
    app::{AppState, Mode, SyncStatus},
    bus::{apply_pending, MessageBus},
    input::{command_mode, insert_mode, normal_mode},
    storage::{config::Config, open_or_fallback, Persistence, Snapshot, StoragePort},
    sync::{ApiClient, SyncEngine, SyncError},
    ui::{month_view::WeekStart, theme::Theme},
};
use crate::tui::{presentation::ui, sample_events::add_sample_events};

type Store = Persistence<Box<dyn StoragePort>>;
type Engine = SyncEngine<ApiClient>;

struct Session {
    persistence: Store,
    saved_revision: u64,
    sync_engine: Option<Engine>,
    bus: MessageBus,
}

impl Session {
    /// Writes the snapshot when persisted data changed since the last save.
    fn persist_if_changed(&mut self, app: &mut AppState) {
        if app.revision() == self.saved_revision {
            return;
        }
        match self.persistence.save(&app.snapshot()) {
            Ok(()) => self.saved_revision = app.revision(),
            Err(e) => {
                tracing::error!("Failed to save state: {}", e);
                app.status_message = Some(format!("Save failed: {}", e));
            }
        }
    }
}

pub async fn run_tui(sample: bool) -> anyhow::Result<()> {
    let config = Config::load_or_create()?;

    let persistence = Persistence::new(open_or_fallback(&config.storage.database_path));
    let snapshot = persistence.load().unwrap_or_else(|e| {
        tracing::error!("Stored data could not be read, starting empty: {}", e);
        Snapshot::default()
    });
    let dark_mode = match persistence.dark_mode_preference() {
        Ok(Some(dark)) => dark,
        _ => Theme::get_by_name(&config.ui.theme).is_dark,
    };
    let token = persistence.auth_token().unwrap_or_else(|e| {
        tracing::warn!("Auth token could not be read: {}", e);
        None
    });

    let mut app = AppState::from_snapshot(snapshot, Local::now().date_naive())
        .with_week_start(WeekStart::from_config(&config.ui.first_day_of_week))
        .with_dark_mode(dark_mode);
    let saved_revision = app.revision();

    if sample {
        add_sample_events(&mut app);
    }

    let sync_engine = SyncEngine::from_config(&config, token).unwrap_or_else(|e| {
        tracing::error!("Sync unavailable: {}", e);
        None
    });

    let mut session = Session {
        persistence,
        saved_revision,
        sync_engine,
        bus: MessageBus::new(),
    };

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    if config.sync.fetch_on_start && session.sync_engine.is_some() {
        sync_now(&mut terminal, &mut app, &session).await?;
    } else {
        app.sync_status = SyncStatus::Offline;
    }

    let res = run_app(&mut terminal, &mut app, &mut session).await;

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    session.persist_if_changed(&mut app);

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut AppState,
    session: &mut Session,
) -> io::Result<()> {
    loop {
        apply_pending(&mut session.bus, app);
        session.persist_if_changed(app);

        terminal.draw(|f| ui(f, app))?;

        if let TermEvent::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            if app.delete_confirmation_event_id.is_some() {
                handle_delete_confirmation(key.code, app, terminal, session).await?;
                continue;
            }

            match app.mode {
                Mode::Normal => {
                    if app.show_help {
                        handle_help_keys(key.code, app);
                    } else {
                        match key.code {
                            KeyCode::Char('q') => return Ok(()),
                            code => {
                                app.status_message = None;
                                normal_mode::handle_key(code, app);
                            }
                        }
                    }
                }
                Mode::Command => {
                    if handle_command_mode(key.code, app, terminal, session).await? {
                        return Ok(());
                    }
                }
                Mode::Insert => {
                    handle_insert_mode(key.code, app, terminal, session).await?;
                }
            }
        }
    }
}

fn handle_help_keys(code: KeyCode, app: &mut AppState) {
    match code {
        KeyCode::Char('j') => {
            app.help_scroll = app.help_scroll.saturating_add(1);
        }
        KeyCode::Char('k') => {
            app.help_scroll = app.help_scroll.saturating_sub(1);
        }
        KeyCode::Char('q') | KeyCode::Char('?') | KeyCode::Esc => {
            app.show_help = false;
            app.help_scroll = 0;
        }
        _ => {}
    }
}

fn record_sync_result(app: &mut AppState, result: Result<(), SyncError>, action: &str) {
    match result {
        Ok(()) => app.sync_status = SyncStatus::Synced,
        Err(e) => {
            tracing::error!("Failed to {}: {}", action, e);
            app.sync_status = SyncStatus::Error(format!("Failed to {}: {}", action, e));
        }
    }
}

async fn sync_now<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut AppState,
    session: &Session,
) -> io::Result<()> {
    let Some(engine) = &session.sync_engine else {
        app.status_message = Some("Sync is off: log in with --login or disable offline mode".to_string());
        return Ok(());
    };

    app.sync_status = SyncStatus::Syncing;
    terminal.draw(|f| ui(f, app))?;

    let result = engine.pull(app).await.map(|merged| {
        tracing::info!("Sync merged {} events", merged);
    });
    record_sync_result(app, result, "sync");
    Ok(())
}

/// Sends remote deletes queued by calendar deletion.
async fn flush_pending_deletions<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut AppState,
    session: &Session,
) -> io::Result<()> {
    let Some(engine) = &session.sync_engine else {
        return Ok(());
    };
    if app.pending_deletions().is_empty() {
        return Ok(());
    }

    app.sync_status = SyncStatus::Syncing;
    terminal.draw(|f| ui(f, app))?;
    let result = engine.push_pending_deletions(app).await.map(|sent| {
        tracing::info!("Removed {} events remotely", sent);
    });
    record_sync_result(app, result, "delete");
    Ok(())
}

async fn handle_command_mode<B: ratatui::backend::Backend>(
    code: KeyCode,
    app: &mut AppState,
    terminal: &mut Terminal<B>,
    session: &mut Session,
) -> io::Result<bool> {
    match code {
        KeyCode::Enter => {
            let command = command_mode::parse_command(&app.command_buffer);
            match command_mode::apply_command(command, app, &session.bus) {
                command_mode::CommandEffect::Quit => return Ok(true),
                command_mode::CommandEffect::Sync => sync_now(terminal, app, session).await?,
                command_mode::CommandEffect::None => {}
            }
            flush_pending_deletions(terminal, app, session).await?;
            Ok(false)
        }
        KeyCode::Esc => {
            app.command_buffer.clear();
            app.mode = Mode::Normal;
            Ok(false)
        }
        KeyCode::Backspace => {
            app.command_buffer.pop();
            if app.command_buffer.is_empty() {
                app.mode = Mode::Normal;
            }
            Ok(false)
        }
        KeyCode::Char(c) => {
            app.command_buffer.push(c);
            Ok(false)
        }
        _ => Ok(false)
    }
}

async fn handle_insert_mode<B: ratatui::backend::Backend>(
    code: KeyCode,
    app: &mut AppState,
    terminal: &mut Terminal<B>,
    session: &Session,
) -> io::Result<()> {
    match code {
        KeyCode::Esc => {
            app.event_form = None;
            app.status_message = None;
            app.mode = Mode::Normal;
        }
        KeyCode::Enter => {
            let editing = app.event_form.as_ref().is_some_and(|f| f.is_editing());
            match app.submit_event_form() {
                Ok(id) => {
                    app.status_message = Some(if editing { "Event updated" } else { "Event added" }.to_string());
                    if let Some(engine) = &session.sync_engine {
                        app.sync_status = SyncStatus::Syncing;
                        terminal.draw(|f| ui(f, app))?;

                        let result = if editing {
                            engine.push_updated(app, &id).await
                        } else {
                            engine.push_created(app, &id).await.map(|_| ())
                        };
                        record_sync_result(app, result, if editing { "update" } else { "create" });
                    }
                }
                Err(e) => {
                    tracing::debug!("Event form rejected: {}", e);
                    app.status_message = Some(e.to_string());
                }
            }
        }
        _ => insert_mode::handle_key(code, app),
    }
    Ok(())
}

async fn handle_delete_confirmation<B: ratatui::backend::Backend>(
    code: KeyCode,
    app: &mut AppState,
    terminal: &mut Terminal<B>,
    session: &Session,
) -> io::Result<()> {
    match code {
        KeyCode::Char('y') | KeyCode::Char('Y') => {
            if let Some(event_id) = app.delete_confirmation_event_id.take() {
                tracing::info!("Deleting event: {}", event_id);
                match app.delete_event(&event_id) {
                    Ok(removed) => {
                        if app.selected_event_index > 0 {
                            app.selected_event_index -= 1;
                        }
                        app.status_message = Some(format!("Deleted {}", removed.title));

                        if let Some(engine) = &session.sync_engine {
                            app.sync_status = SyncStatus::Syncing;
                            terminal.draw(|f| ui(f, app))?;
                            let result = engine.push_deleted(&removed).await;
                            if result.is_err() {
                                app.queue_remote_deletion(removed);
                            }
                            record_sync_result(app, result, "delete");
                        }
                    }
                    Err(e) => {
                        tracing::error!("Failed to delete event: {}", e);
                        app.status_message = Some(e.to_string());
                    }
                }
            }
        }
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            app.delete_confirmation_event_id = None;
        }
        _ => {}
    }
    Ok(())
}

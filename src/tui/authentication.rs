use anyhow::Context;
use pastelcal::{
    storage::{config::Config, Persistence, SqliteStore},
    sync::{ApiClient, ScheduleApi},
};

/// Prompts for the password, logs in and stores the bearer token.
pub async fn login(email: &str) -> anyhow::Result<()> {
    let config = Config::load_or_create()?;

    println!("Logging in to {} as {}", config.api.base_url, email);
    println!("Password: ");
    let mut password = String::new();
    std::io::stdin().read_line(&mut password)?;
    let password = password.trim_end_matches(['\r', '\n']);

    let client = ApiClient::from_config(&config.api)?;
    let token = client
        .login(email, password)
        .await
        .context("Login failed")?;

    let mut persistence = Persistence::new(open_token_store(&config)?);
    persistence.set_auth_token(&token)?;
    tracing::info!("Stored auth token for {}", email);
    println!("\nLogged in. Events will sync the next time pastelcal starts.\n");

    Ok(())
}

/// Credentials must reach the database file, so there is no in-memory fallback here.
fn open_token_store(config: &Config) -> anyhow::Result<SqliteStore> {
    SqliteStore::open(&config.storage.database_path).with_context(|| {
        format!(
            "Could not open {} to store the login",
            config.storage.database_path.display()
        )
    })
}

pub fn logout() -> anyhow::Result<()> {
    let config = Config::load_or_create()?;
    let mut persistence = Persistence::new(open_token_store(&config)?);
    persistence.clear_auth_token()?;
    tracing::info!("Cleared auth token");
    println!("Logged out. pastelcal will run offline.");
    Ok(())
}

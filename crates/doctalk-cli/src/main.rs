use std::sync::Arc;

use eyre::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use doctalk_cli::commands::{self, Reply};
use doctalk_cli::config::{self, API_URL_ENV, DoctalkConfig};
use doctalk_cli::state::AppState;

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if std::env::var("DOCTALK_LOG_FORMAT").is_ok_and(|f| f == "json") {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Load the saved config, or create one from `DOCTALK_API_URL` on first run.
fn resolve_config() -> Result<DoctalkConfig> {
    if config::has_config() {
        return Ok(config::load_config()?.with_env_overrides());
    }

    let api_url = std::env::var(API_URL_ENV).map_err(|_| {
        eyre::eyre!("no config found; set {API_URL_ENV} to the backend URL for the first run")
    })?;
    let config = DoctalkConfig::new(api_url).with_env_overrides();
    config::save_config(&config)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let config = resolve_config()?;
    tracing::info!(api_url = %config.api_url, "starting doctalk");

    let state = Arc::new(AppState::new(config));

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    stdout
        .write_all(b"doctalk: ask questions about your documents. /help for commands.\n")
        .await?;

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        match commands::handle_line(&state, &line).await {
            Ok(Reply::Quit) => break,
            Ok(Reply::Text(text)) if text.is_empty() => {}
            Ok(Reply::Text(text)) => stdout.write_all(format!("{text}\n").as_bytes()).await?,
            Err(e) => stdout.write_all(format!("error: {e}\n").as_bytes()).await?,
        }
    }

    state.session.close();
    Ok(())
}

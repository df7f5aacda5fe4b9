use anyhow::{Context, Result};
use reaction_translator::{
    bot::Bot,
    config::Config,
    discord::DiscordClient,
    events::TriggerHandler,
    preferences::PreferenceStore,
    scheduler,
    server::{self, AppState},
    statistics::StatisticsStore,
    translator::GoogleTranslator,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("reaction_translator=info".parse()?),
        )
        .init();

    info!("Starting reaction translator");

    let config = Config::from_env()?;

    let preferences = Arc::new(PreferenceStore::open(&config.preferences_file));
    let statistics = Arc::new(StatisticsStore::open(&config.statistics_file));

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .context("Failed to build HTTP client")?;
    let translator = Arc::new(GoogleTranslator::new(
        http.clone(),
        &config.translator_api_url,
    ));
    let chat = Arc::new(DiscordClient::new(
        http,
        &config.discord_api_url,
        &config.discord_bot_token,
    ));

    let bot = Arc::new(Bot::new(
        preferences,
        statistics,
        translator,
        chat,
        config.bot_settings(),
    ));
    info!(
        "✓ Bot ready ({} languages, trigger {})",
        config.supported_languages.len(),
        config.trigger_emoji
    );

    match bot.ensure_language_menu().await {
        Ok(status) => info!("✓ Language menu: {:?}", status),
        Err(e) => warn!("Could not set up the language menu: {}", e),
    }

    let mut persistence =
        scheduler::start_persistence_task(bot.clone(), config.save_interval).await?;

    let app = server::router(AppState::new(bot.clone(), config.relay_secret.as_str()));
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("✓ Listening for relay events on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down, saving state");
    if let Err(e) = persistence.shutdown().await {
        error!("Failed to stop the periodic save: {}", e);
    }
    bot.on_tick().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}

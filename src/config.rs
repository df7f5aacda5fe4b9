use crate::bot::BotSettings;
use crate::i18n::Language;
use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    // Discord
    pub discord_bot_token: String,
    pub discord_api_url: String,

    // Relay ingress
    pub relay_secret: String,
    pub port: u16,

    // Translator
    pub translator_api_url: String,

    // Persistence
    pub preferences_file: PathBuf,
    pub statistics_file: PathBuf,
    pub save_interval: Duration,

    // Bot behavior
    pub trigger_emoji: String,
    pub language_channel_id: Option<String>,
    pub supported_languages: Vec<Language>,
    pub notice_delete_after: Duration,
    pub reply_delete_after: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            // Discord
            discord_bot_token: std::env::var("DISCORD_BOT_TOKEN")
                .context("DISCORD_BOT_TOKEN not set")?,
            discord_api_url: std::env::var("DISCORD_API_URL")
                .unwrap_or_else(|_| "https://discord.com/api/v10".to_string()),

            // Relay ingress
            relay_secret: std::env::var("RELAY_SECRET").context("RELAY_SECRET not set")?,
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),

            // Translator
            translator_api_url: std::env::var("TRANSLATOR_API_URL")
                .unwrap_or_else(|_| "https://translate.googleapis.com".to_string()),

            // Persistence
            preferences_file: std::env::var("PREFERENCES_FILE")
                .unwrap_or_else(|_| "languages.json".to_string())
                .into(),
            statistics_file: std::env::var("STATISTICS_FILE")
                .unwrap_or_else(|_| "translation_stats.json".to_string())
                .into(),
            save_interval: secs_var("SAVE_INTERVAL_SECS", 600),

            // Bot behavior
            trigger_emoji: std::env::var("TRIGGER_EMOJI").unwrap_or_else(|_| "🌍".to_string()),
            language_channel_id: std::env::var("LANGUAGE_CHANNEL_ID")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            supported_languages: match std::env::var("SUPPORTED_LANGUAGES") {
                Ok(codes) => parse_languages(&codes).context("Invalid SUPPORTED_LANGUAGES")?,
                Err(_) => Language::all(),
            },
            notice_delete_after: secs_var("NOTICE_DELETE_AFTER_SECS", 10),
            reply_delete_after: secs_var("REPLY_DELETE_AFTER_SECS", 15),
        })
    }

    pub fn bot_settings(&self) -> BotSettings {
        BotSettings {
            trigger_emoji: self.trigger_emoji.clone(),
            language_channel_id: self.language_channel_id.clone(),
            supported_languages: self.supported_languages.clone(),
            notice_delete_after: self.notice_delete_after,
            reply_delete_after: self.reply_delete_after,
        }
    }
}

fn secs_var(name: &str, default: u64) -> Duration {
    let secs = std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default);
    Duration::from_secs(secs)
}

/// Parse a comma separated list of language codes, keeping the given order
/// and dropping repeats.
fn parse_languages(codes: &str) -> Result<Vec<Language>> {
    let mut languages = Vec::new();
    for code in codes.split(',').map(str::trim).filter(|c| !c.is_empty()) {
        let language = Language::from_code(code)?;
        if !languages.contains(&language) {
            languages.push(language);
        }
    }
    if languages.is_empty() {
        bail!("At least one language code is required");
    }
    Ok(languages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "DISCORD_BOT_TOKEN",
        "DISCORD_API_URL",
        "RELAY_SECRET",
        "PORT",
        "TRANSLATOR_API_URL",
        "PREFERENCES_FILE",
        "STATISTICS_FILE",
        "SAVE_INTERVAL_SECS",
        "TRIGGER_EMOJI",
        "LANGUAGE_CHANNEL_ID",
        "SUPPORTED_LANGUAGES",
        "NOTICE_DELETE_AFTER_SECS",
        "REPLY_DELETE_AFTER_SECS",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    fn set_required() {
        std::env::set_var("DISCORD_BOT_TOKEN", "bot-token");
        std::env::set_var("RELAY_SECRET", "relay-secret");
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        set_required();

        let config = Config::from_env().unwrap();

        assert_eq!(config.discord_bot_token, "bot-token");
        assert_eq!(config.discord_api_url, "https://discord.com/api/v10");
        assert_eq!(config.translator_api_url, "https://translate.googleapis.com");
        assert_eq!(config.preferences_file, PathBuf::from("languages.json"));
        assert_eq!(config.statistics_file, PathBuf::from("translation_stats.json"));
        assert_eq!(config.save_interval, Duration::from_secs(600));
        assert_eq!(config.trigger_emoji, "🌍");
        assert_eq!(config.language_channel_id, None);
        assert_eq!(config.supported_languages, Language::all());
        assert_eq!(config.notice_delete_after, Duration::from_secs(10));
        assert_eq!(config.reply_delete_after, Duration::from_secs(15));
        assert_eq!(config.port, 8080);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_missing_token_is_an_error() {
        clear_env();
        std::env::set_var("RELAY_SECRET", "relay-secret");

        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("DISCORD_BOT_TOKEN"));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_overrides() {
        clear_env();
        set_required();
        std::env::set_var("SAVE_INTERVAL_SECS", "30");
        std::env::set_var("LANGUAGE_CHANNEL_ID", "12345");
        std::env::set_var("SUPPORTED_LANGUAGES", "fr, en,fr");
        std::env::set_var("PORT", "not-a-port");

        let config = Config::from_env().unwrap();

        assert_eq!(config.save_interval, Duration::from_secs(30));
        assert_eq!(config.language_channel_id.as_deref(), Some("12345"));
        assert_eq!(
            config.supported_languages,
            vec![Language::FRENCH, Language::ENGLISH]
        );
        // Unparsable numbers fall back to the default
        assert_eq!(config.port, 8080);

        let settings = config.bot_settings();
        assert_eq!(settings.supported_languages.len(), 2);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_unknown_supported_language_is_rejected() {
        clear_env();
        set_required();
        std::env::set_var("SUPPORTED_LANGUAGES", "en,klingon");

        assert!(Config::from_env().is_err());

        clear_env();
    }

    #[test]
    fn test_parse_languages_requires_one() {
        assert!(parse_languages(" , ").is_err());
        assert_eq!(parse_languages("es").unwrap(), vec![Language::SPANISH]);
    }
}

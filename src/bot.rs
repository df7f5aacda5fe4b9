//! The translation bot: turns trigger events into dispatches and renders
//! the outcomes through the chat client.

use crate::chat::{ChatClient, MenuOption, Reply, SelectMenu, TranslationEmbed};
use crate::dedup::DedupGuard;
use crate::dispatcher::{DispatchOutcome, TranslationDispatcher, TranslationRequest};
use crate::error::ChatError;
use crate::events::{
    ButtonPressed, CommandInvoked, HandlerOutcome, Interaction, MessageCreated, MessageRef,
    ReactionAdded, TriggerHandler, UserRef,
};
use crate::i18n::Language;
use crate::metrics::DispatchMetrics;
use crate::preferences::PreferenceStore;
use crate::statistics::{StatisticsStore, StatsSummary};
use crate::translator::Translator;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const TRANSLATE_BUTTON_ID: &str = "translate";
pub const LANGUAGE_SELECT_ID: &str = "language_select";

pub const LANGUAGE_COMMAND: &str = "language";
pub const STATS_COMMAND: &str = "stats";

/// Pinned menu posts start with this, which is how a restart finds them.
const MENU_MARKER: &str = "🌐";
const MENU_PROMPT: &str = "🌐 **Select your preferred language below:**";
const MENU_PLACEHOLDER: &str = "Choose your language...";

/// What [`Bot::ensure_language_menu`] found or did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuStatus {
    /// No language channel is configured.
    NoChannel,
    AlreadyPinned { message_id: String },
    Posted { message_id: String },
}

#[derive(Debug, Clone)]
pub struct BotSettings {
    pub trigger_emoji: String,
    /// Where the language menu is pinned and "pick a language" notices go.
    /// Notices fall back to the channel of the message that was reacted to.
    pub language_channel_id: Option<String>,
    /// Codes offered in the language menu, in menu order.
    pub supported_languages: Vec<Language>,
    pub notice_delete_after: Duration,
    pub reply_delete_after: Duration,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            trigger_emoji: "🌍".to_string(),
            language_channel_id: None,
            supported_languages: Language::all(),
            notice_delete_after: Duration::from_secs(10),
            reply_delete_after: Duration::from_secs(15),
        }
    }
}

/// Where an outcome is rendered.
enum Surface<'a> {
    Channel { channel_id: &'a str },
    Ephemeral { interaction: &'a Interaction },
}

pub struct Bot {
    preferences: Arc<PreferenceStore>,
    statistics: Arc<StatisticsStore>,
    dedup: DedupGuard,
    dispatcher: TranslationDispatcher,
    chat: Arc<dyn ChatClient>,
    metrics: DispatchMetrics,
    settings: BotSettings,
}

impl Bot {
    pub fn new(
        preferences: Arc<PreferenceStore>,
        statistics: Arc<StatisticsStore>,
        translator: Arc<dyn Translator>,
        chat: Arc<dyn ChatClient>,
        settings: BotSettings,
    ) -> Self {
        let dispatcher = TranslationDispatcher::new(
            Arc::clone(&preferences),
            Arc::clone(&statistics),
            translator,
            settings.supported_languages.clone(),
        );
        Self {
            preferences,
            statistics,
            dedup: DedupGuard::new(),
            dispatcher,
            chat,
            metrics: DispatchMetrics::new(),
            settings,
        }
    }

    pub fn preferences(&self) -> &PreferenceStore {
        &self.preferences
    }

    pub fn statistics(&self) -> &StatisticsStore {
        &self.statistics
    }

    pub fn metrics(&self) -> &DispatchMetrics {
        &self.metrics
    }

    pub fn settings(&self) -> &BotSettings {
        &self.settings
    }

    /// Claim, dispatch and render one translation trigger.
    async fn translate(
        &self,
        message: &MessageRef,
        user: &UserRef,
        surface: Surface<'_>,
    ) -> HandlerOutcome {
        if !self.dedup.try_claim(&message.id, &user.id) {
            debug!(
                "User {} already triggered message {}, skipping",
                user.id, message.id
            );
            self.metrics.record_duplicate();
            return HandlerOutcome::Duplicate;
        }

        let request = TranslationRequest {
            message_id: &message.id,
            server_id: &message.server_id,
            author_id: &message.author.id,
            text: &message.text,
            user_id: &user.id,
        };
        let result = self.dispatcher.dispatch(&request).await;
        self.metrics.record(&result);

        if let Some(reply) = self.render(&result, message, user, &surface) {
            let delivery = match surface {
                Surface::Channel { channel_id } => {
                    // "Pick a language" notices go to the language channel
                    // when one is configured
                    let channel_id = match (&result, self.settings.language_channel_id.as_deref()) {
                        (DispatchOutcome::NoLanguage, Some(language_channel)) => language_channel,
                        _ => channel_id,
                    };
                    self.chat.post(channel_id, &reply).await.map(|_| ())
                }
                Surface::Ephemeral { interaction } => {
                    self.chat.respond_ephemeral(interaction, &reply).await
                }
            };
            if let Err(e) = delivery {
                warn!("Failed to deliver reply for message {}: {}", message.id, e);
            }
        }

        HandlerOutcome::Dispatched { result }
    }

    fn render(
        &self,
        result: &DispatchOutcome,
        message: &MessageRef,
        user: &UserRef,
        surface: &Surface<'_>,
    ) -> Option<Reply> {
        let reply = match result {
            DispatchOutcome::SelfAuthor => return None,
            DispatchOutcome::NoLanguage => match surface {
                Surface::Ephemeral { interaction } => {
                    Reply::text(notice_language(interaction).strings().configure_language)
                }
                Surface::Channel { .. } => {
                    Reply::text(Language::ENGLISH.strings().configure_language)
                        .mentioning(&user.id)
                        .deleted_after(self.settings.notice_delete_after)
                }
            },
            DispatchOutcome::TranslationFailed { language } => {
                Reply::text(language.strings().translation_failed)
                    .deleted_after(self.settings.notice_delete_after)
            }
            DispatchOutcome::Success { language, text } => Reply::embed(TranslationEmbed {
                author_name: format!("{} ({})", message.author.label(), language),
                author_icon_url: message.author.avatar_url.clone(),
                text: text.clone(),
            })
            .mentioning(&user.id)
            .silent()
            .deleted_after(self.settings.reply_delete_after),
        };
        Some(reply)
    }

    async fn select_language(&self, interaction: &Interaction) -> HandlerOutcome {
        let [code] = interaction.values.as_slice() else {
            warn!(
                "Language selection from {} carried {} values",
                interaction.user.id,
                interaction.values.len()
            );
            return HandlerOutcome::Ignored;
        };

        let language = match Language::from_code(code) {
            Ok(language) if self.settings.supported_languages.contains(&language) => language,
            _ => {
                info!("User {} selected unsupported language {}", interaction.user.id, code);
                self.respond(
                    interaction,
                    Reply::text(notice_language(interaction).strings().language_unsupported),
                )
                .await;
                return HandlerOutcome::LanguageRejected { code: code.clone() };
            }
        };

        if let Err(e) = self.preferences.set(&interaction.user.id, language).await {
            error!(
                "Failed to save language {} for user {}: {}",
                language, interaction.user.id, e
            );
            self.respond(interaction, Reply::text(language.strings().preference_failed))
                .await;
            return HandlerOutcome::PreferenceFailed;
        }

        info!("User {} set language to {}", interaction.user.id, language);
        self.respond(
            interaction,
            Reply::text(language.strings().language_set_for(language.code())),
        )
        .await;
        HandlerOutcome::LanguageSet {
            language: language.code().to_string(),
        }
    }

    async fn respond(&self, interaction: &Interaction, reply: Reply) {
        if let Err(e) = self.chat.respond_ephemeral(interaction, &reply).await {
            warn!("Failed to answer interaction {}: {}", interaction.id, e);
        }
    }

    /// The select menu offering every supported language, labelled in its
    /// own language.
    pub fn language_menu(&self) -> SelectMenu {
        SelectMenu {
            custom_id: LANGUAGE_SELECT_ID.to_string(),
            placeholder: MENU_PLACEHOLDER.to_string(),
            options: self
                .settings
                .supported_languages
                .iter()
                .map(|language| MenuOption {
                    label: language.native_name().to_string(),
                    value: language.code().to_string(),
                    description: (language.name() != language.native_name())
                        .then(|| language.name().to_string()),
                })
                .collect(),
        }
    }

    /// Make sure the language channel has the bot's menu pinned, posting
    /// and pinning a new one when none of the pins is ours.
    pub async fn ensure_language_menu(&self) -> Result<MenuStatus, ChatError> {
        let Some(channel_id) = self.settings.language_channel_id.as_deref() else {
            return Ok(MenuStatus::NoChannel);
        };

        let bot_id = self.chat.current_user_id().await?;
        let pins = self.chat.pinned_messages(channel_id).await?;
        if let Some(existing) = pins
            .iter()
            .find(|pin| pin.author_id == bot_id && pin.content.starts_with(MENU_MARKER))
        {
            debug!("Language menu already pinned as {}", existing.id);
            return Ok(MenuStatus::AlreadyPinned {
                message_id: existing.id.clone(),
            });
        }

        let reply = Reply::text(MENU_PROMPT).with_menu(self.language_menu());
        let message_id = self.chat.post(channel_id, &reply).await?;
        self.chat.pin(channel_id, &message_id).await?;
        info!("Pinned language menu {} in {}", message_id, channel_id);
        Ok(MenuStatus::Posted { message_id })
    }

    /// `/language`: point at the pinned menu, or hand out the menu directly
    /// when there is no language channel.
    fn language_hint(&self, interaction: &Interaction) -> Reply {
        let strings = notice_language(interaction).strings();
        match self.settings.language_channel_id.as_deref() {
            Some(channel_id) => {
                Reply::text(strings.language_hint_for(&format!("<#{}>", channel_id)))
            }
            None => Reply::text(MENU_PROMPT).with_menu(self.language_menu()),
        }
    }

    /// `/stats`: the server's counters, or global ones outside a server.
    fn stats_reply(&self, interaction: &Interaction) -> Reply {
        let summary = match interaction.server_id.as_deref() {
            Some(server_id) => self
                .statistics
                .server_summary(server_id)
                .unwrap_or_else(StatsSummary::empty),
            None => self.statistics.global_summary(),
        };
        Reply::text(format_stats(&summary))
    }
}

/// Language for notices on an interaction: the user's client locale when
/// it maps to a registered language, English otherwise.
fn notice_language(interaction: &Interaction) -> Language {
    interaction
        .locale
        .as_deref()
        .and_then(Language::from_locale)
        .unwrap_or(Language::ENGLISH)
}

fn format_stats(summary: &StatsSummary) -> String {
    let mut text = format!(
        "📊 **Translation Stats**\nTotal translations: {}\nUsers translated: {}\nTop languages:",
        summary.total, summary.unique_users
    );
    if summary.top_languages.is_empty() {
        text.push_str("\nNone yet.");
    }
    for entry in &summary.top_languages {
        let name = Language::from_code(&entry.code)
            .map(|language| language.name())
            .unwrap_or(entry.code.as_str());
        text.push_str(&format!("\n{} - {}", name, entry.count));
    }
    text
}

#[async_trait]
impl TriggerHandler for Bot {
    async fn on_reaction_added(&self, event: ReactionAdded) -> HandlerOutcome {
        if event.user.bot || event.emoji != self.settings.trigger_emoji {
            return HandlerOutcome::Ignored;
        }

        let surface = Surface::Channel {
            channel_id: &event.message.channel_id,
        };
        self.translate(&event.message, &event.user, surface).await
    }

    async fn on_button_pressed(&self, event: ButtonPressed) -> HandlerOutcome {
        let interaction = &event.interaction;
        if interaction.user.bot {
            return HandlerOutcome::Ignored;
        }

        match interaction.custom_id.as_str() {
            TRANSLATE_BUTTON_ID => match interaction.message.as_ref() {
                Some(message) => {
                    self.translate(message, &interaction.user, Surface::Ephemeral { interaction })
                        .await
                }
                None => {
                    warn!("Translate button {} without a message", interaction.id);
                    HandlerOutcome::Ignored
                }
            },
            LANGUAGE_SELECT_ID => self.select_language(interaction).await,
            other => {
                debug!("Ignoring component {}", other);
                HandlerOutcome::Ignored
            }
        }
    }

    async fn on_message_created(&self, event: MessageCreated) -> HandlerOutcome {
        let message = &event.message;
        if message.author.bot || event.webhook_id.is_some() {
            return HandlerOutcome::Ignored;
        }

        match self
            .chat
            .add_reaction(&message.channel_id, &message.id, &self.settings.trigger_emoji)
            .await
        {
            Ok(()) => HandlerOutcome::Reacted,
            Err(e) => {
                warn!("Failed to react to message {}: {}", message.id, e);
                HandlerOutcome::ReactionFailed
            }
        }
    }

    async fn on_command(&self, event: CommandInvoked) -> HandlerOutcome {
        let interaction = &event.interaction;
        let reply = match event.name.as_str() {
            LANGUAGE_COMMAND => self.language_hint(interaction),
            STATS_COMMAND => self.stats_reply(interaction),
            other => {
                debug!("Ignoring command {}", other);
                return HandlerOutcome::Ignored;
            }
        };

        self.respond(interaction, reply).await;
        HandlerOutcome::CommandAnswered {
            command: event.name,
        }
    }

    async fn on_tick(&self) -> HandlerOutcome {
        let (preferences, statistics) =
            tokio::join!(self.preferences.flush(), self.statistics.flush());

        if let Err(e) = &preferences {
            error!("Periodic save of preferences failed: {}", e);
        }
        if let Err(e) = &statistics {
            error!("Periodic save of statistics failed: {}", e);
        }

        if preferences.is_ok() && statistics.is_ok() {
            debug!("Periodic save complete");
            HandlerOutcome::Flushed
        } else {
            HandlerOutcome::FlushFailed
        }
    }
}

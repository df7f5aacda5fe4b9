//! Trigger events delivered by the chat platform relay, and the handler
//! interface that consumes them.

use crate::dispatcher::DispatchOutcome;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

impl UserRef {
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }
}

/// The message a trigger points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRef {
    pub id: String,
    pub channel_id: String,
    pub server_id: String,
    pub author: UserRef,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionAdded {
    pub message: MessageRef,
    pub user: UserRef,
    pub emoji: String,
}

/// A component interaction (button or select menu).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    pub id: String,
    pub token: String,
    /// Component id; empty for slash commands.
    #[serde(default)]
    pub custom_id: String,
    pub user: UserRef,
    #[serde(default)]
    pub server_id: Option<String>,
    /// Message the component is attached to, when translating it.
    #[serde(default)]
    pub message: Option<MessageRef>,
    /// Selected option values for select menus.
    #[serde(default)]
    pub values: Vec<String>,
    /// Client locale of the user who interacted (e.g. "pt-BR").
    #[serde(default)]
    pub locale: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonPressed {
    pub interaction: Interaction,
}

/// A new message posted in a channel the bot can see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageCreated {
    pub message: MessageRef,
    /// Set when the message came through a webhook.
    #[serde(default)]
    pub webhook_id: Option<String>,
}

/// A slash command such as `/language`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandInvoked {
    pub name: String,
    pub interaction: Interaction,
}

/// Everything the relay can forward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TriggerEvent {
    ReactionAdded(ReactionAdded),
    ButtonPressed(ButtonPressed),
    MessageCreated(MessageCreated),
    CommandInvoked(CommandInvoked),
}

/// How a handler disposed of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum HandlerOutcome {
    /// Not a trigger this bot reacts to.
    Ignored,
    /// The (message, user) pair already fired.
    Duplicate,
    Dispatched { result: DispatchOutcome },
    LanguageSet { language: String },
    LanguageRejected { code: String },
    PreferenceFailed,
    /// The trigger emoji was added under a new message.
    Reacted,
    ReactionFailed,
    CommandAnswered { command: String },
    Flushed,
    FlushFailed,
}

/// One entry point per trigger kind. Registered with the chat client (and
/// the scheduler, for ticks) at startup.
#[async_trait]
pub trait TriggerHandler: Send + Sync {
    async fn on_reaction_added(&self, event: ReactionAdded) -> HandlerOutcome;

    async fn on_button_pressed(&self, event: ButtonPressed) -> HandlerOutcome;

    async fn on_message_created(&self, event: MessageCreated) -> HandlerOutcome;

    async fn on_command(&self, event: CommandInvoked) -> HandlerOutcome;

    async fn on_tick(&self) -> HandlerOutcome;

    async fn handle(&self, event: TriggerEvent) -> HandlerOutcome {
        match event {
            TriggerEvent::ReactionAdded(event) => self.on_reaction_added(event).await,
            TriggerEvent::ButtonPressed(event) => self.on_button_pressed(event).await,
            TriggerEvent::MessageCreated(event) => self.on_message_created(event).await,
            TriggerEvent::CommandInvoked(event) => self.on_command(event).await,
        }
    }
}

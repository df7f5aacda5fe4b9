//! Outbound side of the chat platform: what the bot can ask the client to
//! display.

use crate::error::ChatError;
use crate::events::Interaction;
use async_trait::async_trait;
use std::time::Duration;

/// A translation rendered as a card attributed to the original author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationEmbed {
    pub author_name: String,
    pub author_icon_url: Option<String>,
    pub text: String,
}

/// One choice in a select menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuOption {
    pub label: String,
    pub value: String,
    pub description: Option<String>,
}

/// A single-choice select menu attached below a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectMenu {
    pub custom_id: String,
    pub placeholder: String,
    pub options: Vec<MenuOption>,
}

/// A message already in a channel, as returned by the pins listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedMessage {
    pub id: String,
    pub author_id: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    pub content: Option<String>,
    /// User id to mention ahead of the content.
    pub mention: Option<String>,
    pub embed: Option<TranslationEmbed>,
    /// Deliver without a push notification.
    pub silent: bool,
    /// Remove the message again after this long. Ignored for ephemeral
    /// responses, which only the recipient sees anyway.
    pub delete_after: Option<Duration>,
    pub menu: Option<SelectMenu>,
}

impl Reply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn embed(embed: TranslationEmbed) -> Self {
        Self {
            embed: Some(embed),
            ..Self::default()
        }
    }

    pub fn mentioning(mut self, user_id: impl Into<String>) -> Self {
        self.mention = Some(user_id.into());
        self
    }

    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }

    pub fn deleted_after(mut self, delay: Duration) -> Self {
        self.delete_after = Some(delay);
        self
    }

    pub fn with_menu(mut self, menu: SelectMenu) -> Self {
        self.menu = Some(menu);
        self
    }
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Post a message in a channel and return its id.
    async fn post(&self, channel_id: &str, reply: &Reply) -> Result<String, ChatError>;

    /// Answer a component interaction with a message only the presser sees.
    async fn respond_ephemeral(
        &self,
        interaction: &Interaction,
        reply: &Reply,
    ) -> Result<(), ChatError>;

    /// React to a message as the bot.
    async fn add_reaction(
        &self,
        channel_id: &str,
        message_id: &str,
        emoji: &str,
    ) -> Result<(), ChatError>;

    /// Id of the account the client is authenticated as.
    async fn current_user_id(&self) -> Result<String, ChatError>;

    async fn pinned_messages(&self, channel_id: &str) -> Result<Vec<PostedMessage>, ChatError>;

    async fn pin(&self, channel_id: &str, message_id: &str) -> Result<(), ChatError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_builders() {
        let reply = Reply::text("hi")
            .mentioning("42")
            .silent()
            .deleted_after(Duration::from_secs(10));

        assert_eq!(reply.content.as_deref(), Some("hi"));
        assert_eq!(reply.mention.as_deref(), Some("42"));
        assert!(reply.silent);
        assert_eq!(reply.delete_after, Some(Duration::from_secs(10)));
        assert!(reply.embed.is_none());
        assert!(reply.menu.is_none());
    }

    #[test]
    fn test_menu_reply() {
        let reply = Reply::text("pick one").with_menu(SelectMenu {
            custom_id: "language_select".to_string(),
            placeholder: "Choose".to_string(),
            options: vec![MenuOption {
                label: "Français".to_string(),
                value: "fr".to_string(),
                description: Some("French".to_string()),
            }],
        });

        let menu = reply.menu.as_ref().unwrap();
        assert_eq!(menu.options.len(), 1);
        assert_eq!(menu.options[0].value, "fr");
        assert!(reply.delete_after.is_none());
    }

    #[test]
    fn test_embed_reply_has_no_content() {
        let reply = Reply::embed(TranslationEmbed {
            author_name: "Bea (fr)".to_string(),
            author_icon_url: None,
            text: "Bonjour".to_string(),
        });
        assert!(reply.content.is_none());
        assert!(!reply.silent);
    }
}

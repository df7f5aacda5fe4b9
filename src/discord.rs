//! Discord REST implementation of [`ChatClient`].
//!
//! Only the calls the bot needs: create, pin and delete channel messages,
//! add reactions, and answer component interactions. Gateway handling lives
//! in the relay.

use crate::chat::{ChatClient, PostedMessage, Reply, SelectMenu};
use crate::error::ChatError;
use crate::events::Interaction;
use crate::retry::{with_retry_policy, RetryConfig, RetryPolicy};
use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// `discord.Color.blue()`
const EMBED_COLOR: u32 = 0x3498DB;

const FLAG_EPHEMERAL: u64 = 1 << 6;
const FLAG_SUPPRESS_NOTIFICATIONS: u64 = 1 << 12;

/// Interaction callback type: respond with a message.
const CHANNEL_MESSAGE_WITH_SOURCE: u8 = 4;

const COMPONENT_ACTION_ROW: u8 = 1;
const COMPONENT_STRING_SELECT: u8 = 3;

#[derive(Debug, Serialize)]
struct CreateMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    embeds: Vec<Embed>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    components: Vec<ActionRow>,
    allowed_mentions: AllowedMentions,
    flags: u64,
}

#[derive(Debug, Serialize)]
struct Embed {
    description: String,
    color: u32,
    author: EmbedAuthor,
}

#[derive(Debug, Serialize)]
struct EmbedAuthor {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    icon_url: Option<String>,
}

#[derive(Debug, Serialize)]
struct ActionRow {
    #[serde(rename = "type")]
    kind: u8,
    components: Vec<StringSelect>,
}

#[derive(Debug, Serialize)]
struct StringSelect {
    #[serde(rename = "type")]
    kind: u8,
    custom_id: String,
    placeholder: String,
    min_values: u8,
    max_values: u8,
    options: Vec<SelectOption>,
}

#[derive(Debug, Serialize)]
struct SelectOption {
    label: String,
    value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

/// An empty `parse` list renders mentions without pinging anyone.
#[derive(Debug, Serialize)]
struct AllowedMentions {
    parse: Vec<String>,
}

#[derive(Debug, Serialize)]
struct InteractionCallback {
    #[serde(rename = "type")]
    kind: u8,
    data: CreateMessage,
}

#[derive(Debug, Deserialize)]
struct CreatedMessage {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    id: String,
    #[serde(default)]
    content: String,
    author: ApiUser,
}

fn render_menu(menu: &SelectMenu) -> ActionRow {
    ActionRow {
        kind: COMPONENT_ACTION_ROW,
        components: vec![StringSelect {
            kind: COMPONENT_STRING_SELECT,
            custom_id: menu.custom_id.clone(),
            placeholder: menu.placeholder.clone(),
            min_values: 1,
            max_values: 1,
            options: menu
                .options
                .iter()
                .map(|option| SelectOption {
                    label: option.label.clone(),
                    value: option.value.clone(),
                    description: option.description.clone(),
                })
                .collect(),
        }],
    }
}

fn render(reply: &Reply, ephemeral: bool) -> CreateMessage {
    let mention = reply.mention.as_ref().map(|id| format!("<@{}>", id));
    let content = match (mention, reply.content.as_ref()) {
        (Some(mention), Some(text)) => Some(format!("{} {}", mention, text)),
        (Some(mention), None) => Some(mention),
        (None, Some(text)) => Some(text.clone()),
        (None, None) => None,
    };

    let embeds = reply
        .embed
        .iter()
        .map(|embed| Embed {
            description: embed.text.clone(),
            color: EMBED_COLOR,
            author: EmbedAuthor {
                name: embed.author_name.clone(),
                icon_url: embed.author_icon_url.clone(),
            },
        })
        .collect();

    let mut flags = 0;
    if reply.silent {
        flags |= FLAG_SUPPRESS_NOTIFICATIONS;
    }
    if ephemeral {
        flags |= FLAG_EPHEMERAL;
    }

    CreateMessage {
        content,
        embeds,
        components: reply.menu.iter().map(render_menu).collect(),
        allowed_mentions: AllowedMentions { parse: Vec::new() },
        flags,
    }
}

/// `Retry-After` in (possibly fractional) seconds.
fn parse_retry_after(response: &reqwest::Response) -> Option<Duration> {
    let seconds: f64 = response
        .headers()
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()?;
    if seconds.is_finite() && seconds >= 0.0 {
        Some(Duration::from_secs_f64(seconds))
    } else {
        None
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ChatError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let retry_after = parse_retry_after(&response);
    let body = response.text().await.unwrap_or_default();
    if status == 429 {
        return Err(ChatError::RateLimited { retry_after, body });
    }
    Err(ChatError::Api { status, body })
}

/// Reads and idempotent writes can be repeated after a transport failure.
fn idempotent_retry_policy(error: &ChatError) -> RetryPolicy {
    match error {
        ChatError::Http(_) => RetryPolicy::Backoff,
        other => other.retry_policy(),
    }
}

#[derive(Debug, Clone)]
pub struct DiscordClient {
    client: reqwest::Client,
    api_url: String,
    token: String,
    retry: RetryConfig,
}

impl DiscordClient {
    pub fn new(client: reqwest::Client, api_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            retry: RetryConfig::chat_api(),
        }
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// `api_url` followed by `segments`, each percent-encoded on its own.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ChatError> {
        let mut url = Url::parse(&self.api_url)
            .map_err(|e| ChatError::InvalidUrl(format!("{}: {}", self.api_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| ChatError::InvalidUrl(self.api_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorization(&self) -> String {
        format!("Bot {}", self.token)
    }

    async fn create_message(&self, url: &Url, body: &CreateMessage) -> Result<String, ChatError> {
        let response = self
            .client
            .post(url.clone())
            .header("Authorization", self.authorization())
            .json(body)
            .send()
            .await?;

        let created: CreatedMessage = check_status(response).await?.json().await?;
        Ok(created.id)
    }

    /// Send a bodyless authorized request, retrying with
    /// [`idempotent_retry_policy`].
    async fn idempotent(
        &self,
        method: reqwest::Method,
        url: Url,
        operation_name: &str,
    ) -> Result<reqwest::Response, ChatError> {
        with_retry_policy(
            &self.retry,
            operation_name,
            || async {
                let response = self
                    .client
                    .request(method.clone(), url.clone())
                    .header("Authorization", self.authorization())
                    .send()
                    .await?;
                check_status(response).await
            },
            idempotent_retry_policy,
        )
        .await
    }

    pub async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<(), ChatError> {
        let url = self.endpoint(&["channels", channel_id, "messages", message_id])?;
        let response = self
            .client
            .delete(url)
            .header("Authorization", self.authorization())
            .send()
            .await?;

        check_status(response).await?;
        Ok(())
    }

    fn schedule_delete(&self, channel_id: &str, message_id: String, delay: Duration) {
        let client = self.clone();
        let channel_id = channel_id.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match client.delete_message(&channel_id, &message_id).await {
                Ok(()) => debug!("Deleted message {} in {}", message_id, channel_id),
                Err(e) => warn!("Failed to delete message {}: {}", message_id, e),
            }
        });
    }
}

#[async_trait]
impl ChatClient for DiscordClient {
    /// Message creation is not idempotent: only answers that came back
    /// asking for another attempt are retried, never transport failures.
    async fn post(&self, channel_id: &str, reply: &Reply) -> Result<String, ChatError> {
        let url = self.endpoint(&["channels", channel_id, "messages"])?;
        let body = render(reply, false);
        let message_id = with_retry_policy(
            &self.retry,
            "Discord create message",
            || self.create_message(&url, &body),
            ChatError::retry_policy,
        )
        .await?;

        if let Some(delay) = reply.delete_after {
            self.schedule_delete(channel_id, message_id.clone(), delay);
        }
        Ok(message_id)
    }

    async fn respond_ephemeral(
        &self,
        interaction: &Interaction,
        reply: &Reply,
    ) -> Result<(), ChatError> {
        let url = self.endpoint(&[
            "interactions",
            interaction.id.as_str(),
            interaction.token.as_str(),
            "callback",
        ])?;
        let body = InteractionCallback {
            kind: CHANNEL_MESSAGE_WITH_SOURCE,
            data: render(reply, true),
        };

        with_retry_policy(
            &self.retry,
            "Discord interaction response",
            || async {
                let response = self.client.post(url.clone()).json(&body).send().await?;
                check_status(response).await?;
                Ok::<(), ChatError>(())
            },
            ChatError::retry_policy,
        )
        .await
    }

    async fn add_reaction(
        &self,
        channel_id: &str,
        message_id: &str,
        emoji: &str,
    ) -> Result<(), ChatError> {
        let url = self.endpoint(&[
            "channels",
            channel_id,
            "messages",
            message_id,
            "reactions",
            emoji,
            "@me",
        ])?;
        self.idempotent(reqwest::Method::PUT, url, "Discord add reaction")
            .await?;
        Ok(())
    }

    async fn current_user_id(&self) -> Result<String, ChatError> {
        let url = self.endpoint(&["users", "@me"])?;
        let user: ApiUser = self
            .idempotent(reqwest::Method::GET, url, "Discord current user")
            .await?
            .json()
            .await?;
        Ok(user.id)
    }

    async fn pinned_messages(&self, channel_id: &str) -> Result<Vec<PostedMessage>, ChatError> {
        let url = self.endpoint(&["channels", channel_id, "pins"])?;
        let messages: Vec<ApiMessage> = self
            .idempotent(reqwest::Method::GET, url, "Discord list pins")
            .await?
            .json()
            .await?;
        Ok(messages
            .into_iter()
            .map(|message| PostedMessage {
                id: message.id,
                author_id: message.author.id,
                content: message.content,
            })
            .collect())
    }

    async fn pin(&self, channel_id: &str, message_id: &str) -> Result<(), ChatError> {
        let url = self.endpoint(&["channels", channel_id, "pins", message_id])?;
        self.idempotent(reqwest::Method::PUT, url, "Discord pin message")
            .await?;
        Ok(())
    }
}

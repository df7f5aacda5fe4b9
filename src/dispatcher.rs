//! The decision sequence run once a trigger has been claimed.

use crate::i18n::Language;
use crate::preferences::PreferenceStore;
use crate::statistics::StatisticsStore;
use crate::translator::Translator;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// One claimed translation trigger.
#[derive(Debug, Clone, Copy)]
pub struct TranslationRequest<'a> {
    pub message_id: &'a str,
    pub server_id: &'a str,
    pub author_id: &'a str,
    pub text: &'a str,
    /// The user who reacted or pressed the button.
    pub user_id: &'a str,
}

/// Terminal state of a dispatch. There is no retry transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// The requesting user never picked a language.
    NoLanguage,
    /// Users do not get their own messages translated.
    SelfAuthor,
    TranslationFailed { language: Language },
    Success { language: Language, text: String },
}

pub struct TranslationDispatcher {
    preferences: Arc<PreferenceStore>,
    statistics: Arc<StatisticsStore>,
    translator: Arc<dyn Translator>,
    /// Languages currently offered. A stored preference outside this set
    /// counts as no preference.
    supported: Vec<Language>,
}

impl TranslationDispatcher {
    pub fn new(
        preferences: Arc<PreferenceStore>,
        statistics: Arc<StatisticsStore>,
        translator: Arc<dyn Translator>,
        supported: Vec<Language>,
    ) -> Self {
        Self {
            preferences,
            statistics,
            translator,
            supported,
        }
    }

    /// The user's stored language, if it is still offered.
    fn language_for(&self, user_id: &str) -> Option<Language> {
        let language = self.preferences.get(user_id)?;
        if self.supported.contains(&language) {
            Some(language)
        } else {
            info!(
                "Stored language {} for user {} is no longer offered",
                language, user_id
            );
            None
        }
    }

    /// Run one request to a terminal outcome. Never returns an error:
    /// every failure is folded into the outcome.
    pub async fn dispatch(&self, request: &TranslationRequest<'_>) -> DispatchOutcome {
        let Some(language) = self.language_for(request.user_id) else {
            info!(
                "User {} has no language set, asking them to pick one",
                request.user_id
            );
            return DispatchOutcome::NoLanguage;
        };

        if request.user_id == request.author_id {
            debug!(
                "User {} triggered a translation of their own message {}",
                request.user_id, request.message_id
            );
            return DispatchOutcome::SelfAuthor;
        }

        let text = match self.translator.translate(request.text, language).await {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    "Translation of message {} to {} failed: {:#}",
                    request.message_id, language, e
                );
                return DispatchOutcome::TranslationFailed { language };
            }
        };

        if let Err(e) = self
            .statistics
            .record_translation(request.server_id, request.user_id, language)
            .await
        {
            error!(
                "Failed to persist statistics for server {}: {}",
                request.server_id, e
            );
        }

        info!(
            "Translated message {} to {} for user {}",
            request.message_id, language, request.user_id
        );
        DispatchOutcome::Success { language, text }
    }
}

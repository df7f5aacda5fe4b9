//! Trigger outcome counters.

use crate::dispatcher::DispatchOutcome;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts of how triggers ended, owned by the bot.
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    duplicates: AtomicUsize,
    no_language: AtomicUsize,
    self_author: AtomicUsize,
    translation_failures: AtomicUsize,
    translations: AtomicUsize,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a trigger rejected by the dedup guard.
    pub fn record_duplicate(&self) {
        self.duplicates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record(&self, outcome: &DispatchOutcome) {
        let counter = match outcome {
            DispatchOutcome::NoLanguage => &self.no_language,
            DispatchOutcome::SelfAuthor => &self.self_author,
            DispatchOutcome::TranslationFailed { .. } => &self.translation_failures,
            DispatchOutcome::Success { .. } => &self.translations,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn report(&self) -> MetricsReport {
        let translations = self.translations.load(Ordering::Relaxed);
        let failures = self.translation_failures.load(Ordering::Relaxed);
        let translator_calls = translations + failures;
        let translator_success_rate = if translator_calls > 0 {
            (translations as f64 / translator_calls as f64) * 100.0
        } else {
            0.0
        };

        MetricsReport {
            duplicates: self.duplicates.load(Ordering::Relaxed),
            no_language: self.no_language.load(Ordering::Relaxed),
            self_author: self.self_author.load(Ordering::Relaxed),
            translation_failures: failures,
            translations,
            translator_calls,
            translator_success_rate,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub duplicates: usize,
    pub no_language: usize,
    pub self_author: usize,
    pub translation_failures: usize,
    pub translations: usize,
    pub translator_calls: usize,

    /// Percentage (0-100) of translator calls that succeeded
    pub translator_success_rate: f64,
}

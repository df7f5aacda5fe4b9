//! Per-server translation counters.
//!
//! Every record keeps `total == Σ per_user == Σ per_language`. Counters are
//! persisted after each recorded translation.

use crate::error::StoreError;
use crate::i18n::Language;
use crate::store::DurableFile;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Languages shown in a summary ranking.
const SUMMARY_TOP_LANGUAGES: usize = 5;

/// Counters stop at `u64::MAX` instead of wrapping.
fn saturating_sum(counts: impl Iterator<Item = u64>) -> u64 {
    counts.fold(0, u64::saturating_add)
}

/// Counter that remembers the order in which keys were first seen.
///
/// Serialized as a JSON object in that order, so ranking ties resolve the
/// same way after a restart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tally {
    entries: Vec<(String, u64)>,
}

impl Tally {
    pub fn increment(&mut self, key: &str) {
        self.add(key, 1);
    }

    fn add(&mut self, key: &str, count: u64) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = existing.saturating_add(count),
            None => self.entries.push((key.to_string(), count)),
        }
    }

    pub fn get(&self, key: &str) -> u64 {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }

    pub fn sum(&self) -> u64 {
        saturating_sum(self.entries.iter().map(|(_, count)| *count))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(k, count)| (k.as_str(), *count))
    }

    /// Add another tally's counts; keys new to `self` are appended in the
    /// other tally's order.
    pub fn merge(&mut self, other: &Tally) {
        for (key, count) in other.iter() {
            self.add(key, count);
        }
    }

    /// The `n` highest counts, descending; equal counts keep first-seen order.
    pub fn most_common(&self, n: usize) -> Vec<(String, u64)> {
        let mut ranked = self.entries.clone();
        // sort_by is stable
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(n);
        ranked
    }
}

impl Serialize for Tally {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, count) in &self.entries {
            map.serialize_entry(key, count)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Tally {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TallyVisitor;

        impl<'de> Visitor<'de> for TallyVisitor {
            type Value = Tally;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("an object of non-negative counts")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Tally, A::Error> {
                let mut tally = Tally::default();
                while let Some((key, count)) = access.next_entry::<String, u64>()? {
                    tally.add(&key, count);
                }
                Ok(tally)
            }
        }

        deserializer.deserialize_map(TallyVisitor)
    }
}

/// Counters for one server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStats {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub per_user: BTreeMap<String, u64>,
    #[serde(default)]
    pub per_language: Tally,
}

impl ServerStats {
    fn record(&mut self, user_id: &str, language: Language) {
        self.total = self.total.saturating_add(1);
        let per_user = self.per_user.entry(user_id.to_string()).or_insert(0);
        *per_user = per_user.saturating_add(1);
        self.per_language.increment(language.code());
    }

    /// `total` matches both breakdowns.
    pub fn is_consistent(&self) -> bool {
        let per_user = saturating_sum(self.per_user.values().copied());
        self.total == per_user && self.total == self.per_language.sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LanguageCount {
    pub code: String,
    pub count: u64,
}

fn ranking(tally: &Tally, n: usize) -> Vec<LanguageCount> {
    tally
        .most_common(n)
        .into_iter()
        .map(|(code, count)| LanguageCount { code, count })
        .collect()
}

/// What the stats view shows, for one server or for all of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsSummary {
    pub total: u64,
    pub unique_users: usize,
    pub top_languages: Vec<LanguageCount>,
}

impl StatsSummary {
    /// A server with nothing recorded yet.
    pub fn empty() -> Self {
        Self {
            total: 0,
            unique_users: 0,
            top_languages: Vec::new(),
        }
    }
}

type AllStats = BTreeMap<String, ServerStats>;

/// Server id → counters, persisted as one JSON object.
pub struct StatisticsStore {
    file: DurableFile,
    servers: Mutex<AllStats>,
}

impl StatisticsStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let file = DurableFile::new(path);
        let servers: AllStats = file.load();

        for (server_id, stats) in &servers {
            if !stats.is_consistent() {
                warn!(
                    "Statistics for server {} are inconsistent (total {})",
                    server_id, stats.total
                );
            }
        }
        info!(
            "Loaded statistics for {} servers from {}",
            servers.len(),
            file.path().display()
        );

        Self {
            file,
            servers: Mutex::new(servers),
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Count one translation and persist immediately.
    ///
    /// On a persistence failure the in-memory counters keep the increment
    /// and the next successful save (or periodic flush) writes it out.
    pub async fn record_translation(
        &self,
        server_id: &str,
        user_id: &str,
        language: Language,
    ) -> Result<(), StoreError> {
        let snapshot = {
            let mut servers = self.servers();
            servers
                .entry(server_id.to_string())
                .or_default()
                .record(user_id, language);
            self.file.snapshot(&*servers)
        };
        debug!(
            "Recorded {} translation for user {} in server {}",
            language, user_id, server_id
        );
        self.file.persist(snapshot).await
    }

    /// Zero one server's counters and persist. Returns whether the server
    /// had any record.
    pub async fn reset(&self, server_id: &str) -> Result<bool, StoreError> {
        let snapshot = {
            let mut servers = self.servers();
            let Some(stats) = servers.get_mut(server_id) else {
                return Ok(false);
            };
            *stats = ServerStats::default();
            self.file.snapshot(&*servers)
        };
        info!("Statistics reset for server {}", server_id);
        self.file.persist(snapshot).await?;
        Ok(true)
    }

    pub fn snapshot(&self, server_id: &str) -> Option<ServerStats> {
        self.servers().get(server_id).cloned()
    }

    /// The `n` most used languages in a server, ties in first-seen order.
    pub fn top_languages(&self, server_id: &str, n: usize) -> Vec<LanguageCount> {
        self.servers()
            .get(server_id)
            .map(|stats| ranking(&stats.per_language, n))
            .unwrap_or_default()
    }

    pub fn server_summary(&self, server_id: &str) -> Option<StatsSummary> {
        self.servers().get(server_id).map(|stats| StatsSummary {
            total: stats.total,
            unique_users: stats.per_user.len(),
            top_languages: ranking(&stats.per_language, SUMMARY_TOP_LANGUAGES),
        })
    }

    /// Totals across every server; users active in several servers count once.
    pub fn global_summary(&self) -> StatsSummary {
        let servers = self.servers();
        let mut total = 0;
        let mut users: BTreeSet<&str> = BTreeSet::new();
        let mut languages = Tally::default();

        for stats in servers.values() {
            total = u64::saturating_add(total, stats.total);
            users.extend(stats.per_user.keys().map(String::as_str));
            languages.merge(&stats.per_language);
        }

        StatsSummary {
            total,
            unique_users: users.len(),
            top_languages: ranking(&languages, SUMMARY_TOP_LANGUAGES),
        }
    }

    pub async fn flush(&self) -> Result<(), StoreError> {
        let snapshot = self.file.snapshot(&*self.servers());
        self.file.persist(snapshot).await
    }

    fn servers(&self) -> MutexGuard<'_, AllStats> {
        self.servers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

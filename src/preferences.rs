use crate::error::StoreError;
use crate::i18n::Language;
use crate::retry::{with_retry, RetryConfig};
use crate::store::DurableFile;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};

type Preferences = BTreeMap<String, String>;

/// User id → language code, persisted as a flat JSON object.
///
/// Entries are only ever overwritten, never removed.
pub struct PreferenceStore {
    file: DurableFile,
    entries: Mutex<Preferences>,
}

impl PreferenceStore {
    /// Load preferences from `path`. A missing or corrupt file yields an
    /// empty store.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let file = DurableFile::new(path);
        let entries: Preferences = file.load();
        info!(
            "Loaded {} language preferences from {}",
            entries.len(),
            file.path().display()
        );

        Self {
            file,
            entries: Mutex::new(entries),
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// The user's language, if they picked one that is still supported.
    pub fn get(&self, user_id: &str) -> Option<Language> {
        let code = self.entries().get(user_id).cloned()?;
        match Language::from_code(&code) {
            Ok(language) => Some(language),
            Err(e) => {
                warn!("Ignoring stored language for user {}: {}", user_id, e);
                None
            }
        }
    }

    /// Record the user's language and persist it.
    ///
    /// The write is verified by reloading the file and reading the key back;
    /// a failed write or a mismatch is retried exactly once before the error
    /// is returned.
    pub async fn set(&self, user_id: &str, language: Language) -> Result<(), StoreError> {
        self.entries()
            .insert(user_id.to_string(), language.code().to_string());

        with_retry(
            &RetryConfig::preference_write(),
            "Preference write",
            || self.persist_and_verify(user_id, language),
        )
        .await?;

        info!("Language for user {} set to {}", user_id, language);
        Ok(())
    }

    async fn persist_and_verify(&self, user_id: &str, language: Language) -> Result<(), StoreError> {
        self.flush().await?;

        let reloaded: Preferences = self.file.load_async().await;
        match reloaded.get(user_id) {
            Some(code) if code == language.code() => Ok(()),
            _ => Err(StoreError::PreferenceMismatch {
                user_id: user_id.to_string(),
            }),
        }
    }

    /// Write the current mapping to disk.
    pub async fn flush(&self) -> Result<(), StoreError> {
        let snapshot = self.file.snapshot(&*self.entries());
        self.file.persist(snapshot).await
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    fn entries(&self) -> MutexGuard<'_, Preferences> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

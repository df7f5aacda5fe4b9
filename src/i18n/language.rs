//! Language type: a code validated against the registry.

use crate::i18n::{LanguageConfig, LanguageRegistry, LanguageStrings};
use anyhow::{bail, Result};
use serde::{Serialize, Serializer};
use std::fmt;

/// A language users can select and translate into.
///
/// Only obtainable through [`Language::from_code`] or the constants, so
/// holding one means the code is known to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Language {
    code: &'static str,
}

impl Language {
    pub const ENGLISH: Language = Language { code: "en" };
    pub const SPANISH: Language = Language { code: "es" };
    pub const FRENCH: Language = Language { code: "fr" };

    /// Look up a registered language by its code.
    ///
    /// # Example
    /// ```ignore
    /// let chinese = Language::from_code("zh-CN")?;
    /// ```
    pub fn from_code(code: &str) -> Result<Language> {
        match LanguageRegistry::get().get_by_code(code) {
            Some(config) => Ok(Language { code: config.code }),
            None => bail!("Unknown language code: '{}'", code),
        }
    }

    /// Best match for a client locale such as "pt-BR" or "es-ES": the exact
    /// code first, then the primary subtag.
    pub fn from_locale(locale: &str) -> Option<Language> {
        let registry = LanguageRegistry::get();
        let primary = locale.split('-').next().unwrap_or(locale);
        registry
            .get_by_code(locale)
            .or_else(|| registry.get_by_code(primary))
            .map(|config| Language { code: config.code })
    }

    /// Every registered language, in menu order.
    pub fn all() -> Vec<Language> {
        LanguageRegistry::get()
            .list()
            .iter()
            .map(|config| Language { code: config.code })
            .collect()
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    /// # Panics
    /// Panics if the code is missing from the registry, which construction
    /// rules out.
    pub fn config(&self) -> &'static LanguageConfig {
        LanguageRegistry::get()
            .get_by_code(self.code)
            .expect("Language code should always be valid")
    }

    pub fn name(&self) -> &'static str {
        self.config().name
    }

    pub fn native_name(&self) -> &'static str {
        self.config().native_name
    }

    pub fn strings(&self) -> &'static LanguageStrings {
        self.config().strings
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code)
    }
}

impl Serialize for Language {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code)
    }
}

//! Language registry: the fixed set of languages users can pick.
//!
//! The registry is immutable after first access and shared through a
//! `OnceLock`, like any other static table.

use crate::i18n::strings::{
    CHINESE_STRINGS, ENGLISH_STRINGS, FRENCH_STRINGS, GERMAN_STRINGS, ITALIAN_STRINGS,
    PORTUGUESE_STRINGS, SPANISH_STRINGS,
};
use crate::i18n::LanguageStrings;
use std::sync::OnceLock;

/// Metadata for a supported language.
#[derive(Debug, Clone)]
pub struct LanguageConfig {
    /// Code understood by the translation provider (e.g. "en", "zh-CN")
    pub code: &'static str,

    /// English name of the language (e.g. "French")
    pub name: &'static str,

    /// Native name of the language, used in selection menus (e.g. "Français")
    pub native_name: &'static str,

    /// Localized notices shown to users who picked this language
    pub strings: &'static LanguageStrings,
}

pub struct LanguageRegistry {
    languages: Vec<LanguageConfig>,
}

static REGISTRY: OnceLock<LanguageRegistry> = OnceLock::new();

impl LanguageRegistry {
    pub fn get() -> &'static LanguageRegistry {
        REGISTRY.get_or_init(|| LanguageRegistry {
            languages: default_languages(),
        })
    }

    /// Exact, case-sensitive lookup (`"zh-CN"`, not `"zh-cn"`).
    pub fn get_by_code(&self, code: &str) -> Option<&LanguageConfig> {
        self.languages.iter().find(|lang| lang.code == code)
    }

    /// Every registered language, in menu order.
    pub fn list(&self) -> &[LanguageConfig] {
        &self.languages
    }
}

/// Languages offered in the selection menu, in display order.
fn default_languages() -> Vec<LanguageConfig> {
    vec![
        LanguageConfig {
            code: "en",
            name: "English",
            native_name: "English",
            strings: &ENGLISH_STRINGS,
        },
        LanguageConfig {
            code: "pt",
            name: "Portuguese",
            native_name: "Português",
            strings: &PORTUGUESE_STRINGS,
        },
        LanguageConfig {
            code: "es",
            name: "Spanish",
            native_name: "Español",
            strings: &SPANISH_STRINGS,
        },
        LanguageConfig {
            code: "fr",
            name: "French",
            native_name: "Français",
            strings: &FRENCH_STRINGS,
        },
        LanguageConfig {
            code: "de",
            name: "German",
            native_name: "Deutsch",
            strings: &GERMAN_STRINGS,
        },
        LanguageConfig {
            code: "it",
            name: "Italian",
            native_name: "Italiano",
            strings: &ITALIAN_STRINGS,
        },
        LanguageConfig {
            code: "zh-CN",
            name: "Chinese (Simplified)",
            native_name: "中文",
            strings: &CHINESE_STRINGS,
        },
    ]
}

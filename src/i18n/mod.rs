//! Supported languages and localized notices.
//!
//! - `registry`: the fixed set of selectable languages and their metadata
//! - `language`: the validated `Language` handle used everywhere else
//! - `strings`: per-language user-facing notices
//!
//! # Example
//!
//! ```rust,ignore
//! use crate::i18n::Language;
//!
//! let french = Language::from_code("fr")?;
//! let notice = french.strings().translation_failed;
//! ```

mod language;
mod registry;
mod strings;

pub use language::Language;
pub use registry::{LanguageConfig, LanguageRegistry};
pub use strings::LanguageStrings;

/// All localized user-facing notices for a language.
///
/// Strings are plain text; the chat client is responsible for any
/// platform-specific escaping or mention formatting.
#[derive(Debug, Clone)]
pub struct LanguageStrings {
    /// Shown to a user who triggered a translation without picking a language
    pub configure_language: &'static str,

    /// Confirmation after a language selection
    /// Placeholders: {language}
    pub language_set: &'static str,

    /// Selection of a code outside the supported set
    pub language_unsupported: &'static str,

    /// The selection could not be persisted, even after a retry
    pub preference_failed: &'static str,

    /// The translation provider failed
    pub translation_failed: &'static str,

    /// Answer to `/language`, pointing at the language channel
    /// Placeholders: {channel}
    pub language_hint: &'static str,
}

impl LanguageStrings {
    pub fn language_set_for(&self, code: &str) -> String {
        self.language_set.replace("{language}", code)
    }

    pub fn language_hint_for(&self, channel: &str) -> String {
        self.language_hint.replace("{channel}", channel)
    }
}

pub const ENGLISH_STRINGS: LanguageStrings = LanguageStrings {
    configure_language: "❗ Please select your language using the menu above.",
    language_set: "🌍 Language set to `{language}`!",
    language_unsupported: "❌ That language is not available.",
    preference_failed: "❌ Your language could not be saved. Please try again.",
    translation_failed: "⚠️ Translation failed. Please try again later.",
    language_hint: "🌐 Use the menu in {channel} to set your language.",
};

pub const PORTUGUESE_STRINGS: LanguageStrings = LanguageStrings {
    configure_language: "❗ Selecione seu idioma usando o menu acima.",
    language_set: "🌍 Idioma definido como `{language}`!",
    language_unsupported: "❌ Esse idioma não está disponível.",
    preference_failed: "❌ Não foi possível salvar seu idioma. Tente novamente.",
    translation_failed: "⚠️ A tradução falhou. Tente novamente mais tarde.",
    language_hint: "🌐 Use o menu em {channel} para definir seu idioma.",
};

pub const SPANISH_STRINGS: LanguageStrings = LanguageStrings {
    configure_language: "❗ Selecciona tu idioma usando el menú de arriba.",
    language_set: "🌍 ¡Idioma configurado a `{language}`!",
    language_unsupported: "❌ Ese idioma no está disponible.",
    preference_failed: "❌ No se pudo guardar tu idioma. Inténtalo de nuevo.",
    translation_failed: "⚠️ La traducción falló. Inténtalo de nuevo más tarde.",
    language_hint: "🌐 Usa el menú en {channel} para configurar tu idioma.",
};

pub const FRENCH_STRINGS: LanguageStrings = LanguageStrings {
    configure_language: "❗ Veuillez choisir votre langue avec le menu ci-dessus.",
    language_set: "🌍 Langue définie sur `{language}` !",
    language_unsupported: "❌ Cette langue n'est pas disponible.",
    preference_failed: "❌ Impossible d'enregistrer votre langue. Veuillez réessayer.",
    translation_failed: "⚠️ La traduction a échoué. Veuillez réessayer plus tard.",
    language_hint: "🌐 Utilisez le menu dans {channel} pour choisir votre langue.",
};

pub const GERMAN_STRINGS: LanguageStrings = LanguageStrings {
    configure_language: "❗ Bitte wähle deine Sprache im Menü oben.",
    language_set: "🌍 Sprache auf `{language}` gesetzt!",
    language_unsupported: "❌ Diese Sprache ist nicht verfügbar.",
    preference_failed: "❌ Deine Sprache konnte nicht gespeichert werden. Bitte versuche es erneut.",
    translation_failed: "⚠️ Die Übersetzung ist fehlgeschlagen. Bitte versuche es später erneut.",
    language_hint: "🌐 Nutze das Menü in {channel}, um deine Sprache festzulegen.",
};

pub const ITALIAN_STRINGS: LanguageStrings = LanguageStrings {
    configure_language: "❗ Seleziona la tua lingua dal menu qui sopra.",
    language_set: "🌍 Lingua impostata su `{language}`!",
    language_unsupported: "❌ Questa lingua non è disponibile.",
    preference_failed: "❌ Impossibile salvare la tua lingua. Riprova.",
    translation_failed: "⚠️ Traduzione non riuscita. Riprova più tardi.",
    language_hint: "🌐 Usa il menu in {channel} per impostare la tua lingua.",
};

pub const CHINESE_STRINGS: LanguageStrings = LanguageStrings {
    configure_language: "❗ 请使用上方菜单选择你的语言。",
    language_set: "🌍 语言已设置为 `{language}`！",
    language_unsupported: "❌ 该语言不可用。",
    preference_failed: "❌ 无法保存你的语言，请重试。",
    translation_failed: "⚠️ 翻译失败，请稍后再试。",
    language_hint: "🌐 请使用 {channel} 中的菜单设置你的语言。",
};

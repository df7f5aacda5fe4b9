use crate::i18n::Language;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

/// Longest text the public endpoint accepts in one request.
const MAX_TEXT_CHARS: usize = 5000;

/// External translation provider. The source language is always
/// auto-detected.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, target: Language) -> Result<String>;
}

/// Google Translate's keyless web endpoint (`translate_a/single`).
#[derive(Debug, Clone)]
pub struct GoogleTranslator {
    client: reqwest::Client,
    api_url: String,
}

impl GoogleTranslator {
    pub fn new(client: reqwest::Client, api_url: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into(),
        }
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(&self, text: &str, target: Language) -> Result<String> {
        if text.trim().is_empty() {
            bail!("Nothing to translate");
        }
        let length = text.chars().count();
        if length > MAX_TEXT_CHARS {
            bail!(
                "Text too long to translate ({} characters, limit {})",
                length,
                MAX_TEXT_CHARS
            );
        }

        let url = format!("{}/translate_a/single", self.api_url.trim_end_matches('/'));
        debug!("Translating {} characters to {}", length, target);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("client", "gtx"),
                ("sl", "auto"),
                ("tl", target.code()),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await
            .context("Failed to send request to translation API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
            bail!("Translation API error ({}): {}", status, body);
        }

        let body: Value = response
            .json()
            .await
            .context("Failed to parse translation response")?;

        extract_translation(&body).context("Translation response contained no text")
    }
}

/// The response is a nested array whose first element lists translated
/// segments as `[translated, original, ...]`.
fn extract_translation(body: &Value) -> Option<String> {
    let segments = body.get(0)?.as_array()?;
    let text: String = segments
        .iter()
        .filter_map(|segment| segment.get(0)?.as_str())
        .collect();

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{
        matchers::{method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    fn create_translator(api_url: &str) -> GoogleTranslator {
        GoogleTranslator::new(reqwest::Client::new(), api_url)
    }

    // ==================== Response Parsing Tests ====================

    #[test]
    fn test_extract_single_segment() {
        let body = json!([[["Bonjour", "Hello", null, null, 10]], null, "en"]);
        assert_eq!(extract_translation(&body), Some("Bonjour".to_string()));
    }

    #[test]
    fn test_extract_joins_segments() {
        let body = json!([
            [
                ["Hola. ", "Hello. ", null, null, 10],
                ["¿Cómo estás?", "How are you?", null, null, 10]
            ],
            null,
            "en"
        ]);
        assert_eq!(
            extract_translation(&body),
            Some("Hola. ¿Cómo estás?".to_string())
        );
    }

    #[test]
    fn test_extract_unexpected_shape() {
        assert_eq!(extract_translation(&json!({"error": "nope"})), None);
        assert_eq!(extract_translation(&json!([null, null, "en"])), None);
        assert_eq!(extract_translation(&json!([[]])), None);
    }

    // ==================== Integration Tests with Wiremock ====================

    #[tokio::test]
    async fn test_translate_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/translate_a/single"))
            .and(query_param("sl", "auto"))
            .and(query_param("tl", "fr"))
            .and(query_param("q", "Hello"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([[["Bonjour", "Hello", null, null, 10]], null, "en"])),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let translator = create_translator(&mock_server.uri());
        let result = translator.translate("Hello", Language::FRENCH).await;

        assert_eq!(result.unwrap(), "Bonjour");
    }

    #[tokio::test]
    async fn test_translate_uses_registry_code() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(query_param("tl", "zh-CN"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([[["你好", "Hello"]]])),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let translator = create_translator(&format!("{}/", mock_server.uri()));
        let chinese = Language::from_code("zh-CN").unwrap();

        assert_eq!(translator.translate("Hello", chinese).await.unwrap(), "你好");
    }

    #[tokio::test]
    async fn test_translate_api_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).set_body_string("Too Many Requests"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let translator = create_translator(&mock_server.uri());
        let err = translator
            .translate("Hello", Language::SPANISH)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn test_translate_malformed_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>captcha</html>"))
            .mount(&mock_server)
            .await;

        let translator = create_translator(&mock_server.uri());
        let err = translator
            .translate("Hello", Language::SPANISH)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("parse"));
    }

    #[tokio::test]
    async fn test_translate_empty_text_skips_request() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let translator = create_translator(&mock_server.uri());
        assert!(translator.translate("   ", Language::FRENCH).await.is_err());
    }

    #[tokio::test]
    async fn test_translate_too_long_skips_request() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let translator = create_translator(&mock_server.uri());
        let text = "a".repeat(MAX_TEXT_CHARS + 1);
        let err = translator
            .translate(&text, Language::FRENCH)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("too long"));
    }

    #[tokio::test]
    async fn test_translate_connection_refused() {
        let translator = create_translator("http://127.0.0.1:1");
        assert!(translator
            .translate("Hello", Language::FRENCH)
            .await
            .is_err());
    }
}

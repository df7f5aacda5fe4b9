//! Integration tests for the reaction translator
//!
//! These run the relay ingress on an ephemeral port and drive it over HTTP,
//! with the translator and Discord REST API mocked by wiremock.

use reaction_translator::{
    bot::{Bot, BotSettings},
    discord::DiscordClient,
    i18n::Language,
    preferences::PreferenceStore,
    retry::RetryConfig,
    server::{self, AppState},
    statistics::StatisticsStore,
    translator::GoogleTranslator,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::{
    matchers::{body_partial_json, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

const SECRET: &str = "relay-secret";

// ==================== Test Helpers ====================

struct TestApp {
    base_url: String,
    http: reqwest::Client,
    bot: Arc<Bot>,
    dir: TempDir,
}

impl TestApp {
    async fn post_event(&self, event: Value) -> reqwest::Response {
        self.http
            .post(format!("{}/events", self.base_url))
            .header("X-Relay-Secret", SECRET)
            .json(&event)
            .send()
            .await
            .expect("Request should be sent")
    }

    async fn get_json(&self, route: &str) -> (u16, Value) {
        let response = self
            .http
            .get(format!("{}{}", self.base_url, route))
            .send()
            .await
            .expect("Request should be sent");
        let status = response.status().as_u16();
        (status, response.json().await.expect("Body should be JSON"))
    }
}

/// Start the server against the given mock services.
async fn spawn_app(translator_url: &str, discord_url: &str) -> TestApp {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let http = reqwest::Client::new();

    let bot = Arc::new(Bot::new(
        Arc::new(PreferenceStore::open(dir.path().join("languages.json"))),
        Arc::new(StatisticsStore::open(dir.path().join("translation_stats.json"))),
        Arc::new(GoogleTranslator::new(http.clone(), translator_url)),
        Arc::new(
            DiscordClient::new(http.clone(), discord_url, "test-token")
                .with_retry_config(RetryConfig::new(1, Duration::from_millis(10))),
        ),
        BotSettings::default(),
    ));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Listener should have an address");
    let app = server::router(AppState::new(bot.clone(), SECRET));
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    TestApp {
        base_url: format!("http://{}", addr),
        http,
        bot,
        dir,
    }
}

fn reaction_event(user_id: &str) -> Value {
    json!({
        "type": "reaction_added",
        "message": {
            "id": "1001",
            "channel_id": "55",
            "server_id": "77",
            "author": { "id": "bob", "display_name": "Bob" },
            "text": "Hello"
        },
        "user": { "id": user_id },
        "emoji": "🌍"
    })
}

fn language_select_event(user_id: &str, code: &str) -> Value {
    json!({
        "type": "button_pressed",
        "interaction": {
            "id": "int-1",
            "token": "tok",
            "custom_id": "language_select",
            "user": { "id": user_id },
            "server_id": "77",
            "values": [code]
        }
    })
}

async fn mount_translator(server: &MockServer, target: &str, translation: &str) {
    Mock::given(method("GET"))
        .and(path("/translate_a/single"))
        .and(query_param("tl", target))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([[[translation, "Hello", null, null, 10]], null, "en"])),
        )
        .mount(server)
        .await;
}

// ==================== Authentication Tests ====================

#[tokio::test]
async fn test_events_reject_wrong_secret() {
    let translator = MockServer::start().await;
    let discord = MockServer::start().await;
    let app = spawn_app(&translator.uri(), &discord.uri()).await;

    let missing = app
        .http
        .post(format!("{}/events", app.base_url))
        .json(&reaction_event("alice"))
        .send()
        .await
        .unwrap();
    let wrong = app
        .http
        .post(format!("{}/events", app.base_url))
        .header("X-Relay-Secret", "guess")
        .json(&reaction_event("alice"))
        .send()
        .await
        .unwrap();

    assert_eq!(missing.status().as_u16(), 401);
    assert_eq!(wrong.status().as_u16(), 401);
    // Rejected requests never reach the dedup guard
    assert_eq!(app.bot.metrics().report().no_language, 0);
}

#[tokio::test]
async fn test_malformed_event_is_bad_request() {
    let translator = MockServer::start().await;
    let discord = MockServer::start().await;
    let app = spawn_app(&translator.uri(), &discord.uri()).await;

    let response = app.post_event(json!({ "type": "message_deleted" })).await;

    assert_eq!(response.status().as_u16(), 400);
}

// ==================== Workflow Tests ====================

#[tokio::test]
async fn test_select_language_then_translate() {
    let translator = MockServer::start().await;
    let discord = MockServer::start().await;
    mount_translator(&translator, "fr", "Bonjour").await;

    Mock::given(method("POST"))
        .and(path("/interactions/int-1/tok/callback"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&discord)
        .await;
    Mock::given(method("POST"))
        .and(path("/channels/55/messages"))
        .and(body_partial_json(json!({
            "content": "<@alice>",
            "embeds": [{ "description": "Bonjour", "author": { "name": "Bob (fr)" } }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "reply-1" })))
        .expect(1)
        .mount(&discord)
        .await;

    let app = spawn_app(&translator.uri(), &discord.uri()).await;

    let selected: Value = app
        .post_event(language_select_event("alice", "fr"))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(selected, json!({ "outcome": "language_set", "language": "fr" }));

    let translated: Value = app.post_event(reaction_event("alice")).await.json().await.unwrap();
    assert_eq!(
        translated,
        json!({
            "outcome": "dispatched",
            "result": { "status": "success", "language": "fr", "text": "Bonjour" }
        })
    );

    let duplicate: Value = app.post_event(reaction_event("alice")).await.json().await.unwrap();
    assert_eq!(duplicate, json!({ "outcome": "duplicate" }));

    // Both files reflect the events without waiting for the periodic save
    let preferences = PreferenceStore::open(app.dir.path().join("languages.json"));
    assert_eq!(preferences.get("alice"), Some(Language::FRENCH));
    let statistics = StatisticsStore::open(app.dir.path().join("translation_stats.json"));
    assert_eq!(statistics.snapshot("77").unwrap().total, 1);
}

#[tokio::test]
async fn test_reaction_without_language_posts_notice() {
    let translator = MockServer::start().await;
    let discord = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&translator)
        .await;
    Mock::given(method("POST"))
        .and(path("/channels/55/messages"))
        .and(body_partial_json(json!({
            "content": "<@alice> ❗ Please select your language using the menu above."
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "notice-1" })))
        .expect(1)
        .mount(&discord)
        .await;

    let app = spawn_app(&translator.uri(), &discord.uri()).await;

    let outcome: Value = app.post_event(reaction_event("alice")).await.json().await.unwrap();

    assert_eq!(
        outcome,
        json!({ "outcome": "dispatched", "result": { "status": "no_language" } })
    );
}

#[tokio::test]
async fn test_translator_outage_is_reported_to_user() {
    let translator = MockServer::start().await;
    let discord = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&translator)
        .await;
    Mock::given(method("POST"))
        .and(path("/interactions/int-1/tok/callback"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&discord)
        .await;
    Mock::given(method("POST"))
        .and(path("/channels/55/messages"))
        .and(body_partial_json(json!({
            "content": Language::SPANISH.strings().translation_failed
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "notice-2" })))
        .expect(1)
        .mount(&discord)
        .await;

    let app = spawn_app(&translator.uri(), &discord.uri()).await;
    app.post_event(language_select_event("alice", "es")).await;

    let outcome: Value = app.post_event(reaction_event("alice")).await.json().await.unwrap();

    assert_eq!(outcome["result"]["status"], "translation_failed");
    let (status, _) = app.get_json("/stats/77").await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_new_message_gets_reaction() {
    let translator = MockServer::start().await;
    let discord = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/channels/55/messages/1002/reactions/%F0%9F%8C%8D/@me"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&discord)
        .await;

    let app = spawn_app(&translator.uri(), &discord.uri()).await;

    let outcome: Value = app
        .post_event(json!({
            "type": "message_created",
            "message": {
                "id": "1002",
                "channel_id": "55",
                "server_id": "77",
                "author": { "id": "bob" },
                "text": "Good morning"
            }
        }))
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(outcome, json!({ "outcome": "reacted" }));
}

#[tokio::test]
async fn test_language_command_answers_with_menu() {
    let translator = MockServer::start().await;
    let discord = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/interactions/cmd-1/tok/callback"))
        .and(body_partial_json(json!({
            "type": 4,
            "data": {
                "flags": 64,
                "components": [{ "type": 1, "components": [{ "custom_id": "language_select" }] }]
            }
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&discord)
        .await;

    let app = spawn_app(&translator.uri(), &discord.uri()).await;

    let outcome: Value = app
        .post_event(json!({
            "type": "command_invoked",
            "name": "language",
            "interaction": {
                "id": "cmd-1",
                "token": "tok",
                "user": { "id": "alice" },
                "server_id": "77"
            }
        }))
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(
        outcome,
        json!({ "outcome": "command_answered", "command": "language" })
    );
}

// ==================== Stats Endpoint Tests ====================

#[tokio::test]
async fn test_stats_endpoints_and_reset() {
    let translator = MockServer::start().await;
    let discord = MockServer::start().await;
    mount_translator(&translator, "fr", "Bonjour").await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "m" })))
        .mount(&discord)
        .await;

    let app = spawn_app(&translator.uri(), &discord.uri()).await;
    app.bot
        .preferences()
        .set("alice", Language::FRENCH)
        .await
        .unwrap();
    app.post_event(reaction_event("alice")).await;

    let (status, summary) = app.get_json("/stats/77").await;
    assert_eq!(status, 200);
    assert_eq!(
        summary,
        json!({
            "total": 1,
            "unique_users": 1,
            "top_languages": [{ "code": "fr", "count": 1 }]
        })
    );

    let (_, global) = app.get_json("/stats").await;
    assert_eq!(global["total"], 1);

    let (_, metrics) = app.get_json("/metrics").await;
    assert_eq!(metrics["translations"], 1);

    // Reset needs the secret
    let unauthorized = app
        .http
        .post(format!("{}/stats/77/reset", app.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(unauthorized.status().as_u16(), 401);

    let reset: Value = app
        .http
        .post(format!("{}/stats/77/reset", app.base_url))
        .header("X-Relay-Secret", SECRET)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(reset, json!({ "server_id": "77", "reset": true }));

    let (_, after) = app.get_json("/stats/77").await;
    assert_eq!(after["total"], 0);

    let reloaded = StatisticsStore::open(app.dir.path().join("translation_stats.json"));
    assert_eq!(reloaded.snapshot("77").unwrap().total, 0);
}

#[tokio::test]
async fn test_health() {
    let translator = MockServer::start().await;
    let discord = MockServer::start().await;
    let app = spawn_app(&translator.uri(), &discord.uri()).await;

    let (status, body) = app.get_json("/health").await;

    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["preferences"], 0);
}

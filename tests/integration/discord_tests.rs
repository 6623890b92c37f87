use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use diamond_sale_watcher::plugins::notifiers::DiscordNotifier;

use super::*;

async fn mock_discord() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v10/users/@me"))
        .and(header("authorization", "Bot integration-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "42",
            "username": "DiamondBot",
            "discriminator": "0001"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "9001" })))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_startup_through_discord_api() {
    let store = mock_store().await;
    let discord = mock_discord().await;

    let mut config = get_test_config(&store.uri());
    config.discord.api_base = format!("{}/api/v10/", discord.uri());
    let notifier = Arc::new(DiscordNotifier::new(&config.discord).unwrap());
    let watcher = create_test_watcher(&config, notifier, "SALE", StaticRenderer::default());

    let report = watcher.on_ready().await.unwrap();

    assert!(report.announced);
    assert_eq!(report.identity.to_string(), "DiamondBot#0001");
    assert_eq!(report.sales.posted, 2);

    let posts: Vec<_> = discord
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.method.to_string() == "POST")
        .collect();
    // announcement, two banners, missing-image summary
    assert_eq!(posts.len(), 4);
    assert_eq!(posts[0].url.path(), format!("/api/v10/channels/{}/messages", ACTIVITY_CHANNEL));
    let announcement: serde_json::Value = serde_json::from_slice(&posts[0].body).unwrap();
    assert_eq!(announcement["content"], "DiamondBot#0001 is now online!");

    for banner in &posts[1..3] {
        assert_eq!(banner.url.path(), format!("/api/v10/channels/{}/messages", SALES_CHANNEL));
        let body = String::from_utf8_lossy(&banner.body);
        assert!(body.contains("diamond_factory_sale_image.jpg"));
        assert!(body.contains("Diamond Factory Sale:"));
    }
}

#[tokio::test]
async fn test_invalid_token_aborts_startup() {
    let store = mock_store().await;
    let discord = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v10/users/@me"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "401: Unauthorized" })))
        .mount(&discord)
        .await;

    let mut config = get_test_config(&store.uri());
    config.discord.api_base = format!("{}/api/v10/", discord.uri());
    let notifier = Arc::new(DiscordNotifier::new(&config.discord).unwrap());
    let watcher = create_test_watcher(&config, notifier, "SALE", StaticRenderer::default());

    assert!(watcher.on_ready().await.is_err());
    assert!(store.received_requests().await.unwrap().is_empty());
}

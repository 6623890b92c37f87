use std::sync::Arc;
use wiremock::{MockServer, ResponseTemplate};

use diamond_sale_watcher::config::MissingImagePolicy;
use diamond_sale_watcher::models::SALE_IMAGE_FILENAME;

use super::*;

#[tokio::test]
async fn test_sale_scan_posts_banners_in_page_order() {
    let store = mock_store().await;
    let config = get_test_config(&store.uri());
    let notifier = RecordingNotifier::default();
    let watcher = create_test_watcher(&config, Arc::new(notifier.clone()), "UP TO 40% OFF", StaticRenderer::default());

    let report = watcher.sales().check_sales().await;

    assert_eq!(report.pictures, 4);
    assert_eq!(report.posted, 2);
    assert_eq!(report.skipped_menu, 1);
    assert_eq!(report.missing_image, 1);

    let sent = notifier.sent_to(SALES_CHANNEL);
    // two banners plus the aggregated missing-image notice
    assert_eq!(sent.len(), 3);
    for message in &sent[..2] {
        assert_eq!(message.content, "**Diamond Factory Sale:**\nUP TO 40% OFF");
        let attachment = message.attachment.as_ref().unwrap();
        assert_eq!(attachment.filename, SALE_IMAGE_FILENAME);
        assert_eq!(attachment.bytes, png_bytes());
    }
    assert_eq!(sent[2].content, "Image element not found within 1 'picture' tag(s).");
}

#[tokio::test]
async fn test_menu_collection_images_are_never_fetched() {
    let store = mock_store().await;
    let config = get_test_config(&store.uri());
    let notifier = RecordingNotifier::default();
    let watcher = create_test_watcher(&config, Arc::new(notifier), "", StaticRenderer::default());

    watcher.sales().check_sales().await;

    let requests = store.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| !r.url.path().contains("menu_collection")));
}

#[tokio::test]
async fn test_blank_banner_is_posted_without_caption() {
    let store = mock_store().await;
    let mut config = get_test_config(&store.uri());
    config.sales.missing_image = MissingImagePolicy::Off;
    let notifier = RecordingNotifier::default();
    let watcher = create_test_watcher(&config, Arc::new(notifier.clone()), "", StaticRenderer::default());

    watcher.sales().check_sales().await;

    let sent = notifier.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|m| m.content.is_empty() && m.attachment.is_some()));
}

#[tokio::test]
async fn test_unreachable_sale_page_reports_error() {
    let store = MockServer::start().await;
    serve(&store, "/sale", ResponseTemplate::new(503)).await;
    let config = get_test_config(&store.uri());
    let notifier = RecordingNotifier::default();
    let watcher = create_test_watcher(&config, Arc::new(notifier.clone()), "", StaticRenderer::default());

    let report = watcher.sales().check_sales().await;

    assert!(report.error.is_some());
    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].channel_id, SALES_CHANNEL);
    assert!(sent[0].content.starts_with("Error checking Diamonds Factory sales:"));
}

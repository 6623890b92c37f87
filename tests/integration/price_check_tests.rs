use std::sync::Arc;

use diamond_sale_watcher::models::PriceQuote;
use diamond_sale_watcher::AppError;

use super::*;

const ITEM: &str = "https://www.diamondsfactory.ca/engagement-rings/oval-solitaire";

#[tokio::test]
async fn test_price_check_sends_formatted_quote() {
    let config = get_test_config("https://www.diamondsfactory.ca");
    let notifier = RecordingNotifier::default();
    let watcher = create_test_watcher(
        &config,
        Arc::new(notifier.clone()),
        "",
        StaticRenderer::default().with_page(ITEM, PRICE_POPUP),
    );

    let quote = watcher.prices().check_item_price(ITEM).await.unwrap();

    assert_eq!(
        quote,
        PriceQuote {
            metal_type: "18K Yellow Gold".to_string(),
            metal_price: "$780".to_string(),
            stone_size: "0.75".to_string(),
            stone_shape: "Oval".to_string(),
            stone_price: "$2,150".to_string(),
            total_price: "2,930".to_string(),
        }
    );

    let sent = notifier.sent_to(SALES_CHANNEL);
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0].content,
        "18K Yellow Gold: \t\t\t\t **  $780**\n0.75ct Oval Diamond: \t **$2,150**\n------------------------------------\nTotal: \t\t\t\t\t\t\t **CAD 2,930**"
    );
}

#[tokio::test]
async fn test_missing_popup_times_out_silently() {
    let config = get_test_config("https://www.diamondsfactory.ca");
    let notifier = RecordingNotifier::default();
    let watcher = create_test_watcher(&config, Arc::new(notifier.clone()), "", StaticRenderer::default());

    let err = watcher.prices().check_item_price(ITEM).await.unwrap_err();
    assert!(matches!(err, AppError::ElementTimeout { ref selector, .. } if selector == "#pricepopupCont"));

    let report = watcher.prices().check_all(&[ITEM.to_string()]).await;
    assert_eq!(report.failures.len(), 1);
    assert!(notifier.sent().is_empty());
}

#[tokio::test]
async fn test_incomplete_popup_sends_nothing() {
    let config = get_test_config("https://www.diamondsfactory.ca");
    let notifier = RecordingNotifier::default();
    let html = PRICE_POPUP.replace("metal-price", "metal-cost");
    let watcher = create_test_watcher(
        &config,
        Arc::new(notifier.clone()),
        "",
        StaticRenderer::default().with_page(ITEM, &html),
    );

    let err = watcher.prices().check_item_price(ITEM).await.unwrap_err();

    assert_eq!(err.kind(), "field_missing");
    assert!(notifier.sent().is_empty());
}

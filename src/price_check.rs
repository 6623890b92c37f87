use scraper::ElementRef;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::browser::PageRenderer;
use crate::config::{AppConfig, PriceCheckConfig, PriceSelectors};
use crate::models::{NotificationMessage, PriceQuote};
use crate::page::{find_in, text_content, Lookup, PageDocument};
use crate::plugins::traits::Notifier;
use crate::utils::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceCheckFailure {
    pub url: String,
    pub kind: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceCheckReport {
    pub checked: usize,
    pub sent: usize,
    pub failures: Vec<PriceCheckFailure>,
}

/// Renders product pages in a browser and posts the price breakdown.
pub struct PriceChecker {
    config: PriceCheckConfig,
    channel_id: u64,
    renderer: Arc<dyn PageRenderer>,
    notifier: Arc<dyn Notifier>,
}

impl PriceChecker {
    pub fn new(config: &AppConfig, renderer: Arc<dyn PageRenderer>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            config: config.price_check.clone(),
            channel_id: config.discord.sales_channel_id,
            renderer,
            notifier,
        }
    }

    fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.config.wait_timeout_secs)
    }

    /// Render, parse, format and send one item. Nothing is sent unless every field was found.
    pub async fn check_item_price(&self, item_url: &str) -> Result<PriceQuote> {
        let selectors = &self.config.selectors;

        let html = self
            .renderer
            .render(item_url, &selectors.marker, self.wait_timeout())
            .await?;
        let quote = parse_price_quote(&html, selectors)?;

        let message = NotificationMessage::text(self.channel_id, quote.to_message());
        self.notifier.send(&message).await?;

        info!(url = item_url, total = %quote.total_price, "Price check sent");
        Ok(quote)
    }

    /// Checks each item in turn. A failed item is logged and does not stop the rest.
    pub async fn check_all(&self, item_urls: &[String]) -> PriceCheckReport {
        let mut report = PriceCheckReport::default();

        for url in item_urls {
            report.checked += 1;

            match self.check_item_price(url).await {
                Ok(_) => report.sent += 1,
                Err(e) => {
                    error!(url = %url, kind = e.kind(), error = ?e, "Error checking item price");
                    if self.config.report_failures {
                        self.report_failure(url, &e).await;
                    }
                    report.failures.push(PriceCheckFailure {
                        url: url.clone(),
                        kind: e.kind(),
                        message: e.to_string(),
                    });
                }
            }
        }

        report
    }

    async fn report_failure(&self, url: &str, err: &AppError) {
        let notice = NotificationMessage::text(self.channel_id, format!("Price check failed for {}: {}", url, err));
        if let Err(e) = self.notifier.send(&notice).await {
            error!(url, error = %e, "Failed to report price check failure");
        }
    }
}

fn require<'a>(node: Option<ElementRef<'a>>, field: &str, selector: &str) -> Result<ElementRef<'a>> {
    node.ok_or_else(|| AppError::FieldMissing {
        field: field.to_string(),
        selector: selector.to_string(),
    })
}

/// Pulls the quote out of rendered product HTML. Any missing section or field is an error.
pub fn parse_price_quote(html: &str, selectors: &PriceSelectors) -> Result<PriceQuote> {
    let doc = PageDocument::parse_str(html);

    let metal = require(doc.find(Lookup::Css(&selectors.metal_section)), "metal section", &selectors.metal_section)?;
    let diamond = require(
        doc.find(Lookup::Css(&selectors.diamond_section)),
        "diamond section",
        &selectors.diamond_section,
    )?;
    let total = require(doc.find(Lookup::Css(&selectors.total_section)), "total section", &selectors.total_section)?;

    let metal_price = require(find_in(metal, Lookup::Css(&selectors.metal_price)), "metal price", &selectors.metal_price)?;
    let metal_type = require(find_in(metal, Lookup::Css(&selectors.metal_type)), "metal type", &selectors.metal_type)?;
    let stone_price = require(find_in(diamond, Lookup::Css(&selectors.stone_price)), "stone price", &selectors.stone_price)?;
    let stone_size = require(find_in(diamond, Lookup::Css(&selectors.stone_size)), "stone size", &selectors.stone_size)?;
    let stone_shape = require(find_in(diamond, Lookup::Css(&selectors.stone_shape)), "stone shape", &selectors.stone_shape)?;

    Ok(PriceQuote {
        metal_type: text_content(metal_type),
        metal_price: text_content(metal_price),
        stone_size: text_content(stone_size),
        stone_shape: text_content(stone_shape),
        stone_price: text_content(stone_price),
        total_price: text_content(total),
    })
}

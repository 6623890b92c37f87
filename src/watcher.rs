use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use crate::browser::PageRenderer;
use crate::config::AppConfig;
use crate::fetcher::Fetcher;
use crate::models::NotificationMessage;
use crate::ocr::{ImageTextExtractor, OcrEngine};
use crate::plugins::traits::{BotIdentity, Notifier};
use crate::price_check::{PriceCheckReport, PriceChecker};
use crate::sales::{SaleScanReport, SaleScanner};
use crate::utils::error::Result;

#[derive(Debug, Clone)]
pub struct StartupReport {
    pub identity: BotIdentity,
    pub started_at: DateTime<Utc>,
    pub announced: bool,
    pub sales: SaleScanReport,
    pub prices: PriceCheckReport,
}

/// Wires the sale scanner and price checker to one notifier and runs them on connect.
pub struct Watcher {
    activity_channel_id: u64,
    item_urls: Vec<String>,
    notifier: Arc<dyn Notifier>,
    sales: SaleScanner,
    prices: PriceChecker,
}

impl Watcher {
    pub fn new(
        config: &AppConfig,
        notifier: Arc<dyn Notifier>,
        ocr: Arc<dyn OcrEngine>,
        renderer: Arc<dyn PageRenderer>,
    ) -> Result<Self> {
        let fetcher = Fetcher::new(&config.site.user_agent)?;
        let extractor = ImageTextExtractor::new(fetcher.clone(), ocr);

        Ok(Self {
            activity_channel_id: config.discord.activity_channel_id,
            item_urls: config.price_check.item_urls.clone(),
            sales: SaleScanner::new(config, fetcher, extractor, Arc::clone(&notifier)),
            prices: PriceChecker::new(config, renderer, Arc::clone(&notifier)),
            notifier,
        })
    }

    pub fn sales(&self) -> &SaleScanner {
        &self.sales
    }

    pub fn prices(&self) -> &PriceChecker {
        &self.prices
    }

    pub async fn announce_online(&self, identity: &BotIdentity) -> Result<()> {
        let message = NotificationMessage::text(self.activity_channel_id, format!("{} is now online!", identity));
        self.notifier.send(&message).await?;
        Ok(())
    }

    /// Runs once the notifier is reachable: announce, scan the sale page, then check every
    /// configured item. Only a failed identity lookup aborts the sequence.
    pub async fn on_ready(&self) -> Result<StartupReport> {
        let identity = self.notifier.identity().await?;
        let started_at = Utc::now();
        info!(user = %identity, notifier = self.notifier.name(), "Bot is online");

        let announced = match self.announce_online(&identity).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Failed to announce startup");
                false
            }
        };

        let sales = self.sales.check_sales().await;
        let prices = self.prices.check_all(&self.item_urls).await;

        info!(
            posted = sales.posted,
            prices_sent = prices.sent,
            price_failures = prices.failures.len(),
            "Startup checks complete"
        );

        Ok(StartupReport {
            identity,
            started_at,
            announced,
            sales,
            prices,
        })
    }
}

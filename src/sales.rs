use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::{AppConfig, MissingImagePolicy, SiteConfig};
use crate::fetcher::Fetcher;
use crate::models::{
    sale_caption, Attachment, NotificationMessage, SaleImage, SalePicture, SALE_IMAGE_FILENAME,
};
use crate::ocr::ImageTextExtractor;
use crate::page::{find_in, Lookup, PageDocument};
use crate::plugins::traits::{DeliveryReceipt, Notifier};
use crate::utils::error::Result;

pub const MISSING_IMAGE_NOTICE: &str = "Image element not found within the 'picture' tag.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaleScanReport {
    pub pictures: usize,
    pub posted: usize,
    pub skipped_menu: usize,
    pub missing_image: usize,
    pub failed: usize,
    /// Set when the scan as a whole could not run, e.g. the sale page did not load.
    pub error: Option<String>,
}

/// Scans the store's sale page and posts every sale banner with its OCR'd text.
pub struct SaleScanner {
    site: SiteConfig,
    missing_image: MissingImagePolicy,
    channel_id: u64,
    fetcher: Fetcher,
    extractor: ImageTextExtractor,
    notifier: Arc<dyn Notifier>,
}

impl SaleScanner {
    pub fn new(
        config: &AppConfig,
        fetcher: Fetcher,
        extractor: ImageTextExtractor,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            site: config.site.clone(),
            missing_image: config.sales.missing_image,
            channel_id: config.discord.sales_channel_id,
            fetcher,
            extractor,
            notifier,
        }
    }

    /// Never fails: a scan that cannot run is reported to the sales channel instead.
    pub async fn check_sales(&self) -> SaleScanReport {
        let mut report = SaleScanReport::default();

        if let Err(e) = self.scan(&mut report).await {
            error!(kind = e.kind(), error = ?e, "Error checking sales");
            report.error = Some(e.to_string());

            let notice = format!("Error checking Diamonds Factory sales: {}", e);
            if let Err(send_err) = self.send_notice(notice).await {
                error!(error = %send_err, "Failed to report sale scan error");
            }
        }

        info!(
            pictures = report.pictures,
            posted = report.posted,
            skipped_menu = report.skipped_menu,
            missing_image = report.missing_image,
            failed = report.failed,
            "Sale scan finished"
        );
        report
    }

    async fn scan(&self, report: &mut SaleScanReport) -> Result<()> {
        let page = self.fetcher.fetch(&self.site.sale_page_url()).await?;
        let pictures = sale_pictures(&page, &self.site);
        report.pictures = pictures.len();

        for picture in pictures {
            match picture {
                SalePicture::MissingImage => {
                    report.missing_image += 1;
                    debug!("Picture without img element");
                    if self.missing_image == MissingImagePolicy::PerPicture {
                        self.notice_or_log(MISSING_IMAGE_NOTICE.to_string()).await;
                    }
                }
                SalePicture::MissingSource => {
                    report.failed += 1;
                    warn!("Image element without src attribute");
                }
                SalePicture::Image(image) if !image.is_eligible() => {
                    report.skipped_menu += 1;
                    debug!(url = %image.url, "Skipping menu collection image");
                }
                SalePicture::Image(image) => match self.post_sale_image(&image).await {
                    Ok(_) => report.posted += 1,
                    Err(e) => {
                        report.failed += 1;
                        warn!(url = %image.url, kind = e.kind(), error = %e, "Error processing image");
                    }
                },
            }
        }

        if self.missing_image == MissingImagePolicy::Aggregate && report.missing_image > 0 {
            let notice = format!(
                "Image element not found within {} 'picture' tag(s).",
                report.missing_image
            );
            self.notice_or_log(notice).await;
        }

        Ok(())
    }

    /// Downloads the banner, reads it, and posts it. The image is attached even when OCR found nothing.
    pub async fn post_sale_image(&self, image: &SaleImage) -> Result<DeliveryReceipt> {
        let bytes = self.fetcher.fetch(&image.url).await?;
        let text = self.extractor.extract_text(&image.url).await;

        let message = NotificationMessage::text(self.channel_id, sale_caption(&text))
            .with_attachment(Attachment::new(SALE_IMAGE_FILENAME, bytes));
        self.notifier.send(&message).await
    }

    async fn send_notice(&self, content: String) -> Result<DeliveryReceipt> {
        self.notifier
            .send(&NotificationMessage::text(self.channel_id, content))
            .await
    }

    async fn notice_or_log(&self, content: String) {
        if let Err(e) = self.send_notice(content).await {
            warn!(error = %e, "Failed to send sale scan notice");
        }
    }
}

/// Classifies every `picture` element on the sale page.
pub fn sale_pictures(page: &[u8], site: &SiteConfig) -> Vec<SalePicture> {
    let doc = PageDocument::parse(page);

    doc.find_all("picture")
        .into_iter()
        .map(|picture| match find_in(picture, Lookup::Tag("img")) {
            None => SalePicture::MissingImage,
            Some(img) => match img.value().attr("src") {
                None => SalePicture::MissingSource,
                Some(src) => SalePicture::Image(SaleImage::from_src(&site.base_url, src, &site.menu_marker)),
            },
        })
        .collect()
}

// Integration tests for Diamond Sale Watcher
// These tests drive the public API against mock HTTP servers

pub mod discord_tests;
pub mod price_check_tests;
pub mod sale_scan_tests;

use async_trait::async_trait;
use image::{DynamicImage, ImageOutputFormat};
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use diamond_sale_watcher::{
    browser::PageRenderer,
    config::{DiscordConfig, LoggingConfig, OcrConfig, PriceCheckConfig, SalesConfig, SiteConfig},
    models::NotificationMessage,
    ocr::OcrEngine,
    plugins::{BotIdentity, DeliveryReceipt, Notifier},
    AppConfig, AppError, Result, Watcher,
};

pub const SALES_CHANNEL: u64 = 334455;
pub const ACTIVITY_CHANNEL: u64 = 667788;

/// Test configuration for integration tests
pub fn get_test_config(site_url: &str) -> AppConfig {
    AppConfig {
        discord: DiscordConfig {
            token: "integration-token".to_string(),
            api_base: "https://discord.com/api/v10/".to_string(),
            sales_channel_id: SALES_CHANNEL,
            activity_channel_id: ACTIVITY_CHANNEL,
        },
        site: SiteConfig {
            base_url: format!("{}/", site_url.trim_end_matches('/')),
            sale_path: "sale".to_string(),
            menu_marker: "menu_collection".to_string(),
            user_agent: "DiamondSaleWatcher-Test/1.0".to_string(),
        },
        ocr: OcrConfig::default(),
        price_check: PriceCheckConfig::default(),
        sales: SalesConfig::default(),
        logging: LoggingConfig::default(),
    }
}

#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<NotificationMessage>>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<NotificationMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, channel_id: u64) -> Vec<NotificationMessage> {
        self.sent().into_iter().filter(|m| m.channel_id == channel_id).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    async fn identity(&self) -> Result<BotIdentity> {
        Ok(BotIdentity {
            id: "42".to_string(),
            username: "DiamondBot".to_string(),
            discriminator: Some("0001".to_string()),
        })
    }

    async fn send(&self, message: &NotificationMessage) -> Result<DeliveryReceipt> {
        let mut sent = self.sent.lock().unwrap();
        sent.push(message.clone());
        Ok(DeliveryReceipt {
            channel_id: message.channel_id,
            message_id: sent.len().to_string(),
        })
    }
}

/// Reads the same text from every image.
pub struct ScriptedOcr {
    pub text: String,
}

impl ScriptedOcr {
    pub fn reading(text: &str) -> Arc<Self> {
        Arc::new(Self { text: text.to_string() })
    }
}

#[async_trait]
impl OcrEngine for ScriptedOcr {
    async fn recognize(&self, _image: &DynamicImage) -> Result<String> {
        Ok(self.text.clone())
    }
}

/// Serves canned HTML per URL; unknown URLs time out on the marker.
#[derive(Default)]
pub struct StaticRenderer {
    pages: Vec<(String, String)>,
}

impl StaticRenderer {
    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.push((url.to_string(), html.to_string()));
        self
    }
}

#[async_trait]
impl PageRenderer for StaticRenderer {
    async fn render(&self, url: &str, wait_for: &str, timeout: Duration) -> Result<String> {
        self.pages
            .iter()
            .find(|(page_url, _)| page_url == url)
            .map(|(_, html)| html.clone())
            .ok_or_else(|| AppError::ElementTimeout {
                selector: wait_for.to_string(),
                timeout_secs: timeout.as_secs(),
                reason: "element not found".to_string(),
            })
    }
}

pub fn png_bytes() -> Vec<u8> {
    let mut buffer = Vec::new();
    DynamicImage::new_rgb8(16, 16)
        .write_to(&mut Cursor::new(&mut buffer), ImageOutputFormat::Png)
        .unwrap();
    buffer
}

pub const SALE_PAGE: &str = r#"
    <html><body>
        <nav>
            <picture><img src="media/menu_collection/rings.jpg" alt="Rings"></picture>
        </nav>
        <main>
            <picture><img src="media/banners/holiday-sale.png" alt="Holiday"></picture>
            <picture><source srcset="media/banners/hero.webp"></picture>
            <picture><img src="media/banners/earrings-sale.png" alt="Earrings"></picture>
        </main>
    </body></html>
"#;

/// A store whose sale page is `SALE_PAGE`, with both banner images served.
pub async fn mock_store() -> MockServer {
    let server = MockServer::start().await;
    serve(&server, "/sale", ResponseTemplate::new(200).set_body_string(SALE_PAGE)).await;
    serve(&server, "/media/banners/holiday-sale.png", ResponseTemplate::new(200).set_body_bytes(png_bytes())).await;
    serve(&server, "/media/banners/earrings-sale.png", ResponseTemplate::new(200).set_body_bytes(png_bytes())).await;
    server
}

pub async fn serve(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

pub const PRICE_POPUP: &str = r#"
    <html><body>
        <div id="pricepopupCont">
            <div class="popup-metal">
                <span class="metal-name">18K Yellow Gold</span>
                <span class="metal-price">$780</span>
            </div>
            <div class="popup-diamond">
                <span class="diamond-carat">0.75</span>
                <span class="diamond-shape">Oval</span>
                <span class="diamond-price">$2,150</span>
            </div>
            <div class="popup-total">2,930</div>
        </div>
    </body></html>
"#;

pub fn create_test_watcher(
    config: &AppConfig,
    notifier: Arc<dyn Notifier>,
    ocr_text: &str,
    renderer: StaticRenderer,
) -> Watcher {
    Watcher::new(config, notifier, ScriptedOcr::reading(ocr_text), Arc::new(renderer)).unwrap()
}

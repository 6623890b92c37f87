use config::{Config, ConfigError, Environment, File};
use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::Path;
use url::Url;

pub const DEFAULT_CONFIG_FILE: &str = "config/default";
pub const ENV_PREFIX: &str = "WATCHER";
pub const DEFAULT_DISCORD_API: &str = "https://discord.com/api/v10/";

/// Variable names the bot has always been deployed with, mapped onto config keys.
const LEGACY_ENV: &[(&str, &str)] = &[
    ("DISCORD_TOKEN", "discord.token"),
    ("WEBSITE_URL", "site.base_url"),
    ("DIAMONDS_FACTORY_CHANNEL_ID", "discord.sales_channel_id"),
    ("BOT_ACTIVITY_CHANNEL_ID", "discord.activity_channel_id"),
    ("TESSERACT_LOCATION", "ocr.tesseract_path"),
];
const LEGACY_ITEM_URLS: &str = "PRICE_CHECK_URLS";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub discord: DiscordConfig,
    pub site: SiteConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub price_check: PriceCheckConfig,
    #[serde(default)]
    pub sales: SalesConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    pub token: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    pub sales_channel_id: u64,
    pub activity_channel_id: u64,
}

impl fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("api_base", &self.api_base)
            .field("sales_channel_id", &self.sales_channel_id)
            .field("activity_channel_id", &self.activity_channel_id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Store root, including the trailing slash. Relative image paths are appended to it.
    pub base_url: String,
    #[serde(default = "default_sale_path")]
    pub sale_path: String,
    #[serde(default = "default_menu_marker")]
    pub menu_marker: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl SiteConfig {
    pub fn sale_page_url(&self) -> String {
        format!("{}{}", self.base_url, self.sale_path)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    #[serde(default = "default_tesseract_path")]
    pub tesseract_path: String,
    #[serde(default)]
    pub language: Option<String>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tesseract_path: default_tesseract_path(),
            language: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceCheckConfig {
    #[serde(default)]
    pub item_urls: Vec<String>,
    #[serde(default = "default_wait_timeout_secs")]
    pub wait_timeout_secs: u64,
    #[serde(default)]
    pub chrome_path: Option<String>,
    /// Post a one-line notice to the sales channel when an item check fails.
    #[serde(default)]
    pub report_failures: bool,
    #[serde(default)]
    pub selectors: PriceSelectors,
}

impl Default for PriceCheckConfig {
    fn default() -> Self {
        Self {
            item_urls: Vec::new(),
            wait_timeout_secs: default_wait_timeout_secs(),
            chrome_path: None,
            report_failures: false,
            selectors: PriceSelectors::default(),
        }
    }
}

/// CSS selectors for the price popup on a product page.
///
/// Leaf selectors are matched inside their section, the total is the text of
/// its whole section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PriceSelectors {
    pub marker: String,
    pub metal_section: String,
    pub metal_type: String,
    pub metal_price: String,
    pub diamond_section: String,
    pub stone_size: String,
    pub stone_shape: String,
    pub stone_price: String,
    pub total_section: String,
}

impl Default for PriceSelectors {
    fn default() -> Self {
        Self {
            marker: "#pricepopupCont".to_string(),
            metal_section: ".popup-metal".to_string(),
            metal_type: ".metal-name".to_string(),
            metal_price: ".metal-price".to_string(),
            diamond_section: ".popup-diamond".to_string(),
            stone_size: ".diamond-carat".to_string(),
            stone_shape: ".diamond-shape".to_string(),
            stone_price: ".diamond-price".to_string(),
            total_section: ".popup-total".to_string(),
        }
    }
}

impl PriceSelectors {
    pub fn entries(&self) -> [(&'static str, &str); 9] {
        [
            ("marker", &self.marker),
            ("metal_section", &self.metal_section),
            ("metal_type", &self.metal_type),
            ("metal_price", &self.metal_price),
            ("diamond_section", &self.diamond_section),
            ("stone_size", &self.stone_size),
            ("stone_shape", &self.stone_shape),
            ("stone_price", &self.stone_price),
            ("total_section", &self.total_section),
        ]
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MissingImagePolicy {
    /// One diagnostic message per `picture` without an `img`.
    PerPicture,
    /// A single summary message per scan.
    #[default]
    Aggregate,
    Off,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SalesConfig {
    #[serde(default)]
    pub missing_image: MissingImagePolicy,
    /// Six-field cron expression. Unset means a single scan at startup.
    #[serde(default)]
    pub schedule: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_filter")]
    pub filter: String,
    #[serde(default)]
    pub directory: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            directory: None,
        }
    }
}

fn default_api_base() -> String {
    DEFAULT_DISCORD_API.to_string()
}

fn default_sale_path() -> String {
    "sale".to_string()
}

fn default_menu_marker() -> String {
    "menu_collection".to_string()
}

fn default_user_agent() -> String {
    "DiamondSaleWatcher/0.1".to_string()
}

fn default_tesseract_path() -> String {
    "tesseract".to_string()
}

fn default_wait_timeout_secs() -> u64 {
    10
}

fn default_log_filter() -> String {
    "diamond_sale_watcher=info".to_string()
}

impl AppConfig {
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, |key| env::var(key).ok())
    }

    /// Builds the configuration from the file at `path` (or `config/default`
    /// when present), `WATCHER__*` variables, and the legacy variable names
    /// resolved through `lookup`.
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Config::builder();

        builder = match path {
            Some(path) => builder.add_source(File::from(path)),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("price_check.item_urls"),
        );

        for &(var, key) in LEGACY_ENV {
            builder = builder.set_override_option(key, lookup(var))?;
        }

        if let Some(urls) = lookup(LEGACY_ITEM_URLS) {
            builder = builder.set_override("price_check.item_urls", split_list(&urls))?;
        }

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        // Discord
        if self.discord.token.trim().is_empty() {
            return Err(ConfigError::Message("Discord token must not be empty".into()));
        }

        if self.discord.sales_channel_id == 0 || self.discord.activity_channel_id == 0 {
            return Err(ConfigError::Message("Discord channel ids must be greater than 0".into()));
        }

        if Url::parse(&self.discord.api_base).is_err() || !self.discord.api_base.ends_with('/') {
            return Err(ConfigError::Message(
                "Discord api_base must be an absolute URL ending with '/'".into(),
            ));
        }

        // Site
        if Url::parse(&self.site.base_url).is_err() {
            return Err(ConfigError::Message("Invalid site base_url format".into()));
        }

        if !self.site.base_url.ends_with('/') {
            return Err(ConfigError::Message("Site base_url must end with '/'".into()));
        }

        if self.site.menu_marker.is_empty() {
            return Err(ConfigError::Message("Site menu_marker must not be empty".into()));
        }

        // OCR
        if self.ocr.tesseract_path.trim().is_empty() {
            return Err(ConfigError::Message("OCR tesseract_path must not be empty".into()));
        }

        // Price check
        if self.price_check.wait_timeout_secs == 0 {
            return Err(ConfigError::Message("Price check wait_timeout_secs must be greater than 0".into()));
        }

        for url in &self.price_check.item_urls {
            if Url::parse(url).is_err() {
                return Err(ConfigError::Message(format!("Invalid price check item URL: {}", url)));
            }
        }

        for (name, selector) in self.price_check.selectors.entries() {
            if Selector::parse(selector).is_err() {
                return Err(ConfigError::Message(format!(
                    "Invalid CSS selector for price_check.selectors.{}: {}",
                    name, selector
                )));
            }
        }

        // Sales schedule
        if let Some(schedule) = &self.sales.schedule {
            if !self.is_valid_cron(schedule) {
                return Err(ConfigError::Message("Invalid cron expression in sales.schedule".into()));
            }
        }

        Ok(())
    }

    fn is_valid_cron(&self, cron_expr: &str) -> bool {
        // sec min hour day-of-month month day-of-week
        let parts: Vec<&str> = cron_expr.split_whitespace().collect();
        if parts.len() != 6 {
            return false;
        }

        parts.iter().all(|part| {
            part.chars()
                .all(|c| c.is_ascii_digit() || matches!(c, '*' | '-' | ',' | '/' | '?'))
        })
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

use serde::{Deserialize, Serialize};
use url::Url;

pub const SALE_CAPTION_HEADER: &str = "**Diamond Factory Sale:**\n";
pub const SALE_IMAGE_FILENAME: &str = "diamond_factory_sale_image.jpg";
/// Discord rejects message content longer than this many characters.
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// OCR output for a sale banner. `None` when download, decode or recognition failed.
pub type ExtractedSaleText = Option<String>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SaleImage {
    pub url: String,
    pub is_menu_collection: bool,
}

impl SaleImage {
    pub fn from_src(base_url: &str, src: &str, menu_marker: &str) -> Self {
        Self {
            url: resolve_image_url(base_url, src),
            is_menu_collection: src.contains(menu_marker),
        }
    }

    /// Menu collection tiles are navigation art, not sale banners.
    pub fn is_eligible(&self) -> bool {
        !self.is_menu_collection
    }
}

/// What a single `picture` element on the sale page yielded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SalePicture {
    MissingImage,
    MissingSource,
    Image(SaleImage),
}

/// Appends a relative `src` to the site root; absolute and protocol-relative
/// sources are kept pointing at their own host.
pub fn resolve_image_url(base_url: &str, src: &str) -> String {
    if let Ok(url) = Url::parse(src) {
        if matches!(url.scheme(), "http" | "https") {
            return src.to_string();
        }
    }

    if let Some(rest) = src.strip_prefix("//") {
        let scheme = Url::parse(base_url)
            .map(|url| url.scheme().to_string())
            .unwrap_or_else(|_| "https".to_string());
        return format!("{}://{}", scheme, rest);
    }

    format!("{}{}", base_url, src)
}

/// Header plus OCR text, cut to `MAX_MESSAGE_CHARS` so a wordy banner still posts.
pub fn sale_caption(text: &ExtractedSaleText) -> String {
    match text {
        Some(text) if !text.is_empty() => {
            let room = MAX_MESSAGE_CHARS - SALE_CAPTION_HEADER.chars().count();
            let mut caption = String::from(SALE_CAPTION_HEADER);
            caption.extend(text.chars().take(room));
            caption
        }
        _ => String::new(),
    }
}

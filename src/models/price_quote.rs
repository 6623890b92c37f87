use serde::{Deserialize, Serialize};
use std::fmt;

const SEPARATOR_WIDTH: usize = 36;

/// Prices read off a product page's price popup. Every field is the trimmed
/// text of its node; nothing is parsed into numbers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PriceQuote {
    pub metal_type: String,
    pub metal_price: String,
    pub stone_size: String,
    pub stone_shape: String,
    pub stone_price: String,
    pub total_price: String,
}

impl PriceQuote {
    pub fn to_message(&self) -> String {
        format!(
            "{}: \t\t\t\t **  {}**\n{}ct {} Diamond: \t **{}**\n{}\nTotal: \t\t\t\t\t\t\t **CAD {}**",
            self.metal_type,
            self.metal_price,
            self.stone_size,
            self.stone_shape,
            self.stone_price,
            "-".repeat(SEPARATOR_WIDTH),
            self.total_price,
        )
    }
}

impl fmt::Display for PriceQuote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_message())
    }
}

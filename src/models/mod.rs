pub mod notification;
pub mod price_quote;
pub mod sale_image;

// Re-exports for convenience
pub use notification::*;
pub use price_quote::*;
pub use sale_image::*;

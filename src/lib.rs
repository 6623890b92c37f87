pub mod browser;
pub mod config;
pub mod fetcher;
pub mod models;
pub mod ocr;
pub mod page;
pub mod plugins;
pub mod price_check;
pub mod sales;
pub mod scheduler;
pub mod utils;
pub mod watcher;


// Re-export commonly used types
pub use config::AppConfig;
pub use utils::error::{AppError, Result};
pub use watcher::{StartupReport, Watcher};

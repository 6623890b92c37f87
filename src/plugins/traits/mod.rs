pub mod notifier;

pub use notifier::{BotIdentity, DeliveryReceipt, Notifier};

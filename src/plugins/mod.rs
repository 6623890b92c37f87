pub mod notifiers;
pub mod traits;

pub use traits::{BotIdentity, DeliveryReceipt, Notifier};

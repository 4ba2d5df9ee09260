pub mod notify;

pub use notify::{parse_recipient, TelegramNotifier};

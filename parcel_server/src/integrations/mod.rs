pub mod event_log;
pub mod telegram;

pub use telegram::{LogOnlyChannel, ServerChannel, TelegramChannel};

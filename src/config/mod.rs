pub mod bot_config;

pub use bot_config::{BotConfig, EVENT_DATE_FORMAT};

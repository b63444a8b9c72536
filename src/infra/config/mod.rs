mod app_config;
mod file_config;
mod loader;

pub use app_config::{AppConfig, LimitsConfig, LogConfig, TelegramConfig};
pub use loader::load;

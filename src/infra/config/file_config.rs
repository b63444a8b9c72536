use std::path::PathBuf;

use serde::Deserialize;

use crate::infra::config::{AppConfig, LimitsConfig, LogConfig, TelegramConfig};

#[derive(Debug, Deserialize, Default)]
pub struct FileConfig {
    pub logging: Option<FileLogConfig>,
    pub telegram: Option<FileTelegramConfig>,
    pub limits: Option<FileLimitsConfig>,
}

impl FileConfig {
    pub fn merge_into(self, config: &mut AppConfig) {
        if let Some(logging) = self.logging {
            logging.merge_into(&mut config.logging);
        }

        if let Some(telegram) = self.telegram {
            telegram.merge_into(&mut config.telegram);
        }

        if let Some(limits) = self.limits {
            limits.merge_into(&mut config.limits);
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileLogConfig {
    pub level: Option<String>,
    pub file: Option<PathBuf>,
}

impl FileLogConfig {
    fn merge_into(self, config: &mut LogConfig) {
        if let Some(level) = self.level {
            config.level = level;
        }

        if let Some(file) = self.file {
            config.file = Some(file);
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileTelegramConfig {
    pub gateway_url: Option<String>,
    pub session_path: Option<PathBuf>,
}

impl FileTelegramConfig {
    fn merge_into(self, config: &mut TelegramConfig) {
        if let Some(gateway_url) = self.gateway_url {
            config.gateway_url = gateway_url;
        }

        if let Some(session_path) = self.session_path {
            config.session_path = Some(session_path);
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileLimitsConfig {
    pub requests_per_second: Option<u32>,
    pub burst: Option<u32>,
    pub request_timeout_ms: Option<u64>,
}

impl FileLimitsConfig {
    fn merge_into(self, config: &mut LimitsConfig) {
        if let Some(rate) = self.requests_per_second {
            config.requests_per_second = rate;
        }

        if let Some(burst) = self.burst {
            config.burst = burst;
        }

        if let Some(timeout_ms) = self.request_timeout_ms {
            config.request_timeout_ms = timeout_ms;
        }
    }
}

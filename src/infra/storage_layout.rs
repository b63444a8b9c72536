use std::{env, path::PathBuf};

use crate::infra::{config::TelegramConfig, error::AppError};

const APP_DIR_NAME: &str = "telegram-mcp";
const SESSION_FILE_NAME: &str = "session.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    pub config_dir: PathBuf,
}

impl StorageLayout {
    pub fn resolve() -> Result<Self, AppError> {
        let config_base = env::var_os("XDG_CONFIG_HOME")
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .ok_or_else(|| AppError::StoragePathResolution {
                details: "unable to resolve config base directory (XDG_CONFIG_HOME/HOME)".into(),
            })?;

        Ok(Self {
            config_dir: config_base.join(APP_DIR_NAME),
        })
    }

    pub fn session_file(&self) -> PathBuf {
        self.config_dir.join(SESSION_FILE_NAME)
    }
}

/// Configured session path, or the default one under the config directory.
pub fn session_path(config: &TelegramConfig) -> Result<PathBuf, AppError> {
    match &config.session_path {
        Some(path) => Ok(path.clone()),
        None => Ok(StorageLayout::resolve()?.session_file()),
    }
}

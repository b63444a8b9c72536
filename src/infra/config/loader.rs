use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::infra::{
    config::{file_config::FileConfig, AppConfig},
    error::AppError,
};

const DEFAULT_CONFIG_PATH: &str = "config.toml";
const GATEWAY_URL_ENV: &str = "TG_GATEWAY_URL";
const SESSION_PATH_ENV: &str = "TG_SESSION_PATH";

pub fn load(path: Option<&Path>) -> Result<AppConfig, AppError> {
    let config_path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    let mut config = AppConfig::default();

    if config_path.exists() {
        let raw = fs::read_to_string(&config_path).map_err(|source| AppError::ConfigRead {
            path: config_path.clone(),
            source,
        })?;

        let file_config: FileConfig =
            toml::from_str(&raw).map_err(|source| AppError::ConfigParse {
                path: config_path,
                source,
            })?;

        file_config.merge_into(&mut config);
    }

    apply_env_overrides(&mut config);
    Ok(config)
}

/// Environment wins over the file; empty values are ignored.
fn apply_env_overrides(config: &mut AppConfig) {
    if let Some(url) = non_empty_env(GATEWAY_URL_ENV) {
        config.telegram.gateway_url = url;
    }

    if let Some(path) = non_empty_env(SESSION_PATH_ENV) {
        config.telegram.session_path = Some(PathBuf::from(path));
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

use std::path::Path;

use crate::{
    infra::{self, config::AppConfig, error::AppError, secrets, storage_layout},
    telegram::gateway::{GatewayApi, GatewaySettings},
    usecases::context::AppContext,
};

const BOOTSTRAP_CONFIG_LOADED: &str = "BOOTSTRAP_CONFIG_LOADED";

pub fn bootstrap(config_path: Option<&Path>) -> Result<AppContext, AppError> {
    let config = infra::config::load(config_path)?;
    let logging = infra::logging::init(&config.logging)?;

    tracing::info!(
        code = BOOTSTRAP_CONFIG_LOADED,
        gateway_url = %config.telegram.gateway_url,
        requests_per_second = config.limits.requests_per_second,
        "configuration loaded"
    );

    Ok(build_context(config)?.with_logging(logging))
}

fn build_context(config: AppConfig) -> Result<AppContext, AppError> {
    let session_path = storage_layout::session_path(&config.telegram)?;
    let token = secrets::read_session_token(&session_path)?;
    tracing::debug!(session_path = %session_path.display(), "session token loaded");

    let (gateway, shutdown) = GatewayApi::connect(GatewaySettings::from_config(&config, token))?;

    Ok(AppContext::new(config, gateway, shutdown))
}

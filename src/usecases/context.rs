use std::sync::Arc;

use crate::{
    infra::{config::AppConfig, logging::LoggingGuard},
    telegram::gateway::{GatewayApi, ShutdownHandle},
};

#[derive(Debug)]
pub struct AppContext {
    pub config: AppConfig,
    pub gateway: Arc<GatewayApi>,
    pub shutdown: ShutdownHandle,
    _logging: Option<LoggingGuard>,
}

impl AppContext {
    pub fn new(config: AppConfig, gateway: GatewayApi, shutdown: ShutdownHandle) -> Self {
        Self {
            config,
            gateway: Arc::new(gateway),
            shutdown,
            _logging: None,
        }
    }

    pub fn with_logging(mut self, guard: LoggingGuard) -> Self {
        self._logging = Some(guard);
        self
    }
}

use std::sync::Arc;

use crate::backend::OcrGateway;
use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub gateway: Arc<OcrGateway>,
}

impl AppState {
    pub fn new(config: Config, gateway: OcrGateway) -> Self {
        Self {
            config: Arc::new(config),
            gateway: Arc::new(gateway),
        }
    }
}

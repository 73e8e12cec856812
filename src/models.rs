use std::sync::Arc;

use crate::config::Config;
use crate::webhook::Webhooks;

/* ---------- App state ---------- */
#[derive(Clone)]
pub struct AppState {
    pub http: reqwest::Client,
    pub webhooks: Arc<Webhooks>,
    pub config: Config,
}

impl AppState {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            webhooks: Arc::new(Webhooks::from_config(&config)),
            config,
        }
    }
}

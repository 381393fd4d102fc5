use std::sync::Arc;

use crate::auth::{AuthError, SessionKeys};
use crate::config::AppConfig;
use crate::database::DataStore;

/// Shared handles passed to every handler and middleware
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DataStore>,
    pub config: Arc<AppConfig>,
    pub keys: Arc<SessionKeys>,
}

impl AppState {
    pub fn new(store: Arc<dyn DataStore>, config: AppConfig) -> Result<Self, AuthError> {
        let keys = SessionKeys::from_config(&config.security)?;
        Ok(Self {
            store,
            config: Arc::new(config),
            keys: Arc::new(keys),
        })
    }

    pub fn store(&self) -> &dyn DataStore {
        self.store.as_ref()
    }
}

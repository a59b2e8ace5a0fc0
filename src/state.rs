use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::OrderStore;
use crate::notifications::{Mailer, NotificationDispatcher};
use crate::order_locator::LocatorPolicy;

/// Shared handles for every request. Holds no per-delivery state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub orders: Arc<dyn OrderStore>,
    pub notifier: NotificationDispatcher,
    pub locator_policy: LocatorPolicy,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        orders: Arc<dyn OrderStore>,
        mailer: Option<Arc<dyn Mailer>>,
    ) -> Self {
        let notifier = NotificationDispatcher::new(
            mailer,
            config.merchant_email.clone(),
            config.store_name.clone(),
        );
        let locator_policy = LocatorPolicy::from(&config);
        Self {
            config: Arc::new(config),
            orders,
            notifier,
            locator_policy,
            http: reqwest::Client::new(),
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("locator_policy", &self.locator_policy)
            .finish_non_exhaustive()
    }
}

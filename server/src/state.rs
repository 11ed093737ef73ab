use std::sync::Arc;

use crate::auth::AuthProvider;
use crate::config::Config;
use crate::realtime::NotificationHub;
use crate::search::EventSource;
use crate::store::Store;

/// Shared handles every handler can reach.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn Store>,
    pub auth: Arc<dyn AuthProvider>,
    pub events: Arc<dyn EventSource>,
    pub hub: NotificationHub,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn Store>,
        auth: Arc<dyn AuthProvider>,
        events: Arc<dyn EventSource>,
        hub: NotificationHub,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            auth,
            events,
            hub,
        }
    }
}

//! Services shared by every command

use std::sync::Arc;

use warrant_consumer::{ConsumerFeedService, ContentOverrideService, OverrideResolver};
use warrant_persistence::PersistenceService;

use super::config::Configuration;

pub struct AppState {
    pub configuration: Configuration,
    pub persistence: Arc<dyn PersistenceService>,
    pub resolver: OverrideResolver,
    pub feed: ConsumerFeedService,
    pub overrides: ContentOverrideService,
}

impl AppState {
    pub fn new(configuration: Configuration, persistence: Arc<dyn PersistenceService>) -> Self {
        let resolver = OverrideResolver::new(persistence.clone());
        let feed = ConsumerFeedService::new(persistence.clone(), configuration.cursor_codec())
            .with_options(configuration.feed_options());
        let overrides =
            ContentOverrideService::new(persistence.clone(), configuration.override_validator());

        Self {
            configuration,
            persistence,
            resolver,
            feed,
            overrides,
        }
    }
}

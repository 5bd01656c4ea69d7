use std::sync::Arc;

use crate::config::Config;
use crate::services::{CatalogService, InventoryService, ProfileService};
use crate::store::TicketStore;

/// Shared by every handler; cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub inventory: InventoryService,
    pub catalog: CatalogService,
    pub profile: ProfileService,
    pub admin_token: Option<Arc<str>>,
}

impl AppState {
    pub fn new(store: Arc<dyn TicketStore>, config: &Config) -> Self {
        Self {
            inventory: InventoryService::new(store.clone()),
            catalog: CatalogService::new(store.clone(), config.category_cache_ttl),
            profile: ProfileService::new(store, config.profile_page_size),
            admin_token: config.admin_token.as_deref().map(Arc::from),
        }
    }
}

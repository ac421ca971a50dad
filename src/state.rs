use std::sync::Arc;

use crate::clock::Clock;
use crate::store::Store;
use crate::utils::api_cache::ApiCache;

/// Shared by every worker through `web::Data`.
pub struct AppState {
    pub store: Store,
    pub cache: ApiCache,
    pub clock: Arc<dyn Clock>,
}

#[cfg(test)]
impl AppState {
    pub fn in_memory(clock: Arc<dyn Clock>) -> Self {
        AppState {
            store: Store::Memory(Default::default()),
            cache: ApiCache::new(1_000, 30, clock.clone()),
            clock,
        }
    }
}

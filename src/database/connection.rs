use super::{DynStore, MemoryStore};
use crate::config::StoreConfig;
use crate::error::AppResult;
use crate::external::SupabaseStore;
use std::sync::Arc;

/// Build the configured backend: Supabase when a URL is set, otherwise the
/// in-memory store (local mock mode, nothing survives a restart).
pub fn create_store(config: &StoreConfig) -> AppResult<DynStore> {
    if config.is_remote() {
        log::info!("Using Supabase store at {}", config.supabase_url);
        Ok(Arc::new(SupabaseStore::new(config)?))
    } else {
        log::warn!("No remote store configured, using in-memory store");
        Ok(Arc::new(MemoryStore::new()))
    }
}

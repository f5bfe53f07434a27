use std::sync::Arc;

use crate::store::ApplicationStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// SQLite or Supabase, chosen at startup from `STORE_BACKEND`.
    pub store: Arc<dyn ApplicationStore>,
}

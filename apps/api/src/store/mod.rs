//! Application record storage.
//!
//! `AppState` holds an `Arc<dyn ApplicationStore>`, chosen at startup via
//! `STORE_BACKEND`. Handlers never talk to SQLite or Supabase directly.

pub mod sqlite;
pub mod supabase;

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::application::{ApplicationFields, ApplicationRecord};

pub use self::sqlite::SqliteStore;
pub use self::supabase::SupabaseStore;

#[async_trait]
pub trait ApplicationStore: Send + Sync {
    /// Short backend name for logs and `/health`.
    fn backend(&self) -> &'static str;

    /// Persists a new record. The store assigns `id` and `createdAt`.
    async fn insert(&self, fields: ApplicationFields) -> Result<ApplicationRecord, AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<ApplicationRecord>, AppError>;

    /// Every record, newest `createdAt` first.
    async fn list(&self) -> Result<Vec<ApplicationRecord>, AppError>;

    /// Replaces the mutable fields of `id`. `id` and `createdAt` are kept.
    /// Returns `None` when no such record exists.
    async fn update(
        &self,
        id: Uuid,
        fields: ApplicationFields,
    ) -> Result<Option<ApplicationRecord>, AppError>;

    /// Returns whether a record was removed.
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;
}

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::application::{ApplicationFields, ApplicationRecord};
use crate::store::ApplicationStore;
use crate::supabase::{SupabaseClient, SupabaseError, APPLICATION_TABLE};

/// Application store over the remote `tracks_applicationrecord` table.
#[derive(Clone)]
pub struct SupabaseStore {
    client: SupabaseClient,
}

impl SupabaseStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }
}

fn first_record(rows: Vec<Value>) -> Result<Option<ApplicationRecord>, AppError> {
    rows.into_iter()
        .next()
        .map(|row| serde_json::from_value(row).map_err(SupabaseError::from))
        .transpose()
        .map_err(AppError::from)
}

#[async_trait]
impl ApplicationStore for SupabaseStore {
    fn backend(&self) -> &'static str {
        "supabase"
    }

    async fn insert(&self, fields: ApplicationFields) -> Result<ApplicationRecord, AppError> {
        let id = Uuid::new_v4();
        let mut row = fields.to_row();
        row["id"] = Value::String(id.to_string());

        let rows = self.client.insert(APPLICATION_TABLE, &row).await?;
        let record = first_record(rows)?.ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("insert of {id} returned no representation"))
        })?;

        info!("Inserted application {id} into {APPLICATION_TABLE}");
        Ok(record)
    }

    async fn get(&self, id: Uuid) -> Result<Option<ApplicationRecord>, AppError> {
        let rows = self
            .client
            .from(APPLICATION_TABLE)
            .eq("id", id)
            .limit(1)
            .execute()
            .await?;
        first_record(rows)
    }

    async fn list(&self) -> Result<Vec<ApplicationRecord>, AppError> {
        let records = self
            .client
            .from(APPLICATION_TABLE)
            .order("createdAt", false)
            .execute_as::<ApplicationRecord>()
            .await?;
        Ok(records)
    }

    async fn update(
        &self,
        id: Uuid,
        fields: ApplicationFields,
    ) -> Result<Option<ApplicationRecord>, AppError> {
        let rows = self
            .client
            .update_eq(APPLICATION_TABLE, "id", &id.to_string(), &fields.to_row())
            .await?;
        first_record(rows)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let rows = self
            .client
            .delete_eq(APPLICATION_TABLE, "id", &id.to_string())
            .await?;
        Ok(!rows.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::*;
    use crate::models::application::{ApplicationStatus, DEFAULT_PROCESS};
    use crate::supabase::stub::{self, StubDb};

    fn fields(company: &str, position: &str) -> ApplicationFields {
        ApplicationFields {
            company: company.to_string(),
            position: position.to_string(),
            location: None,
            industry: Some("Fintech".to_string()),
            poc: None,
            agent: None,
            process: DEFAULT_PROCESS.to_string(),
            applied_date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            status: ApplicationStatus::Applied,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_insert_get_list_round_trip() {
        let db = StubDb::default();
        let store = SupabaseStore::new(stub::spawn(db.clone()).await);

        let first = store.insert(fields("Acme", "SRE")).await.unwrap();
        let second = store.insert(fields("Globex", "Analyst")).await.unwrap();

        let stored = db.rows(APPLICATION_TABLE);
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0]["role"], "SRE");
        assert!(stored[0].get("position").is_none());

        let fetched = store.get(first.id).await.unwrap().unwrap();
        assert_eq!(fetched, first);
        assert_eq!(fetched.position, "SRE");
        assert_eq!(fetched.industry.as_deref(), Some("Fintech"));

        let listed: Vec<Uuid> = store.list().await.unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(listed, vec![second.id, first.id]);

        assert!(store.get(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reads_rows_written_with_role_column() {
        let id = Uuid::new_v4();
        let db = StubDb::default().with_rows(
            APPLICATION_TABLE,
            vec![json!({
                "id": id.to_string(),
                "company": "Initech",
                "role": "PM",
                "location": null,
                "industry": null,
                "poc": null,
                "agent": null,
                "process": "Referral",
                "appliedDate": "2023-11-20",
                "status": "In Progress",
                "notes": "second round",
                "createdAt": "2023-11-20T09:30:00.000Z"
            })],
        );
        let store = SupabaseStore::new(stub::spawn(db).await);

        let record = store.get(id).await.unwrap().unwrap();
        assert_eq!(record.position, "PM");
        assert_eq!(record.status, ApplicationStatus::InProgress);
        assert_eq!(record.notes.as_deref(), Some("second round"));
        assert_eq!(store.list().await.unwrap(), vec![record]);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let store = SupabaseStore::new(stub::spawn(StubDb::default()).await);
        let created = store.insert(fields("Acme", "SRE")).await.unwrap();

        let mut changed = fields("Acme", "Staff SRE");
        changed.status = ApplicationStatus::Offer;
        let updated = store.update(created.id, changed).await.unwrap().unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.position, "Staff SRE");
        assert_eq!(updated.status, ApplicationStatus::Offer);

        assert!(store
            .update(Uuid::new_v4(), fields("Nobody", "None"))
            .await
            .unwrap()
            .is_none());

        assert!(store.delete(created.id).await.unwrap());
        assert!(!store.delete(created.id).await.unwrap());
        assert!(store.list().await.unwrap().is_empty());
    }
}

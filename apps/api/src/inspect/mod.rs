//! Read-only diagnostics against the remote schema.
//!
//! Each command issues one primary call and at most one fallback, never
//! retries, and returns a `Report` whose rendering is deterministic for an
//! unchanged table.

pub mod render;

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{info, warn};

use crate::supabase::{SupabaseClient, SupabaseError, APPLICATION_TABLE};

pub use render::render_report;

pub const PUBLIC_SCHEMA: &str = "public";

const LIST_TABLES_SQL: &str =
    "SELECT table_name FROM information_schema.tables WHERE table_schema = 'public'";

fn columns_sql(table: &str) -> String {
    format!(
        "SELECT column_name, data_type, is_nullable \
         FROM information_schema.columns \
         WHERE table_name = '{table}' \
         ORDER BY ordinal_position"
    )
}

/// The calls the diagnostics need. `SupabaseClient` is the production
/// implementation.
#[async_trait]
pub trait InspectSource: Send + Sync {
    async fn call_rpc(&self, function: &str, args: Value) -> Result<Value, SupabaseError>;
    async fn count_rows(&self, table: &str) -> Result<u64, SupabaseError>;
    /// First row of `table` (`limit 1`), if any.
    async fn first_row(&self, table: &str) -> Result<Option<Value>, SupabaseError>;
    /// `limit 1` + `single()`: errors unless exactly one row comes back.
    async fn single_row(&self, table: &str) -> Result<Value, SupabaseError>;
}

#[async_trait]
impl InspectSource for SupabaseClient {
    async fn call_rpc(&self, function: &str, args: Value) -> Result<Value, SupabaseError> {
        self.rpc(function, &args).await
    }

    async fn count_rows(&self, table: &str) -> Result<u64, SupabaseError> {
        self.count(table).await
    }

    async fn first_row(&self, table: &str) -> Result<Option<Value>, SupabaseError> {
        Ok(self.from(table).limit(1).execute().await?.into_iter().next())
    }

    async fn single_row(&self, table: &str) -> Result<Value, SupabaseError> {
        self.from(table).limit(1).single().await
    }
}

#[derive(Debug, Error)]
pub enum InspectError {
    #[error("{context}: {source}")]
    Query {
        context: String,
        #[source]
        source: SupabaseError,
    },

    #[error("primary query failed ({primary}); fallback failed ({fallback})")]
    FallbackExhausted {
        primary: SupabaseError,
        fallback: SupabaseError,
    },
}

fn query_error(context: impl Into<String>) -> impl FnOnce(SupabaseError) -> InspectError {
    let context = context.into();
    move |source| InspectError::Query { context, source }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Section {
    Text(String),
    Table(Vec<Value>),
    Record(Value),
    Keys(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Report {
    pub sections: Vec<Section>,
    /// Set when the primary call failed and the fallback produced the data.
    pub used_fallback: bool,
}

impl Report {
    fn text(mut self, line: impl Into<String>) -> Self {
        self.sections.push(Section::Text(line.into()));
        self
    }

    fn section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }
}

/// RPC results come back as arrays, single objects or scalars; tables want rows.
fn as_rows(value: Value) -> Vec<Value> {
    match value {
        Value::Array(rows) => rows,
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

/// Row count of the applications table plus the first record as a structure
/// sample. No fallback.
pub async fn check_table(source: &dyn InspectSource) -> Result<Report, InspectError> {
    let count = source
        .count_rows(APPLICATION_TABLE)
        .await
        .map_err(query_error(format!("Error accessing {APPLICATION_TABLE}")))?;

    let report = Report::default().text(format!("Found {count} records in {APPLICATION_TABLE}"));
    if count == 0 {
        return Ok(report.text("The table is empty"));
    }

    let sample = source
        .first_row(APPLICATION_TABLE)
        .await
        .map_err(query_error(format!("Error reading first record of {APPLICATION_TABLE}")))?;

    Ok(match sample {
        Some(record) => report
            .text("Table structure from first record:")
            .section(Section::Record(record)),
        None => report.text("The table is empty"),
    })
}

/// Column metadata via the `get_table_columns` RPC. No fallback.
pub async fn check_table_schema(source: &dyn InspectSource) -> Result<Report, InspectError> {
    let columns = source
        .call_rpc(
            "get_table_columns",
            json!({ "table_name": APPLICATION_TABLE, "table_schema": PUBLIC_SCHEMA }),
        )
        .await
        .map_err(query_error("Error fetching table schema"))?;

    Ok(Report::default()
        .text(format!("Table {APPLICATION_TABLE} schema:"))
        .section(Section::Table(as_rows(columns))))
}

/// Public tables via the `list_tables` RPC, falling back to a raw
/// `information_schema` query through the `query` RPC.
pub async fn list_tables(source: &dyn InspectSource) -> Result<Report, InspectError> {
    let (tables, used_fallback) = match source.call_rpc("list_tables", json!({})).await {
        Ok(tables) => (tables, false),
        Err(primary) => {
            warn!("list_tables RPC failed ({primary}), trying direct query");
            match source
                .call_rpc("query", json!({ "query": LIST_TABLES_SQL }))
                .await
            {
                Ok(tables) => (tables, true),
                Err(fallback) => {
                    return Err(InspectError::FallbackExhausted { primary, fallback });
                }
            }
        }
    };

    let mut report = Report::default()
        .text("Tables in the database:")
        .section(Section::Table(as_rows(tables)));
    report.used_fallback = used_fallback;
    Ok(report)
}

/// Column listing via a raw `information_schema.columns` query, falling back
/// to the keys of a single sampled record.
pub async fn inspect_table(source: &dyn InspectSource) -> Result<Report, InspectError> {
    let primary = match source
        .call_rpc("query", json!({ "query": columns_sql(APPLICATION_TABLE) }))
        .await
    {
        Ok(columns) => {
            return Ok(Report::default()
                .text("Table columns:")
                .section(Section::Table(as_rows(columns))));
        }
        Err(e) => e,
    };

    warn!("Column query failed ({primary}), trying alternative method to inspect table");

    let record = match source.single_row(APPLICATION_TABLE).await {
        Ok(record) => record,
        Err(fallback) => return Err(InspectError::FallbackExhausted { primary, fallback }),
    };

    let mut keys: Vec<String> = record
        .as_object()
        .map(|obj| obj.keys().cloned().collect())
        .unwrap_or_default();
    keys.sort();
    info!("Sampled {} columns from a single record", keys.len());

    let mut report = Report::default()
        .text("Table columns (from record sample):")
        .section(Section::Keys(keys));
    report.used_fallback = true;
    Ok(report)
}

//! Supabase client. The single point of entry for PostgREST table and RPC
//! calls; stores and admin commands never build Supabase requests themselves.

use std::time::Duration;

use reqwest::{header, Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::config::SupabaseConfig;

#[cfg(test)]
pub(crate) mod stub;

/// Remote table holding application records.
pub const APPLICATION_TABLE: &str = "tracks_applicationrecord";

const REST_PREFIX: &str = "rest/v1";
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

#[derive(Debug, Error)]
pub enum SupabaseError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
        details: Option<String>,
        hint: Option<String>,
    },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Response did not include a row count")]
    MissingCount,
}

impl SupabaseError {
    /// PostgREST error code (`PGRST116`, `42883`, ...) when the server sent one.
    pub fn code(&self) -> Option<&str> {
        match self {
            SupabaseError::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PostgrestErrorBody {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

/// Builds an `Api` error from a non-success response body. Falls back to the
/// raw body when it is not a PostgREST error object.
pub(crate) fn decode_error(status: u16, body: &str) -> SupabaseError {
    match serde_json::from_str::<PostgrestErrorBody>(body) {
        Ok(parsed) => SupabaseError::Api {
            status,
            code: parsed.code,
            message: parsed.message.unwrap_or_else(|| body.to_string()),
            details: parsed.details,
            hint: parsed.hint,
        },
        Err(_) => SupabaseError::Api {
            status,
            code: None,
            message: if body.is_empty() {
                format!("request failed with status {status}")
            } else {
                body.to_string()
            },
            details: None,
            hint: None,
        },
    }
}

/// Extracts the total from a `Content-Range` header (`0-9/42`, `*/0`).
pub(crate) fn parse_content_range(value: &str) -> Option<u64> {
    value.rsplit_once('/').and_then(|(_, total)| total.trim().parse().ok())
}

/// Thin PostgREST client authenticated with the project URL and API key.
#[derive(Clone)]
pub struct SupabaseClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl SupabaseClient {
    pub fn new(config: &SupabaseConfig) -> Result<Self, SupabaseError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn rest_url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, REST_PREFIX, path)
    }

    fn request(&self, method: Method, url: String) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.api_key)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
    }

    /// Starts a query against `table`. Defaults to `select=*`.
    pub fn from<'a>(&'a self, table: &'a str) -> TableQuery<'a> {
        TableQuery {
            client: self,
            table,
            columns: "*".to_string(),
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    /// Invokes a server-side function via `POST /rest/v1/rpc/{function}`.
    pub async fn rpc(&self, function: &str, args: &Value) -> Result<Value, SupabaseError> {
        debug!("Supabase rpc {function}");
        let response = self
            .request(Method::POST, self.rest_url(&format!("rpc/{function}")))
            .json(args)
            .send()
            .await?;
        read_json(response).await
    }

    /// Exact row count via `HEAD` + `Prefer: count=exact`.
    pub async fn count(&self, table: &str) -> Result<u64, SupabaseError> {
        debug!("Supabase count {table}");
        let response = self
            .request(Method::HEAD, self.rest_url(table))
            .query(&[("select", "*")])
            .header("Prefer", "count=exact")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(decode_error(status.as_u16(), &body));
        }

        response
            .headers()
            .get(header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range)
            .ok_or(SupabaseError::MissingCount)
    }

    /// Inserts one row and returns the stored representation.
    pub async fn insert(&self, table: &str, row: &Value) -> Result<Vec<Value>, SupabaseError> {
        debug!("Supabase insert into {table}");
        let response = self
            .request(Method::POST, self.rest_url(table))
            .header("Prefer", "return=representation")
            .json(row)
            .send()
            .await?;
        read_rows(response).await
    }

    /// `PATCH` rows where `column = value`; returns the updated rows.
    pub async fn update_eq(
        &self,
        table: &str,
        column: &str,
        value: &str,
        patch: &Value,
    ) -> Result<Vec<Value>, SupabaseError> {
        debug!("Supabase update {table} where {column}={value}");
        let response = self
            .request(Method::PATCH, self.rest_url(table))
            .query(&[(column, format!("eq.{value}"))])
            .header("Prefer", "return=representation")
            .json(patch)
            .send()
            .await?;
        read_rows(response).await
    }

    /// `DELETE` rows where `column = value`; returns the deleted rows.
    pub async fn delete_eq(
        &self,
        table: &str,
        column: &str,
        value: &str,
    ) -> Result<Vec<Value>, SupabaseError> {
        debug!("Supabase delete from {table} where {column}={value}");
        let response = self
            .request(Method::DELETE, self.rest_url(table))
            .query(&[(column, format!("eq.{value}"))])
            .header("Prefer", "return=representation")
            .send()
            .await?;
        read_rows(response).await
    }
}

async fn read_json(response: Response) -> Result<Value, SupabaseError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(decode_error(status.as_u16(), &body));
    }
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&body)?)
}

async fn read_rows(response: Response) -> Result<Vec<Value>, SupabaseError> {
    match read_json(response).await? {
        Value::Array(rows) => Ok(rows),
        Value::Null => Ok(Vec::new()),
        other => Ok(vec![other]),
    }
}

/// A `select` under construction. Filters use PostgREST operator syntax.
pub struct TableQuery<'a> {
    client: &'a SupabaseClient,
    table: &'a str,
    columns: String,
    filters: Vec<(String, String)>,
    order: Option<String>,
    limit: Option<usize>,
}

impl<'a> TableQuery<'a> {
    pub fn select(mut self, columns: &str) -> Self {
        self.columns = columns.to_string();
        self
    }

    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.filters
            .push((column.to_string(), format!("eq.{}", value.to_string())));
        self
    }

    /// Case-insensitive pattern match; `*` is the PostgREST wildcard.
    pub fn ilike(mut self, column: &str, pattern: &str) -> Self {
        self.filters
            .push((column.to_string(), format!("ilike.{pattern}")));
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.order = Some(format!("{column}.{direction}"));
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    pub(crate) fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("select".to_string(), self.columns.clone())];
        pairs.extend(self.filters.iter().cloned());
        if let Some(order) = &self.order {
            pairs.push(("order".to_string(), order.clone()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        pairs
    }

    fn build(&self) -> RequestBuilder {
        self.client
            .request(Method::GET, self.client.rest_url(self.table))
            .query(&self.query_pairs())
    }

    pub async fn execute(self) -> Result<Vec<Value>, SupabaseError> {
        debug!("Supabase select from {}", self.table);
        let response = self.build().send().await?;
        read_rows(response).await
    }

    pub async fn execute_as<T: DeserializeOwned>(self) -> Result<Vec<T>, SupabaseError> {
        self.execute()
            .await?
            .into_iter()
            .map(|row| serde_json::from_value(row).map_err(SupabaseError::from))
            .collect()
    }

    /// Exactly one row. PostgREST answers 406 (`PGRST116`) when zero or
    /// several rows match.
    pub async fn single(self) -> Result<Value, SupabaseError> {
        debug!("Supabase single from {}", self.table);
        let response = self
            .build()
            .header(header::ACCEPT, SINGLE_OBJECT)
            .send()
            .await?;
        read_json(response).await
    }
}

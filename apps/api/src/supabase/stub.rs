//! In-process PostgREST stand-in used by tests that exercise the client and
//! the Supabase store over real HTTP. Supports the subset of PostgREST the
//! client speaks: `eq.` filters, `order`, `limit`, exact counts, object
//! responses and `return=representation` writes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use super::{SupabaseClient, SINGLE_OBJECT};
use crate::config::SupabaseConfig;

pub(crate) const STUB_KEY: &str = "stub-anon-key";

/// Table whose select answers with a bare object instead of an array.
pub(crate) const OBJECT_TABLE: &str = "legacy_object";

type Pairs = Vec<(String, String)>;

#[derive(Clone, Default)]
pub(crate) struct StubDb {
    tables: Arc<Mutex<HashMap<String, Vec<Value>>>>,
    clock: Arc<AtomicU64>,
}

impl StubDb {
    pub(crate) fn with_rows(self, table: &str, rows: Vec<Value>) -> Self {
        self.tables
            .lock()
            .unwrap()
            .insert(table.to_string(), rows);
        self
    }

    pub(crate) fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    fn next_created_at(&self) -> String {
        let tick = self.clock.fetch_add(1, Ordering::SeqCst) + 1;
        format!("2024-01-01T00:00:{:02}.{:03}Z", tick / 1000, tick % 1000)
    }
}

/// Serves `db` on an ephemeral local port and returns a client pointed at it.
pub(crate) async fn spawn(db: StubDb) -> SupabaseClient {
    let app = Router::new()
        .route("/rest/v1/rpc/:function", post(rpc))
        .route(
            "/rest/v1/:table",
            get(select)
                .head(count)
                .post(insert)
                .patch(update)
                .delete(remove),
        )
        .with_state(db);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    SupabaseClient::new(&SupabaseConfig {
        url: format!("http://{addr}"),
        api_key: STUB_KEY.to_string(),
        timeout_secs: 5,
    })
    .unwrap()
}

fn postgrest_error(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(json!({ "code": code, "message": message, "details": null, "hint": null })),
    )
        .into_response()
}

fn authorized(headers: &HeaderMap) -> Result<(), Response> {
    let key_ok = headers.get("apikey").and_then(|v| v.to_str().ok()) == Some(STUB_KEY);
    let bearer = format!("Bearer {STUB_KEY}");
    let bearer_ok =
        headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) == Some(bearer.as_str());
    if key_ok && bearer_ok {
        Ok(())
    } else {
        Err(postgrest_error(
            StatusCode::UNAUTHORIZED,
            "PGRST301",
            "Invalid API key",
        ))
    }
}

fn prefers(headers: &HeaderMap, value: &str) -> bool {
    headers
        .get("prefer")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|p| p.split(',').any(|part| part.trim() == value))
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn matches(row: &Value, params: &Pairs) -> bool {
    params
        .iter()
        .filter(|(key, _)| !matches!(key.as_str(), "select" | "order" | "limit"))
        .all(|(column, filter)| match filter.strip_prefix("eq.") {
            Some(expected) => row.get(column).map(text).as_deref() == Some(expected),
            None => false,
        })
}

fn param<'a>(params: &'a Pairs, key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn representation(headers: &HeaderMap, status: StatusCode, rows: Vec<Value>) -> Response {
    if prefers(headers, "return=representation") && !rows.is_empty() {
        (status, Json(rows)).into_response()
    } else {
        StatusCode::NO_CONTENT.into_response()
    }
}

async fn select(
    State(db): State<StubDb>,
    Path(table): Path<String>,
    Query(params): Query<Pairs>,
    headers: HeaderMap,
) -> Response {
    if let Err(denied) = authorized(&headers) {
        return denied;
    }

    let mut rows: Vec<Value> = db
        .rows(&table)
        .into_iter()
        .filter(|row| matches(row, &params))
        .collect();

    if let Some((column, direction)) = param(&params, "order").and_then(|o| o.split_once('.')) {
        rows.sort_by_key(|row| row.get(column).map(text).unwrap_or_default());
        if direction == "desc" {
            rows.reverse();
        }
    }
    if let Some(limit) = param(&params, "limit").and_then(|l| l.parse().ok()) {
        rows.truncate(limit);
    }

    let wants_object = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        == Some(SINGLE_OBJECT);
    if wants_object {
        return match rows.len() {
            1 => Json(rows.remove(0)).into_response(),
            n => (
                StatusCode::NOT_ACCEPTABLE,
                Json(json!({
                    "code": "PGRST116",
                    "message": "JSON object requested, multiple (or no) rows returned",
                    "details": format!("The result contains {n} rows"),
                    "hint": null
                })),
            )
                .into_response(),
        };
    }

    if table == OBJECT_TABLE {
        return Json(rows.into_iter().next().unwrap_or(Value::Null)).into_response();
    }
    Json(rows).into_response()
}

async fn count(
    State(db): State<StubDb>,
    Path(table): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Err(denied) = authorized(&headers) {
        return denied;
    }
    if !prefers(&headers, "count=exact") {
        return StatusCode::OK.into_response();
    }

    let total = db.rows(&table).len();
    let range = if total == 0 {
        "*/0".to_string()
    } else {
        format!("0-{}/{total}", total - 1)
    };
    (StatusCode::OK, [(header::CONTENT_RANGE, range)]).into_response()
}

async fn insert(
    State(db): State<StubDb>,
    Path(table): Path<String>,
    headers: HeaderMap,
    Json(mut row): Json<Value>,
) -> Response {
    if let Err(denied) = authorized(&headers) {
        return denied;
    }
    let Some(object) = row.as_object_mut() else {
        return postgrest_error(StatusCode::BAD_REQUEST, "PGRST102", "Expected a JSON object");
    };
    if !object.contains_key("createdAt") {
        object.insert("createdAt".to_string(), Value::String(db.next_created_at()));
    }

    db.tables
        .lock()
        .unwrap()
        .entry(table)
        .or_default()
        .push(row.clone());
    representation(&headers, StatusCode::CREATED, vec![row])
}

async fn update(
    State(db): State<StubDb>,
    Path(table): Path<String>,
    Query(params): Query<Pairs>,
    headers: HeaderMap,
    Json(patch): Json<Value>,
) -> Response {
    if let Err(denied) = authorized(&headers) {
        return denied;
    }

    let mut updated = Vec::new();
    let mut tables = db.tables.lock().unwrap();
    for row in tables.entry(table).or_default().iter_mut() {
        if !matches(row, &params) {
            continue;
        }
        if let (Some(target), Some(changes)) = (row.as_object_mut(), patch.as_object()) {
            for (key, value) in changes {
                target.insert(key.clone(), value.clone());
            }
        }
        updated.push(row.clone());
    }
    drop(tables);

    representation(&headers, StatusCode::OK, updated)
}

async fn remove(
    State(db): State<StubDb>,
    Path(table): Path<String>,
    Query(params): Query<Pairs>,
    headers: HeaderMap,
) -> Response {
    if let Err(denied) = authorized(&headers) {
        return denied;
    }

    let mut tables = db.tables.lock().unwrap();
    let rows = tables.entry(table).or_default();
    let (removed, kept): (Vec<Value>, Vec<Value>) =
        rows.drain(..).partition(|row| matches(row, &params));
    *rows = kept;
    drop(tables);

    representation(&headers, StatusCode::OK, removed)
}

async fn rpc(Path(function): Path<String>, headers: HeaderMap) -> Response {
    if let Err(denied) = authorized(&headers) {
        return denied;
    }
    match function.as_str() {
        "list_tables" => Json(json!([
            { "table_name": "jobs" },
            { "table_name": "tracks_applicationrecord" }
        ]))
        .into_response(),
        _ => postgrest_error(
            StatusCode::NOT_FOUND,
            "PGRST202",
            &format!("Could not find the function public.{function}"),
        ),
    }
}

//! Axum route handlers for the Applications API.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::applications::dashboard::{build_dashboard, DashboardPage, DashboardQuery};
use crate::applications::validation::{merge_with_existing, validate_application};
use crate::errors::{AppError, AppJson};
use crate::models::application::{ApplicationForm, ApplicationRecord};
use crate::state::AppState;

pub const CREATED_MESSAGE: &str = "Application added successfully";

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub message: &'static str,
    pub application: ApplicationRecord,
}

/// POST /api/v1/applications
pub async fn handle_create(
    State(state): State<AppState>,
    AppJson(form): AppJson<ApplicationForm>,
) -> Result<(StatusCode, Json<CreatedResponse>), AppError> {
    let fields =
        validate_application(form, Utc::now().date_naive()).map_err(AppError::Validation)?;
    let application = state.store.insert(fields).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            message: CREATED_MESSAGE,
            application,
        }),
    ))
}

/// GET /api/v1/applications
pub async fn handle_list(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<DashboardPage>, AppError> {
    let records = state.store.list().await?;
    Ok(Json(build_dashboard(records, &query)))
}

/// GET /api/v1/applications/:id
pub async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApplicationRecord>, AppError> {
    state
        .store
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Application {id} not found")))
}

/// PUT /api/v1/applications/:id
/// Fields left out of the body keep their stored values.
pub async fn handle_update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(form): AppJson<ApplicationForm>,
) -> Result<Json<ApplicationRecord>, AppError> {
    let existing = state
        .store
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Application {id} not found")))?;

    let fields = validate_application(
        merge_with_existing(form, &existing),
        Utc::now().date_naive(),
    )
    .map_err(AppError::Validation)?;
    state
        .store
        .update(id, fields)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Application {id} not found")))
}

/// DELETE /api/v1/applications/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.store.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Application {id} not found")))
    }
}

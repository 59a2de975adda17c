use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::{Service, ServiceType};
use crate::services::catalog;
use crate::state::AppState;

use super::require_bearer;

// GET /services
pub async fn list(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Service>>, AppError> {
    let db = state.db()?;
    Ok(Json(catalog::active_services(&db, None)?))
}

// GET /services/search
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub service_type: ServiceType,
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Service>>, AppError> {
    let db = state.db()?;
    Ok(Json(catalog::active_services(&db, Some(query.service_type))?))
}

// POST /services
pub async fn create(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<Vec<Service>>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_bearer(&state, &headers)?;
    let mut db = state.db()?;
    let ids = catalog::add_services(&mut db, &body)?;
    Ok(Json(serde_json::json!({"ok": true, "ids": ids})))
}

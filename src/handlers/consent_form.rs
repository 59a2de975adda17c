use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::{ConsentFormRequest, ConsentFormStatement, StatementInput};
use crate::services::{booking, catalog};
use crate::state::AppState;

use super::require_bearer;

// POST /consentForm
pub async fn submit(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ConsentFormRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut db = state.db()?;
    let form = booking::attach_consent_form(&mut db, &body)?;
    Ok(Json(serde_json::json!({
        "id": form.id,
        "clientId": form.client_id,
    })))
}

// GET /consentForm/statements
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementsQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

pub async fn list_statements(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<StatementsQuery>,
) -> Result<Json<Vec<ConsentFormStatement>>, AppError> {
    if query.include_inactive {
        require_bearer(&state, &headers)?;
    }
    let db = state.db()?;
    Ok(Json(catalog::statements(&db, query.include_inactive)?))
}

// GET /consentForm/statements/:id
pub async fn get_statement(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<ConsentFormStatement>, AppError> {
    let db = state.db()?;
    Ok(Json(catalog::statement(&db, id)?))
}

// POST /consentForm/statements
#[derive(Deserialize)]
#[serde(untagged)]
pub enum StatementsBody {
    Many(Vec<StatementInput>),
    One(StatementInput),
}

pub async fn create_statements(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<StatementsBody>,
) -> Result<Json<Vec<ConsentFormStatement>>, AppError> {
    require_bearer(&state, &headers)?;
    let inputs = match body {
        StatementsBody::Many(inputs) => inputs,
        StatementsBody::One(input) => vec![input],
    };
    let mut db = state.db()?;
    Ok(Json(catalog::add_statements(&mut db, &inputs)?))
}

// PUT /consentForm/statements/:id
pub async fn update_statement(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<StatementInput>,
) -> Result<Json<ConsentFormStatement>, AppError> {
    require_bearer(&state, &headers)?;
    let db = state.db()?;
    Ok(Json(catalog::update_statement(&db, id, &body)?))
}

// DELETE /consentForm/statements/:id
pub async fn delete_statement(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_bearer(&state, &headers)?;
    let db = state.db()?;
    catalog::remove_statement(&db, id)?;
    Ok(Json(serde_json::json!({"ok": true})))
}

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Local;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{Appointment, AppointmentDetail, LoginRequest, NewSlot};
use crate::services::availability::{self, AdminListQuery};
use crate::services::{auth, booking, email};
use crate::state::AppState;

use super::appointments::date_param;

fn check_token(state: &AppState, token: &str) -> Result<(), AppError> {
    let db = state.db()?;
    auth::authorize(&db, token)
}

// POST /admin/
#[derive(Serialize)]
pub struct LoginResponse {
    token: String,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let token = auth::login(&state.db, &state.config, body.username.trim(), &body.password).await?;
    Ok(Json(LoginResponse { token }))
}

// POST /admin/:token/appointments
pub async fn create_appointments(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    Json(body): Json<Vec<NewSlot>>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    check_token(&state, &token)?;
    let mut db = state.db()?;
    Ok(Json(booking::create_slots(&mut db, &body)?))
}

// POST /admin/:token/appointments/promotion
pub async fn create_promotional_appointments(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    Json(body): Json<Vec<NewSlot>>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    check_token(&state, &token)?;
    let mut db = state.db()?;
    Ok(Json(booking::create_promotional_slots(&mut db, &body)?))
}

// GET /admin/:token/appointments
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentsQuery {
    pub booked: Option<String>,
    pub include_archived: Option<String>,
    pub date: Option<String>,
    pub promotion: Option<String>,
}

/// A bare `?booked` counts as set.
fn flag(value: &Option<String>) -> bool {
    matches!(value.as_deref(), Some("" | "true" | "1"))
}

pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    Query(query): Query<AppointmentsQuery>,
) -> Result<Json<Vec<AppointmentDetail>>, AppError> {
    check_token(&state, &token)?;

    let date = match query.date.as_deref().filter(|d| !d.is_empty()) {
        Some(raw) => Some(date_param(raw)?),
        None => None,
    };
    let list_query = AdminListQuery {
        booked: flag(&query.booked),
        include_archived: flag(&query.include_archived),
        date,
        promotion: query.promotion.filter(|p| !p.is_empty()),
    };

    let now = Local::now().naive_local();
    let db = state.db()?;
    Ok(Json(availability::admin_list(&db, &list_query, &now)?))
}

// POST /admin/:token/test-email
#[derive(Deserialize)]
pub struct TestEmailRequest {
    pub email: String,
}

pub async fn test_email(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    Json(body): Json<TestEmailRequest>,
) -> Result<Response, AppError> {
    check_token(&state, &token)?;

    let sent = email::send_booking_confirmation(
        state.notifier.as_ref(),
        &state.config.consent_form_url,
        body.email.trim(),
        &Uuid::new_v4(),
        &Uuid::new_v4(),
    )
    .await;

    if sent {
        Ok(Json(serde_json::json!({"ok": true})).into_response())
    } else {
        Ok((
            StatusCode::BAD_GATEWAY,
            Json(serde_json::json!({"error": "failed to send email"})),
        )
            .into_response())
    }
}

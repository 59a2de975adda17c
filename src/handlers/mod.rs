pub mod admin;
pub mod appointments;
pub mod catalog;
pub mod consent_form;
pub mod promotions;

use std::sync::Arc;

use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::errors::AppError;
use crate::services::auth;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/appointments/status", get(appointments::get_status))
        .route("/appointments/:date", get(appointments::get_by_date))
        .route(
            "/appointments/:date/promotion/:promotion",
            get(appointments::get_promotion_by_date),
        )
        .route(
            "/appointments/promotion/status/:promotion",
            get(appointments::get_promotion_status),
        )
        .route("/appointment/:id", get(appointments::get_appointment))
        .route("/appointment", post(appointments::request_booking))
        .route("/consentForm", post(consent_form::submit))
        .route(
            "/consentForm/statements",
            get(consent_form::list_statements).post(consent_form::create_statements),
        )
        .route(
            "/consentForm/statements/:id",
            get(consent_form::get_statement)
                .put(consent_form::update_statement)
                .delete(consent_form::delete_statement),
        )
        .route("/promotions", get(promotions::list))
        .route("/promotion", post(promotions::create))
        .route("/services", get(catalog::list).post(catalog::create))
        .route("/services/search", get(catalog::search))
        .route("/admin", post(admin::login))
        .route("/admin/", post(admin::login))
        .route(
            "/admin/:token/appointments",
            get(admin::list_appointments).post(admin::create_appointments),
        )
        .route(
            "/admin/:token/appointments/promotion",
            post(admin::create_promotional_appointments),
        )
        .route("/admin/:token/test-email", post(admin::test_email))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Admin check for routes that carry the token in `Authorization: Bearer`.
pub(crate) fn require_bearer(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    let header = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let token = header.strip_prefix("Bearer ").unwrap_or("").trim();

    let db = state.db()?;
    auth::authorize(&db, token)
}

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{Local, NaiveDate};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::appointment::parse_date;
use crate::models::{AppointmentDateTime, BookingConfirmation, BookingRequest, DayStatus, SlotView};
use crate::services::{availability, booking, email};
use crate::state::AppState;

pub(crate) fn date_param(raw: &str) -> Result<NaiveDate, AppError> {
    parse_date(raw).ok_or_else(|| AppError::Validation(format!("invalid date: {raw}")))
}

// GET /appointments/:date
pub async fn get_by_date(
    State(state): State<Arc<AppState>>,
    Path(raw_date): Path<String>,
) -> Result<Json<Vec<SlotView>>, AppError> {
    let date = date_param(&raw_date)?;
    let db = state.db()?;
    Ok(Json(availability::slots_on(&db, &date)?))
}

// GET /appointments/status
pub async fn get_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<DayStatus>>, AppError> {
    let now = Local::now().naive_local();
    let db = state.db()?;
    Ok(Json(availability::status_by_day(&db, &now)?))
}

// GET /appointments/:date/promotion/:promotion
pub async fn get_promotion_by_date(
    State(state): State<Arc<AppState>>,
    Path((raw_date, promotion)): Path<(String, String)>,
) -> Result<Json<Vec<SlotView>>, AppError> {
    let date = date_param(&raw_date)?;
    let db = state.db()?;
    Ok(Json(availability::promotion_slots_on(&db, &date, &promotion)?))
}

// GET /appointments/promotion/status/:promotion
pub async fn get_promotion_status(
    State(state): State<Arc<AppState>>,
    Path(promotion): Path<String>,
) -> Result<Json<Vec<DayStatus>>, AppError> {
    let now = Local::now().naive_local();
    let db = state.db()?;
    Ok(Json(availability::promotion_status_by_day(&db, &now, &promotion)?))
}

// GET /appointment/:id
pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<AppointmentDateTime>, AppError> {
    let db = state.db()?;
    Ok(Json(availability::appointment_time(&db, &id)?))
}

// POST /appointment
pub async fn request_booking(
    State(state): State<Arc<AppState>>,
    Json(body): Json<BookingRequest>,
) -> Result<Json<BookingConfirmation>, AppError> {
    let confirmation = {
        let mut db = state.db()?;
        booking::request_booking(&mut db, &body)?
    };

    // The booking is committed; mail delivery is best-effort from here.
    match &confirmation.client_email {
        Some(to) => {
            email::send_booking_confirmation(
                state.notifier.as_ref(),
                &state.config.consent_form_url,
                to,
                &confirmation.appointment_id,
                &confirmation.client_id,
            )
            .await;
        }
        None => tracing::info!(
            appointment_id = %confirmation.appointment_id,
            "client has no email, skipping confirmation"
        ),
    }

    Ok(Json(confirmation))
}

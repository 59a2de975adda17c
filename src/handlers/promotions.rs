use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::Promotion;
use crate::services::booking;
use crate::state::AppState;

// GET /promotions
pub async fn list(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Promotion>>, AppError> {
    let db = state.db()?;
    Ok(Json(queries::list_promotions(&db)?))
}

// POST /promotion
#[derive(Deserialize)]
pub struct NewPromotion {
    pub name: String,
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewPromotion>,
) -> Result<Json<Promotion>, AppError> {
    let db = state.db()?;
    let promotion = booking::create_promotion(&db, &body.name)?;
    tracing::info!(name = %promotion.name, "created promotion");
    Ok(Json(promotion))
}

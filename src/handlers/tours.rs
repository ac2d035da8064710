// src/handlers/tours.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    models::pricing::{CurrentPrice, Tour},
};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetCurrentTierPayload {
    pub tier_id: Uuid,
}

// GET /api/tours/{tour_id}/current-price
#[utoipa::path(
    get,
    path = "/api/tours/{tour_id}/current-price",
    tag = "Tours",
    responses(
        (status = 200, description = "Faixa vigente ou o preço padrão configurado", body = CurrentPrice),
        (status = 404, description = "Passeio não encontrado")
    ),
    params(("tour_id" = Uuid, Path, description = "ID do passeio"))
)]
pub async fn get_current_price(
    State(app_state): State<AppState>,
    Path(tour_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let price = app_state.pricing_service.current_price_or_default(tour_id).await?;
    Ok((StatusCode::OK, Json(price)))
}

// PUT /api/tours/{tour_id}/current-tier
#[utoipa::path(
    put,
    path = "/api/tours/{tour_id}/current-tier",
    tag = "Tours",
    request_body = SetCurrentTierPayload,
    responses(
        (status = 200, description = "Faixa vigente alterada", body = Tour),
        (status = 404, description = "Passeio ou faixa não encontrados")
    ),
    params(("tour_id" = Uuid, Path, description = "ID do passeio"))
)]
pub async fn set_current_tier(
    State(app_state): State<AppState>,
    Path(tour_id): Path<Uuid>,
    Json(payload): Json<SetCurrentTierPayload>,
) -> Result<impl IntoResponse, AppError> {
    let tour = app_state
        .pricing_service
        .set_current_tier(tour_id, payload.tier_id)
        .await?;
    Ok((StatusCode::OK, Json(tour)))
}

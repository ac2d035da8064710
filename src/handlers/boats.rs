// src/handlers/boats.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    models::{
        boat::{Boat, NewBoat},
        group::Group,
        reservation::Reservation,
    },
};

// POST /api/boats
#[utoipa::path(
    post,
    path = "/api/boats",
    tag = "Boats",
    request_body = NewBoat,
    responses(
        (status = 201, description = "Barco cadastrado", body = Boat),
        (status = 400, description = "Lotação ou preço inválidos")
    )
)]
pub async fn create_boat(
    State(app_state): State<AppState>,
    Json(payload): Json<NewBoat>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let boat = app_state.booking_service.create_boat(&payload).await?;

    Ok((StatusCode::CREATED, Json(boat)))
}

// GET /api/boats/{boat_id}
#[utoipa::path(
    get,
    path = "/api/boats/{boat_id}",
    tag = "Boats",
    responses(
        (status = 200, description = "Barco com contadores de lotação", body = Boat),
        (status = 404, description = "Barco não encontrado")
    ),
    params(("boat_id" = Uuid, Path, description = "ID do barco"))
)]
pub async fn get_boat(
    State(app_state): State<AppState>,
    Path(boat_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let boat = app_state.booking_service.get_boat(boat_id).await?;
    Ok((StatusCode::OK, Json(boat)))
}

// GET /api/boats/{boat_id}/groups
#[utoipa::path(
    get,
    path = "/api/boats/{boat_id}/groups",
    tag = "Boats",
    responses(
        (status = 200, description = "Reservas do barco agrupadas", body = Vec<Group>)
    ),
    params(("boat_id" = Uuid, Path, description = "ID do barco"))
)]
pub async fn list_boat_groups(
    State(app_state): State<AppState>,
    Path(boat_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let groups = app_state.booking_service.boat_groups(boat_id).await?;
    Ok((StatusCode::OK, Json(groups)))
}

// DELETE /api/boats/{boat_id}
#[utoipa::path(
    delete,
    path = "/api/boats/{boat_id}",
    tag = "Boats",
    responses(
        (status = 200, description = "Barco removido; devolve as reservas canceladas", body = Vec<Reservation>),
        (status = 404, description = "Barco não encontrado")
    ),
    params(("boat_id" = Uuid, Path, description = "ID do barco"))
)]
pub async fn delete_boat(
    State(app_state): State<AppState>,
    Path(boat_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let cancelled = app_state.booking_service.delete_boat(boat_id).await?;
    Ok((StatusCode::OK, Json(cancelled)))
}

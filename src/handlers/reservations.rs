// src/handlers/reservations.rs

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    models::{
        group::Group,
        reservation::{NewReservation, Payment, Reservation},
    },
    services::{
        booking_service::Reconciliation,
        checkin_service::{ApprovalRequest, CheckInOutcome, ReallocationRequest, SettlementResult},
        group_payment::PaymentChoice,
    },
};

/// Cabeçalho com a identificação do operador que registra o pagamento
const OPERATOR_HEADER: &str = "x-operator";

fn operator(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(OPERATOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

// =============================================================================
//  1. RESERVA
// =============================================================================

// POST /api/reservations
#[utoipa::path(
    post,
    path = "/api/reservations",
    tag = "Reservations",
    request_body = NewReservation,
    responses(
        (status = 201, description = "Reserva criada (pendente ou pré-reservada)", body = Reservation),
        (status = 400, description = "Dados inválidos")
    )
)]
pub async fn book(
    State(app_state): State<AppState>,
    Json(payload): Json<NewReservation>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let reservation = app_state.booking_service.book(&payload).await?;

    Ok((StatusCode::CREATED, Json(reservation)))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookGroupPayload {
    /// O primeiro membro vira o líder do grupo
    #[validate(length(min = 1, message = "O grupo precisa de ao menos um membro."), nested)]
    pub members: Vec<NewReservation>,
}

// POST /api/reservations/groups
#[utoipa::path(
    post,
    path = "/api/reservations/groups",
    tag = "Reservations",
    request_body = BookGroupPayload,
    responses(
        (status = 201, description = "Grupo criado", body = Group)
    )
)]
pub async fn book_group(
    State(app_state): State<AppState>,
    Json(payload): Json<BookGroupPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let group = app_state.booking_service.book_group(&payload.members).await?;

    Ok((StatusCode::CREATED, Json(group)))
}

// GET /api/reservations/{reservation_id}
#[utoipa::path(
    get,
    path = "/api/reservations/{reservation_id}",
    tag = "Reservations",
    responses(
        (status = 200, description = "Reserva", body = Reservation),
        (status = 404, description = "Reserva não encontrada")
    ),
    params(("reservation_id" = Uuid, Path, description = "ID da reserva"))
)]
pub async fn get_reservation(
    State(app_state): State<AppState>,
    Path(reservation_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let reservation = app_state.booking_service.get_reservation(reservation_id).await?;
    Ok((StatusCode::OK, Json(reservation)))
}

// =============================================================================
//  2. CICLO DE VIDA
// =============================================================================

// POST /api/reservations/{reservation_id}/approve
#[utoipa::path(
    post,
    path = "/api/reservations/{reservation_id}/approve",
    tag = "Reservations",
    request_body = ApprovalRequest,
    responses(
        (status = 200, description = "Reserva aprovada, assento ocupado", body = Reservation),
        (status = 409, description = "Barco ou sub-grupo lotado"),
        (status = 422, description = "Reserva não está pendente")
    ),
    params(
        ("reservation_id" = Uuid, Path, description = "ID da reserva"),
        ("x-operator" = Option<String>, Header, description = "Operador responsável")
    )
)]
pub async fn approve(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(reservation_id): Path<Uuid>,
    Json(payload): Json<ApprovalRequest>,
) -> Result<impl IntoResponse, AppError> {
    let reservation = app_state
        .checkin_service
        .approve(reservation_id, &payload, operator(&headers))
        .await?;
    Ok((StatusCode::OK, Json(reservation)))
}

// POST /api/reservations/{reservation_id}/reject
#[utoipa::path(
    post,
    path = "/api/reservations/{reservation_id}/reject",
    tag = "Reservations",
    responses(
        (status = 200, description = "Reserva cancelada (repetir é no-op)", body = Reservation),
        (status = 422, description = "Reserva já encerrada com outro status")
    ),
    params(("reservation_id" = Uuid, Path, description = "ID da reserva"))
)]
pub async fn reject(
    State(app_state): State<AppState>,
    Path(reservation_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let reservation = app_state.checkin_service.reject(reservation_id).await?;
    Ok((StatusCode::OK, Json(reservation)))
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NoShowPayload {
    #[validate(length(max = 500, message = "Motivo muito longo."))]
    #[schema(example = "Não compareceu ao embarque")]
    pub reason: Option<String>,
}

// POST /api/reservations/{reservation_id}/no-show
#[utoipa::path(
    post,
    path = "/api/reservations/{reservation_id}/no-show",
    tag = "Reservations",
    request_body = NoShowPayload,
    responses(
        (status = 200, description = "Reserva marcada como no-show", body = Reservation),
        (status = 422, description = "Reserva já encerrada com outro status")
    ),
    params(("reservation_id" = Uuid, Path, description = "ID da reserva"))
)]
pub async fn mark_no_show(
    State(app_state): State<AppState>,
    Path(reservation_id): Path<Uuid>,
    Json(payload): Json<NoShowPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let reservation = app_state
        .checkin_service
        .mark_no_show(reservation_id, payload.reason.as_deref())
        .await?;
    Ok((StatusCode::OK, Json(reservation)))
}

// POST /api/reservations/{reservation_id}/reallocate
#[utoipa::path(
    post,
    path = "/api/reservations/{reservation_id}/reallocate",
    tag = "Reservations",
    request_body = ReallocationRequest,
    responses(
        (status = 200, description = "Reserva realocada", body = Reservation),
        (status = 400, description = "Assento inválido ou ocupado"),
        (status = 409, description = "Barco de destino lotado")
    ),
    params(("reservation_id" = Uuid, Path, description = "ID da reserva"))
)]
pub async fn reallocate(
    State(app_state): State<AppState>,
    Path(reservation_id): Path<Uuid>,
    Json(payload): Json<ReallocationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let reservation = app_state
        .checkin_service
        .reallocate(reservation_id, &payload)
        .await?;
    Ok((StatusCode::OK, Json(reservation)))
}

// =============================================================================
//  3. CHECK-IN
// =============================================================================

// POST /api/reservations/{reservation_id}/check-in
#[utoipa::path(
    post,
    path = "/api/reservations/{reservation_id}/check-in",
    tag = "Reservations",
    responses(
        (status = 200, description = "Check-in concluído ou saldo a quitar", body = CheckInOutcome),
        (status = 422, description = "Reserva não aprovada ou já com check-in")
    ),
    params(("reservation_id" = Uuid, Path, description = "ID da reserva"))
)]
pub async fn check_in(
    State(app_state): State<AppState>,
    Path(reservation_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = app_state.checkin_service.check_in(reservation_id).await?;
    Ok((StatusCode::OK, Json(outcome)))
}

// POST /api/reservations/{reservation_id}/check-in/settle
#[utoipa::path(
    post,
    path = "/api/reservations/{reservation_id}/check-in/settle",
    tag = "Reservations",
    request_body = PaymentChoice,
    responses(
        (status = 200, description = "Grupo embarcado e pagamentos lançados", body = SettlementResult),
        (status = 409, description = "Pagamento insuficiente ou excedente (com a diferença)")
    ),
    params(
        ("reservation_id" = Uuid, Path, description = "ID de qualquer reserva do grupo"),
        ("x-operator" = Option<String>, Header, description = "Operador responsável")
    )
)]
pub async fn settle_check_in(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(reservation_id): Path<Uuid>,
    Json(payload): Json<PaymentChoice>,
) -> Result<impl IntoResponse, AppError> {
    let result = app_state
        .checkin_service
        .settle_check_in(reservation_id, &payload, operator(&headers))
        .await?;
    Ok((StatusCode::OK, Json(result)))
}

// POST /api/reservations/{reservation_id}/check-in/undo
#[utoipa::path(
    post,
    path = "/api/reservations/{reservation_id}/check-in/undo",
    tag = "Reservations",
    responses(
        (status = 200, description = "Check-in desfeito (pagamentos permanecem)", body = Reservation),
        (status = 422, description = "Reserva sem check-in")
    ),
    params(("reservation_id" = Uuid, Path, description = "ID da reserva"))
)]
pub async fn undo_check_in(
    State(app_state): State<AppState>,
    Path(reservation_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let reservation = app_state.checkin_service.undo_check_in(reservation_id).await?;
    Ok((StatusCode::OK, Json(reservation)))
}

// =============================================================================
//  4. PAGAMENTOS
// =============================================================================

// GET /api/reservations/{reservation_id}/payments
#[utoipa::path(
    get,
    path = "/api/reservations/{reservation_id}/payments",
    tag = "Reservations",
    responses(
        (status = 200, description = "Lançamentos da reserva", body = Vec<Payment>)
    ),
    params(("reservation_id" = Uuid, Path, description = "ID da reserva"))
)]
pub async fn list_payments(
    State(app_state): State<AppState>,
    Path(reservation_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let payments = app_state.booking_service.payments_for(reservation_id).await?;
    Ok((StatusCode::OK, Json(payments)))
}

// GET /api/reservations/{reservation_id}/reconciliation
#[utoipa::path(
    get,
    path = "/api/reservations/{reservation_id}/reconciliation",
    tag = "Reservations",
    responses(
        (status = 200, description = "Conferência entre livro e valor pago", body = Reconciliation)
    ),
    params(("reservation_id" = Uuid, Path, description = "ID da reserva"))
)]
pub async fn reconcile(
    State(app_state): State<AppState>,
    Path(reservation_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let reconciliation = app_state.booking_service.reconcile(reservation_id).await?;
    Ok((StatusCode::OK, Json(reconciliation)))
}

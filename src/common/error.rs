// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

// Códigos SQLSTATE que indicam conflito transitório (vale a pena tentar de novo)
const PG_SERIALIZATION_FAILURE: &str = "40001";
const PG_DEADLOCK_DETECTED: &str = "40P01";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // --- Capacidade ---
    #[error("Capacidade esgotada: {0}")]
    CapacityExceeded(String),

    // --- Valores ---
    #[error("Valor inválido: {0}")]
    InvalidAmount(String),

    #[error("Pagamento insuficiente: esperado {expected}, recebido {received}")]
    InsufficientPayment {
        expected: Decimal,
        received: Decimal,
        difference: Decimal,
    },

    #[error("Pagamento excedente: esperado {expected}, recebido {received}")]
    ExcessPayment {
        expected: Decimal,
        received: Decimal,
        difference: Decimal,
    },

    // --- Ciclo de vida ---
    #[error("Transição inválida: não é possível '{action}' a partir de '{from}'")]
    IllegalTransition { from: String, action: &'static str },

    #[error("Dados da reserva inválidos: {0}")]
    InvalidReservation(String),

    // --- Não encontrados ---
    #[error("Barco não encontrado: {0}")]
    BoatNotFound(Uuid),

    #[error("Reserva não encontrada: {0}")]
    ReservationNotFound(Uuid),

    #[error("Passeio não encontrado: {0}")]
    TourNotFound(Uuid),

    #[error("Faixa de preço não encontrada: {0}")]
    TierNotFound(Uuid),

    // --- Armazenamento ---
    #[error("Conflito de escrita concorrente")]
    StoreConflict,

    #[error("Operação '{operation}' falhou após {attempts} tentativas, tente novamente")]
    RetriesExhausted {
        operation: &'static str,
        attempts: u32,
    },

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    pub fn illegal(from: impl ToString, action: &'static str) -> Self {
        AppError::IllegalTransition {
            from: from.to_string(),
            action,
        }
    }

    /// Erros que a camada de orquestração pode repetir a partir de uma leitura nova.
    /// Validação, capacidade e transições nunca entram aqui.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::StoreConflict => true,
            AppError::DatabaseError(e) => match e {
                sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => true,
                sqlx::Error::Database(db_err) => matches!(
                    db_err.code().as_deref(),
                    Some(PG_SERIALIZATION_FAILURE) | Some(PG_DEADLOCK_DETECTED)
                ),
                _ => false,
            },
            _ => false,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            // Retorna todos os detalhes da validação.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }

            // A UI precisa da diferença exata para mostrar quanto falta/sobra
            AppError::InsufficientPayment { expected, received, difference } => {
                let body = Json(json!({
                    "error": "Pagamento insuficiente.",
                    "kind": "INSUFFICIENT_PAYMENT",
                    "expected": expected,
                    "received": received,
                    "shortfall": difference,
                }));
                return (StatusCode::CONFLICT, body).into_response();
            }
            AppError::ExcessPayment { expected, received, difference } => {
                let body = Json(json!({
                    "error": "Pagamento excedente.",
                    "kind": "EXCESS_PAYMENT",
                    "expected": expected,
                    "received": received,
                    "excess": difference,
                }));
                return (StatusCode::CONFLICT, body).into_response();
            }

            ref e @ AppError::CapacityExceeded(_) => (StatusCode::CONFLICT, e.to_string()),
            ref e @ AppError::StoreConflict => (StatusCode::CONFLICT, e.to_string()),
            ref e @ AppError::InvalidAmount(_) => (StatusCode::BAD_REQUEST, e.to_string()),
            ref e @ AppError::InvalidReservation(_) => (StatusCode::BAD_REQUEST, e.to_string()),
            ref e @ AppError::IllegalTransition { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
            }
            ref e @ (AppError::BoatNotFound(_)
            | AppError::ReservationNotFound(_)
            | AppError::TourNotFound(_)
            | AppError::TierNotFound(_)) => (StatusCode::NOT_FOUND, e.to_string()),
            ref e @ AppError::RetriesExhausted { .. } => {
                tracing::warn!("{}", e);
                (StatusCode::SERVICE_UNAVAILABLE, e.to_string())
            }

            // Todos os outros erros (DatabaseError, InternalServerError) viram 500.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Ocorreu um erro inesperado.".to_string(),
                )
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

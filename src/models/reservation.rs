// src/models/reservation.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{common::money::validate_not_negative, models::boat::ServiceSubType};

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "reservation_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Pending,
    PreReserved,
    Approved,
    Cancelled,
    NoShow,
}

impl ReservationStatus {
    /// Reservas que ainda ocupam (ou podem vir a ocupar) um assento.
    pub fn is_open(&self) -> bool {
        !matches!(self, ReservationStatus::Cancelled | ReservationStatus::NoShow)
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::PreReserved => "pre_reserved",
            ReservationStatus::Approved => "approved",
            ReservationStatus::Cancelled => "cancelled",
            ReservationStatus::NoShow => "no_show",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payment_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Pix,
    CreditCard,
    DebitCard,
    BankTransfer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payment_source", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentSource {
    Approval,
    Checkin,
}

// --- Structs ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: Uuid,

    // Cliente
    #[schema(example = "Maria Silva")]
    pub customer_name: String,
    #[schema(example = "(48) 99999-8888")]
    pub customer_phone: Option<String>,
    #[schema(example = "123.456.789-00")]
    pub customer_document: Option<String>,

    // Saída
    pub boat_id: Uuid,
    #[schema(value_type = String, format = Date, example = "2025-01-15")]
    pub ride_date: NaiveDate,
    pub seat_number: Option<i32>,
    pub service_sub_type: Option<ServiceSubType>,

    // Ciclo de vida
    pub status: ReservationStatus,
    pub checked_in: bool,
    pub no_show_reason: Option<String>,

    // Grupo
    pub group_id: Option<Uuid>,
    pub is_group_leader: bool,

    // Valores (amount_paid + amount_due == total_amount)
    #[schema(example = "300.00")]
    pub total_amount: Decimal,
    #[schema(example = "100.00")]
    pub amount_paid: Decimal,
    #[schema(example = "200.00")]
    pub amount_due: Decimal,
    pub discount_amount: Option<Decimal>,
    pub discount_reason: Option<String>,

    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    pub fn money_consistent(&self) -> bool {
        crate::common::money::money_eq(self.amount_paid + self.amount_due, self.total_amount)
    }

    /// Recalcula o saldo devedor a partir do total e do pago, com piso em zero.
    pub fn refresh_amount_due(&mut self) {
        self.amount_due = (self.total_amount - self.amount_paid).max(Decimal::ZERO);
    }
}

/// Lançamento do livro de pagamentos. Só é inserido, nunca alterado.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,
    pub reservation_id: Uuid,
    #[schema(example = "80.00")]
    pub amount: Decimal,
    pub method: PaymentMethod,
    #[schema(example = "Sicredi 1234-5")]
    pub bank_account: Option<String>,
    pub source: PaymentSource,
    pub group_payment: bool,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Pedido de reserva (intenção de compra).
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewReservation {
    #[validate(length(min = 1, message = "O nome do cliente é obrigatório."))]
    #[schema(example = "Maria Silva")]
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub customer_document: Option<String>,
    pub boat_id: Uuid,
    pub seat_number: Option<i32>,
    pub service_sub_type: Option<ServiceSubType>,
    /// Valor explícito. Sem ele o total é cotado pelas idades dos passageiros.
    #[validate(custom(function = "validate_not_negative"))]
    pub total_amount: Option<Decimal>,
    /// Passeio cuja faixa de preço vigente será usada na cotação.
    pub tour_id: Option<Uuid>,
    #[serde(default)]
    #[schema(example = json!([35, 8]))]
    pub passenger_ages: Vec<u32>,
    #[serde(default)]
    pub pre_reserved: bool,
}

// src/models/boat.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::common::money::validate_not_negative;

// --- Enums ---

/// Escuna com um só grupo de assentos ou lancha com dois sub-grupos
/// (com desembarque / panorâmico).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "service_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    SinglePool,
    DualPool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "service_sub_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ServiceSubType {
    WithLanding,
    WithoutLanding,
}

impl fmt::Display for ServiceSubType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceSubType::WithLanding => write!(f, "com desembarque"),
            ServiceSubType::WithoutLanding => write!(f, "panorâmico"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "boat_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BoatStatus {
    Active,
    Inactive,
}

// --- Structs ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Boat {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,

    #[schema(example = "Escuna Pérola Negra")]
    pub name: String,

    #[schema(value_type = String, format = Date, example = "2025-01-15")]
    pub ride_date: NaiveDate,

    pub service_type: ServiceType,

    #[schema(example = 40)]
    pub seats_total: i32,
    #[schema(example = 12)]
    pub seats_taken: i32,

    // Só existem em barcos DualPool
    pub seats_with_landing_total: Option<i32>,
    pub seats_with_landing_taken: Option<i32>,
    pub seats_without_landing_total: Option<i32>,
    pub seats_without_landing_taken: Option<i32>,

    #[schema(example = "150.00")]
    pub ticket_price: Decimal,

    pub status: BoatStatus,

    /// Versão otimista usada no compare-and-swap do store
    #[schema(example = 3)]
    pub version: i64,

    pub created_at: DateTime<Utc>,
}

impl Boat {
    pub fn has_sub_pools(&self) -> bool {
        self.service_type == ServiceType::DualPool
    }

    pub fn seats_available(&self) -> i32 {
        (self.seats_total - self.seats_taken).max(0)
    }

    /// (total, ocupados) do sub-grupo pedido. `None` se o barco não tem sub-grupos.
    pub fn sub_pool(&self, sub_type: ServiceSubType) -> Option<(i32, i32)> {
        if !self.has_sub_pools() {
            return None;
        }
        let pool = match sub_type {
            ServiceSubType::WithLanding => {
                (self.seats_with_landing_total, self.seats_with_landing_taken)
            }
            ServiceSubType::WithoutLanding => (
                self.seats_without_landing_total,
                self.seats_without_landing_taken,
            ),
        };
        Some((pool.0.unwrap_or(0), pool.1.unwrap_or(0)))
    }

    pub(crate) fn sub_pool_taken_mut(&mut self, sub_type: ServiceSubType) -> &mut Option<i32> {
        match sub_type {
            ServiceSubType::WithLanding => &mut self.seats_with_landing_taken,
            ServiceSubType::WithoutLanding => &mut self.seats_without_landing_taken,
        }
    }

    /// Invariantes de capacidade do barco:
    /// ocupados <= total, sub-grupos dentro do limite e somando o total ocupado.
    pub fn counters_consistent(&self) -> bool {
        if self.seats_taken < 0 || self.seats_taken > self.seats_total {
            return false;
        }
        if !self.has_sub_pools() {
            return true;
        }
        let with = self.sub_pool(ServiceSubType::WithLanding).unwrap_or((0, 0));
        let without = self.sub_pool(ServiceSubType::WithoutLanding).unwrap_or((0, 0));
        with.1 >= 0
            && without.1 >= 0
            && with.1 <= with.0
            && without.1 <= without.0
            && with.1 + without.1 == self.seats_taken
    }
}

/// Dados para cadastrar um barco (saída) novo.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewBoat {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    #[schema(example = "Lancha Netuno")]
    pub name: String,
    #[schema(value_type = String, format = Date, example = "2025-01-15")]
    pub ride_date: NaiveDate,
    pub service_type: ServiceType,
    #[validate(range(min = 1, message = "O barco precisa de ao menos um assento."))]
    #[schema(example = 30)]
    pub seats_total: i32,
    #[validate(range(min = 0, message = "O valor não pode ser negativo."))]
    pub seats_with_landing_total: Option<i32>,
    #[validate(range(min = 0, message = "O valor não pode ser negativo."))]
    pub seats_without_landing_total: Option<i32>,
    #[validate(custom(function = "validate_not_negative"))]
    #[schema(example = "150.00")]
    pub ticket_price: Decimal,
}

// src/models/pricing.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PricingTier {
    pub id: Uuid,
    #[schema(example = "Alta temporada")]
    pub label: String,
    #[schema(value_type = Option<String>, format = Date, example = "2025-12-15")]
    pub start_date: Option<NaiveDate>,
    #[schema(example = "150.00")]
    pub adult_price: Decimal,
    #[schema(example = "75.00")]
    pub child_price: Decimal,
    /// Até esta idade (inclusive) não paga
    #[schema(example = 5)]
    pub free_age_limit: i32,
    /// Até esta idade (inclusive) paga o valor de criança
    #[schema(example = 10)]
    pub half_price_age_limit: i32,
    pub is_current: bool,
}

/// Configuração de um passeio com as suas faixas de preço.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Tour {
    pub id: Uuid,
    #[schema(example = "Passeio Ilha do Campeche")]
    pub name: String,
    pub tiers: Vec<PricingTier>,
    pub version: i64,
}

/// Preço resolvido para a data (faixa vigente ou padrão configurado).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CurrentPrice {
    pub adult_price: Decimal,
    pub child_price: Decimal,
    pub free_age_limit: i32,
    pub half_price_age_limit: i32,
    pub label: String,
}

impl From<&PricingTier> for CurrentPrice {
    fn from(tier: &PricingTier) -> Self {
        Self {
            adult_price: tier.adult_price,
            child_price: tier.child_price,
            free_age_limit: tier.free_age_limit,
            half_price_age_limit: tier.half_price_age_limit,
            label: tier.label.clone(),
        }
    }
}

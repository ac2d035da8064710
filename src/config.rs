// src/config.rs

use std::{env, str::FromStr, sync::Arc, time::Duration};

use rust_decimal::Decimal;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{BookingStore, PgStore},
    models::pricing::CurrentPrice,
    services::{BookingService, CheckInService, PricingService},
};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Parâmetros do motor de reservas.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Quantas vezes uma transição é refeita após conflito de escrita
    pub max_transition_retries: u32,
    /// Preço usado quando o passeio não tem faixa vigente
    pub default_adult_price: Decimal,
    pub default_child_price: Decimal,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_transition_retries: DEFAULT_MAX_RETRIES,
            default_adult_price: Decimal::ZERO,
            default_child_price: Decimal::ZERO,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} inválida ('{}'): {}", key, raw, e)),
        Err(_) => Ok(default),
    }
}

impl EngineConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            max_transition_retries: env_or("MAX_TRANSITION_RETRIES", defaults.max_transition_retries)?,
            default_adult_price: env_or("DEFAULT_ADULT_PRICE", defaults.default_adult_price)?,
            default_child_price: env_or("DEFAULT_CHILD_PRICE", defaults.default_child_price)?,
        })
    }

    pub fn default_price(&self) -> CurrentPrice {
        CurrentPrice {
            adult_price: self.default_adult_price,
            child_price: self.default_child_price,
            free_age_limit: 0,
            half_price_age_limit: 0,
            label: "Padrão".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub bind_addr: String,
    pub booking_service: BookingService,
    pub checkin_service: CheckInService,
    pub pricing_service: PricingService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").map_err(|_| anyhow::anyhow!("DATABASE_URL deve ser definida"))?;
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let config = EngineConfig::from_env()?;

        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // --- Monta o gráfico de dependências ---
        let store: Arc<dyn BookingStore> = Arc::new(PgStore::new(db_pool.clone()));
        let services = Services::build(store, config);

        Ok(Self {
            db_pool,
            bind_addr,
            booking_service: services.booking,
            checkin_service: services.checkin,
            pricing_service: services.pricing,
        })
    }
}

/// Serviços ligados a um mesmo store.
#[derive(Clone)]
pub struct Services {
    pub booking: BookingService,
    pub checkin: CheckInService,
    pub pricing: PricingService,
}

impl Services {
    pub fn build(store: Arc<dyn BookingStore>, config: EngineConfig) -> Self {
        let pricing = PricingService::new(store.clone(), config.clone());
        let booking = BookingService::new(store.clone(), pricing.clone(), config.clone());
        let checkin = CheckInService::new(store, config);
        Self {
            booking,
            checkin,
            pricing,
        }
    }
}

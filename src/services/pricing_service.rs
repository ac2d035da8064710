// src/services/pricing_service.rs

use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::{error::AppError, retry::with_retries},
    config::EngineConfig,
    db::{BookingStore, WriteBatch},
    models::pricing::{CurrentPrice, Tour},
};

/// Regra de resolução de preço. Funções puras sobre a configuração do passeio.
pub struct PricingResolver;

impl PricingResolver {
    /// Faixa marcada como vigente. `None` é um estado legítimo ("sem preço ativo").
    pub fn resolve_current_price(tour: &Tour) -> Option<CurrentPrice> {
        tour.tiers.iter().find(|t| t.is_current).map(CurrentPrice::from)
    }

    /// Deixa exatamente uma faixa vigente. Devolve `false` se nada mudou.
    pub fn set_current(tour: &mut Tour, tier_id: Uuid) -> Result<bool, AppError> {
        if !tour.tiers.iter().any(|t| t.id == tier_id) {
            return Err(AppError::TierNotFound(tier_id));
        }

        let mut changed = false;
        for tier in tour.tiers.iter_mut() {
            let should_be_current = tier.id == tier_id;
            if tier.is_current != should_be_current {
                tier.is_current = should_be_current;
                changed = true;
            }
        }
        Ok(changed)
    }

    /// Tarifa de um passageiro pela idade: grátis, criança ou adulto.
    pub fn fare_for_age(price: &CurrentPrice, age: u32) -> Decimal {
        let age = age as i64;
        if age <= price.free_age_limit as i64 {
            Decimal::ZERO
        } else if age <= price.half_price_age_limit as i64 {
            price.child_price
        } else {
            price.adult_price
        }
    }

    pub fn quote(price: &CurrentPrice, ages: &[u32]) -> Decimal {
        ages.iter().map(|&age| Self::fare_for_age(price, age)).sum()
    }
}

#[derive(Clone)]
pub struct PricingService {
    store: Arc<dyn BookingStore>,
    config: EngineConfig,
}

impl PricingService {
    pub fn new(store: Arc<dyn BookingStore>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    async fn load_tour(&self, tour_id: Uuid) -> Result<Tour, AppError> {
        self.store
            .get_tour(tour_id)
            .await?
            .ok_or(AppError::TourNotFound(tour_id))
    }

    pub async fn resolve_current_price(&self, tour_id: Uuid) -> Result<Option<CurrentPrice>, AppError> {
        let tour = self.load_tour(tour_id).await?;
        Ok(PricingResolver::resolve_current_price(&tour))
    }

    /// Preço vigente ou, na falta dele, o padrão configurado.
    pub async fn current_price_or_default(&self, tour_id: Uuid) -> Result<CurrentPrice, AppError> {
        match self.resolve_current_price(tour_id).await? {
            Some(price) => Ok(price),
            None => {
                tracing::info!(%tour_id, "Passeio sem faixa vigente, usando preço padrão");
                Ok(self.config.default_price())
            }
        }
    }

    pub async fn set_current_tier(&self, tour_id: Uuid, tier_id: Uuid) -> Result<Tour, AppError> {
        with_retries("set_current_tier", self.config.max_transition_retries, move || {
            self.try_set_current_tier(tour_id, tier_id)
        })
        .await
    }

    async fn try_set_current_tier(&self, tour_id: Uuid, tier_id: Uuid) -> Result<Tour, AppError> {
        let mut tour = self.load_tour(tour_id).await?;
        if !PricingResolver::set_current(&mut tour, tier_id)? {
            return Ok(tour);
        }

        let mut batch = WriteBatch::default();
        batch.tours.push(tour);
        let mut committed = self.store.commit(batch).await?;

        tracing::info!(%tour_id, %tier_id, "Faixa de preço vigente alterada");
        committed
            .tours
            .pop()
            .ok_or_else(|| anyhow::anyhow!("commit não devolveu o passeio").into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::pricing::PricingTier;

    fn tier(label: &str, current: bool) -> PricingTier {
        PricingTier {
            id: Uuid::new_v4(),
            label: label.into(),
            start_date: None,
            adult_price: Decimal::from(150),
            child_price: Decimal::from(75),
            free_age_limit: 5,
            half_price_age_limit: 10,
            is_current: current,
        }
    }

    fn tour(tiers: Vec<PricingTier>) -> Tour {
        Tour {
            id: Uuid::new_v4(),
            name: "Campeche".into(),
            tiers,
            version: 1,
        }
    }

    #[test]
    fn no_current_tier_resolves_to_none() {
        let t = tour(vec![tier("baixa", false), tier("alta", false)]);
        assert!(PricingResolver::resolve_current_price(&t).is_none());
    }

    #[test]
    fn set_current_leaves_exactly_one() {
        let mut t = tour(vec![tier("baixa", true), tier("alta", false)]);
        let alta = t.tiers[1].id;

        assert!(PricingResolver::set_current(&mut t, alta).unwrap());
        assert_eq!(t.tiers.iter().filter(|t| t.is_current).count(), 1);
        assert_eq!(PricingResolver::resolve_current_price(&t).unwrap().label, "alta");

        // idempotente
        let snapshot = t.clone();
        assert!(!PricingResolver::set_current(&mut t, alta).unwrap());
        assert_eq!(t, snapshot);
    }

    #[test]
    fn unknown_tier_is_rejected() {
        let mut t = tour(vec![tier("baixa", true)]);
        assert!(matches!(
            PricingResolver::set_current(&mut t, Uuid::new_v4()),
            Err(AppError::TierNotFound(_))
        ));
    }

    #[test]
    fn fares_by_age() {
        let price = CurrentPrice::from(&tier("alta", true));
        assert_eq!(PricingResolver::fare_for_age(&price, 5), Decimal::ZERO);
        assert_eq!(PricingResolver::fare_for_age(&price, 6), Decimal::from(75));
        assert_eq!(PricingResolver::fare_for_age(&price, 10), Decimal::from(75));
        assert_eq!(PricingResolver::fare_for_age(&price, 11), Decimal::from(150));
        assert_eq!(PricingResolver::quote(&price, &[40, 38, 8, 3]), Decimal::from(375));
    }
}

mod common;

use rust_decimal::Decimal;
use uuid::Uuid;

use common::{harness, harness_with, new_reservation};
use reservas_backend::{
    common::error::AppError,
    config::EngineConfig,
    db::{BookingStore, WriteBatch},
    models::pricing::{PricingTier, Tour},
};

fn tier(label: &str, adult: i64, child: i64, current: bool) -> PricingTier {
    PricingTier {
        id: Uuid::new_v4(),
        label: label.to_string(),
        start_date: None,
        adult_price: Decimal::from(adult),
        child_price: Decimal::from(child),
        free_age_limit: 5,
        half_price_age_limit: 10,
        is_current: current,
    }
}

async fn seed_tour(store: &dyn BookingStore, tiers: Vec<PricingTier>) -> Tour {
    let mut batch = WriteBatch::default();
    batch.tours.push(Tour {
        id: Uuid::new_v4(),
        name: "Passeio Ilha do Campeche".into(),
        tiers,
        version: 0,
    });
    store.commit(batch).await.unwrap().tours.remove(0)
}

#[tokio::test]
async fn booking_quotes_by_passenger_age() {
    let h = harness();
    let boat = h.single_pool_boat(10).await;
    let tour = seed_tour(h.store.as_ref(), vec![tier("Alta", 150, 75, true)]).await;

    let mut request = new_reservation(boat.id, "Família Souza", 0, None);
    request.total_amount = None;
    request.tour_id = Some(tour.id);
    request.passenger_ages = vec![35, 8, 3];

    let reservation = h.services.booking.book(&request).await.unwrap();

    assert_eq!(reservation.total_amount, Decimal::from(225));
    assert_eq!(reservation.amount_due, Decimal::from(225));
    assert!(reservation.money_consistent());
}

#[tokio::test]
async fn booking_without_tour_uses_boat_price() {
    let h = harness();
    let boat = h.single_pool_boat(10).await;
    let mut request = new_reservation(boat.id, "Ana", 0, None);
    request.total_amount = None;
    request.passenger_ages = vec![30, 32];

    let reservation = h.services.booking.book(&request).await.unwrap();

    assert_eq!(reservation.total_amount, Decimal::from(200));
}

#[tokio::test]
async fn set_current_tier_leaves_exactly_one() {
    let h = harness();
    let low = tier("Baixa", 100, 50, true);
    let high = tier("Alta", 150, 75, false);
    let high_id = high.id;
    let tour = seed_tour(h.store.as_ref(), vec![low, high]).await;

    let updated = h
        .services
        .pricing
        .set_current_tier(tour.id, high_id)
        .await
        .unwrap();

    assert_eq!(updated.tiers.iter().filter(|t| t.is_current).count(), 1);
    let price = h.services.pricing.resolve_current_price(tour.id).await.unwrap().unwrap();
    assert_eq!(price.label, "Alta");
    assert_eq!(price.adult_price, Decimal::from(150));
}

#[tokio::test]
async fn unknown_tier_is_rejected() {
    let h = harness();
    let tour = seed_tour(h.store.as_ref(), vec![tier("Baixa", 100, 50, true)]).await;

    let err = h
        .services
        .pricing
        .set_current_tier(tour.id, Uuid::new_v4())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::TierNotFound(_)));
}

#[tokio::test]
async fn missing_current_tier_falls_back_to_configured_price() {
    let h = harness_with(EngineConfig {
        default_adult_price: Decimal::from(120),
        default_child_price: Decimal::from(60),
        ..EngineConfig::default()
    });
    let tour = seed_tour(h.store.as_ref(), vec![tier("Baixa", 100, 50, false)]).await;

    assert!(h.services.pricing.resolve_current_price(tour.id).await.unwrap().is_none());
    let price = h.services.pricing.current_price_or_default(tour.id).await.unwrap();
    assert_eq!(price.adult_price, Decimal::from(120));
    assert_eq!(price.child_price, Decimal::from(60));
}

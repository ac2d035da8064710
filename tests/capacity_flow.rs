mod common;

use rust_decimal::Decimal;
use uuid::Uuid;

use common::{harness, new_reservation, Harness};
use reservas_backend::{
    common::error::AppError,
    db::{BookingStore, ReservationFilter, WriteBatch},
    models::{boat::ServiceSubType, reservation::ReservationStatus},
    services::checkin_service::{ApprovalRequest, ReallocationRequest},
};

async fn assert_counters(h: &Harness, boats: &[Uuid], step: &str) {
    for &id in boats {
        let boat = h.boat(id).await;
        assert!(boat.counters_consistent(), "contadores inconsistentes após {step}: {boat:?}");
    }
}

fn move_to(boat: Uuid, sub: Option<ServiceSubType>) -> ReallocationRequest {
    ReallocationRequest {
        target_boat_id: boat,
        target_seat: None,
        target_sub_type: sub,
    }
}

#[tokio::test]
async fn approvals_stop_at_capacity() {
    let h = harness();
    let boat = h.single_pool_boat(2).await;
    let a = h.book(&boat, "Ana", 100).await;
    let b = h.book(&boat, "Bruno", 100).await;
    let c = h.book(&boat, "Carla", 100).await;

    h.approve(&a, Decimal::ZERO).await;
    h.approve(&b, Decimal::ZERO).await;
    let err = h
        .services
        .checkin
        .approve(c.id, &ApprovalRequest::default(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::CapacityExceeded(_)));
    let boat = h.boat(boat.id).await;
    assert_eq!(boat.seats_taken, 2);
    assert!(boat.counters_consistent());
    assert_eq!(h.reservation(c.id).await.status, ReservationStatus::Pending);
}

#[tokio::test]
async fn full_sub_pool_rejects_even_with_total_room() {
    let h = harness();
    let boat = h.dual_pool_boat(1, 5).await;
    let first = h.book_sub(&boat, "Ana", ServiceSubType::WithLanding).await;
    let second = h.book_sub(&boat, "Bruno", ServiceSubType::WithLanding).await;
    let panoramic = h.book_sub(&boat, "Carla", ServiceSubType::WithoutLanding).await;

    h.approve(&first, Decimal::ZERO).await;
    let err = h
        .services
        .checkin
        .approve(second.id, &ApprovalRequest::default(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::CapacityExceeded(_)));

    h.approve(&panoramic, Decimal::ZERO).await;
    let boat = h.boat(boat.id).await;
    assert_eq!(boat.seats_taken, 2);
    assert_eq!(boat.sub_pool(ServiceSubType::WithLanding), Some((1, 1)));
    assert_eq!(boat.sub_pool(ServiceSubType::WithoutLanding), Some((5, 1)));
    assert!(boat.counters_consistent());
}

#[tokio::test]
async fn dual_pool_booking_requires_sub_type() {
    let h = harness();
    let boat = h.dual_pool_boat(2, 2).await;

    let err = h
        .services
        .booking
        .book(&new_reservation(boat.id, "Ana", 150, None))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InvalidReservation(_)));
}

#[tokio::test]
async fn repeated_cancel_releases_once() {
    let h = harness();
    let boat = h.single_pool_boat(5).await;
    let a = h.book(&boat, "Ana", 100).await;
    let b = h.book(&boat, "Bruno", 100).await;
    h.approve(&a, Decimal::ZERO).await;
    h.approve(&b, Decimal::ZERO).await;

    let first = h.services.checkin.reject(a.id).await.unwrap();
    let second = h.services.checkin.reject(a.id).await.unwrap();

    assert_eq!(first.status, ReservationStatus::Cancelled);
    assert_eq!(second.status, ReservationStatus::Cancelled);
    assert_eq!(h.boat(boat.id).await.seats_taken, 1);
}

#[tokio::test]
async fn no_show_releases_seat_and_blocks_cancel() {
    let h = harness();
    let boat = h.single_pool_boat(5).await;
    let a = h.book(&boat, "Ana", 100).await;
    h.approve(&a, Decimal::ZERO).await;

    let marked = h
        .services
        .checkin
        .mark_no_show(a.id, Some("não apareceu"))
        .await
        .unwrap();
    assert_eq!(marked.status, ReservationStatus::NoShow);
    assert_eq!(marked.no_show_reason.as_deref(), Some("não apareceu"));
    assert_eq!(h.boat(boat.id).await.seats_taken, 0);

    let err = h.services.checkin.reject(a.id).await.unwrap_err();
    assert!(matches!(err, AppError::IllegalTransition { .. }));
}

#[tokio::test]
async fn cancelling_pending_keeps_counters() {
    let h = harness();
    let boat = h.single_pool_boat(5).await;
    let a = h.book(&boat, "Ana", 100).await;

    h.services.checkin.reject(a.id).await.unwrap();

    assert_eq!(h.boat(boat.id).await.seats_taken, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_approvals_take_the_last_seat_once() {
    let h = harness();
    let boat = h.single_pool_boat(1).await;

    let mut ids = Vec::new();
    for i in 0..8 {
        ids.push(h.book(&boat, &format!("Passageiro {}", i), 100).await.id);
    }

    let mut handles = Vec::new();
    for id in ids {
        let checkin = h.services.checkin.clone();
        handles.push(tokio::spawn(async move {
            checkin.approve(id, &ApprovalRequest::default(), None).await
        }));
    }

    let mut approved = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => approved += 1,
            Err(e) => assert!(matches!(e, AppError::CapacityExceeded(_)), "erro inesperado: {e}"),
        }
    }

    assert_eq!(approved, 1);
    let boat = h.boat(boat.id).await;
    assert_eq!(boat.seats_taken, 1);
    assert!(boat.counters_consistent());
}

#[tokio::test]
async fn reallocation_moves_the_seat_between_boats() {
    let h = harness();
    let from = h.single_pool_boat(5).await;
    let to = h.single_pool_boat(5).await;
    let a = h.book(&from, "Ana", 100).await;
    h.approve(&a, Decimal::ZERO).await;

    let moved = h
        .services
        .checkin
        .reallocate(
            a.id,
            &ReallocationRequest {
                target_boat_id: to.id,
                target_seat: Some(3),
                target_sub_type: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(moved.boat_id, to.id);
    assert_eq!(moved.seat_number, Some(3));
    assert_eq!(h.boat(from.id).await.seats_taken, 0);
    assert_eq!(h.boat(to.id).await.seats_taken, 1);
}

#[tokio::test]
async fn reallocation_to_full_boat_changes_nothing() {
    let h = harness();
    let from = h.single_pool_boat(5).await;
    let full = h.single_pool_boat(1).await;
    let occupant = h.book(&full, "Bruno", 100).await;
    h.approve(&occupant, Decimal::ZERO).await;
    let a = h.book(&from, "Ana", 100).await;
    h.approve(&a, Decimal::ZERO).await;

    let before = (h.reservation(a.id).await, h.boat(from.id).await, h.boat(full.id).await);

    let err = h
        .services
        .checkin
        .reallocate(
            a.id,
            &ReallocationRequest {
                target_boat_id: full.id,
                target_seat: None,
                target_sub_type: None,
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::CapacityExceeded(_)));
    let after = (h.reservation(a.id).await, h.boat(from.id).await, h.boat(full.id).await);
    assert_eq!(after, before);
}

#[tokio::test]
async fn reallocation_rejects_occupied_seat() {
    let h = harness();
    let boat = h.single_pool_boat(5).await;
    let mut request = new_reservation(boat.id, "Ana", 100, None);
    request.seat_number = Some(2);
    h.services.booking.book(&request).await.unwrap();
    let b = h.book(&boat, "Bruno", 100).await;

    let err = h
        .services
        .checkin
        .reallocate(
            b.id,
            &ReallocationRequest {
                target_boat_id: boat.id,
                target_seat: Some(2),
                target_sub_type: None,
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InvalidReservation(_)));
}

#[tokio::test]
async fn switching_sub_pool_on_same_boat() {
    let h = harness();
    let boat = h.dual_pool_boat(2, 2).await;
    let a = h.book_sub(&boat, "Ana", ServiceSubType::WithLanding).await;
    h.approve(&a, Decimal::ZERO).await;

    let switched = h
        .services
        .checkin
        .reallocate(
            a.id,
            &ReallocationRequest {
                target_boat_id: boat.id,
                target_seat: None,
                target_sub_type: Some(ServiceSubType::WithoutLanding),
            },
        )
        .await
        .unwrap();

    assert_eq!(switched.service_sub_type, Some(ServiceSubType::WithoutLanding));
    let boat = h.boat(boat.id).await;
    assert_eq!(boat.seats_taken, 1);
    assert_eq!(boat.sub_pool(ServiceSubType::WithLanding), Some((2, 0)));
    assert_eq!(boat.sub_pool(ServiceSubType::WithoutLanding), Some((2, 1)));
}

#[tokio::test]
async fn deleting_boat_cancels_open_reservations() {
    let h = harness();
    let boat = h.single_pool_boat(5).await;
    let approved = h.book(&boat, "Ana", 100).await;
    h.approve(&approved, Decimal::ZERO).await;
    let pending = h.book(&boat, "Bruno", 100).await;

    let cancelled = h.services.booking.delete_boat(boat.id).await.unwrap();

    assert_eq!(cancelled.len(), 2);
    assert!(h.store.get_boat(boat.id).await.unwrap().is_none());
    for id in [approved.id, pending.id] {
        assert_eq!(h.reservation(id).await.status, ReservationStatus::Cancelled);
    }
    assert!(matches!(
        h.services.booking.get_boat(boat.id).await,
        Err(AppError::BoatNotFound(_))
    ));
}

#[tokio::test]
async fn dual_pool_boat_requires_matching_sub_totals() {
    let h = harness();
    let err = h
        .services
        .booking
        .create_boat(&reservas_backend::models::boat::NewBoat {
            name: "Lancha".into(),
            ride_date: common::ride_date(),
            service_type: reservas_backend::models::boat::ServiceType::DualPool,
            seats_total: 10,
            seats_with_landing_total: Some(4),
            seats_without_landing_total: Some(5),
            ticket_price: Decimal::from(150),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InvalidReservation(_)));
}

#[tokio::test]
async fn dual_pool_counters_hold_across_mixed_operations() {
    use ServiceSubType::{WithLanding, WithoutLanding};

    let h = harness();
    let first = h.dual_pool_boat(1, 1).await;
    let second = h.dual_pool_boat(1, 1).await;
    let boats = [first.id, second.id];
    let checkin = &h.services.checkin;

    let a = h.book_sub(&first, "Ana", WithLanding).await;
    let b = h.book_sub(&first, "Bruno", WithoutLanding).await;
    let c = h.book_sub(&first, "Carla", WithLanding).await;
    h.approve(&a, Decimal::ZERO).await;
    h.approve(&b, Decimal::ZERO).await;
    assert_counters(&h, &boats, "aprovar A e B").await;

    let err = checkin.approve(c.id, &ApprovalRequest::default(), None).await.unwrap_err();
    assert!(matches!(err, AppError::CapacityExceeded(_)));
    assert_counters(&h, &boats, "aprovação recusada de C").await;

    checkin.reallocate(a.id, &move_to(second.id, None)).await.unwrap();
    assert_counters(&h, &boats, "realocar A").await;
    assert_eq!(h.boat(first.id).await.sub_pool(WithLanding), Some((1, 0)));
    assert_eq!(h.boat(second.id).await.sub_pool(WithLanding), Some((1, 1)));

    h.approve(&c, Decimal::ZERO).await;
    assert_counters(&h, &boats, "aprovar C").await;

    let err = checkin.reallocate(c.id, &move_to(second.id, None)).await.unwrap_err();
    assert!(matches!(err, AppError::CapacityExceeded(_)));
    assert_counters(&h, &boats, "realocação recusada de C").await;

    let err = checkin
        .reallocate(b.id, &move_to(second.id, Some(WithLanding)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::CapacityExceeded(_)));
    assert_counters(&h, &boats, "realocação recusada de B").await;
    assert_eq!(h.reservation(b.id).await.boat_id, first.id);

    checkin.mark_no_show(b.id, Some("não apareceu")).await.unwrap();
    assert_counters(&h, &boats, "no-show de B").await;

    checkin.reject(a.id).await.unwrap();
    assert_counters(&h, &boats, "cancelar A").await;

    let first = h.boat(first.id).await;
    let second = h.boat(second.id).await;
    assert_eq!(first.seats_taken, 1);
    assert_eq!(first.sub_pool(WithLanding), Some((1, 1)));
    assert_eq!(first.sub_pool(WithoutLanding), Some((1, 0)));
    assert_eq!(second.seats_taken, 0);
}

#[tokio::test]
async fn booking_checks_the_boat_version() {
    let h = harness();
    let boat = h.single_pool_boat(5).await;

    h.book(&boat, "Ana", 100).await;

    let after = h.boat(boat.id).await;
    assert_eq!(after.version, boat.version + 1);
    assert_eq!(after.seats_taken, 0);
}

#[tokio::test]
async fn booking_against_a_deleted_boat_stores_nothing() {
    let h = harness();
    let boat = h.single_pool_boat(5).await;
    let request = new_reservation(boat.id, "Ana", 100, None);

    // lote montado com a leitura anterior à exclusão
    let stale = {
        let mut batch = WriteBatch::default();
        let mut reservation = h.book(&boat, "Bruno", 100).await;
        reservation.id = Uuid::new_v4();
        reservation.version = 0;
        batch.put_boat(h.boat(boat.id).await).put_reservation(reservation);
        batch
    };
    h.services.booking.delete_boat(boat.id).await.unwrap();

    let err = h.store.commit(stale).await.unwrap_err();
    assert!(matches!(err, AppError::StoreConflict));

    let err = h.services.booking.book(&request).await.unwrap_err();
    assert!(matches!(err, AppError::BoatNotFound(_)));
    let left = h
        .store
        .query_reservations(&ReservationFilter::by_boat(boat.id))
        .await
        .unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].status, ReservationStatus::Cancelled);
}

#[tokio::test]
async fn booking_retries_a_conflicting_commit() {
    let h = harness();
    let boat = h.single_pool_boat(5).await;
    h.store.inject_conflicts(1);

    let reservation = h.book(&boat, "Ana", 100).await;

    let stored = h
        .store
        .query_reservations(&ReservationFilter::by_boat(boat.id))
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, reservation.id);
}

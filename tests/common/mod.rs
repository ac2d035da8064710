#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use reservas_backend::{
    config::{EngineConfig, Services},
    db::{BookingStore, MemoryStore},
    models::{
        boat::{Boat, NewBoat, ServiceSubType, ServiceType},
        reservation::{NewReservation, Reservation},
    },
    services::checkin_service::ApprovalRequest,
};

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub services: Services,
}

pub fn harness() -> Harness {
    harness_with(EngineConfig::default())
}

pub fn harness_with(config: EngineConfig) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let shared: Arc<dyn BookingStore> = store.clone();
    Harness {
        store,
        services: Services::build(shared, config),
    }
}

pub fn reais(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

pub fn ride_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
}

impl Harness {
    pub async fn single_pool_boat(&self, seats: i32) -> Boat {
        self.services
            .booking
            .create_boat(&NewBoat {
                name: "Escuna Pérola".into(),
                ride_date: ride_date(),
                service_type: ServiceType::SinglePool,
                seats_total: seats,
                seats_with_landing_total: None,
                seats_without_landing_total: None,
                ticket_price: Decimal::from(100),
            })
            .await
            .unwrap()
    }

    pub async fn dual_pool_boat(&self, with_landing: i32, without_landing: i32) -> Boat {
        self.services
            .booking
            .create_boat(&NewBoat {
                name: "Lancha Netuno".into(),
                ride_date: ride_date(),
                service_type: ServiceType::DualPool,
                seats_total: with_landing + without_landing,
                seats_with_landing_total: Some(with_landing),
                seats_without_landing_total: Some(without_landing),
                ticket_price: Decimal::from(150),
            })
            .await
            .unwrap()
    }

    pub async fn book(&self, boat: &Boat, name: &str, total: i64) -> Reservation {
        self.services
            .booking
            .book(&new_reservation(boat.id, name, total, None))
            .await
            .unwrap()
    }

    pub async fn book_sub(&self, boat: &Boat, name: &str, sub: ServiceSubType) -> Reservation {
        self.services
            .booking
            .book(&new_reservation(boat.id, name, 150, Some(sub)))
            .await
            .unwrap()
    }

    pub async fn approve(&self, reservation: &Reservation, paid: Decimal) -> Reservation {
        self.services
            .checkin
            .approve(
                reservation.id,
                &ApprovalRequest {
                    amount_paid: paid,
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap()
    }

    /// Grupo aprovado sem sinal, um membro por total informado.
    pub async fn approved_group(&self, boat: &Boat, totals: &[i64]) -> Vec<Reservation> {
        let requests: Vec<NewReservation> = totals
            .iter()
            .enumerate()
            .map(|(i, &total)| new_reservation(boat.id, &format!("Membro {}", i + 1), total, None))
            .collect();
        let group = self.services.booking.book_group(&requests).await.unwrap();

        let mut approved = Vec::new();
        for member in &group.members {
            approved.push(self.approve(member, Decimal::ZERO).await);
        }
        approved
    }

    pub async fn boat(&self, id: Uuid) -> Boat {
        self.store.get_boat(id).await.unwrap().unwrap()
    }

    pub async fn reservation(&self, id: Uuid) -> Reservation {
        self.store.get_reservation(id).await.unwrap().unwrap()
    }
}

pub fn new_reservation(
    boat_id: Uuid,
    name: &str,
    total: i64,
    sub: Option<ServiceSubType>,
) -> NewReservation {
    NewReservation {
        customer_name: name.to_string(),
        customer_phone: None,
        customer_document: None,
        boat_id,
        seat_number: None,
        service_sub_type: sub,
        total_amount: Some(Decimal::from(total)),
        tour_id: None,
        passenger_ages: Vec::new(),
        pre_reserved: false,
    }
}

// src/services/booking_service.rs

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::{error::AppError, money, retry::with_retries},
    config::EngineConfig,
    db::{BookingStore, ReservationFilter, WriteBatch},
    models::{
        boat::{Boat, BoatStatus, NewBoat, ServiceType},
        group::{self, Group},
        reservation::{NewReservation, Payment, Reservation, ReservationStatus},
    },
    services::{
        pricing_service::{PricingResolver, PricingService},
        reservation_state::ReservationStateMachine,
    },
};

/// Conferência entre o livro de pagamentos e o `amount_paid` da reserva.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Reconciliation {
    pub reservation_id: Uuid,
    pub amount_paid: Decimal,
    pub ledger_total: Decimal,
    pub discount_amount: Decimal,
    /// amount_paid - soma dos lançamentos
    pub difference: Decimal,
    /// Diferença explicada pelo desconto (cortesias aparecem aqui como não conciliadas)
    pub balanced: bool,
}

#[derive(Clone)]
pub struct BookingService {
    store: Arc<dyn BookingStore>,
    pricing: PricingService,
    config: EngineConfig,
}

impl BookingService {
    pub fn new(store: Arc<dyn BookingStore>, pricing: PricingService, config: EngineConfig) -> Self {
        Self {
            store,
            pricing,
            config,
        }
    }

    // =========================================================================
    //  BARCOS
    // =========================================================================

    pub async fn create_boat(&self, new_boat: &NewBoat) -> Result<Boat, AppError> {
        money::validate_amount(new_boat.ticket_price, "ticketPrice")?;
        if new_boat.seats_total < 1 {
            return Err(AppError::InvalidReservation(
                "o barco precisa de ao menos um assento".into(),
            ));
        }

        let (with_total, without_total) = match new_boat.service_type {
            ServiceType::DualPool => {
                let (Some(with), Some(without)) = (
                    new_boat.seats_with_landing_total,
                    new_boat.seats_without_landing_total,
                ) else {
                    return Err(AppError::InvalidReservation(
                        "barco com sub-grupos exige a lotação de cada sub-grupo".into(),
                    ));
                };
                if with < 0 || without < 0 || with + without != new_boat.seats_total {
                    return Err(AppError::InvalidReservation(format!(
                        "sub-grupos ({} + {}) não somam a lotação total ({})",
                        with, without, new_boat.seats_total
                    )));
                }
                (Some(with), Some(without))
            }
            ServiceType::SinglePool => (None, None),
        };

        let boat = Boat {
            id: Uuid::new_v4(),
            name: new_boat.name.trim().to_string(),
            ride_date: new_boat.ride_date,
            service_type: new_boat.service_type,
            seats_total: new_boat.seats_total,
            seats_taken: 0,
            seats_with_landing_total: with_total,
            seats_with_landing_taken: with_total.map(|_| 0),
            seats_without_landing_total: without_total,
            seats_without_landing_taken: without_total.map(|_| 0),
            ticket_price: new_boat.ticket_price,
            status: BoatStatus::Active,
            version: 0,
            created_at: Utc::now(),
        };

        let mut batch = WriteBatch::default();
        batch.put_boat(boat);
        let mut committed = self.store.commit(batch).await?;

        let boat = committed
            .boats
            .pop()
            .ok_or_else(|| AppError::from(anyhow::anyhow!("commit não devolveu o barco")))?;
        tracing::info!(boat_id = %boat.id, seats = boat.seats_total, "Barco cadastrado");
        Ok(boat)
    }

    pub async fn get_boat(&self, boat_id: Uuid) -> Result<Boat, AppError> {
        self.store
            .get_boat(boat_id)
            .await?
            .ok_or(AppError::BoatNotFound(boat_id))
    }

    /// Reservas do barco agrupadas (grupos e individuais).
    pub async fn boat_groups(&self, boat_id: Uuid) -> Result<Vec<Group>, AppError> {
        self.get_boat(boat_id).await?;
        let reservations = self
            .store
            .query_reservations(&ReservationFilter::by_boat(boat_id))
            .await?;
        Ok(group::group_by(reservations))
    }

    /// Remove o barco e cancela, no mesmo lote, toda reserva ainda aberta nele.
    /// As reservas continuam gravadas (histórico e pagamentos).
    pub async fn delete_boat(&self, boat_id: Uuid) -> Result<Vec<Reservation>, AppError> {
        with_retries("delete_boat", self.config.max_transition_retries, move || {
            self.try_delete_boat(boat_id)
        })
        .await
    }

    async fn try_delete_boat(&self, boat_id: Uuid) -> Result<Vec<Reservation>, AppError> {
        let boat = self.get_boat(boat_id).await?;
        let open = self
            .store
            .query_reservations(&ReservationFilter::by_boat(boat_id).with_statuses(&[
                ReservationStatus::Pending,
                ReservationStatus::PreReserved,
                ReservationStatus::Approved,
            ]))
            .await?;

        let mut batch = WriteBatch::default();
        for mut reservation in open {
            // Sem barco não há contador a devolver
            ReservationStateMachine::cancel(&mut reservation, None)?;
            batch.put_reservation(reservation);
        }
        batch.deleted_boats.push(boat);

        let committed = self.store.commit(batch).await?;
        tracing::info!(%boat_id, cancelled = committed.reservations.len(), "Barco removido");
        Ok(committed.reservations)
    }

    // =========================================================================
    //  RESERVAS
    // =========================================================================

    /// Cria uma reserva pendente. O barco vai no lote sem alteração para que a
    /// versão dele seja conferida contra uma exclusão concorrente.
    pub async fn book(&self, request: &NewReservation) -> Result<Reservation, AppError> {
        with_retries("book", self.config.max_transition_retries, move || self.try_book(request)).await
    }

    async fn try_book(&self, request: &NewReservation) -> Result<Reservation, AppError> {
        let boat = self.get_boat(request.boat_id).await?;
        let total = self.resolve_total(&boat, request).await?;
        let reservation = Self::build_reservation(&boat, request, total, None)?;

        let mut batch = WriteBatch::default();
        batch.put_boat(boat.clone()).put_reservation(reservation);
        let mut committed = self.store.commit(batch).await?;

        let reservation = committed
            .reservations
            .pop()
            .ok_or_else(|| AppError::from(anyhow::anyhow!("commit não devolveu a reserva")))?;
        tracing::info!(reservation_id = %reservation.id, boat_id = %boat.id, total = %reservation.total_amount, "Reserva criada");
        Ok(reservation)
    }

    /// Cria as reservas de um grupo com um `group_id` novo. O primeiro membro é o líder.
    pub async fn book_group(&self, requests: &[NewReservation]) -> Result<Group, AppError> {
        if requests.is_empty() {
            return Err(AppError::InvalidReservation("grupo sem membros".into()));
        }
        with_retries("book_group", self.config.max_transition_retries, move || {
            self.try_book_group(requests)
        })
        .await
    }

    async fn try_book_group(&self, requests: &[NewReservation]) -> Result<Group, AppError> {
        let group_id = Uuid::new_v4();
        let mut boats: HashMap<Uuid, Boat> = HashMap::new();
        let mut batch = WriteBatch::default();

        for (idx, request) in requests.iter().enumerate() {
            if !boats.contains_key(&request.boat_id) {
                let boat = self.get_boat(request.boat_id).await?;
                boats.insert(boat.id, boat);
            }
            let boat = &boats[&request.boat_id];
            let total = self.resolve_total(boat, request).await?;
            let mut reservation = Self::build_reservation(boat, request, total, Some(group_id))?;
            reservation.is_group_leader = idx == 0;
            batch.put_reservation(reservation);
        }
        for boat in boats.into_values() {
            batch.put_boat(boat);
        }

        let committed = self.store.commit(batch).await?;
        tracing::info!(%group_id, members = committed.reservations.len(), "Reserva de grupo criada");
        Group::from_members(Some(group_id), committed.reservations)
            .ok_or_else(|| AppError::from(anyhow::anyhow!("commit não devolveu o grupo")))
    }

    pub async fn get_reservation(&self, reservation_id: Uuid) -> Result<Reservation, AppError> {
        self.store
            .get_reservation(reservation_id)
            .await?
            .ok_or(AppError::ReservationNotFound(reservation_id))
    }

    pub async fn payments_for(&self, reservation_id: Uuid) -> Result<Vec<Payment>, AppError> {
        self.get_reservation(reservation_id).await?;
        self.store.list_payments(reservation_id).await
    }

    pub async fn reconcile(&self, reservation_id: Uuid) -> Result<Reconciliation, AppError> {
        let reservation = self.get_reservation(reservation_id).await?;
        let payments = self.store.list_payments(reservation_id).await?;

        let ledger_total = money::sum(payments.iter().map(|p| &p.amount));
        let discount_amount = reservation.discount_amount.unwrap_or(Decimal::ZERO);
        let difference = reservation.amount_paid - ledger_total;
        let balanced = money::money_eq(difference, discount_amount);

        if !balanced {
            tracing::debug!(%reservation_id, %difference, %discount_amount, "Livro de pagamentos não concilia com amount_paid");
        }

        Ok(Reconciliation {
            reservation_id,
            amount_paid: reservation.amount_paid,
            ledger_total,
            discount_amount,
            difference,
            balanced,
        })
    }

    /// Valor explícito; senão cotação pela faixa vigente do passeio; senão o preço do barco.
    async fn resolve_total(&self, boat: &Boat, request: &NewReservation) -> Result<Decimal, AppError> {
        if let Some(total) = request.total_amount {
            money::validate_amount(total, "totalAmount")?;
            return Ok(total);
        }

        let passengers = request.passenger_ages.len().max(1);
        let total = match request.tour_id {
            Some(tour_id) => {
                let price = self.pricing.current_price_or_default(tour_id).await?;
                if request.passenger_ages.is_empty() {
                    price.adult_price
                } else {
                    PricingResolver::quote(&price, &request.passenger_ages)
                }
            }
            None => boat
                .ticket_price
                .checked_mul(Decimal::from(passengers as u64))
                .ok_or_else(|| AppError::InvalidAmount("total da reserva fora do limite".into()))?,
        };
        let total = money::round_money(total);
        money::validate_amount(total, "totalAmount")?;
        Ok(total)
    }

    fn build_reservation(
        boat: &Boat,
        request: &NewReservation,
        total: Decimal,
        group_id: Option<Uuid>,
    ) -> Result<Reservation, AppError> {
        if request.customer_name.trim().is_empty() {
            return Err(AppError::InvalidReservation("nome do cliente é obrigatório".into()));
        }
        if boat.status != BoatStatus::Active {
            return Err(AppError::InvalidReservation(format!(
                "barco '{}' está inativo",
                boat.name
            )));
        }
        if let Some(seat) = request.seat_number {
            if seat < 1 || seat > boat.seats_total {
                return Err(AppError::InvalidReservation(format!(
                    "assento {} fora da faixa 1..={} do barco '{}'",
                    seat, boat.seats_total, boat.name
                )));
            }
        }

        let service_sub_type = if boat.has_sub_pools() {
            Some(request.service_sub_type.ok_or_else(|| {
                AppError::InvalidReservation(format!("barco '{}' exige o tipo de serviço", boat.name))
            })?)
        } else {
            None
        };

        let now = Utc::now();
        Ok(Reservation {
            id: Uuid::new_v4(),
            customer_name: request.customer_name.trim().to_string(),
            customer_phone: request.customer_phone.clone(),
            customer_document: request.customer_document.clone(),
            boat_id: boat.id,
            ride_date: boat.ride_date,
            seat_number: request.seat_number,
            service_sub_type,
            status: if request.pre_reserved {
                ReservationStatus::PreReserved
            } else {
                ReservationStatus::Pending
            },
            checked_in: false,
            no_show_reason: None,
            group_id,
            is_group_leader: false,
            total_amount: total,
            amount_paid: Decimal::ZERO,
            amount_due: total,
            discount_amount: None,
            discount_reason: None,
            version: 0,
            created_at: now,
            updated_at: now,
        })
    }
}

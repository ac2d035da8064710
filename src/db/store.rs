// src/db/store.rs

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        boat::Boat,
        pricing::Tour,
        reservation::{Payment, Reservation, ReservationStatus},
    },
};

/// Filtro de consulta de reservas. Campos vazios não filtram.
#[derive(Debug, Clone, Default)]
pub struct ReservationFilter {
    pub boat_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub statuses: Vec<ReservationStatus>,
}

impl ReservationFilter {
    pub fn by_boat(boat_id: Uuid) -> Self {
        Self {
            boat_id: Some(boat_id),
            ..Self::default()
        }
    }

    pub fn by_group(group_id: Uuid) -> Self {
        Self {
            group_id: Some(group_id),
            ..Self::default()
        }
    }

    pub fn with_statuses(mut self, statuses: &[ReservationStatus]) -> Self {
        self.statuses = statuses.to_vec();
        self
    }

    pub fn matches(&self, reservation: &Reservation) -> bool {
        self.boat_id.is_none_or(|id| reservation.boat_id == id)
            && self.group_id.is_none_or(|id| reservation.group_id == Some(id))
            && (self.statuses.is_empty() || self.statuses.contains(&reservation.status))
    }
}

/// Unidade de trabalho: tudo o que uma transição grava, aplicado de uma vez.
///
/// Cada registro leva a versão que foi lida. Versão 0 significa registro novo.
/// Se qualquer versão não bater com a gravada, o lote inteiro é recusado com
/// `AppError::StoreConflict` e nada é aplicado.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    pub boats: Vec<Boat>,
    pub deleted_boats: Vec<Boat>,
    pub reservations: Vec<Reservation>,
    pub payments: Vec<Payment>,
    pub tours: Vec<Tour>,
}

impl WriteBatch {
    pub fn put_boat(&mut self, boat: Boat) -> &mut Self {
        match self.boats.iter_mut().find(|b| b.id == boat.id) {
            Some(existing) => *existing = boat,
            None => self.boats.push(boat),
        }
        self
    }

    pub fn put_reservation(&mut self, reservation: Reservation) -> &mut Self {
        match self.reservations.iter_mut().find(|r| r.id == reservation.id) {
            Some(existing) => *existing = reservation,
            None => self.reservations.push(reservation),
        }
        self
    }

    pub fn append_payments(&mut self, payments: impl IntoIterator<Item = Payment>) -> &mut Self {
        self.payments.extend(payments);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.boats.is_empty()
            && self.deleted_boats.is_empty()
            && self.reservations.is_empty()
            && self.payments.is_empty()
            && self.tours.is_empty()
    }
}

/// O colaborador de armazenamento de documentos usado pelo motor.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn get_boat(&self, id: Uuid) -> Result<Option<Boat>, AppError>;

    async fn get_reservation(&self, id: Uuid) -> Result<Option<Reservation>, AppError>;

    /// Resultado ordenado por criação e id.
    async fn query_reservations(&self, filter: &ReservationFilter) -> Result<Vec<Reservation>, AppError>;

    async fn list_payments(&self, reservation_id: Uuid) -> Result<Vec<Payment>, AppError>;

    async fn get_tour(&self, id: Uuid) -> Result<Option<Tour>, AppError>;

    /// Aplica o lote atomicamente. Devolve os registros com as versões gravadas.
    async fn commit(&self, batch: WriteBatch) -> Result<WriteBatch, AppError>;
}

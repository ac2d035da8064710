// src/db/memory_store.rs

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::{BookingStore, ReservationFilter, WriteBatch},
    models::{
        boat::Boat,
        pricing::Tour,
        reservation::{Payment, Reservation},
    },
};

#[derive(Default)]
struct Inner {
    boats: HashMap<Uuid, Boat>,
    reservations: HashMap<Uuid, Reservation>,
    payments: Vec<Payment>,
    tours: HashMap<Uuid, Tour>,
}

/// Store em memória com a mesma semântica de compare-and-swap do Postgres.
/// Um único mutex serializa os commits; leituras devolvem cópias.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    injected_conflicts: AtomicU32,
}

fn check_version<T>(current: Option<&T>, version: i64, current_version: impl Fn(&T) -> i64) -> Result<(), AppError> {
    match (current, version) {
        (None, 0) => Ok(()),
        (Some(existing), v) if v > 0 && current_version(existing) == v => Ok(()),
        _ => Err(AppError::StoreConflict),
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Faz os próximos `n` commits falharem com `StoreConflict`.
    pub fn inject_conflicts(&self, n: u32) {
        self.injected_conflicts.store(n, Ordering::SeqCst);
    }

    pub async fn all_payments(&self) -> Vec<Payment> {
        self.inner.lock().await.payments.clone()
    }

    fn take_injected_conflict(&self) -> bool {
        self.injected_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn get_boat(&self, id: Uuid) -> Result<Option<Boat>, AppError> {
        Ok(self.inner.lock().await.boats.get(&id).cloned())
    }

    async fn get_reservation(&self, id: Uuid) -> Result<Option<Reservation>, AppError> {
        Ok(self.inner.lock().await.reservations.get(&id).cloned())
    }

    async fn query_reservations(&self, filter: &ReservationFilter) -> Result<Vec<Reservation>, AppError> {
        let inner = self.inner.lock().await;
        let mut found: Vec<Reservation> = inner
            .reservations
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(found)
    }

    async fn list_payments(&self, reservation_id: Uuid) -> Result<Vec<Payment>, AppError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .payments
            .iter()
            .filter(|p| p.reservation_id == reservation_id)
            .cloned()
            .collect())
    }

    async fn get_tour(&self, id: Uuid) -> Result<Option<Tour>, AppError> {
        Ok(self.inner.lock().await.tours.get(&id).cloned())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<WriteBatch, AppError> {
        let mut inner = self.inner.lock().await;

        if self.take_injected_conflict() {
            return Err(AppError::StoreConflict);
        }

        // 1. Valida todas as versões antes de aplicar qualquer coisa
        for boat in batch.boats.iter().chain(&batch.deleted_boats) {
            check_version(inner.boats.get(&boat.id), boat.version, |b| b.version)?;
        }
        for reservation in &batch.reservations {
            check_version(
                inner.reservations.get(&reservation.id),
                reservation.version,
                |r| r.version,
            )?;
        }
        for tour in &batch.tours {
            check_version(inner.tours.get(&tour.id), tour.version, |t| t.version)?;
        }
        if batch
            .payments
            .iter()
            .any(|p| inner.payments.iter().any(|existing| existing.id == p.id))
        {
            return Err(AppError::StoreConflict);
        }

        // 2. Aplica
        let mut committed = WriteBatch::default();
        for mut boat in batch.boats {
            boat.version += 1;
            inner.boats.insert(boat.id, boat.clone());
            committed.boats.push(boat);
        }
        for boat in batch.deleted_boats {
            inner.boats.remove(&boat.id);
            committed.deleted_boats.push(boat);
        }
        for mut reservation in batch.reservations {
            reservation.version += 1;
            inner.reservations.insert(reservation.id, reservation.clone());
            committed.reservations.push(reservation);
        }
        for mut tour in batch.tours {
            tour.version += 1;
            inner.tours.insert(tour.id, tour.clone());
            committed.tours.push(tour);
        }
        inner.payments.extend(batch.payments.iter().cloned());
        committed.payments = batch.payments;

        Ok(committed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::boat::{BoatStatus, ServiceType};
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;

    fn boat() -> Boat {
        Boat {
            id: Uuid::new_v4(),
            name: "Escuna".into(),
            ride_date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            service_type: ServiceType::SinglePool,
            seats_total: 10,
            seats_taken: 0,
            seats_with_landing_total: None,
            seats_with_landing_taken: None,
            seats_without_landing_total: None,
            seats_without_landing_taken: None,
            ticket_price: Decimal::from(100),
            status: BoatStatus::Active,
            version: 0,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn stale_version_rejects_whole_batch() {
        let store = MemoryStore::new();
        let mut batch = WriteBatch::default();
        batch.put_boat(boat());
        let stored = store.commit(batch).await.unwrap().boats.remove(0);
        assert_eq!(stored.version, 1);

        // Primeiro escritor ganha
        let mut first = stored.clone();
        first.seats_taken = 1;
        let mut batch = WriteBatch::default();
        batch.put_boat(first);
        store.commit(batch).await.unwrap();

        // Segundo escritor leu a versão 1 e perde tudo, inclusive o barco novo
        let mut second = stored.clone();
        second.seats_taken = 1;
        let other = boat();
        let other_id = other.id;
        let mut batch = WriteBatch::default();
        batch.put_boat(other).put_boat(second);

        let err = store.commit(batch).await.unwrap_err();
        assert!(matches!(err, AppError::StoreConflict));
        assert!(store.get_boat(other_id).await.unwrap().is_none());
        assert_eq!(store.get_boat(stored.id).await.unwrap().unwrap().version, 2);
    }

    #[tokio::test]
    async fn new_record_cannot_overwrite_existing() {
        let store = MemoryStore::new();
        let b = boat();
        let mut batch = WriteBatch::default();
        batch.put_boat(b.clone());
        store.commit(batch.clone()).await.unwrap();

        assert!(matches!(store.commit(batch).await, Err(AppError::StoreConflict)));
    }

    #[tokio::test]
    async fn injected_conflicts_are_consumed() {
        let store = MemoryStore::new();
        store.inject_conflicts(1);

        let mut batch = WriteBatch::default();
        batch.put_boat(boat());
        assert!(matches!(store.commit(batch.clone()).await, Err(AppError::StoreConflict)));
        assert!(store.commit(batch).await.is_ok());
    }
}

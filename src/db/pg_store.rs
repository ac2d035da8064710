// src/db/pg_store.rs

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::{BookingStore, ReservationFilter, WriteBatch},
    models::{
        boat::Boat,
        pricing::{PricingTier, Tour},
        reservation::{Payment, Reservation},
    },
};

/// Store Postgres. Cada `commit` é uma transação; atualizações usam
/// `WHERE id = $1 AND version = $2` e zero linhas afetadas aborta o lote.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

/// Garante que a escrita atingiu exatamente uma linha.
/// Caso contrário a versão mudou: a transação é descartada (rollback no drop).
fn expect_one_row(rows: u64) -> Result<(), AppError> {
    if rows == 1 {
        Ok(())
    } else {
        Err(AppError::StoreConflict)
    }
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  BARCOS
    // =========================================================================

    async fn write_boat(conn: &mut PgConnection, mut boat: Boat) -> Result<Boat, AppError> {
        let result = if boat.version == 0 {
            sqlx::query(
                r#"
                INSERT INTO boats (
                    id, name, ride_date, service_type, seats_total, seats_taken,
                    seats_with_landing_total, seats_with_landing_taken,
                    seats_without_landing_total, seats_without_landing_taken,
                    ticket_price, status, version, created_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, 1, $13)
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(boat.id)
            .bind(&boat.name)
            .bind(boat.ride_date)
            .bind(boat.service_type)
            .bind(boat.seats_total)
            .bind(boat.seats_taken)
            .bind(boat.seats_with_landing_total)
            .bind(boat.seats_with_landing_taken)
            .bind(boat.seats_without_landing_total)
            .bind(boat.seats_without_landing_taken)
            .bind(boat.ticket_price)
            .bind(boat.status)
            .bind(boat.created_at)
            .execute(&mut *conn)
            .await?
        } else {
            sqlx::query(
                r#"
                UPDATE boats
                SET name = $3, ride_date = $4, service_type = $5,
                    seats_total = $6, seats_taken = $7,
                    seats_with_landing_total = $8, seats_with_landing_taken = $9,
                    seats_without_landing_total = $10, seats_without_landing_taken = $11,
                    ticket_price = $12, status = $13,
                    version = version + 1
                WHERE id = $1 AND version = $2
                "#,
            )
            .bind(boat.id)
            .bind(boat.version)
            .bind(&boat.name)
            .bind(boat.ride_date)
            .bind(boat.service_type)
            .bind(boat.seats_total)
            .bind(boat.seats_taken)
            .bind(boat.seats_with_landing_total)
            .bind(boat.seats_with_landing_taken)
            .bind(boat.seats_without_landing_total)
            .bind(boat.seats_without_landing_taken)
            .bind(boat.ticket_price)
            .bind(boat.status)
            .execute(&mut *conn)
            .await?
        };

        expect_one_row(result.rows_affected())?;
        boat.version += 1;
        Ok(boat)
    }

    async fn delete_boat(conn: &mut PgConnection, boat: &Boat) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM boats WHERE id = $1 AND version = $2")
            .bind(boat.id)
            .bind(boat.version)
            .execute(&mut *conn)
            .await?;
        expect_one_row(result.rows_affected())
    }

    // =========================================================================
    //  RESERVAS
    // =========================================================================

    async fn write_reservation(
        conn: &mut PgConnection,
        mut reservation: Reservation,
    ) -> Result<Reservation, AppError> {
        let result = if reservation.version == 0 {
            sqlx::query(
                r#"
                INSERT INTO reservations (
                    id, customer_name, customer_phone, customer_document,
                    boat_id, ride_date, seat_number, service_sub_type,
                    status, checked_in, no_show_reason, group_id, is_group_leader,
                    total_amount, amount_paid, amount_due, discount_amount, discount_reason,
                    version, created_at, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                        $14, $15, $16, $17, $18, 1, $19, $20)
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(reservation.id)
            .bind(&reservation.customer_name)
            .bind(&reservation.customer_phone)
            .bind(&reservation.customer_document)
            .bind(reservation.boat_id)
            .bind(reservation.ride_date)
            .bind(reservation.seat_number)
            .bind(reservation.service_sub_type)
            .bind(reservation.status)
            .bind(reservation.checked_in)
            .bind(&reservation.no_show_reason)
            .bind(reservation.group_id)
            .bind(reservation.is_group_leader)
            .bind(reservation.total_amount)
            .bind(reservation.amount_paid)
            .bind(reservation.amount_due)
            .bind(reservation.discount_amount)
            .bind(&reservation.discount_reason)
            .bind(reservation.created_at)
            .bind(reservation.updated_at)
            .execute(&mut *conn)
            .await?
        } else {
            sqlx::query(
                r#"
                UPDATE reservations
                SET customer_name = $3, customer_phone = $4, customer_document = $5,
                    boat_id = $6, ride_date = $7, seat_number = $8, service_sub_type = $9,
                    status = $10, checked_in = $11, no_show_reason = $12,
                    total_amount = $13, amount_paid = $14, amount_due = $15,
                    discount_amount = $16, discount_reason = $17,
                    updated_at = $18,
                    version = version + 1
                WHERE id = $1 AND version = $2
                "#,
            )
            .bind(reservation.id)
            .bind(reservation.version)
            .bind(&reservation.customer_name)
            .bind(&reservation.customer_phone)
            .bind(&reservation.customer_document)
            .bind(reservation.boat_id)
            .bind(reservation.ride_date)
            .bind(reservation.seat_number)
            .bind(reservation.service_sub_type)
            .bind(reservation.status)
            .bind(reservation.checked_in)
            .bind(&reservation.no_show_reason)
            .bind(reservation.total_amount)
            .bind(reservation.amount_paid)
            .bind(reservation.amount_due)
            .bind(reservation.discount_amount)
            .bind(&reservation.discount_reason)
            .bind(reservation.updated_at)
            .execute(&mut *conn)
            .await?
        };

        expect_one_row(result.rows_affected())?;
        reservation.version += 1;
        Ok(reservation)
    }

    // Livro de pagamentos: só INSERT
    async fn append_payment(conn: &mut PgConnection, payment: &Payment) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                id, reservation_id, amount, method, bank_account,
                source, group_payment, created_by, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(payment.id)
        .bind(payment.reservation_id)
        .bind(payment.amount)
        .bind(payment.method)
        .bind(&payment.bank_account)
        .bind(payment.source)
        .bind(payment.group_payment)
        .bind(&payment.created_by)
        .bind(payment.created_at)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    // =========================================================================
    //  PASSEIOS / FAIXAS DE PREÇO
    // =========================================================================

    async fn write_tour(conn: &mut PgConnection, mut tour: Tour) -> Result<Tour, AppError> {
        let result = if tour.version == 0 {
            sqlx::query(
                "INSERT INTO tours (id, name, version) VALUES ($1, $2, 1) ON CONFLICT (id) DO NOTHING",
            )
            .bind(tour.id)
            .bind(&tour.name)
            .execute(&mut *conn)
            .await?
        } else {
            sqlx::query(
                "UPDATE tours SET name = $3, version = version + 1 WHERE id = $1 AND version = $2",
            )
            .bind(tour.id)
            .bind(tour.version)
            .bind(&tour.name)
            .execute(&mut *conn)
            .await?
        };
        expect_one_row(result.rows_affected())?;

        // Desmarca antes de marcar: o índice único de faixa vigente é checado por linha
        let ordered = tour
            .tiers
            .iter()
            .filter(|t| !t.is_current)
            .chain(tour.tiers.iter().filter(|t| t.is_current));
        for tier in ordered {
            sqlx::query(
                r#"
                INSERT INTO pricing_tiers (
                    id, tour_id, label, start_date, adult_price, child_price,
                    free_age_limit, half_price_age_limit, is_current
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ON CONFLICT (id) DO UPDATE SET
                    label = EXCLUDED.label,
                    start_date = EXCLUDED.start_date,
                    adult_price = EXCLUDED.adult_price,
                    child_price = EXCLUDED.child_price,
                    free_age_limit = EXCLUDED.free_age_limit,
                    half_price_age_limit = EXCLUDED.half_price_age_limit,
                    is_current = EXCLUDED.is_current
                "#,
            )
            .bind(tier.id)
            .bind(tour.id)
            .bind(&tier.label)
            .bind(tier.start_date)
            .bind(tier.adult_price)
            .bind(tier.child_price)
            .bind(tier.free_age_limit)
            .bind(tier.half_price_age_limit)
            .bind(tier.is_current)
            .execute(&mut *conn)
            .await?;
        }

        tour.version += 1;
        Ok(tour)
    }
}

#[async_trait]
impl BookingStore for PgStore {
    async fn get_boat(&self, id: Uuid) -> Result<Option<Boat>, AppError> {
        let boat = sqlx::query_as::<_, Boat>("SELECT * FROM boats WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(boat)
    }

    async fn get_reservation(&self, id: Uuid) -> Result<Option<Reservation>, AppError> {
        let reservation = sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(reservation)
    }

    async fn query_reservations(&self, filter: &ReservationFilter) -> Result<Vec<Reservation>, AppError> {
        let reservations = sqlx::query_as::<_, Reservation>(
            r#"
            SELECT * FROM reservations
            WHERE ($1::uuid IS NULL OR boat_id = $1)
              AND ($2::uuid IS NULL OR group_id = $2)
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(filter.boat_id)
        .bind(filter.group_id)
        .fetch_all(&self.pool)
        .await?;

        // Filtro de status em memória (lista curta por barco/grupo)
        Ok(reservations.into_iter().filter(|r| filter.matches(r)).collect())
    }

    async fn list_payments(&self, reservation_id: Uuid) -> Result<Vec<Payment>, AppError> {
        let payments = sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE reservation_id = $1 ORDER BY created_at ASC, id ASC",
        )
        .bind(reservation_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(payments)
    }

    async fn get_tour(&self, id: Uuid) -> Result<Option<Tour>, AppError> {
        let row = sqlx::query_as::<_, (Uuid, String, i64)>("SELECT id, name, version FROM tours WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some((id, name, version)) = row else {
            return Ok(None);
        };

        let tiers = sqlx::query_as::<_, PricingTier>(
            r#"
            SELECT * FROM pricing_tiers
            WHERE tour_id = $1
            ORDER BY start_date ASC NULLS FIRST, label ASC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(Tour { id, name, tiers, version }))
    }

    async fn commit(&self, batch: WriteBatch) -> Result<WriteBatch, AppError> {
        let mut tx = self.pool.begin().await?;
        let mut committed = WriteBatch::default();

        for boat in batch.boats {
            committed.boats.push(Self::write_boat(&mut tx, boat).await?);
        }
        for reservation in batch.reservations {
            committed
                .reservations
                .push(Self::write_reservation(&mut tx, reservation).await?);
        }
        for boat in batch.deleted_boats {
            Self::delete_boat(&mut tx, &boat).await?;
            committed.deleted_boats.push(boat);
        }
        for payment in &batch.payments {
            Self::append_payment(&mut tx, payment).await?;
        }
        committed.payments = batch.payments;
        for tour in batch.tours {
            committed.tours.push(Self::write_tour(&mut tx, tour).await?);
        }

        tx.commit().await?;
        Ok(committed)
    }
}

// src/services/reservation_state.rs

use chrono::Utc;
use rust_decimal::Decimal;

use crate::{
    common::{error::AppError, money},
    models::{
        boat::{Boat, BoatStatus, ServiceSubType},
        reservation::{Reservation, ReservationStatus},
    },
    services::capacity_ledger::CapacityLedger,
};

/// Resultado de cancelar / marcar no-show: indica se um assento foi devolvido.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    Released,
    NothingToRelease,
    AlreadyClosed,
}

/// Destino de uma realocação.
#[derive(Debug, Clone, Copy)]
pub struct SeatTarget {
    pub seat_number: Option<i32>,
    pub sub_type: Option<ServiceSubType>,
}

/// Regras do ciclo de vida de uma reserva.
///
/// Cada transição valida tudo antes de tocar em qualquer campo e só então
/// chama o `CapacityLedger`. Em erro, reserva e barco ficam como estavam.
pub struct ReservationStateMachine;

impl ReservationStateMachine {
    // =========================================================================
    //  APROVAÇÃO
    // =========================================================================

    pub fn approve(
        reservation: &mut Reservation,
        boat: &mut Boat,
        amount_paid: Decimal,
    ) -> Result<(), AppError> {
        if !matches!(
            reservation.status,
            ReservationStatus::Pending | ReservationStatus::PreReserved
        ) {
            return Err(AppError::illegal(reservation.status, "aprovar"));
        }
        Self::ensure_boat_matches(reservation, boat)?;

        // Validação de valor antes da capacidade
        money::validate_amount(amount_paid, "amountPaid")?;
        if amount_paid > reservation.total_amount {
            return Err(AppError::InvalidAmount(format!(
                "amountPaid ({}) maior que o total da reserva ({})",
                amount_paid, reservation.total_amount
            )));
        }

        CapacityLedger::reserve_seat(boat, reservation.service_sub_type)?;

        reservation.status = ReservationStatus::Approved;
        reservation.amount_paid = amount_paid;
        reservation.amount_due = reservation.total_amount - amount_paid;
        reservation.updated_at = Utc::now();
        Ok(())
    }

    // =========================================================================
    //  CANCELAMENTO / NO-SHOW
    // =========================================================================

    pub fn cancel(reservation: &mut Reservation, boat: Option<&mut Boat>) -> Result<Release, AppError> {
        Self::close(reservation, boat, ReservationStatus::Cancelled)
    }

    pub fn mark_no_show(
        reservation: &mut Reservation,
        boat: Option<&mut Boat>,
        reason: Option<String>,
    ) -> Result<Release, AppError> {
        let release = Self::close(reservation, boat, ReservationStatus::NoShow)?;
        if release != Release::AlreadyClosed {
            reservation.no_show_reason = reason;
        }
        Ok(release)
    }

    fn close(
        reservation: &mut Reservation,
        boat: Option<&mut Boat>,
        target: ReservationStatus,
    ) -> Result<Release, AppError> {
        // Repetir o mesmo fechamento é no-op (retentativas seguras)
        if reservation.status == target {
            return Ok(Release::AlreadyClosed);
        }
        if !reservation.status.is_open() {
            let action = match target {
                ReservationStatus::NoShow => "marcar no-show",
                _ => "cancelar",
            };
            return Err(AppError::illegal(reservation.status, action));
        }

        // Só reservas aprovadas ocupam assento
        let release = if reservation.status == ReservationStatus::Approved {
            match boat {
                Some(boat) => {
                    Self::ensure_boat_matches(reservation, boat)?;
                    if CapacityLedger::release_seat(boat, reservation.service_sub_type) {
                        Release::Released
                    } else {
                        Release::NothingToRelease
                    }
                }
                // Barco removido: não há contador a devolver
                None => Release::NothingToRelease,
            }
        } else {
            Release::NothingToRelease
        };

        reservation.status = target;
        reservation.checked_in = false;
        reservation.updated_at = Utc::now();
        Ok(release)
    }

    // =========================================================================
    //  CHECK-IN
    // =========================================================================

    pub fn ensure_can_check_in(reservation: &Reservation) -> Result<(), AppError> {
        if reservation.status != ReservationStatus::Approved {
            return Err(AppError::illegal(reservation.status, "fazer check-in"));
        }
        if reservation.checked_in {
            return Err(AppError::illegal("checked_in", "fazer check-in"));
        }
        Ok(())
    }

    /// Check-in sem dinheiro envolvido (saldo zero ou pagamento já resolvido).
    pub fn check_in(reservation: &mut Reservation) -> Result<(), AppError> {
        Self::ensure_can_check_in(reservation)?;
        reservation.checked_in = true;
        reservation.updated_at = Utc::now();
        Ok(())
    }

    /// Desfaz o check-in de uma reserva só. Pagamentos já lançados permanecem.
    pub fn undo_check_in(reservation: &mut Reservation) -> Result<(), AppError> {
        if reservation.status != ReservationStatus::Approved || !reservation.checked_in {
            return Err(AppError::illegal(reservation.status, "desfazer check-in"));
        }
        reservation.checked_in = false;
        reservation.updated_at = Utc::now();
        Ok(())
    }

    // =========================================================================
    //  REALOCAÇÃO
    // =========================================================================

    /// Troca de barco. `to` é `None` quando o destino é o próprio barco atual
    /// (troca de assento ou de sub-grupo).
    pub fn reassign(
        reservation: &mut Reservation,
        from: &mut Boat,
        to: Option<&mut Boat>,
        target: SeatTarget,
    ) -> Result<(), AppError> {
        if !reservation.status.is_open() {
            return Err(AppError::illegal(reservation.status, "realocar"));
        }
        Self::ensure_boat_matches(reservation, from)?;

        let occupies_seat = reservation.status == ReservationStatus::Approved;
        let current_sub = reservation.service_sub_type;

        match to {
            Some(to) => {
                let new_sub = Self::validate_target(reservation, to, target)?;
                if occupies_seat {
                    CapacityLedger::move_seat(from, current_sub, to, new_sub)?;
                }
                reservation.boat_id = to.id;
                reservation.ride_date = to.ride_date;
                reservation.service_sub_type = new_sub;
            }
            None => {
                let new_sub = Self::validate_target(reservation, from, target)?;
                if occupies_seat {
                    CapacityLedger::switch_sub_pool(from, current_sub, new_sub)?;
                }
                reservation.service_sub_type = new_sub;
            }
        }

        reservation.seat_number = target.seat_number;
        reservation.updated_at = Utc::now();
        Ok(())
    }

    fn validate_target(
        reservation: &Reservation,
        boat: &Boat,
        target: SeatTarget,
    ) -> Result<Option<ServiceSubType>, AppError> {
        if boat.status != BoatStatus::Active {
            return Err(AppError::InvalidReservation(format!(
                "barco '{}' está inativo",
                boat.name
            )));
        }
        if let Some(seat) = target.seat_number {
            if seat < 1 || seat > boat.seats_total {
                return Err(AppError::InvalidReservation(format!(
                    "assento {} fora da faixa 1..={} do barco '{}'",
                    seat, boat.seats_total, boat.name
                )));
            }
        }

        if !boat.has_sub_pools() {
            return Ok(None);
        }
        target
            .sub_type
            .or(reservation.service_sub_type)
            .map(Some)
            .ok_or_else(|| {
                AppError::InvalidReservation(format!(
                    "barco '{}' exige o tipo de serviço",
                    boat.name
                ))
            })
    }

    fn ensure_boat_matches(reservation: &Reservation, boat: &Boat) -> Result<(), AppError> {
        if reservation.boat_id != boat.id {
            return Err(AppError::InvalidReservation(format!(
                "reserva {} não pertence ao barco {}",
                reservation.id, boat.id
            )));
        }
        Ok(())
    }
}

// src/services/checkin_service.rs

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::{error::AppError, retry::with_retries},
    config::EngineConfig,
    db::{BookingStore, ReservationFilter, WriteBatch},
    models::{
        boat::{Boat, ServiceSubType},
        group::Group,
        reservation::{Payment, PaymentMethod, PaymentSource, Reservation, ReservationStatus},
    },
    services::{
        group_payment::{GroupPaymentAllocator, PaymentChoice},
        reservation_state::{Release, ReservationStateMachine, SeatTarget},
    },
};

// --- Entradas / Saídas ---

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequest {
    #[schema(example = "100.00")]
    pub amount_paid: Decimal,
    /// Com forma informada e valor > 0, o sinal entra no livro de pagamentos
    pub method: Option<PaymentMethod>,
    pub bank_account: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReallocationRequest {
    pub target_boat_id: Uuid,
    pub target_seat: Option<i32>,
    pub target_sub_type: Option<ServiceSubType>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CheckInOutcome {
    /// Saldo zero: todos os membros pendentes embarcaram
    Completed { reservations: Vec<Reservation> },
    /// Há saldo: o operador precisa escolher pagamento / desconto / cortesia
    PaymentRequired { group: Group, amount_due: Decimal },
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SettlementResult {
    pub reservations: Vec<Reservation>,
    pub payments: Vec<Payment>,
}

/// Orquestra as intenções do operador: aprovar, check-in, rejeitar, no-show,
/// realocar. Cada intenção é uma transação "lê -> decide -> grava" repetida
/// do zero em caso de conflito.
#[derive(Clone)]
pub struct CheckInService {
    store: Arc<dyn BookingStore>,
    config: EngineConfig,
}

impl CheckInService {
    pub fn new(store: Arc<dyn BookingStore>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    async fn load_reservation(&self, id: Uuid) -> Result<Reservation, AppError> {
        self.store
            .get_reservation(id)
            .await?
            .ok_or(AppError::ReservationNotFound(id))
    }

    async fn load_boat(&self, id: Uuid) -> Result<Boat, AppError> {
        self.store.get_boat(id).await?.ok_or(AppError::BoatNotFound(id))
    }

    /// Membros do grupo ainda sem check-in (a própria reserva, se for individual).
    async fn pending_group(&self, reservation: Reservation) -> Result<Group, AppError> {
        ReservationStateMachine::ensure_can_check_in(&reservation)?;

        let Some(group_id) = reservation.group_id else {
            return Ok(Group::single(reservation));
        };

        let filter = ReservationFilter::by_group(group_id).with_statuses(&[ReservationStatus::Approved]);
        let members: Vec<Reservation> = self
            .store
            .query_reservations(&filter)
            .await?
            .into_iter()
            .filter(|m| !m.checked_in)
            .collect();

        // A consulta sempre inclui a reserva pedida (aprovada e sem check-in)
        Group::from_members(Some(group_id), members).ok_or(AppError::ReservationNotFound(reservation.id))
    }

    // =========================================================================
    //  APROVAR
    // =========================================================================

    pub async fn approve(
        &self,
        reservation_id: Uuid,
        request: &ApprovalRequest,
        operator: Option<&str>,
    ) -> Result<Reservation, AppError> {
        with_retries("approve", self.config.max_transition_retries, move || {
            self.try_approve(reservation_id, request, operator)
        })
        .await
    }

    async fn try_approve(
        &self,
        reservation_id: Uuid,
        request: &ApprovalRequest,
        operator: Option<&str>,
    ) -> Result<Reservation, AppError> {
        let mut reservation = self.load_reservation(reservation_id).await?;
        let mut boat = self.load_boat(reservation.boat_id).await?;

        if let Err(e) = ReservationStateMachine::approve(&mut reservation, &mut boat, request.amount_paid) {
            if matches!(e, AppError::CapacityExceeded(_)) {
                tracing::warn!(%reservation_id, boat_id = %boat.id, "Aprovação recusada: {}", e);
            }
            return Err(e);
        }

        let mut batch = WriteBatch::default();
        batch.put_boat(boat).put_reservation(reservation);
        if let Some(method) = request.method.filter(|_| request.amount_paid > Decimal::ZERO) {
            batch.append_payments([Payment {
                id: Uuid::new_v4(),
                reservation_id,
                amount: request.amount_paid,
                method,
                bank_account: request.bank_account.clone(),
                source: PaymentSource::Approval,
                group_payment: false,
                created_by: operator.map(str::to_string),
                created_at: Utc::now(),
            }]);
        }

        let committed = self.store.commit(batch).await?;
        tracing::info!(%reservation_id, amount_paid = %request.amount_paid, "Reserva aprovada");
        first_reservation(committed)
    }

    // =========================================================================
    //  CHECK-IN
    // =========================================================================

    /// Primeira etapa do check-in. Sem saldo, embarca todos os membros pendentes
    /// do grupo; com saldo, devolve o grupo e o valor para o operador decidir.
    pub async fn check_in(&self, reservation_id: Uuid) -> Result<CheckInOutcome, AppError> {
        with_retries("check_in", self.config.max_transition_retries, move || {
            self.try_check_in(reservation_id)
        })
        .await
    }

    async fn try_check_in(&self, reservation_id: Uuid) -> Result<CheckInOutcome, AppError> {
        let reservation = self.load_reservation(reservation_id).await?;
        let group = self.pending_group(reservation).await?;

        let amount_due = group.total_due();
        if amount_due > Decimal::ZERO {
            tracing::info!(%reservation_id, %amount_due, members = group.members.len(), "Check-in aguardando pagamento");
            return Ok(CheckInOutcome::PaymentRequired { group, amount_due });
        }

        let mut batch = WriteBatch::default();
        for mut member in group.members {
            ReservationStateMachine::check_in(&mut member)?;
            batch.put_reservation(member);
        }

        let committed = self.store.commit(batch).await?;
        tracing::info!(%reservation_id, members = committed.reservations.len(), "Check-in concluído sem saldo");
        Ok(CheckInOutcome::Completed {
            reservations: committed.reservations,
        })
    }

    /// Segunda etapa: aplica a escolha de pagamento a todos os membros pendentes
    /// numa única gravação.
    pub async fn settle_check_in(
        &self,
        reservation_id: Uuid,
        choice: &PaymentChoice,
        operator: Option<&str>,
    ) -> Result<SettlementResult, AppError> {
        with_retries("settle_check_in", self.config.max_transition_retries, move || {
            self.try_settle_check_in(reservation_id, choice, operator)
        })
        .await
    }

    async fn try_settle_check_in(
        &self,
        reservation_id: Uuid,
        choice: &PaymentChoice,
        operator: Option<&str>,
    ) -> Result<SettlementResult, AppError> {
        let reservation = self.load_reservation(reservation_id).await?;
        let group = self.pending_group(reservation).await?;

        let allocator = GroupPaymentAllocator::new(operator.map(str::to_string));
        let allocation = allocator.apply(&group.members, choice)?;

        let mut batch = WriteBatch::default();
        for member in allocation.members {
            batch.put_reservation(member);
        }
        batch.append_payments(allocation.payments);

        let committed = self.store.commit(batch).await?;
        tracing::info!(
            %reservation_id,
            members = committed.reservations.len(),
            payments = committed.payments.len(),
            "Check-in quitado"
        );
        Ok(SettlementResult {
            reservations: committed.reservations,
            payments: committed.payments,
        })
    }

    /// Desfaz o check-in de uma única reserva. Não estorna pagamentos.
    pub async fn undo_check_in(&self, reservation_id: Uuid) -> Result<Reservation, AppError> {
        with_retries("undo_check_in", self.config.max_transition_retries, move || {
            self.try_undo_check_in(reservation_id)
        })
        .await
    }

    async fn try_undo_check_in(&self, reservation_id: Uuid) -> Result<Reservation, AppError> {
        let mut reservation = self.load_reservation(reservation_id).await?;
        ReservationStateMachine::undo_check_in(&mut reservation)?;

        let mut batch = WriteBatch::default();
        batch.put_reservation(reservation);
        let committed = self.store.commit(batch).await?;
        tracing::info!(%reservation_id, "Check-in desfeito");
        first_reservation(committed)
    }

    // =========================================================================
    //  REJEITAR / NO-SHOW
    // =========================================================================

    pub async fn reject(&self, reservation_id: Uuid) -> Result<Reservation, AppError> {
        with_retries("reject", self.config.max_transition_retries, move || {
            self.try_close(reservation_id, None, false)
        })
        .await
    }

    pub async fn mark_no_show(&self, reservation_id: Uuid, reason: Option<&str>) -> Result<Reservation, AppError> {
        with_retries("mark_no_show", self.config.max_transition_retries, move || {
            self.try_close(reservation_id, reason, true)
        })
        .await
    }

    async fn try_close(
        &self,
        reservation_id: Uuid,
        reason: Option<&str>,
        no_show: bool,
    ) -> Result<Reservation, AppError> {
        let mut reservation = self.load_reservation(reservation_id).await?;
        let mut boat = self.store.get_boat(reservation.boat_id).await?;

        let release = if no_show {
            ReservationStateMachine::mark_no_show(&mut reservation, boat.as_mut(), reason.map(str::to_string))?
        } else {
            ReservationStateMachine::cancel(&mut reservation, boat.as_mut())?
        };

        if release == Release::AlreadyClosed {
            return Ok(reservation);
        }

        let mut batch = WriteBatch::default();
        if let (Release::Released, Some(boat)) = (release, boat) {
            batch.put_boat(boat);
        }
        batch.put_reservation(reservation);

        let committed = self.store.commit(batch).await?;
        tracing::info!(%reservation_id, ?release, no_show, "Reserva encerrada");
        first_reservation(committed)
    }

    // =========================================================================
    //  REALOCAR
    // =========================================================================

    pub async fn reallocate(
        &self,
        reservation_id: Uuid,
        request: &ReallocationRequest,
    ) -> Result<Reservation, AppError> {
        with_retries("reallocate", self.config.max_transition_retries, move || {
            self.try_reallocate(reservation_id, request)
        })
        .await
    }

    async fn try_reallocate(
        &self,
        reservation_id: Uuid,
        request: &ReallocationRequest,
    ) -> Result<Reservation, AppError> {
        let mut reservation = self.load_reservation(reservation_id).await?;
        let mut from = self.load_boat(reservation.boat_id).await?;
        let target = SeatTarget {
            seat_number: request.target_seat,
            sub_type: request.target_sub_type,
        };

        let same_boat = request.target_boat_id == from.id;
        let mut to = if same_boat {
            None
        } else {
            Some(self.load_boat(request.target_boat_id).await?)
        };

        if let Some(seat) = request.target_seat {
            self.ensure_seat_free(request.target_boat_id, seat, reservation_id).await?;
        }

        if let Err(e) = ReservationStateMachine::reassign(&mut reservation, &mut from, to.as_mut(), target) {
            if matches!(e, AppError::CapacityExceeded(_)) {
                tracing::warn!(%reservation_id, target_boat = %request.target_boat_id, "Realocação recusada: {}", e);
            }
            return Err(e);
        }

        // Os dois barcos entram no lote mesmo sem mudança de contador:
        // o bump de versão serializa realocações concorrentes no mesmo barco.
        let mut batch = WriteBatch::default();
        batch.put_boat(from);
        if let Some(to) = to {
            batch.put_boat(to);
        }
        batch.put_reservation(reservation);

        let committed = self.store.commit(batch).await?;
        tracing::info!(%reservation_id, target_boat = %request.target_boat_id, "Reserva realocada");
        first_reservation(committed)
    }

    async fn ensure_seat_free(&self, boat_id: Uuid, seat: i32, reservation_id: Uuid) -> Result<(), AppError> {
        let occupied = self
            .store
            .query_reservations(&ReservationFilter::by_boat(boat_id))
            .await?
            .into_iter()
            .any(|r| r.id != reservation_id && r.status.is_open() && r.seat_number == Some(seat));

        if occupied {
            return Err(AppError::InvalidReservation(format!(
                "assento {} já ocupado no barco {}",
                seat, boat_id
            )));
        }
        Ok(())
    }
}

fn first_reservation(mut committed: WriteBatch) -> Result<Reservation, AppError> {
    if committed.reservations.is_empty() {
        return Err(anyhow::anyhow!("commit não devolveu a reserva").into());
    }
    Ok(committed.reservations.swap_remove(0))
}

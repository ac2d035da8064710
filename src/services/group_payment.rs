// src/services/group_payment.rs

//! Divide um pagamento (possivelmente em várias formas) e um desconto entre os
//! membros de um grupo no check-in.
//!
//! Desconto e pagamento são consumidos em ordem, do primeiro ao último membro.
//! Cada forma de pagamento é rateada proporcionalmente à parcela de cada membro,
//! em centavos inteiros: cada lançamento é truncado e os centavos que sobram são
//! distribuídos de frente para trás. Assim cada forma e cada membro fecham
//! exatamente no centavo.

use chrono::{DateTime, Utc};
use rust_decimal::{prelude::ToPrimitive, Decimal};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::{error::AppError, money},
    models::reservation::{Payment, PaymentMethod, PaymentSource, Reservation},
    services::reservation_state::ReservationStateMachine,
};

// --- Entradas ---

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentEntry {
    #[schema(example = "160.00")]
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub bank_account: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Discount {
    #[schema(example = "20.00")]
    pub amount: Decimal,
    #[schema(example = "promo")]
    pub reason: String,
}

/// Escolha do operador para quitar o check-in.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaymentChoice {
    Pay {
        entries: Vec<PaymentEntry>,
        discount: Option<Discount>,
    },
    /// Cortesia: zera o saldo sem lançar pagamento
    FullGratuity,
    /// Embarca sem cobrar agora: a dívida continua visível
    DeferWithoutCharge,
}

// --- Saída ---

#[derive(Debug, Clone)]
pub struct Allocation {
    pub members: Vec<Reservation>,
    pub payments: Vec<Payment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MemberShare {
    discount: Decimal,
    payment: Decimal,
}

pub struct GroupPaymentAllocator {
    created_by: Option<String>,
    now: DateTime<Utc>,
}

impl GroupPaymentAllocator {
    pub fn new(created_by: Option<String>) -> Self {
        Self {
            created_by,
            now: Utc::now(),
        }
    }

    // =========================================================================
    //  VALIDAÇÃO (tudo antes de qualquer mutação)
    // =========================================================================

    /// Devolve o "devido efetivo" (soma dos saldos menos desconto).
    pub fn validate(
        members: &[Reservation],
        entries: &[PaymentEntry],
        discount: Option<&Discount>,
    ) -> Result<Decimal, AppError> {
        if members.is_empty() {
            return Err(AppError::InvalidReservation("grupo sem membros para check-in".into()));
        }
        for member in members {
            ReservationStateMachine::ensure_can_check_in(member)?;
        }

        for entry in entries {
            money::validate_amount(entry.amount, "valor do pagamento")?;
        }

        let total_due: Decimal = members.iter().map(|m| m.amount_due).sum();
        let discount_amount = discount.map(|d| d.amount).unwrap_or(Decimal::ZERO);
        money::validate_amount(discount_amount, "desconto")?;

        if discount_amount > Decimal::ZERO
            && discount.map(|d| d.reason.trim().is_empty()).unwrap_or(true)
        {
            return Err(AppError::InvalidAmount("desconto exige um motivo".into()));
        }
        if discount_amount > total_due {
            return Err(AppError::InvalidAmount(format!(
                "desconto ({}) maior que o saldo devido ({})",
                discount_amount, total_due
            )));
        }

        let effective_due = money::round_money(total_due - discount_amount);
        let paid = money::round_money(money::sum(entries.iter().map(|e| &e.amount)));

        if paid < effective_due {
            return Err(AppError::InsufficientPayment {
                expected: effective_due,
                received: paid,
                difference: effective_due - paid,
            });
        }
        if paid > effective_due {
            return Err(AppError::ExcessPayment {
                expected: effective_due,
                received: paid,
                difference: paid - effective_due,
            });
        }

        Ok(effective_due)
    }

    // =========================================================================
    //  RATEIO
    // =========================================================================

    pub fn allocate(
        &self,
        members: &[Reservation],
        entries: &[PaymentEntry],
        discount: Option<&Discount>,
    ) -> Result<Allocation, AppError> {
        Self::validate(members, entries, discount)?;

        let discount_amount = discount.map(|d| d.amount).unwrap_or(Decimal::ZERO);
        let payment_pool = money::sum(entries.iter().map(|e| &e.amount));

        // 1. Consome desconto e pagamento de frente para trás
        let mut remaining_discount = discount_amount;
        let mut remaining_payment = payment_pool;
        let shares: Vec<MemberShare> = members
            .iter()
            .map(|member| {
                let member_discount = member.amount_due.min(remaining_discount);
                remaining_discount -= member_discount;
                let payable = member.amount_due - member_discount;
                let member_payment = payable.min(remaining_payment);
                remaining_payment -= member_payment;
                MemberShare {
                    discount: member_discount,
                    payment: member_payment,
                }
            })
            .collect();

        // 2. Lançamentos por forma de pagamento
        let is_group = members.len() > 1;
        let mut payments = Vec::new();
        for (member_idx, entry_idx, amount) in Self::split_entries(entries, &shares)? {
            let entry = &entries[entry_idx];
            payments.push(Payment {
                id: Uuid::new_v4(),
                reservation_id: members[member_idx].id,
                amount,
                method: entry.method,
                bank_account: entry.bank_account.clone(),
                source: PaymentSource::Checkin,
                group_payment: is_group,
                created_by: self.created_by.clone(),
                created_at: self.now,
            });
        }

        // 3. Atualiza os membros
        let reason = discount.map(|d| d.reason.trim().to_string());
        let members = members
            .iter()
            .zip(&shares)
            .map(|(member, share)| {
                let mut updated = member.clone();
                updated.amount_paid += share.payment + share.discount;
                updated.refresh_amount_due();
                if share.discount > Decimal::ZERO {
                    updated.discount_amount =
                        Some(updated.discount_amount.unwrap_or(Decimal::ZERO) + share.discount);
                    updated.discount_reason = reason.clone();
                }
                updated.checked_in = true;
                updated.updated_at = self.now;
                updated
            })
            .collect();

        tracing::debug!(
            members = shares.len(),
            payments = payments.len(),
            %payment_pool,
            %discount_amount,
            "Rateio de pagamento do grupo calculado"
        );

        Ok(Allocation { members, payments })
    }

    /// Lançamentos (membro, forma, valor) do rateio proporcional. Linhas são as
    /// parcelas dos membros e colunas as formas de pagamento; as duas somas
    /// fecham exatamente. Células zeradas não geram lançamento.
    fn split_entries(
        entries: &[PaymentEntry],
        shares: &[MemberShare],
    ) -> Result<Vec<(usize, usize, Decimal)>, AppError> {
        let entry_cents = entries.iter().map(|e| to_cents(e.amount)).collect::<Result<Vec<_>, _>>()?;
        let share_cents = shares.iter().map(|s| to_cents(s.payment)).collect::<Result<Vec<_>, _>>()?;
        let pool: i128 = entry_cents.iter().sum();
        if pool <= 0 {
            return Ok(Vec::new());
        }

        // 1. Parte proporcional truncada
        let mut cells: Vec<Vec<i128>> = share_cents
            .iter()
            .map(|&share| entry_cents.iter().map(|&entry| entry * share / pool).collect())
            .collect();

        // 2. Centavos que faltam em cada membro e em cada forma
        let mut member_gap: Vec<i128> = share_cents
            .iter()
            .zip(&cells)
            .map(|(&share, row)| share - row.iter().sum::<i128>())
            .collect();
        let mut entry_gap: Vec<i128> = entry_cents
            .iter()
            .enumerate()
            .map(|(j, &entry)| entry - cells.iter().map(|row| row[j]).sum::<i128>())
            .collect();

        // 3. Fecha as diferenças de frente para trás
        let (mut i, mut j) = (0, 0);
        while i < member_gap.len() && j < entry_gap.len() {
            let extra = member_gap[i].min(entry_gap[j]);
            cells[i][j] += extra;
            member_gap[i] -= extra;
            entry_gap[j] -= extra;
            if member_gap[i] == 0 {
                i += 1;
            }
            if entry_gap[j] == 0 {
                j += 1;
            }
        }

        let mut parts = Vec::new();
        for (member_idx, row) in cells.into_iter().enumerate() {
            for (entry_idx, cents) in row.into_iter().enumerate() {
                if cents > 0 {
                    parts.push((member_idx, entry_idx, from_cents(cents)?));
                }
            }
        }
        Ok(parts)
    }

    // =========================================================================
    //  CAMINHOS ESPECIAIS (sem conferência de saldo)
    // =========================================================================

    pub fn full_gratuity(&self, members: &[Reservation]) -> Result<Allocation, AppError> {
        Self::ensure_all_can_check_in(members)?;
        let members = members
            .iter()
            .map(|member| {
                let mut updated = member.clone();
                updated.amount_paid = updated.total_amount;
                updated.amount_due = Decimal::ZERO;
                updated.checked_in = true;
                updated.updated_at = self.now;
                updated
            })
            .collect();
        Ok(Allocation {
            members,
            payments: Vec::new(),
        })
    }

    pub fn defer_without_charge(&self, members: &[Reservation]) -> Result<Allocation, AppError> {
        Self::ensure_all_can_check_in(members)?;
        let members = members
            .iter()
            .map(|member| {
                let mut updated = member.clone();
                updated.checked_in = true;
                updated.updated_at = self.now;
                updated
            })
            .collect();
        Ok(Allocation {
            members,
            payments: Vec::new(),
        })
    }

    pub fn apply(&self, members: &[Reservation], choice: &PaymentChoice) -> Result<Allocation, AppError> {
        match choice {
            PaymentChoice::Pay { entries, discount } => self.allocate(members, entries, discount.as_ref()),
            PaymentChoice::FullGratuity => self.full_gratuity(members),
            PaymentChoice::DeferWithoutCharge => self.defer_without_charge(members),
        }
    }

    fn ensure_all_can_check_in(members: &[Reservation]) -> Result<(), AppError> {
        if members.is_empty() {
            return Err(AppError::InvalidReservation("grupo sem membros para check-in".into()));
        }
        members.iter().try_for_each(ReservationStateMachine::ensure_can_check_in)
    }
}

fn to_cents(value: Decimal) -> Result<i128, AppError> {
    (value * Decimal::ONE_HUNDRED)
        .trunc()
        .to_i128()
        .ok_or_else(|| AppError::InvalidAmount(format!("valor fora do limite: {}", value)))
}

fn from_cents(cents: i128) -> Result<Decimal, AppError> {
    Decimal::try_from_i128_with_scale(cents, 2)
        .map_err(|_| AppError::InvalidAmount(format!("valor fora do limite: {} centavos", cents)))
}

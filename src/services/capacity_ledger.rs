// src/services/capacity_ledger.rs

//! Contadores de assentos do barco.
//!
//! As funções aqui só mexem no snapshot em memória. A atomicidade vem do
//! `WriteBatch`: o barco alterado é gravado com compare-and-swap na versão
//! lida, e qualquer escrita concorrente derruba a transição inteira.

use crate::{
    common::error::AppError,
    models::boat::{Boat, ServiceSubType},
};

pub struct CapacityLedger;

impl CapacityLedger {
    /// Ocupa um assento (e o sub-grupo, se houver). Falha fechado: em erro nada muda.
    pub fn reserve_seat(boat: &mut Boat, sub_type: Option<ServiceSubType>) -> Result<(), AppError> {
        if boat.seats_taken >= boat.seats_total {
            return Err(AppError::CapacityExceeded(format!(
                "barco '{}' lotado ({}/{})",
                boat.name, boat.seats_taken, boat.seats_total
            )));
        }

        if boat.has_sub_pools() {
            let sub_type = sub_type.ok_or_else(|| {
                AppError::InvalidReservation(format!(
                    "barco '{}' exige o tipo de serviço (com desembarque / panorâmico)",
                    boat.name
                ))
            })?;

            let (total, taken) = boat.sub_pool(sub_type).unwrap_or((0, 0));
            if taken >= total {
                return Err(AppError::CapacityExceeded(format!(
                    "barco '{}' sem vagas {} ({}/{})",
                    boat.name, sub_type, taken, total
                )));
            }
            *boat.sub_pool_taken_mut(sub_type) = Some(taken + 1);
        }

        boat.seats_taken += 1;
        Ok(())
    }

    /// Libera um assento com piso em zero. Liberar o que não estava ocupado não
    /// é erro. Devolve `true` se algum contador mudou.
    pub fn release_seat(boat: &mut Boat, sub_type: Option<ServiceSubType>) -> bool {
        if boat.has_sub_pools() {
            let Some(sub_type) = sub_type else {
                tracing::warn!(
                    boat_id = %boat.id,
                    "Liberação sem tipo de serviço em barco com sub-grupos, ignorada"
                );
                return false;
            };

            let (_, taken) = boat.sub_pool(sub_type).unwrap_or((0, 0));
            if taken <= 0 || boat.seats_taken <= 0 {
                return false;
            }
            *boat.sub_pool_taken_mut(sub_type) = Some(taken - 1);
            boat.seats_taken -= 1;
            return true;
        }

        if boat.seats_taken <= 0 {
            return false;
        }
        boat.seats_taken -= 1;
        true
    }

    /// Reserva no destino e só depois libera na origem. Se o destino recusar,
    /// a origem fica intacta.
    pub fn move_seat(
        from: &mut Boat,
        from_sub: Option<ServiceSubType>,
        to: &mut Boat,
        to_sub: Option<ServiceSubType>,
    ) -> Result<(), AppError> {
        Self::reserve_seat(to, to_sub)?;
        Self::release_seat(from, from_sub);
        Ok(())
    }

    /// Troca de sub-grupo dentro do mesmo barco. O total ocupado não muda.
    pub fn switch_sub_pool(
        boat: &mut Boat,
        from_sub: Option<ServiceSubType>,
        to_sub: Option<ServiceSubType>,
    ) -> Result<(), AppError> {
        if !boat.has_sub_pools() || from_sub == to_sub {
            return Ok(());
        }

        let to_sub = to_sub.ok_or_else(|| {
            AppError::InvalidReservation("tipo de serviço de destino obrigatório".into())
        })?;
        let (total, taken) = boat.sub_pool(to_sub).unwrap_or((0, 0));
        if taken >= total {
            return Err(AppError::CapacityExceeded(format!(
                "barco '{}' sem vagas {} ({}/{})",
                boat.name, to_sub, taken, total
            )));
        }

        if let Some(from_sub) = from_sub {
            let (_, from_taken) = boat.sub_pool(from_sub).unwrap_or((0, 0));
            if from_taken > 0 {
                *boat.sub_pool_taken_mut(from_sub) = Some(from_taken - 1);
                *boat.sub_pool_taken_mut(to_sub) = Some(taken + 1);
                return Ok(());
            }
        }

        // Assento antigo não estava contado em nenhum sub-grupo: não mexe
        Ok(())
    }
}

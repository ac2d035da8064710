// src/models/group.rs

//! Grupo não é uma tabela: é a visão calculada das reservas que dividem o
//! mesmo `group_id`. A escolha do líder e a ordem dos membros ficam aqui.

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::reservation::Reservation;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    /// `None` para reserva individual (grupo de um)
    pub group_id: Option<Uuid>,
    pub leader_id: Uuid,
    /// Líder primeiro, depois ordem de criação
    pub members: Vec<Reservation>,
}

impl Group {
    /// Monta o grupo em ordem determinística. Devolve `None` se não houver membros.
    pub fn from_members(group_id: Option<Uuid>, mut members: Vec<Reservation>) -> Option<Self> {
        if members.is_empty() {
            return None;
        }

        // Ordem estável: criação, nome, id
        members.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.customer_name.cmp(&b.customer_name))
                .then_with(|| a.id.cmp(&b.id))
        });

        // Sem flag explícita, o primeiro da ordem vira líder
        let leader_pos = members.iter().position(|m| m.is_group_leader).unwrap_or(0);
        let leader = members.remove(leader_pos);
        let leader_id = leader.id;
        members.insert(0, leader);

        Some(Self {
            group_id,
            leader_id,
            members,
        })
    }

    pub fn single(reservation: Reservation) -> Self {
        Self {
            group_id: reservation.group_id,
            leader_id: reservation.id,
            members: vec![reservation],
        }
    }

    pub fn is_group(&self) -> bool {
        self.members.len() > 1
    }

    pub fn leader(&self) -> &Reservation {
        // from_members garante que o líder está na posição 0
        &self.members[0]
    }

    pub fn total_due(&self) -> Decimal {
        self.members.iter().map(|m| m.amount_due).sum()
    }

    pub fn member_ids(&self) -> Vec<Uuid> {
        self.members.iter().map(|m| m.id).collect()
    }
}

/// Agrupa reservas por `group_id`. Reservas sem grupo viram grupos de um.
pub fn group_by(reservations: Vec<Reservation>) -> Vec<Group> {
    let mut grouped: BTreeMap<Uuid, Vec<Reservation>> = BTreeMap::new();
    let mut groups = Vec::new();

    for reservation in reservations {
        match reservation.group_id {
            Some(gid) => grouped.entry(gid).or_default().push(reservation),
            None => groups.push(Group::single(reservation)),
        }
    }

    groups.extend(
        grouped
            .into_iter()
            .filter_map(|(gid, members)| Group::from_members(Some(gid), members)),
    );
    groups
}

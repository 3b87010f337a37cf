use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::reservation::ReservationStatus;

/// What redeeming the token does to the referenced PENDING reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "varchar", rename_all = "UPPERCASE")]
pub enum TokenAction {
    Approve,
    Reject,
}

impl TokenAction {
    pub fn target_status(self) -> ReservationStatus {
        match self {
            Self::Approve => ReservationStatus::Confirmed,
            Self::Reject => ReservationStatus::Rejected,
        }
    }
}

/// A single-use credential for acting on a pending reservation out-of-band.
/// Redeeming any token for a reservation deletes its siblings and settles
/// the reservation, so no token can ever drive a second transition.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ActionToken {
    pub token: String,
    pub reservation_id: Uuid,
    pub action: TokenAction,
    pub expires_at: DateTime<Utc>,
}

/// Token payload created in the same transaction as its PENDING reservation.
#[derive(Debug, Clone)]
pub struct NewActionToken {
    pub token: String,
    pub action: TokenAction,
    pub expires_at: DateTime<Utc>,
}

impl NewActionToken {
    pub fn generate(action: TokenAction, expires_at: DateTime<Utc>) -> Self {
        let mut bytes = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self {
            token: format!("act_{}", hex::encode(bytes)),
            action,
            expires_at,
        }
    }
}

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a reservation.
///
/// Transitions are one-way: PENDING → CONFIRMED (approve token),
/// PENDING → REJECTED (reject token), {PENDING, CONFIRMED} → CANCELLED.
/// REJECTED and CANCELLED rows stay in the store forever as audit markers
/// and never count against slot capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "varchar", rename_all = "UPPERCASE")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Rejected,
    Cancelled,
}

impl ReservationStatus {
    /// Statuses that hold seats against slot capacity.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }

    /// Whether the explicit cancel operation applies to this status.
    pub fn is_cancellable(self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }

    pub fn can_transition_to(self, next: ReservationStatus) -> bool {
        use ReservationStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed) | (Pending, Rejected) | (Pending, Cancelled) | (Confirmed, Cancelled)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Rejected => "REJECTED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted reservation. Wire format is camelCase to match the public form.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: Uuid,
    pub date: NaiveDate,
    pub time_slot: String,
    pub name: String,
    pub phone: String,
    pub people: i32,
    pub teishoku_count: i32,
    pub seat_only_count: i32,
    pub memo: Option<String>,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a new reservation. Built only by the booking engine,
/// after shape validation — the store trusts it except for capacity.
#[derive(Debug, Clone)]
pub struct NewReservation {
    pub date: NaiveDate,
    pub time_slot: String,
    pub name: String,
    pub phone: String,
    pub people: i32,
    pub teishoku_count: i32,
    pub seat_only_count: i32,
    pub memo: Option<String>,
    pub status: ReservationStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_is_the_only_tokenable_state() {
        assert!(ReservationStatus::Pending.can_transition_to(ReservationStatus::Confirmed));
        assert!(ReservationStatus::Pending.can_transition_to(ReservationStatus::Rejected));
        assert!(!ReservationStatus::Confirmed.can_transition_to(ReservationStatus::Rejected));
        assert!(!ReservationStatus::Rejected.can_transition_to(ReservationStatus::Confirmed));
        assert!(!ReservationStatus::Cancelled.can_transition_to(ReservationStatus::Confirmed));
    }

    #[test]
    fn cancel_applies_to_pending_and_confirmed_only() {
        assert!(ReservationStatus::Pending.is_cancellable());
        assert!(ReservationStatus::Confirmed.is_cancellable());
        assert!(!ReservationStatus::Rejected.is_cancellable());
        assert!(!ReservationStatus::Cancelled.is_cancellable());
    }

    #[test]
    fn only_pending_and_confirmed_hold_capacity() {
        assert!(ReservationStatus::Pending.is_active());
        assert!(ReservationStatus::Confirmed.is_active());
        assert!(!ReservationStatus::Rejected.is_active());
        assert!(!ReservationStatus::Cancelled.is_active());
    }

    #[test]
    fn status_serializes_uppercase() {
        let json = serde_json::to_string(&ReservationStatus::Confirmed).unwrap();
        assert_eq!(json, "\"CONFIRMED\"");
    }
}

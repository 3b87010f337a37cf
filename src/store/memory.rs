//! In-process store for tests and local development.
//!
//! One mutex over the whole data set stands in for the database's
//! transaction isolation: every trait method holds the lock for its full
//! critical section, so interleavings that Postgres would serialize are
//! serialized here too.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::reservation::{NewReservation, Reservation, ReservationStatus};
use crate::models::token::{ActionToken, NewActionToken};

use super::{CancelOutcome, RedeemOutcome, ReserveOutcome, Store};

#[derive(Default)]
struct Inner {
    reservations: HashMap<Uuid, Reservation>,
    tokens: HashMap<String, ActionToken>,
}

impl Inner {
    fn active_sum(&self, date: NaiveDate, time_slot: &str) -> i64 {
        self.reservations
            .values()
            .filter(|r| r.date == date && r.time_slot == time_slot && r.status.is_active())
            .map(|r| i64::from(r.people))
            .sum()
    }

    fn insert(&mut self, new: &NewReservation) -> Reservation {
        let reservation = Reservation {
            id: Uuid::new_v4(),
            date: new.date,
            time_slot: new.time_slot.clone(),
            name: new.name.clone(),
            phone: new.phone.clone(),
            people: new.people,
            teishoku_count: new.teishoku_count,
            seat_only_count: new.seat_only_count,
            memo: new.memo.clone(),
            status: new.status,
            created_at: Utc::now(),
        };
        self.reservations.insert(reservation.id, reservation.clone());
        reservation
    }
}

#[derive(Default)]
pub struct MemStore {
    inner: Mutex<Inner>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemStore {
    async fn list(&self, date: Option<NaiveDate>) -> anyhow::Result<Vec<Reservation>> {
        let inner = self.inner.lock().await;
        let mut rows: Vec<Reservation> = inner
            .reservations
            .values()
            .filter(|r| date.map_or(true, |d| r.date == d))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            (a.date, &a.time_slot, a.created_at).cmp(&(b.date, &b.time_slot, b.created_at))
        });
        Ok(rows)
    }

    async fn active_by_date(&self, date: NaiveDate) -> anyhow::Result<Vec<Reservation>> {
        let inner = self.inner.lock().await;
        let mut rows: Vec<Reservation> = inner
            .reservations
            .values()
            .filter(|r| r.date == date && r.status.is_active())
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            (&a.time_slot, a.created_at).cmp(&(&b.time_slot, b.created_at))
        });
        Ok(rows)
    }

    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Reservation>> {
        Ok(self.inner.lock().await.reservations.get(&id).cloned())
    }

    async fn try_reserve(
        &self,
        new: &NewReservation,
        capacity: u32,
        tokens: &[NewActionToken],
    ) -> anyhow::Result<ReserveOutcome> {
        let mut inner = self.inner.lock().await;

        let used = inner.active_sum(new.date, &new.time_slot);
        if used + i64::from(new.people) > i64::from(capacity) {
            return Ok(ReserveOutcome::SlotFull);
        }

        let reservation = inner.insert(new);
        for token in tokens {
            inner.tokens.insert(
                token.token.clone(),
                ActionToken {
                    token: token.token.clone(),
                    reservation_id: reservation.id,
                    action: token.action,
                    expires_at: token.expires_at,
                },
            );
        }
        Ok(ReserveOutcome::Created(reservation))
    }

    async fn try_block(
        &self,
        date: NaiveDate,
        time_slot: &str,
        capacity: u32,
        memo: Option<String>,
    ) -> anyhow::Result<ReserveOutcome> {
        let mut inner = self.inner.lock().await;

        let remaining = i64::from(capacity) - inner.active_sum(date, time_slot);
        if remaining <= 0 {
            return Ok(ReserveOutcome::SlotFull);
        }

        let reservation = inner.insert(&NewReservation {
            date,
            time_slot: time_slot.to_string(),
            name: "BLOCK".to_string(),
            phone: "-".to_string(),
            people: remaining as i32,
            teishoku_count: 0,
            seat_only_count: remaining as i32,
            memo,
            status: ReservationStatus::Confirmed,
        });
        Ok(ReserveOutcome::Created(reservation))
    }

    async fn cancel(&self, id: Uuid) -> anyhow::Result<CancelOutcome> {
        let mut inner = self.inner.lock().await;

        let Some(current) = inner.reservations.get(&id).cloned() else {
            return Ok(CancelOutcome::NotFound);
        };

        if current.status == ReservationStatus::Cancelled {
            return Ok(CancelOutcome::AlreadyCancelled(current));
        }
        if !current.status.is_cancellable() {
            return Ok(CancelOutcome::NotCancellable(current.status));
        }

        let updated = {
            let row = inner
                .reservations
                .get_mut(&id)
                .expect("row checked above");
            row.status = ReservationStatus::Cancelled;
            row.clone()
        };
        Ok(CancelOutcome::Cancelled(updated))
    }

    async fn redeem_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<RedeemOutcome> {
        let mut inner = self.inner.lock().await;

        let Some(found) = inner.tokens.get(token).cloned() else {
            return Ok(RedeemOutcome::NotFound);
        };

        if now > found.expires_at {
            return Ok(RedeemOutcome::Expired);
        }

        let status = inner
            .reservations
            .get(&found.reservation_id)
            .map(|r| r.status)
            .ok_or_else(|| anyhow::anyhow!("token references missing reservation"))?;

        let target = found.action.target_status();
        if !status.can_transition_to(target) {
            return Ok(RedeemOutcome::AlreadyProcessed { status });
        }

        if let Some(row) = inner.reservations.get_mut(&found.reservation_id) {
            row.status = target;
        }
        // Sibling tokens die; the redeemed one stays so duplicate clicks
        // read the settled status instead of "invalid token".
        inner
            .tokens
            .retain(|k, t| t.reservation_id != found.reservation_id || k == token);

        Ok(RedeemOutcome::Redeemed { status: target })
    }

    async fn purge_expired_tokens(&self, cutoff: DateTime<Utc>) -> anyhow::Result<u64> {
        let mut inner = self.inner.lock().await;
        let before = inner.tokens.len();
        inner.tokens.retain(|_, t| t.expires_at >= cutoff);
        Ok((before - inner.tokens.len()) as u64)
    }
}

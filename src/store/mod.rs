//! Abstraction over the transactional reservation store.
//!
//! Implementations: `PgStore` (Postgres via sqlx, production) and `MemStore`
//! (in-process, for tests and local development). The two operations with
//! real concurrency requirements — capacity-checked insert and token
//! redemption — live behind single trait methods so each backend can supply
//! its own serialization mechanism: an advisory transaction lock in Postgres,
//! a store-wide mutex in memory. Callers never perform a separate
//! check-then-insert; that split is exactly the race this trait exists to
//! make unrepresentable.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::models::reservation::{NewReservation, Reservation, ReservationStatus};
use crate::models::token::NewActionToken;

/// Result of the atomic capacity-check-and-insert.
#[derive(Debug)]
pub enum ReserveOutcome {
    Created(Reservation),
    /// The re-check inside the critical section found insufficient capacity.
    SlotFull,
}

/// Result of the idempotent cancel operation.
#[derive(Debug)]
pub enum CancelOutcome {
    Cancelled(Reservation),
    /// Cancelling an already-cancelled reservation is a no-op success.
    AlreadyCancelled(Reservation),
    /// REJECTED is terminal; cancel does not apply.
    NotCancellable(ReservationStatus),
    NotFound,
}

/// Result of the atomic token redemption.
#[derive(Debug)]
pub enum RedeemOutcome {
    /// The reservation was PENDING; the token's transition was applied and
    /// every token for the reservation deleted.
    Redeemed { status: ReservationStatus },
    /// The reservation had already left PENDING. Nothing was mutated.
    AlreadyProcessed { status: ReservationStatus },
    Expired,
    NotFound,
}

#[async_trait]
pub trait Store: Send + Sync {
    /// All reservations, optionally filtered to one date, ordered by date,
    /// slot, then creation time. Includes cancelled/rejected rows (admin
    /// view and audit trail).
    async fn list(&self, date: Option<NaiveDate>) -> anyhow::Result<Vec<Reservation>>;

    /// CONFIRMED and PENDING reservations for one date (capacity accounting).
    async fn active_by_date(&self, date: NaiveDate) -> anyhow::Result<Vec<Reservation>>;

    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Reservation>>;

    /// Atomically re-check the active head-count for `(new.date,
    /// new.time_slot)` against `capacity` and insert the reservation plus
    /// its action tokens (empty for direct bookings) in one isolated unit.
    /// Two concurrent calls for the same slot must serialize: one may
    /// succeed, the other must observe the committed insert.
    async fn try_reserve(
        &self,
        new: &NewReservation,
        capacity: u32,
        tokens: &[NewActionToken],
    ) -> anyhow::Result<ReserveOutcome>;

    /// Atomically insert a block pseudo-reservation claiming every remaining
    /// seat of the slot. Fails as `SlotFull` when nothing remains.
    async fn try_block(
        &self,
        date: NaiveDate,
        time_slot: &str,
        capacity: u32,
        memo: Option<String>,
    ) -> anyhow::Result<ReserveOutcome>;

    /// Idempotent cancel; see `CancelOutcome`.
    async fn cancel(&self, id: Uuid) -> anyhow::Result<CancelOutcome>;

    /// Atomic single-use redemption; see `RedeemOutcome`. On success every
    /// sibling token for the reservation is deleted; the redeemed token and
    /// expired tokens stay behind (inert) until the cleanup job removes
    /// them, so repeated clicks report already-processed / expired instead
    /// of "invalid".
    async fn redeem_token(&self, token: &str, now: DateTime<Utc>)
        -> anyhow::Result<RedeemOutcome>;

    /// Delete tokens that expired before `cutoff`. Returns the count.
    async fn purge_expired_tokens(&self, cutoff: DateTime<Utc>) -> anyhow::Result<u64>;
}

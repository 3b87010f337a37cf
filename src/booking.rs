//! Booking engine — the one code path that decides whether a reservation
//! may be accepted.
//!
//! Validation, the cutoff gate, and the capacity-checked insert all funnel
//! through [`BookingEngine::book`]; the admin block, cancel, and token
//! redemption operations live here too so every lifecycle mutation shares
//! the same store and clock.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::availability::remaining_by_slot;
use crate::clock::Clock;
use crate::cutoff::CutoffPolicy;
use crate::errors::AppError;
use crate::models::reservation::{NewReservation, Reservation, ReservationStatus};
use crate::models::token::{NewActionToken, TokenAction};
use crate::slots::SlotCatalog;
use crate::store::{CancelOutcome, RedeemOutcome, ReserveOutcome, Store};

/// Largest party the public form accepts. Larger groups phone the
/// restaurant; the admin block path is exempt.
const PUBLIC_PARTY_MAX: i32 = 4;

/// Initial status of a web booking. Direct mode confirms immediately;
/// approval mode holds the reservation PENDING until an action token from
/// the notification link is redeemed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingMode {
    Direct,
    Approval,
}

impl BookingMode {
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s {
            "direct" => Ok(Self::Direct),
            "approval" => Ok(Self::Approval),
            other => anyhow::bail!("invalid booking mode: {} (expected direct|approval)", other),
        }
    }

    fn initial_status(self) -> ReservationStatus {
        match self {
            Self::Direct => ReservationStatus::Confirmed,
            Self::Approval => ReservationStatus::Pending,
        }
    }
}

/// Public booking submission, wire names matching the reservation form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub date: NaiveDate,
    pub time_slot: String,
    pub name: String,
    pub phone: String,
    pub people: i32,
    pub teishoku_count: i32,
    pub seat_only_count: i32,
    #[serde(default)]
    pub memo: Option<String>,
}

/// A committed booking plus the tokens issued for it (empty in direct mode).
/// The tokens go to the notification sink, never into the HTTP response.
#[derive(Debug)]
pub struct BookingAccepted {
    pub reservation: Reservation,
    pub tokens: Vec<NewActionToken>,
}

/// Outcome of a token redemption, in the verify endpoint's wire shape.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RedeemReceipt {
    pub status: ReservationStatus,
    pub already_processed: bool,
}

pub struct BookingEngine {
    store: Arc<dyn Store>,
    catalog: SlotCatalog,
    cutoff: CutoffPolicy,
    clock: Arc<dyn Clock>,
    mode: BookingMode,
    token_ttl: Duration,
}

impl BookingEngine {
    pub fn new(
        store: Arc<dyn Store>,
        catalog: SlotCatalog,
        cutoff: CutoffPolicy,
        clock: Arc<dyn Clock>,
        mode: BookingMode,
        token_ttl: Duration,
    ) -> Self {
        Self {
            store,
            catalog,
            cutoff,
            clock,
            mode,
            token_ttl,
        }
    }

    pub fn catalog(&self) -> &SlotCatalog {
        &self.catalog
    }

    /// Remaining covers per slot for `date`. Lock-free read; a later booking
    /// re-validates capacity inside the transaction regardless.
    pub async fn availability(&self, date: NaiveDate) -> Result<BTreeMap<String, u32>, AppError> {
        let active = self.store.active_by_date(date).await?;
        Ok(remaining_by_slot(&self.catalog, &active))
    }

    /// Validate, gate on the cutoff policy, then atomically commit.
    pub async fn book(&self, req: BookingRequest) -> Result<BookingAccepted, AppError> {
        self.validate(&req)?;
        self.cutoff.check(req.date, self.clock.now_utc())?;

        let status = self.mode.initial_status();
        let tokens = match self.mode {
            BookingMode::Direct => Vec::new(),
            BookingMode::Approval => {
                let expires_at = self.clock.now_utc() + self.token_ttl;
                vec![
                    NewActionToken::generate(TokenAction::Approve, expires_at),
                    NewActionToken::generate(TokenAction::Reject, expires_at),
                ]
            }
        };

        let new = NewReservation {
            date: req.date,
            time_slot: req.time_slot,
            name: req.name,
            phone: req.phone,
            people: req.people,
            teishoku_count: req.teishoku_count,
            seat_only_count: req.seat_only_count,
            memo: req.memo,
            status,
        };

        match self
            .store
            .try_reserve(&new, self.catalog.capacity(), &tokens)
            .await?
        {
            ReserveOutcome::Created(reservation) => Ok(BookingAccepted {
                reservation,
                tokens,
            }),
            ReserveOutcome::SlotFull => Err(AppError::SlotFull),
        }
    }

    /// Admin block: claim every remaining seat of a slot so the calendar
    /// shows it unavailable. Bypasses the cutoff gate and the public party
    /// range, never the capacity invariant.
    pub async fn block(
        &self,
        date: NaiveDate,
        time_slot: &str,
        memo: Option<String>,
    ) -> Result<Reservation, AppError> {
        if !self.catalog.contains(time_slot) {
            return Err(AppError::Validation(format!(
                "unknown time slot: {time_slot}"
            )));
        }

        match self
            .store
            .try_block(date, time_slot, self.catalog.capacity(), memo)
            .await?
        {
            ReserveOutcome::Created(reservation) => Ok(reservation),
            ReserveOutcome::SlotFull => Err(AppError::SlotFull),
        }
    }

    /// Idempotent cancel: already-cancelled is a success, unknown id is
    /// not-found, REJECTED cannot move.
    pub async fn cancel(&self, id: Uuid) -> Result<Reservation, AppError> {
        match self.store.cancel(id).await? {
            CancelOutcome::Cancelled(r) | CancelOutcome::AlreadyCancelled(r) => Ok(r),
            CancelOutcome::NotCancellable(status) => Err(AppError::NotCancellable(status)),
            CancelOutcome::NotFound => Err(AppError::NotFound),
        }
    }

    /// Redeem an action token exactly once; duplicate redemptions report the
    /// settled status instead of re-applying.
    pub async fn redeem(&self, token: &str) -> Result<RedeemReceipt, AppError> {
        match self.store.redeem_token(token, self.clock.now_utc()).await? {
            RedeemOutcome::Redeemed { status } => Ok(RedeemReceipt {
                status,
                already_processed: false,
            }),
            RedeemOutcome::AlreadyProcessed { status } => Ok(RedeemReceipt {
                status,
                already_processed: true,
            }),
            RedeemOutcome::Expired => Err(AppError::TokenExpired),
            RedeemOutcome::NotFound => Err(AppError::TokenInvalid),
        }
    }

    /// Admin listing, cancelled/rejected rows included.
    pub async fn list(&self, date: Option<NaiveDate>) -> Result<Vec<Reservation>, AppError> {
        Ok(self.store.list(date).await?)
    }

    fn validate(&self, req: &BookingRequest) -> Result<(), AppError> {
        if req.name.trim().is_empty() {
            return Err(AppError::Validation("name is required".into()));
        }
        if req.phone.trim().is_empty() {
            return Err(AppError::Validation("phone is required".into()));
        }
        if !self.catalog.contains(&req.time_slot) {
            return Err(AppError::Validation(format!(
                "unknown time slot: {}",
                req.time_slot
            )));
        }
        if req.people < 1 || req.people > PUBLIC_PARTY_MAX {
            return Err(AppError::Validation(format!(
                "people must be between 1 and {PUBLIC_PARTY_MAX}"
            )));
        }
        if req.teishoku_count < 0 || req.seat_only_count < 0 {
            return Err(AppError::Validation(
                "breakdown counts must not be negative".into(),
            ));
        }
        if req.teishoku_count + req.seat_only_count != req.people {
            return Err(AppError::Validation(
                "breakdown does not match total people".into(),
            ));
        }
        Ok(())
    }
}

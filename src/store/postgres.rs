//! Postgres-backed store.
//!
//! The two critical sections serialize through `pg_advisory_xact_lock` keyed
//! on the contended row set: `date:slot` for capacity inserts, the
//! reservation id for redemption. The lock is transaction-scoped, so an
//! abort on any path releases it and leaves no partial state behind.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::reservation::{NewReservation, Reservation, ReservationStatus};
use crate::models::token::{NewActionToken, TokenAction};

use super::{CancelOutcome, RedeemOutcome, ReserveOutcome, Store};

const RESERVATION_COLUMNS: &str = "id, date, time_slot, name, phone, people, teishoku_count, \
     seat_only_count, memo, status, created_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run pending migrations from the migrations/ directory.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn active_sum(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        date: NaiveDate,
        time_slot: &str,
    ) -> anyhow::Result<i64> {
        let used: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(people), 0) FROM reservations \
             WHERE date = $1 AND time_slot = $2 AND status IN ('CONFIRMED', 'PENDING')",
        )
        .bind(date)
        .bind(time_slot)
        .fetch_one(&mut **tx)
        .await?;
        Ok(used)
    }

    async fn lock_slot(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        date: NaiveDate,
        time_slot: &str,
    ) -> anyhow::Result<()> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(format!("{}:{}", date, time_slot))
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn insert_reservation(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        new: &NewReservation,
    ) -> anyhow::Result<Reservation> {
        let row = sqlx::query_as::<_, Reservation>(&format!(
            "INSERT INTO reservations \
                 (date, time_slot, name, phone, people, teishoku_count, seat_only_count, memo, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {RESERVATION_COLUMNS}"
        ))
        .bind(new.date)
        .bind(&new.time_slot)
        .bind(&new.name)
        .bind(&new.phone)
        .bind(new.people)
        .bind(new.teishoku_count)
        .bind(new.seat_only_count)
        .bind(&new.memo)
        .bind(new.status)
        .fetch_one(&mut **tx)
        .await?;
        Ok(row)
    }
}

#[derive(sqlx::FromRow)]
struct TokenJoinRow {
    reservation_id: Uuid,
    action: TokenAction,
    expires_at: DateTime<Utc>,
    reservation_status: ReservationStatus,
}

#[async_trait]
impl Store for PgStore {
    async fn list(&self, date: Option<NaiveDate>) -> anyhow::Result<Vec<Reservation>> {
        let rows = match date {
            Some(d) => {
                sqlx::query_as::<_, Reservation>(&format!(
                    "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE date = $1 \
                     ORDER BY date ASC, time_slot ASC, created_at ASC"
                ))
                .bind(d)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Reservation>(&format!(
                    "SELECT {RESERVATION_COLUMNS} FROM reservations \
                     ORDER BY date ASC, time_slot ASC, created_at ASC"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows)
    }

    async fn active_by_date(&self, date: NaiveDate) -> anyhow::Result<Vec<Reservation>> {
        let rows = sqlx::query_as::<_, Reservation>(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations \
             WHERE date = $1 AND status IN ('CONFIRMED', 'PENDING') \
             ORDER BY time_slot ASC, created_at ASC"
        ))
        .bind(date)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Reservation>> {
        let row = sqlx::query_as::<_, Reservation>(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn try_reserve(
        &self,
        new: &NewReservation,
        capacity: u32,
        tokens: &[NewActionToken],
    ) -> anyhow::Result<ReserveOutcome> {
        let mut tx = self.pool.begin().await?;
        Self::lock_slot(&mut tx, new.date, &new.time_slot).await?;

        let used = Self::active_sum(&mut tx, new.date, &new.time_slot).await?;
        if used + i64::from(new.people) > i64::from(capacity) {
            tx.rollback().await?;
            return Ok(ReserveOutcome::SlotFull);
        }

        let reservation = Self::insert_reservation(&mut tx, new).await?;
        for token in tokens {
            sqlx::query(
                "INSERT INTO action_tokens (token, reservation_id, action, expires_at) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(&token.token)
            .bind(reservation.id)
            .bind(token.action)
            .bind(token.expires_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(ReserveOutcome::Created(reservation))
    }

    async fn try_block(
        &self,
        date: NaiveDate,
        time_slot: &str,
        capacity: u32,
        memo: Option<String>,
    ) -> anyhow::Result<ReserveOutcome> {
        let mut tx = self.pool.begin().await?;
        Self::lock_slot(&mut tx, date, time_slot).await?;

        let used = Self::active_sum(&mut tx, date, time_slot).await?;
        let remaining = i64::from(capacity) - used;
        if remaining <= 0 {
            tx.rollback().await?;
            return Ok(ReserveOutcome::SlotFull);
        }

        let new = NewReservation {
            date,
            time_slot: time_slot.to_string(),
            name: "BLOCK".to_string(),
            phone: "-".to_string(),
            people: remaining as i32,
            teishoku_count: 0,
            seat_only_count: remaining as i32,
            memo,
            status: ReservationStatus::Confirmed,
        };
        let reservation = Self::insert_reservation(&mut tx, &new).await?;

        tx.commit().await?;
        Ok(ReserveOutcome::Created(reservation))
    }

    async fn cancel(&self, id: Uuid) -> anyhow::Result<CancelOutcome> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Reservation>(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(current) = current else {
            tx.rollback().await?;
            return Ok(CancelOutcome::NotFound);
        };

        if current.status == ReservationStatus::Cancelled {
            tx.rollback().await?;
            return Ok(CancelOutcome::AlreadyCancelled(current));
        }
        if !current.status.is_cancellable() {
            tx.rollback().await?;
            return Ok(CancelOutcome::NotCancellable(current.status));
        }

        let updated = sqlx::query_as::<_, Reservation>(&format!(
            "UPDATE reservations SET status = 'CANCELLED' WHERE id = $1 \
             RETURNING {RESERVATION_COLUMNS}"
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        // Outstanding tokens stay; the transition guard in redeem_token
        // reports the cancellation to late clickers.
        tx.commit().await?;
        Ok(CancelOutcome::Cancelled(updated))
    }

    async fn redeem_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<RedeemOutcome> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, TokenJoinRow>(
            "SELECT t.reservation_id, t.action, t.expires_at, r.status AS reservation_status \
             FROM action_tokens t \
             JOIN reservations r ON r.id = t.reservation_id \
             WHERE t.token = $1 \
             FOR UPDATE OF r",
        )
        .bind(token)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(RedeemOutcome::NotFound);
        };

        if now > row.expires_at {
            tx.rollback().await?;
            return Ok(RedeemOutcome::Expired);
        }

        let target = row.action.target_status();
        if !row.reservation_status.can_transition_to(target) {
            tx.rollback().await?;
            return Ok(RedeemOutcome::AlreadyProcessed {
                status: row.reservation_status,
            });
        }

        sqlx::query("UPDATE reservations SET status = $1 WHERE id = $2")
            .bind(target)
            .bind(row.reservation_id)
            .execute(&mut *tx)
            .await?;
        // Kill the sibling APPROVE/REJECT link outright. The redeemed token
        // itself survives so duplicate clicks read the settled status
        // (already-processed) instead of "invalid token"; the status guard
        // above keeps it inert and the cleanup job removes it after expiry.
        sqlx::query("DELETE FROM action_tokens WHERE reservation_id = $1 AND token <> $2")
            .bind(row.reservation_id)
            .bind(token)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(RedeemOutcome::Redeemed { status: target })
    }

    async fn purge_expired_tokens(&self, cutoff: DateTime<Utc>) -> anyhow::Result<u64> {
        let result = sqlx::query("DELETE FROM action_tokens WHERE expires_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

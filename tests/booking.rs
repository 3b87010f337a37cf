//! Integration tests for the booking engine driven against the in-memory
//! store: capacity safety (including under concurrency), validation, the
//! cutoff gate, idempotent cancellation and slot blocking.

use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};

use yoyaku::booking::{BookingEngine, BookingMode, BookingRequest};
use yoyaku::clock::FixedClock;
use yoyaku::cutoff::CutoffPolicy;
use yoyaku::errors::AppError;
use yoyaku::models::reservation::ReservationStatus;
use yoyaku::slots::SlotCatalog;
use yoyaku::store::memory::MemStore;
use yoyaku::store::Store;

/// A UTC instant whose JST reading is the given local date-time.
fn jst(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
    FixedOffset::east_opt(9 * 3600)
        .unwrap()
        .with_ymd_and_hms(y, m, d, h, min, s)
        .unwrap()
        .with_timezone(&Utc)
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn engine_at(now: DateTime<Utc>, store: Arc<MemStore>, mode: BookingMode) -> BookingEngine {
    BookingEngine::new(
        store,
        SlotCatalog::standard(),
        CutoffPolicy::standard(),
        Arc::new(FixedClock(now)),
        mode,
        Duration::hours(48),
    )
}

/// Direct-mode engine, clock pinned to Thursday 2025-07-03 09:00 JST.
fn engine() -> BookingEngine {
    engine_at(jst(2025, 7, 3, 9, 0, 0), Arc::new(MemStore::new()), BookingMode::Direct)
}

fn request(slot: &str, people: i32) -> BookingRequest {
    BookingRequest {
        date: date(2025, 7, 4), // Friday
        time_slot: slot.into(),
        name: "Tanaka".into(),
        phone: "090-1111-2222".into(),
        people,
        teishoku_count: people,
        seat_only_count: 0,
        memo: None,
    }
}

// ── Capacity ─────────────────────────────────────────────────

#[tokio::test]
async fn worked_capacity_example_fills_slot_exactly() {
    let engine = engine();

    // 4 booked out of 6
    let first = engine.book(request("12:15", 4)).await.unwrap();
    assert_eq!(first.reservation.status, ReservationStatus::Confirmed);

    // 4 + 3 > 6 → rejected
    let err = engine.book(request("12:15", 3)).await.unwrap_err();
    assert!(matches!(err, AppError::SlotFull));

    // 4 + 2 = 6 → fits exactly
    engine.book(request("12:15", 2)).await.unwrap();

    // 6 + 1 > 6 → rejected
    let err = engine.book(request("12:15", 1)).await.unwrap_err();
    assert!(matches!(err, AppError::SlotFull));

    let avail = engine.availability(date(2025, 7, 4)).await.unwrap();
    assert_eq!(avail["12:15"], 0);
    // Other slots untouched
    assert_eq!(avail["11:30"], 6);
    assert_eq!(avail["13:00"], 6);
}

#[tokio::test]
async fn concurrent_bookings_never_overshoot_capacity() {
    let store = Arc::new(MemStore::new());
    let engine = Arc::new(engine_at(
        jst(2025, 7, 3, 9, 0, 0),
        store.clone(),
        BookingMode::Direct,
    ));

    // Ten parties of two race for six seats: exactly three must win.
    let attempts = (0..10).map(|_| {
        let engine = engine.clone();
        tokio::spawn(async move { engine.book(request("11:30", 2)).await })
    });
    let results = futures::future::join_all(attempts).await;

    let mut succeeded = 0;
    let mut full = 0;
    for result in results {
        match result.unwrap() {
            Ok(_) => succeeded += 1,
            Err(AppError::SlotFull) => full += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(succeeded, 3);
    assert_eq!(full, 7);

    // The invariant holds in the store itself, not just the responses.
    let active = store.active_by_date(date(2025, 7, 4)).await.unwrap();
    let total: i32 = active.iter().map(|r| r.people).sum();
    assert_eq!(total, 6);
}

#[tokio::test]
async fn cancelled_reservation_frees_its_seats() {
    let engine = engine();

    let booked = engine.book(request("13:00", 4)).await.unwrap();
    assert_eq!(
        engine.availability(date(2025, 7, 4)).await.unwrap()["13:00"],
        2
    );

    engine.cancel(booked.reservation.id).await.unwrap();
    assert_eq!(
        engine.availability(date(2025, 7, 4)).await.unwrap()["13:00"],
        6
    );

    // And the freed seats are bookable again
    engine.book(request("13:00", 4)).await.unwrap();
}

// ── Validation ───────────────────────────────────────────────

#[tokio::test]
async fn breakdown_mismatch_is_rejected_regardless_of_capacity() {
    let engine = engine();
    let mut req = request("11:30", 3);
    req.teishoku_count = 1;
    req.seat_only_count = 1; // 1 + 1 != 3
    let err = engine.book(req).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn negative_breakdown_counts_are_rejected() {
    let engine = engine();
    let mut req = request("11:30", 2);
    req.teishoku_count = 3;
    req.seat_only_count = -1; // sums to 2 but is nonsense
    let err = engine.book(req).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn party_size_outside_public_range_is_rejected() {
    let engine = engine();
    for people in [0, 5] {
        let err = engine.book(request("11:30", people)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)), "people = {people}");
    }
}

#[tokio::test]
async fn unknown_slot_and_blank_contact_are_rejected() {
    let engine = engine();

    let err = engine.book(request("12:00", 2)).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let mut req = request("11:30", 2);
    req.name = "  ".into();
    let err = engine.book(req).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

// ── Cutoff gate ──────────────────────────────────────────────

#[tokio::test]
async fn same_day_booking_after_cutoff_is_rejected_but_next_day_succeeds() {
    // 10:05 local on the requested Friday
    let store = Arc::new(MemStore::new());
    let engine = engine_at(jst(2025, 7, 4, 10, 5, 0), store, BookingMode::Direct);

    let err = engine.book(request("12:15", 2)).await.unwrap_err();
    assert!(matches!(err, AppError::CutOff));

    let mut next_day = request("12:15", 2);
    next_day.date = date(2025, 7, 5); // Saturday
    engine.book(next_day).await.unwrap();
}

#[tokio::test]
async fn closed_weekday_is_rejected_even_with_full_capacity() {
    let engine = engine();
    let mut req = request("12:15", 2);
    req.date = date(2025, 7, 6); // Sunday
    let err = engine.book(req).await.unwrap_err();
    assert!(matches!(err, AppError::ClosedDay));
}

// ── Cancel ───────────────────────────────────────────────────

#[tokio::test]
async fn cancel_is_idempotent_and_unknown_id_is_not_found() {
    let engine = engine();
    let booked = engine.book(request("11:30", 2)).await.unwrap();

    let first = engine.cancel(booked.reservation.id).await.unwrap();
    assert_eq!(first.status, ReservationStatus::Cancelled);

    // Second cancel is a no-op success with the same final state
    let second = engine.cancel(booked.reservation.id).await.unwrap();
    assert_eq!(second.status, ReservationStatus::Cancelled);

    let err = engine.cancel(uuid::Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound));
}

// ── Admin block ──────────────────────────────────────────────

#[tokio::test]
async fn block_claims_exactly_the_remaining_seats() {
    let engine = engine();
    engine.book(request("12:15", 4)).await.unwrap();

    let block = engine
        .block(date(2025, 7, 4), "12:15", Some("private party".into()))
        .await
        .unwrap();
    assert_eq!(block.people, 2);
    assert_eq!(block.status, ReservationStatus::Confirmed);

    let avail = engine.availability(date(2025, 7, 4)).await.unwrap();
    assert_eq!(avail["12:15"], 0);

    // A second block has nothing left to claim
    let err = engine
        .block(date(2025, 7, 4), "12:15", None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::SlotFull));
}

#[tokio::test]
async fn block_rejects_unknown_slot() {
    let engine = engine();
    let err = engine
        .block(date(2025, 7, 4), "14:00", None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

// ── Admin listing ────────────────────────────────────────────

#[tokio::test]
async fn listing_includes_cancelled_rows_and_orders_by_slot_then_creation() {
    let engine = engine();

    let late_slot = engine.book(request("13:00", 1)).await.unwrap();
    let early_slot = engine.book(request("11:30", 1)).await.unwrap();
    let cancelled = engine.book(request("11:30", 2)).await.unwrap();
    engine.cancel(cancelled.reservation.id).await.unwrap();

    let rows = engine.list(Some(date(2025, 7, 4))).await.unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].id, early_slot.reservation.id);
    assert_eq!(rows[1].id, cancelled.reservation.id);
    assert_eq!(rows[1].status, ReservationStatus::Cancelled);
    assert_eq!(rows[2].id, late_slot.reservation.id);
}

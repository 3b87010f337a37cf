//! Yoyaku — capacity-safe lunch reservation backend.
//!
//! The booking engine, lifecycle state machine and action-token protocol
//! live in the library so integration tests can drive them against the
//! in-memory store; the binary wires them to Postgres and axum.

pub mod api;
pub mod availability;
pub mod booking;
pub mod cli;
pub mod clock;
pub mod config;
pub mod cutoff;
pub mod errors;
pub mod jobs;
pub mod models;
pub mod notification;
pub mod slots;
pub mod store;

use notification::webhook::ReservationNotifier;

/// Shared application state passed to handlers.
pub struct AppState {
    pub engine: booking::BookingEngine,
    pub notifier: ReservationNotifier,
    pub config: config::Config,
}

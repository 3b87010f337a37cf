use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::booking::{BookingRequest, RedeemReceipt};
use crate::errors::AppError;
use crate::models::reservation::{Reservation, ReservationStatus};
use crate::notification::webhook::ReservationEvent;
use crate::AppState;

// ── Request / Response DTOs ──────────────────────────────────

#[derive(Deserialize)]
pub struct DateParams {
    pub date: Option<NaiveDate>,
}

#[derive(Deserialize)]
pub struct VerifyParams {
    pub token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    pub success: bool,
    pub status: ReservationStatus,
}

// ── Handlers ─────────────────────────────────────────────────

/// GET /api/availability?date=YYYY-MM-DD — remaining covers per slot.
pub async fn availability(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DateParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    let date = params
        .date
        .ok_or_else(|| AppError::Validation("date is required".into()))?;
    let remaining = state.engine.availability(date).await?;
    Ok(Json(json!(remaining)))
}

/// POST /api/reservations — submit a booking from the public form.
pub async fn create_reservation(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<BookingRequest>,
) -> Result<(StatusCode, Json<Reservation>), AppError> {
    let accepted = state.engine.book(payload).await?;

    // Fire-and-forget: notification failure never affects the response.
    let event = match accepted.reservation.status {
        ReservationStatus::Pending => ReservationEvent::pending(
            accepted.reservation.clone(),
            &accepted.tokens,
            &state.config.base_url,
        ),
        _ => ReservationEvent::confirmed(accepted.reservation.clone()),
    };
    let notifier = state.notifier.clone();
    tokio::spawn(async move { notifier.notify(event).await });

    Ok((StatusCode::CREATED, Json(accepted.reservation)))
}

/// DELETE /api/admin/reservations/:id — idempotent cancel.
pub async fn cancel_reservation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<CancelResponse>, AppError> {
    let reservation = state.engine.cancel(id).await?;

    let notifier = state.notifier.clone();
    let event = ReservationEvent::cancelled(reservation.clone());
    tokio::spawn(async move { notifier.notify(event).await });

    Ok(Json(CancelResponse {
        success: true,
        status: reservation.status,
    }))
}

/// GET /api/admin/reservations?date=... — full listing for the admin view,
/// cancelled and rejected rows included.
pub async fn admin_list_reservations(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DateParams>,
) -> Result<Json<Vec<Reservation>>, AppError> {
    let reservations = state.engine.list(params.date).await?;
    Ok(Json(reservations))
}

/// GET /api/verify?token=... — redeem an approval/rejection link.
pub async fn verify(
    State(state): State<Arc<AppState>>,
    Query(params): Query<VerifyParams>,
) -> Result<Json<RedeemReceipt>, AppError> {
    let token = params
        .token
        .ok_or_else(|| AppError::Validation("token is required".into()))?;
    let receipt = state.engine.redeem(&token).await?;
    Ok(Json(receipt))
}

//! Notification sink — fire-and-forget webhook delivery of finalized
//! reservations.
//!
//! Delivery runs outside the booking transaction and must never fail or
//! delay the booking response: the handler spawns `notify` and moves on,
//! and every error in here ends as a logged warning. When no webhook URL is
//! configured the event is logged instead, so a bare dev setup still shows
//! what would have been sent.

use std::time::Duration;

use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use tracing::{info, warn};

use crate::models::reservation::Reservation;
use crate::models::token::{NewActionToken, TokenAction};

// ── Event payloads ───────────────────────────────────────────

/// A structured event sent to the webhook endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationEvent {
    /// "reservation_confirmed", "reservation_pending" or
    /// "reservation_cancelled".
    pub event_type: String,
    /// ISO-8601 timestamp of when the event was emitted.
    pub timestamp: String,
    pub reservation: Reservation,
    /// Verify link that confirms the pending reservation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approve_url: Option<String>,
    /// Verify link that rejects it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reject_url: Option<String>,
}

impl ReservationEvent {
    pub fn confirmed(reservation: Reservation) -> Self {
        Self {
            event_type: "reservation_confirmed".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            reservation,
            approve_url: None,
            reject_url: None,
        }
    }

    /// A PENDING reservation, carrying the action links the approver clicks.
    pub fn pending(reservation: Reservation, tokens: &[NewActionToken], base_url: &str) -> Self {
        let link = |action: TokenAction| {
            tokens
                .iter()
                .find(|t| t.action == action)
                .map(|t| format!("{}/api/verify?token={}", base_url.trim_end_matches('/'), t.token))
        };
        Self {
            event_type: "reservation_pending".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            approve_url: link(TokenAction::Approve),
            reject_url: link(TokenAction::Reject),
            reservation,
        }
    }

    pub fn cancelled(reservation: Reservation) -> Self {
        Self {
            event_type: "reservation_cancelled".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            reservation,
            approve_url: None,
            reject_url: None,
        }
    }
}

// ── HMAC signing ─────────────────────────────────────────────

/// HMAC-SHA256 of `payload`, rendered as "sha256=<hex>".
fn hmac_sha256_hex(secret: &str, payload: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(payload);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

// ── Notifier ─────────────────────────────────────────────────

/// Dispatches reservation events to the configured webhook URL with up to
/// three attempts (1s → 5s → 25s back-off) and an optional HMAC-SHA256
/// signature in `X-Yoyaku-Signature`.
#[derive(Clone)]
pub struct ReservationNotifier {
    client: reqwest::Client,
    webhook_url: Option<String>,
    secret: Option<String>,
}

impl ReservationNotifier {
    pub fn new(webhook_url: Option<String>, secret: Option<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .user_agent("Yoyaku-Webhook/1.0")
                .build()
                .expect("failed to build webhook HTTP client"),
            webhook_url,
            secret,
        }
    }

    /// Deliver one event. Best-effort: all failures are logged and absorbed.
    pub async fn notify(&self, event: ReservationEvent) {
        let payload = match serde_json::to_vec(&event) {
            Ok(p) => p,
            Err(e) => {
                warn!("failed to serialize {} event: {}", event.event_type, e);
                return;
            }
        };

        let Some(url) = &self.webhook_url else {
            info!(
                event = %event.event_type,
                payload = %String::from_utf8_lossy(&payload),
                "no webhook URL configured; logging reservation event"
            );
            return;
        };

        let mut delay = Duration::from_secs(1);
        for attempt in 1..=3u32 {
            let mut req = self
                .client
                .post(url)
                .header("content-type", "application/json")
                .body(payload.clone());
            if let Some(secret) = &self.secret {
                req = req.header("X-Yoyaku-Signature", hmac_sha256_hex(secret, &payload));
            }

            match req.send().await {
                Ok(resp) if resp.status().is_success() => {
                    info!(
                        event = %event.event_type,
                        attempt,
                        "webhook delivered"
                    );
                    return;
                }
                Ok(resp) => {
                    warn!(
                        event = %event.event_type,
                        attempt,
                        status = %resp.status(),
                        "webhook endpoint returned an error"
                    );
                }
                Err(e) => {
                    warn!(event = %event.event_type, attempt, "webhook send failed: {}", e);
                }
            }

            if attempt < 3 {
                tokio::time::sleep(delay).await;
                delay *= 5;
            }
        }

        warn!(event = %event.event_type, "webhook delivery gave up after 3 attempts");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::reservation::ReservationStatus;
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    fn sample_reservation(status: ReservationStatus) -> Reservation {
        Reservation {
            id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2025, 7, 4).unwrap(),
            time_slot: "12:15".into(),
            name: "Tanaka".into(),
            phone: "090-1111-2222".into(),
            people: 2,
            teishoku_count: 2,
            seat_only_count: 0,
            memo: None,
            status,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn confirmed_event_carries_no_action_links() {
        let event = ReservationEvent::confirmed(sample_reservation(ReservationStatus::Confirmed));
        assert_eq!(event.event_type, "reservation_confirmed");
        assert!(event.approve_url.is_none());
        assert!(event.reject_url.is_none());
    }

    #[test]
    fn pending_event_builds_verify_links_for_both_actions() {
        let expires = Utc::now();
        let tokens = vec![
            NewActionToken::generate(TokenAction::Approve, expires),
            NewActionToken::generate(TokenAction::Reject, expires),
        ];
        let event = ReservationEvent::pending(
            sample_reservation(ReservationStatus::Pending),
            &tokens,
            "http://localhost:8080/",
        );
        let approve = event.approve_url.unwrap();
        let reject = event.reject_url.unwrap();
        assert!(approve.starts_with("http://localhost:8080/api/verify?token=act_"));
        assert!(reject.starts_with("http://localhost:8080/api/verify?token=act_"));
        assert_ne!(approve, reject);
    }

    #[test]
    fn signature_is_hex_sha256() {
        let sig = hmac_sha256_hex("secret", b"payload");
        assert!(sig.starts_with("sha256="));
        assert_eq!(sig.len(), "sha256=".len() + 64);
    }
}

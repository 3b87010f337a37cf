use chrono::Weekday;

use crate::booking::BookingMode;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// Shared key for the admin routes; they refuse every request when
    /// this is unset.
    pub admin_key: Option<String>,
    /// URL the notification sink posts reservation events to. Unset means
    /// events are logged instead of delivered.
    pub webhook_url: Option<String>,
    /// Optional HMAC secret for signing webhook payloads.
    pub webhook_secret: Option<String>,
    /// Public base URL used to build verify links in pending-mode events.
    pub base_url: String,
    /// Dashboard origin allowed by CORS.
    pub allowed_origin: String,
    /// Initial status of web bookings: direct (CONFIRMED) or approval
    /// (PENDING until a token is redeemed).
    pub booking_mode: BookingMode,
    /// Bookable slots, in seating order.
    pub slots: Vec<String>,
    /// Uniform per-slot capacity.
    pub capacity: u32,
    /// Restaurant timezone as a fixed UTC offset in hours (JST = 9).
    pub tz_offset_hours: i32,
    /// Local hour after which same-day bookings close.
    pub cutoff_hour: u32,
    /// Weekly closing days.
    pub closed_weekdays: Vec<Weekday>,
    /// Lifetime of issued action tokens, in hours.
    pub token_ttl_hours: i64,
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();

    let booking_mode = BookingMode::parse(
        &std::env::var("YOYAKU_BOOKING_MODE").unwrap_or_else(|_| "direct".into()),
    )?;

    let closed_weekdays = std::env::var("YOYAKU_CLOSED_WEEKDAYS")
        .unwrap_or_else(|_| "sun,mon".into())
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<Weekday>()
                .map_err(|_| anyhow::anyhow!("invalid weekday in YOYAKU_CLOSED_WEEKDAYS: {}", s))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let slots: Vec<String> = std::env::var("YOYAKU_SLOTS")
        .unwrap_or_else(|_| "11:30,12:15,13:00".into())
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();
    if slots.is_empty() {
        anyhow::bail!("YOYAKU_SLOTS must name at least one slot");
    }

    Ok(Config {
        port: std::env::var("YOYAKU_PORT")
            .unwrap_or_else(|_| "8080".into())
            .parse()
            .unwrap_or(8080),
        database_url: std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/yoyaku".into()),
        admin_key: std::env::var("YOYAKU_ADMIN_KEY").ok(),
        webhook_url: std::env::var("YOYAKU_WEBHOOK_URL").ok(),
        webhook_secret: std::env::var("YOYAKU_WEBHOOK_SECRET").ok(),
        base_url: std::env::var("YOYAKU_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8080".into()),
        allowed_origin: std::env::var("YOYAKU_ALLOWED_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".into()),
        booking_mode,
        slots,
        capacity: std::env::var("YOYAKU_CAPACITY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(6),
        tz_offset_hours: std::env::var("YOYAKU_TZ_OFFSET_HOURS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(9),
        cutoff_hour: std::env::var("YOYAKU_CUTOFF_HOUR")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10),
        closed_weekdays,
        token_ttl_hours: std::env::var("YOYAKU_TOKEN_TTL_HOURS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(48),
    })
}

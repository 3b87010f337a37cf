use std::net::SocketAddr;
use std::sync::Arc;

use chrono::{Duration, FixedOffset};
use clap::Parser;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use yoyaku::booking::BookingEngine;
use yoyaku::clock::SystemClock;
use yoyaku::cutoff::CutoffPolicy;
use yoyaku::notification::webhook::ReservationNotifier;
use yoyaku::slots::SlotCatalog;
use yoyaku::store::postgres::PgStore;
use yoyaku::store::Store;
use yoyaku::{api, cli, config, jobs, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "yoyaku=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = config::load()?;
    let args = cli::Cli::parse();

    let result = match args.command {
        Some(cli::Commands::Serve { port }) => run_server(cfg, port).await,
        Some(cli::Commands::Reservation { command }) => {
            let (state, _store) = build_state(&cfg).await?;
            handle_reservation_command(command, &state).await
        }
        None => {
            let port = cfg.port;
            run_server(cfg, port).await
        }
    };

    if let Err(ref e) = result {
        eprintln!("Error: {:?}", e);
    }
    result
}

async fn build_state(cfg: &config::Config) -> anyhow::Result<(Arc<AppState>, Arc<dyn Store>)> {
    tracing::info!("Connecting to database...");
    let db = PgStore::connect(&cfg.database_url).await?;

    tracing::info!("Running migrations...");
    db.migrate().await?;

    let store: Arc<dyn Store> = Arc::new(db);

    let tz_offset = FixedOffset::east_opt(cfg.tz_offset_hours * 3600)
        .ok_or_else(|| anyhow::anyhow!("invalid YOYAKU_TZ_OFFSET_HOURS"))?;
    let engine = BookingEngine::new(
        store.clone(),
        SlotCatalog::new(cfg.slots.clone(), cfg.capacity),
        CutoffPolicy::new(tz_offset, cfg.cutoff_hour, cfg.closed_weekdays.clone()),
        Arc::new(SystemClock),
        cfg.booking_mode,
        Duration::hours(cfg.token_ttl_hours),
    );

    let state = Arc::new(AppState {
        engine,
        notifier: ReservationNotifier::new(cfg.webhook_url.clone(), cfg.webhook_secret.clone()),
        config: cfg.clone(),
    });
    Ok((state, store))
}

async fn run_server(cfg: config::Config, port: u16) -> anyhow::Result<()> {
    let allowed_origin = cfg.allowed_origin.clone();
    let (state, store) = build_state(&cfg).await?;

    let app = axum::Router::new()
        // Health endpoint (no auth)
        .route("/healthz", axum::routing::get(|| async { "ok" }))
        .nest("/api", api::api_router(state.clone()))
        .with_state(state.clone())
        .layer({
            use axum::http::{HeaderName, Method};
            use tower_http::cors::AllowOrigin;
            CorsLayer::new()
                .allow_origin(AllowOrigin::predicate(move |origin, _| {
                    let origin_str = origin.to_str().unwrap_or("");
                    origin_str == allowed_origin
                        || origin_str.starts_with("http://localhost:")
                        || origin_str.starts_with("http://127.0.0.1:")
                }))
                .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
                .allow_headers([
                    HeaderName::from_static("content-type"),
                    HeaderName::from_static("x-admin-key"),
                    HeaderName::from_static("authorization"),
                ])
        })
        .layer(axum::middleware::from_fn(request_id_middleware));

    jobs::cleanup::spawn(store);
    tracing::info!("Background token cleanup job started (hourly)");

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("yoyaku listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Middleware: injects a unique X-Request-Id into every response so clients
/// can correlate errors with server logs.
async fn request_id_middleware(
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let req_id = uuid::Uuid::new_v4().to_string();
    let mut resp = next.run(req).await;
    if let Ok(val) = axum::http::HeaderValue::from_str(&req_id) {
        resp.headers_mut().insert("x-request-id", val);
    }
    resp
}

async fn handle_reservation_command(
    cmd: cli::ReservationCommands,
    state: &Arc<AppState>,
) -> anyhow::Result<()> {
    match cmd {
        cli::ReservationCommands::List { date } => {
            let reservations = state.engine.list(date).await?;
            if reservations.is_empty() {
                println!("No reservations found.");
            } else {
                println!(
                    "{:<38} {:<12} {:<7} {:<10} {:<8} NAME",
                    "ID", "DATE", "SLOT", "STATUS", "PEOPLE"
                );
                for r in reservations {
                    println!(
                        "{:<38} {:<12} {:<7} {:<10} {:<8} {}",
                        r.id,
                        r.date,
                        r.time_slot,
                        r.status.as_str(),
                        r.people,
                        r.name
                    );
                }
            }
        }
        cli::ReservationCommands::Cancel { id } => {
            let reservation = state.engine.cancel(id).await?;
            println!("Reservation {} is now {}.", id, reservation.status.as_str());
        }
        cli::ReservationCommands::Block { date, slot, memo } => {
            let reservation = state.engine.block(date, &slot, memo).await?;
            println!(
                "Blocked {} {} ({} seats claimed).",
                date, slot, reservation.people
            );
        }
    }
    Ok(())
}

// Framework bootstrap for the relay runtime.

use crate::domain::World;
use crate::frameworks::config;
use crate::interface_adapters::hub::SessionHub;
use crate::interface_adapters::net::ws_handler;
use crate::interface_adapters::state::AppState;
use crate::use_cases::PlayerRegistry;

use axum::{Router, routing::get};
use std::{io::Result, sync::Arc};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(config::WS_PATH, get(ws_handler))
        .with_state(state)
}

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    serve(listener, build_state()?).await
}

/// Serves the relay over `listener` using an already assembled state.
pub async fn serve(listener: tokio::net::TcpListener, state: Arc<AppState>) -> Result<()> {
    let address = listener.local_addr()?;
    let app = router(state);

    tracing::info!(%address, path = config::WS_PATH, "listening");

    // Serve app and report errors rather than panicking
    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = config::bind_address();

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

fn build_state() -> Result<Arc<AppState>> {
    let registry = Arc::new(PlayerRegistry::new());

    // The hub control task lives as long as any AppState clone holds its handle.
    let hub = SessionHub::spawn(registry.clone(), config::hub_event_capacity());

    let world = World::default_layout();
    let outbound_queue_capacity = config::outbound_queue_capacity();
    let state = AppState::new(hub, registry, &world, outbound_queue_capacity)
        .map_err(|e| std::io::Error::other(format!("failed to encode world state: {e}")))?;
    tracing::debug!(
        world_objects = world.objects().len(),
        outbound_queue_capacity,
        "relay state ready"
    );

    Ok(Arc::new(state))
}

mod auth;
mod backend;
mod config;
mod error;
mod inflight;
mod middleware;
mod models;
mod navigation;
mod notifications;
mod routes;
mod services;
mod session;
mod status;
mod validation;

use std::sync::Arc;
use std::time::Duration;

use crate::{backend::ReqwestTransport, config::Config, models::AppState};

use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use axum::http::{HeaderValue, Method, header};
use tracing_subscriber::EnvFilter;

fn cors_layer(cfg: &Config) -> anyhow::Result<CorsLayer> {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    Ok(match &cfg.cors_allow_origin {
        // Credentialed requests need an explicit origin.
        Some(origin) => cors
            .allow_origin(AllowOrigin::exact(HeaderValue::from_str(origin)?))
            .allow_credentials(true),
        None => cors.allow_origin(Any),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cfg = Config::from_env()?;
    let transport = ReqwestTransport::new(
        &cfg.api_base_url,
        Duration::from_secs(cfg.backend_timeout_secs),
    )?;
    let state = AppState::new(Arc::new(transport), cfg.token_cookie_max_age_secs);

    let app = routes::router(state)
        .layer(cors_layer(&cfg)?)
        .layer(TraceLayer::new_for_http());

    tracing::info!(backend = %cfg.api_base_url, "Listening on http://{}", cfg.bind_addr);
    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

mod config;
mod db;
mod error;
mod handlers;
mod middleware;
mod models;
mod services;
mod storage;
mod views;

#[cfg(test)]
mod test_support;

use config::Config;
use db::PgOnsenLogRepository;
use middleware::rate_limit::RateLimitState;
use services::geocoding::{Geocoder, GoogleGeocoder};
use services::photos::PhotoPipeline;
use services::record_store::RecordStore;
use services::submission::LogSubmitter;
use storage::FilesystemObjectStore;

/// Everything a handler needs, built once in `main`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: RecordStore,
    pub geocoder: Arc<dyn Geocoder>,
    pub submitter: LogSubmitter,
    pub rate_limiter: RateLimitState,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "deepsleeping_api=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    let config = Arc::new(Config::from_env()?);

    let db = db::create_pool(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&db).await?;
    tracing::info!("Database migrations applied");

    let store = RecordStore::new(Arc::new(PgOnsenLogRepository::new(db)));

    let geocoder: Arc<dyn Geocoder> = Arc::new(GoogleGeocoder::new(
        &config.geocoding_endpoint,
        config.geocoding_api_key.clone(),
        Duration::from_secs(config.geocoding_timeout_secs),
    )?);
    if config.geocoding_api_key.is_none() {
        tracing::warn!("GEOCODING_API_KEY is not set; new logs will have no coordinates");
    }

    let objects = FilesystemObjectStore::new(
        config.photo_storage_dir.clone(),
        &config.photo_public_base_url,
    )
    .await?;
    let photos = PhotoPipeline::new(Arc::new(objects), config.photo_target_width);

    let rate_limiter = RateLimitState::new(config.geocode_rate_limit);
    middleware::rate_limit::spawn_cleanup_worker(rate_limiter.clone());

    let state = AppState {
        config: config.clone(),
        submitter: LogSubmitter::new(store.clone(), geocoder.clone(), photos),
        store,
        geocoder,
        rate_limiter,
    };

    let app = build_router(state);

    let addr = config.listen_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    // Client IP is needed by the geocode rate limiter.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    let geocode_routes = Router::new()
        .route("/api/geocode", post(handlers::geocode::geocode))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit::rate_limit_geocode,
        ));

    let log_routes = Router::new()
        .route(
            "/api/logs",
            get(handlers::onsen_logs::list_logs).post(handlers::onsen_logs::create_log),
        )
        .route(
            "/api/logs/:id",
            get(handlers::onsen_logs::get_log).put(handlers::onsen_logs::update_log),
        )
        .route(
            "/api/logs/:id/photo",
            post(handlers::onsen_logs::replace_photo),
        )
        .layer(handlers::onsen_logs::upload_body_limit(
            state.config.upload_max_bytes,
        ));

    let api_routes = Router::new()
        .route("/api/home", get(handlers::home::home))
        .route("/ws", get(handlers::ws::ws_handler));

    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/readyz", get(handlers::health::readyz));

    let allowed_origins: Vec<axum::http::HeaderValue> = {
        let mut origins = Vec::new();
        if let Ok(origin) = state.config.frontend_url.parse::<axum::http::HeaderValue>() {
            origins.push(origin);
        }
        if let Ok(extra) = std::env::var("CORS_EXTRA_ORIGINS") {
            for o in extra.split(',') {
                if let Ok(hv) = o.trim().parse::<axum::http::HeaderValue>() {
                    origins.push(hv);
                }
            }
        }
        origins
    };
    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
        ]);

    let photos = ServeDir::new(state.config.photo_storage_dir.clone());

    Router::new()
        .merge(public_routes)
        .merge(geocode_routes)
        .merge(log_routes)
        .merge(api_routes)
        .nest_service("/photos", photos)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

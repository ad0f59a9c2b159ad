use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use bloodlink_api::auth::{self, AppState, AppStateInner};
use bloodlink_api::board;
use bloodlink_api::donations;
use bloodlink_api::media;
use bloodlink_api::middleware::require_auth;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bloodlink=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("BLOODLINK_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("BLOODLINK_DB_PATH").unwrap_or_else(|_| "bloodlink.db".into());
    let media_dir =
        PathBuf::from(std::env::var("BLOODLINK_MEDIA_DIR").unwrap_or_else(|_| "media".into()));
    let host = std::env::var("BLOODLINK_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("BLOODLINK_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database and media storage
    let db = bloodlink_db::Database::open(&PathBuf::from(&db_path))?;
    tokio::fs::create_dir_all(&media_dir).await?;

    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret,
        media_dir,
    });

    // Routes
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/media/{key}", get(media::download))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/donations", post(donations::create))
        .route("/donations/{id}", get(donations::retrieve))
        .route("/donations/match", post(donations::find_match))
        .route("/donations/match/select", post(donations::select_match))
        .route("/donations/match/reject", post(donations::reject_match))
        .route("/donations/match/confirm", post(donations::confirm_match))
        .route("/donations/match/cancel", post(donations::cancel_match))
        .route("/board/donations", get(board::list_donation_posts))
        .route("/board/donations", post(board::create_donation_post))
        .route("/board/donations/{id}", get(board::get_donation_post))
        .route("/board/requests", get(board::list_request_posts))
        .route("/board/requests", post(board::create_request_post))
        .route("/board/requests/{id}", get(board::get_request_post))
        .layer(middleware::from_fn(require_auth))
        .layer(DefaultBodyLimit::max(bloodlink_api::media::MAX_IMAGE_SIZE + 64 * 1024))
        .with_state(state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    info!("bloodlink server listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

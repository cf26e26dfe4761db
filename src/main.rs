use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};

use http::{header, Method};
use std::net::SocketAddr;
use std::time::Duration;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};

use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod state;
mod db;
mod crypto {
    pub mod password;
    pub mod token;
}

mod models {
    pub mod user;
    pub mod session;
    pub mod todo;
}

mod repositories {
    pub mod user;
    pub mod session;
    pub mod todo;
}

mod services {
    pub mod auth;
    pub mod todos;
}

mod handlers {
    pub mod auth;
    pub mod todos;
}

mod middleware_layer {
    pub mod auth;
}

mod validation {
    pub mod auth;
}

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    tracing::info!("✅ Configuration loaded successfully");

    let state = AppState::new(&config)?;
    tracing::info!("✅ AppState initialized");

    let cors = CorsLayer::new()
        .allow_origin([
            "http://localhost:3000".parse().unwrap(),
            "http://127.0.0.1:3000".parse().unwrap(),
        ])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .max_age(Duration::from_secs(86400));

    let auth_routes = Router::new()
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/refresh", post(handlers::auth::refresh))
        .route("/api/auth/logout", post(handlers::auth::logout))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/api/auth/me", get(handlers::auth::me))
        .route("/api/auth/logout-all", post(handlers::auth::logout_all))
        .route(
            "/api/todos",
            get(handlers::todos::list_todos).post(handlers::todos::create_todo),
        )
        .route(
            "/api/todos/{todo_id}",
            get(handlers::todos::get_todo)
                .put(handlers::todos::update_todo)
                .delete(handlers::todos::delete_todo),
        )
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::auth::require_auth,
        ))
        .with_state(state.clone());

    let app = Router::new()
        .merge(auth_routes)
        .merge(protected_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default())
                .on_request(DefaultOnRequest::default().level(Level::DEBUG))
                .on_response(DefaultOnResponse::default().level(Level::DEBUG))
                .on_failure(DefaultOnFailure::default().level(Level::ERROR)),
        )
        .layer(cors);

    // Dead session rows accumulate; expiry is enforced at read time, so
    // this only reclaims space.
    let cleanup_state = state.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            match repositories::session::purge_expired(&cleanup_state.db).await {
                Ok(purged) => {
                    tracing::info!("🧹 Purged {} dead session rows", purged);
                }
                Err(e) => {
                    tracing::error!("❌ Session purge failed: {}", e);
                }
            }
        }
    });

    let addr = SocketAddr::from(([127, 0, 0, 1], 8000));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

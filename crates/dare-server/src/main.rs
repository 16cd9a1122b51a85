//! Multi-room Axum dare server.
//!
//! # Routes
//!
//! | Method | Path                | Description                              |
//! |--------|---------------------|------------------------------------------|
//! | `GET`  | `/`                 | Serve static web frontend                |
//! | `GET`  | `/ws`               | WebSocket upgrade for game connections   |
//! | `GET`  | `/api/rooms`        | List active room codes (JSON)            |
//! | `GET`  | `/api/rooms/{code}` | Snapshot of one room (JSON)              |
//!
//! Set `STATIC_DIR` to point at the web build output (default: `./dist`) and
//! `PORT` to change the listening port (default: `8080`).

mod registry;
mod ws_handler;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use dare_core::protocol::RoomSnapshot;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tracing_subscriber::EnvFilter;

use registry::RoomManager;

/// Shared application state available to all handlers.
#[derive(Clone)]
struct AppState {
    room_manager: Arc<RoomManager>,
}

/// Start-up configuration read from the environment.
struct Config {
    port: u16,
    static_dir: String,
}

impl Config {
    fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);
        let static_dir = std::env::var("STATIC_DIR").unwrap_or_else(|_| "./dist".to_string());
        Self { port, static_dir }
    }
}

#[tokio::main]
async fn main() {
    // Initialise tracing (respects RUST_LOG env var).
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    let state = AppState {
        room_manager: Arc::new(RoomManager::new()),
    };

    // Serve the SPA: try static files first, fall back to index.html for
    // client-side routing.
    let serve_spa = ServeDir::new(&config.static_dir)
        .not_found_service(ServeFile::new(format!("{}/index.html", config.static_dir)));

    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/api/rooms", get(rooms_handler))
        .route("/api/rooms/{code}", get(room_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
        .fallback_service(serve_spa);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Dare server listening on {addr}");
    tracing::info!("Serving static files from {}", config.static_dir);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {addr}: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }
}

/// `GET /ws`: upgrade to WebSocket and hand off to [`ws_handler::handle_socket`].
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| ws_handler::handle_socket(socket, state.room_manager))
}

/// `GET /api/rooms`: return a JSON array of active room codes.
async fn rooms_handler(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.room_manager.list_rooms().await)
}

/// `GET /api/rooms/{code}`: return the room snapshot, or 404.
async fn room_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<RoomSnapshot>, StatusCode> {
    let entry = state
        .room_manager
        .get_room(&code)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(entry.room.snapshot().await))
}

//! Main entry point for the tutorial server.
//!
//! Loads and validates the tutorial configuration, then launches the HTTP
//! server with the tutorial WebSocket endpoint.

use actix_web::{web, App, HttpServer};
use log::{error, info};

use click_tutorial::config::server::{BIND_HOST, BIND_PORT};
use click_tutorial::config::tutorial::TutorialConfig;
use click_tutorial::server;

/// Environment variable naming an optional JSON configuration file.
const CONFIG_ENV: &str = "TUTORIAL_CONFIG";

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize logger from environment variable (RUST_LOG).
    env_logger::init();

    let config = match std::env::var(CONFIG_ENV) {
        Ok(path) => TutorialConfig::from_file(&path).map_err(|e| {
            error!("[Main] Cannot load {}: {}", path, e);
            std::io::Error::other(e)
        })?,
        Err(_) => TutorialConfig::default(),
    };
    // A tutorial that cannot be built would fail on every connection.
    if let Err(e) = config.validate() {
        error!("[Main] Invalid tutorial configuration: {}", e);
        return Err(std::io::Error::other(e));
    }

    // Shared application state for HTTP/WebSocket handlers.
    let state = web::Data::new(server::state::AppState::new(config));

    info!("[Main] Listening on {}:{}", BIND_HOST, BIND_PORT);
    HttpServer::new(move || {
        App::new()
            .wrap(
                actix_web::middleware::DefaultHeaders::new()
                    .add(("Access-Control-Allow-Origin", "*"))
                    .add(("Access-Control-Allow-Headers", "*"))
            )
            .app_data(state.clone())
            .configure(server::router::config)
    })
    .bind((BIND_HOST, BIND_PORT))?
    .run()
    .await
}

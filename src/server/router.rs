//! HTTP and WebSocket routing configuration.
//!
//! A single endpoint: each connection gets its own tutorial actor.

use actix_web::web;
use crate::server::session::ws_tutorial;

/// Configure the application's HTTP/WebSocket routes.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/ws/tutorial")
            .to(ws_tutorial)
    );
}

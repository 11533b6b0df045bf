// src/server/mod.rs

//! Server layer root module.
//!
//! Runs one tutorial per WebSocket connection:
//! - Application state shared by the handlers
//! - HTTP/WebSocket routing
//! - The per-connection session actor and its outbox
//! - Anti-spam and error message helpers

pub mod anti_spam;
pub mod messages;
pub mod outbox;
pub mod router;
pub mod session;
pub mod state;
pub mod ws_error;

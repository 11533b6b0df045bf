// src/server/state.rs

//! Application state for the WebSocket host.
//!
//! Holds the tutorial configuration every new session is built from.

use crate::config::tutorial::TutorialConfig;

/// Shared application state, injected into HTTP/WebSocket handlers.
pub struct AppState {
    /// Configuration validated at startup.
    pub config: TutorialConfig,
}

impl AppState {
    pub fn new(config: TutorialConfig) -> Self {
        AppState { config }
    }
}

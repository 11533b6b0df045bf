/// WebSocket host configuration constants.
///
/// This module defines where the server listens and how often each session
/// drives its tutorial clock.
pub const BIND_HOST: &str = "127.0.0.1";

/// Port the HTTP/WebSocket server binds to.
pub const BIND_PORT: u16 = 8080;

/// Interval (ms) at which a session calls `Tutorial::tick`.
pub const TICK_INTERVAL_MS: u64 = 20;

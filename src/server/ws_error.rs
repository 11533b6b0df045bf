/// Centralized helpers for WebSocket error responses.
///
/// Every error sent to a client carries a code, a readable message and an
/// optional context string.
use serde_json::json;

/// Formats a WebSocket error message as a JSON string.
///
/// # Arguments
/// - `code`: Unique error code (e.g. "INVALID_MESSAGE").
/// - `message`: Human-readable error message (in English).
/// - `context`: Optional context (e.g. the session id).
pub fn ws_error_message(code: &str, message: &str, context: Option<&str>) -> String {
    json!({
        "action": "Error",
        "data": {
            "code": code,
            "message": message,
            "context": context.unwrap_or(""),
        }
    })
    .to_string()
}

/// Returns the message sent right before a banned session is closed.
pub fn ws_banned_message(context: Option<&str>) -> String {
    ws_error_message(
        "BANNED",
        "You have been banned for spamming. Please try again later.",
        context,
    )
}

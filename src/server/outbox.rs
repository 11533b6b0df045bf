//! Renderer and shell for a remote client.
//!
//! Nothing is drawn server side. Everything the engine asks for is queued as
//! [`ServerWsMessage`]s, in order, until the session actor flushes them.

use crate::server::messages::{ServerWsMessage, TokenView};
use crate::tutorial::grid::{Token, TokenRegistry};
use crate::tutorial::host::{Renderer, Shell};
use crate::tutorial::types::Backdrop;

#[derive(Debug, Default)]
pub struct Outbox {
    pending: Vec<ServerWsMessage>,
    quit_requested: bool,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take everything queued since the last call.
    pub fn drain(&mut self) -> Vec<ServerWsMessage> {
        std::mem::take(&mut self.pending)
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }
}

impl Renderer for Outbox {
    fn draw_token(&mut self, token: &Token) {
        let view = TokenView::from(token);
        // Consecutive updates are batched; a later update of the same dot wins.
        if let Some(ServerWsMessage::Tokens { tokens }) = self.pending.last_mut() {
            match tokens.iter_mut().find(|t| t.index == view.index) {
                Some(existing) => *existing = view,
                None => tokens.push(view),
            }
            return;
        }
        self.pending.push(ServerWsMessage::Tokens { tokens: vec![view] });
    }

    fn redraw_all(&mut self, tokens: &TokenRegistry, backdrop: Backdrop) {
        self.pending.push(ServerWsMessage::Scene {
            backdrop,
            tokens: tokens.iter().map(TokenView::from).collect(),
        });
    }
}

impl Shell for Outbox {
    fn set_status_text(&mut self, text: &str) {
        self.pending.push(ServerWsMessage::status(text));
    }

    fn quit(&mut self) {
        self.quit_requested = true;
        self.pending.push(ServerWsMessage::Quit);
    }
}

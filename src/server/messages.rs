use serde::{Serialize, Deserialize};
use uuid::Uuid;

use crate::tutorial::grid::Token;
use crate::tutorial::palette::Rgb;
use crate::tutorial::types::{Backdrop, TokenKind};

// Message client -> serveur
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "action", content = "data")]
pub enum ClientWsMessage {
    PointerDown { x: i32, y: i32 },
    PointerUp { x: i32, y: i32 },
    /// The client's own tilt, in sample units.
    Motion { x: i32, y: i32, z: i32 },
    Quit,
    Ping,
}

/// What a client needs to draw one dot.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct TokenView {
    pub index: usize,
    pub x: i32,
    pub y: i32,
    pub kind: TokenKind,
    pub color: Rgb,
    pub label: Option<String>,
    pub layer: i32,
}

impl From<&Token> for TokenView {
    fn from(token: &Token) -> Self {
        Self {
            index: token.index,
            x: token.position.x,
            y: token.position.y,
            kind: token.kind,
            color: token.color,
            label: token.label.clone(),
            layer: token.layer,
        }
    }
}

// Message serveur -> client
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "action", content = "data")]
pub enum ServerWsMessage {
    Welcome {
        session_id: Uuid,
        width: i32,
        height: i32,
        dot_size: i32,
    },
    /// Full redraw, backdrop included.
    Scene {
        backdrop: Backdrop,
        tokens: Vec<TokenView>,
    },
    /// Only the dots that changed.
    Tokens {
        tokens: Vec<TokenView>,
    },
    Status {
        text: String,
    },
    Quit,
}

impl ServerWsMessage {
    pub fn status(text: &str) -> Self {
        Self::Status { text: text.to_string() }
    }
}

//! Collaborator interfaces.
//!
//! The engine never draws and never owns a window. It tells a [`Renderer`]
//! which tokens changed and asks it what lies under the pointer, and it sends
//! guidance text to a [`Shell`].

use crate::tutorial::grid::{Token, TokenRegistry};
use crate::tutorial::types::{Backdrop, Point};

pub trait Renderer {
    /// A single token changed (position, color, label or layer).
    fn draw_token(&mut self, token: &Token);

    /// Index of the token under `point`. Defaults to the topmost visible dot.
    fn hit_test(&self, tokens: &TokenRegistry, point: Point) -> Option<usize> {
        tokens.topmost_visible_at(point)
    }

    /// Everything changed, including the backdrop.
    fn redraw_all(&mut self, tokens: &TokenRegistry, backdrop: Backdrop);
}

pub trait Shell {
    fn set_status_text(&mut self, text: &str);
    fn quit(&mut self);
}

/// Everything a tutorial talks to.
pub trait Host: Renderer + Shell {}

impl<T: Renderer + Shell> Host for T {}

/// Renderer with no output, hit-testing straight from token geometry.
#[derive(Debug, Default, Clone, Copy)]
pub struct GeometricRenderer;

impl Renderer for GeometricRenderer {
    fn draw_token(&mut self, _token: &Token) {}

    fn redraw_all(&mut self, _tokens: &TokenRegistry, _backdrop: Backdrop) {}
}

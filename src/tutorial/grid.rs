//! Token registry.
//!
//! Owns the fixed 9x5 grid of dots and every per-dot mutable attribute. The
//! registry records which tokens changed so the engine only redraws those.

use std::collections::BTreeSet;

use rand::Rng;
use rand::seq::IteratorRandom;
use serde::Serialize;

use crate::config::tutorial::{
    BACKDROP_LAYER, BASE_DOT_SIZE, DOT_LAYER, GRID_COLUMNS, GRID_ROWS, TOOLBAR_HEIGHT,
};
use crate::tutorial::error::TutorialError;
use crate::tutorial::host::Renderer;
use crate::tutorial::palette::{Palette, Rgb};
use crate::tutorial::types::{GridPosition, Point, TokenKind};

/// Screen layout of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Geometry {
    pub width: i32,
    pub height: i32,
    pub columns: usize,
    pub rows: usize,
    pub dot_size: i32,
    pub space: i32,
}

impl Geometry {
    /// Scale the grid to a screen. The toolbar strip is taken off the height.
    pub fn from_screen(
        screen_width: i32,
        screen_height: i32,
        columns: usize,
        rows: usize,
    ) -> Result<Self, TutorialError> {
        let height = screen_height - TOOLBAR_HEIGHT;
        let invalid = |reason| TutorialError::InvalidGeometry {
            width: screen_width,
            height: screen_height,
            reason,
        };
        if columns == 0 || rows == 0 {
            return Err(invalid("empty grid"));
        }
        if screen_width <= 0 || height <= 0 {
            return Err(invalid("no drawable area"));
        }

        let scale = screen_width as f64 / (10.0 * BASE_DOT_SIZE * 1.2);
        let dot_size = (BASE_DOT_SIZE * scale) as i32;
        if dot_size <= 0 {
            return Err(invalid("dots scale to zero pixels"));
        }
        let geometry = Self {
            width: screen_width,
            height,
            columns,
            rows,
            dot_size,
            space: dot_size / 5,
        };
        if geometry.x_offset() < 0 || geometry.pitch() * (rows as i32 - 1) + dot_size > height {
            return Err(invalid("grid larger than the screen"));
        }
        Ok(geometry)
    }

    /// Distance between two neighbouring dots.
    pub fn pitch(&self) -> i32 {
        self.dot_size + self.space
    }

    pub fn x_offset(&self) -> i32 {
        let cols = self.columns as i32;
        (self.width - cols * self.dot_size - (cols - 1) * self.space) / 2
    }

    pub fn len(&self) -> usize {
        self.columns * self.rows
    }

    pub fn grid_position(&self, index: usize) -> GridPosition {
        GridPosition {
            col: index % self.columns,
            row: index / self.columns,
        }
    }

    pub fn index_of(&self, pos: GridPosition) -> usize {
        pos.col + pos.row * self.columns
    }

    /// Resting position of the token at `index`.
    pub fn home(&self, index: usize) -> Point {
        let pos = self.grid_position(index);
        Point::new(
            self.x_offset() + pos.col as i32 * self.pitch(),
            pos.row as i32 * self.pitch(),
        )
    }
}

impl Default for Geometry {
    fn default() -> Self {
        // 1200x900 always fits.
        Self {
            width: 1200,
            height: 900 - TOOLBAR_HEIGHT,
            columns: GRID_COLUMNS,
            rows: GRID_ROWS,
            dot_size: 100,
            space: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Token {
    pub index: usize,
    pub grid: GridPosition,
    pub position: Point,
    pub kind: TokenKind,
    pub color: Rgb,
    pub label: Option<String>,
    pub layer: i32,
}

impl Token {
    pub fn center(&self, dot_size: i32) -> Point {
        self.position.offset(dot_size / 2, dot_size / 2)
    }

    pub fn contains(&self, point: Point, dot_size: i32) -> bool {
        point.x >= self.position.x
            && point.x < self.position.x + dot_size
            && point.y >= self.position.y
            && point.y < self.position.y + dot_size
    }

    pub fn is_visible(&self) -> bool {
        self.layer >= BACKDROP_LAYER
    }
}

pub struct TokenRegistry {
    tokens: Vec<Token>,
    geometry: Geometry,
    palette: Palette,
    dirty: BTreeSet<usize>,
}

impl TokenRegistry {
    /// Lay out one plain token per grid cell.
    pub fn create_grid(geometry: Geometry, palette: Palette) -> Self {
        let white = palette.base(TokenKind::Plain);
        let tokens = (0..geometry.len())
            .map(|index| Token {
                index,
                grid: geometry.grid_position(index),
                position: geometry.home(index),
                kind: TokenKind::Plain,
                color: white,
                label: None,
                layer: DOT_LAYER,
            })
            .collect();
        Self {
            tokens,
            dirty: (0..geometry.len()).collect(),
            geometry,
            palette,
        }
    }

    /// Put every token back home as a plain visible dot.
    pub fn reset(&mut self) {
        let white = self.palette.base(TokenKind::Plain);
        for token in self.tokens.iter_mut() {
            token.position = self.geometry.home(token.index);
            token.kind = TokenKind::Plain;
            token.color = white;
            token.label = None;
            token.layer = DOT_LAYER;
        }
        self.dirty.extend(0..self.tokens.len());
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn get(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    pub fn kind(&self, index: usize) -> TokenKind {
        self.tokens.get(index).map_or(TokenKind::Plain, |t| t.kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter()
    }

    /// Tokens currently holding a teaching role, in index order.
    pub fn active(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter().filter(|t| t.kind.is_active())
    }

    pub fn active_indexes(&self) -> Vec<usize> {
        self.active().map(|t| t.index).collect()
    }

    /// The only way to change a token's kind. Also restores its base color.
    pub fn set_kind(&mut self, index: usize, kind: TokenKind) {
        let color = self.palette.base(kind);
        if let Some(token) = self.tokens.get_mut(index) {
            token.kind = kind;
            token.color = color;
            self.dirty.insert(index);
        }
    }

    /// Recolor a token for fade `step` without touching its kind.
    pub fn fade(&mut self, index: usize, step: u8) {
        if let Some(token) = self.tokens.get_mut(index) {
            token.color = self.palette.faded(token.kind, step);
            self.dirty.insert(index);
        }
    }

    pub fn set_label(&mut self, index: usize, label: Option<&str>) {
        if let Some(token) = self.tokens.get_mut(index) {
            token.label = label.map(str::to_string);
            self.dirty.insert(index);
        }
    }

    pub fn set_layer(&mut self, index: usize, layer: i32) {
        if let Some(token) = self.tokens.get_mut(index) {
            token.layer = layer;
            self.dirty.insert(index);
        }
    }

    pub fn position(&self, index: usize) -> Option<Point> {
        self.tokens.get(index).map(|t| t.position)
    }

    pub fn move_to(&mut self, index: usize, position: Point) {
        if let Some(token) = self.tokens.get_mut(index) {
            token.position = position;
            self.dirty.insert(index);
        }
    }

    pub fn move_by(&mut self, index: usize, dx: i32, dy: i32) {
        if let Some(token) = self.tokens.get_mut(index) {
            token.position = token.position.offset(dx, dy);
            self.dirty.insert(index);
        }
    }

    /// Exchange the positions of two tokens; kinds and indexes stay put.
    pub fn swap_positions(&mut self, i: usize, j: usize) {
        if i == j || i >= self.tokens.len() || j >= self.tokens.len() {
            return;
        }
        let first = self.tokens[i].position;
        self.tokens[i].position = self.tokens[j].position;
        self.tokens[j].position = first;
        self.dirty.insert(i);
        self.dirty.insert(j);
    }

    /// Pick a random token index not in `exclude`.
    /// Returns `None` only when every index is excluded.
    pub fn pick_unused_index<R: Rng + ?Sized>(
        &self,
        exclude: &[usize],
        rng: &mut R,
    ) -> Option<usize> {
        (0..self.tokens.len())
            .filter(|i| !exclude.contains(i))
            .choose(rng)
    }

    /// Topmost visible token under `point`.
    pub fn topmost_visible_at(&self, point: Point) -> Option<usize> {
        let dot_size = self.geometry.dot_size;
        self.tokens
            .iter()
            .filter(|t| t.is_visible() && t.contains(point, dot_size))
            .max_by_key(|t| (t.layer, t.index))
            .map(|t| t.index)
    }

    /// Resolve the token under `point` through the renderer's hit test.
    pub fn find_at<R: Renderer + ?Sized>(&self, renderer: &R, point: Point) -> Option<&Token> {
        renderer.hit_test(self, point).and_then(|i| self.tokens.get(i))
    }

    /// Indexes changed since the last call.
    pub fn take_dirty(&mut self) -> Vec<usize> {
        std::mem::take(&mut self.dirty).into_iter().collect()
    }
}

/// Tutorial configuration constants.
///
/// This module defines the grid dimensions, screen geometry defaults, the color
/// palette and every delay used by the stage machine and the motion simulator.
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::tutorial::error::TutorialError;
use crate::tutorial::grid::Geometry;
use crate::tutorial::palette::Palette;

/// Number of columns in the dot grid.
pub const GRID_COLUMNS: usize = 9;

/// Number of rows in the dot grid.
pub const GRID_ROWS: usize = 5;

/// Nominal dot size before scaling to the screen width.
pub const BASE_DOT_SIZE: f64 = 40.0;

/// Height reserved for the host toolbar (1.5 grid cells of 75 px).
pub const TOOLBAR_HEIGHT: i32 = 112;

/// Default screen size used by the WebSocket host.
pub const SCREEN_WIDTH: i32 = 1200;
pub const SCREEN_HEIGHT: i32 = 900;

/// Layer of the active backdrop. Tokens below it are hidden.
pub const BACKDROP_LAYER: i32 = 100;

/// Layer of a token sitting on the backdrop.
pub const DOT_LAYER: i32 = 100;

/// Layer of active tokens once shaking starts.
pub const RAISED_LAYER: i32 = 200;

/// Layer of tokens pushed behind the backdrop.
pub const HIDDEN_LAYER: i32 = 0;

/// Delay (ms) between two motion samples.
pub const MOTION_SAMPLE_INTERVAL_MS: u64 = 100;

/// How long (ms) a press must be held to count as a rub.
pub const RUB_HOLD_MS: u64 = 1000;

/// Delay (ms) before an automatic stage change after a tap sequence.
pub const AUTO_ADVANCE_MS: u64 = 500;

/// Delay (ms) between a motion phase settling and the next stage.
pub const MOTION_ADVANCE_MS: u64 = 1000;

/// Length (ms) of the shake phases and the convergence fallback of tilt/align.
pub const SHAKE_PHASE_MS: u64 = 5000;

/// Length (ms) of the final shake and of each fade step.
pub const FADE_PHASE_MS: u64 = 2000;

/// Number of taps required by each tap-counting stage.
pub const TAP_REPEATS: u32 = 5;

/// Accelerometer position file exposed by the lis3lv02d driver.
pub const ACCELEROMETER_DEVICE: &str = "/sys/devices/platform/lis3lv02d/position";

/// Divisor turning raw accelerometer readings into sample units.
pub const ACCELEROMETER_SCALE: f64 = 18.0;

/// Bound of a synthetic sample on each axis.
pub const SYNTHETIC_SAMPLE_RANGE: i32 = 20;

/// Bound of a client-reported sample on each axis.
pub const CLIENT_SAMPLE_LIMIT: i32 = 40;

/// Jiggle applied to device samples and to synthetic ones.
pub const DEVICE_JIGGLE: i32 = 3;
pub const SYNTHETIC_JIGGLE: i32 = 5;

/// Largest per-axis step (px) a token takes toward its dock or an edge.
pub const MAX_STEP: i32 = 10;

/// A token closer than this (px, on both axes) to its dock is docked.
pub const DOCK_TOLERANCE: i32 = 11;

/// Distance (px) from the target edge under which a tilt phase is complete.
pub const EDGE_MARGIN: i32 = 100;

/// Default palette. Slots 0-1 are profile accents, 2 white, 3 black, then
/// four shades each of red, yellow and blue.
pub const DEFAULT_PALETTE: [&str; 16] = [
    "#A0FFA0", "#FF8080", "#FFFFFF", "#000000",
    "#FF0000", "#FF8080", "#FFA0A0", "#FFC0C0",
    "#FFFF00", "#FFFF80", "#FFFFA0", "#FFFFE0",
    "#0000FF", "#8080FF", "#80A0FF", "#C0C0FF",
];

/// Runtime configuration of a tutorial instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TutorialConfig {
    pub screen_width: i32,
    pub screen_height: i32,
    pub palette: Vec<String>,
    /// Fixed seed for reproducible sessions; a fresh one is drawn when absent.
    pub seed: Option<u64>,
    pub accelerometer_path: String,
}

impl Default for TutorialConfig {
    fn default() -> Self {
        Self {
            screen_width: SCREEN_WIDTH,
            screen_height: SCREEN_HEIGHT,
            palette: DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect(),
            seed: None,
            accelerometer_path: ACCELEROMETER_DEVICE.to_string(),
        }
    }
}

impl TutorialConfig {
    /// Load a JSON configuration file. Missing fields keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TutorialError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Check that a tutorial can be built from this configuration.
    pub fn validate(&self) -> Result<(), TutorialError> {
        Geometry::from_screen(self.screen_width, self.screen_height, GRID_COLUMNS, GRID_ROWS)?;
        Palette::parse(&self.palette)?;
        Ok(())
    }
}

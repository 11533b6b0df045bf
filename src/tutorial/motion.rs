//! Motion simulator.
//!
//! Turns tilt samples into token movement for the active motion mode. Random
//! modes only jostle tokens and never finish on their own; their phases are
//! time-boxed by the stage machine. Align and tilt modes converge and report
//! [`MotionReport::Settled`] once every active token reached its goal.
//!
//! Each token is moved from its own position and the current sample only, so
//! the order tokens are visited in never changes where they end up.

use std::cell::Cell;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use log::{debug, warn};
use rand::Rng;

use crate::config::tutorial::{
    ACCELEROMETER_SCALE, CLIENT_SAMPLE_LIMIT, DEVICE_JIGGLE, DOCK_TOLERANCE, EDGE_MARGIN,
    MAX_STEP, SYNTHETIC_JIGGLE, SYNTHETIC_SAMPLE_RANGE,
};
use crate::tutorial::error::TutorialError;
use crate::tutorial::grid::{Geometry, TokenRegistry};
use crate::tutorial::types::{MotionMode, Point, Sample};

/// Anything that can report the device tilt.
pub trait MotionSource {
    /// Current tilt, or `None` when no device is available.
    fn read(&mut self) -> Option<Sample>;
}

/// Accelerometer exposed as a sysfs position file, e.g. `(x,y,z)`.
pub struct Accelerometer {
    path: PathBuf,
    present: Option<bool>,
}

impl Accelerometer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            present: None,
        }
    }

    /// Parse a raw `(x,y,z)` reading into sample units.
    pub fn parse(raw: &str) -> Result<Sample, TutorialError> {
        let malformed = || TutorialError::MalformedSample(raw.to_string());
        let inner = raw
            .trim()
            .strip_prefix('(')
            .and_then(|s| s.strip_suffix(')'))
            .ok_or_else(malformed)?;
        let mut axes = inner.split(',').map(|v| {
            v.trim()
                .parse::<f64>()
                .map(|v| (v / ACCELEROMETER_SCALE) as i32)
                .map_err(|_| malformed())
        });
        let (Some(x), Some(y), Some(z), None) = (axes.next(), axes.next(), axes.next(), axes.next())
        else {
            return Err(malformed());
        };
        Ok(Sample { x: x?, y: y?, z: z? })
    }

    fn read_sample(&self) -> Result<Sample, TutorialError> {
        let raw = fs::read_to_string(&self.path)?;
        Self::parse(&raw)
    }
}

impl MotionSource for Accelerometer {
    fn read(&mut self) -> Option<Sample> {
        // The device is probed once; a missing file means synthetic motion for good.
        if self.present.is_none() {
            let present = self.path.exists();
            if !present {
                debug!(
                    "[Motion] No accelerometer at {}, using synthetic samples",
                    self.path.display()
                );
            }
            self.present = Some(present);
        }
        if self.present != Some(true) {
            return None;
        }
        match self.read_sample() {
            Ok(sample) => Some(sample),
            Err(e) => {
                warn!("[Motion] Accelerometer read failed, falling back: {}", e);
                None
            }
        }
    }
}

/// A host without any tilt sensor.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMotionDevice;

impl MotionSource for NoMotionDevice {
    fn read(&mut self) -> Option<Sample> {
        None
    }
}

/// Tilt reported by a remote client, written by the session and read by the
/// engine on the same thread.
#[derive(Debug, Clone, Default)]
pub struct MotionFeed {
    latest: Rc<Cell<Option<Sample>>>,
}

impl MotionFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the pending sample. Each axis is clamped to `CLIENT_SAMPLE_LIMIT`.
    pub fn push(&self, sample: Sample) {
        let clamp = |v: i32| v.clamp(-CLIENT_SAMPLE_LIMIT, CLIENT_SAMPLE_LIMIT);
        self.latest.set(Some(Sample {
            x: clamp(sample.x),
            y: clamp(sample.y),
            z: clamp(sample.z),
        }));
    }
}

/// Uses the client's latest sample once, otherwise asks `fallback`.
pub struct RemoteMotion {
    feed: MotionFeed,
    fallback: Box<dyn MotionSource>,
}

impl RemoteMotion {
    pub fn new(feed: MotionFeed, fallback: Box<dyn MotionSource>) -> Self {
        Self { feed, fallback }
    }
}

impl MotionSource for RemoteMotion {
    fn read(&mut self) -> Option<Sample> {
        self.feed.latest.take().or_else(|| self.fallback.read())
    }
}

/// A sample together with where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reading {
    pub sample: Sample,
    pub from_device: bool,
}

impl Reading {
    /// Synthetic samples are noisier, so they get a bigger jiggle.
    pub fn jiggle(&self) -> i32 {
        if self.from_device { DEVICE_JIGGLE } else { SYNTHETIC_JIGGLE }
    }
}

/// Read the device, or draw a uniform sample when it has nothing to say.
pub fn read_or_synthesize<R: Rng + ?Sized>(
    source: &mut dyn MotionSource,
    rng: &mut R,
) -> Reading {
    match source.read() {
        Some(sample) => Reading { sample, from_device: true },
        None => {
            let range = -SYNTHETIC_SAMPLE_RANGE..=SYNTHETIC_SAMPLE_RANGE;
            Reading {
                sample: Sample {
                    x: rng.random_range(range.clone()),
                    y: rng.random_range(range.clone()),
                    z: rng.random_range(range),
                },
                from_device: false,
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionReport {
    Moving,
    Settled,
}

/// Apply one sample under `mode`.
pub fn step<R: Rng + ?Sized>(
    mode: MotionMode,
    reading: Reading,
    tokens: &mut TokenRegistry,
    rng: &mut R,
) -> MotionReport {
    let settled = match mode {
        MotionMode::None => false,
        MotionMode::Random => {
            jostle(tokens, reading, reading.jiggle(), rng);
            false
        }
        MotionMode::RandomStrong => {
            jostle(tokens, reading, reading.jiggle() * 2, rng);
            false
        }
        MotionMode::Align => dock_all(tokens, reading.jiggle(), rng),
        MotionMode::TiltLeft => tilt_left(tokens, reading, rng),
        MotionMode::TiltRight => tilt_right(tokens, reading, rng),
    };
    if settled { MotionReport::Settled } else { MotionReport::Moving }
}

fn jitter<R: Rng + ?Sized>(rng: &mut R, amount: i32) -> i32 {
    rng.random_range(-amount..=amount)
}

/// Shake every active token around the sample direction.
pub fn jostle<R: Rng + ?Sized>(
    tokens: &mut TokenRegistry,
    reading: Reading,
    jiggle: i32,
    rng: &mut R,
) {
    for index in tokens.active_indexes() {
        let dx = reading.sample.x + jitter(rng, jiggle);
        let mut dz = reading.sample.z + jitter(rng, jiggle);
        // z drifts upward on a real device; flip it half the time.
        if rng.random_bool(0.5) {
            dz = -dz;
        }
        tokens.move_by(index, dx, dz);
    }
}

/// Where the `ordinal`-th token of `role` docks during the align phase.
pub fn dock_position(geometry: &Geometry, role: i32, ordinal: i32) -> Point {
    Point::new(geometry.pitch() * (ordinal + role), geometry.pitch() * role)
}

/// Dock targets of all active tokens, in index order.
pub fn docks(tokens: &TokenRegistry) -> Vec<(usize, Point)> {
    let geometry = *tokens.geometry();
    let mut ordinals = [0i32; 4];
    tokens
        .active()
        .filter_map(|token| {
            let role = token.kind.role()?;
            let ordinal = &mut ordinals[role as usize];
            let dock = dock_position(&geometry, role, *ordinal);
            *ordinal += 1;
            Some((token.index, dock))
        })
        .collect()
}

/// Pull every active token toward its dock. Returns true when all of them
/// were already within tolerance.
pub fn dock_all<R: Rng + ?Sized>(tokens: &mut TokenRegistry, jiggle: i32, rng: &mut R) -> bool {
    let mut docked = true;
    for (index, dock) in docks(tokens) {
        let Some(pos) = tokens.position(index) else { continue };
        let dx = dock.x - pos.x;
        let dy = dock.y - pos.y;
        if dx.abs() < DOCK_TOLERANCE && dy.abs() < DOCK_TOLERANCE {
            tokens.move_to(index, dock);
        } else {
            docked = false;
            tokens.move_by(
                index,
                dx.clamp(-MAX_STEP, MAX_STEP) + jitter(rng, jiggle),
                dy.clamp(-MAX_STEP, MAX_STEP) + jitter(rng, jiggle),
            );
        }
    }
    docked
}

/// Vertical step: bring escaped tokens back on screen, otherwise follow z.
fn vertical_step<R: Rng + ?Sized>(y: i32, height: i32, z: i32, rng: &mut R) -> i32 {
    if y > height {
        rng.random_range(-20..=0)
    } else if y < 0 {
        rng.random_range(0..=20)
    } else {
        z
    }
}

/// Slide tokens toward the left edge while the device tilts left.
/// Settled once no active token is more than `EDGE_MARGIN` from the edge.
pub fn tilt_left<R: Rng + ?Sized>(
    tokens: &mut TokenRegistry,
    reading: Reading,
    rng: &mut R,
) -> bool {
    let height = tokens.geometry().height;
    let mut settled = true;
    for index in tokens.active_indexes() {
        let Some(pos) = tokens.position(index) else { continue };
        let dz = vertical_step(pos.y, height, reading.sample.z, rng);
        if pos.x < 0 {
            tokens.move_by(index, rng.random_range(0..=MAX_STEP), dz);
        } else if reading.sample.x < 0 {
            let dx = reading.sample.x + rng.random_range(-MAX_STEP..=0);
            if pos.x + dx > 0 {
                tokens.move_by(index, dx, dz);
            }
        }
        if tokens.position(index).is_some_and(|p| p.x > EDGE_MARGIN) {
            settled = false;
        }
    }
    settled
}

/// Mirror of [`tilt_left`] for the right edge.
pub fn tilt_right<R: Rng + ?Sized>(
    tokens: &mut TokenRegistry,
    reading: Reading,
    rng: &mut R,
) -> bool {
    let geometry = *tokens.geometry();
    let edge = geometry.width - geometry.dot_size;
    let mut settled = true;
    for index in tokens.active_indexes() {
        let Some(pos) = tokens.position(index) else { continue };
        let dz = vertical_step(pos.y, geometry.height, reading.sample.z, rng);
        if pos.x > edge {
            tokens.move_by(index, rng.random_range(-MAX_STEP..=0), dz);
        } else if reading.sample.x > 0 {
            let dx = reading.sample.x + rng.random_range(0..=MAX_STEP);
            if pos.x + dx < edge {
                tokens.move_by(index, dx, dz);
            }
        }
        if tokens.position(index).is_some_and(|p| p.x < edge - EDGE_MARGIN) {
            settled = false;
        }
    }
    settled
}

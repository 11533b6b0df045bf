use std::collections::BTreeSet;

use serde::Serialize;

use crate::tutorial::stages::Stage;
use crate::tutorial::types::{Backdrop, MotionMode};

/// Everything the stage machine remembers between two events.
#[derive(Debug, Clone, Serialize)]
pub struct TutorialState {
    /// Stage whose handler receives the next event.
    pub stage: Stage,
    /// Tokens given a role, in the order they got it.
    pub targets: Vec<usize>,
    pub tapped: BTreeSet<usize>,
    pub repeat_count: u32,
    pub motion_mode: MotionMode,
    /// A press is being held on a target during a rub stage.
    pub awaiting_release: bool,
    pub pressed_target: Option<usize>,
    pub last_released: Option<usize>,
    /// Presses start a rub gesture instead of a tap.
    pub rubbing: bool,
    /// Blocks auto-advance (motion phases) and releases (rub gestures).
    pub pausing: bool,
    /// Bumped by every new pause; stale `ClearPause` timers are ignored.
    pub pause_generation: u64,
    /// A motion phase already scheduled its advance.
    pub advance_pending: bool,
    /// A `MotionSample` timer is in flight.
    pub sampling: bool,
    pub backdrop: Backdrop,
}

impl TutorialState {
    pub fn new() -> Self {
        Self {
            stage: Stage::FindFirstYellow,
            targets: Vec::new(),
            tapped: BTreeSet::new(),
            repeat_count: 0,
            motion_mode: MotionMode::None,
            awaiting_release: false,
            pressed_target: None,
            last_released: None,
            rubbing: false,
            pausing: false,
            pause_generation: 0,
            advance_pending: false,
            sampling: false,
            backdrop: Backdrop::Light,
        }
    }

    /// Start a new round. Timer bookkeeping survives so that timers still in
    /// flight from the previous round are recognised as stale.
    pub fn restart(&mut self) {
        let pause_generation = self.pause_generation + 1;
        let sampling = self.sampling;
        *self = Self {
            pause_generation,
            sampling,
            ..Self::new()
        };
    }

    /// Begin a new pause and return its generation.
    pub fn begin_pause(&mut self) -> u64 {
        self.pausing = true;
        self.pause_generation += 1;
        self.pause_generation
    }

    /// Drop a pending rub gesture and invalidate its timer.
    pub fn cancel_gesture(&mut self) {
        self.pausing = false;
        self.pause_generation += 1;
        self.pressed_target = None;
        self.awaiting_release = false;
    }

    pub fn is_target(&self, index: usize) -> bool {
        self.targets.contains(&index)
    }
}

impl Default for TutorialState {
    fn default() -> Self {
        Self::new()
    }
}

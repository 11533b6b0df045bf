use log::{debug, info, trace};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::Serialize;

use crate::config::tutorial::{
    GRID_COLUMNS, GRID_ROWS, MOTION_ADVANCE_MS, MOTION_SAMPLE_INTERVAL_MS, RUB_HOLD_MS,
    TutorialConfig,
};
use crate::tutorial::error::TutorialError;
use crate::tutorial::grid::{Geometry, Token, TokenRegistry};
use crate::tutorial::host::Host;
use crate::tutorial::motion::{self, MotionReport, MotionSource};
use crate::tutorial::palette::Palette;
use crate::tutorial::scheduler::{Scheduler, Timer};
use crate::tutorial::stages::{self, Effect, Event, Stage, StageContext};
use crate::tutorial::state::TutorialState;
use crate::tutorial::types::{MotionMode, Point};

/// Serializable view of a running tutorial, for debugging hosts.
#[derive(Debug, Clone, Serialize)]
pub struct TutorialSnapshot {
    pub state: TutorialState,
    pub geometry: Geometry,
    pub tokens: Vec<Token>,
}

/// One running tutorial: the stage machine wired to its collaborators.
///
/// Everything happens on the caller's thread. Pointer events are handled
/// immediately; timers fire from [`Tutorial::tick`].
pub struct Tutorial<S: Scheduler, H: Host> {
    state: TutorialState,
    tokens: TokenRegistry,
    scheduler: S,
    host: H,
    motion: Box<dyn MotionSource>,
    rng: SmallRng,
    finished: bool,
}

impl<S: Scheduler, H: Host> Tutorial<S, H> {
    /// Build the grid for the configured screen and start the first round.
    pub fn new(
        config: &TutorialConfig,
        scheduler: S,
        host: H,
        motion: Box<dyn MotionSource>,
    ) -> Result<Self, TutorialError> {
        let geometry = Geometry::from_screen(
            config.screen_width,
            config.screen_height,
            GRID_COLUMNS,
            GRID_ROWS,
        )?;
        let palette = Palette::parse(&config.palette)?;
        let rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_rng(&mut rand::rng()),
        };
        info!(
            "[Tutorial] Starting on {}x{} (dot {} px, pitch {} px)",
            geometry.width,
            geometry.height,
            geometry.dot_size,
            geometry.pitch()
        );

        let mut tutorial = Self {
            state: TutorialState::new(),
            tokens: TokenRegistry::create_grid(geometry, palette),
            scheduler,
            host,
            motion,
            rng,
            finished: false,
        };
        tutorial.dispatch(Event::Timer);
        Ok(tutorial)
    }

    pub fn stage(&self) -> Stage {
        self.state.stage
    }

    pub fn state(&self) -> &TutorialState {
        &self.state
    }

    pub fn tokens(&self) -> &TokenRegistry {
        &self.tokens
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn snapshot(&self) -> TutorialSnapshot {
        TutorialSnapshot {
            state: self.state.clone(),
            geometry: *self.tokens.geometry(),
            tokens: self.tokens.iter().cloned().collect(),
        }
    }

    #[cfg(test)]
    pub(crate) fn state_mut(&mut self) -> &mut TutorialState {
        &mut self.state
    }

    #[cfg(test)]
    pub(crate) fn tokens_mut(&mut self) -> &mut TokenRegistry {
        &mut self.tokens
    }

    #[cfg(test)]
    pub(crate) fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    fn accepts_pointer(&self) -> bool {
        !self.finished && self.state.motion_mode == MotionMode::None
    }

    /// A press only matters while rubbing: it starts the hold timer.
    pub fn on_pointer_down(&mut self, point: Point) {
        if !self.accepts_pointer() || !self.state.rubbing {
            return;
        }
        let Some(index) = self.host.hit_test(&self.tokens, point) else {
            return;
        };
        let generation = self.state.begin_pause();
        self.state.pressed_target = self.state.is_target(index).then_some(index);
        self.state.awaiting_release = true;
        self.scheduler.after(RUB_HOLD_MS, Timer::ClearPause { generation });
        trace!("[Tutorial] Rub started on token {} (generation {})", index, generation);
    }

    pub fn on_pointer_up(&mut self, point: Point) {
        if !self.accepts_pointer() {
            return;
        }
        if self.state.awaiting_release {
            // End of a rub gesture, finished or not.
            if self.state.pausing {
                self.state.cancel_gesture();
                self.host.set_status_text("Rub a little longer.");
            } else {
                self.state.awaiting_release = false;
                self.state.pressed_target = None;
            }
            return;
        }
        let Some(index) = self.host.hit_test(&self.tokens, point) else {
            return;
        };
        self.state.last_released = Some(index);
        if !self.state.is_target(index) {
            trace!("[Tutorial] Release on plain token {} ignored", index);
            return;
        }
        self.dispatch(Event::Release(index));
    }

    /// Fire every timer that is due. Returns how many fired.
    pub fn tick(&mut self) -> usize {
        let mut fired = 0;
        while !self.finished {
            let Some(timer) = self.scheduler.next_due() else { break };
            self.fire(timer);
            fired += 1;
        }
        fired
    }

    pub fn quit(&mut self) {
        if self.finished {
            return;
        }
        info!("[Tutorial] Quit requested in {:?}", self.state.stage);
        self.finished = true;
        self.state.motion_mode = MotionMode::None;
        self.host.quit();
    }

    fn fire(&mut self, timer: Timer) {
        match timer {
            Timer::Advance => {
                self.state.advance_pending = false;
                self.dispatch(Event::Timer);
            }
            Timer::ClearPause { generation } => {
                if !self.state.pausing || generation != self.state.pause_generation {
                    trace!("[Tutorial] Stale pause timer {} ignored", generation);
                    return;
                }
                self.state.pausing = false;
                if !self.state.awaiting_release {
                    return;
                }
                if let Some(index) = self.state.pressed_target {
                    self.dispatch(Event::Rub(index));
                }
            }
            Timer::MotionSample => self.sample(),
        }
    }

    fn sample(&mut self) {
        let mode = self.state.motion_mode;
        if !mode.is_active() {
            debug!("[Tutorial] Motion off, sampling stopped");
            self.state.sampling = false;
            return;
        }
        let reading = motion::read_or_synthesize(self.motion.as_mut(), &mut self.rng);
        let report = motion::step(mode, reading, &mut self.tokens, &mut self.rng);
        if report == MotionReport::Settled && self.state.pausing {
            self.state.pausing = false;
            let text = if mode == MotionMode::Align { "Interesting." } else { "Hmm" };
            self.host.set_status_text(text);
        }
        if !self.state.pausing && !self.state.advance_pending {
            self.state.advance_pending = true;
            self.scheduler.after(MOTION_ADVANCE_MS, Timer::Advance);
        }
        self.scheduler.after(MOTION_SAMPLE_INTERVAL_MS, Timer::MotionSample);
        self.flush();
    }

    fn dispatch(&mut self, event: Event) {
        let stage = self.state.stage;
        let effects = {
            let mut ctx = StageContext::new(&mut self.state, &mut self.tokens, &mut self.rng);
            stages::run(stage, &mut ctx, event);
            ctx.into_effects()
        };
        for effect in effects {
            self.apply(effect);
        }
        self.flush();
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::Status(text) => self.host.set_status_text(&text),
            Effect::Schedule { delay_ms, timer } => {
                self.scheduler.after(delay_ms, timer);
            }
            Effect::StartSampling => {
                if !self.state.sampling {
                    self.state.sampling = true;
                    self.scheduler.after(MOTION_SAMPLE_INTERVAL_MS, Timer::MotionSample);
                }
            }
            Effect::RedrawAll => {
                self.tokens.take_dirty();
                self.host.redraw_all(&self.tokens, self.state.backdrop);
            }
        }
    }

    fn flush(&mut self) {
        for index in self.tokens.take_dirty() {
            if let Some(token) = self.tokens.get(index) {
                self.host.draw_token(token);
            }
        }
    }
}

//! Stage machine.
//!
//! The tutorial is a closed loop of stages. The current [`Stage`] names the
//! handler that receives the next [`Event`]; handlers mutate the state and the
//! token registry through a [`StageContext`], queue their side effects, and
//! return the transition. The engine applies effects after the handler
//! returns, so handlers never touch the scheduler or the host directly.

use log::{debug, warn};
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};

use crate::config::tutorial::{
    AUTO_ADVANCE_MS, DOT_LAYER, FADE_PHASE_MS, HIDDEN_LAYER, RAISED_LAYER, SHAKE_PHASE_MS,
    TAP_REPEATS,
};
use crate::tutorial::grid::TokenRegistry;
use crate::tutorial::palette::FADE_STEPS;
use crate::tutorial::scheduler::Timer;
use crate::tutorial::state::TutorialState;
use crate::tutorial::types::{Backdrop, MotionMode, TokenKind};

const SMILE: &str = ":)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    FindFirstYellow,
    FindSecondYellow,
    FindThirdYellow,
    RubToRed,
    RubToBlue,
    TapYellow,
    TapRed,
    TapBlue,
    ShakeIntro,
    ShakeHarder,
    TiltLeft,
    TiltRight,
    Realign,
    TapSixTargets,
    TapSixAgain,
    TapTwoSwapped,
    ShakeAgain,
    Fade { step: u8 },
}

/// What a stage handler is invoked with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A scheduled advance with no payload.
    Timer,
    /// Pointer released on a target token.
    Release(usize),
    /// Press held on a target token for the whole rub time.
    Rub(usize),
}

/// Side effects queued by a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Status(String),
    Schedule { delay_ms: u64, timer: Timer },
    StartSampling,
    RedrawAll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Stay,
    Goto(Stage),
}

pub type Handler = fn(&mut StageContext<'_>, Event) -> Transition;

pub struct StageContext<'a> {
    pub state: &'a mut TutorialState,
    pub tokens: &'a mut TokenRegistry,
    pub rng: &'a mut SmallRng,
    effects: Vec<Effect>,
}

impl<'a> StageContext<'a> {
    pub fn new(
        state: &'a mut TutorialState,
        tokens: &'a mut TokenRegistry,
        rng: &'a mut SmallRng,
    ) -> Self {
        Self {
            state,
            tokens,
            rng,
            effects: Vec::new(),
        }
    }

    pub fn into_effects(self) -> Vec<Effect> {
        self.effects
    }

    fn say(&mut self, text: impl Into<String>) {
        self.effects.push(Effect::Status(text.into()));
    }

    fn after(&mut self, delay_ms: u64, timer: Timer) {
        self.effects.push(Effect::Schedule { delay_ms, timer });
    }

    /// Pause auto-advance until `ms` elapse or the motion settles.
    fn pause_for(&mut self, ms: u64) {
        let generation = self.state.begin_pause();
        self.after(ms, Timer::ClearPause { generation });
    }

    fn start_motion(&mut self, mode: MotionMode) {
        self.state.motion_mode = mode;
        self.effects.push(Effect::StartSampling);
    }

    fn remind(&mut self, stage: Stage) {
        if let Some(text) = stage.instruction() {
            self.say(text);
        }
    }

    /// Give a fresh token the `kind` role and register it as a target.
    fn spawn_target(&mut self, kind: TokenKind) -> Option<usize> {
        let Some(index) = self.tokens.pick_unused_index(&self.state.targets, &mut *self.rng) else {
            warn!("[Tutorial] No free token left for a new {:?} target", kind);
            return None;
        };
        self.state.targets.push(index);
        self.tokens.set_kind(index, kind);
        Some(index)
    }

    fn yellow_targets(&self) -> usize {
        self.state
            .targets
            .iter()
            .filter(|&&i| self.tokens.kind(i) == TokenKind::Yellow)
            .count()
    }
}

impl Stage {
    pub fn handler(self) -> Handler {
        match self {
            Stage::FindFirstYellow => find_first_yellow,
            Stage::FindSecondYellow => find_second_yellow,
            Stage::FindThirdYellow => find_third_yellow,
            Stage::RubToRed => rub_to_red,
            Stage::RubToBlue => rub_to_blue,
            Stage::TapYellow => tap_yellow,
            Stage::TapRed => tap_red,
            Stage::TapBlue => tap_blue,
            Stage::ShakeIntro => shake_intro,
            Stage::ShakeHarder => shake_harder,
            Stage::TiltLeft => tilt_left,
            Stage::TiltRight => tilt_right,
            Stage::Realign => realign,
            Stage::TapSixTargets => tap_six_targets,
            Stage::TapSixAgain => tap_six_again,
            Stage::TapTwoSwapped => tap_two_swapped,
            Stage::ShakeAgain => shake_again,
            Stage::Fade { step: 0 | 1 } => fade::<1>,
            Stage::Fade { step: 2 } => fade::<2>,
            Stage::Fade { step: 3 } => fade::<3>,
            Stage::Fade { .. } => fade::<FADE_STEPS>,
        }
    }

    /// Guidance text reissued when input does not match the stage.
    pub fn instruction(self) -> Option<&'static str> {
        match self {
            Stage::FindFirstYellow => Some("Tap on the yellow dot."),
            Stage::FindSecondYellow => Some("Well done! Now tap on the other yellow dot."),
            Stage::FindThirdYellow => Some("Good! Now tap on the new yellow dot."),
            Stage::RubToRed => Some("Great! Now rub on one of the yellow dots."),
            Stage::RubToBlue => Some("Good job! Now rub on another one of the yellow dots."),
            Stage::TapYellow => Some("Now gently tap on the yellow dot five times."),
            Stage::TapRed => Some("Now gently tap on the red dot five times."),
            Stage::TapBlue => Some("Now gently tap on the blue dot five times."),
            Stage::TapSixTargets => Some("OK. Now press each of the yellow dots."),
            Stage::TapSixAgain => Some("Press all of the yellow dots again!"),
            Stage::TapTwoSwapped => Some("Tap on the two dots that switched positions."),
            _ => None,
        }
    }
}

/// Invoke the handler of `stage` and record the outcome in the state.
pub fn run(stage: Stage, ctx: &mut StageContext<'_>, event: Event) -> Transition {
    let transition = (stage.handler())(ctx, event);
    if let Transition::Goto(next) = transition {
        debug!("[Tutorial] {:?} -> {:?} on {:?}", stage, next, event);
        ctx.state.stage = next;
    }
    transition
}

/// Start a round: all dots plain and home, one yellow target.
pub fn begin(ctx: &mut StageContext<'_>) {
    ctx.state.restart();
    ctx.tokens.reset();
    ctx.spawn_target(TokenKind::Yellow);
    ctx.say("Tap on the yellow dot.");
    ctx.effects.push(Effect::RedrawAll);
}

fn find_first_yellow(ctx: &mut StageContext<'_>, event: Event) -> Transition {
    match event {
        Event::Timer => {
            begin(ctx);
            Transition::Stay
        }
        Event::Release(i) if ctx.state.targets.first() == Some(&i) => {
            ctx.spawn_target(TokenKind::Yellow);
            ctx.say("Well done! Now tap on the other yellow dot.");
            Transition::Goto(Stage::FindSecondYellow)
        }
        _ => Transition::Stay,
    }
}

fn find_second_yellow(ctx: &mut StageContext<'_>, event: Event) -> Transition {
    let Event::Release(i) = event else { return Transition::Stay };
    if ctx.state.targets.get(1) == Some(&i) {
        ctx.spawn_target(TokenKind::Yellow);
        ctx.remind(Stage::FindThirdYellow);
        Transition::Goto(Stage::FindThirdYellow)
    } else {
        ctx.say("The other yellow dot!");
        Transition::Stay
    }
}

fn find_third_yellow(ctx: &mut StageContext<'_>, event: Event) -> Transition {
    let Event::Release(i) = event else { return Transition::Stay };
    if ctx.state.targets.get(2) == Some(&i) {
        ctx.state.rubbing = true;
        ctx.remind(Stage::RubToRed);
        Transition::Goto(Stage::RubToRed)
    } else {
        ctx.say("The new yellow dot!");
        Transition::Stay
    }
}

fn rub_to_red(ctx: &mut StageContext<'_>, event: Event) -> Transition {
    match event {
        Event::Rub(i) if ctx.tokens.kind(i) == TokenKind::Yellow => {
            ctx.tokens.set_kind(i, TokenKind::Red);
            ctx.remind(Stage::RubToBlue);
            Transition::Goto(Stage::RubToBlue)
        }
        Event::Timer => Transition::Stay,
        _ => {
            ctx.remind(Stage::RubToRed);
            Transition::Stay
        }
    }
}

fn rub_to_blue(ctx: &mut StageContext<'_>, event: Event) -> Transition {
    match event {
        Event::Rub(i) if ctx.tokens.kind(i) == TokenKind::Yellow => {
            ctx.tokens.set_kind(i, TokenKind::Blue);
            ctx.state.rubbing = false;
            ctx.state.repeat_count = 0;
            ctx.remind(Stage::TapYellow);
            Transition::Goto(Stage::TapYellow)
        }
        Event::Timer => Transition::Stay,
        _ => {
            ctx.remind(Stage::RubToBlue);
            Transition::Stay
        }
    }
}

/// Count one tap on a `kind` dot and spawn the next one.
/// Returns true when the count reached `TAP_REPEATS`.
fn tap_repeat(
    ctx: &mut StageContext<'_>,
    event: Event,
    stage: Stage,
    kind: TokenKind,
    name: &str,
) -> bool {
    let Event::Release(i) = event else { return false };
    if ctx.tokens.kind(i) != kind {
        if ctx.state.repeat_count == 0 {
            ctx.remind(stage);
        } else {
            ctx.say(format!("Tap on a {} dot.", name));
        }
        return false;
    }
    ctx.state.repeat_count += 1;
    let done = ctx.state.repeat_count >= TAP_REPEATS;
    if done {
        ctx.state.repeat_count = 0;
    } else {
        ctx.say("Keep tapping.");
    }
    ctx.spawn_target(kind);
    done
}

fn tap_yellow(ctx: &mut StageContext<'_>, event: Event) -> Transition {
    if tap_repeat(ctx, event, Stage::TapYellow, TokenKind::Yellow, "yellow") {
        ctx.remind(Stage::TapRed);
        Transition::Goto(Stage::TapRed)
    } else {
        Transition::Stay
    }
}

fn tap_red(ctx: &mut StageContext<'_>, event: Event) -> Transition {
    if tap_repeat(ctx, event, Stage::TapRed, TokenKind::Red, "red") {
        ctx.remind(Stage::TapBlue);
        Transition::Goto(Stage::TapBlue)
    } else {
        Transition::Stay
    }
}

fn tap_blue(ctx: &mut StageContext<'_>, event: Event) -> Transition {
    if tap_repeat(ctx, event, Stage::TapBlue, TokenKind::Blue, "blue") {
        ctx.say("");
        // No pointer event will follow, so the next stage starts on a timer.
        ctx.after(AUTO_ADVANCE_MS, Timer::Advance);
        Transition::Goto(Stage::ShakeIntro)
    } else {
        Transition::Stay
    }
}

/// Common body of the five motion phases.
fn motion_phase(
    ctx: &mut StageContext<'_>,
    event: Event,
    text: &str,
    mode: MotionMode,
    next: Stage,
) -> Transition {
    if event != Event::Timer {
        return Transition::Stay;
    }
    ctx.say(text);
    ctx.start_motion(mode);
    // Random phases end on this timeout only; the others also end when the
    // simulator settles, with this as the fallback.
    ctx.pause_for(SHAKE_PHASE_MS);
    Transition::Goto(next)
}

fn shake_intro(ctx: &mut StageContext<'_>, event: Event) -> Transition {
    if event == Event::Timer {
        for index in ctx.tokens.active_indexes() {
            ctx.tokens.set_layer(index, RAISED_LAYER);
        }
    }
    motion_phase(
        ctx,
        event,
        "OK. Now, shake the computer!!",
        MotionMode::Random,
        Stage::ShakeHarder,
    )
}

fn shake_harder(ctx: &mut StageContext<'_>, event: Event) -> Transition {
    motion_phase(ctx, event, "Shake it harder!!", MotionMode::RandomStrong, Stage::TiltLeft)
}

fn tilt_left(ctx: &mut StageContext<'_>, event: Event) -> Transition {
    motion_phase(
        ctx,
        event,
        "See what happens if you turn it to the left.",
        MotionMode::TiltLeft,
        Stage::TiltRight,
    )
}

fn tilt_right(ctx: &mut StageContext<'_>, event: Event) -> Transition {
    motion_phase(ctx, event, "Now turn it to the right.", MotionMode::TiltRight, Stage::Realign)
}

fn realign(ctx: &mut StageContext<'_>, event: Event) -> Transition {
    motion_phase(ctx, event, "Shake it some more.", MotionMode::Align, Stage::TapSixTargets)
}

fn tap_six_targets(ctx: &mut StageContext<'_>, event: Event) -> Transition {
    ctx.state.motion_mode = MotionMode::None;
    let i = match event {
        Event::Release(i) => i,
        _ => {
            ctx.state.tapped.clear();
            ctx.remind(Stage::TapSixTargets);
            return Transition::Stay;
        }
    };
    if ctx.tokens.kind(i) != TokenKind::Yellow {
        ctx.say("Press the yellow dots.");
        return Transition::Stay;
    }
    ctx.remind(Stage::TapSixTargets);
    if ctx.state.tapped.insert(i) {
        ctx.tokens.set_label(i, Some(SMILE));
    }
    if ctx.state.tapped.len() < ctx.yellow_targets() {
        return Transition::Stay;
    }

    // Lights out: only the yellow dots stay above the dark backdrop.
    ctx.state.backdrop = Backdrop::Dark;
    let hidden: Vec<usize> = ctx
        .tokens
        .iter()
        .filter(|t| t.kind != TokenKind::Yellow)
        .map(|t| t.index)
        .collect();
    for index in hidden {
        ctx.tokens.set_layer(index, HIDDEN_LAYER);
    }
    ctx.state.tapped.clear();
    ctx.remind(Stage::TapSixAgain);
    ctx.effects.push(Effect::RedrawAll);
    Transition::Goto(Stage::TapSixAgain)
}

fn tap_six_again(ctx: &mut StageContext<'_>, event: Event) -> Transition {
    let Event::Release(i) = event else { return Transition::Stay };
    if ctx.tokens.kind(i) != TokenKind::Yellow {
        return Transition::Stay;
    }
    if ctx.state.tapped.insert(i) {
        ctx.tokens.set_label(i, None);
    }
    if ctx.state.tapped.len() < ctx.yellow_targets() {
        return Transition::Stay;
    }

    ctx.state.backdrop = Backdrop::Light;
    let shown: Vec<(usize, i32)> = ctx
        .tokens
        .iter()
        .filter(|t| t.kind != TokenKind::Yellow)
        .map(|t| (t.index, if t.kind.is_active() { RAISED_LAYER } else { DOT_LAYER }))
        .collect();
    for (index, layer) in shown {
        ctx.tokens.set_layer(index, layer);
    }
    if let (Some(&a), Some(&b)) = (ctx.state.targets.get(1), ctx.state.targets.get(2)) {
        ctx.tokens.swap_positions(a, b);
    }
    ctx.state.tapped.clear();
    ctx.remind(Stage::TapTwoSwapped);
    ctx.effects.push(Effect::RedrawAll);
    Transition::Goto(Stage::TapTwoSwapped)
}

fn tap_two_swapped(ctx: &mut StageContext<'_>, event: Event) -> Transition {
    let Event::Release(i) = event else { return Transition::Stay };
    let (Some(&a), Some(&b)) = (ctx.state.targets.get(1), ctx.state.targets.get(2)) else {
        return Transition::Stay;
    };
    if i != a && i != b {
        ctx.say("Keep trying.");
        return Transition::Stay;
    }
    if ctx.state.tapped.insert(i) {
        ctx.tokens.set_label(i, Some(SMILE));
    }
    if ctx.state.tapped.len() < 2 {
        ctx.say("You found one. Now find the other one.");
        return Transition::Stay;
    }

    ctx.tokens.swap_positions(a, b);
    for index in std::mem::take(&mut ctx.state.tapped) {
        ctx.tokens.set_label(index, None);
    }
    ctx.say("Good job! Now let's shake again.");
    // ShakeAgain ignores releases, and the motion mode is only set once it
    // runs, so a sample still queued from the realign loop stops quietly.
    ctx.after(AUTO_ADVANCE_MS, Timer::Advance);
    Transition::Goto(Stage::ShakeAgain)
}

fn shake_again(ctx: &mut StageContext<'_>, event: Event) -> Transition {
    if event != Event::Timer {
        return Transition::Stay;
    }
    ctx.start_motion(MotionMode::RandomStrong);
    ctx.pause_for(FADE_PHASE_MS);
    Transition::Goto(Stage::Fade { step: 1 })
}

/// One fade step; `STEP` comes from the dispatched `Stage::Fade`.
fn fade<const STEP: u8>(ctx: &mut StageContext<'_>, event: Event) -> Transition {
    if event != Event::Timer {
        return Transition::Stay;
    }
    let step = STEP;
    for index in ctx.tokens.active_indexes() {
        ctx.tokens.fade(index, step);
    }
    if step < FADE_STEPS {
        let dots = match step {
            1 => "",
            2 => "..",
            _ => "...",
        };
        ctx.say(format!("Going{}", dots));
        ctx.start_motion(MotionMode::RandomStrong);
        ctx.pause_for(FADE_PHASE_MS);
        Transition::Goto(Stage::Fade { step: step + 1 })
    } else {
        ctx.say("Gone!");
        ctx.state.motion_mode = MotionMode::None;
        ctx.after(AUTO_ADVANCE_MS, Timer::Advance);
        Transition::Goto(Stage::FindFirstYellow)
    }
}

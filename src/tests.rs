#[cfg(test)]
mod tests {
    use crate::config::tutorial::{
        AUTO_ADVANCE_MS, DEFAULT_PALETTE, HIDDEN_LAYER, TAP_REPEATS, TutorialConfig,
    };
    use crate::tutorial::engine::Tutorial;
    use crate::tutorial::error::TutorialError;
    use crate::tutorial::grid::{Token, TokenRegistry};
    use crate::tutorial::host::{Renderer, Shell};
    use crate::tutorial::motion::{NoMotionDevice, docks};
    use crate::tutorial::scheduler::{Scheduler, Timer, TimerId, TimerQueue, VirtualClock};
    use crate::tutorial::stages::Stage;
    use crate::tutorial::types::{Backdrop, MotionMode, Point, TokenKind};

    /// Queues timers on a virtual clock and remembers every request.
    struct RecordingScheduler {
        queue: TimerQueue<VirtualClock>,
        requested: Vec<(u64, Timer)>,
    }

    impl Scheduler for RecordingScheduler {
        fn after(&mut self, delay_ms: u64, timer: Timer) -> TimerId {
            self.requested.push((delay_ms, timer));
            self.queue.after(delay_ms, timer)
        }

        fn every(&mut self, interval_ms: u64, timer: Timer) -> TimerId {
            self.requested.push((interval_ms, timer));
            self.queue.every(interval_ms, timer)
        }

        fn cancel(&mut self, id: TimerId) {
            self.queue.cancel(id);
        }

        fn next_due(&mut self) -> Option<Timer> {
            self.queue.next_due()
        }
    }

    #[derive(Default)]
    struct RecordingHost {
        statuses: Vec<String>,
        drawn: Vec<usize>,
        scenes: Vec<Backdrop>,
        quit: bool,
    }

    impl Renderer for RecordingHost {
        fn draw_token(&mut self, token: &Token) {
            self.drawn.push(token.index);
        }

        fn redraw_all(&mut self, _tokens: &TokenRegistry, backdrop: Backdrop) {
            self.scenes.push(backdrop);
        }
    }

    impl Shell for RecordingHost {
        fn set_status_text(&mut self, text: &str) {
            self.statuses.push(text.to_string());
        }

        fn quit(&mut self) {
            self.quit = true;
        }
    }

    struct Harness {
        clock: VirtualClock,
        tutorial: Tutorial<RecordingScheduler, RecordingHost>,
    }

    fn seeded_config(seed: u64) -> TutorialConfig {
        TutorialConfig {
            seed: Some(seed),
            ..TutorialConfig::default()
        }
    }

    impl Harness {
        fn new() -> Self {
            Self::with_seed(7)
        }

        fn with_seed(seed: u64) -> Self {
            let clock = VirtualClock::new();
            let scheduler = RecordingScheduler {
                queue: TimerQueue::new(clock.clone()),
                requested: Vec::new(),
            };
            let tutorial = Tutorial::new(
                &seeded_config(seed),
                scheduler,
                RecordingHost::default(),
                Box::new(NoMotionDevice),
            )
            .unwrap();
            Self { clock, tutorial }
        }

        fn run_for(&mut self, ms: u64) {
            for _ in 0..ms / 10 {
                self.clock.advance(10);
                self.tutorial.tick();
            }
        }

        fn center(&self, index: usize) -> Point {
            let tokens = self.tutorial.tokens();
            tokens.get(index).unwrap().center(tokens.geometry().dot_size)
        }

        fn tap(&mut self, index: usize) {
            let point = self.center(index);
            self.tutorial.on_pointer_down(point);
            self.tutorial.on_pointer_up(point);
        }

        fn hold(&mut self, index: usize, ms: u64) {
            let point = self.center(index);
            self.tutorial.on_pointer_down(point);
            self.run_for(ms);
            self.tutorial.on_pointer_up(point);
        }

        fn stage(&self) -> Stage {
            self.tutorial.stage()
        }

        fn targets(&self) -> Vec<usize> {
            self.tutorial.state().targets.clone()
        }

        fn status(&self) -> &str {
            self.tutorial.host().statuses.last().map(String::as_str).unwrap_or("")
        }

        fn first_of(&self, kind: TokenKind) -> usize {
            *self
                .targets()
                .iter()
                .find(|&&i| self.tutorial.tokens().kind(i) == kind)
                .unwrap()
        }

        fn plain_token(&self) -> usize {
            (0..45).find(|&i| self.tutorial.tokens().kind(i) == TokenKind::Plain).unwrap()
        }

        /// Play the opening up to the first rub stage.
        fn find_three_yellows(&mut self) {
            for n in 0..3 {
                let target = self.targets()[n];
                self.tap(target);
            }
        }

        /// Play the rub stages, ending in tap-yellow.
        fn rub_two(&mut self) {
            let targets = self.targets();
            self.hold(targets[0], 1000);
            self.hold(targets[1], 1000);
        }

        fn tap_kind(&mut self, kind: TokenKind, times: u32) {
            for _ in 0..times {
                let index = self.first_of(kind);
                self.tap(index);
            }
        }

        /// Lay out the tap-six stage by hand: six yellow, two red, one blue.
        fn at_tap_six(&mut self) -> Vec<usize> {
            let yellows = vec![1, 3, 5, 10, 12, 14];
            let others = [(20, TokenKind::Red), (22, TokenKind::Red), (30, TokenKind::Blue)];
            let tokens = self.tutorial.tokens_mut();
            tokens.reset();
            for &i in &yellows {
                tokens.set_kind(i, TokenKind::Yellow);
            }
            for (i, kind) in others {
                tokens.set_kind(i, kind);
            }
            let state = self.tutorial.state_mut();
            state.targets = yellows.iter().copied().chain(others.iter().map(|(i, _)| *i)).collect();
            state.stage = Stage::TapSixTargets;
            state.rubbing = false;
            state.motion_mode = MotionMode::None;
            yellows
        }
    }

    #[test]
    fn test_fresh_start_shows_one_yellow() {
        let h = Harness::new();
        assert_eq!(h.stage(), Stage::FindFirstYellow);
        assert_eq!(h.targets().len(), 1);
        assert_eq!(h.tutorial.tokens().kind(h.targets()[0]), TokenKind::Yellow);
        assert_eq!(h.status(), "Tap on the yellow dot.");
        assert_eq!(h.tutorial.host().scenes, vec![Backdrop::Light]);
    }

    #[test]
    fn test_same_seed_same_targets() {
        let a = Harness::with_seed(99);
        let b = Harness::with_seed(99);
        assert_eq!(a.targets(), b.targets());
    }

    #[test]
    fn test_opening_reaches_rub_stage() {
        let mut h = Harness::new();
        let first = h.targets()[0];
        h.tap(first);
        assert_eq!(h.stage(), Stage::FindSecondYellow);
        assert_eq!(h.targets().len(), 2);
        assert!(h.tutorial.host().drawn.contains(&h.targets()[1]));

        h.tap(first);
        assert_eq!(h.status(), "The other yellow dot!");
        assert_eq!(h.stage(), Stage::FindSecondYellow);

        let second = h.targets()[1];
        h.tap(second);
        assert_eq!(h.stage(), Stage::FindThirdYellow);
        let third = h.targets()[2];
        h.tap(third);
        assert_eq!(h.stage(), Stage::RubToRed);
        assert_eq!(h.targets().len(), 3);
        assert!(h.tutorial.state().rubbing);
    }

    #[test]
    fn test_plain_and_empty_releases_are_ignored() {
        let mut h = Harness::new();
        let plain = h.plain_token();
        let statuses = h.tutorial.host().statuses.len();
        h.tap(plain);
        h.tutorial.on_pointer_up(Point::new(-500, -500));
        assert_eq!(h.stage(), Stage::FindFirstYellow);
        assert_eq!(h.tutorial.host().statuses.len(), statuses);
        assert_eq!(h.targets().len(), 1);
    }

    #[test]
    fn test_short_rub_is_cancelled() {
        let mut h = Harness::new();
        h.find_three_yellows();
        let target = h.targets()[0];
        h.hold(target, 500);
        assert_eq!(h.status(), "Rub a little longer.");
        assert!(!h.tutorial.state().pausing);

        // The cancelled hold timer fires during the next hold and is ignored.
        h.hold(target, 600);
        assert_eq!(h.stage(), Stage::RubToRed);
        assert_eq!(h.tutorial.tokens().kind(target), TokenKind::Yellow);

        h.hold(target, 1000);
        assert_eq!(h.stage(), Stage::RubToBlue);
        assert_eq!(h.tutorial.tokens().kind(target), TokenKind::Red);
    }

    #[test]
    fn test_rub_turns_red_then_blue() {
        let mut h = Harness::new();
        h.find_three_yellows();
        let targets = h.targets();

        h.hold(targets[0], 1000);
        assert_eq!(h.stage(), Stage::RubToBlue);
        assert_eq!(h.status(), "Good job! Now rub on another one of the yellow dots.");
        // Releasing after a completed rub is not a tap.
        assert!(!h.tutorial.state().awaiting_release);

        h.hold(targets[0], 1000);
        assert_eq!(h.stage(), Stage::RubToBlue);
        assert_eq!(h.tutorial.tokens().kind(targets[0]), TokenKind::Red);

        h.hold(targets[1], 1000);
        assert_eq!(h.stage(), Stage::TapYellow);
        assert_eq!(h.tutorial.tokens().kind(targets[1]), TokenKind::Blue);
        assert_eq!(h.status(), "Now gently tap on the yellow dot five times.");
        assert!(!h.tutorial.state().rubbing);
    }

    #[test]
    fn test_tap_yellow_five_times() {
        let mut h = Harness::new();
        h.find_three_yellows();
        h.rub_two();

        h.tap_kind(TokenKind::Red, 1);
        assert_eq!(h.status(), "Now gently tap on the yellow dot five times.");
        assert_eq!(h.tutorial.state().repeat_count, 0);

        h.tap_kind(TokenKind::Yellow, TAP_REPEATS - 1);
        assert_eq!(h.stage(), Stage::TapYellow);
        assert_eq!(h.status(), "Keep tapping.");

        let targets = h.targets();
        h.tap_kind(TokenKind::Red, 1);
        assert_eq!(h.status(), "Tap on a yellow dot.");
        assert_eq!(h.tutorial.state().repeat_count, TAP_REPEATS - 1);
        assert_eq!(h.targets(), targets);

        h.tap_kind(TokenKind::Yellow, 1);
        assert_eq!(h.stage(), Stage::TapRed);
        assert_eq!(h.tutorial.state().repeat_count, 0);
        assert_eq!(h.status(), "Now gently tap on the red dot five times.");
    }

    #[test]
    fn test_tap_blue_schedules_shake() {
        let mut h = Harness::new();
        h.find_three_yellows();
        h.rub_two();
        h.tap_kind(TokenKind::Yellow, TAP_REPEATS);
        h.tap_kind(TokenKind::Red, TAP_REPEATS);
        h.tap_kind(TokenKind::Blue, TAP_REPEATS);

        assert_eq!(h.stage(), Stage::ShakeIntro);
        assert_eq!(h.status(), "");
        assert_eq!(
            h.tutorial.scheduler().requested.last(),
            Some(&(AUTO_ADVANCE_MS, Timer::Advance))
        );
        // 3 from the opening, 5 of each color spawned while tapping.
        assert_eq!(h.targets().len(), 3 + 3 * TAP_REPEATS as usize);
    }

    #[test]
    fn test_motion_phases_run_to_tap_six() {
        let mut h = Harness::new();
        h.find_three_yellows();
        h.rub_two();
        h.tap_kind(TokenKind::Yellow, TAP_REPEATS);
        h.tap_kind(TokenKind::Red, TAP_REPEATS);
        h.tap_kind(TokenKind::Blue, TAP_REPEATS);

        h.run_for(1000);
        assert_eq!(h.stage(), Stage::ShakeHarder);
        assert_eq!(h.tutorial.state().motion_mode, MotionMode::Random);
        assert!(h.tutorial.state().sampling);
        assert!(h.tutorial.host().statuses.iter().any(|s| s == "OK. Now, shake the computer!!"));

        // Pointer input is dead while things move.
        let statuses = h.tutorial.host().statuses.len();
        let target = h.targets()[0];
        h.tap(target);
        assert_eq!(h.tutorial.host().statuses.len(), statuses);

        h.run_for(40_000);
        assert_eq!(h.stage(), Stage::TapSixTargets);
        assert_eq!(h.tutorial.state().motion_mode, MotionMode::None);
        assert!(!h.tutorial.state().sampling);
        assert_eq!(h.status(), "OK. Now press each of the yellow dots.");

        // Exactly one sampling loop ran the whole time.
        let samples: Vec<u64> = h
            .tutorial
            .scheduler()
            .requested
            .iter()
            .filter(|(_, t)| *t == Timer::MotionSample)
            .map(|(delay, _)| *delay)
            .collect();
        assert!(samples.iter().all(|&d| d == 100));
        assert!(samples.len() < 400);
    }

    #[test]
    fn test_docked_align_clears_pause_on_next_sample() {
        let mut h = Harness::new();
        let tokens = h.tutorial.tokens_mut();
        tokens.reset();
        for (i, kind) in [
            (2, TokenKind::Yellow),
            (7, TokenKind::Red),
            (11, TokenKind::Yellow),
            (20, TokenKind::Blue),
            (31, TokenKind::Red),
            (44, TokenKind::Yellow),
        ] {
            tokens.set_kind(i, kind);
        }
        for (i, dock) in docks(tokens) {
            tokens.move_to(i, dock);
        }
        let state = h.tutorial.state_mut();
        state.stage = Stage::TapSixTargets;
        state.motion_mode = MotionMode::Align;
        state.sampling = true;
        let generation = state.begin_pause();
        let scheduler = h.tutorial.scheduler_mut();
        scheduler.after(5000, Timer::ClearPause { generation });
        scheduler.after(100, Timer::MotionSample);

        h.run_for(100);
        assert!(!h.tutorial.state().pausing);
        assert!(h.tutorial.state().advance_pending);
        assert_eq!(h.status(), "Interesting.");
    }

    #[test]
    fn test_tilt_near_edge_says_hmm_and_advances_once() {
        let mut h = Harness::new();
        let tokens = h.tutorial.tokens_mut();
        tokens.reset();
        for (i, kind) in [(0, TokenKind::Yellow), (9, TokenKind::Red), (18, TokenKind::Blue)] {
            tokens.set_kind(i, kind);
            let home = tokens.position(i).unwrap();
            tokens.move_to(i, Point::new(50, home.y));
        }
        let state = h.tutorial.state_mut();
        state.stage = Stage::TiltRight;
        state.motion_mode = MotionMode::TiltLeft;
        state.sampling = true;
        let generation = state.begin_pause();
        let scheduler = h.tutorial.scheduler_mut();
        scheduler.after(5000, Timer::ClearPause { generation });
        scheduler.after(100, Timer::MotionSample);

        h.run_for(100);
        assert!(!h.tutorial.state().pausing);
        assert!(h.tutorial.state().advance_pending);
        assert_eq!(h.status(), "Hmm");

        // Later samples leave the pending advance alone.
        h.run_for(900);
        let advances = h
            .tutorial
            .scheduler()
            .requested
            .iter()
            .filter(|r| **r == (1000, Timer::Advance))
            .count();
        assert_eq!(advances, 1);
        assert_eq!(h.stage(), Stage::TiltRight);

        h.run_for(200);
        assert_eq!(h.stage(), Stage::Realign);
        assert_eq!(h.tutorial.state().motion_mode, MotionMode::TiltRight);
        assert_eq!(h.status(), "Now turn it to the right.");
    }

    #[test]
    fn test_stale_sample_after_swap_keeps_shake_pause() {
        let mut h = Harness::new();
        let yellows = h.at_tap_six();
        let (a, b) = (yellows[1], yellows[2]);
        // A sample left over from the realign loop is still queued.
        let state = h.tutorial.state_mut();
        state.stage = Stage::TapTwoSwapped;
        state.sampling = true;
        h.tutorial.scheduler_mut().after(50, Timer::MotionSample);
        h.tap(a);
        h.tap(b);
        assert_eq!(h.stage(), Stage::ShakeAgain);

        h.run_for(60);
        assert!(!h.tutorial.state().sampling);
        assert!(!h.tutorial.state().advance_pending);
        let advances = h
            .tutorial
            .scheduler()
            .requested
            .iter()
            .filter(|(_, t)| *t == Timer::Advance)
            .count();
        assert_eq!(advances, 1);

        h.run_for(450);
        assert_eq!(h.stage(), Stage::Fade { step: 1 });
        assert_eq!(h.tutorial.state().motion_mode, MotionMode::RandomStrong);
        assert!(h.tutorial.state().sampling);

        // The 2 s shake pause holds before the first fade step.
        h.run_for(2400);
        assert_eq!(h.stage(), Stage::Fade { step: 1 });
        assert!(!h.tutorial.host().statuses.iter().any(|s| s.starts_with("Going")));

        h.run_for(800);
        assert_eq!(h.stage(), Stage::Fade { step: 2 });
        assert_eq!(h.status(), "Going");
    }

    #[test]
    fn test_one_loose_token_keeps_align_running() {
        let mut h = Harness::new();
        let tokens = h.tutorial.tokens_mut();
        tokens.reset();
        for (i, kind) in [(2, TokenKind::Yellow), (7, TokenKind::Red), (20, TokenKind::Blue)] {
            tokens.set_kind(i, kind);
        }
        for (i, dock) in docks(tokens) {
            let offset = if i == 7 { 11 } else { 0 };
            tokens.move_to(i, dock.offset(offset, 0));
        }
        let state = h.tutorial.state_mut();
        state.motion_mode = MotionMode::Align;
        state.sampling = true;
        state.begin_pause();
        h.tutorial.scheduler_mut().after(100, Timer::MotionSample);

        h.run_for(100);
        assert!(h.tutorial.state().pausing);
        assert!(!h.tutorial.state().advance_pending);
    }

    #[test]
    fn test_tap_six_dark_round_and_swap() {
        let mut h = Harness::new();
        let yellows = h.at_tap_six();

        h.tap(20);
        assert_eq!(h.status(), "Press the yellow dots.");
        assert!(h.tutorial.state().tapped.is_empty());

        for &i in &yellows[..5] {
            h.tap(i);
        }
        assert_eq!(h.tutorial.tokens().get(yellows[0]).unwrap().label.as_deref(), Some(":)"));
        h.tap(yellows[5]);
        assert_eq!(h.stage(), Stage::TapSixAgain);
        assert_eq!(h.tutorial.state().backdrop, Backdrop::Dark);
        assert_eq!(h.tutorial.host().scenes.last(), Some(&Backdrop::Dark));
        assert_eq!(h.tutorial.tokens().get(20).unwrap().layer, HIDDEN_LAYER);

        // Hidden dots cannot be hit.
        let statuses = h.tutorial.host().statuses.len();
        h.tap(20);
        assert_eq!(h.tutorial.host().statuses.len(), statuses);

        let (a, b) = (yellows[1], yellows[2]);
        let (pa, pb) = (h.tutorial.tokens().position(a), h.tutorial.tokens().position(b));
        for &i in &yellows {
            h.tap(i);
        }
        assert_eq!(h.stage(), Stage::TapTwoSwapped);
        assert_eq!(h.tutorial.state().backdrop, Backdrop::Light);
        assert!(h.tutorial.tokens().get(20).unwrap().is_visible());
        assert!(yellows.iter().all(|&i| h.tutorial.tokens().get(i).unwrap().label.is_none()));
        assert_eq!(h.tutorial.tokens().position(a), pb);
        assert_eq!(h.tutorial.tokens().position(b), pa);

        h.tap(yellows[0]);
        assert_eq!(h.status(), "Keep trying.");
        h.tap(a);
        assert_eq!(h.status(), "You found one. Now find the other one.");
        h.tap(b);
        assert_eq!(h.stage(), Stage::ShakeAgain);
        assert_eq!(h.status(), "Good job! Now let's shake again.");
        assert_eq!(h.tutorial.state().motion_mode, MotionMode::None);
        assert_eq!(h.tutorial.tokens().position(a), pa);
        assert_eq!(h.tutorial.tokens().position(b), pb);
    }

    #[test]
    fn test_fade_loops_back_to_start() {
        let mut h = Harness::new();
        let yellows = h.at_tap_six();
        let (a, b) = (yellows[1], yellows[2]);
        h.tutorial.state_mut().stage = Stage::TapTwoSwapped;
        h.tap(a);
        h.tap(b);
        assert_eq!(h.stage(), Stage::ShakeAgain);

        h.run_for(20_000);
        let statuses = &h.tutorial.host().statuses;
        let fading: Vec<&str> = statuses
            .iter()
            .map(String::as_str)
            .filter(|s| s.starts_with("Going") || *s == "Gone!")
            .collect();
        assert_eq!(fading, vec!["Going", "Going..", "Going...", "Gone!"]);

        assert_eq!(h.stage(), Stage::FindFirstYellow);
        assert_eq!(h.status(), "Tap on the yellow dot.");
        assert_eq!(h.targets().len(), 1);
        assert_eq!(h.tutorial.tokens().active().count(), 1);
        assert_eq!(h.tutorial.state().motion_mode, MotionMode::None);
        assert_eq!(h.tutorial.state().backdrop, Backdrop::Light);

        let first = h.targets()[0];
        h.tap(first);
        assert_eq!(h.stage(), Stage::FindSecondYellow);
    }

    #[test]
    fn test_quit_stops_everything() {
        let mut h = Harness::new();
        h.tutorial.quit();
        assert!(h.tutorial.host().quit);
        assert!(h.tutorial.is_finished());

        let first = h.targets()[0];
        h.tap(first);
        assert_eq!(h.stage(), Stage::FindFirstYellow);
        h.run_for(1000);
        assert_eq!(h.tutorial.tick(), 0);
    }

    #[test]
    fn test_snapshot_serializes() {
        let h = Harness::new();
        let value = serde_json::to_value(h.tutorial.snapshot()).unwrap();
        assert_eq!(value["state"]["stage"], "FindFirstYellow");
        assert_eq!(value["tokens"].as_array().unwrap().len(), 45);
        assert_eq!(value["geometry"]["dot_size"], 100);
    }

    #[test]
    fn test_bad_configuration_is_rejected() {
        let mut config = seeded_config(1);
        config.palette[4] = "red".to_string();
        let built = Tutorial::new(
            &config,
            TimerQueue::new(VirtualClock::new()),
            RecordingHost::default(),
            Box::new(NoMotionDevice),
        );
        assert!(matches!(built, Err(TutorialError::InvalidColor(_))));

        let config = TutorialConfig {
            screen_height: 300,
            ..seeded_config(1)
        };
        assert!(matches!(config.validate(), Err(TutorialError::InvalidGeometry { .. })));

        let config = TutorialConfig {
            palette: DEFAULT_PALETTE[..15].iter().map(|c| c.to_string()).collect(),
            ..seeded_config(1)
        };
        assert!(matches!(
            config.validate(),
            Err(TutorialError::PaletteSize { expected: 16, found: 15 })
        ));
    }

    #[test]
    fn test_config_file_defaults_and_errors() {
        let config: TutorialConfig = serde_json::from_str(r#"{"seed": 3}"#).unwrap();
        assert_eq!(config.seed, Some(3));
        assert_eq!(config.screen_width, 1200);
        assert!(config.validate().is_ok());

        let missing = TutorialConfig::from_file("/nonexistent/tutorial.json");
        assert!(matches!(missing, Err(TutorialError::Io(_))));
    }
}

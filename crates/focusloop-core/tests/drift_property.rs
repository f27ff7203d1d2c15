//! Property tests for the wall-clock drift math.

use focusloop_core::storage::Config;
use focusloop_core::timer::PomodoroEngine;
use focusloop_core::{NoopNotifier, NoopProgressLog};
use proptest::prelude::*;

const T0: u64 = 1_754_000_000_000;

fn work_config(duration: u32) -> Config {
    let mut cfg = Config::default();
    cfg.durations.work = duration;
    cfg
}

proptest! {
    // Jumping the clock forward by any amount up to the duration, with no
    // intermediate ticks, lands exactly on duration - elapsed.
    #[test]
    fn remaining_tracks_wall_clock_exactly(
        duration in 60u32..=7200,
        elapsed_ratio in 0.0f64..=1.0,
    ) {
        let elapsed = (f64::from(duration) * elapsed_ratio).floor() as u32;
        let notifier = NoopNotifier;
        let log = NoopProgressLog;
        let mut engine = PomodoroEngine::new(work_config(duration), &notifier, &log);

        engine.start_at(T0);
        let now = T0 + u64::from(elapsed) * 1000;
        prop_assert_eq!(engine.remaining_at(now), duration - elapsed);
    }

    // Any interleaving of run stretches and idle gaps loses nothing: the
    // remaining time only reflects the seconds actually spent running.
    #[test]
    fn interleaved_pauses_never_lose_time(
        segments in proptest::collection::vec(1u32..=300, 1..6),
        gap_secs in 1u64..=600,
    ) {
        let total: u32 = segments.iter().sum();
        let notifier = NoopNotifier;
        let log = NoopProgressLog;
        let mut engine = PomodoroEngine::new(work_config(3600), &notifier, &log);

        let mut t = T0;
        for seg in &segments {
            engine.start_at(t);
            t += u64::from(*seg) * 1000;
            engine.pause_at(t);
            t += gap_secs * 1000;
        }
        prop_assert_eq!(engine.remaining_at(t), 3600 - total);
        prop_assert!(!engine.is_running());
    }
}

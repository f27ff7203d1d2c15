//! Integration tests for session persistence and reload reconciliation.
//!
//! These drive the same path the CLI takes between invocations: serialize
//! the session state into the kv table, reopen, restore the engine, and
//! verify the reload rules against the store.

use chrono::{TimeZone, Utc};
use focusloop_core::storage::{Config, Database};
use focusloop_core::timer::{Mode, PomodoroEngine, SessionState};
use focusloop_core::NoopNotifier;

const T0: u64 = 1_754_000_000_000;

fn small_config() -> Config {
    let mut cfg = Config::default();
    cfg.durations.work = 600;
    cfg.durations.short = 120;
    cfg.durations.long = 300;
    cfg
}

#[test]
fn reload_restores_remaining_but_never_resumes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("focusloop.db");
    let db = Database::open_at(&path).unwrap();
    let notifier = NoopNotifier;
    let cfg = small_config();

    {
        let mut engine = PomodoroEngine::new(cfg.clone(), &notifier, &db);
        engine.start_at(T0);
        db.save_session_state(engine.state()).unwrap();
    }

    // "New process" 150 seconds later, against the same database file.
    drop(db);
    let db = Database::open_at(&path).unwrap();
    let state: SessionState = db.load_session_state().unwrap().unwrap();
    assert!(state.is_running);

    let (engine, event) = PomodoroEngine::restore_at(cfg, state, &notifier, &db, T0 + 150_000);
    assert!(event.is_none());
    assert!(!engine.is_running());
    assert_eq!(engine.state().anchor_epoch_ms, None);
    assert_eq!(engine.remaining_at(T0 + 150_000), 450);
}

#[test]
fn overrun_reload_completes_into_the_store() {
    let db = Database::open_memory().unwrap();
    let notifier = NoopNotifier;
    let cfg = small_config();

    {
        let mut engine = PomodoroEngine::new(cfg.clone(), &notifier, &db);
        engine.start_at(T0);
        db.save_session_state(engine.state()).unwrap();
    }

    // The whole 600 s session elapsed while no process was alive.
    let state: SessionState = db.load_session_state().unwrap().unwrap();
    let now = T0 + 900_000;
    let (engine, event) = PomodoroEngine::restore_at(cfg, state, &notifier, &db, now);

    assert!(event.is_some());
    assert!(!engine.is_running());
    assert_eq!(engine.mode(), Mode::ShortBreak);
    assert_eq!(engine.cycle_count(), 1);

    let completed_at = Utc.timestamp_millis_opt(now as i64).unwrap();
    let stats = db.stats_at(completed_at).unwrap();
    assert_eq!(stats.total_work_secs, 600);
    assert_eq!(stats.total_stretches, 1);
    assert!(stats.today_complete);
}

#[test]
fn interrupted_work_accumulates_across_restarts() {
    let db = Database::open_memory().unwrap();
    let notifier = NoopNotifier;
    let cfg = small_config();

    let mut engine = PomodoroEngine::new(cfg.clone(), &notifier, &db);
    engine.start_at(T0);
    engine.pause_at(T0 + 60_000);
    db.save_session_state(engine.state()).unwrap();
    drop(engine);

    let state: SessionState = db.load_session_state().unwrap().unwrap();
    let t1 = T0 + 600_000;
    let (mut engine, event) = PomodoroEngine::restore_at(cfg, state, &notifier, &db, t1);
    assert!(event.is_none());
    assert_eq!(engine.state().remaining_secs, 540);

    engine.start_at(t1);
    engine.pause_at(t1 + 90_000);

    let at = Utc.timestamp_millis_opt((t1 + 90_000) as i64).unwrap();
    let stats = db.stats_at(at).unwrap();
    assert_eq!(stats.total_stretches, 2);
    assert_eq!(stats.total_work_secs, 150);
    // Two flushed stretches are progress, not a completed session.
    assert!(!stats.today_complete);
}

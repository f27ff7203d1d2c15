use std::time::Duration;

use clap::{Subcommand, ValueEnum};
use focusloop_core::storage::{Config, Database};
use focusloop_core::timer::{Mode, PomodoroEngine, SessionState};
use focusloop_core::Event;

use crate::notifier::DesktopNotifier;

#[derive(Clone, Copy, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start or resume the current session
    Start,
    /// Pause the running session
    Pause,
    /// Reset the current session to its full duration
    Reset,
    /// Skip to the next session (counts as a completion)
    Skip,
    /// Switch the active session kind
    Switch {
        /// Session kind: work, short or long
        mode: String,
    },
    /// Toggle focus mode
    Focus {
        #[arg(value_enum)]
        state: Toggle,
    },
    /// Print current timer state as JSON
    Status,
    /// Start the session if idle, then tick once per second until it stops
    Watch,
}

/// A missing or unparseable record degrades to first-use defaults; the timer
/// is never blocked by a corrupt store.
fn load_state(db: &Database, config: &Config) -> SessionState {
    match db.load_session_state() {
        Ok(Some(state)) => state,
        Ok(None) => SessionState::initial(config),
        Err(e) => {
            log::warn!("discarding unreadable session state: {e}");
            SessionState::initial(config)
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_event_or_snapshot(
    event: Option<Event>,
    engine: &PomodoroEngine<'_>,
) -> Result<(), Box<dyn std::error::Error>> {
    match event {
        Some(event) => print_json(&event),
        None => print_json(&engine.snapshot()),
    }
}

fn format_clock(secs: u32) -> String {
    if secs >= 3600 {
        format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
    } else {
        format!("{:02}:{:02}", secs / 60, secs % 60)
    }
}

/// Cooperative tick loop: one evaluation per second, persisted every tick so
/// a killed process is recoverable, cancelled in the same iteration that
/// observes the engine leaving the running state.
///
/// A restored session is always paused, so invoking `watch` counts as
/// pressing start; a session at zero just prints its snapshot.
fn watch(
    engine: &mut PomodoroEngine<'_>,
    db: &Database,
) -> Result<(), Box<dyn std::error::Error>> {
    if !engine.is_running() {
        if let Some(event) = engine.start() {
            print_json(&event)?;
        } else {
            return print_json(&engine.snapshot());
        }
    }
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    runtime.block_on(async {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            let completed = engine.tick();
            db.save_session_state(engine.state())?;
            match completed {
                Some(event) => print_json(&event)?,
                None => println!(
                    "{} {} ({:.0}%)",
                    engine.mode(),
                    format_clock(engine.remaining_secs()),
                    engine.progress() * 100.0
                ),
            }
            if !engine.is_running() {
                return Ok(());
            }
        }
    })
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let config = Config::load_or_default();
    let notifier = DesktopNotifier;
    let state = load_state(&db, &config);

    let (mut engine, reconciled) = PomodoroEngine::restore(config, state, &notifier, &db);
    if let Some(event) = reconciled {
        print_json(&event)?;
    }

    match action {
        TimerAction::Start => {
            let event = engine.start();
            print_event_or_snapshot(event, &engine)?;
        }
        TimerAction::Pause => {
            let event = engine.pause();
            print_event_or_snapshot(event, &engine)?;
        }
        TimerAction::Reset => {
            let event = engine.reset();
            print_event_or_snapshot(event, &engine)?;
        }
        TimerAction::Skip => {
            let event = engine.skip();
            print_event_or_snapshot(event, &engine)?;
        }
        TimerAction::Switch { mode } => {
            let mode: Mode = mode.parse()?;
            let event = engine.switch_mode(mode);
            print_event_or_snapshot(event, &engine)?;
        }
        TimerAction::Focus { state } => {
            engine.set_focus_mode(matches!(state, Toggle::On));
            print_json(&engine.snapshot())?;
        }
        TimerAction::Status => {
            // Restore already reconciled overruns; the snapshot is current.
            print_json(&engine.snapshot())?;
        }
        TimerAction::Watch => {
            watch(&mut engine, &db)?;
        }
    }

    db.save_session_state(engine.state())?;
    Ok(())
}

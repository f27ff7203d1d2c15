mod engine;
mod session;

pub use engine::PomodoroEngine;
pub use session::{Mode, SessionState};
